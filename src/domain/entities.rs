//! Domain entities
//!
//! League, match, player participation and on-pitch events as they are
//! persisted by the crawler.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A competition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct League {
    pub id: String,
    pub name: String,
}

impl League {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// One fixture as listed on a results page.
///
/// `url` is the canonical player-stats page of the match and doubles as the
/// deduplication key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    pub season: String,
    pub match_date: String,
    pub match_time: String,
    pub league_id: String,
    pub home_team_name: String,
    pub away_team_name: String,
    pub home_score: String,
    pub away_score: String,
    pub url: String,
    pub is_crawled: bool,
}

/// A 2-D pitch coordinate in raw page units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Sentinel for "no coordinate"
    pub const NONE: Point = Point { x: -1.0, y: -1.0 };

    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// Semantic category of a pitch event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PassSuccess,
    PassFail,
    PassGoalAssist,
    PassChanceCreated,
    ShotOnTarget,
    ShotOffTarget,
    ShotGoal,
    ShotBlocked,
    TakeOnSuccess,
    TakeOnFail,
    AerialDuelWon,
    AerialDuelLost,
    FoulCommited,
    FoulSuffered,
    ErrorLeadingGoal,
    ErrorLeadingShot,
    DefTackleSuccess,
    DefTackleFail,
    DefClearanceSuccess,
    DefClearanceFail,
    DefInterception,
    DefBallRecovery,
    DefBlockShot,
    DefBlockCross,
    Unknown,
}

impl EventType {
    /// Name stored in `player_event.event_type`
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PassSuccess => "pass_success",
            Self::PassFail => "pass_fail",
            Self::PassGoalAssist => "pass_goal_assist",
            Self::PassChanceCreated => "pass_chance_created",
            Self::ShotOnTarget => "shot_on_target",
            Self::ShotOffTarget => "shot_off_target",
            Self::ShotGoal => "shot_goal",
            Self::ShotBlocked => "shot_blocked",
            Self::TakeOnSuccess => "take_on_success",
            Self::TakeOnFail => "take_on_fail",
            Self::AerialDuelWon => "aerial_duel_won",
            Self::AerialDuelLost => "aerial_duel_lost",
            Self::FoulCommited => "foul_commited",
            Self::FoulSuffered => "foul_suffered",
            Self::ErrorLeadingGoal => "error_leading_goal",
            Self::ErrorLeadingShot => "error_leading_shot",
            Self::DefTackleSuccess => "def_tackle_success",
            Self::DefTackleFail => "def_tackle_fail",
            Self::DefClearanceSuccess => "def_clearance_success",
            Self::DefClearanceFail => "def_clearance_fail",
            Self::DefInterception => "def_interception",
            Self::DefBallRecovery => "def_ball_recovery",
            Self::DefBlockShot => "def_block_shot",
            Self::DefBlockCross => "def_block_cross",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One on-pitch action. Single-point events carry `start == end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerEvent {
    pub half: String,
    pub minute: String,
    pub event_type: EventType,
    pub start: Point,
    pub end: Point,
}

/// One player's participation in one match.
///
/// Created as a stub (id, match, team, player id, url) by the match detail
/// worker and completed (name, events) by a player event worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub id: i64,
    pub match_id: String,
    pub team_name: String,
    pub player_id: String,
    pub player_name: String,
    pub is_substitute: bool,
    pub url: String,
    pub events: Vec<PlayerEvent>,
}

impl PlayerStats {
    /// Creates a stub with no name and no events
    pub fn stub(
        id: i64,
        match_id: impl Into<String>,
        team_name: impl Into<String>,
        player_id: impl Into<String>,
        is_substitute: bool,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id,
            match_id: match_id.into(),
            team_name: team_name.into(),
            player_id: player_id.into(),
            player_name: String::new(),
            is_substitute,
            url: url.into(),
            events: Vec::new(),
        }
    }
}

/// "0"/"1" flag encoding used by the persisted schema
#[must_use]
pub const fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}
