//! Immutable lookup tables for the extraction rules
//!
//! Built once at startup and shared by `Arc` with every parser and worker.

use std::collections::HashMap;

use crate::domain::EventType;

const MONTHS: [(&str, u32); 12] = [
    ("January", 1),
    ("February", 2),
    ("March", 3),
    ("April", 4),
    ("May", 5),
    ("June", 6),
    ("July", 7),
    ("August", 8),
    ("September", 9),
    ("October", 10),
    ("November", 11),
    ("December", 12),
];

/// Raw marker token → event category
const EVENT_TOKENS: [(&str, EventType); 24] = [
    ("smallblue", EventType::PassSuccess),
    ("smallred", EventType::PassFail),
    ("smallyellow", EventType::PassGoalAssist),
    ("smalldeepskyblue", EventType::PassChanceCreated),
    ("bigblue", EventType::ShotOnTarget),
    ("bigred", EventType::ShotOffTarget),
    ("bigyellow", EventType::ShotGoal),
    ("bigdarkgrey", EventType::ShotBlocked),
    ("success", EventType::TakeOnSuccess),
    ("fail", EventType::TakeOnFail),
    ("won", EventType::AerialDuelWon),
    ("lost", EventType::AerialDuelLost),
    ("commited", EventType::FoulCommited),
    ("suffered", EventType::FoulSuffered),
    ("error-leading-goal", EventType::ErrorLeadingGoal),
    ("error-leading-shot", EventType::ErrorLeadingShot),
    ("successful_tackle", EventType::DefTackleSuccess),
    ("failed_tackle", EventType::DefTackleFail),
    ("successful_clearance", EventType::DefClearanceSuccess),
    ("failed_clearance", EventType::DefClearanceFail),
    ("interceptions", EventType::DefInterception),
    ("defensive-ball-recovery", EventType::DefBallRecovery),
    ("blocks", EventType::DefBlockShot),
    ("blocks-cross", EventType::DefBlockCross),
];

#[derive(Debug, Clone)]
pub struct ExtractionTables {
    months: HashMap<&'static str, u32>,
    event_types: HashMap<&'static str, EventType>,
}

impl ExtractionTables {
    #[must_use]
    pub fn new() -> Self {
        Self {
            months: MONTHS.into_iter().collect(),
            event_types: EVENT_TOKENS.into_iter().collect(),
        }
    }

    /// Calendar month number for an English month name
    #[must_use]
    pub fn month(&self, name: &str) -> Option<u32> {
        self.months.get(name).copied()
    }

    #[must_use]
    pub fn event_type(&self, token: &str) -> Option<EventType> {
        self.event_types.get(token).copied()
    }

    /// Every known marker token
    pub fn event_tokens(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.event_types.keys().copied()
    }
}

impl Default for ExtractionTables {
    fn default() -> Self {
        Self::new()
    }
}
