//! # Crawling Task Definitions
//!
//! Messages exchanged between the match detail worker and the player event
//! worker pool. Every request carries a correlation key so responses can be
//! matched back to their stub no matter which worker answers first.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crawling::workers::WorkerError;
use crate::domain::PlayerStats;

/// Unique identifier for crawling tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new unique task ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one player stub within one match
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationKey {
    pub match_id: String,
    pub player_stats_id: i64,
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.match_id, self.player_stats_id)
    }
}

/// A stub waiting for its events and display name
#[derive(Debug, Clone)]
pub struct PlayerEventTask {
    pub task_id: TaskId,
    pub key: CorrelationKey,
    pub stats: PlayerStats,
}

impl PlayerEventTask {
    pub fn new(stats: PlayerStats) -> Self {
        Self {
            task_id: TaskId::new(),
            key: CorrelationKey {
                match_id: stats.match_id.clone(),
                player_stats_id: stats.id,
            },
            stats,
        }
    }
}

/// The enriched stub, or why it could not be enriched
#[derive(Debug)]
pub struct PlayerEventOutcome {
    pub task_id: TaskId,
    pub key: CorrelationKey,
    pub result: Result<PlayerStats, WorkerError>,
}

/// Per-match lifecycle of the match detail worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchPhase {
    Discovered,
    Persisted,
    RosterExtracted,
    EventsAttached,
    Finalized,
}

impl fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Discovered => "Discovered",
            Self::Persisted => "Persisted",
            Self::RosterExtracted => "RosterExtracted",
            Self::EventsAttached => "EventsAttached",
            Self::Finalized => "Finalized",
        };
        f.write_str(name)
    }
}
