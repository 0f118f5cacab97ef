//! PlayerStats id allocation
//!
//! Ids continue from the highest one already persisted, so they stay unique
//! across runs as well as across concurrent callers within a run.

use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Debug)]
pub struct PlayerStatsIdAllocator {
    next: AtomicI64,
}

impl PlayerStatsIdAllocator {
    /// `max_persisted_id` is `Store::max_player_stats_id()`, 0 for an empty store
    #[must_use]
    pub fn new(max_persisted_id: i64) -> Self {
        Self {
            next: AtomicI64::new(max_persisted_id + 1),
        }
    }

    pub fn allocate(&self) -> i64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
