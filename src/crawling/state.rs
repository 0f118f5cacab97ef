//! # Shared State Management
//!
//! Thread-safe state shared by every pipeline stage: the run's cancellation
//! token and the running statistics.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Thread-safe shared state for the entire crawling system
#[derive(Debug, Default)]
pub struct SharedState {
    /// Cancellation token for graceful shutdown
    pub cancellation_token: CancellationToken,

    /// Real-time crawling statistics
    pub stats: RwLock<CrawlingStats>,
}

impl SharedState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests graceful shutdown of all operations
    pub fn request_shutdown(&self) {
        self.cancellation_token.cancel();
    }

    /// Checks if shutdown has been requested
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Sleeps unless shutdown is requested first; `false` means cancelled
    pub async fn cancellable_sleep(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.is_shutdown_requested();
        }
        tokio::select! {
            biased;
            _ = self.cancellation_token.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    pub async fn update_stats(&self, update: impl FnOnce(&mut CrawlingStats)) {
        let mut stats = self.stats.write().await;
        update(&mut stats);
    }

    pub async fn stats_snapshot(&self) -> CrawlingStats {
        self.stats.read().await.clone()
    }
}

/// Counters for one run
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlingStats {
    pub listing_pages_fetched: u64,
    pub matches_discovered: u64,
    /// Already in the store
    pub matches_skipped: u64,
    /// Handed to the match detail worker after deduplication
    pub matches_queued: u64,
    pub matches_crawled: u64,
    /// Left un-crawled after a fetch or parse failure
    pub matches_failed: u64,
    /// Player stubs sent to the event worker pool
    pub player_tasks_dispatched: u64,
    pub players_crawled: u64,
    pub players_failed: u64,
    pub events_extracted: u64,
}

impl CrawlingStats {
    /// Writes the end-of-run summary to the log
    pub fn log_summary(&self) {
        info!("📊 Crawl summary");
        info!("  listing pages: {}", self.listing_pages_fetched);
        info!(
            "  matches: {} discovered, {} already stored, {} queued, {} crawled, {} failed",
            self.matches_discovered,
            self.matches_skipped,
            self.matches_queued,
            self.matches_crawled,
            self.matches_failed
        );
        info!(
            "  players: {} dispatched, {} crawled, {} failed, {} events",
            self.player_tasks_dispatched,
            self.players_crawled,
            self.players_failed,
            self.events_extracted
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sleep_is_cut_short_by_shutdown() {
        let state = SharedState::new();
        state.request_shutdown();
        assert!(state.is_shutdown_requested());
        assert!(!state.cancellable_sleep(Duration::from_secs(60)).await);
    }

    #[test]
    fn fresh_state_has_empty_stats() {
        let state = SharedState::new();
        let snapshot = tokio_test::block_on(state.stats_snapshot());
        assert_eq!(snapshot, CrawlingStats::default());
        assert!(!state.is_shutdown_requested());
    }

    #[tokio::test]
    async fn stats_updates_are_visible() {
        let state = SharedState::new();
        state.update_stats(|s| s.matches_crawled += 2).await;
        state.update_stats(|s| s.events_extracted += 40).await;

        let snapshot = state.stats_snapshot().await;
        assert_eq!(snapshot.matches_crawled, 2);
        assert_eq!(snapshot.events_extracted, 40);
    }
}
