//! Repository interfaces for the stats zone crawler
//!
//! Contains the trait definitions the crawling pipeline is written against.
//! Concrete implementations live in the infrastructure layer.

use async_trait::async_trait;

use crate::domain::entities::{League, Match, PlayerEvent, PlayerStats};
use crate::domain::errors::{FetchError, StoreError};

/// Resolves a URL to the page body.
///
/// Callers parse the body into a `scraper::Html` synchronously; the parsed
/// document is not `Send` and must not be held across an `.await`.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError>;
}

/// Durable persistence of leagues, matches, player stats and player events.
///
/// Every write is atomic per logical record: a `PlayerStats` is stored
/// together with all of its events or not at all.
#[async_trait]
pub trait Store: Send + Sync {
    async fn league_exists(&self, league_id: &str) -> Result<bool, StoreError>;
    async fn insert_league(&self, league: &League) -> Result<(), StoreError>;

    async fn match_exists_by_url(&self, url: &str) -> Result<bool, StoreError>;
    async fn insert_match(&self, m: &Match) -> Result<(), StoreError>;
    async fn mark_match_crawled(&self, match_id: &str) -> Result<(), StoreError>;

    /// Stores the stats row followed by its owned events
    async fn insert_player_stats(&self, stats: &PlayerStats) -> Result<(), StoreError>;
    async fn insert_player_event(
        &self,
        player_stats_id: i64,
        event: &PlayerEvent,
    ) -> Result<(), StoreError>;

    /// Highest persisted `player_stats.id`, 0 when the table is empty
    async fn max_player_stats_id(&self) -> Result<i64, StoreError>;

    /// Persists a completed roster and finalizes the match.
    ///
    /// The default composes the single-record operations in parent-first
    /// order; implementations with transactions should make it all-or-nothing.
    async fn save_match_roster(
        &self,
        match_id: &str,
        roster: &[PlayerStats],
    ) -> Result<(), StoreError> {
        for stats in roster {
            self.insert_player_stats(stats).await?;
        }
        self.mark_match_crawled(match_id).await
    }
}
