//! In-memory `Store`
//!
//! Same contract as the SQLite store, including the integrity checks, held in
//! `tokio::sync::RwLock` tables. Backs dry runs and the pipeline tests.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{League, Match, PlayerEvent, PlayerStats, Store, StoreError};

/// A persisted event together with its parent id, in insertion order
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    pub player_stats_id: i64,
    pub event: PlayerEvent,
}

#[derive(Debug, Default)]
struct Tables {
    leagues: HashMap<String, League>,
    /// insertion order is kept for inspection
    matches: Vec<Match>,
    player_stats: BTreeMap<i64, PlayerStats>,
    player_events: Vec<StoredEvent>,
}

impl Tables {
    fn match_mut(&mut self, match_id: &str) -> Option<&mut Match> {
        self.matches.iter_mut().find(|m| m.id == match_id)
    }

    fn check_stats(&self, stats: &PlayerStats) -> Result<(), StoreError> {
        if !self.matches.iter().any(|m| m.id == stats.match_id) {
            return Err(StoreError::MissingMatch {
                match_id: stats.match_id.clone(),
            });
        }
        if self.player_stats.contains_key(&stats.id) {
            return Err(StoreError::Duplicate(format!("player_stats.id {}", stats.id)));
        }
        Ok(())
    }

    fn check_finalize(&self, match_id: &str) -> Result<(), StoreError> {
        match self.matches.iter().find(|m| m.id == match_id) {
            None => Err(StoreError::MissingMatch {
                match_id: match_id.to_string(),
            }),
            Some(m) if m.is_crawled => Err(StoreError::AlreadyCrawled {
                match_id: match_id.to_string(),
            }),
            Some(_) => Ok(()),
        }
    }

    /// Stats row first, then its events; the row is stored without them
    fn write_stats(&mut self, stats: &PlayerStats) {
        let row = PlayerStats {
            events: Vec::new(),
            ..stats.clone()
        };
        self.player_stats.insert(stats.id, row);
        self.player_events
            .extend(stats.events.iter().cloned().map(|event| StoredEvent {
                player_stats_id: stats.id,
                event,
            }));
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn matches(&self) -> Vec<Match> {
        self.tables.read().await.matches.clone()
    }

    pub async fn leagues(&self) -> Vec<League> {
        let mut leagues: Vec<League> = self.tables.read().await.leagues.values().cloned().collect();
        leagues.sort_by(|a, b| a.id.cmp(&b.id));
        leagues
    }

    /// Stats rows ordered by id
    pub async fn player_stats(&self) -> Vec<PlayerStats> {
        self.tables.read().await.player_stats.values().cloned().collect()
    }

    pub async fn player_events(&self) -> Vec<StoredEvent> {
        self.tables.read().await.player_events.clone()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn league_exists(&self, league_id: &str) -> Result<bool, StoreError> {
        Ok(self.tables.read().await.leagues.contains_key(league_id))
    }

    async fn insert_league(&self, league: &League) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.leagues.contains_key(&league.id) {
            return Err(StoreError::Duplicate(format!("league.id {}", league.id)));
        }
        tables.leagues.insert(league.id.clone(), league.clone());
        Ok(())
    }

    async fn match_exists_by_url(&self, url: &str) -> Result<bool, StoreError> {
        Ok(self.tables.read().await.matches.iter().any(|m| m.url == url))
    }

    async fn insert_match(&self, m: &Match) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.matches.iter().any(|e| e.id == m.id || e.url == m.url) {
            return Err(StoreError::Duplicate(format!("match {}", m.id)));
        }
        tables.matches.push(m.clone());
        Ok(())
    }

    async fn mark_match_crawled(&self, match_id: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.check_finalize(match_id)?;
        if let Some(m) = tables.match_mut(match_id) {
            m.is_crawled = true;
        }
        Ok(())
    }

    async fn insert_player_stats(&self, stats: &PlayerStats) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.check_stats(stats)?;
        tables.write_stats(stats);
        Ok(())
    }

    async fn insert_player_event(
        &self,
        player_stats_id: i64,
        event: &PlayerEvent,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.player_stats.contains_key(&player_stats_id) {
            return Err(StoreError::MissingParent { player_stats_id });
        }
        tables.player_events.push(StoredEvent {
            player_stats_id,
            event: event.clone(),
        });
        Ok(())
    }

    async fn max_player_stats_id(&self) -> Result<i64, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .player_stats
            .keys()
            .next_back()
            .copied()
            .unwrap_or(0))
    }

    /// Validates the whole roster under one write lock before touching anything
    async fn save_match_roster(
        &self,
        match_id: &str,
        roster: &[PlayerStats],
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.check_finalize(match_id)?;
        let mut seen = std::collections::HashSet::new();
        for stats in roster {
            tables.check_stats(stats)?;
            if !seen.insert(stats.id) {
                return Err(StoreError::Duplicate(format!("player_stats.id {}", stats.id)));
            }
        }

        for stats in roster {
            tables.write_stats(stats);
        }
        if let Some(m) = tables.match_mut(match_id) {
            m.is_crawled = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventType, Point};

    fn fixture_match(id: &str) -> Match {
        Match {
            id: id.to_string(),
            season: "2016".into(),
            match_date: "2016-08-13".into(),
            match_time: "15:00".into(),
            league_id: "8".into(),
            home_team_name: "Team A".into(),
            away_team_name: "Team B".into(),
            home_score: "2".into(),
            away_score: "1".into(),
            url: format!("http://x/{id}"),
            is_crawled: false,
        }
    }

    fn stats_with_event(id: i64, match_id: &str) -> PlayerStats {
        let mut stats = PlayerStats::stub(id, match_id, "Team A", "7", false, "http://x/p/7");
        stats.events.push(PlayerEvent {
            half: "1".into(),
            minute: "10".into(),
            event_type: EventType::AerialDuelWon,
            start: Point::new(50.0, 60.0),
            end: Point::new(50.0, 60.0),
        });
        stats
    }

    #[tokio::test]
    async fn events_follow_their_parent_row() {
        let store = InMemoryStore::new();
        store.insert_match(&fixture_match("1")).await.unwrap();
        store.insert_player_stats(&stats_with_event(3, "1")).await.unwrap();

        let events = store.player_events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].player_stats_id, 3);
        assert!(store.player_stats().await[0].events.is_empty());
        assert_eq!(store.max_player_stats_id().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn orphan_event_is_rejected() {
        let store = InMemoryStore::new();
        let event = stats_with_event(1, "1").events.remove(0);
        assert!(matches!(
            store.insert_player_event(1, &event).await,
            Err(StoreError::MissingParent { player_stats_id: 1 })
        ));
    }

    #[tokio::test]
    async fn roster_is_all_or_nothing() {
        let store = InMemoryStore::new();
        store.insert_match(&fixture_match("1")).await.unwrap();

        let result = store
            .save_match_roster("1", &[stats_with_event(1, "1"), stats_with_event(1, "1")])
            .await;
        assert!(matches!(result, Err(StoreError::Duplicate(_))));
        assert!(store.player_stats().await.is_empty());
        assert!(!store.matches().await[0].is_crawled);

        store
            .save_match_roster("1", &[stats_with_event(1, "1"), stats_with_event(2, "1")])
            .await
            .unwrap();
        assert_eq!(store.player_events().await.len(), 2);
        assert!(store.matches().await[0].is_crawled);
        assert!(matches!(
            store.save_match_roster("1", &[]).await,
            Err(StoreError::AlreadyCrawled { .. })
        ));
    }

    #[tokio::test]
    async fn duplicate_match_is_rejected() {
        let store = InMemoryStore::new();
        store.insert_match(&fixture_match("1")).await.unwrap();
        assert!(store.match_exists_by_url("http://x/1").await.unwrap());
        assert!(matches!(
            store.insert_match(&fixture_match("1")).await,
            Err(StoreError::Duplicate(_))
        ));
    }
}
