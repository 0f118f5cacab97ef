//! SQLite-backed `Store`
//!
//! Every write runs inside its own transaction. A player stats row and its
//! events commit together, and `save_match_roster` commits a whole roster
//! together with the match's crawled flag.

#![allow(clippy::uninlined_format_args)]

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::domain::entities::flag;
use crate::domain::{League, Match, PlayerEvent, PlayerStats, Store, StoreError};

#[derive(Clone)]
pub struct SqliteStore {
    pool: Arc<SqlitePool>,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn write_player_stats(
        conn: &mut SqliteConnection,
        stats: &PlayerStats,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO player_stats
            (id, match_id, team_name, player_id, player_name, is_substitute, url)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(stats.id)
        .bind(&stats.match_id)
        .bind(&stats.team_name)
        .bind(&stats.player_id)
        .bind(&stats.player_name)
        .bind(flag(stats.is_substitute))
        .bind(&stats.url)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            foreign_key_violation(e, || StoreError::MissingMatch {
                match_id: stats.match_id.clone(),
            })
        })?;

        for event in &stats.events {
            Self::write_player_event(&mut *conn, stats.id, event).await?;
        }
        Ok(())
    }

    async fn write_player_event(
        conn: &mut SqliteConnection,
        player_stats_id: i64,
        event: &PlayerEvent,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO player_event
            (player_stats_id, event_half, event_minute, event_type, x1, y1, x2, y2)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(player_stats_id)
        .bind(&event.half)
        .bind(&event.minute)
        .bind(event.event_type.as_str())
        .bind(event.start.x)
        .bind(event.start.y)
        .bind(event.end.x)
        .bind(event.end.y)
        .execute(&mut *conn)
        .await
        .map_err(|e| foreign_key_violation(e, || StoreError::MissingParent { player_stats_id }))?;
        Ok(())
    }

    /// Flips `is_crawled` from "0" to "1", explaining why when nothing changed
    async fn finalize_match(conn: &mut SqliteConnection, match_id: &str) -> Result<(), StoreError> {
        let updated = sqlx::query(r#"UPDATE "match" SET is_crawled = '1' WHERE id = ? AND is_crawled = '0'"#)
            .bind(match_id)
            .execute(&mut *conn)
            .await?
            .rows_affected();

        if updated == 1 {
            return Ok(());
        }

        let exists: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM "match" WHERE id = ?"#)
            .bind(match_id)
            .fetch_one(&mut *conn)
            .await?;
        if exists == 0 {
            Err(StoreError::MissingMatch {
                match_id: match_id.to_string(),
            })
        } else {
            Err(StoreError::AlreadyCrawled {
                match_id: match_id.to_string(),
            })
        }
    }
}

fn foreign_key_violation(error: sqlx::Error, missing: impl FnOnce() -> StoreError) -> StoreError {
    match &error {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => missing(),
        _ => error.into(),
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn league_exists(&self, league_id: &str) -> Result<bool, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM league WHERE id = ?")
            .bind(league_id)
            .fetch_one(&*self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn insert_league(&self, league: &League) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO league (id, name) VALUES (?, ?)")
            .bind(&league.id)
            .bind(&league.name)
            .execute(&*self.pool)
            .await?;
        Ok(())
    }

    async fn match_exists_by_url(&self, url: &str) -> Result<bool, StoreError> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM "match" WHERE url = ?"#)
            .bind(url)
            .fetch_one(&*self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn insert_match(&self, m: &Match) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO "match"
            (id, season, match_date, match_time, league_id, home_team_name,
             away_team_name, home_score, away_score, url, is_crawled)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&m.id)
        .bind(&m.season)
        .bind(&m.match_date)
        .bind(&m.match_time)
        .bind(&m.league_id)
        .bind(&m.home_team_name)
        .bind(&m.away_team_name)
        .bind(&m.home_score)
        .bind(&m.away_score)
        .bind(&m.url)
        .bind(flag(m.is_crawled))
        .execute(&*self.pool)
        .await?;
        debug!("Inserted match {}", m.id);
        Ok(())
    }

    async fn mark_match_crawled(&self, match_id: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        Self::finalize_match(&mut tx, match_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn insert_player_stats(&self, stats: &PlayerStats) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        Self::write_player_stats(&mut tx, stats).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn insert_player_event(
        &self,
        player_stats_id: i64,
        event: &PlayerEvent,
    ) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        Self::write_player_event(&mut conn, player_stats_id, event).await
    }

    async fn max_player_stats_id(&self) -> Result<i64, StoreError> {
        let max: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) FROM player_stats")
            .fetch_one(&*self.pool)
            .await?;
        Ok(max)
    }

    async fn save_match_roster(
        &self,
        match_id: &str,
        roster: &[PlayerStats],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for stats in roster {
            Self::write_player_stats(&mut tx, stats).await?;
        }
        Self::finalize_match(&mut tx, match_id).await?;
        tx.commit().await?;

        debug!(
            "Committed {} player stats ({} events) for match {}",
            roster.len(),
            roster.iter().map(|s| s.events.len()).sum::<usize>(),
            match_id
        );
        Ok(())
    }
}
