// Database connection and pool management
// This module handles SQLite database connections using sqlx

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let db_path = if database_url.starts_with("sqlite://") {
            database_url.trim_start_matches("sqlite://")
        } else if database_url.starts_with("sqlite:") {
            database_url.trim_start_matches("sqlite:")
        } else {
            database_url
        };

        // Create database file directory if it doesn't exist
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create database directory {:?}", parent))?;
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {database_url}"))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {database_url}"))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn into_pool(self) -> SqlitePool {
        self.pool
    }

    /// Creates the five tables when missing; safe to run on every start
    pub async fn migrate(&self) -> Result<()> {
        let create_league_sql = r#"
            CREATE TABLE IF NOT EXISTS league (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL
            )
        "#;

        let create_match_sql = r#"
            CREATE TABLE IF NOT EXISTS "match" (
                id TEXT PRIMARY KEY,
                season TEXT NOT NULL,
                match_date TEXT NOT NULL,
                match_time TEXT NOT NULL,
                league_id TEXT NOT NULL,
                home_team_name TEXT NOT NULL,
                away_team_name TEXT NOT NULL,
                home_score TEXT NOT NULL,
                away_score TEXT NOT NULL,
                url TEXT NOT NULL UNIQUE,
                is_crawled TEXT NOT NULL DEFAULT '0'
            )
        "#;

        // reserved for a future player directory
        let create_player_sql = r#"
            CREATE TABLE IF NOT EXISTS player (
                id TEXT PRIMARY KEY,
                name TEXT
            )
        "#;

        let create_player_stats_sql = r#"
            CREATE TABLE IF NOT EXISTS player_stats (
                id INTEGER PRIMARY KEY,
                match_id TEXT NOT NULL REFERENCES "match" (id),
                team_name TEXT NOT NULL,
                player_id TEXT NOT NULL,
                player_name TEXT NOT NULL,
                is_substitute TEXT NOT NULL,
                url TEXT NOT NULL
            )
        "#;

        let create_player_event_sql = r#"
            CREATE TABLE IF NOT EXISTS player_event (
                id INTEGER PRIMARY KEY,
                player_stats_id INTEGER NOT NULL REFERENCES player_stats (id),
                event_half TEXT NOT NULL,
                event_minute TEXT NOT NULL,
                event_type TEXT NOT NULL,
                x1 REAL NOT NULL,
                y1 REAL NOT NULL,
                x2 REAL NOT NULL,
                y2 REAL NOT NULL
            )
        "#;

        let create_indexes_sql = r#"
            CREATE INDEX IF NOT EXISTS idx_player_stats_match_id ON player_stats (match_id);
            CREATE INDEX IF NOT EXISTS idx_player_event_player_stats_id ON player_event (player_stats_id);
        "#;

        sqlx::query(create_league_sql).execute(&self.pool).await?;
        sqlx::query(create_match_sql).execute(&self.pool).await?;
        sqlx::query(create_player_sql).execute(&self.pool).await?;
        sqlx::query(create_player_stats_sql).execute(&self.pool).await?;
        sqlx::query(create_player_event_sql).execute(&self.pool).await?;
        sqlx::query(create_indexes_sql).execute(&self.pool).await?;

        info!("Database schema ready");
        Ok(())
    }
}
