//! Infrastructure layer for database connections, parsing, and external integrations
//!
//! This module provides the concrete collaborators behind the domain
//! contracts (HTTP fetcher, SQLite and in-memory stores), the HTML parsers,
//! and the configuration and logging setup.

pub mod config; // Configuration file and defaults
pub mod database_connection;
pub mod http_client;
pub mod logging; // Logging infrastructure
pub mod memory_store;
pub mod parsing; // Extraction rules and page parsers
pub mod sqlite_store;

// Re-export commonly used items
pub use config::{AppConfig, ConfigManager, ConfigOrigin, FailurePolicy, StoreKind};
pub use database_connection::DatabaseConnection;
pub use http_client::{HttpClient, HttpClientConfig};
pub use memory_store::InMemoryStore;
pub use parsing::{ExtractionTables, PageParsers, ParsingError, ParsingResult};
pub use sqlite_store::SqliteStore;
