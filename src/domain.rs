//! Domain module - Core entities and collaborator contracts
//!
//! This module contains the football data model persisted by the crawler and
//! the two interfaces the pipeline is written against:
//! - `PageFetcher`: URL → page body
//! - `Store`: typed persistence and existence queries
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod constants;
pub mod entities;
pub mod errors;
pub mod repositories;

// Re-export commonly used items for convenience
pub use entities::{EventType, League, Match, PlayerEvent, PlayerStats, Point};
pub use errors::{FetchError, StoreError};
pub use repositories::{PageFetcher, Store};
