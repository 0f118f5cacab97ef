//! statszone-crawler - fourfourtwo stats zone crawler
//!
//! Discovers the matches of a league season (or a single day), fetches their
//! line-ups and every player's pitch events, and stores them in SQLite while
//! keeping parent rows ahead of their children.

// Module declarations
pub mod crawling;
pub mod domain;
pub mod infrastructure;
