//! HTML parsing infrastructure for the stats zone pages
//!
//! - `rules` / `tables`: pure extraction rules and their lookup tables
//! - `listing_parser`, `lineup_parser`, `player_page_parser`: selectors → typed rows
//!
//! Parsers take the page body as `&str` and build the `scraper::Html` inside a
//! synchronous call, so no parsed document is ever held across an `.await`.

pub mod config;
pub mod context;
pub mod error;
pub mod lineup_parser;
pub mod listing_parser;
pub mod player_page_parser;
pub mod rules;
pub mod tables;

use std::sync::Arc;

use scraper::ElementRef;

// Re-export public types
pub use config::SelectorConfig;
pub use context::{ListingContext, ListingKind};
pub use error::{ExtractionError, ParsingError, ParsingResult};
pub use lineup_parser::{LineupParser, RosterEntry, TeamSide};
pub use listing_parser::{ListingPage, ListingParser};
pub use player_page_parser::{PlayerPage, PlayerPageParser};
pub use tables::ExtractionTables;

/// The three page parsers, compiled once from configuration
pub struct PageParsers {
    pub listing: ListingParser,
    pub lineup: LineupParser,
    pub player_page: PlayerPageParser,
}

impl PageParsers {
    pub fn new(selectors: &SelectorConfig, tables: Arc<ExtractionTables>) -> ParsingResult<Self> {
        Ok(Self {
            listing: ListingParser::with_config(&selectors.listing, Arc::clone(&tables))?,
            lineup: LineupParser::with_config(&selectors.lineup)?,
            player_page: PlayerPageParser::with_config(&selectors.player_page, tables)?,
        })
    }
}

/// Attribute value by local name, so `xlink:href` is found as `href`
pub(crate) fn attribute<'a>(element: &ElementRef<'a>, name: &str) -> Option<&'a str> {
    element
        .value()
        .attrs()
        .find(|(attr, _)| *attr == name)
        .map(|(_, value)| value)
}

/// Concatenated, trimmed text content
pub(crate) fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}
