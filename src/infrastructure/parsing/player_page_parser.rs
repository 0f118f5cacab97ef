//! Player detail page parser
//!
//! Every `.pitch-object` on the page is one event. Markers with a
//! `marker-end` attribute are arrows (start → end); the rest are icons placed
//! at a single point.

use std::sync::Arc;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::config::{PlayerPageSelectors, compile_selector};
use super::error::{ParsingError, ParsingResult};
use super::rules;
use super::tables::ExtractionTables;
use super::{attribute, element_text};
use crate::domain::PlayerEvent;

/// Everything a player's page contributes to a `PlayerStats`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlayerPage {
    pub player_name: String,
    pub events: Vec<PlayerEvent>,
}

pub struct PlayerPageParser {
    pitch_object: Selector,
    player_name: Selector,
    tables: Arc<ExtractionTables>,
}

impl PlayerPageParser {
    pub fn with_config(
        selectors: &PlayerPageSelectors,
        tables: Arc<ExtractionTables>,
    ) -> ParsingResult<Self> {
        Ok(Self {
            pitch_object: compile_selector(&selectors.pitch_object)?,
            player_name: compile_selector(&selectors.player_name)?,
            tables,
        })
    }

    pub fn parse(&self, body: &str) -> ParsingResult<PlayerPage> {
        let html = Html::parse_document(body);

        let events = html
            .select(&self.pitch_object)
            .map(|marker| self.parse_event(&marker))
            .collect::<ParsingResult<Vec<_>>>()?;

        let player_name = html
            .select(&self.player_name)
            .next()
            .map(|el| element_text(&el))
            .unwrap_or_default();
        if player_name.is_empty() {
            warn!("Player page without a display name");
        }

        debug!("Extracted {} events for {}", events.len(), player_name);
        Ok(PlayerPage {
            player_name,
            events,
        })
    }

    fn parse_event(&self, marker: &ElementRef) -> ParsingResult<PlayerEvent> {
        let class_list = attribute(marker, "class").unwrap_or_default();
        let time = rules::event_time(class_list).ok_or_else(|| {
            ParsingError::required_field_missing("timer-<half>-<minute>", Some(class_list))
        })?;

        let lookup = |name: &str| attribute(marker, name);
        let (token, (start, end)) = match attribute(marker, "marker-end") {
            Some(marker_end) => (
                rules::directional_marker_token(marker_end),
                rules::decode_start_end_points(lookup)?,
            ),
            None => (
                attribute(marker, "href").and_then(rules::icon_marker_token),
                rules::decode_single_point(lookup)?,
            ),
        };

        Ok(PlayerEvent {
            half: time.half,
            minute: time.minute,
            event_type: rules::classify_event(token, &self.tables),
            start,
            end,
        })
    }
}
