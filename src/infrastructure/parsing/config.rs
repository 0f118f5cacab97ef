//! Parsing configuration for HTML extraction
//!
//! Centralized CSS selectors for the stats zone pages. Site markup lives here
//! (and in the user's config file) rather than in the parsers.

use scraper::Selector;
use serde::{Deserialize, Serialize};

use super::error::{ParsingError, ParsingResult};

/// Every selector the page parsers use
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub listing: ListingSelectors,
    pub lineup: LineupSelectors,
    pub player_page: PlayerPageSelectors,
}

impl SelectorConfig {
    /// Compiles every selector once, reporting the first invalid one
    pub fn validate(&self) -> ParsingResult<()> {
        self.listing.validate()?;
        self.lineup.validate()?;
        self.player_page.validate()
    }
}

/// Results listing pages (season or day)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingSelectors {
    /// One table per fixture day (season listing) or per league (day listing)
    pub match_table: String,
    pub date_caption: String,
    pub match_row: String,
    pub kickoff_time: String,
    pub home_team: String,
    pub away_team: String,
    pub score: String,
    pub match_link: String,
    /// Link to the following listing page, if the site paginates
    pub next_page: String,
    pub score_separator: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            match_table: ".match-table".to_string(),
            date_caption: "caption span".to_string(),
            match_row: "tbody .link".to_string(),
            kickoff_time: ".time".to_string(),
            home_team: ".home-team".to_string(),
            away_team: ".away-team".to_string(),
            score: ".score".to_string(),
            match_link: ".link-to-match a".to_string(),
            next_page: ".pager-next a".to_string(),
            score_separator: " - ".to_string(),
        }
    }
}

impl ListingSelectors {
    fn validate(&self) -> ParsingResult<()> {
        for selector in [
            &self.match_table,
            &self.date_caption,
            &self.match_row,
            &self.kickoff_time,
            &self.home_team,
            &self.away_team,
            &self.score,
            &self.match_link,
            &self.next_page,
        ] {
            compile_selector(selector)?;
        }
        Ok(())
    }
}

/// Match detail page line-ups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineupSelectors {
    pub starter: String,
    pub starter_link: String,
    pub substitute_group: String,
    pub substitute_slot: String,
    pub substitute_link: String,
    /// Class that marks an element as belonging to the home side
    pub home_class: String,
}

impl Default for LineupSelectors {
    fn default() -> Self {
        Self {
            starter: ".lineup".to_string(),
            starter_link: "span a".to_string(),
            substitute_group: "#substitutes .subs".to_string(),
            substitute_slot: "li".to_string(),
            substitute_link: "div ul .first a".to_string(),
            home_class: "home".to_string(),
        }
    }
}

impl LineupSelectors {
    fn validate(&self) -> ParsingResult<()> {
        for selector in [
            &self.starter,
            &self.starter_link,
            &self.substitute_group,
            &self.substitute_slot,
            &self.substitute_link,
        ] {
            compile_selector(selector)?;
        }
        Ok(())
    }
}

/// Player detail page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerPageSelectors {
    pub pitch_object: String,
    pub player_name: String,
}

impl Default for PlayerPageSelectors {
    fn default() -> Self {
        Self {
            pitch_object: ".pitch-object".to_string(),
            player_name: "#statzone_player_header h1".to_string(),
        }
    }
}

impl PlayerPageSelectors {
    fn validate(&self) -> ParsingResult<()> {
        compile_selector(&self.pitch_object)?;
        compile_selector(&self.player_name)?;
        Ok(())
    }
}

/// Compile one selector string, mapping failure into `ParsingError`
pub fn compile_selector(selector: &str) -> ParsingResult<Selector> {
    Selector::parse(selector).map_err(|e| ParsingError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}
