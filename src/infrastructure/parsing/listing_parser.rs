//! Results listing parser
//!
//! Turns a season or daily results page into `Match` rows in page order,
//! plus the link to the next listing page when the site paginates.

use std::sync::Arc;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::config::{ListingSelectors, compile_selector};
use super::context::{ListingContext, ListingKind};
use super::error::{ParsingError, ParsingResult};
use super::rules;
use super::tables::ExtractionTables;
use super::{attribute, element_text};
use crate::domain::Match;
use crate::domain::constants::site;

/// Outcome of parsing one listing page
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub matches: Vec<Match>,
    /// Rows rejected for a missing link, bad score or foreign league/season
    pub skipped_rows: usize,
    pub next_page: Option<String>,
}

pub struct ListingParser {
    match_table: Selector,
    date_caption: Selector,
    match_row: Selector,
    kickoff_time: Selector,
    home_team: Selector,
    away_team: Selector,
    score: Selector,
    match_link: Selector,
    next_page: Selector,
    score_separator: String,
    tables: Arc<ExtractionTables>,
}

impl ListingParser {
    /// Create parser with custom selector configuration
    pub fn with_config(
        selectors: &ListingSelectors,
        tables: Arc<ExtractionTables>,
    ) -> ParsingResult<Self> {
        Ok(Self {
            match_table: compile_selector(&selectors.match_table)?,
            date_caption: compile_selector(&selectors.date_caption)?,
            match_row: compile_selector(&selectors.match_row)?,
            kickoff_time: compile_selector(&selectors.kickoff_time)?,
            home_team: compile_selector(&selectors.home_team)?,
            away_team: compile_selector(&selectors.away_team)?,
            score: compile_selector(&selectors.score)?,
            match_link: compile_selector(&selectors.match_link)?,
            next_page: compile_selector(&selectors.next_page)?,
            score_separator: selectors.score_separator.clone(),
            tables,
        })
    }

    /// Parses one listing page body
    pub fn parse(&self, body: &str, ctx: &ListingContext) -> ParsingResult<ListingPage> {
        let html = Html::parse_document(body);
        let mut page = ListingPage::default();

        for table in html.select(&self.match_table) {
            let date = self.table_date(&table, ctx)?;
            for row in table.select(&self.match_row) {
                match self.parse_row(&row, &date, ctx) {
                    Some(m) => page.matches.push(m),
                    None => page.skipped_rows += 1,
                }
            }
        }

        page.next_page = html
            .select(&self.next_page)
            .find_map(|link| attribute(&link, "href"))
            .map(|href| ctx.resolve(href))
            .transpose()?;

        debug!(
            "Parsed {} matches ({} skipped) from {}",
            page.matches.len(),
            page.skipped_rows,
            ctx.page_url
        );
        Ok(page)
    }

    fn table_date(&self, table: &ElementRef, ctx: &ListingContext) -> ParsingResult<String> {
        match &ctx.kind {
            ListingKind::Day { date } => Ok(date.clone()),
            ListingKind::Season { season, .. } => {
                let caption = table
                    .select(&self.date_caption)
                    .next()
                    .map(|el| element_text(&el))
                    .ok_or_else(|| {
                        ParsingError::required_field_missing("date_caption", Some(&ctx.page_url))
                    })?;
                Ok(rules::parse_listing_date(season, &caption, &self.tables)?)
            }
        }
    }

    fn parse_row(&self, row: &ElementRef, date: &str, ctx: &ListingContext) -> Option<Match> {
        let Some(href) = row
            .select(&self.match_link)
            .find_map(|link| attribute(&link, "href"))
        else {
            warn!("Listing row without a match link on {}", ctx.page_url);
            return None;
        };

        let (Some(id), Some((league_id, season))) = (
            rules::match_id_from_url(href),
            rules::league_and_season_from_url(href),
        ) else {
            warn!("Unrecognised match link '{}' on {}", href, ctx.page_url);
            return None;
        };

        if let ListingKind::Season {
            league_id: expected_league,
            season: expected_season,
        } = &ctx.kind
        {
            if &league_id != expected_league || &season != expected_season {
                warn!(
                    "Skipping match {}: listed under {}-{} but links to {}-{}",
                    id, expected_league, expected_season, league_id, season
                );
                return None;
            }
        }

        let score = self.text(row, &self.score);
        let Some((home_score, away_score)) = score.split_once(self.score_separator.as_str())
        else {
            warn!("Skipping match {}: no final score in '{}'", id, score);
            return None;
        };

        Some(Match {
            id,
            season,
            match_date: date.to_string(),
            match_time: self.text(row, &self.kickoff_time),
            league_id,
            home_team_name: self.text(row, &self.home_team),
            away_team_name: self.text(row, &self.away_team),
            home_score: home_score.trim().to_string(),
            away_score: away_score.trim().to_string(),
            url: format!(
                "{}{}",
                site::absolute_url(&ctx.base_url, href),
                site::MATCH_PLAYER_STATS_SUFFIX
            ),
            is_crawled: false,
        })
    }

    fn text(&self, row: &ElementRef, selector: &Selector) -> String {
        row.select(selector)
            .next()
            .map(|el| element_text(&el))
            .unwrap_or_default()
    }
}
