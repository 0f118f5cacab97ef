//! # Season Discovery
//!
//! Walks a results listing (season or single day), following the pager until
//! it runs out or the page limit is hit, and returns the matches in page order.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use super::{WorkerContext, WorkerError};
use crate::domain::Match;
use crate::domain::constants::site;
use crate::infrastructure::parsing::ListingContext;

pub struct SeasonDiscovery {
    ctx: WorkerContext,
    base_url: String,
    max_listing_pages: u32,
}

impl SeasonDiscovery {
    pub fn new(ctx: WorkerContext, base_url: impl Into<String>, max_listing_pages: u32) -> Self {
        Self {
            ctx,
            base_url: base_url.into(),
            max_listing_pages,
        }
    }

    /// All matches listed for one league season
    pub async fn discover_season(
        &self,
        league_id: &str,
        season: &str,
    ) -> Result<Vec<Match>, WorkerError> {
        info!("🔍 Discovering league {} season {}", league_id, season);
        let start_url = site::season_results_url(&self.base_url, league_id, season);
        self.walk_listing(start_url, |page_url| {
            ListingContext::season(&self.base_url, page_url, league_id, season)
        })
        .await
    }

    /// All matches listed for one day, across leagues
    pub async fn discover_day(&self, date: &str) -> Result<Vec<Match>, WorkerError> {
        info!("🔍 Discovering fixtures of {}", date);
        let start_url = site::day_results_url(&self.base_url, date);
        self.walk_listing(start_url, |page_url| {
            ListingContext::day(&self.base_url, page_url, date)
        })
        .await
    }

    async fn walk_listing(
        &self,
        start_url: String,
        context_for: impl Fn(&str) -> ListingContext,
    ) -> Result<Vec<Match>, WorkerError> {
        let mut matches = Vec::new();
        let mut visited = HashSet::new();
        let mut next_url = Some(start_url);
        let mut pages = 0u32;

        while let Some(url) = next_url.take() {
            if pages >= self.max_listing_pages {
                warn!(
                    "Listing page limit ({}) reached, not following {}",
                    self.max_listing_pages, url
                );
                break;
            }
            if !visited.insert(url.clone()) {
                warn!("Pager points back to {}, stopping", url);
                break;
            }

            let body = self.ctx.fetch(&url).await?;
            let page = self.ctx.parsers.listing.parse(&body, &context_for(&url))?;
            pages += 1;

            debug!(
                "📄 {} → {} matches ({} rows skipped)",
                url,
                page.matches.len(),
                page.skipped_rows
            );
            self.ctx
                .shared_state
                .update_stats(|s| s.listing_pages_fetched += 1)
                .await;

            matches.extend(page.matches);
            next_url = page.next_page;
        }

        let discovered = matches.len() as u64;
        self.ctx
            .shared_state
            .update_stats(|s| s.matches_discovered += discovered)
            .await;
        info!("✅ Discovered {} matches on {} listing page(s)", discovered, pages);
        Ok(matches)
    }
}
