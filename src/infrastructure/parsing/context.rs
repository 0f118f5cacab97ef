//! Parsing context for listing pages
//!
//! Carries what a listing parser needs to know about the page it is reading
//! but cannot find in the markup itself.

use url::Url;

use super::error::{ParsingError, ParsingResult};

/// Which kind of listing is being parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingKind {
    /// `/statszone/results/{league}-{season}`: one table per fixture day,
    /// dated by its caption. Rows from another league or season are rejected.
    Season { league_id: String, season: String },

    /// `/statszone?date_req={date}`: one table per league, every row on `date`
    Day { date: String },
}

#[derive(Debug, Clone)]
pub struct ListingContext {
    /// Site root used to build canonical match URLs
    pub base_url: String,

    /// URL of the page being parsed, for resolving relative pagination links
    pub page_url: String,

    pub kind: ListingKind,
}

impl ListingContext {
    pub fn season(
        base_url: impl Into<String>,
        page_url: impl Into<String>,
        league_id: impl Into<String>,
        season: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            page_url: page_url.into(),
            kind: ListingKind::Season {
                league_id: league_id.into(),
                season: season.into(),
            },
        }
    }

    pub fn day(
        base_url: impl Into<String>,
        page_url: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            page_url: page_url.into(),
            kind: ListingKind::Day { date: date.into() },
        }
    }

    /// Resolves a link found on this page into an absolute URL
    pub fn resolve(&self, href: &str) -> ParsingResult<String> {
        let invalid = |reason: String| ParsingError::InvalidUrl {
            href: href.to_string(),
            reason,
        };
        let page = Url::parse(&self.page_url).map_err(|e| invalid(e.to_string()))?;
        page.join(href)
            .map(|url| url.to_string())
            .map_err(|e| invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_links_resolve_against_page() {
        let ctx = ListingContext::season(
            "http://www.fourfourtwo.com",
            "http://www.fourfourtwo.com/statszone/results/8-2016",
            "8",
            "2016",
        );
        assert_eq!(
            ctx.resolve("?page=1").unwrap(),
            "http://www.fourfourtwo.com/statszone/results/8-2016?page=1"
        );
        assert_eq!(
            ctx.resolve("/statszone/results/8-2016?page=2").unwrap(),
            "http://www.fourfourtwo.com/statszone/results/8-2016?page=2"
        );
    }

    #[test]
    fn unparsable_page_url_is_an_error() {
        let ctx = ListingContext::day("x", "not a url", "2016-09-10");
        assert!(matches!(ctx.resolve("/a"), Err(ParsingError::InvalidUrl { .. })));
    }
}
