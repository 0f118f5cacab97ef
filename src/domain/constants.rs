//! 사이트 특성 및 도메인 상수들
//!
//! Stats zone site characteristics and the static league seed data.

/// Stats zone 사이트 특성 상수들
pub mod site {
    /// 사이트 기본 URL
    pub const BASE_URL: &str = "http://www.fourfourtwo.com";

    /// Season results listing (placeholders: league id, season)
    pub const SEASON_RESULTS_PATH: &str = "/statszone/results/{league}-{season}";

    /// Daily fixtures listing (placeholder: YYYY-MM-DD)
    pub const DAY_RESULTS_PATH: &str = "/statszone?date_req={date}";

    /// Suffix appended to a listing href to land on the player stats tab
    pub const MATCH_PLAYER_STATS_SUFFIX: &str = "/player-stats#tabs-wrapper-anchor";

    /// Builds the season results URL for a league
    #[must_use]
    pub fn season_results_url(base_url: &str, league_id: &str, season: &str) -> String {
        let path = SEASON_RESULTS_PATH
            .replace("{league}", league_id)
            .replace("{season}", season);
        format!("{}{}", base_url.trim_end_matches('/'), path)
    }

    /// Builds the daily fixtures URL
    #[must_use]
    pub fn day_results_url(base_url: &str, date: &str) -> String {
        format!(
            "{}{}",
            base_url.trim_end_matches('/'),
            DAY_RESULTS_PATH.replace("{date}", date)
        )
    }

    /// Joins a site-relative href onto the base URL
    #[must_use]
    pub fn absolute_url(base_url: &str, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else {
            format!("{}{}", base_url.trim_end_matches('/'), href)
        }
    }
}

/// League seed data (id, name)
pub mod leagues {
    pub const SEED: &[(&str, &str)] = &[
        ("23", "La Liga"),
        ("8", "Premier League"),
        ("21", "Serie A"),
        ("22", "Bundesliga"),
        ("24", "Ligue 1"),
        ("5", "UEFA Champions League"),
    ];
}
