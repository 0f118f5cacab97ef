//! Extraction rules
//!
//! Pure mappings from raw page strings to typed fields: fixture dates,
//! identifiers embedded in URLs, event timing, event classification and
//! pitch coordinates. Nothing in here touches the network or a document.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use super::error::ExtractionError;
use super::tables::ExtractionTables;
use crate::domain::{EventType, Point};

static MATCH_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"statszone/.*/matches/(\d+)").expect("static regex"));

static PLAYER_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"statszone/.*/matches/.*/player-stats/(\d+)").expect("static regex")
});

static LEAGUE_SEASON_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"statszone/(\d+)-(\d+)/").expect("static regex"));

static EVENT_TIME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"timer-(\d)-(\d+)").expect("static regex"));

static DIRECTIONAL_MARKER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"url\(#([\w-]+)\)").expect("static regex"));

static ICON_MARKER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"icons/([\w-]+)\.png").expect("static regex"));

/// First month (August) that still belongs to the season's starting year
const SEASON_START_MONTH: u32 = 8;

/// Builds the calendar date of a fixture.
///
/// A season labelled `2016` runs from August 2016 to July 2017.
pub fn construct_date(season: &str, month: u32, day: u32) -> Result<NaiveDate, ExtractionError> {
    let season_year: i32 = season
        .trim()
        .parse()
        .map_err(|_| ExtractionError::InvalidSeason(season.to_string()))?;

    let year = if month >= SEASON_START_MONTH {
        season_year
    } else {
        season_year + 1
    };

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| ExtractionError::InvalidDate {
        season: season.to_string(),
        month,
        day,
    })
}

/// Decodes a listing caption like `"Saturday 13th August"` into `YYYY-MM-DD`
pub fn parse_listing_date(
    season: &str,
    caption: &str,
    tables: &ExtractionTables,
) -> Result<String, ExtractionError> {
    let tokens: Vec<&str> = caption.split_whitespace().collect();
    let invalid = || ExtractionError::InvalidDateCaption(caption.trim().to_string());

    let (day_token, month_token) = match tokens.as_slice() {
        [_, day, month, ..] => (*day, *month),
        _ => return Err(invalid()),
    };

    let day: u32 = day_token
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .map_err(|_| invalid())?;
    let month = tables.month(month_token).ok_or_else(invalid)?;

    Ok(construct_date(season, month, day)?.format("%Y-%m-%d").to_string())
}

/// First capture group of `pattern` in `url`, if any
#[must_use]
pub fn extract_id(url: &str, pattern: &Regex) -> Option<String> {
    pattern
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[must_use]
pub fn match_id_from_url(url: &str) -> Option<String> {
    extract_id(url, &MATCH_ID_PATTERN)
}

#[must_use]
pub fn player_id_from_url(url: &str) -> Option<String> {
    extract_id(url, &PLAYER_ID_PATTERN)
}

/// `(league_id, season)` from a match URL such as `/statszone/8-2016/matches/...`
#[must_use]
pub fn league_and_season_from_url(url: &str) -> Option<(String, String)> {
    let caps = LEAGUE_SEASON_PATTERN.captures(url)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTime {
    pub half: String,
    pub minute: String,
}

/// Decodes the `timer-<half>-<minute>` token of a marker's class list
#[must_use]
pub fn event_time(class_list: &str) -> Option<EventTime> {
    let caps = EVENT_TIME_PATTERN.captures(class_list)?;
    Some(EventTime {
        half: caps[1].to_string(),
        minute: caps[2].to_string(),
    })
}

/// Token of a directional marker, `url(#smallblue)` → `smallblue`
#[must_use]
pub fn directional_marker_token(marker_end: &str) -> Option<&str> {
    DIRECTIONAL_MARKER_PATTERN
        .captures(marker_end)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Token of an icon marker, `.../icons/won.png` → `won`
#[must_use]
pub fn icon_marker_token(href: &str) -> Option<&str> {
    ICON_MARKER_PATTERN
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Total over every input: tokens outside the vocabulary are `Unknown`
#[must_use]
pub fn classify_event(token: Option<&str>, tables: &ExtractionTables) -> EventType {
    token
        .and_then(|t| tables.event_type(t))
        .unwrap_or(EventType::Unknown)
}

fn decode_coordinate(attribute: &str, value: Option<&str>) -> Result<f64, ExtractionError> {
    match value {
        None => Ok(Point::NONE.x),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ExtractionError::InvalidCoordinate {
                attribute: attribute.to_string(),
                value: raw.to_string(),
            }),
    }
}

fn decode_point<'a>(
    attr: &impl Fn(&str) -> Option<&'a str>,
    x_name: &str,
    y_name: &str,
) -> Result<Point, ExtractionError> {
    Ok(Point::new(
        decode_coordinate(x_name, attr(x_name))?,
        decode_coordinate(y_name, attr(y_name))?,
    ))
}

/// Icon marker: one `(x, y)` point duplicated into start and end
pub fn decode_single_point<'a>(
    attr: impl Fn(&str) -> Option<&'a str>,
) -> Result<(Point, Point), ExtractionError> {
    let point = decode_point(&attr, "x", "y")?;
    Ok((point, point))
}

/// Directional marker: `(x1, y1)` → `(x2, y2)`
pub fn decode_start_end_points<'a>(
    attr: impl Fn(&str) -> Option<&'a str>,
) -> Result<(Point, Point), ExtractionError> {
    Ok((decode_point(&attr, "x1", "y1")?, decode_point(&attr, "x2", "y2")?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn tables() -> ExtractionTables {
        ExtractionTables::new()
    }

    #[test]
    fn autumn_months_stay_in_season_year() {
        let date = construct_date("2016", 8, 13).unwrap();
        assert_eq!(date.to_string(), "2016-08-13");
    }

    #[test]
    fn spring_months_roll_into_next_year() {
        let date = construct_date("2016", 5, 21).unwrap();
        assert_eq!(date.to_string(), "2017-05-21");
    }

    #[test]
    fn non_numeric_season_is_rejected() {
        assert_eq!(
            construct_date("16/17", 9, 1),
            Err(ExtractionError::InvalidSeason("16/17".to_string()))
        );
    }

    #[test]
    fn impossible_day_is_rejected() {
        assert!(matches!(
            construct_date("2016", 2, 30),
            Err(ExtractionError::InvalidDate { .. })
        ));
    }

    #[test]
    fn listing_caption_is_decoded() {
        let date = parse_listing_date("2016", "Saturday 13th August", &tables()).unwrap();
        assert_eq!(date, "2016-08-13");

        let date = parse_listing_date("2016", " Sunday 1st January ", &tables()).unwrap();
        assert_eq!(date, "2017-01-01");
    }

    #[test]
    fn malformed_caption_is_an_error() {
        assert!(parse_listing_date("2016", "August", &tables()).is_err());
        assert!(parse_listing_date("2016", "Monday 3rd Augst", &tables()).is_err());
    }

    #[test]
    fn match_and_league_ids_from_url() {
        let url = "/statszone/8-2016/matches/12345/player-stats#tabs-wrapper-anchor";
        assert_eq!(match_id_from_url(url).as_deref(), Some("12345"));
        assert_eq!(
            league_and_season_from_url(url),
            Some(("8".to_string(), "2016".to_string()))
        );
    }

    #[test]
    fn player_id_from_url_uses_player_stats_segment() {
        let url = "/statszone/8-2016/matches/12345/player-stats/4321/OVERALL_02";
        assert_eq!(player_id_from_url(url).as_deref(), Some("4321"));
        assert_eq!(player_id_from_url("/statszone/8-2016/matches/12345"), None);
    }

    #[test]
    fn unrecognised_urls_yield_nothing() {
        assert_eq!(match_id_from_url("/news/some-article"), None);
        assert_eq!(league_and_season_from_url("/statszone/results"), None);
    }

    #[test]
    fn event_time_is_decoded_from_class_list() {
        assert_eq!(
            event_time("pitch-object timer-2-67"),
            Some(EventTime { half: "2".into(), minute: "67".into() })
        );
        assert_eq!(event_time("pitch-object"), None);
    }

    #[test]
    fn marker_tokens() {
        assert_eq!(directional_marker_token("url(#smallblue)"), Some("smallblue"));
        assert_eq!(
            icon_marker_token("/sites/fourfourtwo.com/modules/custom/statzone/files/icons/error-leading-goal.png"),
            Some("error-leading-goal")
        );
        assert_eq!(icon_marker_token("/img/logo.svg"), None);
    }

    #[rstest]
    #[case("smallblue", EventType::PassSuccess)]
    #[case("smalldeepskyblue", EventType::PassChanceCreated)]
    #[case("bigdarkgrey", EventType::ShotBlocked)]
    #[case("won", EventType::AerialDuelWon)]
    #[case("commited", EventType::FoulCommited)]
    #[case("defensive-ball-recovery", EventType::DefBallRecovery)]
    #[case("blocks-cross", EventType::DefBlockCross)]
    #[case("purple", EventType::Unknown)]
    fn classification(#[case] token: &str, #[case] expected: EventType) {
        assert_eq!(classify_event(Some(token), &tables()), expected);
    }

    #[test]
    fn missing_token_is_unknown() {
        assert_eq!(classify_event(None, &tables()), EventType::Unknown);
    }

    #[test]
    fn single_point_is_duplicated() {
        let attrs: HashMap<&str, &str> = [("x", "50"), ("y", "60")].into_iter().collect();
        let (start, end) = decode_single_point(|name| attrs.get(name).copied()).unwrap();
        assert_eq!(start, Point::new(50.0, 60.0));
        assert_eq!(start, end);
    }

    #[test]
    fn directional_points_are_distinct() {
        let attrs: HashMap<&str, &str> =
            [("x1", "100"), ("y1", "200"), ("x2", "300"), ("y2", "400")].into_iter().collect();
        let (start, end) = decode_start_end_points(|name| attrs.get(name).copied()).unwrap();
        assert_eq!(start, Point::new(100.0, 200.0));
        assert_eq!(end, Point::new(300.0, 400.0));
    }

    #[test]
    fn missing_coordinates_fall_back_to_sentinel() {
        let attrs: HashMap<&str, &str> = [("x1", "10.5")].into_iter().collect();
        let (start, end) = decode_start_end_points(|name| attrs.get(name).copied()).unwrap();
        assert_eq!(start, Point::new(10.5, -1.0));
        assert!(end.is_none());
    }

    #[test]
    fn garbage_coordinate_is_an_error() {
        let attrs: HashMap<&str, &str> = [("x", "left"), ("y", "1")].into_iter().collect();
        assert!(matches!(
            decode_single_point(|name| attrs.get(name).copied()),
            Err(ExtractionError::InvalidCoordinate { .. })
        ));
    }

    proptest! {
        #[test]
        fn season_year_mapping(season in 1990i32..2100, month in 1u32..=12) {
            let date = construct_date(&season.to_string(), month, 1).unwrap();
            let expected = if month >= 8 { season } else { season + 1 };
            prop_assert_eq!(chrono::Datelike::year(&date), expected);
        }

        #[test]
        fn id_extraction_is_stable_and_total(url in ".*") {
            let first = match_id_from_url(&url);
            prop_assert_eq!(first, match_id_from_url(&url));
            let _ = player_id_from_url(&url);
            let _ = league_and_season_from_url(&url);
        }

        #[test]
        fn classification_is_total(token in "[a-z_-]{0,24}") {
            let tables = ExtractionTables::new();
            let event = classify_event(Some(&token), &tables);
            let known = tables.event_type(&token).is_some();
            prop_assert_eq!(event == EventType::Unknown, !known);
        }
    }
}
