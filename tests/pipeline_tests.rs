//! End-to-end pipeline tests against canned pages
//!
//! A `PageFetcher` serving fixed HTML by URL drives the whole crawl:
//! discovery over two listing pages, deduplication, line-up fan-out, player
//! pages and persistence into the in-memory and SQLite stores.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use statszone_crawler::crawling::{
    CrawlingOrchestrator, OrchestratorConfig, OrchestratorError, SharedState, WorkerError,
};
use statszone_crawler::domain::{EventType, FetchError, PageFetcher, Point, Store};
use statszone_crawler::infrastructure::config::FailurePolicy;
use statszone_crawler::infrastructure::{
    DatabaseConnection, ExtractionTables, InMemoryStore, PageParsers, SqliteStore,
};
use statszone_crawler::infrastructure::parsing::{ParsingError, SelectorConfig};
use tempfile::tempdir;

const BASE: &str = "http://stats.test";

/// Serves canned bodies; unknown URLs answer 404
#[derive(Default)]
struct CannedFetcher {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl CannedFetcher {
    fn without(mut self, url: &str) -> Self {
        self.pages.remove(url);
        self
    }

    fn request_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }
}

#[async_trait]
impl PageFetcher for CannedFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        tokio::task::yield_now().await;
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::HttpStatus {
                status: 404,
                url: url.to_string(),
            })
    }
}

fn season_url() -> String {
    format!("{BASE}/statszone/results/8-2016")
}

fn season_page_two_url() -> String {
    format!("{BASE}/statszone/results/8-2016?page=1")
}

fn match_url(id: &str) -> String {
    format!("{BASE}/statszone/8-2016/matches/{id}/player-stats#tabs-wrapper-anchor")
}

fn player_href(match_id: &str, player_id: &str) -> String {
    format!("/statszone/8-2016/matches/{match_id}/player-stats/{player_id}/OVERALL_02")
}

fn player_url(match_id: &str, player_id: &str) -> String {
    format!("{BASE}{}", player_href(match_id, player_id))
}

fn listing_row(id: &str, home: &str, away: &str, score: &str) -> String {
    format!(
        r#"<tr class="link">
             <td class="time">15:00</td>
             <td class="home-team">{home}</td>
             <td class="score">{score}</td>
             <td class="away-team">{away}</td>
             <td class="link-to-match"><a href="/statszone/8-2016/matches/{id}">Stats</a></td>
           </tr>"#
    )
}

fn listing_table(caption: &str, rows: &[String]) -> String {
    format!(
        r#"<table class="match-table"><caption><span>{caption}</span></caption>
             <tbody>{}</tbody></table>"#,
        rows.concat()
    )
}

/// Two home starters, one away starter, one used and one unused home substitute
fn match_page(match_id: &str) -> String {
    let link = |player: &str, name: &str| {
        format!(r#"<a href="{}">{name}</a>"#, player_href(match_id, player))
    };
    format!(
        r#"<html><body>
             <div class="lineup home"><span>{}</span></div>
             <div class="lineup away"><span>{}</span></div>
             <div class="lineup home"><span>{}</span></div>
             <div id="substitutes">
               <div class="home subs"><ul>
                 <li><div><ul><li class="first">{}</li></ul></div></li>
                 <li><div><ul><li class="first">Unused</li></ul></div></li>
               </ul></div>
             </div>
           </body></html>"#,
        link("1", "Home One"),
        link("2", "Away One"),
        link("3", "Home Two"),
        link("4", "Home Sub"),
    )
}

fn player_page(name: &str) -> String {
    format!(
        r#"<html><body>
             <div id="statzone_player_header"><h1>{name}</h1></div>
             <svg>
               <line class="pitch-object timer-1-23" x1="100" y1="200" x2="300" y2="400" marker-end="url(#smallblue)"></line>
               <image class="pitch-object timer-2-67" x="50" y="60" xlink:href="/sites/fourfourtwo.com/modules/custom/statzone/files/icons/won.png"></image>
             </svg>
           </body></html>"#
    )
}

/// Matches 100 and 101 on page one, 102 and a repeat of 100 on page two
fn season_fetcher() -> CannedFetcher {
    let mut pages = HashMap::new();
    pages.insert(
        season_url(),
        format!(
            r#"<html><body>{}<ul class="pager"><li class="pager-next"><a href="/statszone/results/8-2016?page=1">next</a></li></ul></body></html>"#,
            listing_table(
                "Saturday 13th August",
                &[
                    listing_row("100", "Team A", "Team B", "2 - 1"),
                    listing_row("101", "Team C", "Team D", "0 - 0"),
                ],
            )
        ),
    );
    pages.insert(
        season_page_two_url(),
        format!(
            "<html><body>{}</body></html>",
            listing_table(
                "Sunday 1st January",
                &[
                    listing_row("102", "Team E", "Team F", "1 - 3"),
                    listing_row("100", "Team A", "Team B", "2 - 1"),
                ],
            )
        ),
    );
    for match_id in ["100", "101", "102"] {
        pages.insert(match_url(match_id), match_page(match_id));
        for player in ["1", "2", "3", "4"] {
            pages.insert(
                player_url(match_id, player),
                player_page(&format!("Player {match_id}-{player}")),
            );
        }
    }
    CannedFetcher {
        pages,
        requests: Mutex::default(),
    }
}

/// Match 101 answers with a page that has no line-up at all
fn lineup_less_fetcher() -> CannedFetcher {
    let mut fetcher = season_fetcher();
    fetcher.pages.insert(
        match_url("101"),
        "<html><body><p>Match postponed</p></body></html>".to_string(),
    );
    fetcher
}

fn test_config(policy: FailurePolicy) -> OrchestratorConfig {
    OrchestratorConfig {
        league_id: "8".into(),
        season: "2016".into(),
        match_date: None,
        max_matches: None,
        failure_policy: policy,
        base_url: BASE.into(),
        max_listing_pages: 5,
        player_workers: 3,
        // small queues so the fan-out has to interleave sends and receives
        match_queue_capacity: 1,
        player_queue_capacity: 2,
        dedup_concurrency: 2,
        match_cooldown: Duration::ZERO,
        player_fetch_delay: Duration::ZERO,
    }
}

fn orchestrator(
    config: OrchestratorConfig,
    fetcher: Arc<CannedFetcher>,
    store: Arc<dyn Store>,
) -> CrawlingOrchestrator {
    let parsers = PageParsers::new(&SelectorConfig::default(), Arc::new(ExtractionTables::new()))
        .unwrap();
    CrawlingOrchestrator::new(
        config,
        fetcher,
        store,
        Arc::new(parsers),
        Arc::new(SharedState::new()),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn season_crawl_stores_every_match_player_and_event() {
    let store = Arc::new(InMemoryStore::new());
    let fetcher = Arc::new(season_fetcher());

    let stats = orchestrator(test_config(FailurePolicy::Supervised), fetcher.clone(), store.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(stats.listing_pages_fetched, 2);
    assert_eq!(stats.matches_discovered, 4);
    assert_eq!(stats.matches_skipped, 1);
    assert_eq!(stats.matches_queued, 3);
    assert_eq!(stats.matches_crawled, 3);
    assert_eq!(stats.player_tasks_dispatched, 12);
    assert_eq!(stats.players_crawled, 12);
    assert_eq!(stats.events_extracted, 24);

    let matches = store.matches().await;
    let ids: Vec<&str> = matches.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["100", "101", "102"]);
    assert!(matches.iter().all(|m| m.is_crawled));
    assert_eq!(matches[2].match_date, "2017-01-01");
    assert_eq!(fetcher.request_count(&match_url("100")), 1);

    assert_eq!(store.leagues().await.len(), 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn roster_is_reassembled_in_lineup_order() {
    let store = Arc::new(InMemoryStore::new());
    orchestrator(
        test_config(FailurePolicy::Supervised),
        Arc::new(season_fetcher()),
        store.clone(),
    )
    .run()
    .await
    .unwrap();

    let roster: Vec<_> = store
        .player_stats()
        .await
        .into_iter()
        .filter(|p| p.match_id == "100")
        .collect();
    let players: Vec<&str> = roster.iter().map(|p| p.player_id.as_str()).collect();
    assert_eq!(players, ["1", "2", "3", "4"]);

    let teams: Vec<&str> = roster.iter().map(|p| p.team_name.as_str()).collect();
    assert_eq!(teams, ["Team A", "Team B", "Team A", "Team A"]);
    assert_eq!(
        roster.iter().map(|p| p.is_substitute).collect::<Vec<_>>(),
        [false, false, false, true]
    );
    assert_eq!(roster[0].player_name, "Player 100-1");
    assert_eq!(roster[0].url, player_url("100", "1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn player_stats_ids_are_unique_and_gap_free() {
    let store = Arc::new(InMemoryStore::new());
    orchestrator(
        test_config(FailurePolicy::Supervised),
        Arc::new(season_fetcher()),
        store.clone(),
    )
    .run()
    .await
    .unwrap();

    let ids: Vec<i64> = store.player_stats().await.iter().map(|p| p.id).collect();
    assert_eq!(ids, (1..=12).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_event_points_at_a_stored_player() {
    let store = Arc::new(InMemoryStore::new());
    orchestrator(
        test_config(FailurePolicy::Supervised),
        Arc::new(season_fetcher()),
        store.clone(),
    )
    .run()
    .await
    .unwrap();

    let parents: HashSet<i64> = store.player_stats().await.iter().map(|p| p.id).collect();
    let events = store.player_events().await;
    assert_eq!(events.len(), 24);
    assert!(events.iter().all(|e| parents.contains(&e.player_stats_id)));

    let first = &events[0].event;
    assert_eq!(first.event_type, EventType::PassSuccess);
    assert_eq!(first.start, Point::new(100.0, 200.0));
    assert_eq!(first.end, Point::new(300.0, 400.0));
    let second = &events[1].event;
    assert_eq!(second.event_type, EventType::AerialDuelWon);
    assert_eq!(second.start, second.end);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn second_run_inserts_nothing_new() {
    let store = Arc::new(InMemoryStore::new());
    let fetcher = Arc::new(season_fetcher());

    orchestrator(test_config(FailurePolicy::Supervised), fetcher.clone(), store.clone())
        .run()
        .await
        .unwrap();
    let again = orchestrator(test_config(FailurePolicy::Supervised), fetcher.clone(), store.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(again.matches_skipped, 4);
    assert_eq!(again.matches_crawled, 0);
    assert_eq!(store.matches().await.len(), 3);
    assert_eq!(store.player_stats().await.len(), 12);
    assert_eq!(fetcher.request_count(&match_url("100")), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn ids_continue_after_previous_run() {
    let store = Arc::new(InMemoryStore::new());
    let fetcher = Arc::new(season_fetcher());

    let mut limited = test_config(FailurePolicy::Supervised);
    limited.max_matches = Some(1);
    let first = orchestrator(limited, fetcher.clone(), store.clone())
        .run()
        .await
        .unwrap();
    assert_eq!(first.matches_crawled, 1);

    orchestrator(test_config(FailurePolicy::Supervised), fetcher, store.clone())
        .run()
        .await
        .unwrap();

    let ids: Vec<i64> = store.player_stats().await.iter().map(|p| p.id).collect();
    assert_eq!(ids, (1..=12).collect::<Vec<_>>());
    let later: Vec<i64> = store
        .player_stats()
        .await
        .iter()
        .filter(|p| p.match_id != "100")
        .map(|p| p.id)
        .collect();
    assert!(later.iter().all(|id| *id > 4));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn supervised_run_skips_a_missing_player_page() {
    let store = Arc::new(InMemoryStore::new());
    let fetcher = Arc::new(season_fetcher().without(&player_url("101", "2")));

    let stats = orchestrator(test_config(FailurePolicy::Supervised), fetcher, store.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(stats.matches_crawled, 3);
    assert_eq!(stats.player_tasks_dispatched, 12);
    assert_eq!(stats.players_failed, 1);
    assert_eq!(stats.players_crawled, 11);

    let roster_101: Vec<String> = store
        .player_stats()
        .await
        .into_iter()
        .filter(|p| p.match_id == "101")
        .map(|p| p.player_id)
        .collect();
    assert_eq!(roster_101, ["1", "3", "4"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn supervised_run_leaves_failed_match_uncrawled() {
    let store = Arc::new(InMemoryStore::new());
    let fetcher = Arc::new(season_fetcher().without(&match_url("101")));

    let stats = orchestrator(test_config(FailurePolicy::Supervised), fetcher, store.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(stats.matches_crawled, 2);
    assert_eq!(stats.matches_failed, 1);

    let matches = store.matches().await;
    let failed = matches.iter().find(|m| m.id == "101").unwrap();
    assert!(!failed.is_crawled);
    assert!(
        store
            .player_stats()
            .await
            .iter()
            .all(|p| p.match_id != "101")
    );
    assert!(matches.iter().filter(|m| m.id != "101").all(|m| m.is_crawled));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fail_fast_run_stops_at_first_failure() {
    let store = Arc::new(InMemoryStore::new());
    let fetcher = Arc::new(season_fetcher().without(&match_url("101")));

    let result = orchestrator(test_config(FailurePolicy::FailFast), fetcher, store.clone())
        .run()
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, OrchestratorError::Stage { .. }), "{err}");
    assert!(!err.is_cancellation());

    let matches = store.matches().await;
    assert!(matches.iter().all(|m| m.id != "102"));
    assert!(matches.iter().any(|m| m.id == "100" && m.is_crawled));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn match_page_without_lineup_stays_uncrawled() {
    let store = Arc::new(InMemoryStore::new());

    let stats = orchestrator(
        test_config(FailurePolicy::Supervised),
        Arc::new(lineup_less_fetcher()),
        store.clone(),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(stats.matches_crawled, 2);
    assert_eq!(stats.matches_failed, 1);
    assert_eq!(stats.player_tasks_dispatched, 8);

    let matches = store.matches().await;
    let empty = matches.iter().find(|m| m.id == "101").unwrap();
    assert!(!empty.is_crawled);

    let players = store.player_stats().await;
    assert!(players.iter().all(|p| p.match_id != "101"));
    let ids: Vec<i64> = players.iter().map(|p| p.id).collect();
    assert_eq!(ids, (1..=8).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fail_fast_run_rejects_match_page_without_lineup() {
    let store = Arc::new(InMemoryStore::new());

    let err = orchestrator(
        test_config(FailurePolicy::FailFast),
        Arc::new(lineup_less_fetcher()),
        store.clone(),
    )
    .run()
    .await
    .unwrap_err();

    assert!(
        matches!(
            err,
            OrchestratorError::Stage {
                source: WorkerError::Parse(ParsingError::RequiredFieldMissing { .. }),
                ..
            }
        ),
        "{err}"
    );
    let matches = store.matches().await;
    assert!(matches.iter().all(|m| m.id != "101" || !m.is_crawled));
    assert!(matches.iter().all(|m| m.id != "102"));
}

#[tokio::test]
async fn discovery_failure_aborts_supervised_run() {
    let store = Arc::new(InMemoryStore::new());
    let fetcher = Arc::new(season_fetcher().without(&season_url()));

    let err = orchestrator(test_config(FailurePolicy::Supervised), fetcher, store.clone())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::Stage { ref stage, .. } if stage == "SeasonDiscovery"));
    assert!(store.matches().await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn day_listing_crawls_requested_date() {
    let date_url = format!("{BASE}/statszone?date_req=2016-09-10");
    let mut fetcher = season_fetcher();
    fetcher.pages.insert(
        date_url,
        format!(
            "<html><body>{}</body></html>",
            listing_table("Premier League", &[listing_row("102", "Team E", "Team F", "1 - 3")])
        ),
    );

    let mut config = test_config(FailurePolicy::Supervised);
    config.match_date = Some("2016-09-10".into());
    let store = Arc::new(InMemoryStore::new());

    let stats = orchestrator(config, Arc::new(fetcher), store.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(stats.matches_crawled, 1);
    let matches = store.matches().await;
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].match_date, "2016-09-10");
}

#[tokio::test]
async fn cancelled_run_reports_cancellation() {
    let state = Arc::new(SharedState::new());
    state.request_shutdown();
    let parsers = PageParsers::new(&SelectorConfig::default(), Arc::new(ExtractionTables::new()))
        .unwrap();
    let orchestrator = CrawlingOrchestrator::new(
        test_config(FailurePolicy::Supervised),
        Arc::new(season_fetcher()),
        Arc::new(InMemoryStore::new()),
        Arc::new(parsers),
        state,
    );

    let err = orchestrator.run().await.unwrap_err();
    assert!(err.is_cancellation());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sqlite_store_receives_complete_rosters() {
    let dir = tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("crawl.db").display());
    let db = DatabaseConnection::new(&url, 4).await.unwrap();
    db.migrate().await.unwrap();
    let pool = db.pool().clone();
    let store = Arc::new(SqliteStore::new(db.into_pool()));

    let stats = orchestrator(
        test_config(FailurePolicy::Supervised),
        Arc::new(season_fetcher()),
        store.clone(),
    )
    .run()
    .await
    .unwrap();
    assert_eq!(stats.matches_crawled, 3);

    let count = |sql: &'static str| {
        let pool = pool.clone();
        async move { sqlx::query_scalar::<_, i64>(sql).fetch_one(&pool).await.unwrap() }
    };
    assert_eq!(count(r#"SELECT COUNT(*) FROM "match" WHERE is_crawled = '1'"#).await, 3);
    assert_eq!(count("SELECT COUNT(*) FROM player_stats").await, 12);
    assert_eq!(count("SELECT COUNT(*) FROM player_stats WHERE is_substitute = '1'").await, 3);
    assert_eq!(count("SELECT COUNT(*) FROM player_event").await, 24);
    assert_eq!(
        count(
            "SELECT COUNT(*) FROM player_event e \
             LEFT JOIN player_stats s ON s.id = e.player_stats_id WHERE s.id IS NULL"
        )
        .await,
        0
    );
    assert_eq!(
        count("SELECT COUNT(*) FROM player_event WHERE event_type = 'aerial_duel_won' AND x1 = x2 AND y1 = y2")
            .await,
        12
    );
    assert_eq!(store.max_player_stats_id().await.unwrap(), 12);

    // a second run over the same database changes nothing
    let again = orchestrator(
        test_config(FailurePolicy::Supervised),
        Arc::new(season_fetcher()),
        store,
    )
    .run()
    .await
    .unwrap();
    assert_eq!(again.matches_crawled, 0);
    assert_eq!(count("SELECT COUNT(*) FROM player_stats").await, 12);
}
