//! # Crawling Orchestrator
//!
//! Prepares the store, runs discovery, wires the stages together over
//! bounded queues and supervises them until the discovered work is done.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::crawling::id_allocator::PlayerStatsIdAllocator;
use crate::crawling::queues::work_queue;
use crate::crawling::state::{CrawlingStats, SharedState};
use crate::crawling::workers::{
    MatchDeduplicator, MatchDetailConfig, MatchDetailWorker, PlayerEventWorkerPool,
    SeasonDiscovery, WorkerContext, WorkerError, spawn_worker,
};
use crate::domain::constants::leagues;
use crate::domain::{League, Match, PageFetcher, Store, StoreError};
use crate::infrastructure::config::{AppConfig, FailurePolicy};
use crate::infrastructure::parsing::PageParsers;

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub league_id: String,
    pub season: String,
    /// Crawl one day across leagues instead of a season
    pub match_date: Option<String>,
    pub max_matches: Option<usize>,
    pub failure_policy: FailurePolicy,
    pub base_url: String,
    pub max_listing_pages: u32,
    pub player_workers: usize,
    pub match_queue_capacity: usize,
    pub player_queue_capacity: usize,
    pub dedup_concurrency: usize,
    pub match_cooldown: Duration,
    pub player_fetch_delay: Duration,
}

impl From<&AppConfig> for OrchestratorConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            league_id: config.crawl.league_id.clone(),
            season: config.crawl.season.clone(),
            match_date: config.crawl.match_date.clone(),
            max_matches: config.crawl.max_matches,
            failure_policy: config.crawl.failure_policy,
            base_url: config.http.base_url.clone(),
            max_listing_pages: config.discovery.max_listing_pages,
            player_workers: config.pipeline.player_workers,
            match_queue_capacity: config.pipeline.match_queue_capacity,
            player_queue_capacity: config.pipeline.player_queue_capacity,
            dedup_concurrency: config.pipeline.dedup_concurrency,
            match_cooldown: Duration::from_millis(config.pipeline.match_cooldown_ms),
            player_fetch_delay: Duration::from_millis(config.pipeline.player_fetch_delay_ms),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("{stage} failed: {source}")]
    Stage {
        stage: String,
        #[source]
        source: WorkerError,
    },

    #[error("Worker task aborted: {0}")]
    Join(String),

    #[error("Crawl cancelled")]
    Cancelled,
}

impl OrchestratorError {
    /// Shutdown was requested; not a failure of the crawl itself
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    fn from_stage(stage: impl Into<String>, source: WorkerError) -> Self {
        if source.is_cancellation() {
            Self::Cancelled
        } else {
            Self::Stage {
                stage: stage.into(),
                source,
            }
        }
    }
}

/// Main orchestrator that coordinates the entire crawling process
pub struct CrawlingOrchestrator {
    config: OrchestratorConfig,
    ctx: WorkerContext,
}

impl CrawlingOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn Store>,
        parsers: Arc<PageParsers>,
        shared_state: Arc<SharedState>,
    ) -> Self {
        Self {
            config,
            ctx: WorkerContext {
                fetcher,
                store,
                parsers,
                shared_state,
            },
        }
    }

    pub fn shared_state(&self) -> &Arc<SharedState> {
        &self.ctx.shared_state
    }

    /// Inserts the known leagues the store does not have yet
    pub async fn seed_leagues(&self) -> Result<usize, StoreError> {
        let mut inserted = 0;
        for (id, name) in leagues::SEED {
            if !self.ctx.store.league_exists(id).await? {
                self.ctx.store.insert_league(&League::new(*id, *name)).await?;
                inserted += 1;
            }
        }
        if inserted > 0 {
            info!("🏆 Seeded {} leagues", inserted);
        }
        Ok(inserted)
    }

    /// Runs one crawl to completion and returns its statistics
    pub async fn run(&self) -> Result<CrawlingStats, OrchestratorError> {
        let started = Instant::now();
        let token = self.ctx.cancellation_token().clone();

        self.seed_leagues().await?;
        let max_id = self.ctx.store.max_player_stats_id().await?;
        debug!("player_stats ids continue after {}", max_id);
        let ids = Arc::new(PlayerStatsIdAllocator::new(max_id));

        let mut candidates = self
            .discover()
            .await
            .map_err(|e| OrchestratorError::from_stage("SeasonDiscovery", e))?;
        if let Some(limit) = self.config.max_matches {
            if candidates.len() > limit {
                info!("Limiting this run to the first {} of {} matches", limit, candidates.len());
                candidates.truncate(limit);
            }
        }

        let (match_tx, match_rx) = work_queue(self.config.match_queue_capacity);
        let (intake_tx, intake_rx) = work_queue(self.config.player_queue_capacity);
        let (outbound_tx, outbound_rx) = work_queue(self.config.player_queue_capacity);
        let match_queue = match_rx.monitor();
        let player_queue = intake_rx.monitor();

        let mut handles: Vec<(String, JoinHandle<Result<(), WorkerError>>)> = Vec::new();

        for (index, handle) in PlayerEventWorkerPool::spawn(
            self.config.player_workers,
            &self.ctx,
            intake_rx,
            outbound_tx,
            self.config.player_fetch_delay,
        )
        .into_iter()
        .enumerate()
        {
            handles.push((format!("PlayerEventWorker-{}", index), handle));
        }

        let detail = MatchDetailWorker::new(
            self.ctx.clone(),
            MatchDetailConfig {
                base_url: self.config.base_url.clone(),
                failure_policy: self.config.failure_policy,
                cooldown: self.config.match_cooldown,
            },
            ids,
            match_rx,
            intake_tx,
            outbound_rx,
        );
        handles.push(("MatchDetailWorker".to_string(), spawn_worker(detail, token.clone())));

        let dedup = MatchDeduplicator::new(
            self.ctx.clone(),
            candidates,
            match_tx,
            self.config.dedup_concurrency,
        );
        handles.push(("MatchDeduplicator".to_string(), spawn_worker(dedup, token.clone())));

        let root_cause = self.join_all(handles).await;

        let matches_queued = match_queue.snapshot().total_enqueued;
        let players_dispatched = player_queue.snapshot().total_enqueued;
        self.ctx
            .shared_state
            .update_stats(|s| {
                s.matches_queued = matches_queued;
                s.player_tasks_dispatched = players_dispatched;
            })
            .await;

        let stats = self.ctx.shared_state.stats_snapshot().await;
        stats.log_summary();
        info!("⏱️ Run finished in {:.1?}", started.elapsed());

        match root_cause {
            Some(e) => Err(e),
            None if token.is_cancelled() => Err(OrchestratorError::Cancelled),
            None => Ok(stats),
        }
    }

    async fn discover(&self) -> Result<Vec<Match>, WorkerError> {
        let discovery = SeasonDiscovery::new(
            self.ctx.clone(),
            self.config.base_url.clone(),
            self.config.max_listing_pages,
        );
        match &self.config.match_date {
            Some(date) => discovery.discover_day(date).await,
            None => {
                discovery
                    .discover_season(&self.config.league_id, &self.config.season)
                    .await
            }
        }
    }

    /// Waits for every stage and picks the error that started the shutdown
    async fn join_all(
        &self,
        handles: Vec<(String, JoinHandle<Result<(), WorkerError>>)>,
    ) -> Option<OrchestratorError> {
        let mut primary: Option<OrchestratorError> = None;
        let mut secondary: Option<OrchestratorError> = None;

        for (stage, handle) in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.is_secondary() => {
                    debug!("{} stopped: {}", stage, e);
                    if secondary.is_none() {
                        secondary = Some(if self.ctx.shared_state.is_shutdown_requested() {
                            OrchestratorError::Cancelled
                        } else {
                            OrchestratorError::from_stage(stage, e)
                        });
                    }
                }
                Ok(Err(e)) => {
                    if primary.is_none() {
                        primary = Some(OrchestratorError::from_stage(stage, e));
                    } else {
                        warn!("{} also failed: {}", stage, e);
                    }
                }
                Err(join_error) => {
                    error!("{} aborted: {}", stage, join_error);
                    self.ctx.shared_state.request_shutdown();
                    if primary.is_none() {
                        primary = Some(OrchestratorError::Join(join_error.to_string()));
                    }
                }
            }
        }

        primary.or(secondary)
    }
}
