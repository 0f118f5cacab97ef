//! # Worker Pool Module
//!
//! Pipeline stages of the crawler:
//! - `season_discovery`: listing pages → candidate matches
//! - `match_deduplicator`: drops matches the store already knows
//! - `match_detail_worker`: persists a match, fans its roster out, finalizes it
//! - `player_event_worker`: player page → name and pitch events
//!
//! 명시적 모듈 구조 (mod.rs 비사용)

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::crawling::queues::QueueError;
use crate::crawling::state::SharedState;
use crate::domain::{FetchError, PageFetcher, Store, StoreError};
use crate::infrastructure::parsing::{ExtractionError, PageParsers, ParsingError};

pub mod match_deduplicator;
pub mod match_detail_worker;
pub mod player_event_worker;
pub mod season_discovery;

pub use match_deduplicator::MatchDeduplicator;
pub use match_detail_worker::{MatchDetailConfig, MatchDetailWorker};
pub use player_event_worker::{PlayerEventWorker, PlayerEventWorkerPool};
pub use season_discovery::SeasonDiscovery;

/// Stage-level error union
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Parse failed: {0}")]
    Parse(#[from] ParsingError),

    #[error("Store failed: {0}")]
    Store(#[from] StoreError),

    #[error("Channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("Task was cancelled")]
    Cancelled,
}

/// What kind of failure a `WorkerError` is, for the failure policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transport, HTTP status, body read
    Network,
    /// The page did not look the way the selectors expect
    PageShape,
    Persistence,
    /// Bad selectors or crawl parameters; retrying cannot help
    Configuration,
    /// Cancellation or a stage going away
    Shutdown,
}

impl ErrorCategory {
    /// Whether a supervised run may skip the failed item and continue
    #[must_use]
    pub fn is_recoverable(self) -> bool {
        matches!(self, Self::Network | Self::PageShape)
    }
}

impl WorkerError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(FetchError::InvalidUrl { .. }) => ErrorCategory::PageShape,
            Self::Fetch(FetchError::Cancelled { .. }) => ErrorCategory::Shutdown,
            Self::Fetch(_) => ErrorCategory::Network,
            Self::Parse(ParsingError::InvalidSelector { .. })
            | Self::Parse(ParsingError::Extraction(ExtractionError::InvalidSeason(_))) => {
                ErrorCategory::Configuration
            }
            Self::Parse(_) => ErrorCategory::PageShape,
            Self::Store(_) => ErrorCategory::Persistence,
            Self::ChannelClosed(_) | Self::Cancelled => ErrorCategory::Shutdown,
        }
    }

    /// True when the error only reports that the run is being torn down
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::Fetch(FetchError::Cancelled { .. })
        )
    }

    /// Secondary failures caused by another stage stopping first
    #[must_use]
    pub fn is_secondary(&self) -> bool {
        self.is_cancellation() || matches!(self, Self::ChannelClosed(_))
    }
}

impl From<QueueError> for WorkerError {
    fn from(error: QueueError) -> Self {
        match error {
            QueueError::Closed => Self::ChannelClosed("pipeline queue"),
            QueueError::Cancelled => Self::Cancelled,
        }
    }
}

/// Collaborators every stage is built from
#[derive(Clone)]
pub struct WorkerContext {
    pub fetcher: Arc<dyn PageFetcher>,
    pub store: Arc<dyn Store>,
    pub parsers: Arc<PageParsers>,
    pub shared_state: Arc<SharedState>,
}

impl WorkerContext {
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.shared_state.cancellation_token
    }

    /// Fetches a page unless the run is cancelled first
    pub async fn fetch(&self, url: &str) -> Result<String, WorkerError> {
        tokio::select! {
            biased;
            _ = self.cancellation_token().cancelled() => Err(WorkerError::Cancelled),
            body = self.fetcher.fetch_page(url) => Ok(body?),
        }
    }
}

/// A long-running pipeline stage
#[async_trait]
pub trait Worker: Send + 'static {
    /// Worker 이름 (로그용)
    fn worker_name(&self) -> String;

    /// Runs until the input is exhausted, the run is cancelled, or it fails
    async fn run(self) -> Result<(), WorkerError>;
}

/// Spawns a stage; a genuine failure cancels the rest of the pipeline
pub fn spawn_worker<W: Worker>(
    worker: W,
    cancellation_token: CancellationToken,
) -> JoinHandle<Result<(), WorkerError>> {
    tokio::spawn(async move {
        let name = worker.worker_name();
        debug!("▶️ {} started", name);
        let result = worker.run().await;
        match &result {
            Ok(()) => debug!("⏹️ {} finished", name),
            Err(e) if e.is_secondary() => debug!("⏹️ {} stopped: {}", name, e),
            Err(e) => {
                error!("❌ {} failed: {}", name, e);
                cancellation_token.cancel();
            }
        }
        result
    })
}
