//! # Crawling Pipeline
//!
//! Discovery → deduplication → match detail worker ⇄ player event pool → store.
//! 명시적 모듈 구조 (mod.rs 비사용)

pub mod id_allocator;
pub mod orchestrator;
pub mod queues;
pub mod state;
pub mod tasks;
pub mod workers;

// Clean re-exports
pub use id_allocator::PlayerStatsIdAllocator;
pub use orchestrator::{CrawlingOrchestrator, OrchestratorConfig, OrchestratorError};
pub use queues::{QueueError, QueueMonitor, QueueReceiver, QueueSender, work_queue};
pub use state::{CrawlingStats, SharedState};
pub use tasks::{CorrelationKey, MatchPhase, PlayerEventOutcome, PlayerEventTask, TaskId};
pub use workers::{ErrorCategory, WorkerContext, WorkerError};
