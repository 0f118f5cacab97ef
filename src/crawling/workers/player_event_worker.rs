//! # Player Event Worker
//!
//! Fetches a player's stats page and fills in the stub's display name and
//! pitch events. A pool of these drains one shared intake queue; every stub
//! gets exactly one outcome, failures included.

use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{Worker, WorkerContext, WorkerError, spawn_worker};
use crate::crawling::queues::{QueueReceiver, QueueSender};
use crate::crawling::tasks::{PlayerEventOutcome, PlayerEventTask};
use crate::domain::PlayerStats;

pub struct PlayerEventWorker {
    index: usize,
    ctx: WorkerContext,
    intake: QueueReceiver<PlayerEventTask>,
    outbound: QueueSender<PlayerEventOutcome>,
    fetch_delay: Duration,
}

impl PlayerEventWorker {
    pub fn new(
        index: usize,
        ctx: WorkerContext,
        intake: QueueReceiver<PlayerEventTask>,
        outbound: QueueSender<PlayerEventOutcome>,
        fetch_delay: Duration,
    ) -> Self {
        Self {
            index,
            ctx,
            intake,
            outbound,
            fetch_delay,
        }
    }

    /// Completes one stub from its player page
    pub async fn process(&self, mut stats: PlayerStats) -> Result<PlayerStats, WorkerError> {
        let body = self.ctx.fetch(&stats.url).await?;
        let page = self.ctx.parsers.player_page.parse(&body)?;
        stats.player_name = page.player_name;
        stats.events = page.events;
        Ok(stats)
    }
}

#[async_trait]
impl Worker for PlayerEventWorker {
    fn worker_name(&self) -> String {
        format!("PlayerEventWorker-{}", self.index)
    }

    async fn run(self) -> Result<(), WorkerError> {
        let token = self.ctx.cancellation_token().clone();

        while let Some(task) = self.intake.recv(&token).await? {
            let PlayerEventTask {
                task_id,
                key,
                stats,
            } = task;

            let result = self.process(stats).await;
            match &result {
                Ok(stats) => debug!(
                    "[{}] {} ({}): {} events",
                    key,
                    stats.player_name,
                    stats.player_id,
                    stats.events.len()
                ),
                Err(e) if e.is_cancellation() => return Err(WorkerError::Cancelled),
                Err(e) => warn!("[{}] player page failed (task {}): {}", key, task_id, e),
            }

            self.outbound
                .send(
                    PlayerEventOutcome {
                        task_id,
                        key,
                        result,
                    },
                    &token,
                )
                .await?;

            if !self.fetch_delay.is_zero()
                && !self.ctx.shared_state.cancellable_sleep(self.fetch_delay).await
            {
                return Err(WorkerError::Cancelled);
            }
        }

        Ok(())
    }
}

/// N workers sharing one intake receiver and one outbound sender
pub struct PlayerEventWorkerPool;

impl PlayerEventWorkerPool {
    /// Spawns `size` workers. The pool owns `outbound` from here on, so the
    /// outbound queue closes once the last worker exits.
    pub fn spawn(
        size: usize,
        ctx: &WorkerContext,
        intake: QueueReceiver<PlayerEventTask>,
        outbound: QueueSender<PlayerEventOutcome>,
        fetch_delay: Duration,
    ) -> Vec<JoinHandle<Result<(), WorkerError>>> {
        info!("👷 Starting {} player event workers", size);
        (0..size)
            .map(|index| {
                let worker = PlayerEventWorker::new(
                    index,
                    ctx.clone(),
                    intake.clone(),
                    outbound.clone(),
                    fetch_delay,
                );
                spawn_worker(worker, ctx.cancellation_token().clone())
            })
            .collect()
    }
}
