//! # Match Deduplicator
//!
//! Checks each discovered match against the store and forwards only the new
//! ones, in discovery order, onto the match queue.

use std::collections::HashSet;
use std::pin::pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{StreamExt, stream};
use tracing::{debug, info};

use super::{Worker, WorkerContext, WorkerError};
use crate::crawling::queues::QueueSender;
use crate::domain::Match;

pub struct MatchDeduplicator {
    ctx: WorkerContext,
    candidates: Vec<Match>,
    matches: QueueSender<Match>,
    concurrency: usize,
}

impl MatchDeduplicator {
    pub fn new(
        ctx: WorkerContext,
        candidates: Vec<Match>,
        matches: QueueSender<Match>,
        concurrency: usize,
    ) -> Self {
        Self {
            ctx,
            candidates,
            matches,
            concurrency: concurrency.max(1),
        }
    }
}

#[async_trait]
impl Worker for MatchDeduplicator {
    fn worker_name(&self) -> String {
        "MatchDeduplicator".to_string()
    }

    async fn run(self) -> Result<(), WorkerError> {
        let Self {
            ctx,
            candidates,
            matches,
            concurrency,
        } = self;
        let token = ctx.cancellation_token().clone();
        let total = candidates.len();

        // existence checks overlap, results come back in candidate order
        let store = Arc::clone(&ctx.store);
        let mut checks = pin!(
            stream::iter(candidates)
                .map(move |m| {
                    let store = Arc::clone(&store);
                    async move {
                        let exists = store.match_exists_by_url(&m.url).await;
                        (m, exists)
                    }
                })
                .buffered(concurrency)
        );

        let mut forwarded_urls = HashSet::new();
        let mut skipped = 0u64;

        loop {
            let next = tokio::select! {
                next = checks.next() => next,
                _ = token.cancelled() => return Err(WorkerError::Cancelled),
            };
            let Some((m, exists)) = next else { break };

            if exists? {
                debug!("⏭️ Match {} already stored", m.id);
                skipped += 1;
                continue;
            }
            if !forwarded_urls.insert(m.url.clone()) {
                debug!("⏭️ Match {} listed twice in this run", m.id);
                skipped += 1;
                continue;
            }

            matches.send(m, &token).await?;
        }

        ctx.shared_state
            .update_stats(|s| s.matches_skipped += skipped)
            .await;
        info!(
            "🧹 Deduplication done: {} new, {} skipped of {}",
            forwarded_urls.len(),
            skipped,
            total
        );
        Ok(())
    }
}
