//! # Match Detail Worker
//!
//! Takes new matches off the match queue one at a time and walks each through
//! `Discovered → Persisted → RosterExtracted → EventsAttached → Finalized`.
//! The roster is fanned out to the player event pool in one go and the
//! outcomes are reassembled in line-up order before the match is finalized.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{Worker, WorkerContext, WorkerError};
use crate::crawling::id_allocator::PlayerStatsIdAllocator;
use crate::crawling::queues::{QueueReceiver, QueueSender};
use crate::crawling::tasks::{
    CorrelationKey, MatchPhase, PlayerEventOutcome, PlayerEventTask, TaskId,
};
use crate::domain::constants::site;
use crate::domain::{Match, PlayerStats};
use crate::infrastructure::config::FailurePolicy;
use crate::infrastructure::parsing::TeamSide;
use crate::infrastructure::parsing::rules::player_id_from_url;

#[derive(Debug, Clone)]
pub struct MatchDetailConfig {
    /// Site root the roster links are joined onto
    pub base_url: String,
    pub failure_policy: FailurePolicy,
    /// Pause between two matches
    pub cooldown: Duration,
}

/// What one finalized match contributed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchSummary {
    pub players: u64,
    pub players_failed: u64,
    pub events: u64,
}

pub struct MatchDetailWorker {
    ctx: WorkerContext,
    config: MatchDetailConfig,
    ids: Arc<PlayerStatsIdAllocator>,
    matches: QueueReceiver<Match>,
    intake: QueueSender<PlayerEventTask>,
    outbound: QueueReceiver<PlayerEventOutcome>,
}

impl MatchDetailWorker {
    pub fn new(
        ctx: WorkerContext,
        config: MatchDetailConfig,
        ids: Arc<PlayerStatsIdAllocator>,
        matches: QueueReceiver<Match>,
        intake: QueueSender<PlayerEventTask>,
        outbound: QueueReceiver<PlayerEventOutcome>,
    ) -> Self {
        Self {
            ctx,
            config,
            ids,
            matches,
            intake,
            outbound,
        }
    }

    /// Runs one match through every phase
    pub async fn process_match(&self, m: &Match) -> Result<MatchSummary, WorkerError> {
        log_phase(m, MatchPhase::Discovered);

        self.ctx.store.insert_match(m).await?;
        log_phase(m, MatchPhase::Persisted);

        let stubs = self.extract_roster(m).await?;
        log_phase(m, MatchPhase::RosterExtracted);
        info!("[{}] {} players to crawl", m.id, stubs.len());

        let (roster, players_failed) = self.attach_events(stubs).await?;
        log_phase(m, MatchPhase::EventsAttached);

        self.ctx.store.save_match_roster(&m.id, &roster).await?;
        log_phase(m, MatchPhase::Finalized);

        Ok(MatchSummary {
            players: roster.len() as u64,
            players_failed,
            events: roster.iter().map(|p| p.events.len() as u64).sum(),
        })
    }

    /// Fetches the match page and turns the line-ups into id-stamped stubs
    async fn extract_roster(&self, m: &Match) -> Result<Vec<PlayerStats>, WorkerError> {
        let body = self.ctx.fetch(&m.url).await?;
        let entries = self.ctx.parsers.lineup.parse(&body)?;

        let stubs = entries
            .into_iter()
            .map(|entry| {
                let team = match entry.side {
                    TeamSide::Home => &m.home_team_name,
                    TeamSide::Away => &m.away_team_name,
                };
                let player_id = player_id_from_url(&entry.href).unwrap_or_else(|| {
                    warn!("[{}] no player id in {}", m.id, entry.href);
                    String::new()
                });
                PlayerStats::stub(
                    self.ids.allocate(),
                    m.id.as_str(),
                    team.as_str(),
                    player_id,
                    entry.is_substitute,
                    site::absolute_url(&self.config.base_url, &entry.href),
                )
            })
            .collect();
        Ok(stubs)
    }

    /// Submits every stub up front and collects the outcomes as they arrive.
    ///
    /// Returns the completed stats in submission order and the number of
    /// players that were skipped.
    async fn attach_events(
        &self,
        stubs: Vec<PlayerStats>,
    ) -> Result<(Vec<PlayerStats>, u64), WorkerError> {
        let token = self.ctx.cancellation_token();
        let order: Vec<CorrelationKey> = stubs
            .iter()
            .map(|s| CorrelationKey {
                match_id: s.match_id.clone(),
                player_stats_id: s.id,
            })
            .collect();
        let expected: HashSet<&CorrelationKey> = order.iter().collect();

        let mut pending: VecDeque<PlayerEventTask> =
            stubs.into_iter().map(PlayerEventTask::new).collect();
        let mut completed: HashMap<CorrelationKey, (TaskId, Result<PlayerStats, WorkerError>)> =
            HashMap::with_capacity(order.len());

        // intake sends and outcome receives interleave, so a full intake
        // never waits on a full outbound queue
        while completed.len() < order.len() {
            tokio::select! {
                permit = self.intake.reserve(token), if !pending.is_empty() => {
                    let permit = permit?;
                    if let Some(task) = pending.pop_front() {
                        permit.send(task);
                    }
                }
                outcome = self.outbound.recv(token) => {
                    let outcome = outcome?
                        .ok_or(WorkerError::ChannelClosed("player outcome queue"))?;
                    if !expected.contains(&outcome.key) {
                        warn!("Ignoring outcome for unknown stub {}", outcome.key);
                    } else {
                        match outcome.result {
                            Err(e) if self.aborts_on(&e) => {
                                warn!(
                                    "[{}] task {} ends the match: {}",
                                    outcome.key, outcome.task_id, e
                                );
                                return Err(e);
                            }
                            result => {
                                completed.insert(outcome.key, (outcome.task_id, result));
                            }
                        }
                    }
                }
            }
        }

        let mut roster = Vec::with_capacity(order.len());
        let mut failed = 0u64;
        // the loop above only exits once every key is in `completed`
        for (key, (task_id, result)) in order
            .iter()
            .filter_map(|key| completed.remove_entry(key))
        {
            match result {
                Ok(stats) => roster.push(stats),
                Err(e) => {
                    warn!("⚠️ Skipping player {} (task {}): {}", key, task_id, e);
                    failed += 1;
                }
            }
        }
        debug_assert_eq!(roster.len() as u64 + failed, order.len() as u64);
        Ok((roster, failed))
    }

    /// Whether `error` ends the run rather than just the current item
    fn aborts_on(&self, error: &WorkerError) -> bool {
        match self.config.failure_policy {
            FailurePolicy::FailFast => true,
            FailurePolicy::Supervised => !error.category().is_recoverable(),
        }
    }
}

#[async_trait]
impl Worker for MatchDetailWorker {
    fn worker_name(&self) -> String {
        "MatchDetailWorker".to_string()
    }

    async fn run(self) -> Result<(), WorkerError> {
        let token = self.ctx.cancellation_token().clone();
        let mut first = true;

        while let Some(m) = self.matches.recv(&token).await? {
            if !first
                && !self.config.cooldown.is_zero()
                && !self.ctx.shared_state.cancellable_sleep(self.config.cooldown).await
            {
                return Err(WorkerError::Cancelled);
            }
            first = false;

            info!("⚽ [{}] {} vs {} ({})", m.id, m.home_team_name, m.away_team_name, m.match_date);
            match self.process_match(&m).await {
                Ok(summary) => {
                    info!(
                        "✅ [{}] crawled: {} players, {} events, {} players skipped",
                        m.id, summary.players, summary.events, summary.players_failed
                    );
                    self.ctx
                        .shared_state
                        .update_stats(|s| {
                            s.matches_crawled += 1;
                            s.players_crawled += summary.players;
                            s.players_failed += summary.players_failed;
                            s.events_extracted += summary.events;
                        })
                        .await;
                }
                Err(e) if !self.aborts_on(&e) => {
                    warn!("⚠️ [{}] left un-crawled: {}", m.id, e);
                    self.ctx
                        .shared_state
                        .update_stats(|s| s.matches_failed += 1)
                        .await;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }
}

fn log_phase(m: &Match, phase: MatchPhase) {
    debug!("[{}] → {}", m.id, phase);
}
