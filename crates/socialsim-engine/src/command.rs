use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use socialsim_actions::{ActionGenerators, ActionHistoryStore, run_action_pipeline};
use socialsim_feeds::{FeedRequest, generate_feeds, validate_algorithm};
use socialsim_types::{
    ActionRepository, Agent, Error, FeedPostRepository, GeneratedFeedRepository, Post, Result,
    Run, RunConfig, RunRepository, RunStatus, SimulationPersistence, TurnMetadata, TurnResult,
    action_counts, now_timestamp,
};

use crate::agents::{AgentFactory, validate_unique_handles};
use crate::metrics::{compute_run_metrics, compute_turn_metrics};

/// Turns missing more than this share of agent feeds are treated as a
/// systemic feed-pipeline failure. A present-but-empty feed does not
/// count; only agents absent from the pipeline's output do.
const MAX_RATIO_OF_EMPTY_FEEDS: f64 = 0.25;

const STATUS_UPDATE_ATTEMPTS: u32 = 3;

pub type HistoryFactory = Box<dyn Fn() -> Box<dyn ActionHistoryStore> + Send + Sync>;
pub type Sleeper = Box<dyn Fn(Duration) + Send + Sync>;

/// Everything the command service needs injected
pub struct SimulationDeps {
    pub run_repo: Arc<dyn RunRepository>,
    pub feed_post_repo: Arc<dyn FeedPostRepository>,
    pub generated_feed_repo: Arc<dyn GeneratedFeedRepository>,
    pub action_repo: Arc<dyn ActionRepository>,
    pub persistence: Arc<dyn SimulationPersistence>,
    pub agent_factory: Box<dyn AgentFactory>,
    pub generators: ActionGenerators,
    pub history_factory: HistoryFactory,
}

/// Command-side service: drives a configured run to a terminal state.
///
/// One logical thread of control per run; turns execute strictly
/// sequentially, agents in factory order within each turn.
pub struct SimulationCommandService {
    run_repo: Arc<dyn RunRepository>,
    feed_post_repo: Arc<dyn FeedPostRepository>,
    generated_feed_repo: Arc<dyn GeneratedFeedRepository>,
    action_repo: Arc<dyn ActionRepository>,
    persistence: Arc<dyn SimulationPersistence>,
    agent_factory: Box<dyn AgentFactory>,
    generators: ActionGenerators,
    history_factory: HistoryFactory,
    sleeper: Sleeper,
}

impl SimulationCommandService {
    pub fn new(deps: SimulationDeps) -> Self {
        Self {
            run_repo: deps.run_repo,
            feed_post_repo: deps.feed_post_repo,
            generated_feed_repo: deps.generated_feed_repo,
            action_repo: deps.action_repo,
            persistence: deps.persistence,
            agent_factory: deps.agent_factory,
            generators: deps.generators,
            history_factory: deps.history_factory,
            sleeper: Box::new(|delay| std::thread::sleep(delay)),
        }
    }

    /// Replace the backoff sleeper (tests use a no-op)
    pub fn with_sleeper(mut self, sleeper: Sleeper) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Execute a simulation run to COMPLETED, or FAILED with the cause
    /// chained into the returned error.
    pub fn execute_run(&self, config: &RunConfig) -> Result<Run> {
        // Validation errors surface directly; nothing has been written yet
        config.validate()?;
        validate_algorithm(&config.feed_algorithm)?;

        let run = self
            .run_repo
            .create_run(config)
            .map_err(|e| Error::run_failure(None, e))?;
        info!(run_id = %run.run_id, total_turns = run.total_turns, "run created");

        match self.run_to_completion(&run) {
            Ok(completed) => {
                info!(run_id = %run.run_id, "run completed");
                Ok(completed)
            }
            Err(err) => {
                self.fail_run_best_effort(&run.run_id);
                Err(Error::run_failure(Some(run.run_id.clone()), err))
            }
        }
    }

    fn run_to_completion(&self, run: &Run) -> Result<Run> {
        let agents = self.create_agents_for_run(run)?;
        let mut history = (self.history_factory)();

        for turn_number in 0..run.total_turns {
            self.simulate_turn(run, turn_number, &agents, history.as_mut())?;
        }

        let turn_metadata = self.run_repo.list_turn_metadata(&run.run_id)?;
        let run_metrics = compute_run_metrics(run, &turn_metadata)?;
        self.persistence.write_run(&run.run_id, &run_metrics)?;
        history.clear_run(&run.run_id);

        self.run_repo
            .get_run(&run.run_id)?
            .ok_or_else(|| Error::RunNotFound {
                run_id: run.run_id.clone(),
            })
    }

    fn create_agents_for_run(&self, run: &Run) -> Result<Vec<Agent>> {
        let agents = self
            .agent_factory
            .create_agents(run.total_agents as usize)?;
        if agents.len() != run.total_agents as usize {
            return Err(Error::InsufficientAgents {
                requested: run.total_agents as usize,
                available: agents.len(),
            });
        }
        validate_unique_handles(&agents)?;
        info!(
            run_id = %run.run_id,
            created = agents.len(),
            "created agents for run"
        );
        Ok(agents)
    }

    /// Apply a lifecycle transition, retrying storage-level failures with
    /// exponential backoff (1s, 2s, 4s).
    ///
    /// Domain rejections (`RunNotFound`, `InvalidTransition`) surface
    /// immediately. When all retries fail and the target was not FAILED,
    /// one best-effort FAILED write is attempted before the error
    /// surfaces.
    pub fn update_run_status(&self, run_id: &str, status: RunStatus) -> Result<()> {
        for attempt in 0..STATUS_UPDATE_ATTEMPTS {
            match self.run_repo.update_run_status(run_id, status) {
                Ok(()) => return Ok(()),
                Err(err @ Error::RunStatusUpdate { .. }) => {
                    warn!(
                        run_id,
                        attempt = attempt + 1,
                        error = %err,
                        "run status update failed"
                    );
                    if attempt + 1 < STATUS_UPDATE_ATTEMPTS {
                        (self.sleeper)(Duration::from_secs(1u64 << attempt));
                    }
                }
                Err(other) => return Err(other),
            }
        }

        if status != RunStatus::Failed
            && let Err(err) = self.run_repo.update_run_status(run_id, RunStatus::Failed)
        {
            warn!(run_id, error = %err, "best-effort FAILED transition also failed");
        }
        Err(Error::RunStatusUpdate {
            run_id: run_id.to_string(),
            reason: format!(
                "failed to update status to {} after {} attempts",
                status, STATUS_UPDATE_ATTEMPTS
            ),
        })
    }

    // Never masks the original failure; used only on error paths
    fn fail_run_best_effort(&self, run_id: &str) {
        if let Err(err) = self.update_run_status(run_id, RunStatus::Failed) {
            warn!(run_id, error = %err, "failed to mark run as FAILED");
        }
    }

    fn simulate_turn(
        &self,
        run: &Run,
        turn_number: u32,
        agents: &[Agent],
        history: &mut dyn ActionHistoryStore,
    ) -> Result<TurnResult> {
        let started = Instant::now();
        info!(run_id = %run.run_id, turn_number, "starting turn");

        let current = self
            .run_repo
            .get_run(&run.run_id)?
            .ok_or_else(|| Error::RunNotFound {
                run_id: run.run_id.clone(),
            })?;

        let request = FeedRequest {
            run_id: &current.run_id,
            turn_number,
            feed_algorithm: &current.feed_algorithm,
            feed_algorithm_config: current.feed_algorithm_config.as_ref(),
        };
        let feeds = generate_feeds(
            agents,
            &request,
            self.generated_feed_repo.as_ref(),
            self.feed_post_repo.as_ref(),
        )?;
        validate_agents_without_feeds(agents, &feeds, &current.run_id, turn_number)?;

        let (mut likes_total, mut comments_total, mut follows_total) = (0u64, 0u64, 0u64);
        for agent in agents {
            let Some(feed) = feeds.get(&agent.handle).filter(|feed| !feed.is_empty()) else {
                warn!(
                    run_id = %current.run_id,
                    turn_number,
                    agent_handle = %agent.handle,
                    "empty feed, skipping agent"
                );
                continue;
            };

            let actions = run_action_pipeline(
                &current.run_id,
                turn_number,
                agent,
                feed,
                &self.generators,
                history,
            )?;

            self.action_repo
                .write_likes(&current.run_id, turn_number, &actions.likes)?;
            self.action_repo
                .write_comments(&current.run_id, turn_number, &actions.comments)?;
            self.action_repo
                .write_follows(&current.run_id, turn_number, &actions.follows)?;

            likes_total += actions.likes.len() as u64;
            comments_total += actions.comments.len() as u64;
            follows_total += actions.follows.len() as u64;
        }

        let total_actions = action_counts(likes_total, comments_total, follows_total);
        let metadata = TurnMetadata {
            run_id: current.run_id.clone(),
            turn_number,
            total_actions: total_actions.clone(),
            created_at: now_timestamp(),
        };
        let turn_metrics = compute_turn_metrics(&current, turn_number, &total_actions)?;

        match self.persistence.write_turn(&metadata, &turn_metrics) {
            Err(Error::DuplicateTurnMetadata { .. }) => {
                // Retry-safe: the turn is already durably persisted
                warn!(
                    run_id = %current.run_id,
                    turn_number,
                    "turn metadata already exists; treating as idempotent success"
                );
            }
            other => other?,
        }

        Ok(TurnResult {
            turn_number,
            total_actions,
            execution_time_ms: Some(started.elapsed().as_millis() as u64),
        })
    }
}

fn validate_agents_without_feeds(
    agents: &[Agent],
    feeds: &BTreeMap<String, Vec<Post>>,
    run_id: &str,
    turn_number: u32,
) -> Result<()> {
    if agents.is_empty() {
        return Ok(());
    }
    let missing: Vec<&str> = agents
        .iter()
        .filter(|agent| !feeds.contains_key(&agent.handle))
        .map(|agent| agent.handle.as_str())
        .collect();
    let ratio = missing.len() as f64 / agents.len() as f64;
    if ratio > MAX_RATIO_OF_EMPTY_FEEDS {
        return Err(Error::InvariantViolation(format!(
            "Too many agents without feeds in run {}, turn {}: {}/{} exceeds the {} threshold. Missing: {:?}",
            run_id,
            turn_number,
            missing.len(),
            agents.len(),
            MAX_RATIO_OF_EMPTY_FEEDS,
            missing
        )));
    }
    Ok(())
}
