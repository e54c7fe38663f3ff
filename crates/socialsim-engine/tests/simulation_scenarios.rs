//! End-to-end runs against the SQLite store: lifecycle, persistence
//! invariants, and failure handling.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

use socialsim_actions::{
    ActionGenerators, DeterministicCommentGenerator, DeterministicFollowGenerator,
    GenerationContext, InMemoryActionHistoryStore, LikeGenerator, NaiveLlmCommentGenerator,
};
use socialsim_engine::{
    AgentFactory, RosterAgentFactory, SimulationCommandService, SimulationDeps,
    StaticAgentFactory,
};
use socialsim_llm::LlmError;
use socialsim_store::Database;
use socialsim_testing::fixtures::{agent, post_corpus, run_config};
use socialsim_testing::llm::ScriptedCompletionClient;
use socialsim_testing::world::{in_memory_store, seed_agents, seed_posts};
use socialsim_types::{
    Agent, Error, GeneratedFeedRepository, GeneratedLike, GenerationMetadata, Like,
    MetricsRepository, Post, Result, RunConfig, RunRepository, RunStatus, TurnAction,
    now_timestamp,
};

fn service(
    db: &Arc<Database>,
    agents: Vec<Agent>,
    generators: ActionGenerators,
) -> SimulationCommandService {
    SimulationCommandService::new(SimulationDeps {
        run_repo: db.clone(),
        feed_post_repo: db.clone(),
        generated_feed_repo: db.clone(),
        action_repo: db.clone(),
        persistence: db.clone(),
        agent_factory: Box::new(StaticAgentFactory::new(agents)),
        generators,
        history_factory: Box::new(|| Box::new(InMemoryActionHistoryStore::new())),
    })
    .with_sleeper(Box::new(|_| {}))
}

fn run_failure_cause(err: &Error) -> String {
    match err {
        Error::RunFailure { source, .. } => source.to_string(),
        other => panic!("expected RunFailure, got {:?}", other),
    }
}

#[test]
fn empty_corpus_run_completes_with_zero_actions() {
    socialsim_testing::init_tracing();
    let db = in_memory_store();
    let service = service(
        &db,
        vec![agent("@a"), agent("@b")],
        ActionGenerators::deterministic(),
    );

    let run = service.execute_run(&run_config(2, 1)).unwrap();

    assert_eq!(run.status, RunStatus::Completed);
    assert!(run.completed_at.is_some());

    let metadata = db.get_turn_metadata(&run.run_id, 0).unwrap().unwrap();
    assert_eq!(metadata.total_actions[&TurnAction::Like], 0);
    assert_eq!(metadata.total_actions[&TurnAction::Comment], 0);
    assert_eq!(metadata.total_actions[&TurnAction::Follow], 0);

    for handle in ["@a", "@b"] {
        let feed = db
            .read_generated_feed(handle, &run.run_id, 0)
            .unwrap()
            .expect("feed row must exist even when empty");
        assert!(feed.post_ids.is_empty());
    }

    let run_metrics = db.read_run_metrics(&run.run_id).unwrap().unwrap();
    assert_eq!(run_metrics.metrics["total_actions"], 0.0);
}

#[test]
fn deterministic_run_satisfies_turn_completeness_and_monotonicity() {
    let db = in_memory_store();
    seed_posts(&db, &post_corpus("p", 50)).unwrap();
    let service = service(
        &db,
        vec![agent("@a"), agent("@b")],
        ActionGenerators::deterministic(),
    );

    let run = service.execute_run(&run_config(2, 3)).unwrap();
    assert_eq!(run.status, RunStatus::Completed);

    // Turn completeness: exactly N metadata rows, each paired with metrics
    let metadata = db.list_turn_metadata(&run.run_id).unwrap();
    let turns: Vec<u32> = metadata.iter().map(|m| m.turn_number).collect();
    assert_eq!(turns, vec![0, 1, 2]);
    for turn in 0..3 {
        assert!(db.read_turn_metrics(&run.run_id, turn).unwrap().is_some());
    }

    // Across-turn monotonicity: no like target repeats for an agent
    use socialsim_types::ActionRepository;
    let mut seen = std::collections::HashSet::new();
    for turn in 0..3 {
        for like in db.read_likes_for_turn(&run.run_id, turn).unwrap() {
            assert!(
                seen.insert((like.agent_handle.clone(), like.post_id.clone())),
                "like target repeated across turns: {:?}",
                (like.agent_handle, like.post_id)
            );
        }
    }
    assert!(!seen.is_empty(), "deterministic policy must produce likes");

    // Self-exclusion: no agent acts on itself
    for turn in 0..3 {
        for follow in db.read_follows_for_turn(&run.run_id, turn).unwrap() {
            assert_ne!(follow.user_id, follow.agent_handle);
        }
    }
}

/// Always proposes the same post twice, violating within-turn uniqueness
struct DuplicateLikeGenerator;

impl LikeGenerator for DuplicateLikeGenerator {
    fn algorithm(&self) -> &'static str {
        "deterministic"
    }

    fn generate(
        &self,
        candidates: &[Post],
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<GeneratedLike>> {
        let Some(post) = candidates.first() else {
            return Ok(Vec::new());
        };
        let like = GeneratedLike {
            like: Like {
                like_id: format!("like_{}_{}", ctx.agent_handle, post.post_id),
                agent_id: ctx.agent_handle.to_string(),
                post_id: post.post_id.clone(),
                created_at: now_timestamp(),
            },
            explanation: "test".to_string(),
            metadata: GenerationMetadata {
                model_used: None,
                generation_metadata: None,
                created_at: now_timestamp(),
            },
        };
        Ok(vec![like.clone(), like])
    }
}

#[test]
fn within_turn_duplicate_fails_the_run_without_persisting_the_turn() {
    let db = in_memory_store();
    seed_posts(&db, &post_corpus("p", 5)).unwrap();
    let generators = ActionGenerators {
        like: Box::new(DuplicateLikeGenerator),
        comment: Box::new(DeterministicCommentGenerator),
        follow: Box::new(DeterministicFollowGenerator),
    };
    let service = service(&db, vec![agent("@a")], generators);

    let err = service.execute_run(&run_config(1, 1)).unwrap_err();
    let cause = run_failure_cause(&err);
    assert!(cause.contains("liked duplicate targets"));

    let runs = db.list_runs().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Failed);
    assert!(db.get_turn_metadata(&runs[0].run_id, 0).unwrap().is_none());
    assert!(db.read_turn_metrics(&runs[0].run_id, 0).unwrap().is_none());
}

/// Always proposes one fixed post, replaying it on every turn
struct ReplayLikeGenerator {
    post_id: String,
}

impl LikeGenerator for ReplayLikeGenerator {
    fn algorithm(&self) -> &'static str {
        "deterministic"
    }

    fn generate(
        &self,
        candidates: &[Post],
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<GeneratedLike>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![GeneratedLike {
            like: Like {
                like_id: format!("like_{}_{}_{}", ctx.turn_number, ctx.agent_handle, self.post_id),
                agent_id: ctx.agent_handle.to_string(),
                post_id: self.post_id.clone(),
                created_at: now_timestamp(),
            },
            explanation: "test".to_string(),
            metadata: GenerationMetadata {
                model_used: None,
                generation_metadata: None,
                created_at: now_timestamp(),
            },
        }])
    }
}

#[test]
fn across_turn_replay_fails_turn_one_and_keeps_turn_zero() {
    let db = in_memory_store();
    seed_posts(&db, &post_corpus("p", 25)).unwrap();
    let generators = ActionGenerators {
        like: Box::new(ReplayLikeGenerator {
            post_id: "bluesky:p_0".to_string(),
        }),
        comment: Box::new(DeterministicCommentGenerator),
        follow: Box::new(DeterministicFollowGenerator),
    };
    let service = service(&db, vec![agent("@a")], generators);

    let err = service.execute_run(&run_config(1, 2)).unwrap_err();
    let cause = run_failure_cause(&err);
    assert!(cause.contains("cannot like post bluesky:p_0 again"));

    let runs = db.list_runs().unwrap();
    let run_id = &runs[0].run_id;
    assert_eq!(runs[0].status, RunStatus::Failed);

    // Turn 0 is durably persisted; turn 1 never landed
    assert!(db.get_turn_metadata(run_id, 0).unwrap().is_some());
    assert!(db.read_turn_metrics(run_id, 0).unwrap().is_some());
    assert!(db.get_turn_metadata(run_id, 1).unwrap().is_none());
    assert!(db.read_turn_metrics(run_id, 1).unwrap().is_none());
    assert!(db.read_run_metrics(run_id).unwrap().is_none());
}

#[test]
fn terminal_llm_failure_mid_run_keeps_committed_turns() {
    let db = in_memory_store();
    seed_posts(&db, &post_corpus("p", 45)).unwrap();

    // Two good turns, then an auth failure on the third completion call
    let client = Arc::new(ScriptedCompletionClient::new(vec![
        Ok(json!({"selections": []})),
        Ok(json!({"selections": []})),
        Err(LlmError::Auth("invalid api key".to_string())),
    ]));
    let generators = ActionGenerators {
        like: Box::new(socialsim_actions::DeterministicLikeGenerator),
        comment: Box::new(NaiveLlmCommentGenerator::new(client.clone())),
        follow: Box::new(DeterministicFollowGenerator),
    };
    let service = service(&db, vec![agent("@a")], generators);

    let err = service.execute_run(&run_config(1, 3)).unwrap_err();
    match &err {
        Error::RunFailure { run_id, source } => {
            assert!(run_id.is_some());
            assert!(matches!(source.as_ref(), Error::Llm(_)));
        }
        other => panic!("expected RunFailure, got {:?}", other),
    }
    assert_eq!(client.calls(), 3, "auth failures must not be retried");

    let runs = db.list_runs().unwrap();
    let run_id = &runs[0].run_id;
    assert_eq!(runs[0].status, RunStatus::Failed);
    assert_eq!(db.list_turn_metadata(run_id).unwrap().len(), 2);
    assert!(db.read_turn_metrics(run_id, 0).unwrap().is_some());
    assert!(db.read_turn_metrics(run_id, 1).unwrap().is_some());
    assert!(db.read_run_metrics(run_id).unwrap().is_none());
}

#[test]
fn completed_runs_reject_further_transitions() {
    let db = in_memory_store();
    let service = service(&db, vec![agent("@a")], ActionGenerators::deterministic());

    let run = service.execute_run(&run_config(1, 1)).unwrap();
    assert_eq!(run.status, RunStatus::Completed);

    let err = service
        .update_run_status(&run.run_id, RunStatus::Running)
        .unwrap_err();
    match &err {
        Error::InvalidTransition {
            current,
            target,
            valid,
            ..
        } => {
            assert_eq!(*current, RunStatus::Completed);
            assert_eq!(*target, RunStatus::Running);
            assert!(valid.is_empty());
        }
        other => panic!("expected InvalidTransition, got {:?}", other),
    }

    let unchanged = db.get_run(&run.run_id).unwrap().unwrap();
    assert_eq!(unchanged.status, RunStatus::Completed);
}

#[test]
fn insufficient_agents_fail_the_run() {
    let db = in_memory_store();
    let service = service(&db, vec![agent("@a")], ActionGenerators::deterministic());

    let err = service.execute_run(&run_config(3, 1)).unwrap_err();
    let cause = run_failure_cause(&err);
    assert!(cause.contains("requested 3, but only 1 available"));

    let runs = db.list_runs().unwrap();
    assert_eq!(runs[0].status, RunStatus::Failed);
}

#[test]
fn invalid_configs_are_rejected_before_any_write() {
    let db = in_memory_store();
    let service = service(&db, vec![agent("@a")], ActionGenerators::deterministic());

    for config in [
        run_config(0, 1),
        run_config(1, 0),
        RunConfig::new(1, 1, "unknown_algorithm"),
        {
            let mut c = run_config(1, 1);
            c.metric_keys = Some(vec![]);
            c
        },
    ] {
        let err = service.execute_run(&config).unwrap_err();
        assert!(
            matches!(err, Error::InvalidInput(_)),
            "expected InvalidInput for {:?}, got {:?}",
            config,
            err
        );
    }

    assert!(db.list_runs().unwrap().is_empty(), "nothing may be written");
}

#[test]
fn unknown_metric_keys_fail_the_run() {
    let db = in_memory_store();
    let service = service(&db, vec![agent("@a")], ActionGenerators::deterministic());

    let mut config = run_config(1, 1);
    config.metric_keys = Some(vec!["sentiment_delta".to_string()]);
    let err = service.execute_run(&config).unwrap_err();
    let cause = run_failure_cause(&err);
    assert!(cause.contains("sentiment_delta"));

    let runs = db.list_runs().unwrap();
    assert_eq!(runs[0].status, RunStatus::Failed);
}

#[test]
fn roster_factory_draws_agents_from_the_store() {
    let db = in_memory_store();
    seed_agents(&db, &[agent("@carol"), agent("@alice"), agent("@bob")]).unwrap();

    let factory = RosterAgentFactory::new(db.clone());
    let agents = factory.create_agents(2).unwrap();
    let handles: Vec<&str> = agents.iter().map(|a| a.handle.as_str()).collect();
    assert_eq!(handles, vec!["@alice", "@bob"], "roster order is by handle");

    let err = factory.create_agents(5).unwrap_err();
    assert!(matches!(err, Error::InsufficientAgents { .. }));
}

/// Wraps the store but fails every status update, to exercise the retry
/// and best-effort paths
struct FailingStatusRepo {
    inner: Arc<Database>,
}

impl RunRepository for FailingStatusRepo {
    fn create_run(&self, config: &RunConfig) -> socialsim_types::Result<socialsim_types::Run> {
        self.inner.create_run(config)
    }

    fn get_run(&self, run_id: &str) -> socialsim_types::Result<Option<socialsim_types::Run>> {
        self.inner.get_run(run_id)
    }

    fn list_runs(&self) -> socialsim_types::Result<Vec<socialsim_types::Run>> {
        self.inner.list_runs()
    }

    fn update_run_status(&self, run_id: &str, _status: RunStatus) -> socialsim_types::Result<()> {
        Err(Error::RunStatusUpdate {
            run_id: run_id.to_string(),
            reason: "disk full".to_string(),
        })
    }

    fn get_turn_metadata(
        &self,
        run_id: &str,
        turn_number: u32,
    ) -> socialsim_types::Result<Option<socialsim_types::TurnMetadata>> {
        self.inner.get_turn_metadata(run_id, turn_number)
    }

    fn list_turn_metadata(
        &self,
        run_id: &str,
    ) -> socialsim_types::Result<Vec<socialsim_types::TurnMetadata>> {
        self.inner.list_turn_metadata(run_id)
    }

    fn write_turn_metadata(
        &self,
        metadata: &socialsim_types::TurnMetadata,
    ) -> socialsim_types::Result<()> {
        self.inner.write_turn_metadata(metadata)
    }
}

#[test]
fn status_updates_retry_with_backoff_then_surface() {
    let db = in_memory_store();
    let run = db.create_run(&run_config(1, 1)).unwrap();

    let sleeps: Arc<Mutex<Vec<Duration>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = sleeps.clone();

    let service = SimulationCommandService::new(SimulationDeps {
        run_repo: Arc::new(FailingStatusRepo { inner: db.clone() }),
        feed_post_repo: db.clone(),
        generated_feed_repo: db.clone(),
        action_repo: db.clone(),
        persistence: db.clone(),
        agent_factory: Box::new(StaticAgentFactory::new(vec![agent("@a")])),
        generators: ActionGenerators::deterministic(),
        history_factory: Box::new(|| Box::new(InMemoryActionHistoryStore::new())),
    })
    .with_sleeper(Box::new(move |delay| {
        recorded.lock().unwrap().push(delay);
    }));

    let err = service
        .update_run_status(&run.run_id, RunStatus::Completed)
        .unwrap_err();
    assert!(matches!(err, Error::RunStatusUpdate { .. }));

    // Exponential schedule between the three attempts: 1s then 2s
    let observed = sleeps.lock().unwrap().clone();
    assert_eq!(
        observed,
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
}
