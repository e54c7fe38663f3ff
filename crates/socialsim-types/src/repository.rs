//! Repository ports for durable simulation state.
//!
//! The concrete storage engine lives behind these traits; only the
//! behavioral contracts below are part of the engine's core. Every method
//! is self-committing. The one place multi-write atomicity is required,
//! `SimulationPersistence` scopes a single transaction internally.

use std::collections::HashSet;

use crate::action::{
    GeneratedComment, GeneratedFollow, GeneratedLike, PersistedComment, PersistedFollow,
    PersistedLike,
};
use crate::agent::{Agent, AgentBio};
use crate::error::Result;
use crate::feed::GeneratedFeed;
use crate::metrics::{RunMetrics, TurnMetrics};
use crate::post::Post;
use crate::run::{Run, RunConfig, RunStatus};
use crate::turn::TurnMetadata;

/// Durable storage of runs and their turn metadata
pub trait RunRepository: Send + Sync {
    /// Create a run in RUNNING state. Assigns run_id and timestamps;
    /// defaults metric keys when the config omits them. Storage failure
    /// surfaces as `RunCreation`.
    fn create_run(&self, config: &RunConfig) -> Result<Run>;

    fn get_run(&self, run_id: &str) -> Result<Option<Run>>;

    /// All runs, newest first by created_at
    fn list_runs(&self) -> Result<Vec<Run>>;

    /// Apply a lifecycle transition. Validates against the state machine
    /// (`InvalidTransition`), misses raise `RunNotFound`, storage failures
    /// raise `RunStatusUpdate`. Same-state transitions are no-ops.
    fn update_run_status(&self, run_id: &str, status: RunStatus) -> Result<()>;

    fn get_turn_metadata(&self, run_id: &str, turn_number: u32) -> Result<Option<TurnMetadata>>;

    /// Turn metadata for a run, ascending by turn_number
    fn list_turn_metadata(&self, run_id: &str) -> Result<Vec<TurnMetadata>>;

    /// Insert turn metadata, unique on (run_id, turn_number); a conflict
    /// raises `DuplicateTurnMetadata`
    fn write_turn_metadata(&self, metadata: &TurnMetadata) -> Result<()>;
}

/// Read-only post corpus plus seeding writes
pub trait FeedPostRepository: Send + Sync {
    fn write_posts(&self, posts: &[Post]) -> Result<()>;

    /// Full corpus scan; candidate loading filters from this
    fn list_all_posts(&self) -> Result<Vec<Post>>;

    /// Batch read preserving input order; missing ids are silently omitted
    fn read_posts_by_ids(&self, post_ids: &[String]) -> Result<Vec<Post>>;
}

/// Durable storage of per-(run, turn, agent) generated feeds
pub trait GeneratedFeedRepository: Send + Sync {
    /// Upsert by (agent_handle, run_id, turn_number) with replace
    /// semantics; recomputation is safe
    fn write_generated_feed(&self, feed: &GeneratedFeed) -> Result<()>;

    fn read_generated_feed(
        &self,
        agent_handle: &str,
        run_id: &str,
        turn_number: u32,
    ) -> Result<Option<GeneratedFeed>>;

    fn read_feeds_for_turn(&self, run_id: &str, turn_number: u32) -> Result<Vec<GeneratedFeed>>;

    /// Union of post ids across every feed generated for this agent in
    /// this run (the "already seen" set)
    fn seen_post_ids(&self, agent_handle: &str, run_id: &str) -> Result<HashSet<String>>;
}

/// Durable storage of accepted actions; ids are caller-supplied
pub trait ActionRepository: Send + Sync {
    fn write_likes(&self, run_id: &str, turn_number: u32, likes: &[GeneratedLike]) -> Result<()>;
    fn write_comments(
        &self,
        run_id: &str,
        turn_number: u32,
        comments: &[GeneratedComment],
    ) -> Result<()>;
    fn write_follows(
        &self,
        run_id: &str,
        turn_number: u32,
        follows: &[GeneratedFollow],
    ) -> Result<()>;

    fn read_likes_for_turn(&self, run_id: &str, turn_number: u32) -> Result<Vec<PersistedLike>>;
    fn read_comments_for_turn(
        &self,
        run_id: &str,
        turn_number: u32,
    ) -> Result<Vec<PersistedComment>>;
    fn read_follows_for_turn(
        &self,
        run_id: &str,
        turn_number: u32,
    ) -> Result<Vec<PersistedFollow>>;
}

/// Read side of metric storage; writes go through `SimulationPersistence`
pub trait MetricsRepository: Send + Sync {
    fn read_turn_metrics(&self, run_id: &str, turn_number: u32) -> Result<Option<TurnMetrics>>;
    fn read_run_metrics(&self, run_id: &str) -> Result<Option<RunMetrics>>;
}

/// Durable agent roster and versioned persona bios
pub trait AgentRepository: Send + Sync {
    /// Insert an agent; a handle collision raises `HandleAlreadyExists`
    fn write_agent(&self, agent: &Agent) -> Result<()>;

    /// Stable roster order (by handle)
    fn list_agents(&self) -> Result<Vec<Agent>>;

    fn write_agent_bio(&self, bio: &AgentBio) -> Result<()>;

    /// The bio with the highest created_at for this agent
    fn latest_bio(&self, agent_id: &str) -> Result<Option<AgentBio>>;
}

/// Transactional writes that must land together
pub trait SimulationPersistence: Send + Sync {
    /// Persist one turn: metadata then metrics under a single transaction.
    /// Any failure rolls back both; no partial turn state is ever visible.
    fn write_turn(&self, metadata: &TurnMetadata, metrics: &TurnMetrics) -> Result<()>;

    /// Persist run metrics and the COMPLETED transition under a single
    /// transaction
    fn write_run(&self, run_id: &str, metrics: &RunMetrics) -> Result<()>;
}
