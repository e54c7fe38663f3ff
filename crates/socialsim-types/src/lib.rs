mod util;

pub mod action;
pub mod agent;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod post;
pub mod repository;
pub mod run;
pub mod turn;

pub use action::{
    Comment, DEFAULT_ACTION_EXPLANATION, Follow, GeneratedAction, GeneratedComment,
    GeneratedFollow, GeneratedLike, GenerationMetadata, Like, PersistedComment, PersistedFollow,
    PersistedLike, normalize_action_explanation,
};
pub use agent::{Agent, AgentBio, BioSource, PersonaSource, normalize_handle};
pub use error::{Error, Result};
pub use feed::GeneratedFeed;
pub use metrics::{RunMetrics, TurnMetrics, default_metric_keys};
pub use post::{Post, PostSource, canonical_post_id};
pub use repository::{
    ActionRepository, AgentRepository, FeedPostRepository, GeneratedFeedRepository,
    MetricsRepository, RunRepository, SimulationPersistence,
};
pub use run::{
    DEFAULT_FEED_ALGORITHM, Run, RunConfig, RunStatus, Transition, check_status_transition,
};
pub use turn::{ActionCounts, TurnAction, TurnData, TurnMetadata, TurnResult, action_counts};
pub use util::{compact_timestamp, now_timestamp};
