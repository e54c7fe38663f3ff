//! Per-agent action generation: candidate filtering, policy dispatch,
//! invariant enforcement, and history recording.

mod config;
mod filter;
mod generators;
mod history;
mod pipeline;
mod recorder;
mod registry;
mod validator;

pub use config::{ActionGeneratorConfig, fallback_algorithm};
pub use filter::{ActionCandidates, filter_candidates};
pub use generators::deterministic::{
    DeterministicCommentGenerator, DeterministicFollowGenerator, DeterministicLikeGenerator,
};
pub use generators::naive_llm::{
    NaiveLlmCommentGenerator, NaiveLlmFollowGenerator, NaiveLlmLikeGenerator,
};
pub use generators::random_simple::{
    RandomSimpleCommentGenerator, RandomSimpleFollowGenerator, RandomSimpleLikeGenerator,
};
pub use generators::{CommentGenerator, FollowGenerator, GenerationContext, LikeGenerator};
pub use history::{ActionHistoryStore, InMemoryActionHistoryStore};
pub use pipeline::{AgentTurnActions, run_action_pipeline};
pub use recorder::record_action_targets;
pub use registry::{
    ActionGenerators, create_comment_generator, create_follow_generator, create_like_generator,
    generator_algorithms,
};
pub use validator::{ActionTargets, validate_action_rules};
