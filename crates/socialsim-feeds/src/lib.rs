//! Feed generation: candidate loading, algorithm dispatch, persistence,
//! and hydration.
//!
//! The pipeline runs once per turn. Feed size limits live here, at the
//! orchestration layer; algorithm implementations receive the limit as a
//! parameter.

mod algorithm;
mod candidates;
mod chronological;
mod pipeline;
mod registry;

pub use algorithm::{AlgorithmConfig, FeedAlgorithm, FeedAlgorithmResult};
pub use candidates::load_candidate_posts;
pub use chronological::ChronologicalFeedAlgorithm;
pub use pipeline::{FeedRequest, generate_feeds};
pub use registry::{algorithm_names, create_algorithm, validate_algorithm};

/// Upper bound on posts in a single generated feed
pub const MAX_POSTS_PER_FEED: usize = 20;
