use socialsim_types::{Agent, Post, Result};

/// Free-form configuration passed to a feed algorithm
pub type AlgorithmConfig = serde_json::Map<String, serde_json::Value>;

/// Output of a feed algorithm: an ordered selection of post ids for one
/// agent, bounded by the caller's limit
#[derive(Debug, Clone, PartialEq)]
pub struct FeedAlgorithmResult {
    pub feed_id: String,
    pub agent_handle: String,
    pub post_ids: Vec<String>,
}

/// A named, pure feed ranking function.
///
/// Implementations must not perform I/O and must be deterministic: the
/// same (candidates, agent, limit, config) always produces the same
/// ordered post ids. Unknown config values are rejected, not ignored.
pub trait FeedAlgorithm: Send + Sync {
    /// Registry name (e.g. "chronological")
    fn name(&self) -> &'static str;

    fn generate(
        &self,
        candidates: &[Post],
        agent: &Agent,
        limit: usize,
        config: Option<&AlgorithmConfig>,
    ) -> Result<FeedAlgorithmResult>;
}
