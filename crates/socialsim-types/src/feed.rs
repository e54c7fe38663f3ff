use serde::{Deserialize, Serialize};

/// A feed generated for one agent in one turn.
///
/// Composite identity is `(agent_handle, run_id, turn_number)`; writes are
/// idempotent replacements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedFeed {
    pub feed_id: String,
    pub run_id: String,
    pub turn_number: u32,
    pub agent_handle: String,
    /// Ordered post ids, bounded by the feed size limit
    pub post_ids: Vec<String>,
    pub created_at: String,
}
