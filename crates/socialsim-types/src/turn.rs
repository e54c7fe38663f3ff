use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::action::GeneratedAction;
use crate::post::Post;

/// Action kind counted in turn metadata
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TurnAction {
    Like,
    Comment,
    Follow,
}

impl TurnAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnAction::Like => "like",
            TurnAction::Comment => "comment",
            TurnAction::Follow => "follow",
        }
    }
}

/// Per-action totals for one turn, serialized as
/// `{"like": n, "comment": n, "follow": n}`
pub type ActionCounts = BTreeMap<TurnAction, u64>;

/// Build a complete counts map; every action kind is always present
pub fn action_counts(likes: u64, comments: u64, follows: u64) -> ActionCounts {
    BTreeMap::from([
        (TurnAction::Like, likes),
        (TurnAction::Comment, comments),
        (TurnAction::Follow, follows),
    ])
}

/// Metadata for one simulation turn; written exactly once per turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnMetadata {
    pub run_id: String,
    pub turn_number: u32,
    pub total_actions: ActionCounts,
    pub created_at: String,
}

/// Result of executing a single simulation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResult {
    pub turn_number: u32,
    pub total_actions: ActionCounts,
    pub execution_time_ms: Option<u64>,
}

/// Fully hydrated view of one turn for read-side consumers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnData {
    pub turn_number: u32,
    /// agent handle -> hydrated feed posts, preserving feed order
    pub feeds: BTreeMap<String, Vec<Post>>,
    /// agent handle -> generated actions (likes, then comments, then follows)
    pub actions: BTreeMap<String, Vec<GeneratedAction>>,
}
