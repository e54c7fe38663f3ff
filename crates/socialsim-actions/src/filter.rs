use socialsim_types::Post;

use crate::history::ActionHistoryStore;

/// Action-specific candidate lists for a single agent.
///
/// Each generator sees only its own list; a post the agent already liked
/// can still be commented on, and vice versa.
#[derive(Debug, Clone)]
pub struct ActionCandidates {
    pub like_candidates: Vec<Post>,
    pub comment_candidates: Vec<Post>,
    pub follow_candidates: Vec<Post>,
}

/// Filter a hydrated feed into per-action eligible candidates using the
/// history store
pub fn filter_candidates(
    run_id: &str,
    agent_handle: &str,
    feed: &[Post],
    history: &dyn ActionHistoryStore,
) -> ActionCandidates {
    ActionCandidates {
        like_candidates: feed
            .iter()
            .filter(|post| !history.has_liked(run_id, agent_handle, &post.post_id))
            .cloned()
            .collect(),
        comment_candidates: feed
            .iter()
            .filter(|post| !history.has_commented(run_id, agent_handle, &post.post_id))
            .cloned()
            .collect(),
        follow_candidates: feed
            .iter()
            .filter(|post| !history.has_followed(run_id, agent_handle, &post.author_handle))
            .cloned()
            .collect(),
    }
}
