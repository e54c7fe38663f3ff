use crate::history::ActionHistoryStore;
use crate::validator::ActionTargets;

/// Record validated targets into the history store.
///
/// Order is likes, then comments, then follows, matching validator
/// return order so history state is observable consistently.
pub fn record_action_targets(
    history: &mut dyn ActionHistoryStore,
    run_id: &str,
    agent_handle: &str,
    targets: &ActionTargets,
) {
    for post_id in &targets.like_post_ids {
        history.record_like(run_id, agent_handle, post_id);
    }
    for post_id in &targets.comment_post_ids {
        history.record_comment(run_id, agent_handle, post_id);
    }
    for user_id in &targets.follow_user_ids {
        history.record_follow(run_id, agent_handle, user_id);
    }
}
