use std::collections::HashSet;

use socialsim_types::{
    Error, GeneratedComment, GeneratedFollow, GeneratedLike, Result,
};

use crate::history::ActionHistoryStore;

/// Target identifiers extracted by validation, in generator output order.
///
/// Downstream recording consumes these so history state always matches
/// what was validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionTargets {
    pub like_post_ids: Vec<String>,
    pub comment_post_ids: Vec<String>,
    pub follow_user_ids: Vec<String>,
}

fn find_duplicates(identifiers: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for id in identifiers {
        if !seen.insert(id.as_str()) && !duplicates.contains(id) {
            duplicates.push(id.clone());
        }
    }
    duplicates
}

/// Enforce action invariants for one agent's turn output.
///
/// Rejects duplicate targets within any action list and any target
/// already present in the corresponding history set. Read-only with
/// respect to the store; recording happens after validation passes.
pub fn validate_action_rules(
    run_id: &str,
    turn_number: u32,
    agent_handle: &str,
    likes: &[GeneratedLike],
    comments: &[GeneratedComment],
    follows: &[GeneratedFollow],
    history: &dyn ActionHistoryStore,
) -> Result<ActionTargets> {
    let like_post_ids: Vec<String> = likes.iter().map(|l| l.like.post_id.clone()).collect();
    let duplicate_likes = find_duplicates(&like_post_ids);
    if !duplicate_likes.is_empty() {
        return Err(Error::InvariantViolation(format!(
            "Agent {} liked duplicate targets in run {}, turn {}. Duplicate post IDs: {:?}",
            agent_handle, run_id, turn_number, duplicate_likes
        )));
    }

    let comment_post_ids: Vec<String> =
        comments.iter().map(|c| c.comment.post_id.clone()).collect();
    let duplicate_comments = find_duplicates(&comment_post_ids);
    if !duplicate_comments.is_empty() {
        return Err(Error::InvariantViolation(format!(
            "Agent {} commented duplicate targets in run {}, turn {}. Duplicate post IDs: {:?}",
            agent_handle, run_id, turn_number, duplicate_comments
        )));
    }

    let follow_user_ids: Vec<String> =
        follows.iter().map(|f| f.follow.user_id.clone()).collect();
    let duplicate_follows = find_duplicates(&follow_user_ids);
    if !duplicate_follows.is_empty() {
        return Err(Error::InvariantViolation(format!(
            "Agent {} followed duplicate targets in run {}, turn {}. Duplicate user IDs: {:?}",
            agent_handle, run_id, turn_number, duplicate_follows
        )));
    }

    for post_id in &like_post_ids {
        if history.has_liked(run_id, agent_handle, post_id) {
            return Err(Error::InvariantViolation(format!(
                "Agent {} cannot like post {} again in run {}, turn {}",
                agent_handle, post_id, run_id, turn_number
            )));
        }
    }
    for post_id in &comment_post_ids {
        if history.has_commented(run_id, agent_handle, post_id) {
            return Err(Error::InvariantViolation(format!(
                "Agent {} cannot comment on post {} again in run {}, turn {}",
                agent_handle, post_id, run_id, turn_number
            )));
        }
    }
    for user_id in &follow_user_ids {
        if history.has_followed(run_id, agent_handle, user_id) {
            return Err(Error::InvariantViolation(format!(
                "Agent {} cannot follow user {} again in run {}, turn {}",
                agent_handle, user_id, run_id, turn_number
            )));
        }
    }

    Ok(ActionTargets {
        like_post_ids,
        comment_post_ids,
        follow_user_ids,
    })
}
