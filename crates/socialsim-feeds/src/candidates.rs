use socialsim_types::{Agent, FeedPostRepository, GeneratedFeedRepository, Post, Result};

/// Load candidate posts for one agent's feed.
///
/// Removes posts the agent has already seen in this run (any earlier
/// generated feed) and posts the agent authored.
//
// TODO: load per-agent candidates instead of scanning the full corpus
// once the post repository grows a filtered query.
pub fn load_candidate_posts(
    agent: &Agent,
    run_id: &str,
    feed_post_repo: &dyn FeedPostRepository,
    generated_feed_repo: &dyn GeneratedFeedRepository,
) -> Result<Vec<Post>> {
    let posts = feed_post_repo.list_all_posts()?;
    let seen = generated_feed_repo.seen_post_ids(&agent.handle, run_id)?;
    Ok(posts
        .into_iter()
        .filter(|post| !seen.contains(&post.post_id) && post.author_handle != agent.handle)
        .collect())
}
