use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::warn;

use socialsim_types::{
    Agent, FeedPostRepository, GeneratedFeed, GeneratedFeedRepository, Post, Result,
    now_timestamp,
};

use crate::MAX_POSTS_PER_FEED;
use crate::algorithm::AlgorithmConfig;
use crate::candidates::load_candidate_posts;
use crate::registry::create_algorithm;

/// Parameters for one turn's feed generation
#[derive(Debug, Clone, Copy)]
pub struct FeedRequest<'a> {
    pub run_id: &'a str,
    pub turn_number: u32,
    pub feed_algorithm: &'a str,
    pub feed_algorithm_config: Option<&'a AlgorithmConfig>,
}

/// Generate, persist, and hydrate feeds for all agents in a turn.
///
/// Two phases: every agent's feed is computed and written first, then one
/// batch post read hydrates them all. Returns agent handle -> hydrated
/// posts, preserving each feed's order.
pub fn generate_feeds(
    agents: &[Agent],
    request: &FeedRequest<'_>,
    generated_feed_repo: &dyn GeneratedFeedRepository,
    feed_post_repo: &dyn FeedPostRepository,
) -> Result<BTreeMap<String, Vec<Post>>> {
    let algorithm = create_algorithm(request.feed_algorithm)?;

    let mut feeds: BTreeMap<String, GeneratedFeed> = BTreeMap::new();
    for agent in agents {
        let candidates =
            load_candidate_posts(agent, request.run_id, feed_post_repo, generated_feed_repo)?;
        let result = algorithm.generate(
            &candidates,
            agent,
            MAX_POSTS_PER_FEED,
            request.feed_algorithm_config,
        )?;
        feeds.insert(
            agent.handle.clone(),
            GeneratedFeed {
                feed_id: result.feed_id,
                run_id: request.run_id.to_string(),
                turn_number: request.turn_number,
                agent_handle: result.agent_handle,
                post_ids: result.post_ids,
                created_at: now_timestamp(),
            },
        );
    }

    for feed in feeds.values() {
        generated_feed_repo.write_generated_feed(feed)?;
    }

    hydrate_feeds(&feeds, feed_post_repo, request)
}

fn hydrate_feeds(
    feeds: &BTreeMap<String, GeneratedFeed>,
    feed_post_repo: &dyn FeedPostRepository,
    request: &FeedRequest<'_>,
) -> Result<BTreeMap<String, Vec<Post>>> {
    let all_ids: BTreeSet<&String> = feeds.values().flat_map(|f| f.post_ids.iter()).collect();
    let id_list: Vec<String> = all_ids.into_iter().cloned().collect();
    let posts = feed_post_repo.read_posts_by_ids(&id_list)?;
    let by_id: HashMap<&str, &Post> = posts.iter().map(|p| (p.post_id.as_str(), p)).collect();

    let mut hydrated: BTreeMap<String, Vec<Post>> = BTreeMap::new();
    for (agent_handle, feed) in feeds {
        let mut feed_posts = Vec::with_capacity(feed.post_ids.len());
        let mut missing: Vec<&str> = Vec::new();
        for post_id in &feed.post_ids {
            match by_id.get(post_id.as_str()) {
                Some(post) => feed_posts.push((*post).clone()),
                None => missing.push(post_id),
            }
        }
        if !missing.is_empty() {
            log_missing_posts(agent_handle, feed, &missing, request);
        }
        hydrated.insert(agent_handle.clone(), feed_posts);
    }
    Ok(hydrated)
}

// One aggregated warning per agent: first five missing ids, then a count
fn log_missing_posts(
    agent_handle: &str,
    feed: &GeneratedFeed,
    missing: &[&str],
    request: &FeedRequest<'_>,
) {
    let mut preview = missing[..missing.len().min(5)].join(", ");
    if missing.len() > 5 {
        preview.push_str(&format!(", ... ({} more)", missing.len() - 5));
    }
    warn!(
        agent_handle,
        run_id = request.run_id,
        turn_number = request.turn_number,
        feed_id = %feed.feed_id,
        missing_count = missing.len(),
        missing_post_ids = %preview,
        "feed references posts that no longer exist"
    );
}
