//! Builders for the domain objects tests construct over and over.

use socialsim_types::{Agent, PersonaSource, Post, PostSource, RunConfig};

/// A bluesky post with zeroed counters
pub fn post(uri: &str, author_handle: &str, created_at: &str) -> Post {
    let mut post = Post::new(PostSource::Bluesky, uri, author_handle, created_at);
    post.author_display_name = author_handle.trim_start_matches('@').to_string();
    post.text = format!("post {}", uri);
    post
}

/// A bluesky post with the engagement counters policies score on
pub fn post_with_counts(
    uri: &str,
    author_handle: &str,
    created_at: &str,
    like_count: u64,
    repost_count: u64,
    reply_count: u64,
) -> Post {
    let mut p = post(uri, author_handle, created_at);
    p.like_count = like_count;
    p.repost_count = repost_count;
    p.reply_count = reply_count;
    p
}

/// Sequentially timestamped posts, `uri_prefix_0..uri_prefix_{count-1}`,
/// each authored by a distinct handle
pub fn post_corpus(uri_prefix: &str, count: usize) -> Vec<Post> {
    (0..count)
        .map(|i| {
            post(
                &format!("{}_{}", uri_prefix, i),
                &format!("@author{}", i % 7),
                &format!("2024-01-01T00:{:02}:{:02}Z", (i / 60) % 60, i % 60),
            )
        })
        .collect()
}

/// A user-generated agent with a normalized handle
pub fn agent(handle: &str) -> Agent {
    Agent::new(
        format!("agent_{}", handle.trim_start_matches('@').to_lowercase()),
        handle,
        handle.trim_start_matches('@').to_string(),
        PersonaSource::UserGenerated,
    )
}

/// A chronological run config
pub fn run_config(num_agents: u32, num_turns: u32) -> RunConfig {
    RunConfig::new(num_agents, num_turns, "chronological")
}
