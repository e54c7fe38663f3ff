//! Action generator contracts and policy implementations.
//!
//! Generators are pure policies over their candidate list: they never
//! consult storage and never record history. Every generator returns an
//! empty list (and logs) on an empty candidate list, emits each target at
//! most once, and only targets present in its candidates.

pub mod deterministic;
pub mod naive_llm;
pub mod random_simple;

use chrono::DateTime;

use socialsim_types::{GeneratedComment, GeneratedFollow, GeneratedLike, Post, Result};

/// Identifies the (run, turn, agent) a generation call is for
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext<'a> {
    pub run_id: &'a str,
    pub turn_number: u32,
    pub agent_handle: &'a str,
}

pub trait LikeGenerator: Send + Sync {
    /// Registry algorithm name
    fn algorithm(&self) -> &'static str;

    fn generate(
        &self,
        candidates: &[Post],
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<GeneratedLike>>;
}

pub trait CommentGenerator: Send + Sync {
    fn algorithm(&self) -> &'static str;

    fn generate(
        &self,
        candidates: &[Post],
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<GeneratedComment>>;
}

pub trait FollowGenerator: Send + Sync {
    fn algorithm(&self) -> &'static str;

    fn generate(
        &self,
        candidates: &[Post],
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<GeneratedFollow>>;
}

// Scoring weights shared by the deterministic and random-simple policies
pub(crate) const RECENCY_WEIGHT: f64 = 1.0;
pub(crate) const LIKE_COUNT_WEIGHT: f64 = 1.0;
pub(crate) const REPOST_WEIGHT: f64 = 0.5;
pub(crate) const REPLY_WEIGHT: f64 = 0.5;

/// Recency plus social proof
pub(crate) fn score_post(post: &Post) -> f64 {
    recency_score(&post.created_at) * RECENCY_WEIGHT
        + post.like_count as f64 * LIKE_COUNT_WEIGHT
        + post.repost_count as f64 * REPOST_WEIGHT
        + post.reply_count as f64 * REPLY_WEIGHT
}

// Unparseable timestamps score zero rather than failing the policy
pub(crate) fn recency_score(created_at: &str) -> f64 {
    DateTime::parse_from_rfc3339(created_at)
        .map(|dt| dt.timestamp() as f64)
        .unwrap_or(0.0)
}

/// Candidates sorted by score descending, ties broken by post id
pub(crate) fn rank_by_score<'a>(candidates: &'a [Post]) -> Vec<&'a Post> {
    let mut scored: Vec<(f64, &Post)> = candidates.iter().map(|p| (score_post(p), p)).collect();
    scored.sort_by(|(score_a, post_a), (score_b, post_b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| post_a.post_id.cmp(&post_b.post_id))
    });
    scored.into_iter().map(|(_, post)| post).collect()
}

/// One best-scoring post per author (excluding the agent), sorted by
/// score descending with (author, post id) tie-breaks
pub(crate) fn rank_unique_authors<'a>(
    candidates: &'a [Post],
    agent_handle: &str,
) -> Vec<&'a Post> {
    let mut best_by_author: std::collections::HashMap<&str, (f64, &Post)> =
        std::collections::HashMap::new();
    for post in candidates {
        if post.author_handle == agent_handle {
            continue;
        }
        let score = score_post(post);
        let replace = match best_by_author.get(post.author_handle.as_str()) {
            Some((existing_score, existing_post)) => {
                score > *existing_score
                    || (score == *existing_score && post.post_id < existing_post.post_id)
            }
            None => true,
        };
        if replace {
            best_by_author.insert(post.author_handle.as_str(), (score, post));
        }
    }

    let mut ranked: Vec<(f64, &Post)> = best_by_author.into_values().collect();
    ranked.sort_by(|(score_a, post_a), (score_b, post_b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| post_a.author_handle.cmp(&post_b.author_handle))
            .then_with(|| post_a.post_id.cmp(&post_b.post_id))
    });
    ranked.into_iter().map(|(_, post)| post).collect()
}

pub(crate) fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max).collect();
        format!("{}...", kept)
    }
}

/// Comment body shared by the non-LLM comment policies
pub(crate) fn comment_text(post: &Post) -> String {
    let snippet = truncate_text(post.text.trim(), 80);
    if snippet.is_empty() {
        format!("Replying to {}.", post.author_handle)
    } else {
        format!("Replying to {}: {}", post.author_handle, snippet)
    }
}

pub(crate) fn like_id(ctx: &GenerationContext<'_>, post_id: &str) -> String {
    format!(
        "like_{}_{}_{}_{}",
        ctx.run_id, ctx.turn_number, ctx.agent_handle, post_id
    )
}

pub(crate) fn comment_id(ctx: &GenerationContext<'_>, post_id: &str) -> String {
    format!(
        "comment_{}_{}_{}_{}",
        ctx.run_id, ctx.turn_number, ctx.agent_handle, post_id
    )
}

pub(crate) fn follow_id(ctx: &GenerationContext<'_>, user_id: &str) -> String {
    format!(
        "follow_{}_{}_{}_{}",
        ctx.run_id, ctx.turn_number, ctx.agent_handle, user_id
    )
}
