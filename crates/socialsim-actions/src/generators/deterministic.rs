//! Deterministic policies: reproducible output from recency and
//! social-proof scoring.
//!
//! Likes and comments take the top-k candidates outright. Follows rank
//! one best post per author and then gate each author behind a
//! deterministic pseudo-random roll, so follow volume stays probabilistic
//! in shape while remaining exactly replayable.

use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::debug;

use socialsim_types::{
    Comment, Follow, GeneratedComment, GeneratedFollow, GeneratedLike, GenerationMetadata, Like,
    Post, Result,
};

use super::{
    CommentGenerator, FollowGenerator, GenerationContext, LikeGenerator, comment_id,
    comment_text, follow_id, like_id, rank_by_score, rank_unique_authors,
};

const TOP_K_POSTS_TO_LIKE: usize = 2;
const TOP_K_POSTS_TO_COMMENT: usize = 2;
const TOP_K_USERS_TO_FOLLOW: usize = 2;
const FOLLOW_PROBABILITY: f64 = 0.30;
const EXPLANATION: &str = "Deterministic: recency and social proof";
const FOLLOW_EXPLANATION: &str = "Deterministic: recency/social proof with probability gate";
const POLICY: &str = "deterministic";

// First 8 hex digits of the roll hash, interpreted over 16^8
const ROLL_HASH_PREFIX_BYTES: usize = 4;
const ROLL_DENOMINATOR: f64 = 4_294_967_296.0;

// Derived creation stamps keep the whole output reproducible; wall-clock
// timestamps would break output equality across invocations.
fn derived_created_at(ctx: &GenerationContext<'_>, index: usize) -> String {
    format!(
        "det_{}_turn{}_{}_{}",
        ctx.run_id, ctx.turn_number, ctx.agent_handle, index
    )
}

fn metadata(created_at: &str) -> GenerationMetadata {
    GenerationMetadata {
        model_used: None,
        generation_metadata: Some(json!({"policy": POLICY})),
        created_at: created_at.to_string(),
    }
}

fn follow_metadata(roll: f64, created_at: &str) -> GenerationMetadata {
    GenerationMetadata {
        model_used: None,
        generation_metadata: Some(json!({
            "policy": POLICY,
            "follow_probability": FOLLOW_PROBABILITY,
            "roll": roll,
        })),
        created_at: created_at.to_string(),
    }
}

/// Pseudo-random roll in [0, 1) fixed by the (run, turn, agent, target)
/// tuple
fn follow_roll(ctx: &GenerationContext<'_>, user_id: &str) -> f64 {
    let mut hasher = Sha256::new();
    hasher.update(format!(
        "{}:{}:{}:{}",
        ctx.run_id, ctx.turn_number, ctx.agent_handle, user_id
    ));
    let digest = hasher.finalize();
    let mut prefix = [0u8; ROLL_HASH_PREFIX_BYTES];
    prefix.copy_from_slice(&digest[..ROLL_HASH_PREFIX_BYTES]);
    u32::from_be_bytes(prefix) as f64 / ROLL_DENOMINATOR
}

/// Likes the top-k candidates by recency + social proof
pub struct DeterministicLikeGenerator;

impl LikeGenerator for DeterministicLikeGenerator {
    fn algorithm(&self) -> &'static str {
        POLICY
    }

    fn generate(
        &self,
        candidates: &[Post],
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<GeneratedLike>> {
        if candidates.is_empty() {
            debug!(agent_handle = ctx.agent_handle, "no like candidates");
            return Ok(Vec::new());
        }

        Ok(rank_by_score(candidates)
            .into_iter()
            .take(TOP_K_POSTS_TO_LIKE)
            .enumerate()
            .map(|(index, post)| {
                let created_at = derived_created_at(ctx, index);
                GeneratedLike {
                    like: Like {
                        like_id: like_id(ctx, &post.post_id),
                        agent_id: ctx.agent_handle.to_string(),
                        post_id: post.post_id.clone(),
                        created_at: created_at.clone(),
                    },
                    explanation: EXPLANATION.to_string(),
                    metadata: metadata(&created_at),
                }
            })
            .collect())
    }
}

/// Comments on the top-k candidates with a derived reply body
pub struct DeterministicCommentGenerator;

impl CommentGenerator for DeterministicCommentGenerator {
    fn algorithm(&self) -> &'static str {
        POLICY
    }

    fn generate(
        &self,
        candidates: &[Post],
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<GeneratedComment>> {
        if candidates.is_empty() {
            debug!(agent_handle = ctx.agent_handle, "no comment candidates");
            return Ok(Vec::new());
        }

        Ok(rank_by_score(candidates)
            .into_iter()
            .take(TOP_K_POSTS_TO_COMMENT)
            .enumerate()
            .map(|(index, post)| {
                let created_at = derived_created_at(ctx, index);
                GeneratedComment {
                    comment: Comment {
                        comment_id: comment_id(ctx, &post.post_id),
                        agent_id: ctx.agent_handle.to_string(),
                        post_id: post.post_id.clone(),
                        text: comment_text(post),
                        created_at: created_at.clone(),
                    },
                    explanation: EXPLANATION.to_string(),
                    metadata: metadata(&created_at),
                }
            })
            .collect())
    }
}

/// Follows the best-scoring authors that pass the deterministic
/// probability gate, at most k per turn
pub struct DeterministicFollowGenerator;

impl FollowGenerator for DeterministicFollowGenerator {
    fn algorithm(&self) -> &'static str {
        POLICY
    }

    fn generate(
        &self,
        candidates: &[Post],
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<GeneratedFollow>> {
        if candidates.is_empty() {
            debug!(agent_handle = ctx.agent_handle, "no follow candidates");
            return Ok(Vec::new());
        }

        let mut generated = Vec::new();
        for post in rank_unique_authors(candidates, ctx.agent_handle) {
            let roll = follow_roll(ctx, &post.author_handle);
            if roll >= FOLLOW_PROBABILITY {
                continue;
            }

            let created_at = derived_created_at(ctx, generated.len());
            generated.push(GeneratedFollow {
                follow: Follow {
                    follow_id: follow_id(ctx, &post.author_handle),
                    agent_id: ctx.agent_handle.to_string(),
                    user_id: post.author_handle.clone(),
                    created_at: created_at.clone(),
                },
                explanation: FOLLOW_EXPLANATION.to_string(),
                metadata: follow_metadata(roll, &created_at),
            });
            if generated.len() >= TOP_K_USERS_TO_FOLLOW {
                break;
            }
        }
        Ok(generated)
    }
}
