//! Random-simple policies: top-k selection by the shared scorer, each
//! candidate gated behind a fixed probability.
//!
//! With a configured seed the RNG is derived per (seed, run, turn,
//! agent), so seeded runs replay identically.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::debug;

use socialsim_types::{
    Comment, Follow, GeneratedComment, GeneratedFollow, GeneratedLike, GenerationMetadata, Like,
    Post, Result, now_timestamp,
};

use super::{
    CommentGenerator, FollowGenerator, GenerationContext, LikeGenerator, comment_id,
    comment_text, follow_id, like_id, rank_by_score, rank_unique_authors,
};

const TOP_K_POSTS_TO_LIKE: usize = 2;
const TOP_K_POSTS_TO_COMMENT: usize = 2;
const TOP_K_USERS_TO_FOLLOW: usize = 2;
const LIKE_PROBABILITY: f64 = 0.30;
const COMMENT_PROBABILITY: f64 = 0.30;
const FOLLOW_PROBABILITY: f64 = 0.30;
const EXPLANATION: &str = "Simple: recency/social proof with random probability";
const POLICY: &str = "simple";

fn derive_rng(seed: Option<u64>, ctx: &GenerationContext<'_>, action: &str) -> StdRng {
    match seed {
        Some(seed) => {
            let mut hasher = Sha256::new();
            hasher.update(seed.to_le_bytes());
            hasher.update(ctx.run_id.as_bytes());
            hasher.update(ctx.turn_number.to_le_bytes());
            hasher.update(ctx.agent_handle.as_bytes());
            hasher.update(action.as_bytes());
            let digest = hasher.finalize();
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&digest[..8]);
            StdRng::seed_from_u64(u64::from_le_bytes(bytes))
        }
        None => StdRng::from_entropy(),
    }
}

fn metadata(probability: f64, created_at: &str) -> GenerationMetadata {
    GenerationMetadata {
        model_used: None,
        generation_metadata: Some(json!({
            "policy": POLICY,
            "probability": probability,
        })),
        created_at: created_at.to_string(),
    }
}

/// Likes each top-k candidate with fixed probability
pub struct RandomSimpleLikeGenerator {
    seed: Option<u64>,
}

impl RandomSimpleLikeGenerator {
    pub fn new() -> Self {
        Self { seed: None }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }
}

impl Default for RandomSimpleLikeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl LikeGenerator for RandomSimpleLikeGenerator {
    fn algorithm(&self) -> &'static str {
        "random_simple"
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

        let mut rng = derive_rng(self.seed, ctx, "like");
        let mut generated = Vec::new();
        for post in rank_by_score(candidates).into_iter().take(TOP_K_POSTS_TO_LIKE) {
            if !rng.gen_bool(LIKE_PROBABILITY) {
                continue;
            }
            let created_at = now_timestamp();
            generated.push(GeneratedLike {
                like: Like {
                    like_id: like_id(ctx, &post.post_id),
                    agent_id: ctx.agent_handle.to_string(),
                    post_id: post.post_id.clone(),
                    created_at: created_at.clone(),
                },
                explanation: EXPLANATION.to_string(),
                metadata: metadata(LIKE_PROBABILITY, &created_at),
            });
        }
        Ok(generated)
    }
}

/// Comments on each top-k candidate with fixed probability
pub struct RandomSimpleCommentGenerator {
    seed: Option<u64>,
}

impl RandomSimpleCommentGenerator {
    pub fn new() -> Self {
        Self { seed: None }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }
}

impl Default for RandomSimpleCommentGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CommentGenerator for RandomSimpleCommentGenerator {
    fn algorithm(&self) -> &'static str {
        "random_simple"
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

        let mut rng = derive_rng(self.seed, ctx, "comment");
        let mut generated = Vec::new();
        for post in rank_by_score(candidates)
            .into_iter()
            .take(TOP_K_POSTS_TO_COMMENT)
        {
            if !rng.gen_bool(COMMENT_PROBABILITY) {
                continue;
            }
            let created_at = now_timestamp();
            generated.push(GeneratedComment {
                comment: Comment {
                    comment_id: comment_id(ctx, &post.post_id),
                    agent_id: ctx.agent_handle.to_string(),
                    post_id: post.post_id.clone(),
                    text: comment_text(post),
                    created_at: created_at.clone(),
                },
                explanation: EXPLANATION.to_string(),
                metadata: metadata(COMMENT_PROBABILITY, &created_at),
            });
        }
        Ok(generated)
    }
}

/// Follows each top-k unique author with fixed probability.
///
/// Walks the full author ranking and stops once k follows fired, like the
/// like/comment variants would if their candidate pools were deeper.
pub struct RandomSimpleFollowGenerator {
    seed: Option<u64>,
}

impl RandomSimpleFollowGenerator {
    pub fn new() -> Self {
        Self { seed: None }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }
}

impl Default for RandomSimpleFollowGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl FollowGenerator for RandomSimpleFollowGenerator {
    fn algorithm(&self) -> &'static str {
        "random_simple"
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

        let mut rng = derive_rng(self.seed, ctx, "follow");
        let mut generated = Vec::new();
        for post in rank_unique_authors(candidates, ctx.agent_handle) {
            if !rng.gen_bool(FOLLOW_PROBABILITY) {
                continue;
            }
            let created_at = now_timestamp();
            generated.push(GeneratedFollow {
                follow: Follow {
                    follow_id: follow_id(ctx, &post.author_handle),
                    agent_id: ctx.agent_handle.to_string(),
                    user_id: post.author_handle.clone(),
                    created_at: created_at.clone(),
                },
                explanation: EXPLANATION.to_string(),
                metadata: metadata(FOLLOW_PROBABILITY, &created_at),
            });
            if generated.len() >= TOP_K_USERS_TO_FOLLOW {
                break;
            }
        }
        Ok(generated)
    }
}
