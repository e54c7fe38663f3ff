//! Naive LLM policies: a single structured completion per agent per
//! action, with the candidate list inlined into the prompt.
//!
//! The model is untrusted: replies are filtered to the candidate set,
//! deduplicated, and sorted by target id before anything downstream sees
//! them.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use socialsim_llm::{
    CompletionRequest, RetryPolicy, StructuredCompletion, complete_with_retry, parse_structured,
};
use socialsim_types::{
    Comment, Follow, GeneratedComment, GeneratedFollow, GeneratedLike, GenerationMetadata, Like,
    Post, Result, now_timestamp,
};

use super::{
    CommentGenerator, FollowGenerator, GenerationContext, LikeGenerator, comment_id, follow_id,
    like_id, truncate_text,
};

const EXPLANATION: &str = "LLM prediction (naive_llm)";
const POLICY: &str = "naive_llm";
const PROMPT_TEXT_LIMIT: usize = 200;

fn metadata(model_used: &str, created_at: &str) -> GenerationMetadata {
    GenerationMetadata {
        model_used: Some(model_used.to_string()),
        generation_metadata: Some(json!({"policy": POLICY})),
        created_at: created_at.to_string(),
    }
}

fn posts_as_prompt_json(candidates: &[Post]) -> String {
    // Sorted by post id so the prompt is stable for identical inputs
    let mut entries: Vec<&Post> = candidates.iter().collect();
    entries.sort_by(|a, b| a.post_id.cmp(&b.post_id));
    let items: Vec<serde_json::Value> = entries
        .iter()
        .map(|p| {
            json!({
                "post_id": p.post_id,
                "author_handle": p.author_handle,
                "like_count": p.like_count,
                "text": truncate_text(&p.text, PROMPT_TEXT_LIMIT),
            })
        })
        .collect();
    serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string())
}

/// Keep only ids present in the candidate set, drop repeats, and return
/// them in stable sorted order
fn sanitize_targets(proposed: Vec<String>, valid: &HashSet<&str>) -> Vec<String> {
    let mut kept: Vec<String> = proposed
        .into_iter()
        .filter(|id| valid.contains(id.as_str()))
        .collect();
    kept.sort();
    kept.dedup();
    kept
}

#[derive(Debug, Deserialize)]
struct LikePrediction {
    post_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CommentSelection {
    post_id: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct CommentPrediction {
    selections: Vec<CommentSelection>,
}

#[derive(Debug, Deserialize)]
struct FollowPrediction {
    user_ids: Vec<String>,
}

/// Predicts which candidate posts the agent would like
pub struct NaiveLlmLikeGenerator {
    client: Arc<dyn StructuredCompletion>,
    retry: RetryPolicy,
}

impl NaiveLlmLikeGenerator {
    pub fn new(client: Arc<dyn StructuredCompletion>) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl LikeGenerator for NaiveLlmLikeGenerator {
    fn algorithm(&self) -> &'static str {
        POLICY
    }

    fn generate(
        &self,
        candidates: &[Post],
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<GeneratedLike>> {
        if candidates.is_empty() {
            warn!(
                agent_handle = ctx.agent_handle,
                "naive_llm like generator called with no candidates"
            );
            return Ok(Vec::new());
        }

        let prompt = format!(
            "Predict which of these posts the user {} would like.\n\n\
             Posts:\n{}\n\n\
             Reply with JSON: {{\"post_ids\": [\"...\"]}}",
            ctx.agent_handle,
            posts_as_prompt_json(candidates),
        );
        let value = complete_with_retry(
            self.client.as_ref(),
            &CompletionRequest::user_prompt(prompt),
            &self.retry,
        )?;
        let prediction: LikePrediction = parse_structured(value)?;

        let valid: HashSet<&str> = candidates.iter().map(|p| p.post_id.as_str()).collect();
        let model = self.client.model_id().to_string();
        Ok(sanitize_targets(prediction.post_ids, &valid)
            .into_iter()
            .map(|post_id| {
                let created_at = now_timestamp();
                GeneratedLike {
                    like: Like {
                        like_id: like_id(ctx, &post_id),
                        agent_id: ctx.agent_handle.to_string(),
                        post_id,
                        created_at: created_at.clone(),
                    },
                    explanation: EXPLANATION.to_string(),
                    metadata: metadata(&model, &created_at),
                }
            })
            .collect())
    }
}

/// Predicts which candidate posts the agent would reply to, with text
pub struct NaiveLlmCommentGenerator {
    client: Arc<dyn StructuredCompletion>,
    retry: RetryPolicy,
}

impl NaiveLlmCommentGenerator {
    pub fn new(client: Arc<dyn StructuredCompletion>) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl CommentGenerator for NaiveLlmCommentGenerator {
    fn algorithm(&self) -> &'static str {
        POLICY
    }

    fn generate(
        &self,
        candidates: &[Post],
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<GeneratedComment>> {
        if candidates.is_empty() {
            warn!(
                agent_handle = ctx.agent_handle,
                "naive_llm comment generator called with no candidates"
            );
            return Ok(Vec::new());
        }

        let prompt = format!(
            "Predict which of these posts the user {} would reply to, and write the reply.\n\n\
             Posts:\n{}\n\n\
             Reply with JSON: {{\"selections\": [{{\"post_id\": \"...\", \"text\": \"...\"}}]}}",
            ctx.agent_handle,
            posts_as_prompt_json(candidates),
        );
        let value = complete_with_retry(
            self.client.as_ref(),
            &CompletionRequest::user_prompt(prompt),
            &self.retry,
        )?;
        let prediction: CommentPrediction = parse_structured(value)?;

        let valid: HashSet<&str> = candidates.iter().map(|p| p.post_id.as_str()).collect();
        // First non-blank text wins per post id; output in sorted order
        let mut text_by_post: BTreeMap<String, String> = BTreeMap::new();
        for selection in prediction.selections {
            if !valid.contains(selection.post_id.as_str()) {
                continue;
            }
            let text = selection.text.trim().to_string();
            if text.is_empty() {
                warn!(
                    agent_handle = ctx.agent_handle,
                    post_id = %selection.post_id,
                    "dropping comment selection with blank text"
                );
                continue;
            }
            text_by_post.entry(selection.post_id).or_insert(text);
        }

        let model = self.client.model_id().to_string();
        Ok(text_by_post
            .into_iter()
            .map(|(post_id, text)| {
                let created_at = now_timestamp();
                GeneratedComment {
                    comment: Comment {
                        comment_id: comment_id(ctx, &post_id),
                        agent_id: ctx.agent_handle.to_string(),
                        post_id,
                        text,
                        created_at: created_at.clone(),
                    },
                    explanation: EXPLANATION.to_string(),
                    metadata: metadata(&model, &created_at),
                }
            })
            .collect())
    }
}

/// Predicts which candidate authors the agent would follow
pub struct NaiveLlmFollowGenerator {
    client: Arc<dyn StructuredCompletion>,
    retry: RetryPolicy,
}

impl NaiveLlmFollowGenerator {
    pub fn new(client: Arc<dyn StructuredCompletion>) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl FollowGenerator for NaiveLlmFollowGenerator {
    fn algorithm(&self) -> &'static str {
        POLICY
    }

    fn generate(
        &self,
        candidates: &[Post],
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<GeneratedFollow>> {
        if candidates.is_empty() {
            warn!(
                agent_handle = ctx.agent_handle,
                "naive_llm follow generator called with no candidates"
            );
            return Ok(Vec::new());
        }

        // One entry per author (excluding self), keyed by handle
        let mut authors: BTreeMap<&str, &Post> = BTreeMap::new();
        for post in candidates {
            if post.author_handle == ctx.agent_handle {
                continue;
            }
            authors
                .entry(post.author_handle.as_str())
                .and_modify(|existing| {
                    if post.created_at > existing.created_at {
                        *existing = post;
                    }
                })
                .or_insert(post);
        }
        if authors.is_empty() {
            return Ok(Vec::new());
        }

        let author_entries: Vec<serde_json::Value> = authors
            .iter()
            .map(|(handle, post)| {
                json!({"author_handle": handle, "like_count": post.like_count})
            })
            .collect();
        let prompt = format!(
            "Predict who the user {} would follow from these authors.\n\n\
             Authors:\n{}\n\n\
             Reply with JSON: {{\"user_ids\": [\"...\"]}}",
            ctx.agent_handle,
            serde_json::to_string_pretty(&author_entries).unwrap_or_else(|_| "[]".to_string()),
        );
        let value = complete_with_retry(
            self.client.as_ref(),
            &CompletionRequest::user_prompt(prompt),
            &self.retry,
        )?;
        let prediction: FollowPrediction = parse_structured(value)?;

        let valid: HashSet<&str> = authors.keys().copied().collect();
        let model = self.client.model_id().to_string();
        Ok(sanitize_targets(prediction.user_ids, &valid)
            .into_iter()
            .map(|user_id| {
                let created_at = now_timestamp();
                GeneratedFollow {
                    follow: Follow {
                        follow_id: follow_id(ctx, &user_id),
                        agent_id: ctx.agent_handle.to_string(),
                        user_id,
                        created_at: created_at.clone(),
                    },
                    explanation: EXPLANATION.to_string(),
                    metadata: metadata(&model, &created_at),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use socialsim_testing::llm::ScriptedCompletionClient;
    use socialsim_types::PostSource;

    fn ctx<'a>() -> GenerationContext<'a> {
        GenerationContext {
            run_id: "run-1",
            turn_number: 0,
            agent_handle: "@a",
        }
    }

    fn candidates() -> Vec<Post> {
        vec![
            Post::new(PostSource::Bluesky, "p1", "@x", "2024-01-01T00:00:00Z"),
            Post::new(PostSource::Bluesky, "p2", "@y", "2024-01-02T00:00:00Z"),
        ]
    }

    #[test]
    fn likes_are_filtered_deduped_and_sorted() {
        let client = Arc::new(ScriptedCompletionClient::always(json!({
            "post_ids": ["bluesky:p2", "bluesky:p1", "bluesky:p2", "bluesky:ghost"]
        })));
        let generator = NaiveLlmLikeGenerator::new(client.clone());
        let likes = generator.generate(&candidates(), &ctx()).unwrap();

        let ids: Vec<&str> = likes.iter().map(|l| l.like.post_id.as_str()).collect();
        assert_eq!(ids, vec!["bluesky:p1", "bluesky:p2"]);
        assert!(likes.iter().all(|l| l.explanation == EXPLANATION));
        assert!(
            likes
                .iter()
                .all(|l| l.metadata.model_used.as_deref() == Some("scripted-model"))
        );
        assert_eq!(client.calls(), 1);
    }

    #[test]
    fn comments_require_non_blank_text() {
        let client = Arc::new(ScriptedCompletionClient::always(json!({
            "selections": [
                {"post_id": "bluesky:p1", "text": "  "},
                {"post_id": "bluesky:p2", "text": "good point"},
                {"post_id": "bluesky:ghost", "text": "ignored"}
            ]
        })));
        let generator = NaiveLlmCommentGenerator::new(client);
        let comments = generator.generate(&candidates(), &ctx()).unwrap();

        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].comment.post_id, "bluesky:p2");
        assert_eq!(comments[0].comment.text, "good point");
    }

    #[test]
    fn follows_exclude_self_and_unknown_authors() {
        let mut posts = candidates();
        posts.push(Post::new(
            PostSource::Bluesky,
            "p3",
            "@a",
            "2024-01-03T00:00:00Z",
        ));
        let client = Arc::new(ScriptedCompletionClient::always(json!({
            "user_ids": ["@y", "@a", "@stranger", "@x"]
        })));
        let generator = NaiveLlmFollowGenerator::new(client);
        let follows = generator.generate(&posts, &ctx()).unwrap();

        let ids: Vec<&str> = follows.iter().map(|f| f.follow.user_id.as_str()).collect();
        assert_eq!(ids, vec!["@x", "@y"]);
    }

    #[test]
    fn empty_candidates_skip_the_llm_call() {
        let client = Arc::new(ScriptedCompletionClient::always(json!({"post_ids": []})));
        let generator = NaiveLlmLikeGenerator::new(client.clone());
        assert!(generator.generate(&[], &ctx()).unwrap().is_empty());
        assert_eq!(client.calls(), 0);
    }

    #[test]
    fn terminal_llm_errors_surface_as_domain_errors() {
        let client = Arc::new(ScriptedCompletionClient::always_failing(
            socialsim_llm::LlmError::Auth("bad key".to_string()),
        ));
        let generator = NaiveLlmLikeGenerator::new(client.clone())
            .with_retry_policy(RetryPolicy::immediate(3));
        let err = generator.generate(&candidates(), &ctx()).unwrap_err();
        assert!(matches!(err, socialsim_types::Error::Llm(_)));
        assert_eq!(client.calls(), 1, "auth failures must not be retried");
    }

    #[test]
    fn malformed_replies_surface_as_domain_errors() {
        let client = Arc::new(ScriptedCompletionClient::new(vec![
            Ok(json!({"unexpected": true})),
            Ok(json!({"post_ids": ["bluesky:p1"]})),
        ]));
        // Shape errors come from parsing, after complete_with_retry
        // succeeded, so they surface without a second completion.
        let generator = NaiveLlmLikeGenerator::new(client.clone())
            .with_retry_policy(RetryPolicy::immediate(3));
        let err = generator.generate(&candidates(), &ctx()).unwrap_err();
        assert!(matches!(err, socialsim_types::Error::Llm(_)));
        assert_eq!(client.calls(), 1);
    }
}
