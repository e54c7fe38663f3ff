//! Scripted structured-completion client for LLM-backed policy tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use socialsim_llm::{CompletionRequest, LlmError, StructuredCompletion};

enum Script {
    /// Replies consumed in order; running past the end is an error so
    /// tests notice unexpected extra calls
    Sequence(VecDeque<Result<serde_json::Value, LlmError>>),
    /// The same reply for every call
    Repeat(Result<serde_json::Value, LlmError>),
}

/// Structured-completion client that replays a fixed script
pub struct ScriptedCompletionClient {
    script: Mutex<Script>,
    calls: AtomicUsize,
    model: String,
}

impl ScriptedCompletionClient {
    pub fn new(replies: Vec<Result<serde_json::Value, LlmError>>) -> Self {
        Self {
            script: Mutex::new(Script::Sequence(replies.into())),
            calls: AtomicUsize::new(0),
            model: "scripted-model".to_string(),
        }
    }

    /// Every call succeeds with the same value
    pub fn always(value: serde_json::Value) -> Self {
        Self {
            script: Mutex::new(Script::Repeat(Ok(value))),
            calls: AtomicUsize::new(0),
            model: "scripted-model".to_string(),
        }
    }

    /// Every call fails with the same error
    pub fn always_failing(error: LlmError) -> Self {
        Self {
            script: Mutex::new(Script::Repeat(Err(error))),
            calls: AtomicUsize::new(0),
            model: "scripted-model".to_string(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StructuredCompletion for ScriptedCompletionClient {
    fn complete_structured(
        &self,
        _request: &CompletionRequest,
    ) -> Result<serde_json::Value, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self
            .script
            .lock()
            .map_err(|_| LlmError::Provider("scripted client lock poisoned".to_string()))?;
        match &mut *script {
            Script::Sequence(replies) => replies.pop_front().unwrap_or_else(|| {
                Err(LlmError::Provider(
                    "scripted client ran out of replies".to_string(),
                ))
            }),
            Script::Repeat(reply) => reply.clone(),
        }
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
