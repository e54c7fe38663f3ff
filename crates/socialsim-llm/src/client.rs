use crate::error::LlmError;

/// Role of a chat message author
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single chat message
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A provider-agnostic structured completion request.
///
/// `model: None` lets the client use its configured default.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Single user-prompt request, the common case for action policies
    pub fn user_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(prompt)],
            ..Self::default()
        }
    }
}

/// The one contract the engine needs from an LLM client: send a request,
/// get back a JSON value shaped like the prompt asked for.
///
/// Implementations translate to and from their provider's wire format and
/// classify failures into `LlmError`. Calls block; the engine invokes them
/// sequentially.
pub trait StructuredCompletion: Send + Sync {
    fn complete_structured(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<serde_json::Value, LlmError>;

    /// Identifier of the model that will serve requests (for generation
    /// metadata)
    fn model_id(&self) -> &str;
}
