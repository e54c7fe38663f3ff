//! Narrow structured-completion contract for LLM-backed action policies.
//!
//! The engine treats the model as an opaque policy oracle: one blocking
//! call that returns a JSON value matching a caller-declared shape.
//! Providers are injected; nothing in the core references a concrete
//! client.

mod client;
mod error;
mod retry;

pub use client::{CompletionRequest, Message, Role, StructuredCompletion};
pub use error::LlmError;
pub use retry::{RetryPolicy, complete_with_retry, parse_structured};
