//! `completion-client`: the single boundary between the product-owner
//! workflows and a third-party text-generation service.
//!
//! Everything the analysis layer needs from a language model is one call:
//! given a system role and a user prompt, return the generated text.
//!
//! # Architecture
//!
//! ```text
//! CompletionRequest (system prompt, user prompt, CompletionOptions)
//!     │
//!     ▼
//! dyn CompletionClient ─┬─ OpenAiClient    ← POST {base_url}/chat/completions
//!                       │                    bearer auth, per-request timeout
//!                       └─ ScriptedClient  ← canned responses, records requests
//!     │
//!     ▼
//! String                ← first choice's message content
//! ```
//!
//! Failures of any kind (transport, timeout, rate limit, non-success status,
//! malformed body) surface as [`CompletionError`]. The client never retries;
//! retrying a whole workflow is the caller's decision.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use completion_client::{CompletionClient, CompletionOptions, OpenAiClient, OpenAiConfig};
//!
//! let client = OpenAiClient::new(OpenAiConfig::new(std::env::var("OPENAI_API_KEY")?))?;
//! let text = client
//!     .complete("You are a product owner.", "Estimate this story.", &CompletionOptions::default())
//!     .await?;
//! ```

pub mod client;
pub mod error;
pub mod mock;
pub mod types;


use async_trait::async_trait;

pub use client::{
    OpenAiClient, OpenAiConfig, UnconfiguredClient, DEFAULT_BASE_URL, DEFAULT_MODEL,
};
pub use error::CompletionError;
pub use mock::{RecordedRequest, ScriptedClient};
pub use types::CompletionOptions;

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, CompletionError>;

/// A text-generation capability.
///
/// Implementations must be shareable across tasks; the orchestrator holds
/// them behind `Arc<dyn CompletionClient>`.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Human-readable identifier (model name for real clients).
    fn name(&self) -> &str;

    /// Generate a completion for `user_prompt` under the `system_prompt` role.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String>;
}
