use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::types::CompletionOptions;
use crate::{CompletionClient, CompletionError, Result};

// ─── ScriptedClient ───────────────────────────────────────────────────────

/// A [`CompletionClient`] that replays canned replies.
///
/// Replies queued with [`ScriptedClient::then`] are consumed in order; once
/// the queue is empty the fallback reply (if any) is returned for every call.
/// Every request is recorded so tests can assert on prompts and call counts.
///
/// ```rust,ignore
/// let client = ScriptedClient::fixed("## Story Points\n5\n...");
/// let text = client.complete("sys", "user", &CompletionOptions::default()).await?;
/// assert_eq!(client.calls(), 1);
/// ```
pub struct ScriptedClient {
    name: String,
    queue: Mutex<VecDeque<Reply>>,
    fallback: Option<Reply>,
    requests: Mutex<Vec<RecordedRequest>>,
}

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail { status: u16, body: String },
}

/// One call observed by a [`ScriptedClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub options: CompletionOptions,
}

impl ScriptedClient {
    /// A client with no replies; every call fails with [`CompletionError::Exhausted`]
    /// until replies are queued.
    pub fn new() -> Self {
        Self {
            name: "scripted".to_string(),
            queue: Mutex::new(VecDeque::new()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A client that answers every call with `text`.
    pub fn fixed(text: impl Into<String>) -> Self {
        Self {
            fallback: Some(Reply::Text(text.into())),
            ..Self::new()
        }
    }

    /// A client whose every call fails with a provider status error.
    pub fn failing(status: u16, body: impl Into<String>) -> Self {
        Self {
            fallback: Some(Reply::Fail {
                status,
                body: body.into(),
            }),
            ..Self::new()
        }
    }

    /// Queue a reply consumed before the fallback.
    pub fn then(self, text: impl Into<String>) -> Self {
        self.push(Reply::Text(text.into()));
        self
    }

    /// Queue a provider failure consumed before the fallback.
    pub fn then_fail(self, status: u16, body: impl Into<String>) -> Self {
        self.push(Reply::Fail {
            status,
            body: body.into(),
        });
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of `complete` calls observed so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Snapshot of every request observed so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn push(&self, reply: Reply) {
        if let Ok(mut q) = self.queue.lock() {
            q.push_back(reply);
        }
    }

    fn next_reply(&self) -> Option<Reply> {
        let queued = self.queue.lock().ok().and_then(|mut q| q.pop_front());
        queued.or_else(|| self.fallback.clone())
    }
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String> {
        if let Ok(mut r) = self.requests.lock() {
            r.push(RecordedRequest {
                system_prompt: system_prompt.to_string(),
                user_prompt: user_prompt.to_string(),
                options: *options,
            });
        }
        match self.next_reply() {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail { status, body }) => Err(CompletionError::Status { status, body }),
            None => {
                let head: String = user_prompt.chars().take(60).collect();
                Err(CompletionError::Exhausted(head))
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_reply_repeats_and_records() {
        let client = ScriptedClient::fixed("ok");
        let opts = CompletionOptions::default();
        assert_eq!(client.complete("s", "a", &opts).await.unwrap(), "ok");
        assert_eq!(client.complete("s", "b", &opts).await.unwrap(), "ok");
        assert_eq!(client.calls(), 2);
        assert_eq!(client.requests()[1].user_prompt, "b");
    }

    #[tokio::test]
    async fn queued_replies_precede_fallback() {
        let client = ScriptedClient::fixed("later").then("first").then_fail(503, "down");
        let opts = CompletionOptions::default();
        assert_eq!(client.complete("s", "1", &opts).await.unwrap(), "first");
        let err = client.complete("s", "2", &opts).await.unwrap_err();
        assert!(matches!(err, CompletionError::Status { status: 503, .. }));
        assert_eq!(client.complete("s", "3", &opts).await.unwrap(), "later");
    }

    #[tokio::test]
    async fn empty_script_is_exhausted() {
        let client = ScriptedClient::new();
        let err = client
            .complete("s", "anything", &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Exhausted(_)));
    }
}
