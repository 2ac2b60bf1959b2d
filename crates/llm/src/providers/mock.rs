//! Mock LLM provider with scripted replies.
//!
//! Used by tests to drive the pipeline deterministically, and by the `mock`
//! provider to run the CLI without a model server.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use ledgerlens_core::{AppError, AppResult};
use std::sync::Mutex;

type Responder = dyn Fn(&LlmRequest) -> AppResult<String> + Send + Sync;

/// LLM client that answers through a caller-supplied closure and records
/// every request it receives.
pub struct MockClient {
    responder: Box<Responder>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockClient {
    /// Create a mock that replies with whatever `responder` returns.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&LlmRequest) -> AppResult<String> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Mock that always returns the same text.
    pub fn constant(reply: impl Into<String>) -> Self {
        let reply = reply.into();
        Self::new(move |_| Ok(reply.clone()))
    }

    /// Mock whose every call fails with `AppError::Llm(message)`.
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(move |_| Err(AppError::Llm(message.clone())))
    }

    /// Offline mock used by the `mock` provider.
    ///
    /// Replies with a short note quoting the first line of the prompt so runs
    /// are reproducible without a model server.
    pub fn offline() -> Self {
        Self::new(|request| {
            let first_line = request.prompt.lines().next().unwrap_or("").trim();
            Ok(format!("[offline reply] {}", first_line))
        })
    }

    /// Number of completion calls received so far.
    pub fn call_count(&self) -> usize {
        self.lock_requests().len()
    }

    /// Snapshot of every request received so far.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.lock_requests().clone()
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Vec<LlmRequest>> {
        // A poisoned log is still a valid log
        self.requests.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl LlmClient for MockClient {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.lock_requests().push(request.clone());

        let content = (self.responder)(request)?;
        let usage = LlmUsage::new(
            request.prompt.split_whitespace().count() as u32,
            content.split_whitespace().count() as u32,
        );

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage,
            done: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_constant_reply_and_recording() {
        let client = MockClient::constant("42");
        let response = client
            .complete(&LlmRequest::new("What is the answer?", "mock-model"))
            .await
            .unwrap();

        assert_eq!(response.content, "42");
        assert_eq!(response.model, "mock-model");
        assert_eq!(client.call_count(), 1);
        assert_eq!(client.requests()[0].prompt, "What is the answer?");
    }

    #[tokio::test]
    async fn test_failing_mock_still_records_call() {
        let client = MockClient::failing("connection refused");
        let result = client.complete(&LlmRequest::new("hi", "m")).await;

        assert!(matches!(result, Err(AppError::Llm(ref msg)) if msg == "connection refused"));
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_offline_quotes_first_line() {
        let client = MockClient::offline();
        let response = client
            .complete(&LlmRequest::new("Line one\nLine two", "m"))
            .await
            .unwrap();

        assert_eq!(response.content, "[offline reply] Line one");
    }

    #[tokio::test]
    async fn test_responder_sees_request() {
        let client = MockClient::new(|req| Ok(req.system.clone().unwrap_or_default()));
        let response = client
            .complete(&LlmRequest::new("q", "m").with_system("persona"))
            .await
            .unwrap();

        assert_eq!(response.content, "persona");
    }
}
