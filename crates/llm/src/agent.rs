//! Named agent personas over an LLM client.
//!
//! An `Agent` pairs a client and model with a role and a list of standing
//! instructions, which are sent as the system prompt on every call.

use crate::client::{LlmClient, LlmRequest, LlmUsage};
use ledgerlens_core::AppResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Reply from a single agent call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReply {
    /// Generated text
    pub content: String,

    /// Model that produced the reply
    pub model: String,

    /// Token usage for the call
    pub usage: LlmUsage,
}

/// An LLM persona with standing instructions.
#[derive(Clone)]
pub struct Agent {
    name: String,
    role: String,
    instructions: Vec<String>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    client: Arc<dyn LlmClient>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("model", &self.model)
            .field("provider", &self.client.provider_name())
            .finish()
    }
}

impl Agent {
    /// Create an agent with no standing instructions.
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        client: Arc<dyn LlmClient>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            instructions: Vec::new(),
            model: model.into(),
            temperature: None,
            max_tokens: None,
            client,
        }
    }

    /// Replace the standing instructions.
    pub fn with_instructions<I, S>(mut self, instructions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instructions = instructions.into_iter().map(Into::into).collect();
        self
    }

    /// Set the sampling temperature used for every call.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Cap the tokens generated per call.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    /// System prompt built from the role and instructions.
    pub fn system_prompt(&self) -> String {
        let mut prompt = format!("You are {}, acting as {}.\n", self.name, self.role);

        if !self.instructions.is_empty() {
            prompt.push_str("\nInstructions:\n");
            for instruction in &self.instructions {
                prompt.push_str("- ");
                prompt.push_str(instruction);
                prompt.push('\n');
            }
        }

        prompt
    }

    /// Send `prompt` to the model and return its reply.
    pub async fn run(&self, prompt: &str) -> AppResult<AgentReply> {
        tracing::debug!(agent = %self.name, "Running agent ({} prompt bytes)", prompt.len());

        let mut request = LlmRequest::new(prompt, &self.model).with_system(self.system_prompt());
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = self.client.complete(&request).await?;

        tracing::debug!(
            agent = %self.name,
            "Agent replied with {} bytes ({} tokens)",
            response.content.len(),
            response.usage.total_tokens
        );

        Ok(AgentReply {
            content: response.content,
            model: response.model,
            usage: response.usage,
        })
    }
}
