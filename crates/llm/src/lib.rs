//! LLM integration crate for LedgerLens.
//!
//! This crate provides a provider-agnostic abstraction for interacting with
//! Large Language Models (LLMs) plus the `Agent` wrapper the query pipeline
//! talks to.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **OpenAI**: Any OpenAI-compatible chat completions endpoint
//! - **Mock**: Offline scripted replies for tests and demos
//!
//! # Example
//! ```no_run
//! use ledgerlens_llm::{Agent, providers::OllamaClient};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(OllamaClient::new());
//! let agent = Agent::new("Analyst", "Financial analyst", client, "llama3.2");
//! let reply = agent.run("Summarize Q3 revenue").await?;
//! println!("{}", reply.content);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use agent::{Agent, AgentReply};
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{MockClient, OllamaClient, OpenAiClient};
pub use types::ProviderType;
