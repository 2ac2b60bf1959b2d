//! Command handlers for the LedgerLens CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod knowledge;
pub mod prompts;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use knowledge::KnowledgeCommand;
pub use prompts::PromptsCommand;

use ledgerlens_core::{config::AppConfig, AppError, AppResult};
use ledgerlens_knowledge::{config as knowledge_config, KnowledgeBase};
use ledgerlens_llm::{create_client, LlmClient};
use std::sync::Arc;

/// Load the knowledge configuration and set up both stores.
pub fn load_knowledge(config: &AppConfig) -> AppResult<KnowledgeBase> {
    let knowledge = knowledge_config::load_config(&config.workspace)?;
    KnowledgeBase::setup(&config.workspace, &knowledge)
}

/// Create the LLM client for the active provider.
pub fn llm_client(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    config.validate()?;

    let endpoint = config.resolve_endpoint(&config.provider);
    let api_key = config.resolve_api_key(&config.provider);
    let timeout = config
        .get_provider_config(&config.provider)
        .and_then(|p| p.timeout_secs());

    create_client(&config.provider, endpoint.as_deref(), api_key.as_deref(), timeout)
        .map_err(AppError::Config)
}

/// Pretty-print a serializable value as JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}
