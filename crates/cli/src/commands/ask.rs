//! Ask command handler.
//!
//! Runs a question through the full pipeline: decomposition, retrieval from
//! both stores, per-source answers, and collation.

use super::{llm_client, load_knowledge, print_json};
use clap::Args;
use ledgerlens_core::{config::AppConfig, AppError, AppResult};
use ledgerlens_knowledge::{AgentTeam, Pipeline, PipelineOutcome};
use ledgerlens_prompt::PromptSet;
use std::path::PathBuf;

/// Ask a question answered from the tables and the documents
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub query: Option<String>,

    /// Read the question from a file
    #[arg(short, long, conflicts_with = "query")]
    pub file: Option<PathBuf>,

    /// Output the full pipeline outcome as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let query = self.get_query()?;
        let client = llm_client(config)?;

        let knowledge = load_knowledge(config)?;
        let prompts = PromptSet::load(&config.workspace)?;

        let pipeline = Pipeline::builder()
            .knowledge_base(&knowledge)
            .team(AgentTeam::with_client(client, &config.model))
            .prompts(prompts)
            .build()?;

        let outcome = pipeline.process_query(&query).await;

        if self.json {
            return print_json(&outcome);
        }

        match outcome {
            PipelineOutcome::Success(result) => {
                println!("{}", result.answer);

                tracing::debug!(
                    "Sub-queries - tabular: {:?}, text: {:?}",
                    result.tabular_subquery,
                    result.text_subquery
                );
                tracing::debug!(
                    "Token usage - Prompt: {}, Completion: {}, Total: {}",
                    result.usage.prompt_tokens,
                    result.usage.completion_tokens,
                    result.usage.total_tokens
                );
                Ok(())
            }
            PipelineOutcome::NoEvidence { error, .. } => {
                println!("{}", error);
                Ok(())
            }
            PipelineOutcome::Error { error, .. } => Err(AppError::Pipeline(error)),
        }
    }

    /// The question from the argument or the file, trimmed.
    fn get_query(&self) -> AppResult<String> {
        let raw = match (&self.query, &self.file) {
            (Some(query), _) => query.clone(),
            (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
                AppError::Config(format!("Failed to read question file {:?}: {}", path, e))
            })?,
            (None, None) => return Err(AppError::Config("No question provided".to_string())),
        };

        let query = raw.trim();
        if query.is_empty() {
            return Err(AppError::Config("Question is empty".to_string()));
        }
        Ok(query.to_string())
    }
}
