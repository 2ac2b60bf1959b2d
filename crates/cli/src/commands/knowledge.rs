//! Knowledge command handler.
//!
//! Sets up and inspects the two knowledge stores without calling an LLM.

use super::{load_knowledge, print_json};
use clap::{Args, Subcommand};
use ledgerlens_core::{config::AppConfig, AppResult};
use ledgerlens_knowledge::context::{build_tabular_context_with, build_text_context_with};
use ledgerlens_knowledge::{config as knowledge_config, TextRetriever};

/// Knowledge store setup and inspection
#[derive(Args, Debug)]
pub struct KnowledgeCommand {
    #[command(subcommand)]
    pub action: KnowledgeAction,
}

#[derive(Subcommand, Debug)]
pub enum KnowledgeAction {
    /// Create the data directories and load both stores
    Setup(KnowledgeSetupCommand),
    /// Retrieve text passages for a query
    Search(KnowledgeSearchCommand),
    /// Match table rows for a sub-query
    Match(KnowledgeMatchCommand),
}

impl KnowledgeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            KnowledgeAction::Setup(cmd) => cmd.execute(config),
            KnowledgeAction::Search(cmd) => cmd.execute(config).await,
            KnowledgeAction::Match(cmd) => cmd.execute(config),
        }
    }
}

/// Load both stores and report what was found
#[derive(Args, Debug)]
pub struct KnowledgeSetupCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeSetupCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge setup command");

        let config_path = knowledge_config::get_config_path(&config.workspace);
        if !config_path.exists() {
            let defaults = knowledge_config::load_config(&config.workspace)?;
            knowledge_config::save_config(&config.workspace, &defaults)?;
            tracing::info!("Wrote default knowledge config to {:?}", config_path);
        }

        let knowledge = load_knowledge(config)?;
        let summary = knowledge.summary();

        if self.json {
            return print_json(summary);
        }

        println!(
            "Loaded {} documents ({} chunks) and {} tables in {:.2}s",
            summary.text_documents, summary.text_chunks, summary.table_files, summary.duration_secs
        );
        for skipped in &summary.skipped {
            println!("Skipped {}: {}", skipped.path.display(), skipped.reason);
        }

        Ok(())
    }
}

/// Retrieve text passages
#[derive(Args, Debug)]
pub struct KnowledgeSearchCommand {
    /// Query text
    pub query: String,

    /// Number of passages to retrieve
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeSearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge search command");

        let knowledge = load_knowledge(config)?;
        let top_k = self.top_k.unwrap_or(knowledge.config().text_top_k);
        let retriever = TextRetriever::new(knowledge.text_index(), top_k);

        let documents = retriever.retrieve(&self.query).await;

        if self.json {
            return print_json(&documents);
        }

        if documents.is_empty() {
            println!("No matching passages");
        } else {
            println!(
                "{}",
                build_text_context_with(&documents, knowledge.config().text_char_budget)
            );
        }

        Ok(())
    }
}

/// Match table rows
#[derive(Args, Debug)]
pub struct KnowledgeMatchCommand {
    /// Tabular sub-query: a YYYY-MM-DD date or a keyword
    pub query: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeMatchCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge match command");

        let knowledge = load_knowledge(config)?;
        let matches = knowledge.tabular_matcher().match_query(&self.query);

        if self.json {
            return print_json(&matches);
        }

        if matches.is_empty() {
            println!("No matching rows");
        } else {
            println!(
                "{}",
                build_tabular_context_with(&matches, knowledge.config().table_preview_rows)
            );
        }

        Ok(())
    }
}
