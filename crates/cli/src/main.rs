//! LedgerLens CLI
//!
//! Main entry point for the ledgerlens command-line tool.
//! Answers financial questions from local CSV tables and text documents.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, KnowledgeCommand, PromptsCommand};
use ledgerlens_core::logging::{self, LogFormat};
use ledgerlens_core::{config::AppConfig, AppResult};
use std::path::PathBuf;

/// LedgerLens - answer financial questions from tables and documents
#[derive(Parser, Debug)]
#[command(name = "ledgerlens")]
#[command(
    about = "Answer financial questions from CSV tables and text documents",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "LEDGERLENS_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "LEDGERLENS_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (ollama, openai, mock)
    #[arg(short, long, global = true, env = "LEDGERLENS_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "LEDGERLENS_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question answered from both knowledge stores
    Ask(AskCommand),

    /// Knowledge store setup and inspection
    Knowledge(KnowledgeCommand),

    /// Pipeline prompt management
    Prompts(PromptsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load_from(cli.workspace.clone(), cli.config.clone())?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    let log_format = config
        .log_format
        .as_deref()
        .map(LogFormat::parse)
        .unwrap_or_default();
    logging::init_logging(config.log_level.as_deref(), config.no_color, log_format)?;

    tracing::info!("LedgerLens CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.ensure_state_dir()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Knowledge(_) => "knowledge",
        Commands::Prompts(_) => "prompts",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Knowledge(cmd) => cmd.execute(&config).await,
        Commands::Prompts(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask_with_globals() {
        let cli = Cli::try_parse_from([
            "ledgerlens",
            "--provider",
            "mock",
            "ask",
            "Was sentiment positive on 2005-03-11?",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.provider.as_deref(), Some("mock"));
        match cli.command {
            Commands::Ask(cmd) => {
                assert_eq!(cmd.query.as_deref(), Some("Was sentiment positive on 2005-03-11?"));
                assert!(cmd.json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_knowledge_match() {
        let cli = Cli::try_parse_from(["ledgerlens", "knowledge", "match", "2005-03-11"]).unwrap();
        assert!(matches!(cli.command, Commands::Knowledge(_)));
    }
}
