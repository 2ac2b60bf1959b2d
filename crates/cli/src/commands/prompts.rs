//! Prompts command handler.
//!
//! Lists the pipeline prompts and shows their resolved definitions.

use super::print_json;
use clap::{Args, Subcommand};
use ledgerlens_core::{config::AppConfig, AppResult};
use ledgerlens_prompt::{list_prompts, load_prompt};

/// Pipeline prompt management
#[derive(Args, Debug)]
pub struct PromptsCommand {
    #[command(subcommand)]
    pub action: PromptsAction,
}

#[derive(Subcommand, Debug)]
pub enum PromptsAction {
    /// List built-in and workspace prompt ids
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the definition a prompt id resolves to
    Show {
        /// Prompt id, e.g. pipeline.decompose
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl PromptsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            PromptsAction::List { json } => {
                tracing::info!("Listing prompts");
                let ids = list_prompts(&config.workspace)?;

                if *json {
                    return print_json(&ids);
                }
                for id in ids {
                    println!("{}", id);
                }
                Ok(())
            }
            PromptsAction::Show { id, json } => {
                tracing::info!("Showing prompt '{}'", id);
                let prompt = load_prompt(&config.workspace, id)?;

                if *json {
                    return print_json(&prompt);
                }
                println!("{} ({})", prompt.id, prompt.title);
                println!("variables: {}", prompt.variables.join(", "));
                println!();
                println!("{}", prompt.template);
                Ok(())
            }
        }
    }
}
