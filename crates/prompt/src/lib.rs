//! Prompt system for LedgerLens.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions
//! - Built-in prompts for every pipeline stage
//! - Per-workspace overrides in `.ledgerlens/prompts/`
//! - Handlebars template rendering

pub mod builder;
pub mod defaults;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{list_prompts, load_prompt, PromptSet};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
