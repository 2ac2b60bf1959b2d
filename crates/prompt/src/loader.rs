//! Prompt loader for built-in and workspace prompt definitions.

use crate::builder::build_prompt;
use crate::defaults::{self, BUILTIN_IDS};
use crate::types::{BuiltPrompt, PromptDefinition};
use ledgerlens_core::config::STATE_DIR;
use ledgerlens_core::{AppError, AppResult};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Directory holding workspace prompt overrides.
fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(STATE_DIR).join("prompts")
}

/// Load a prompt definition by ID.
///
/// A file named `<id>.yml` in `.ledgerlens/prompts/` overrides the built-in
/// definition of the same id.
///
/// # Example
/// ```no_run
/// use ledgerlens_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "pipeline.collate")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    if prompt_file.exists() {
        tracing::debug!("Loading prompt override from: {:?}", prompt_file);

        let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to read prompt file {:?}: {}",
                prompt_file, e
            ))
        })?;

        let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to parse prompt YAML {:?}: {}",
                prompt_file, e
            ))
        })?;

        validate_prompt(&definition)?;

        tracing::info!("Loaded prompt override: {} ({})", definition.id, definition.title);
        return Ok(definition);
    }

    match defaults::builtin(prompt_id) {
        Some(definition) => definition,
        None => Err(AppError::Prompt(format!(
            "Prompt not found: {} (no built-in and no {:?})",
            prompt_id, prompt_file
        ))),
    }
}

/// List all available prompt IDs: built-ins plus workspace files.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let mut prompt_ids: BTreeSet<String> = BUILTIN_IDS.iter().map(|id| id.to_string()).collect();

    let dir = prompts_dir(workspace_path);
    if dir.exists() {
        for entry in walkdir::WalkDir::new(&dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    prompt_ids.insert(stem.to_string());
                }
            }
        }
    }

    Ok(prompt_ids.into_iter().collect())
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

/// The pipeline's prompt definitions, resolved once at setup.
#[derive(Debug, Clone)]
pub struct PromptSet {
    definitions: HashMap<String, PromptDefinition>,
}

impl PromptSet {
    /// Built-in definitions only.
    pub fn builtin() -> AppResult<Self> {
        let mut definitions = HashMap::new();
        for id in BUILTIN_IDS {
            if let Some(definition) = defaults::builtin(id) {
                definitions.insert(id.to_string(), definition?);
            }
        }
        Ok(Self { definitions })
    }

    /// Built-in definitions with workspace overrides applied.
    pub fn load(workspace_path: &Path) -> AppResult<Self> {
        let mut definitions = HashMap::new();
        for id in BUILTIN_IDS {
            definitions.insert(id.to_string(), load_prompt(workspace_path, id)?);
        }
        Ok(Self { definitions })
    }

    /// Render prompt `id` with `variables`.
    pub fn render(&self, id: &str, variables: HashMap<String, String>) -> AppResult<BuiltPrompt> {
        let definition = self
            .definitions
            .get(id)
            .ok_or_else(|| AppError::Prompt(format!("Prompt not loaded: {}", id)))?;

        build_prompt(definition, variables)
    }
}
