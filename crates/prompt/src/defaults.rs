//! Built-in prompt definitions for the query pipeline.
//!
//! Each definition is stored as YAML so a workspace override file has the
//! exact same shape as the built-in.

use crate::types::PromptDefinition;
use ledgerlens_core::{AppError, AppResult};

/// Splits a question into tabular and text sub-queries.
pub const DECOMPOSE: &str = "pipeline.decompose";

/// Answers from matched CSV rows only.
pub const ANSWER_TABULAR: &str = "pipeline.answer.tabular";

/// Answers from retrieved document passages only.
pub const ANSWER_TEXT: &str = "pipeline.answer.text";

/// Merges the two sub-answers.
pub const COLLATE: &str = "pipeline.collate";

const DECOMPOSE_YAML: &str = r#"
id: pipeline.decompose
title: Split a question into tabular and text sub-queries
apiVersion: "1.0"
createdBy: ledgerlens
variables: [query]
template: |
  You coordinate two specialists who answer financial questions.
  - The tabular analyst filters CSV tables. Its sub-query must be a single keyword, name, or date that would appear verbatim in a table cell. Write dates as YYYY-MM-DD.
  - The document expert searches financial text documents. Its sub-query is a short natural-language question.

  Reply with exactly these two lines and nothing else:
  TABULAR_SUBQUERY: <sub-query for the CSV tables>
  TEXT_SUBQUERY: <sub-query for the text documents>

  Question: {{query}}
"#;

const ANSWER_TABULAR_YAML: &str = r#"
id: pipeline.answer.tabular
title: Answer from matched table rows
apiVersion: "1.0"
createdBy: ledgerlens
variables: [query, subquery, context]
template: |
  Use only the table rows provided below. Do not use outside knowledge.
  If the rows do not answer the question, say which information is missing.
  Name the file a figure comes from when you cite it.

  Question: {{query}}
  Focus: {{subquery}}

  Table rows:
  {{context}}
"#;

const ANSWER_TEXT_YAML: &str = r#"
id: pipeline.answer.text
title: Answer from retrieved document passages
apiVersion: "1.0"
createdBy: ledgerlens
variables: [query, subquery, context]
template: |
  Use only the document passages provided below. Do not use outside knowledge.
  If the passages do not answer the question, say which information is missing.
  Cite passages by their [source: ...] tag.

  Question: {{query}}
  Focus: {{subquery}}

  Passages:
  {{context}}
"#;

const COLLATE_YAML: &str = r#"
id: pipeline.collate
title: Collate the tabular and document answers
apiVersion: "1.0"
createdBy: ledgerlens
variables: [query, tabular_answer, text_answer]
template: |
  Original question: {{query}}

  Answer from the CSV data analyst:
  {{tabular_answer}}

  Answer from the financial document expert:
  {{text_answer}}

  Write one coherent answer to the original question using only the two answers above.
  State where the data and the documents agree. Where they conflict, present both views and say which source each comes from.
  Structure the answer with short sections.
"#;

/// Ids of every built-in prompt.
pub const BUILTIN_IDS: [&str; 4] = [DECOMPOSE, ANSWER_TABULAR, ANSWER_TEXT, COLLATE];

/// Look up a built-in prompt definition by id.
pub fn builtin(id: &str) -> Option<AppResult<PromptDefinition>> {
    let yaml = match id {
        DECOMPOSE => DECOMPOSE_YAML,
        ANSWER_TABULAR => ANSWER_TABULAR_YAML,
        ANSWER_TEXT => ANSWER_TEXT_YAML,
        COLLATE => COLLATE_YAML,
        _ => return None,
    };

    Some(serde_yaml::from_str(yaml).map_err(|e| {
        AppError::Prompt(format!("Built-in prompt '{}' is invalid: {}", id, e))
    }))
}
