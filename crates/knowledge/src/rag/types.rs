//! Pipeline request and result types.

use ledgerlens_llm::LlmUsage;
use serde::{Deserialize, Serialize};

/// Sub-queries for the two evidence sources.
///
/// Either side may be empty, in which case the original query is used for
/// that source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubqueryPair {
    pub tabular: String,
    pub text: String,
}

impl SubqueryPair {
    pub fn new(tabular: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tabular: tabular.into(),
            text: text.into(),
        }
    }

    /// Pair that sends the original query to both sources.
    pub fn fallback(query: &str) -> Self {
        Self::new(query, query)
    }

    /// Tabular sub-query, or `query` if it is empty.
    pub fn tabular_or<'a>(&'a self, query: &'a str) -> &'a str {
        non_empty_or(&self.tabular, query)
    }

    /// Text sub-query, or `query` if it is empty.
    pub fn text_or<'a>(&'a self, query: &'a str) -> &'a str {
        non_empty_or(&self.text, query)
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// Outcome of decomposing a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decomposition {
    pub subqueries: SubqueryPair,

    /// The coordinator call failed and both sources get the original query
    pub fell_back: bool,
}

/// What evidence a run was answered from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceSummary {
    /// Table files with at least one matching row
    pub table_files: Vec<String>,

    /// Matching rows across all tables, before capping
    pub matched_rows: usize,

    /// Distinct sources of the retrieved passages, in retrieval order
    pub text_sources: Vec<String>,
}

/// A successfully answered query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub query: String,

    /// Sub-query actually sent to the tabular matcher
    pub tabular_subquery: String,

    /// Sub-query actually sent to the text retriever
    pub text_subquery: String,

    pub decomposition_fell_back: bool,

    pub tabular_answer: String,

    pub text_answer: String,

    /// Collated final answer
    pub answer: String,

    pub evidence: EvidenceSummary,

    /// Token usage across every model call of the run
    pub usage: LlmUsage,
}

/// Result of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Success(PipelineResult),
    NoEvidence { query: String, error: String },
    Error { query: String, error: String },
}

impl PipelineOutcome {
    pub fn error(query: &str, error: impl Into<String>) -> Self {
        Self::Error {
            query: query.to_string(),
            error: error.into(),
        }
    }

    pub fn no_evidence(query: &str) -> Self {
        Self::NoEvidence {
            query: query.to_string(),
            error: "No relevant evidence found in the tables or the documents".to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Final answer, if the run succeeded.
    pub fn answer(&self) -> Option<&str> {
        match self {
            Self::Success(result) => Some(&result.answer),
            _ => None,
        }
    }

    /// Status tag as serialized.
    pub fn status(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::NoEvidence { .. } => "no_evidence",
            Self::Error { .. } => "error",
        }
    }
}
