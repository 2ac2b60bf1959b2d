//! Pipeline orchestration.
//!
//! A run decomposes the query, retrieves from both sources concurrently,
//! answers from each source's own context, and collates the two answers.
//! Every failure after decomposition ends the run with an `Error` outcome;
//! nothing propagates to the caller.

use crate::context::{
    build_tabular_context_with, build_text_context_with, DEFAULT_TABLE_PREVIEW_ROWS,
    DEFAULT_TEXT_CHAR_BUDGET,
};
use crate::rag::agents::AgentTeam;
use crate::rag::decompose::decompose;
use crate::rag::types::{EvidenceSummary, PipelineOutcome, PipelineResult};
use crate::retriever::TextRetriever;
use crate::tabular::TabularMatcher;
use crate::types::{Document, TabularMatchSet};
use crate::KnowledgeBase;
use ledgerlens_core::{AppError, AppResult};
use ledgerlens_llm::{Agent, LlmUsage};
use ledgerlens_prompt::defaults::{ANSWER_TABULAR, ANSWER_TEXT, COLLATE};
use ledgerlens_prompt::PromptSet;
use std::collections::HashMap;
use std::sync::Arc;

/// Sub-answer used when the tables had no matching rows.
pub const NO_TABLE_EVIDENCE: &str =
    "No matching rows were found in the CSV tables for this question.";

/// Sub-answer used when no document passage was retrieved.
pub const NO_TEXT_EVIDENCE: &str =
    "No relevant passages were found in the financial documents for this question.";

/// A set-up query pipeline.
///
/// Holds read-only handles to both knowledge stores; every method takes
/// `&self`, so one pipeline can serve many queries.
#[derive(Debug, Clone)]
pub struct Pipeline {
    matcher: Arc<TabularMatcher>,
    retriever: TextRetriever,
    team: AgentTeam,
    prompts: Arc<PromptSet>,
    text_char_budget: usize,
    table_preview_rows: usize,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Answer `query` from the tables and the documents.
    pub async fn process_query(&self, query: &str) -> PipelineOutcome {
        let query = query.trim();
        if query.is_empty() {
            return PipelineOutcome::error(query, "Query is empty");
        }

        tracing::info!("Processing query: {}", query);

        match self.run(query).await {
            Ok(outcome) => {
                tracing::info!("Query finished with status: {}", outcome.status());
                outcome
            }
            Err(e) => {
                tracing::warn!("Query failed: {}", e);
                PipelineOutcome::error(query, e.to_string())
            }
        }
    }

    async fn run(&self, query: &str) -> AppResult<PipelineOutcome> {
        let (decomposition, mut usage) =
            decompose(&self.team.coordinator, &self.prompts, query).await;

        let tabular_subquery = decomposition.subqueries.tabular_or(query).to_string();
        let text_subquery = decomposition.subqueries.text_or(query).to_string();

        let (table_matches, documents) = self.retrieve(&tabular_subquery, &text_subquery).await?;

        if table_matches.is_empty() && documents.is_empty() {
            tracing::info!("No evidence in either source, skipping answering");
            return Ok(PipelineOutcome::no_evidence(query));
        }

        let tabular_answer = if table_matches.is_empty() {
            NO_TABLE_EVIDENCE.to_string()
        } else {
            let context = build_tabular_context_with(&table_matches, self.table_preview_rows);
            self.answer(
                &self.team.table_analyst,
                ANSWER_TABULAR,
                query,
                &tabular_subquery,
                context,
                &mut usage,
            )
            .await?
        };

        let text_answer = if documents.is_empty() {
            NO_TEXT_EVIDENCE.to_string()
        } else {
            let context = build_text_context_with(&documents, self.text_char_budget);
            self.answer(
                &self.team.text_expert,
                ANSWER_TEXT,
                query,
                &text_subquery,
                context,
                &mut usage,
            )
            .await?
        };

        let answer = self
            .collate(query, &tabular_answer, &text_answer, &mut usage)
            .await?;

        Ok(PipelineOutcome::Success(PipelineResult {
            query: query.to_string(),
            tabular_subquery,
            text_subquery,
            decomposition_fell_back: decomposition.fell_back,
            tabular_answer,
            text_answer,
            answer,
            evidence: summarize_evidence(&table_matches, &documents),
            usage,
        }))
    }

    /// Run both retrievals concurrently; table matching goes to the blocking pool.
    async fn retrieve(
        &self,
        tabular_subquery: &str,
        text_subquery: &str,
    ) -> AppResult<(TabularMatchSet, Vec<Document>)> {
        let matcher = Arc::clone(&self.matcher);
        let subquery = tabular_subquery.to_string();
        let tabular = tokio::task::spawn_blocking(move || matcher.match_query(&subquery));

        let (table_matches, documents) =
            tokio::join!(tabular, self.retriever.retrieve(text_subquery));

        let table_matches = table_matches
            .map_err(|e| AppError::Pipeline(format!("Tabular matching task failed: {}", e)))?;

        tracing::debug!(
            "Retrieved rows from {} tables and {} passages",
            table_matches.len(),
            documents.len()
        );

        Ok((table_matches, documents))
    }

    async fn answer(
        &self,
        agent: &Agent,
        prompt_id: &str,
        query: &str,
        subquery: &str,
        context: String,
        usage: &mut LlmUsage,
    ) -> AppResult<String> {
        let mut variables = HashMap::new();
        variables.insert("query".to_string(), query.to_string());
        variables.insert("subquery".to_string(), subquery.to_string());
        variables.insert("context".to_string(), context);

        let prompt = self.prompts.render(prompt_id, variables)?;
        let reply = agent.run(&prompt.text).await.map_err(|e| {
            AppError::Pipeline(format!("{} could not answer: {}", agent.name(), e))
        })?;

        usage.accumulate(&reply.usage);
        Ok(reply.content)
    }

    async fn collate(
        &self,
        query: &str,
        tabular_answer: &str,
        text_answer: &str,
        usage: &mut LlmUsage,
    ) -> AppResult<String> {
        let mut variables = HashMap::new();
        variables.insert("query".to_string(), query.to_string());
        variables.insert("tabular_answer".to_string(), tabular_answer.to_string());
        variables.insert("text_answer".to_string(), text_answer.to_string());

        let prompt = self.prompts.render(COLLATE, variables)?;
        let reply = self
            .team
            .coordinator
            .run(&prompt.text)
            .await
            .map_err(|e| AppError::Pipeline(format!("Collation failed: {}", e)))?;

        usage.accumulate(&reply.usage);
        Ok(reply.content)
    }
}

fn summarize_evidence(table_matches: &TabularMatchSet, documents: &[Document]) -> EvidenceSummary {
    let mut text_sources: Vec<String> = Vec::new();
    for document in documents {
        if !text_sources.contains(&document.source) {
            text_sources.push(document.source.clone());
        }
    }

    EvidenceSummary {
        table_files: table_matches.keys().cloned().collect(),
        matched_rows: table_matches.values().map(|m| m.total_matches).sum(),
        text_sources,
    }
}

/// Assembles a [`Pipeline`].
///
/// Both knowledge stores and all three agents are required; `build` refuses
/// to produce a pipeline without them.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    matcher: Option<Arc<TabularMatcher>>,
    retriever: Option<TextRetriever>,
    coordinator: Option<Agent>,
    table_analyst: Option<Agent>,
    text_expert: Option<Agent>,
    prompts: Option<PromptSet>,
    text_char_budget: usize,
    table_preview_rows: usize,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self {
            matcher: None,
            retriever: None,
            coordinator: None,
            table_analyst: None,
            text_expert: None,
            prompts: None,
            text_char_budget: DEFAULT_TEXT_CHAR_BUDGET,
            table_preview_rows: DEFAULT_TABLE_PREVIEW_ROWS,
        }
    }
}

impl PipelineBuilder {
    /// Use both stores of a set-up knowledge base and its context limits.
    pub fn knowledge_base(mut self, knowledge: &KnowledgeBase) -> Self {
        self.matcher = Some(knowledge.tabular_matcher());
        self.retriever = Some(knowledge.text_retriever());
        self.text_char_budget = knowledge.config().text_char_budget;
        self.table_preview_rows = knowledge.config().table_preview_rows;
        self
    }

    pub fn tabular_matcher(mut self, matcher: TabularMatcher) -> Self {
        self.matcher = Some(Arc::new(matcher));
        self
    }

    pub fn text_retriever(mut self, retriever: TextRetriever) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Set all three agents at once.
    pub fn team(mut self, team: AgentTeam) -> Self {
        self.coordinator = Some(team.coordinator);
        self.table_analyst = Some(team.table_analyst);
        self.text_expert = Some(team.text_expert);
        self
    }

    pub fn coordinator(mut self, agent: Agent) -> Self {
        self.coordinator = Some(agent);
        self
    }

    pub fn table_analyst(mut self, agent: Agent) -> Self {
        self.table_analyst = Some(agent);
        self
    }

    pub fn text_expert(mut self, agent: Agent) -> Self {
        self.text_expert = Some(agent);
        self
    }

    /// Prompt definitions; the built-ins are used if unset.
    pub fn prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = Some(prompts);
        self
    }

    pub fn text_char_budget(mut self, budget: usize) -> Self {
        self.text_char_budget = budget;
        self
    }

    pub fn table_preview_rows(mut self, rows: usize) -> Self {
        self.table_preview_rows = rows;
        self
    }

    pub fn build(self) -> AppResult<Pipeline> {
        let mut missing = Vec::new();
        if self.matcher.is_none() {
            missing.push("tabular knowledge base");
        }
        if self.retriever.is_none() {
            missing.push("text knowledge base");
        }
        if self.coordinator.is_none() {
            missing.push("coordinator agent");
        }
        if self.table_analyst.is_none() {
            missing.push("table analyst agent");
        }
        if self.text_expert.is_none() {
            missing.push("text expert agent");
        }

        let (
            Some(matcher),
            Some(retriever),
            Some(coordinator),
            Some(table_analyst),
            Some(text_expert),
        ) = (
            self.matcher,
            self.retriever,
            self.coordinator,
            self.table_analyst,
            self.text_expert,
        ) else {
            return Err(AppError::Pipeline(format!(
                "pipeline not initialized: missing {}",
                missing.join(", ")
            )));
        };

        let prompts = match self.prompts {
            Some(prompts) => prompts,
            None => PromptSet::builtin()?,
        };

        Ok(Pipeline {
            matcher,
            retriever,
            team: AgentTeam {
                coordinator,
                table_analyst,
                text_expert,
            },
            prompts: Arc::new(prompts),
            text_char_budget: self.text_char_budget,
            table_preview_rows: self.table_preview_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retriever::TextIndex;
    use ledgerlens_llm::MockClient;
    use tempfile::TempDir;

    struct EmptyIndex;

    #[async_trait::async_trait]
    impl TextIndex for EmptyIndex {
        async fn search(&self, _query: &str, _top_k: Option<usize>) -> AppResult<Vec<Document>> {
            Ok(Vec::new())
        }
    }

    fn team() -> AgentTeam {
        AgentTeam::with_client(Arc::new(MockClient::constant("ok")), "mock")
    }

    #[test]
    fn test_build_requires_knowledge_base() {
        let err = Pipeline::builder().team(team()).build().unwrap_err();
        let message = err.to_string();

        assert!(message.contains("pipeline not initialized"));
        assert!(message.contains("tabular knowledge base"));
        assert!(message.contains("text knowledge base"));
    }

    #[test]
    fn test_build_requires_agents() {
        let temp = TempDir::new().unwrap();
        let err = Pipeline::builder()
            .tabular_matcher(TabularMatcher::new(temp.path(), 100))
            .text_retriever(TextRetriever::new(Arc::new(EmptyIndex), 6))
            .coordinator(team().coordinator)
            .build()
            .unwrap_err();

        assert!(matches!(err, AppError::Pipeline(_)));
        assert!(err.to_string().contains("table analyst agent, text expert agent"));
    }

    #[tokio::test]
    async fn test_empty_query_is_error() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(MockClient::constant("ok"));
        let pipeline = Pipeline::builder()
            .tabular_matcher(TabularMatcher::new(temp.path(), 100))
            .text_retriever(TextRetriever::new(Arc::new(EmptyIndex), 6))
            .team(AgentTeam::with_client(client.clone(), "mock"))
            .build()
            .unwrap();

        let outcome = pipeline.process_query("   ").await;
        assert!(matches!(outcome, PipelineOutcome::Error { .. }));
        assert_eq!(client.call_count(), 0);
    }

    #[test]
    fn test_summarize_evidence_dedups_sources() {
        let docs = vec![
            Document::new("a", "risk.txt"),
            Document::new("b", "capital.txt"),
            Document::new("c", "risk.txt"),
        ];
        let summary = summarize_evidence(&TabularMatchSet::new(), &docs);

        assert_eq!(summary.text_sources, vec!["risk.txt", "capital.txt"]);
        assert_eq!(summary.matched_rows, 0);
    }
}
