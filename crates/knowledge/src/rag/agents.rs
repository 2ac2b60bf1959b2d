//! The three agent personas of the pipeline.

use ledgerlens_llm::{Agent, LlmClient};
use std::sync::Arc;

pub const TEXT_EXPERT_NAME: &str = "Finance_Document_Expert";
pub const TABLE_ANALYST_NAME: &str = "CSV_Data_Analyst";
pub const COORDINATOR_NAME: &str = "Team_Leader";

/// Answers from financial document passages.
pub fn finance_document_expert(client: Arc<dyn LlmClient>, model: &str) -> Agent {
    Agent::new(
        TEXT_EXPERT_NAME,
        "Financial Document Knowledge Base Specialist",
        client,
        model,
    )
    .with_instructions([
        "Analyze financial documents thoroughly and provide detailed insights",
        "Reference specific sections of documents when making claims",
        "Provide context and explanations for financial terms and concepts",
        "Be precise with numbers, dates, and financial calculations",
        "When uncertain, clearly state what information is missing",
    ])
    .with_temperature(0.3)
}

/// Answers from matched CSV rows.
pub fn csv_data_analyst(client: Arc<dyn LlmClient>, model: &str) -> Agent {
    Agent::new(TABLE_ANALYST_NAME, "Real-Time CSV Data Analyst", client, model)
        .with_instructions([
            "Analyze CSV data to extract relevant insights based on queries",
            "Provide statistical summaries and key findings",
            "Highlight trends and patterns in the data",
            "Be specific with numbers and percentages",
            "Mention data quality limitations if present",
        ])
        .with_temperature(0.3)
}

/// Splits queries and collates the specialists' answers.
pub fn team_leader(client: Arc<dyn LlmClient>, model: &str) -> Agent {
    Agent::new(
        COORDINATOR_NAME,
        "Multi-Agent Coordinator and Team Leader",
        client,
        model,
    )
    .with_instructions([
        "Understand the user's query and determine what information is needed",
        "Synthesize responses from multiple agents into a coherent answer",
        "Highlight synergies and contradictions between document knowledge and real data",
        "Provide a balanced perspective that combines both sources",
        "Clearly structure the final response with sections and proper formatting",
        "If agents provide conflicting information, present both views with context",
    ])
}

/// The coordinator and the two source specialists.
#[derive(Debug, Clone)]
pub struct AgentTeam {
    pub coordinator: Agent,
    pub table_analyst: Agent,
    pub text_expert: Agent,
}

impl AgentTeam {
    /// All three personas on one client and model.
    pub fn with_client(client: Arc<dyn LlmClient>, model: &str) -> Self {
        Self {
            coordinator: team_leader(client.clone(), model),
            table_analyst: csv_data_analyst(client.clone(), model),
            text_expert: finance_document_expert(client, model),
        }
    }
}
