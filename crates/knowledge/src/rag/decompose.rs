//! Query decomposition into per-source sub-queries.

use crate::rag::types::{Decomposition, SubqueryPair};
use ledgerlens_core::AppResult;
use ledgerlens_llm::{Agent, LlmUsage};
use ledgerlens_prompt::defaults::DECOMPOSE;
use ledgerlens_prompt::PromptSet;
use std::collections::HashMap;

const TABULAR_PREFIX: &str = "TABULAR_SUBQUERY:";
const TEXT_PREFIX: &str = "TEXT_SUBQUERY:";

/// Ask the coordinator to split `query`, falling back to the original query
/// for both sources on any failure.
///
/// Returns the decomposition and the usage of the coordinator call.
pub async fn decompose(
    coordinator: &Agent,
    prompts: &PromptSet,
    query: &str,
) -> (Decomposition, LlmUsage) {
    match request_decomposition(coordinator, prompts, query).await {
        Ok((subqueries, usage)) => {
            tracing::info!(
                tabular = %subqueries.tabular,
                text = %subqueries.text,
                "Decomposed query"
            );
            (
                Decomposition {
                    subqueries,
                    fell_back: false,
                },
                usage,
            )
        }
        Err(e) => {
            tracing::warn!(
                "Decomposition failed, using the original query for both sources: {}",
                e
            );
            (
                Decomposition {
                    subqueries: SubqueryPair::fallback(query),
                    fell_back: true,
                },
                LlmUsage::default(),
            )
        }
    }
}

async fn request_decomposition(
    coordinator: &Agent,
    prompts: &PromptSet,
    query: &str,
) -> AppResult<(SubqueryPair, LlmUsage)> {
    let mut variables = HashMap::new();
    variables.insert("query".to_string(), query.to_string());

    let prompt = prompts.render(DECOMPOSE, variables)?;
    let reply = coordinator.run(&prompt.text).await?;

    tracing::debug!("Decomposition reply: {}", reply.content);
    Ok((parse_decomposition(&reply.content), reply.usage))
}

/// Extract the two sub-queries from a coordinator reply.
///
/// Lines may appear in any order, carry list or emphasis markers, and be
/// surrounded by unrelated text. The first line for each prefix wins; a
/// missing prefix leaves that sub-query empty.
pub fn parse_decomposition(reply: &str) -> SubqueryPair {
    let mut tabular: Option<String> = None;
    let mut text: Option<String> = None;

    for line in reply.lines() {
        let line = strip_markers(line);

        if tabular.is_none() {
            if let Some(value) = strip_prefix_ignore_case(line, TABULAR_PREFIX) {
                tabular = Some(clean_value(value));
                continue;
            }
        }
        if text.is_none() {
            if let Some(value) = strip_prefix_ignore_case(line, TEXT_PREFIX) {
                text = Some(clean_value(value));
            }
        }
    }

    SubqueryPair::new(tabular.unwrap_or_default(), text.unwrap_or_default())
}

/// Strip whitespace, leading list or quote markers, and `**` emphasis.
fn strip_markers(line: &str) -> &str {
    let mut line = line.trim();
    loop {
        let stripped = line
            .strip_prefix("**")
            .or_else(|| line.strip_prefix(['-', '*', '>']))
            .map(str::trim_start);

        match stripped {
            Some(rest) => line = rest,
            None => return line,
        }
    }
}

fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &line[prefix.len()..])
}

fn clean_value(value: &str) -> String {
    value
        .trim()
        .trim_start_matches("**")
        .trim_end_matches("**")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerlens_llm::MockClient;
    use std::sync::Arc;

    #[test]
    fn test_parse_plain_reply() {
        let pair = parse_decomposition(
            "TABULAR_SUBQUERY: 2005-03-11\nTEXT_SUBQUERY: market sentiment in March 2005",
        );
        assert_eq!(pair, SubqueryPair::new("2005-03-11", "market sentiment in March 2005"));
    }

    #[test]
    fn test_parse_any_order_with_noise() {
        let reply = "Sure! Here is the split:\n\n\
                     TEXT_SUBQUERY: risk management practices\n\
                     Some commentary\n\
                     TABULAR_SUBQUERY: risk\n\
                     Hope this helps.";
        let pair = parse_decomposition(reply);
        assert_eq!(pair, SubqueryPair::new("risk", "risk management practices"));
    }

    #[test]
    fn test_parse_markdown_decorations() {
        let reply = "- **TABULAR_SUBQUERY:** negative\n* > **text_subquery: credit losses**";
        let pair = parse_decomposition(reply);
        assert_eq!(pair, SubqueryPair::new("negative", "credit losses"));
    }

    #[test]
    fn test_parse_first_occurrence_wins() {
        let reply = "TABULAR_SUBQUERY: first\nTABULAR_SUBQUERY: second\nTEXT_SUBQUERY: t";
        assert_eq!(parse_decomposition(reply).tabular, "first");
    }

    #[test]
    fn test_parse_missing_prefixes() {
        let pair = parse_decomposition("I cannot split this question.");
        assert_eq!(pair, SubqueryPair::default());
        assert_eq!(pair.tabular_or("q"), "q");

        let pair = parse_decomposition("TEXT_SUBQUERY: liquidity");
        assert_eq!(pair.tabular, "");
        assert_eq!(pair.text, "liquidity");
    }

    #[test]
    fn test_parse_non_ascii_lines() {
        let pair = parse_decomposition("é\nTEXT_SUBQUERY: société générale");
        assert_eq!(pair.text, "société générale");
    }

    #[tokio::test]
    async fn test_decompose_uses_coordinator_reply() {
        let client = Arc::new(MockClient::constant(
            "TABULAR_SUBQUERY: 2005-03-11\nTEXT_SUBQUERY: sentiment",
        ));
        let coordinator = Agent::new("Team_Leader", "Coordinator", client.clone(), "mock");
        let prompts = PromptSet::builtin().unwrap();

        let (decomposition, _) =
            decompose(&coordinator, &prompts, "What happened on 2005-03-11?").await;

        assert!(!decomposition.fell_back);
        assert_eq!(decomposition.subqueries.tabular, "2005-03-11");
        assert!(client.requests()[0].prompt.contains("What happened on 2005-03-11?"));
    }

    #[tokio::test]
    async fn test_decompose_falls_back_on_failure() {
        let client = Arc::new(MockClient::failing("timeout"));
        let coordinator = Agent::new("Team_Leader", "Coordinator", client, "mock");
        let prompts = PromptSet::builtin().unwrap();

        let (decomposition, usage) = decompose(&coordinator, &prompts, "Revenue?").await;

        assert!(decomposition.fell_back);
        assert_eq!(decomposition.subqueries, SubqueryPair::fallback("Revenue?"));
        assert_eq!(usage, LlmUsage::default());
    }
}
