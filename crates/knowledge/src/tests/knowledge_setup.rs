//! Tests for knowledge base setup and the stores it produces.

use super::fixtures::*;
use crate::types::KnowledgeConfig;
use crate::KnowledgeBase;
use tempfile::TempDir;

#[test]
fn test_setup_creates_missing_directories() {
    let temp = TempDir::new().unwrap();
    let config = KnowledgeConfig::default();

    let knowledge = KnowledgeBase::setup(temp.path(), &config).unwrap();

    assert!(temp.path().join(&config.text_dir).is_dir());
    assert!(temp.path().join(&config.table_dir).is_dir());
    assert_eq!(knowledge.summary().text_documents, 0);
    assert_eq!(knowledge.summary().table_files, 0);
}

#[test]
fn test_setup_summary_counts() {
    let temp = finance_workspace();
    write_text(temp.path(), "legacy.txt", b"Soci\xe9t\xe9 G\xe9n\xe9rale annual review".as_slice());
    write_text(temp.path(), "scan.txt", [0x25u8, 0x50, 0x00, 0x46].as_slice());
    write_text(temp.path(), "readme.md", "not a text document");

    let knowledge = KnowledgeBase::setup(temp.path(), &KnowledgeConfig::default()).unwrap();
    let summary = knowledge.summary();

    assert_eq!(summary.text_documents, 4);
    assert_eq!(summary.text_chunks, 4);
    assert_eq!(summary.table_files, 2);
    assert_eq!(summary.skipped.len(), 1);
    assert!(summary.skipped[0].path.ends_with("scan.txt"));
}

#[test]
fn test_setup_honors_custom_directories() {
    let temp = TempDir::new().unwrap();
    let config = KnowledgeConfig {
        text_dir: "docs".into(),
        table_dir: "tables".into(),
        ..KnowledgeConfig::default()
    };
    std::fs::create_dir_all(temp.path().join("tables")).unwrap();
    std::fs::write(temp.path().join("tables/a.csv"), "x\n1\n").unwrap();

    let knowledge = KnowledgeBase::setup(temp.path(), &config).unwrap();

    assert!(temp.path().join("docs").is_dir());
    assert_eq!(knowledge.summary().table_files, 1);
    assert_eq!(knowledge.tabular_matcher().dir(), temp.path().join("tables"));
}

#[tokio::test]
async fn test_text_retriever_over_loaded_documents() {
    let temp = finance_workspace();
    let knowledge = KnowledgeBase::setup(temp.path(), &KnowledgeConfig::default()).unwrap();

    let documents = knowledge.text_retriever().retrieve("risk management").await;

    assert!(!documents.is_empty());
    assert!(documents.len() <= knowledge.config().text_top_k);
    assert_eq!(documents[0].source, "risk_report.txt");
}

#[tokio::test]
async fn test_latin1_document_is_searchable() {
    let temp = empty_workspace();
    write_text(temp.path(), "legacy.txt", b"Soci\xe9t\xe9 G\xe9n\xe9rale annual review".as_slice());
    let knowledge = KnowledgeBase::setup(temp.path(), &KnowledgeConfig::default()).unwrap();

    let documents = knowledge.text_retriever().retrieve("Société Générale").await;

    assert_eq!(documents.len(), 1);
    assert!(documents[0].text.starts_with("Société"));
}

#[test]
fn test_tabular_matcher_over_loaded_tables() {
    let temp = finance_workspace();
    let knowledge = KnowledgeBase::setup(temp.path(), &KnowledgeConfig::default()).unwrap();

    let matches = knowledge.tabular_matcher().match_query("moody's");
    assert_eq!(matches.len(), 1);
    assert_eq!(matches["ratings.csv"].rows[0][2], "A1");
}
