//! Integration tests for repositories backed by SQLite.
//!
//! Verifies that history and tags survive reopening the database.

use rulevault_core::{
    NodeStore, NodeStoreProvider, RepositoryConfig, RuleItem, VersionScheme, VersionableItem,
};
use rulevault_stores::NodeStoreFactory;
use std::path::Path;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn sqlite_config(path: &Path, scheme: VersionScheme) -> RepositoryConfig {
    RepositoryConfig::builder()
        .provider(NodeStoreProvider::Sqlite)
        .db_path(path)
        .version_scheme(scheme)
        .build()
}

#[test]
fn test_history_survives_reopen() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = sqlite_config(&dir.path().join("rules.db"), VersionScheme::Incrementing);

    let id = {
        let repo = NodeStoreFactory::open_repository(&config).unwrap();
        let rule = repo.create_item::<RuleItem>("loan-approval").unwrap();
        rule.update_title("Loan Rule").unwrap();
        rule.add_category("finance").unwrap();
        rule.checkin("first").unwrap();
        rule.update_title("Loan Rule v2").unwrap();
        rule.checkin("second").unwrap();
        rule.node_id()
    };

    let repo = NodeStoreFactory::open_repository(&config).unwrap();
    let rule: RuleItem = repo.load_item(id).unwrap();
    assert_eq!(rule.title().unwrap().as_deref(), Some("Loan Rule v2"));
    assert_eq!(rule.version_number().unwrap().as_deref(), Some("2"));

    let previous = rule.preceding_version().unwrap().unwrap();
    assert_eq!(previous.title().unwrap().as_deref(), Some("Loan Rule"));
    assert_eq!(previous.checkin_comment().unwrap().as_deref(), Some("first"));
    assert_eq!(previous.categories().unwrap()[0].name(), "finance");

    // editing continues from the persisted head
    rule.update_title("Loan Rule v3").unwrap();
    rule.checkin("third").unwrap();
    assert_eq!(rule.version_number().unwrap().as_deref(), Some("3"));
    assert_eq!(rule.history().unwrap().len(), 2);
}

#[test]
fn test_categories_not_duplicated_across_sessions() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = sqlite_config(&dir.path().join("rules.db"), VersionScheme::Dotted);

    let first = {
        let repo = NodeStoreFactory::open_repository(&config).unwrap();
        repo.load_category("finance").unwrap()
    };

    let repo = NodeStoreFactory::open_repository(&config).unwrap();
    let again = repo.load_category("finance").unwrap();
    assert_eq!(first, again);

    let rule = repo.create_item::<RuleItem>("dotted").unwrap();
    rule.add_category("finance").unwrap();
    rule.add_category("finance").unwrap();
    rule.checkin("first").unwrap();
    assert_eq!(rule.version_number().unwrap().as_deref(), Some("1.0"));
    assert_eq!(rule.categories().unwrap().len(), 1);
}

#[test]
fn test_new_tag_does_not_save_pending_edits() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = sqlite_config(&dir.path().join("rules.db"), VersionScheme::Incrementing);

    let id = {
        let repo = NodeStoreFactory::open_repository(&config).unwrap();
        let rule = repo.create_item::<RuleItem>("loan-approval").unwrap();
        rule.update_title("draft title").unwrap();
        rule.add_category("new").unwrap();
        rule.node_id()
    };

    let repo = NodeStoreFactory::open_repository(&config).unwrap();
    let rule: RuleItem = repo.load_item(id).unwrap();
    assert!(rule.title().unwrap().is_none());
    assert!(rule.categories().unwrap().is_empty());
    assert!(repo.store().find_category("new").unwrap().is_some());
}
