//! Local validation with schemas served by the registry

use std::path::Path;

use lifecycle_cli::deploy::schema_check::validate_services;
use lifecycle_cli::storage::layout::ProjectLayout;
use lifecycle_cli::storage::manifest::LifecycleConfig;
use serde_json::json;

use crate::support::{project, write, BackendState, MockBackend};

fn connector_schema() -> serde_json::Value {
    json!({
        "jsonSchema": {
            "type": "object",
            "required": ["name", "port"],
            "properties": {
                "name": {"type": "string"},
                "port": {"type": "integer"}
            }
        },
        "name": "example-connector",
        "port": 5432
    })
}

#[tokio::test]
async fn test_data_fabric_files_checked_against_registry() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    project(root, &["data_fabric"]);
    write(
        root,
        "lifecycle/data_fabric/connectors/pg.json",
        r#"{"name": "pg", "port": 5432}"#,
    );
    write(
        root,
        "lifecycle/data_fabric/connectors/mysql.yaml",
        "name: mysql\nport: not-a-number\n",
    );
    write(
        root,
        "lifecycle/data_fabric/connectors/pg.example.json",
        r#"{"anything": true}"#,
    );
    write(root, "lifecycle/data_fabric/tables/orders.json", r#"{"name": "orders"}"#);

    let mut state = BackendState::default();
    state
        .schemas
        .insert("data_fabric/connector".to_string(), connector_schema());
    let backend = MockBackend::start(state).await;

    let layout = ProjectLayout::new(root);
    let manifest = LifecycleConfig::load(&layout.manifest_file()).await.unwrap();
    let report = validate_services(
        &backend.backend_client(),
        &layout,
        &manifest,
        &["data_fabric".to_string()],
    )
    .await
    .unwrap();

    let groups = &report.services[0].groups;
    assert_eq!(groups.len(), 2);

    let connectors = &groups[0];
    assert_eq!(connectors.label, "connectors");
    assert!(connectors.schema_error.is_none());
    assert_eq!(connectors.files.len(), 2);
    let mysql = connectors
        .files
        .iter()
        .find(|f| f.path == Path::new("connectors/mysql.yaml"))
        .unwrap();
    assert_eq!(mysql.errors.len(), 1);
    let pg = connectors
        .files
        .iter()
        .find(|f| f.path == Path::new("connectors/pg.json"))
        .unwrap();
    assert!(pg.errors.is_empty());

    // the registry serves no table schema
    let tables = &groups[1];
    assert_eq!(tables.label, "tables");
    assert!(tables
        .schema_error
        .as_deref()
        .unwrap()
        .contains("data_fabric/table"));
    assert!(tables.files.is_empty());

    assert_eq!(report.files_validated(), 2);
    assert_eq!(report.error_count(), 2);
}

#[tokio::test]
async fn test_plain_service_uses_its_own_schema() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    project(root, &["iam"]);
    write(root, "lifecycle/iam/iam.json", r#"{"client": "orders"}"#);
    write(root, "lifecycle/iam/roles/reader.json", r#"{"client": 7}"#);

    let mut state = BackendState::default();
    state.schemas.insert(
        "iam".to_string(),
        json!({"jsonSchema": {
            "type": "object",
            "properties": {"client": {"type": "string"}}
        }}),
    );
    let backend = MockBackend::start(state).await;

    let layout = ProjectLayout::new(root);
    let manifest = LifecycleConfig::load(&layout.manifest_file()).await.unwrap();
    let report = validate_services(
        &backend.backend_client(),
        &layout,
        &manifest,
        &["iam".to_string()],
    )
    .await
    .unwrap();

    assert_eq!(report.files_validated(), 2);
    assert_eq!(report.error_count(), 1);
    assert!(report.missing_folders.is_empty());
}
