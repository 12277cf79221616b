//! Environment files feeding placeholder injection

use std::path::Path;

use lifecycle_cli::errors::CliError;
use lifecycle_cli::inject::{inject_document, load_env_file};
use lifecycle_cli::storage::layout::ProjectLayout;
use lifecycle_cli::storage::settings::Environment;

use crate::support::write;

#[tokio::test]
async fn test_env_file_values_reach_yaml_document() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "lifecycle/lifecycle_envs/dev.env",
        "# connector settings\nDB_HOST=db.dev.internal\ndb.PORT=6543\n",
    );
    let layout = ProjectLayout::new(dir.path());
    let vars = load_env_file(&layout.env_file(Environment::Dev)).await.unwrap();

    let out = inject_document(
        Path::new("connectors/pg.yaml"),
        "name: pg\nhosts:\n  - ${env.DB_HOST}\nport: ${db.PORT}\nretries: 3\n",
        &vars,
    )
    .unwrap();

    let parsed: serde_yaml::Value = serde_yaml::from_slice(&out).unwrap();
    assert_eq!(parsed["hosts"][0].as_str(), Some("db.dev.internal"));
    // substituted values stay strings
    assert_eq!(parsed["port"].as_str(), Some("6543"));
    assert_eq!(parsed["retries"].as_u64(), Some(3));
}

#[tokio::test]
async fn test_other_environment_file_is_not_read() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "lifecycle/lifecycle_envs/dev.env", "TOKEN=dev\n");
    let layout = ProjectLayout::new(dir.path());
    let vars = load_env_file(&layout.env_file(Environment::Prod)).await.unwrap();

    let err = inject_document(Path::new("a.json"), r#"{"t": "${env.TOKEN}"}"#, &vars).unwrap_err();
    match err {
        CliError::MissingVariables(names) => assert_eq!(names, vec!["env.TOKEN"]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_json_output_is_reparseable() {
    let vars = [("NAME".to_string(), "orders \"v2\"".to_string())]
        .into_iter()
        .collect();
    let out = inject_document(Path::new("a.json"), r#"{"n": "${x.NAME}"}"#, &vars).unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(parsed["n"], "orders \"v2\"");
}

#[test]
fn test_yaml_without_placeholders_round_trips() {
    let contents = "name: orders\nreplicas: 3\nratio: 0.5\nenabled: true\n\
                    tags:\n- a\n- b\nlimits:\n  cpu: 500m\n";
    let vars = [("NAME".to_string(), "unused".to_string())]
        .into_iter()
        .collect();

    let out = inject_document(Path::new("svc.yaml"), contents, &vars).unwrap();

    let injected: serde_yaml::Value = serde_yaml::from_slice(&out).unwrap();
    let original: serde_yaml::Value = serde_yaml::from_str(contents).unwrap();
    assert_eq!(injected, original);
}

#[test]
fn test_malformed_document_is_an_error() {
    let err = inject_document(Path::new("a.json"), "{", &Default::default()).unwrap_err();
    assert!(matches!(err, CliError::JsonError(_)));
}
