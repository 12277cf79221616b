//! Deployment and validation runs end to end against the mock backend

use std::sync::Arc;

use lifecycle_cli::deploy::run::{start_run, RunClients, RunKind, RunRequest};
use lifecycle_cli::deploy::upload::ServiceSelection;
use lifecycle_cli::errors::CliError;
use reqwest::StatusCode;
use lifecycle_cli::inject::EnvVars;
use lifecycle_cli::storage::layout::ProjectLayout;
use lifecycle_cli::storage::manifest::LifecycleConfig;

use crate::support::{fast_retry, project, write, BackendState, MockBackend};

async fn setup(root: &std::path::Path) -> (ProjectLayout, LifecycleConfig) {
    project(root, &["baqs", "iam"]);
    write(root, "lifecycle/iam/iam.json", r#"{"client": "orders"}"#);
    write(root, "lifecycle/baqs/baqs.json", r#"{"queue": "orders"}"#);
    let layout = ProjectLayout::new(root);
    let manifest = LifecycleConfig::load(&layout.manifest_file()).await.unwrap();
    (layout, manifest)
}

fn clients(backend: &MockBackend) -> RunClients {
    RunClients {
        iam: backend.iam_client(),
        deployment: backend.deployment_client(),
    }
}

fn request(kind: RunKind, selection: ServiceSelection) -> RunRequest {
    RunRequest {
        kind,
        selection,
        env_vars: Arc::new(EnvVars::new()),
        concurrency: 4,
    }
}

#[tokio::test]
async fn test_deploy_uploads_then_triggers() {
    let dir = tempfile::tempdir().unwrap();
    let (layout, manifest) = setup(dir.path()).await;
    let backend = MockBackend::start(BackendState::default()).await;

    let mut progress = 0;
    let started = start_run(
        &clients(&backend),
        &layout,
        &manifest,
        request(RunKind::Deploy, ServiceSelection::Only(vec!["iam".to_string()])),
        &fast_retry(),
        |_| progress += 1,
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(started.app_id, "app-123");
    assert_eq!(started.services(), ["iam"]);
    let preflight = started.preflight.as_ref().unwrap();
    assert!(preflight.changes.is_empty());
    assert!(!preflight.studio_created);
    assert_eq!(progress, 2);

    let state = backend.state();
    assert_eq!(state.triggered.len(), 1);
    let (endpoint, payload) = &state.triggered[0];
    assert_eq!(endpoint, "deploy");
    assert_eq!(payload["deployment_id"], started.run_id.to_string());
    assert_eq!(payload["app_id"], "app-123");
    assert_eq!(payload["app_version"], "1.0.0");
    assert_eq!(payload["app_name"], "Demo App");
    assert_eq!(
        payload["services"]["iam"]["configuration_file_path"],
        format!("lifecycle/app-123/{}/iam", started.run_id)
    );
    assert!(payload["services"].get("baqs").is_none());
}

#[tokio::test]
async fn test_dry_run_triggers_validation() {
    let dir = tempfile::tempdir().unwrap();
    let (layout, manifest) = setup(dir.path()).await;
    let backend = MockBackend::start(BackendState::default()).await;

    let started = start_run(
        &clients(&backend),
        &layout,
        &manifest,
        request(RunKind::DryRun, ServiceSelection::All),
        &fast_retry(),
        |_| {},
    )
    .await
    .unwrap()
    .unwrap();

    assert!(started.preflight.is_none());
    assert_eq!(started.services(), ["baqs", "iam"]);
    let state = backend.state();
    assert_eq!(state.triggered.len(), 1);
    assert_eq!(state.triggered[0].0, "dry-run");
    assert_eq!(state.uploads.len(), 3);
}

#[tokio::test]
async fn test_active_run_blocks_new_run() {
    let dir = tempfile::tempdir().unwrap();
    let (layout, manifest) = setup(dir.path()).await;
    let backend = MockBackend::start(BackendState {
        application_in_progress: true,
        ..Default::default()
    })
    .await;

    for kind in [RunKind::Deploy, RunKind::DryRun] {
        let err = start_run(
            &clients(&backend),
            &layout,
            &manifest,
            request(kind, ServiceSelection::All),
            &fast_retry(),
            |_| {},
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CliError::DeploymentInProgress(ref id) if id == "app-123"));
    }

    let state = backend.state();
    assert!(state.presigned_keys.is_empty());
    assert!(state.triggered.is_empty());
}

#[tokio::test]
async fn test_unregistered_application_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (layout, _) = setup(dir.path()).await;
    let contents = std::fs::read_to_string(dir.path().join("lifecycle/lifecycle_config.yaml"))
        .unwrap()
        .replace("app-123", "unknown");
    write(dir.path(), "lifecycle/lifecycle_config.yaml", &contents);
    let manifest = LifecycleConfig::load(&layout.manifest_file()).await.unwrap();
    let backend = MockBackend::start(BackendState::default()).await;

    let err = start_run(
        &clients(&backend),
        &layout,
        &manifest,
        request(RunKind::Deploy, ServiceSelection::All),
        &fast_retry(),
        |_| {},
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CliError::NotFound(_)));
    assert!(backend.state().triggered.is_empty());
}

#[tokio::test]
async fn test_empty_selection_triggers_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (layout, manifest) = setup(dir.path()).await;
    let backend = MockBackend::start(BackendState::default()).await;

    let started = start_run(
        &clients(&backend),
        &layout,
        &manifest,
        request(RunKind::DryRun, ServiceSelection::Only(Vec::new())),
        &fast_retry(),
        |_| {},
    )
    .await
    .unwrap();

    assert!(started.is_none());
    assert!(backend.state().triggered.is_empty());
}

#[tokio::test]
async fn test_cancel_accepts_plain_text_reply() {
    let backend = MockBackend::start(BackendState::default()).await;

    backend
        .deployment_client()
        .cancel_deployment("run-1")
        .await
        .unwrap();
    assert_eq!(backend.state().cancelled, vec!["run-1"]);

    let err = backend
        .deployment_client()
        .cancel_deployment("missing")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CliError::Api {
            status: StatusCode::NOT_FOUND,
            ..
        }
    ));
}
