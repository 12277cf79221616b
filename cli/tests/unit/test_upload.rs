//! Upload orchestration against the mock backend

use std::sync::Arc;

use lifecycle_cli::deploy::upload::{
    upload_services, ObjectUploader, ServiceSelection, UploadOutcome, UploadProgress,
    UploadRequest,
};
use lifecycle_cli::errors::CliError;
use lifecycle_cli::inject::EnvVars;
use lifecycle_cli::storage::layout::ProjectLayout;
use lifecycle_cli::storage::manifest::LifecycleConfig;
use uuid::Uuid;

use crate::support::{project, write, BackendState, MockBackend};

async fn setup(root: &std::path::Path) -> (ProjectLayout, LifecycleConfig) {
    project(root, &["baqs", "iam"]);
    write(
        root,
        "lifecycle/iam/iam.json",
        r#"{"client": "${IAM.CLIENT_NAME}", "scopes": ["read"]}"#,
    );
    write(root, "lifecycle/iam/roles/admin.yaml", "role: admin\n");
    write(root, "lifecycle/iam/iam.example.json", r#"{"client": "example"}"#);
    write(root, "lifecycle/baqs/baqs.json", r#"{"queue": "orders"}"#);

    let layout = ProjectLayout::new(root);
    let manifest = LifecycleConfig::load(&layout.manifest_file()).await.unwrap();
    (layout, manifest)
}

fn request(run_id: Uuid, selection: ServiceSelection) -> UploadRequest {
    let mut vars = EnvVars::new();
    vars.insert("CLIENT_NAME".to_string(), "orders-client".to_string());
    UploadRequest {
        run_id,
        app_id: "app-123".to_string(),
        selection,
        env_vars: Arc::new(vars),
        concurrency: 2,
    }
}

#[tokio::test]
async fn test_uploads_bundles_and_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let (layout, manifest) = setup(dir.path()).await;
    let backend = MockBackend::start(BackendState::default()).await;
    let uploader: Arc<dyn ObjectUploader> = Arc::new(backend.deployment_client());
    let run_id = Uuid::new_v4();

    let mut progress: Vec<UploadProgress> = Vec::new();
    let outcome = upload_services(
        uploader,
        &layout,
        &manifest,
        request(run_id, ServiceSelection::All),
        |p| progress.push(p.clone()),
    )
    .await
    .unwrap();

    let UploadOutcome::Uploaded(summary) = outcome else {
        panic!("expected uploads");
    };
    assert_eq!(summary.included, vec!["baqs", "iam"]);
    assert_eq!(summary.files_uploaded, 4);
    assert_eq!(
        summary.services["iam"].configuration_file_path,
        format!("lifecycle/app-123/{}/iam", run_id)
    );

    assert_eq!(progress.len(), 4);
    assert!(progress.iter().all(|p| p.total == 4 && p.error.is_none()));
    let mut counters: Vec<usize> = progress.iter().map(|p| p.completed).collect();
    counters.sort_unstable();
    assert_eq!(counters, vec![1, 2, 3, 4]);

    let state = backend.state();
    let prefix = format!("lifecycle/app-123/{}", run_id);
    let keys: Vec<&String> = state.uploads.keys().collect();
    assert_eq!(
        keys,
        vec![
            &format!("{}/baqs/baqs.json", prefix),
            &format!("{}/iam/iam.json", prefix),
            &format!("{}/iam/roles/admin.yaml", prefix),
            &format!("{}/lifecycle_config.yaml", prefix),
        ]
    );

    let iam: serde_json::Value =
        serde_json::from_slice(&state.uploads[&format!("{}/iam/iam.json", prefix)]).unwrap();
    assert_eq!(iam["client"], "orders-client");

    assert_eq!(state.upload_headers.len(), 4);
    assert!(state.upload_headers.iter().all(|(_, v)| v == "aws:kms"));
    assert!(state.credential_headers.is_empty());
}

#[tokio::test]
async fn test_one_presign_failure_fails_the_pass() {
    let dir = tempfile::tempdir().unwrap();
    let (layout, manifest) = setup(dir.path()).await;
    let backend = MockBackend::start(BackendState {
        failing_presign_suffix: Some("baqs/baqs.json".to_string()),
        ..Default::default()
    })
    .await;
    let uploader: Arc<dyn ObjectUploader> = Arc::new(backend.deployment_client());

    let mut progress: Vec<UploadProgress> = Vec::new();
    let result = upload_services(
        uploader,
        &layout,
        &manifest,
        request(Uuid::new_v4(), ServiceSelection::All),
        |p| progress.push(p.clone()),
    )
    .await;

    match result {
        Err(CliError::UploadFailed(failures)) => {
            assert_eq!(failures.len(), 1);
            assert!(failures[0].contains("Failed to generate presigned URL"));
            assert!(failures[0].contains("baqs.json"));
        }
        other => panic!("expected UploadFailed, got {:?}", other.map(|_| ())),
    }

    // every task is attempted
    assert_eq!(progress.len(), 4);
    assert_eq!(progress.iter().filter(|p| p.error.is_some()).count(), 1);
    let state = backend.state();
    assert_eq!(state.presigned_keys.len(), 4);
    assert_eq!(state.uploads.len(), 3);
}

#[tokio::test]
async fn test_unresolved_placeholder_skips_only_its_file() {
    let dir = tempfile::tempdir().unwrap();
    let (layout, manifest) = setup(dir.path()).await;
    let backend = MockBackend::start(BackendState::default()).await;
    let uploader: Arc<dyn ObjectUploader> = Arc::new(backend.deployment_client());

    let mut req = request(Uuid::new_v4(), ServiceSelection::Only(vec!["iam".to_string()]));
    req.env_vars = Arc::new(EnvVars::new());

    let result = upload_services(uploader, &layout, &manifest, req, |_| {}).await;
    match result {
        Err(CliError::UploadFailed(failures)) => {
            assert_eq!(failures.len(), 1);
            assert!(failures[0].contains("IAM.CLIENT_NAME"));
        }
        other => panic!("expected UploadFailed, got {:?}", other.map(|_| ())),
    }
    assert_eq!(backend.state().uploads.len(), 2);
}

#[tokio::test]
async fn test_example_only_service_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let (layout, manifest) = setup(dir.path()).await;
    std::fs::remove_file(dir.path().join("lifecycle/baqs/baqs.json")).unwrap();
    write(dir.path(), "lifecycle/baqs/baqs.example.json", "{}");

    let backend = MockBackend::start(BackendState::default()).await;
    let uploader: Arc<dyn ObjectUploader> = Arc::new(backend.deployment_client());
    let outcome = upload_services(
        uploader,
        &layout,
        &manifest,
        request(Uuid::new_v4(), ServiceSelection::All),
        |_| {},
    )
    .await
    .unwrap();

    let UploadOutcome::Uploaded(summary) = outcome else {
        panic!("expected uploads");
    };
    assert_eq!(summary.skipped, vec!["baqs"]);
    assert_eq!(summary.included, vec!["iam"]);
    assert!(!summary.services.contains_key("baqs"));
}

#[tokio::test]
async fn test_empty_selection_uploads_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (layout, manifest) = setup(dir.path()).await;
    let backend = MockBackend::start(BackendState::default()).await;
    let uploader: Arc<dyn ObjectUploader> = Arc::new(backend.deployment_client());

    let outcome = upload_services(
        uploader,
        &layout,
        &manifest,
        request(Uuid::new_v4(), ServiceSelection::Only(Vec::new())),
        |_| {},
    )
    .await
    .unwrap();

    assert!(matches!(outcome, UploadOutcome::NothingSelected));
    assert!(backend.state().presigned_keys.is_empty());
}
