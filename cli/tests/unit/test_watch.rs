//! Status stream watching over HTTP

use lifecycle_cli::deploy::watch::{watch_run, WatchOutcome};
use serde_json::json;

use crate::support::{sse_body, BackendState, MockBackend};

async fn backend_with(frames: &[serde_json::Value]) -> MockBackend {
    MockBackend::start(BackendState {
        sse_body: sse_body(frames),
        ..Default::default()
    })
    .await
}

fn expected(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[tokio::test]
async fn test_partial_when_server_closes() {
    let backend = backend_with(&[
        json!({"services": {
            "iam": {"deployment_status": "In Progress"},
            "baqs": {"deployment_status": "In Progress"}
        }}),
        json!({"services": {
            "iam": {"deployment_status": "Done"},
            "baqs": {"deployment_status": "In Progress"}
        }}),
        json!({"info": "Connection closed"}),
    ])
    .await;

    let mut updates = Vec::new();
    let outcome = watch_run(
        &backend.deployment_client(),
        "run-1",
        &expected(&["iam", "baqs"]),
        std::future::pending::<()>(),
        |name, status| updates.push(format!("{}={}", name, status.deployment_status)),
    )
    .await
    .unwrap();

    match &outcome {
        WatchOutcome::Partial(services) => {
            assert_eq!(services["iam"].deployment_status, "Done");
            assert_eq!(services["baqs"].deployment_status, "In Progress");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(outcome.exit_code(), 3);
    assert_eq!(
        updates,
        vec!["baqs=In Progress", "iam=In Progress", "iam=Done"]
    );
}

#[tokio::test]
async fn test_completed_run() {
    let backend = backend_with(&[
        json!({"services": {"iam": {"deployment_status": "Pending"}}}),
        json!({"services": {
            "iam": {"deployment_status": "Done"},
            "baqs": {"deployment_status": "Succeeded"}
        }}),
    ])
    .await;

    let outcome = watch_run(
        &backend.deployment_client(),
        "run-2",
        &expected(&["iam", "baqs"]),
        std::future::pending::<()>(),
        |_, _| {},
    )
    .await
    .unwrap();

    assert!(matches!(outcome, WatchOutcome::Completed(_)));
    assert_eq!(outcome.exit_code(), 0);
}

#[tokio::test]
async fn test_failed_service_completes_with_failure() {
    let backend = backend_with(&[json!({"services": {
        "iam": {"deployment_status": "Done"},
        "baqs": {"deployment_status": "Validation Failed"}
    }})])
    .await;

    let outcome = watch_run(
        &backend.deployment_client(),
        "run-3",
        &expected(&["iam", "baqs"]),
        std::future::pending::<()>(),
        |_, _| {},
    )
    .await
    .unwrap();

    assert!(matches!(outcome, WatchOutcome::Completed(_)));
    assert_eq!(outcome.exit_code(), 1);
}

#[tokio::test]
async fn test_unknown_run_is_not_found() {
    let backend = backend_with(&[]).await;

    let outcome = watch_run(
        &backend.deployment_client(),
        "missing",
        &expected(&["iam"]),
        std::future::pending::<()>(),
        |_, _| {},
    )
    .await
    .unwrap();

    assert_eq!(outcome, WatchOutcome::NotFound);
}

#[tokio::test]
async fn test_empty_expectation_adopts_first_snapshot() {
    let backend = backend_with(&[
        json!({"services": {
            "iam": {"deployment_status": "Done"},
            "baqs": {"deployment_status": "Pending"}
        }}),
        json!({"services": {
            "iam": {"deployment_status": "Done"},
            "baqs": {"deployment_status": "Done"},
            "late": {"deployment_status": "Pending"}
        }}),
    ])
    .await;

    let outcome = watch_run(
        &backend.deployment_client(),
        "run-4",
        &[],
        std::future::pending::<()>(),
        |_, _| {},
    )
    .await
    .unwrap();

    match outcome {
        WatchOutcome::Completed(services) => assert_eq!(services.len(), 3),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_stream_end_without_completion_is_closed() {
    let backend = backend_with(&[json!({"services": {"iam": {"deployment_status": "Pending"}}})])
        .await;

    let outcome = watch_run(
        &backend.deployment_client(),
        "run-5",
        &expected(&["iam"]),
        std::future::pending::<()>(),
        |_, _| {},
    )
    .await
    .unwrap();

    assert_eq!(outcome, WatchOutcome::Closed);
}

#[tokio::test]
async fn test_cancel_stops_watching() {
    let backend = backend_with(&[]).await;

    let outcome = watch_run(
        &backend.deployment_client(),
        "run-6",
        &expected(&["iam"]),
        std::future::ready(()),
        |_, _| {},
    )
    .await
    .unwrap();

    assert_eq!(outcome, WatchOutcome::Cancelled);
}
