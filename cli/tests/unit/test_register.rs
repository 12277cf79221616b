//! Registration with compensation against the mock backend

use axum::http::StatusCode;
use lifecycle_cli::errors::{CliError, RegistrationErrorKind};
use lifecycle_cli::register::flow::{register_application, service_credential};
use lifecycle_cli::storage::manifest::ApplicationMetadata;
use secrecy::ExposeSecret;
use tokio_test::{assert_err, assert_ok};

use crate::support::{client, dead_address, fast_retry, BackendState, MockBackend};

fn metadata() -> ApplicationMetadata {
    ApplicationMetadata {
        display_name: Some("Demo App".to_string()),
        description: Some("Demo".to_string()),
        lead_developer_email: Some("dev@example.com".to_string()),
        app_version: Some("1.0.0".to_string()),
        github_url: Some("https://github.com/org/demo".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_registers_in_iam_and_studio() {
    let backend = MockBackend::start(BackendState::default()).await;

    let registration = assert_ok!(
        register_application(
            &backend.iam_client(),
            &backend.deployment_client(),
            &metadata(),
            &fast_retry(),
        )
        .await
    );

    assert_eq!(registration.application.id, "iam-app-1");
    assert_eq!(registration.account_id, "acct-1");
    assert_eq!(
        service_credential(&registration.application)
            .unwrap()
            .expose_secret(),
        "Y2xpZW50OnMzY3JldA=="
    );

    let state = backend.state();
    assert_eq!(state.iam_created.len(), 1);
    assert_eq!(state.iam_created[0]["name"], "demo-app");
    assert_eq!(state.studio_requests.len(), 1);
    assert_eq!(state.studio_requests[0]["accountId"], "acct-1");
    assert_eq!(state.studio_requests[0]["applicationId"], "iam-app-1");
    assert!(state.iam_deleted.is_empty());
}

#[tokio::test]
async fn test_unreachable_studio_rolls_back_iam() {
    let backend = MockBackend::start(BackendState::default()).await;
    let unreachable = client(&dead_address().await);

    let policy = fast_retry();

    let err = assert_err!(
        register_application(&backend.iam_client(), &unreachable, &metadata(), &policy).await
    );

    match err {
        CliError::Registration(failure) => {
            assert_eq!(failure.kind, RegistrationErrorKind::RetriesExhausted);
            assert_eq!(failure.attempts, policy.max_attempts);
            assert_eq!(failure.attempts, 3);
            assert!(failure.cleanup_error.is_none());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(backend.state().iam_deleted, vec!["iam-app-1"]);
}

#[tokio::test]
async fn test_studio_rejection_is_classified_and_rolled_back() {
    for (status, kind) in [
        (StatusCode::CONFLICT, RegistrationErrorKind::Conflict),
        (StatusCode::BAD_REQUEST, RegistrationErrorKind::InvalidPayload),
        (StatusCode::FORBIDDEN, RegistrationErrorKind::PermissionDenied),
    ] {
        let backend = MockBackend::start(BackendState {
            studio_status: Some(status),
            ..Default::default()
        })
        .await;

        let err = assert_err!(
            register_application(
                &backend.iam_client(),
                &backend.deployment_client(),
                &metadata(),
                &fast_retry(),
            )
            .await
        );

        match err {
            CliError::Registration(failure) => {
                assert_eq!(failure.kind, kind);
                assert_eq!(failure.attempts, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        let state = backend.state();
        // rejections are not retried
        assert_eq!(state.studio_requests.len(), 1);
        assert_eq!(state.iam_deleted, vec!["iam-app-1"]);
    }
}

#[tokio::test]
async fn test_missing_display_name_stops_before_iam() {
    let backend = MockBackend::start(BackendState::default()).await;

    let err = register_application(
        &backend.iam_client(),
        &backend.deployment_client(),
        &ApplicationMetadata::default(),
        &fast_retry(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CliError::ConfigError(_)));
    assert!(backend.state().iam_created.is_empty());
}
