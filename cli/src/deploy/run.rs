//! Deployment and validation runs
//!
//! A run uploads the selected service bundles under a fresh run id and then
//! asks the orchestrator to deploy them (`/msk/deploy`) or to validate them
//! without deploying (`/dry-run`). Deploys are preceded by checks against
//! IAM and the developer studio.

use std::fmt;
use std::sync::Arc;

use lifecycle_api::models::{DeploymentPayload, ValidationErrorResponse};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::deploy::upload::{
    upload_services, ObjectUploader, ServiceSelection, UploadOutcome, UploadProgress,
    UploadRequest, UploadSummary,
};
use crate::errors::CliError;
use crate::http::client::HttpClient;
use crate::http::deployments::ApplicationCheck;
use crate::http::retry::RetryPolicy;
use crate::inject::EnvVars;
use crate::register::flow::create_studio_record;
use crate::storage::layout::ProjectLayout;
use crate::storage::manifest::{ApplicationMetadata, LifecycleConfig};
use crate::utils::generate_run_id;

/// Server keys of the studio record and the manifest fields they mirror
const METADATA_MAPPING: [(&str, &str); 3] = [
    ("description", "description"),
    ("leadDeveloper", "lead_developer_email"),
    ("gitRepository", "github_url"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Deploy,
    DryRun,
}

impl RunKind {
    pub fn label(&self) -> &'static str {
        match self {
            RunKind::Deploy => "deployment",
            RunKind::DryRun => "validation",
        }
    }
}

/// A manifest field that differs from the studio record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataChange {
    pub field: String,
    pub server: String,
    pub local: String,
}

impl fmt::Display for MetadataChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: '{}' -> '{}'", self.field, self.server, self.local)
    }
}

/// Result of the deploy checks
#[derive(Debug, Clone, Default)]
pub struct Preflight {
    /// Fields the deploy will update on the studio record
    pub changes: Vec<MetadataChange>,
    /// Set when the studio record was missing and got created
    pub studio_created: bool,
}

/// Backend clients used by a run
#[derive(Debug, Clone)]
pub struct RunClients {
    /// IAM, rooted at the environment host
    pub iam: HttpClient,
    /// Deployment orchestrator
    pub deployment: HttpClient,
}

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub kind: RunKind,
    pub selection: ServiceSelection,
    pub env_vars: Arc<EnvVars>,
    pub concurrency: usize,
}

/// A triggered run
#[derive(Debug, Clone)]
pub struct StartedRun {
    pub run_id: Uuid,
    pub kind: RunKind,
    pub app_id: String,
    pub summary: UploadSummary,
    pub preflight: Option<Preflight>,
}

impl StartedRun {
    pub fn services(&self) -> &[String] {
        &self.summary.included
    }
}

/// Deployment payload for a run
pub fn build_payload(
    manifest: &LifecycleConfig,
    run_id: Uuid,
    app_id: &str,
    summary: &UploadSummary,
) -> DeploymentPayload {
    let application = &manifest.application;
    DeploymentPayload {
        deployment_id: run_id,
        services: summary.services.clone(),
        app_id: app_id.to_string(),
        app_version: manifest.app_version(),
        description: application.description.clone(),
        lead_developer_email: application.lead_developer_email.clone(),
        github_url: application.github_url.clone(),
        app_name: application.display_name.clone(),
    }
}

fn local_field<'a>(metadata: &'a ApplicationMetadata, field: &str) -> Option<&'a str> {
    match field {
        "description" => metadata.description.as_deref(),
        "lead_developer_email" => metadata.lead_developer_email.as_deref(),
        "github_url" => metadata.github_url.as_deref(),
        _ => None,
    }
}

/// Manifest fields whose value differs from the studio record
///
/// Only fields present on both sides are compared.
pub fn metadata_diff(metadata: &ApplicationMetadata, server: &Value) -> Vec<MetadataChange> {
    METADATA_MAPPING
        .iter()
        .filter_map(|(server_key, local_key)| {
            let local = local_field(metadata, local_key)?;
            let server_value = match server.get(*server_key)? {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (server_value != local).then(|| MetadataChange {
                field: local_key.to_string(),
                server: server_value,
                local: local.to_string(),
            })
        })
        .collect()
}

fn rejection_message(response: &ValidationErrorResponse) -> String {
    let detail = response
        .detail
        .clone()
        .unwrap_or_else(|| "No detail provided.".to_string());
    if response.errors.is_empty() {
        return format!("Error validating application in Developer Studio: {}", detail);
    }
    let errors: Vec<String> = response
        .errors
        .iter()
        .map(|e| match e {
            Value::String(s) => format!("  • {}", s),
            other => format!("  • {}", other),
        })
        .collect();
    format!(
        "Error validating application in Developer Studio: {}\nValidation errors in lifecycle_config.yaml:\n{}",
        detail,
        errors.join("\n")
    )
}

/// Refuse to start while another run of the application is active
pub async fn ensure_idle(deployment: &HttpClient, app_id: &str) -> Result<(), CliError> {
    if deployment.deployment_in_progress(app_id).await? {
        return Err(CliError::DeploymentInProgress(app_id.to_string()));
    }
    Ok(())
}

/// Checks run before a deploy
///
/// The application must exist in IAM. The studio record is validated
/// against the run payload; a missing record is created on the fly.
pub async fn preflight(
    clients: &RunClients,
    manifest: &LifecycleConfig,
    app_id: &str,
    payload: &DeploymentPayload,
    policy: &RetryPolicy,
) -> Result<Preflight, CliError> {
    let application = clients
        .iam
        .get_iam_application(app_id)
        .await?
        .ok_or_else(|| {
            CliError::NotFound(format!(
                "Application with ID {} not found in IAM. Please register the application first.",
                app_id
            ))
        })?;

    let mut result = Preflight::default();
    match clients.deployment.validate_application(app_id, payload).await? {
        ApplicationCheck::Exists(server) => {
            result.changes = metadata_diff(&manifest.application, &server);
            for change in &result.changes {
                info!("Metadata change: {}", change);
            }
        }
        ApplicationCheck::Missing => {
            info!("Application {} missing in developer studio, creating it", app_id);
            create_studio_record(&clients.iam, &clients.deployment, &application, policy)
                .await
                .map_err(|failure| {
                    CliError::ValidationError(format!(
                        "Failed to create application in Developer Studio: {}",
                        failure.error
                    ))
                })?;
            result.studio_created = true;
        }
        ApplicationCheck::Rejected { status, response } => {
            warn!("Application {} rejected with {}", app_id, status);
            return Err(CliError::ValidationError(rejection_message(&response)));
        }
    }

    ensure_idle(&clients.deployment, app_id).await?;
    Ok(result)
}

/// Upload the selected services and trigger a run
///
/// Returns `None` when no service was selected.
pub async fn start_run<F>(
    clients: &RunClients,
    project: &ProjectLayout,
    manifest: &LifecycleConfig,
    request: RunRequest,
    policy: &RetryPolicy,
    on_progress: F,
) -> Result<Option<StartedRun>, CliError>
where
    F: FnMut(&UploadProgress),
{
    let app_id = manifest.require_app_id()?;
    let run_id = generate_run_id();
    let empty = UploadSummary::default();

    let preflight_result = match request.kind {
        RunKind::Deploy => {
            let draft = build_payload(manifest, run_id, &app_id, &empty);
            Some(preflight(clients, manifest, &app_id, &draft, policy).await?)
        }
        RunKind::DryRun => {
            ensure_idle(&clients.deployment, &app_id).await?;
            None
        }
    };

    info!("Starting {} {} for {}", request.kind.label(), run_id, app_id);
    let uploader: Arc<dyn ObjectUploader> = Arc::new(clients.deployment.clone());
    let outcome = upload_services(
        uploader,
        project,
        manifest,
        UploadRequest {
            run_id,
            app_id: app_id.clone(),
            selection: request.selection,
            env_vars: request.env_vars,
            concurrency: request.concurrency,
        },
        on_progress,
    )
    .await?;

    let summary = match outcome {
        UploadOutcome::NothingSelected => return Ok(None),
        UploadOutcome::Uploaded(summary) => summary,
    };

    let payload = build_payload(manifest, run_id, &app_id, &summary);
    match request.kind {
        RunKind::Deploy => clients.deployment.trigger_deploy(&payload).await?,
        RunKind::DryRun => clients.deployment.trigger_dry_run(&payload).await?,
    }
    info!("{} {} initiated", request.kind.label(), run_id);

    Ok(Some(StartedRun {
        run_id,
        kind: request.kind,
        app_id,
        summary,
        preflight: preflight_result,
    }))
}
