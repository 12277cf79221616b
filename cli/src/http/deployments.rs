//! Deployment orchestrator API client

use lifecycle_api::models::{
    DeploymentPayload, StatusSnapshot, StudioApplicationRequest, ValidationErrorResponse,
};
use reqwest::{Response, StatusCode};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::errors::CliError;
use crate::http::client::{decode, ensure_success, HttpClient};

/// Result of checking an application against the orchestrator
#[derive(Debug)]
pub enum ApplicationCheck {
    /// Known application, with the metadata the server holds
    Exists(serde_json::Value),
    /// The orchestrator has no record of the application
    Missing,
    /// The manifest was rejected
    Rejected {
        status: StatusCode,
        response: ValidationErrorResponse,
    },
}

impl HttpClient {
    /// Check the manifest and application metadata before deploying
    pub async fn validate_application(
        &self,
        app_id: &str,
        payload: &DeploymentPayload,
    ) -> Result<ApplicationCheck, CliError> {
        let path = format!("/deployments/validate/{}", app_id);
        let response = self.post_response(&path, payload).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(ApplicationCheck::Missing);
        }
        if status.is_success() {
            let body: serde_json::Value = decode(response, "POST").await?;
            return Ok(ApplicationCheck::Exists(body));
        }

        let text = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<ValidationErrorResponse>(&text).unwrap_or_else(|_| {
            ValidationErrorResponse {
                detail: Some(text.clone()).filter(|t| !t.is_empty()),
                errors: Vec::new(),
            }
        });
        Ok(ApplicationCheck::Rejected {
            status,
            response: parsed,
        })
    }

    /// Whether a run is already in progress for the application
    ///
    /// A failed check is logged and treated as "not in progress".
    pub async fn deployment_in_progress(&self, app_id: &str) -> Result<bool, CliError> {
        let path = format!("/status/application/{}/inProgress", app_id);
        let response = self.get_response(&path).await?;
        if !response.status().is_success() {
            warn!(
                "In-progress check for {} returned {}; continuing",
                app_id,
                response.status()
            );
            return Ok(false);
        }
        let body: serde_json::Value = decode(response, "GET").await?;
        debug!("In-progress check for {}: {}", app_id, body);
        Ok(is_truthy(&body))
    }

    /// Start a deployment run
    ///
    /// Only the status code matters; the body may be plain text.
    pub async fn trigger_deploy(&self, payload: &DeploymentPayload) -> Result<(), CliError> {
        self.post_accepted("/msk/deploy", payload).await
    }

    /// Start a validation-only run
    pub async fn trigger_dry_run(&self, payload: &DeploymentPayload) -> Result<(), CliError> {
        self.post_accepted("/dry-run", payload).await
    }

    /// Cancel a run during its validation phase
    pub async fn cancel_deployment(&self, deployment_id: &str) -> Result<(), CliError> {
        self.post_accepted("/cancel/", &json!({ "deployment_id": deployment_id }))
            .await
    }

    async fn post_accepted<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), CliError> {
        let response = self.post_response(path, body).await?;
        let response = ensure_success(response, "POST").await?;
        debug!("POST {} accepted with {}", path, response.status());
        Ok(())
    }

    /// Single-shot status of a run
    pub async fn deployment_status(&self, deployment_id: &str) -> Result<StatusSnapshot, CliError> {
        let path = format!("/status/deployment/get/{}", deployment_id);
        self.get(&path).await
    }

    /// Open the server-sent status stream of a run
    pub async fn status_stream(&self, deployment_id: &str) -> Result<Response, CliError> {
        let path = format!("/status/deployment/stream/{}", deployment_id);
        self.get_stream(&path).await
    }

    /// Create the developer studio record of an application
    pub async fn create_studio_application(
        &self,
        request: &StudioApplicationRequest,
    ) -> Result<serde_json::Value, CliError> {
        self.post("/applications", request).await
    }
}

/// JSON truthiness: false, null, 0, "" and empty containers are false
fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(items) => !items.is_empty(),
        serde_json::Value::Object(map) => !map.is_empty(),
    }
}
