//! Deployment orchestrator models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::status::ServiceStatus;

/// Per-service entry of a deployment payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePayload {
    /// Object-storage key prefix holding the service bundle
    pub configuration_file_path: String,
}

/// Body of `/msk/deploy`, `/dry-run` and `/deployments/validate/{appId}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentPayload {
    pub deployment_id: Uuid,
    pub services: BTreeMap<String, ServicePayload>,
    pub app_id: String,
    pub app_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_developer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
}

/// Error body returned when the backend rejects an application manifest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidationErrorResponse {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

/// A deployment as listed by the `/cli/deployments` endpoints
///
/// Older backend builds use different key spellings, so the display fields
/// are resolved through the accessor methods.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentRecord {
    #[serde(rename = "deploymentId", alias = "deployment_id", default)]
    pub deployment_id: Option<String>,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(rename = "applicationId", alias = "application_id", default)]
    pub application_id: Option<String>,

    #[serde(alias = "state", default)]
    pub status: Option<String>,

    #[serde(alias = "appVersion", alias = "applicationVersion", default)]
    pub version: Option<String>,

    #[serde(rename = "deployedBy", alias = "deployed_by", alias = "actor", default)]
    pub deployed_by: Option<String>,

    #[serde(rename = "deploymentTime", alias = "deployment_time", default)]
    pub deployment_time: Option<String>,

    #[serde(rename = "createdAt", alias = "created_at", default)]
    pub created_at: Option<String>,

    #[serde(rename = "deploymentCompleteTime", default)]
    pub deployment_complete_time: Option<String>,

    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<String>,

    #[serde(rename = "requestedCoreServices", default)]
    pub requested_core_services: BTreeMap<String, ServiceStatus>,
}

impl DeploymentRecord {
    pub fn display_id(&self) -> Option<&str> {
        self.deployment_id.as_deref().or(self.id.as_deref())
    }

    pub fn started_at(&self) -> Option<&str> {
        self.deployment_time.as_deref().or(self.created_at.as_deref())
    }

    pub fn finished_at(&self) -> Option<&str> {
        self.deployment_complete_time
            .as_deref()
            .or(self.updated_at.as_deref())
    }
}

/// Paged list of deployments
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeploymentList {
    #[serde(default)]
    pub items: Vec<DeploymentRecord>,
    #[serde(default)]
    pub total: Option<usize>,
}
