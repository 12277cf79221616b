//! IAM and application registry models

use serde::{Deserialize, Serialize};

/// Body of `POST /cxp-iam/api/v1/applications`
///
/// Sending `id` makes the call update the existing application in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationRequest {
    pub name: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Application record as returned by IAM
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IamApplication {
    pub id: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub git: Option<String>,
}

/// Response of `GET /cxp-iam/api/v1/users/me`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "accountId", alias = "account_id", default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserProfile {
    /// Account identifier, preferring the explicit account field
    pub fn account(&self) -> Option<&str> {
        self.account_id.as_deref().or(self.id.as_deref())
    }
}

/// Body of `POST /lifecycle/api/v1/deployment/applications`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudioApplicationRequest {
    pub application_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub name: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_developer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub account_id: String,
}

/// Role granted to an application's service account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub id: String,
    pub name: String,
}

/// Application row from `GET /cli/applications`
///
/// Key spellings differ between backend versions, so fields are looked up
/// through a list of candidate keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationSummary(pub serde_json::Map<String, serde_json::Value>);

impl ApplicationSummary {
    fn first_of(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|k| self.0.get(*k))
            .find_map(|v| match v {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) if s.is_empty() => None,
                serde_json::Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
    }

    pub fn name(&self) -> Option<String> {
        self.first_of(&["name", "displayName", "display_name"])
    }

    pub fn id(&self) -> Option<String> {
        self.first_of(&["id", "application_uid", "applicationId"])
    }

    pub fn status(&self) -> Option<String> {
        self.first_of(&["activeStatus", "status"])
    }

    pub fn version(&self) -> Option<String> {
        self.first_of(&["activeVersion", "version"])
    }

    pub fn lead_developer(&self) -> Option<String> {
        self.first_of(&["leadDeveloper", "leadDeveloperEmail"])
    }

    pub fn last_deployment_time(&self) -> Option<String> {
        self.first_of(&["lastDeploymentTime"])
    }
}

/// Paged list of applications
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationList {
    #[serde(default)]
    pub items: Vec<ApplicationSummary>,
    #[serde(default)]
    pub total: Option<usize>,
}
