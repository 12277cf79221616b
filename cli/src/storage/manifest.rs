//! Project manifest (`lifecycle/lifecycle_config.yaml`)

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::CliError;
use crate::filesys::file::File;
use crate::storage::layout::MANIFEST_FILE;

/// The lifecycle manifest
///
/// Unknown top-level keys are preserved when the file is saved again.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LifecycleConfig {
    #[serde(default)]
    pub application: ApplicationMetadata,

    /// Service name to folder, relative to the project root
    #[serde(default)]
    pub core_services: BTreeMap<String, String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Application section of the manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_uid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_developer_email: Option<String>,

    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub app_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Versions written as bare YAML numbers (`1.0`) are kept as text
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_yaml::Value::Null) => None,
        Some(serde_yaml::Value::String(s)) => Some(s),
        Some(serde_yaml::Value::Number(n)) => Some(n.to_string()),
        Some(serde_yaml::Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(serde_yaml::to_string(&other).unwrap_or_default().trim().to_string()),
    })
}

impl ApplicationMetadata {
    /// Registered application id, if the application was registered
    pub fn app_id(&self) -> Option<&str> {
        self.application_uid
            .as_deref()
            .or(self.id.as_deref())
            .filter(|id| !id.trim().is_empty())
    }

    /// Display name, required for registration
    pub fn require_display_name(&self) -> Result<&str, CliError> {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                CliError::ConfigError(format!(
                    "application.display_name is missing in {}",
                    MANIFEST_FILE
                ))
            })
    }
}

impl LifecycleConfig {
    /// Load the manifest
    pub async fn load(file: &File) -> Result<Self, CliError> {
        if !file.exists().await {
            return Err(CliError::ConfigError(format!(
                "Config file not found: {}",
                file.path().display()
            )));
        }
        file.read_yaml().await.map_err(|e| {
            CliError::ConfigError(format!("Invalid {}: {}", MANIFEST_FILE, e))
        })
    }

    /// Save the manifest
    pub async fn save(&self, file: &File) -> Result<(), CliError> {
        file.write_yaml(self).await
    }

    /// Registered application id or a configuration error
    pub fn require_app_id(&self) -> Result<String, CliError> {
        self.application
            .app_id()
            .map(str::to_string)
            .ok_or_else(|| {
                CliError::ConfigError(
                    "Application ID not found in config. Run 'cx-cli register' first.".to_string(),
                )
            })
    }

    /// Application version as sent with deployment payloads
    pub fn app_version(&self) -> String {
        self.application.app_version.clone().unwrap_or_default()
    }

    pub fn service_names(&self) -> Vec<String> {
        self.core_services.keys().cloned().collect()
    }
}
