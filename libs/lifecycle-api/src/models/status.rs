//! Deployment status models

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Status of every service in a run, keyed by service name
pub type StatusMap = BTreeMap<String, ServiceStatus>;

/// Per-service status reported by the orchestrator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// Empty when the orchestrator sent no status or `null`
    #[serde(default, deserialize_with = "null_as_empty")]
    pub deployment_status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<FailureReason>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration_file_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_of_topics: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_statuses: Option<BTreeMap<String, serde_json::Value>>,
}

impl ServiceStatus {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            deployment_status: status.into(),
            ..Default::default()
        }
    }

    /// Failure reason, ignoring blank values
    pub fn reason(&self) -> Option<&FailureReason> {
        self.failure_reason.as_ref().filter(|r| !r.is_blank())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Failure reason as sent by the various backend versions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FailureReason {
    Text(String),
    List(Vec<String>),
    Combined { combined: String },
    Other(serde_json::Value),
}

impl FailureReason {
    pub fn is_blank(&self) -> bool {
        match self {
            FailureReason::Text(s) => s.trim().is_empty(),
            FailureReason::List(items) => items.iter().all(|s| s.trim().is_empty()),
            FailureReason::Combined { combined } => combined.trim().is_empty(),
            FailureReason::Other(v) => v.is_null(),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Text(s) => write!(f, "{}", s),
            FailureReason::List(items) => write!(f, "{}", items.join("; ")),
            FailureReason::Combined { combined } => write!(f, "{}", combined),
            FailureReason::Other(v) => write!(f, "{}", v),
        }
    }
}

/// Single-shot status response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    #[serde(default)]
    pub services: StatusMap,
}
