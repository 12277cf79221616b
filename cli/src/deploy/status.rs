//! Classification and display of per-service deployment statuses

use colored::{Color, Colorize};
use lifecycle_api::models::{ServiceStatus, StatusMap};
use serde_json::Value;

const SUCCESS_MARKERS: [&str; 4] = ["Done", "Succeeded", "Completed", "Passed"];
const FAILURE_MARKERS: [&str; 4] = ["Failed", "REJECTED", "ERROR", "Cancel"];
const ACTIVE_MARKERS: [&str; 4] = ["Progress", "Pending", "RECEIVED", "Validating"];

/// Lifecycle of one service within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Pending,
    Succeeded,
    Failed,
}

impl ServiceState {
    /// Classify a raw status string
    ///
    /// Failure markers are checked first, so `"Validation Failed"` style
    /// values never count as success.
    pub fn classify(status: &str) -> Self {
        if FAILURE_MARKERS.iter().any(|m| status.contains(m)) {
            ServiceState::Failed
        } else if SUCCESS_MARKERS.iter().any(|m| status.contains(m)) {
            ServiceState::Succeeded
        } else {
            ServiceState::Pending
        }
    }

    pub fn is_terminal(self) -> bool {
        self != ServiceState::Pending
    }
}

/// A decoded status stream frame
#[derive(Debug, Clone, PartialEq)]
pub enum StatusFrame {
    /// Full snapshot of every service in the run
    Services(StatusMap),
    /// Informational message, used by the server to announce closing
    Info(String),
    Error(String),
    /// Valid JSON without a known key
    Unrecognized(Value),
}

impl StatusFrame {
    pub fn parse(data: &str) -> Result<Self, serde_json::Error> {
        let mut value: Value = serde_json::from_str(data)?;

        if let Some(services) = value.get_mut("services") {
            let map: StatusMap = serde_json::from_value(services.take())?;
            return Ok(StatusFrame::Services(map));
        }
        if let Some(info) = value.get("info") {
            return Ok(StatusFrame::Info(text_of(info)));
        }
        if let Some(error) = value.get("error") {
            return Ok(StatusFrame::Error(text_of(error)));
        }
        Ok(StatusFrame::Unrecognized(value))
    }

    /// Whether an info frame announces the end of the stream
    pub fn is_idle_marker(&self) -> bool {
        matches!(self, StatusFrame::Info(info) if info.to_lowercase().contains("closed"))
    }

    /// Whether an error frame reports an unknown run
    pub fn is_not_found(&self) -> bool {
        matches!(self, StatusFrame::Error(error) if error.to_lowercase().contains("not found"))
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Display color of a raw status
pub fn status_color(status: &str) -> Color {
    if status.is_empty() {
        Color::BrightCyan
    } else if SUCCESS_MARKERS[..3].iter().any(|m| status.contains(m)) {
        Color::BrightGreen
    } else if FAILURE_MARKERS[..3].iter().any(|m| status.contains(m)) {
        Color::BrightRed
    } else if ACTIVE_MARKERS.iter().any(|m| status.contains(m)) {
        Color::BrightYellow
    } else if status.contains("Cancel") {
        Color::BrightMagenta
    } else {
        Color::BrightCyan
    }
}

/// Plain one-line description of a service status
pub fn describe(service: &str, status: &ServiceStatus) -> String {
    match status.reason() {
        Some(reason) => format!(" {}: {} - {}", service, status.deployment_status, reason),
        None => format!(" {}: {}", service, status.deployment_status),
    }
}

/// Colored line for terminal output
pub fn render(service: &str, status: &ServiceStatus) -> String {
    describe(service, status)
        .color(status_color(&status.deployment_status))
        .to_string()
}

/// Whether every service in a snapshot succeeded
pub fn all_succeeded(services: &StatusMap) -> bool {
    services
        .values()
        .all(|s| ServiceState::classify(&s.deployment_status) == ServiceState::Succeeded)
}
