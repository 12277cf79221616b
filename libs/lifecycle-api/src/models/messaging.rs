//! Messaging service grant models

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Access role on a topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantRole {
    Producer,
    Consumer,
}

impl GrantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantRole::Producer => "producer",
            GrantRole::Consumer => "consumer",
        }
    }
}

impl fmt::Display for GrantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrantRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "producer" => Ok(GrantRole::Producer),
            "consumer" => Ok(GrantRole::Consumer),
            _ => Err(format!("Invalid role: {} (expected producer or consumer)", s)),
        }
    }
}

/// Body of `POST /topics/{topic}/grants`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGrantRequest {
    pub app_id: String,
    pub role: GrantRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer_group: Option<String>,
}

/// An existing grant on a topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub consumer_group: Option<String>,
}

/// Response of `GET /topics/{topic}/grants`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GrantList {
    #[serde(default)]
    pub grants: Vec<Grant>,
}
