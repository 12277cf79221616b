//! Settings file management

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::CliError;
use crate::filesys::file::File;
use crate::logs::LogLevel;
use crate::utils::CooldownOptions;

/// Env var overriding the schema registry host
pub const BASE_URL_ENV: &str = "CXP_LIFECYCLE_BASE_URL";

/// Env var selecting the default environment
pub const ENVIRONMENT_ENV: &str = "ENV";

/// Target platform environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Environment {
    Sandbox,
    #[default]
    Dev,
    Nprd,
    Prod,
}

impl Environment {
    pub const ALL: [Environment; 4] = [
        Environment::Sandbox,
        Environment::Dev,
        Environment::Nprd,
        Environment::Prod,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Sandbox => "sandbox",
            Environment::Dev => "dev",
            Environment::Nprd => "nprd",
            Environment::Prod => "prod",
        }
    }

    /// Platform host used when settings carry no override
    pub fn default_host(&self) -> &'static str {
        match self {
            Environment::Sandbox => "https://sbx.cxp.cisco.com",
            Environment::Dev => "https://dev.cxp.cisco.com",
            Environment::Nprd => "https://nprd.cxp.cisco.com",
            Environment::Prod => "https://prod.cxp.cisco.com",
        }
    }

    /// Keys under which a credentials file may store this environment
    pub fn credential_keys(&self) -> &'static [&'static str] {
        match self {
            Environment::Sandbox => &["sandbox", "sbx"],
            Environment::Dev => &["dev"],
            Environment::Nprd => &["nprd"],
            Environment::Prod => &["prod"],
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sandbox" | "sbx" => Ok(Environment::Sandbox),
            "dev" => Ok(Environment::Dev),
            "nprd" => Ok(Environment::Nprd),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!(
                "Invalid environment: {}. Valid environments are: {}",
                s,
                Environment::ALL
                    .iter()
                    .map(|e| e.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

impl Serialize for Environment {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Environment {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Role granted to newly registered applications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformRole {
    /// Platform service the role belongs to
    pub service: String,
    pub role_id: String,
    pub role_name: String,
}

/// CLI settings read from `~/.cx-cli/config.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Also write logs to `~/.cx-cli/logs`
    #[serde(default)]
    pub log_to_file: bool,

    /// Environment used when none is given on the command line
    #[serde(default)]
    pub default_env: Environment,

    /// Per-environment host overrides, keyed by environment name
    #[serde(default)]
    pub hosts: BTreeMap<String, String>,

    /// Host of the schema registry backend, defaults to the environment host
    #[serde(default)]
    pub backend_host: Option<String>,

    /// Concurrent uploads during deploy and validate
    #[serde(default = "default_upload_concurrency")]
    pub upload_concurrency: usize,

    /// Timeout of regular API calls in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Retry settings for registration calls
    #[serde(default)]
    pub retry: RetrySettings,

    /// Roles assigned to applications after registration, per environment
    #[serde(default)]
    pub platform_roles: BTreeMap<String, Vec<PlatformRole>>,
}

fn default_upload_concurrency() -> usize {
    4
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            log_to_file: false,
            default_env: Environment::default(),
            hosts: BTreeMap::new(),
            backend_host: None,
            upload_concurrency: default_upload_concurrency(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            retry: RetrySettings::default(),
            platform_roles: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load settings, falling back to defaults when the file is absent
    pub async fn load(file: &File) -> Result<Self, CliError> {
        if !file.exists().await {
            debug!("No settings file at {}, using defaults", file.path().display());
            return Ok(Self::default());
        }
        file.read_json().await.map_err(|e| {
            CliError::ConfigError(format!(
                "Invalid settings file {}: {}",
                file.path().display(),
                e
            ))
        })
    }

    /// Apply environment variable overrides
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(BASE_URL_ENV).filter(|h| !h.trim().is_empty()) {
            self.backend_host = Some(host);
        }
        if let Some(env) = lookup(ENVIRONMENT_ENV).and_then(|e| e.parse().ok()) {
            self.default_env = env;
        }
    }

    /// Platform host for an environment
    pub fn host(&self, env: Environment) -> String {
        self.hosts
            .get(env.as_str())
            .map(|h| h.trim_end_matches('/').to_string())
            .unwrap_or_else(|| env.default_host().to_string())
    }

    /// Deployment orchestrator base URL
    pub fn deployment_base_url(&self, env: Environment) -> String {
        format!("{}/lifecycle/api/v1/deployment", self.host(env))
    }

    /// Schema registry base URL
    pub fn backend_base_url(&self, env: Environment) -> String {
        let host = self
            .backend_host
            .as_deref()
            .map(|h| h.trim_end_matches('/').to_string())
            .unwrap_or_else(|| self.host(env));
        format!("{}/lifecycle/api/v1/backend", host)
    }

    /// Messaging service base URL
    pub fn messaging_base_url(&self, env: Environment) -> String {
        format!("{}/messaging/api/v1", self.host(env))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Roles to assign after registering in `env`
    pub fn roles_for(&self, env: Environment) -> &[PlatformRole] {
        self.platform_roles
            .get(env.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Retry settings for calls made with a retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    10_000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetrySettings {
    pub fn cooldown(&self) -> CooldownOptions {
        CooldownOptions {
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            multiplier: 2.0,
        }
    }
}
