//! Invocation options shared by every command

use std::path::PathBuf;

use crate::logs::LogLevel;
use crate::storage::layout::HomeLayout;
use crate::storage::settings::Environment;

/// Options resolved from global command-line flags
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Target environment, the configured default when unset
    pub env: Option<Environment>,

    /// Credentials file or directory, `~/.cx-cli/credentials.json` when unset
    pub creds_path: Option<PathBuf>,

    /// Project root holding the `lifecycle/` folder
    pub project_dir: PathBuf,

    /// Per-user state directory
    pub home: HomeLayout,

    /// Log level override
    pub log_level: Option<LogLevel>,

    /// JSON log lines on stderr
    pub log_json: bool,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            env: None,
            creds_path: None,
            project_dir: PathBuf::from("."),
            home: HomeLayout::default(),
            log_level: None,
            log_json: false,
        }
    }
}
