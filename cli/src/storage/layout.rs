//! Filesystem layout of the project and of the user's home state

use std::path::{Path, PathBuf};

use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::storage::settings::Environment;

/// Manifest file name inside the lifecycle folder
pub const MANIFEST_FILE: &str = "lifecycle_config.yaml";

/// Layout of a lifecycle project rooted at the working directory
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The `lifecycle/` folder
    pub fn lifecycle_dir(&self) -> Dir {
        Dir::new(self.root.join("lifecycle"))
    }

    pub fn manifest_file(&self) -> File {
        self.lifecycle_dir().file(MANIFEST_FILE)
    }

    pub fn envs_dir(&self) -> Dir {
        self.lifecycle_dir().subdir("lifecycle_envs")
    }

    /// Placeholder values for one environment
    pub fn env_file(&self, env: Environment) -> File {
        self.envs_dir().file(&format!("{}.env", env.as_str()))
    }

    /// Resolve a service folder from the manifest against the project root
    pub fn service_dir(&self, folder: &str) -> Dir {
        let path = Path::new(folder);
        if path.is_absolute() {
            Dir::new(path)
        } else {
            Dir::new(self.root.join(path))
        }
    }
}

/// Per-user state under `~/.cx-cli`
#[derive(Debug, Clone)]
pub struct HomeLayout {
    pub base_dir: PathBuf,
}

impl HomeLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn credentials_file(&self) -> File {
        File::new(self.base_dir.join("credentials.json"))
    }

    pub fn settings_file(&self) -> File {
        File::new(self.base_dir.join("config.json"))
    }

    pub fn logs_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("logs"))
    }
}

impl Default for HomeLayout {
    fn default() -> Self {
        let home = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(home.join(".cx-cli"))
    }
}
