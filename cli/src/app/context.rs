//! Per-invocation context: settings, environment and backend clients

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::app::options::AppOptions;
use crate::deploy::run::RunClients;
use crate::errors::CliError;
use crate::http::client::{ClientOptions, HttpClient};
use crate::http::retry::RetryPolicy;
use crate::inject::{self, EnvVars};
use crate::logs::LogOptions;
use crate::storage::credentials::{self, CredentialCache, Credentials};
use crate::storage::layout::{HomeLayout, ProjectLayout};
use crate::storage::manifest::LifecycleConfig;
use crate::storage::settings::{Environment, Settings};

/// Everything a command needs to talk to the platform
pub struct AppContext {
    pub options: AppOptions,
    pub settings: Settings,
    pub env: Environment,
    pub project: ProjectLayout,
    pub home: HomeLayout,
    credentials: Mutex<CredentialCache>,
}

impl AppContext {
    /// Build the context from options and the settings file
    pub async fn load(options: AppOptions) -> Result<Self, CliError> {
        let mut settings = Settings::load(&options.home.settings_file()).await?;
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(Self::new(options, settings))
    }

    pub fn new(options: AppOptions, settings: Settings) -> Self {
        let env = options.env.unwrap_or(settings.default_env);
        debug!("Using environment {}", env);
        Self {
            project: ProjectLayout::new(&options.project_dir),
            home: options.home.clone(),
            env,
            settings,
            options,
            credentials: Mutex::new(CredentialCache::new()),
        }
    }

    /// Logging options from settings and flags
    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            log_level: self
                .options
                .log_level
                .clone()
                .unwrap_or_else(|| self.settings.log_level.clone()),
            stderr: true,
            log_dir: self
                .settings
                .log_to_file
                .then(|| self.home.logs_dir().path().to_path_buf()),
            json_format: self.options.log_json,
        }
    }

    /// Validated credentials, loaded once per path
    pub async fn credentials(&self) -> Result<Arc<Credentials>, CliError> {
        let default = self.home.credentials_file();
        let path =
            credentials::resolve_path(self.options.creds_path.as_deref(), default.path()).await;
        self.credentials.lock().await.get_or_load(&path).await
    }

    fn client_options(&self) -> ClientOptions {
        ClientOptions {
            request_timeout: self.settings.request_timeout(),
            connect_timeout: self.settings.connect_timeout(),
        }
    }

    async fn client(&self, base_url: &str) -> Result<HttpClient, CliError> {
        let credentials = self.credentials().await?;
        let secret = credentials.secret_for(self.env)?;
        HttpClient::new(base_url, secret, &self.client_options())
    }

    /// IAM, rooted at the environment host
    pub async fn iam_client(&self) -> Result<HttpClient, CliError> {
        self.client(&self.settings.host(self.env)).await
    }

    pub async fn deployment_client(&self) -> Result<HttpClient, CliError> {
        self.client(&self.settings.deployment_base_url(self.env)).await
    }

    /// Schema registry
    pub async fn backend_client(&self) -> Result<HttpClient, CliError> {
        self.client(&self.settings.backend_base_url(self.env)).await
    }

    pub async fn messaging_client(&self) -> Result<HttpClient, CliError> {
        self.client(&self.settings.messaging_base_url(self.env)).await
    }

    pub async fn run_clients(&self) -> Result<RunClients, CliError> {
        Ok(RunClients {
            iam: self.iam_client().await?,
            deployment: self.deployment_client().await?,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.settings.retry)
    }

    pub async fn load_manifest(&self) -> Result<LifecycleConfig, CliError> {
        LifecycleConfig::load(&self.project.manifest_file()).await
    }

    /// Placeholder values of the selected environment
    pub async fn env_vars(&self) -> Result<Arc<EnvVars>, CliError> {
        let vars = inject::load_env_file(&self.project.env_file(self.env)).await?;
        Ok(Arc::new(vars))
    }
}
