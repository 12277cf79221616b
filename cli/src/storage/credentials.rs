//! Service account credentials file
//!
//! The file is user supplied and never written by the CLI. It must hold a
//! `serviceAccounts` object mapping environment names to an opaque secret,
//! which is forwarded verbatim in the `X-ServiceCredentials` header.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use secrecy::SecretString;
use tokio::fs;
use tracing::{debug, info};

use crate::errors::CliError;
use crate::storage::settings::Environment;

const SERVICE_ACCOUNTS_KEY: &str = "serviceAccounts";

/// Validated credentials file
#[derive(Debug)]
pub struct Credentials {
    path: PathBuf,
    service_accounts: BTreeMap<String, SecretString>,
}

impl Credentials {
    /// Load and validate the credentials file at `path`
    pub async fn load(path: &Path) -> Result<Self, CliError> {
        debug!("Validating credentials file at {}", path.display());
        let is_file = fs::metadata(path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(CliError::CredentialsError(format!(
                "Required credentials file '{}' not found",
                path.display()
            )));
        }

        let contents = fs::read_to_string(path).await?;
        let credentials = Self::parse(path, &contents)?;
        info!("Credentials file {} validated", path.display());
        Ok(credentials)
    }

    /// Validate the contents of a credentials file
    pub fn parse(path: &Path, contents: &str) -> Result<Self, CliError> {
        let document: serde_json::Value = serde_json::from_str(contents).map_err(|e| {
            CliError::CredentialsError(format!("Invalid JSON format in credentials file: {}", e))
        })?;

        let accounts = document
            .as_object()
            .ok_or_else(|| {
                CliError::CredentialsError(
                    "Credentials file must contain a JSON object".to_string(),
                )
            })?
            .get(SERVICE_ACCOUNTS_KEY)
            .ok_or_else(|| {
                CliError::CredentialsError(format!(
                    "Missing required '{}' in credentials file",
                    SERVICE_ACCOUNTS_KEY
                ))
            })?
            .as_object()
            .ok_or_else(|| {
                CliError::CredentialsError(format!(
                    "'{}' must be an object with environment keys",
                    SERVICE_ACCOUNTS_KEY
                ))
            })?;

        let mut service_accounts = BTreeMap::new();
        for (env, secret) in accounts {
            let secret = match secret {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => continue,
                other => other.to_string(),
            };
            service_accounts.insert(env.clone(), SecretString::from(secret));
        }

        Ok(Self {
            path: path.to_path_buf(),
            service_accounts,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Secret for an environment
    pub fn secret_for(&self, env: Environment) -> Result<&SecretString, CliError> {
        env.credential_keys()
            .iter()
            .find_map(|key| self.service_accounts.get(*key))
            .ok_or_else(|| {
                CliError::CredentialsError(format!(
                    "No service account for environment '{}' in {}",
                    env,
                    self.path.display()
                ))
            })
    }
}

/// Resolve the credentials path, appending `credentials.json` to directories
pub async fn resolve_path(explicit: Option<&Path>, default: &Path) -> PathBuf {
    match explicit {
        Some(path) => {
            let is_dir = fs::metadata(path)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            if is_dir {
                path.join("credentials.json")
            } else {
                path.to_path_buf()
            }
        }
        None => default.to_path_buf(),
    }
}

/// Remembers the last validated credentials file
///
/// Requests for the same path reuse the loaded credentials instead of
/// reading and validating the file again.
#[derive(Debug, Default)]
pub struct CredentialCache {
    last: Option<Arc<Credentials>>,
}

impl CredentialCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_load(&mut self, path: &Path) -> Result<Arc<Credentials>, CliError> {
        if let Some(cached) = &self.last {
            if cached.path() == path {
                debug!("Reusing validated credentials from {}", path.display());
                return Ok(Arc::clone(cached));
            }
        }

        let credentials = Arc::new(Credentials::load(path).await?);
        self.last = Some(Arc::clone(&credentials));
        Ok(credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn parse(contents: &str) -> Result<Credentials, CliError> {
        Credentials::parse(Path::new("credentials.json"), contents)
    }

    #[test]
    fn test_string_and_object_secrets() {
        let creds = parse(
            r#"{"serviceAccounts": {"dev": "abc", "prod": {"clientId": "x", "secret": "y"}}}"#,
        )
        .unwrap();

        assert_eq!(creds.secret_for(Environment::Dev).unwrap().expose_secret(), "abc");
        let prod = creds.secret_for(Environment::Prod).unwrap().expose_secret();
        assert!(prod.contains("\"clientId\":\"x\""));
    }

    #[test]
    fn test_sandbox_accepts_short_key() {
        let creds = parse(r#"{"serviceAccounts": {"sbx": "s"}}"#).unwrap();
        assert_eq!(
            creds.secret_for(Environment::Sandbox).unwrap().expose_secret(),
            "s"
        );
    }

    #[test]
    fn test_invalid_structures() {
        assert!(matches!(parse("not json"), Err(CliError::CredentialsError(_))));
        assert!(matches!(parse(r#"{"accounts": {}}"#), Err(CliError::CredentialsError(_))));
        assert!(matches!(
            parse(r#"{"serviceAccounts": ["dev"]}"#),
            Err(CliError::CredentialsError(_))
        ));
    }

    #[test]
    fn test_missing_environment() {
        let creds = parse(r#"{"serviceAccounts": {"dev": "abc"}}"#).unwrap();
        let err = creds.secret_for(Environment::Nprd).unwrap_err();
        assert!(err.to_string().contains("nprd"));
    }
}
