//! Error types for the lifecycle CLI

use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for the lifecycle CLI
#[derive(Error, Debug)]
pub enum CliError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Env file error: {0}")]
    DotenvError(#[from] dotenvy::Error),

    #[error("API error {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Credentials error: {0}")]
    CredentialsError(String),

    #[error("Invalid environment: {0}")]
    InvalidEnvironment(String),

    #[error("Unresolved variables: {}", .0.join(", "))]
    MissingVariables(Vec<String>),

    #[error("No services with files to upload: all selected services only contain .example files")]
    NoUploadableFiles,

    #[error("{} upload(s) failed", .0.len())]
    UploadFailed(Vec<String>),

    #[error("{0}")]
    Registration(RegistrationFailure),

    #[error("A deployment is already in progress for application {0}")]
    DeploymentInProgress(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CliError {
    /// Status code of a failed backend call, if this error came from one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CliError::Api { status, .. } => Some(*status),
            CliError::HttpError(err) => err.status(),
            _ => None,
        }
    }

    /// Process exit status for this error
    ///
    /// Local configuration problems exit with 2, everything else with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::ConfigError(_)
            | CliError::CredentialsError(_)
            | CliError::InvalidEnvironment(_)
            | CliError::MissingVariables(_)
            | CliError::YamlError(_)
            | CliError::DotenvError(_) => 2,
            _ => 1,
        }
    }

    /// Remediation shown to the user below the error message
    pub fn hint(&self) -> &'static str {
        match self {
            CliError::IoError(_) => "Check that the file exists and is readable.",
            CliError::JsonError(_) | CliError::YamlError(_) => {
                "Fix the syntax of the file mentioned above."
            }
            CliError::HttpError(_) => {
                "Check your network connection and that the platform is reachable."
            }
            CliError::UrlError(_) => "Check the base URL in ~/.cx-cli/config.json.",
            CliError::DotenvError(_) => "Fix the syntax of the environment file.",
            CliError::Api { status, .. } => match status.as_u16() {
                401 | 403 => {
                    "Check that your service account credentials are valid for this environment."
                }
                404 => "Check the identifier and the selected environment.",
                _ => "Retry later or contact the platform team if the problem persists.",
            },
            CliError::ConfigError(_) => {
                "Run 'cx-cli init' to create lifecycle/lifecycle_config.yaml, or fix its contents."
            }
            CliError::CredentialsError(_) => {
                "Create ~/.cx-cli/credentials.json with a 'serviceAccounts' object keyed by environment, or pass --creds-path."
            }
            CliError::InvalidEnvironment(_) => "Use one of: sandbox, dev, nprd, prod.",
            CliError::MissingVariables(_) => {
                "Define the missing variables in lifecycle/lifecycle_envs/<env>.env."
            }
            CliError::NoUploadableFiles => {
                "Add configuration files without '.example' in their name to the selected services."
            }
            CliError::UploadFailed(_) => "Fix the errors listed above and run the command again.",
            CliError::Registration(failure) => failure.kind.hint(),
            CliError::DeploymentInProgress(_) => {
                "Wait until it finishes, or run 'cx-cli cancel <deployment-id>' during the validation phase."
            }
            CliError::ValidationError(_) => "Fix the reported problems and run the command again.",
            CliError::NotFound(_) => "Check the identifier and the selected environment.",
            CliError::Internal(_) => "Re-run with --log-level debug and report the output.",
        }
    }
}

/// Category of a failed application registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationErrorKind {
    Conflict,
    InvalidPayload,
    PermissionDenied,
    Unavailable,
    RetriesExhausted,
    Generic,
}

impl RegistrationErrorKind {
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            409 => RegistrationErrorKind::Conflict,
            400 | 422 => RegistrationErrorKind::InvalidPayload,
            401 | 403 => RegistrationErrorKind::PermissionDenied,
            502 | 503 | 504 => RegistrationErrorKind::Unavailable,
            _ => RegistrationErrorKind::Generic,
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            RegistrationErrorKind::Conflict => {
                "An application with this name already exists. Change display_name in lifecycle_config.yaml."
            }
            RegistrationErrorKind::InvalidPayload => {
                "Check the application section of lifecycle_config.yaml for missing or malformed fields."
            }
            RegistrationErrorKind::PermissionDenied => {
                "Your service account lacks permission to register applications in this environment."
            }
            RegistrationErrorKind::Unavailable => {
                "The platform is temporarily unavailable. Try again in a few minutes."
            }
            RegistrationErrorKind::RetriesExhausted => {
                "The platform could not be reached after several attempts. Check your connection and try again."
            }
            RegistrationErrorKind::Generic => {
                "Try again, or contact the platform team with the message above."
            }
        }
    }
}

impl fmt::Display for RegistrationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RegistrationErrorKind::Conflict => "application already exists",
            RegistrationErrorKind::InvalidPayload => "invalid application data",
            RegistrationErrorKind::PermissionDenied => "permission denied",
            RegistrationErrorKind::Unavailable => "service temporarily unavailable",
            RegistrationErrorKind::RetriesExhausted => "retries exhausted",
            RegistrationErrorKind::Generic => "registration failed",
        };
        f.write_str(label)
    }
}

/// A registration that failed after the IAM record was created
#[derive(Debug)]
pub struct RegistrationFailure {
    pub kind: RegistrationErrorKind,
    pub message: String,
    /// Attempts made at the failing call
    pub attempts: u32,
    /// Set when deleting the IAM record afterwards also failed
    pub cleanup_error: Option<String>,
}

impl fmt::Display for RegistrationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Registration failed ({})", self.kind)?;
        if self.attempts > 1 {
            write!(f, " after {} attempts", self.attempts)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(cleanup) = &self.cleanup_error {
            write!(f, " (cleanup of the IAM application also failed: {})", cleanup)?;
        }
        Ok(())
    }
}
