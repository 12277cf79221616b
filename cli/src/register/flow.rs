//! Application registration
//!
//! Registration creates the IAM application first and then mirrors it into
//! the developer studio. When the studio record cannot be created the IAM
//! application is deleted again, so a failed registration leaves nothing
//! behind on the platform.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use lifecycle_api::models::{
    CreateApplicationRequest, IamApplication, RoleAssignment, StudioApplicationRequest,
};
use secrecy::SecretString;
use tracing::{error, info, warn};

use crate::errors::{CliError, RegistrationErrorKind, RegistrationFailure};
use crate::http::client::HttpClient;
use crate::http::retry::{RetryFailure, RetryPolicy};
use crate::storage::manifest::ApplicationMetadata;
use crate::storage::settings::PlatformRole;

/// A completed registration
#[derive(Debug, Clone)]
pub struct Registration {
    pub application: IamApplication,
    pub account_id: String,
}

/// IAM application name derived from the display name
pub fn application_name(display_name: &str) -> String {
    display_name.trim().to_lowercase().replace(' ', "-")
}

/// IAM request for the manifest's application section
///
/// An existing `application_uid` is sent as `id` so IAM updates in place.
pub fn iam_request(metadata: &ApplicationMetadata) -> Result<CreateApplicationRequest, CliError> {
    let display_name = metadata.require_display_name()?;
    Ok(CreateApplicationRequest {
        name: application_name(display_name),
        display_name: display_name.to_string(),
        description: metadata.description.clone(),
        contact: metadata.lead_developer_email.clone(),
        version: metadata.app_version.clone(),
        git: metadata.github_url.clone(),
        id: metadata.application_uid.clone().filter(|id| !id.is_empty()),
    })
}

/// Developer studio request mirroring an IAM application
pub fn studio_request(application: &IamApplication, account_id: &str) -> StudioApplicationRequest {
    let display_name = application
        .display_name
        .clone()
        .or_else(|| application.name.clone())
        .unwrap_or_else(|| application.id.clone());
    StudioApplicationRequest {
        application_id: application.id.clone(),
        client_id: application.client_id.clone(),
        name: application
            .name
            .clone()
            .unwrap_or_else(|| application_name(&display_name)),
        display_name,
        description: application.description.clone(),
        lead_developer: application.contact.clone(),
        git_repository: application.git.clone(),
        version: application.version.clone(),
        account_id: account_id.to_string(),
    }
}

/// Service account secret shown once after registration
///
/// Base64 of `clientId:secret`, the value expected in credentials files.
pub fn service_credential(application: &IamApplication) -> Result<SecretString, CliError> {
    let client_id = application.client_id.as_deref().ok_or_else(|| {
        CliError::Internal("IAM response did not include a clientId".to_string())
    })?;
    let secret = application.secret.as_deref().ok_or_else(|| {
        CliError::Internal("IAM response did not include a secret".to_string())
    })?;
    Ok(SecretString::from(
        BASE64.encode(format!("{}:{}", client_id, secret)),
    ))
}

/// Category of a failed downstream call
pub fn classify(failure: &RetryFailure) -> RegistrationErrorKind {
    if failure.exhausted {
        return RegistrationErrorKind::RetriesExhausted;
    }
    failure
        .error
        .status()
        .map(RegistrationErrorKind::from_status)
        .unwrap_or(RegistrationErrorKind::Generic)
}

/// Account identifier of the caller
pub async fn fetch_account_id(
    iam: &HttpClient,
    policy: &RetryPolicy,
) -> Result<String, RetryFailure> {
    let profile = policy.run("Fetch account id", || iam.current_user()).await?;
    profile.account().map(str::to_string).ok_or_else(|| RetryFailure {
        attempts: 1,
        exhausted: false,
        error: CliError::Internal("User profile did not include an account id".to_string()),
    })
}

/// Create the developer studio record of an IAM application
///
/// Fetches the caller's account id first; both calls are retried.
pub async fn create_studio_record(
    iam: &HttpClient,
    deployment: &HttpClient,
    application: &IamApplication,
    policy: &RetryPolicy,
) -> Result<String, RetryFailure> {
    let account_id = fetch_account_id(iam, policy).await?;
    let request = studio_request(application, &account_id);
    policy
        .run("Create developer studio application", || {
            deployment.create_studio_application(&request)
        })
        .await?;
    info!("Developer studio record created for {}", application.id);
    Ok(account_id)
}

/// Register the application described by the manifest
pub async fn register_application(
    iam: &HttpClient,
    deployment: &HttpClient,
    metadata: &ApplicationMetadata,
    policy: &RetryPolicy,
) -> Result<Registration, CliError> {
    let request = iam_request(metadata)?;
    info!("Creating IAM application '{}'", request.name);
    let application = iam.create_iam_application(&request).await?;
    info!("IAM application {} created", application.id);

    match create_studio_record(iam, deployment, &application, policy).await {
        Ok(account_id) => Ok(Registration {
            application,
            account_id,
        }),
        Err(failure) => {
            let kind = classify(&failure);
            error!(
                "Developer studio registration failed after {} attempt(s): {}",
                failure.attempts, failure.error
            );

            warn!("Deleting IAM application {}", application.id);
            let cleanup_error = match iam.delete_iam_application(&application.id).await {
                Ok(()) => None,
                Err(e) => {
                    error!("Failed to delete IAM application {}: {}", application.id, e);
                    Some(e.to_string())
                }
            };

            Err(CliError::Registration(RegistrationFailure {
                kind,
                message: failure.error.to_string(),
                attempts: failure.attempts,
                cleanup_error,
            }))
        }
    }
}

/// Assign the configured platform roles to a registered application
///
/// Returns the services whose role was assigned.
pub async fn assign_platform_roles(
    iam: &HttpClient,
    application: &IamApplication,
    roles: &[PlatformRole],
) -> Result<Vec<String>, CliError> {
    if roles.is_empty() {
        return Ok(Vec::new());
    }
    let client_id = application.client_id.as_deref().ok_or_else(|| {
        CliError::Internal("IAM response did not include a clientId".to_string())
    })?;

    let mut assigned = Vec::new();
    for role in roles {
        info!("Assigning role {} for {}", role.role_name, role.service);
        iam.assign_roles(
            client_id,
            &[RoleAssignment {
                id: role.role_id.clone(),
                name: role.role_name.clone(),
            }],
        )
        .await?;
        assigned.push(role.service.clone());
    }
    Ok(assigned)
}
