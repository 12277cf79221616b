//! IAM API client

use lifecycle_api::models::{CreateApplicationRequest, IamApplication, RoleAssignment, UserProfile};
use reqwest::StatusCode;

use crate::errors::CliError;
use crate::http::client::{decode, HttpClient};

const APPLICATIONS_PATH: &str = "/cxp-iam/api/v1/applications";

impl HttpClient {
    /// Create an application, or update it in place when `id` is set
    pub async fn create_iam_application(
        &self,
        request: &CreateApplicationRequest,
    ) -> Result<IamApplication, CliError> {
        self.post(APPLICATIONS_PATH, request).await
    }

    /// Fetch an application, `None` when it does not exist
    pub async fn get_iam_application(
        &self,
        app_id: &str,
    ) -> Result<Option<IamApplication>, CliError> {
        let path = format!("{}/{}", APPLICATIONS_PATH, app_id);
        let response = self.get_response(&path).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(decode(response, "GET").await?))
    }

    /// Delete an application
    pub async fn delete_iam_application(&self, app_id: &str) -> Result<(), CliError> {
        let path = format!("{}/{}", APPLICATIONS_PATH, app_id);
        let _: serde_json::Value = self.delete(&path).await?;
        Ok(())
    }

    /// Profile of the caller's account
    pub async fn current_user(&self) -> Result<UserProfile, CliError> {
        self.get("/cxp-iam/api/v1/users/me").await
    }

    /// Assign roles to an application's service account
    pub async fn assign_roles(
        &self,
        client_id: &str,
        roles: &[RoleAssignment],
    ) -> Result<(), CliError> {
        let path = format!("/cxp-iam/api/v1/tenants/users/{}/assignRoles", client_id);
        let _: serde_json::Value = self.post(&path, roles).await?;
        Ok(())
    }
}
