//! Application and deployment listings

use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::errors::CliError;
use crate::http::client::{decode, HttpClient};

impl HttpClient {
    /// Applications registered in the caller's account
    pub async fn list_applications<T: DeserializeOwned>(&self) -> Result<T, CliError> {
        self.get("/cli/applications").await
    }

    /// Details of one deployment
    pub async fn get_deployment<T: DeserializeOwned>(
        &self,
        deployment_id: &str,
    ) -> Result<T, CliError> {
        self.get(&format!("/cli/deployments/{}", deployment_id)).await
    }

    /// Last successful deployment of an application, `None` if there is none
    pub async fn current_deployment<T: DeserializeOwned>(
        &self,
        app_id: &str,
    ) -> Result<Option<T>, CliError> {
        let response = self
            .get_response(&format!("/cli/deployments/current/{}", app_id))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(decode(response, "GET").await?))
    }

    /// Deployment history of an application
    pub async fn deployment_history<T: DeserializeOwned>(
        &self,
        app_id: &str,
    ) -> Result<T, CliError> {
        self.get(&format!("/cli/deployments/history/{}", app_id)).await
    }
}
