//! Messaging service grant API client

use lifecycle_api::models::{CreateGrantRequest, GrantList, GrantRole};
use reqwest::StatusCode;

use crate::errors::CliError;
use crate::http::client::{decode, ensure_success, HttpClient};

/// Outcome of creating a grant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantCreated {
    Created,
    AlreadyExists,
}

/// Outcome of deleting a grant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantDeleted {
    Deleted,
    NotFound,
}

impl HttpClient {
    /// Grant an application access to a topic
    pub async fn create_grant(
        &self,
        topic: &str,
        request: &CreateGrantRequest,
    ) -> Result<GrantCreated, CliError> {
        let path = format!("/topics/{}/grants", topic);
        let response = self.post_response(&path, request).await?;
        if response.status() == StatusCode::CONFLICT {
            return Ok(GrantCreated::AlreadyExists);
        }
        ensure_success(response, "POST").await?;
        Ok(GrantCreated::Created)
    }

    /// Revoke an application's access to a topic
    pub async fn delete_grant(
        &self,
        topic: &str,
        app_id: &str,
        role: GrantRole,
    ) -> Result<GrantDeleted, CliError> {
        let path = format!("/topics/{}/grants/{}?role={}", topic, app_id, role);
        let response = self.delete_response(&path).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(GrantDeleted::NotFound);
        }
        ensure_success(response, "DELETE").await?;
        Ok(GrantDeleted::Deleted)
    }

    /// List grants of a topic, `None` when the topic does not exist
    pub async fn list_grants(&self, topic: &str) -> Result<Option<GrantList>, CliError> {
        let path = format!("/topics/{}/grants", topic);
        let response = self.get_response(&path).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let list: Option<GrantList> = decode(response, "GET").await?;
        Ok(Some(list.unwrap_or_default()))
    }
}
