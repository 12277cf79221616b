//! Schema registry API client

use lifecycle_api::models::SchemaDocument;
use tracing::warn;

use crate::errors::CliError;
use crate::http::client::{decode, HttpClient};

/// Registry path for a schema name; `dir/name` becomes `name?path=dir`
pub fn schema_path(name: &str) -> String {
    match name.rsplit_once('/') {
        Some((dir, file)) => {
            let dir: String = url::form_urlencoded::byte_serialize(dir.as_bytes()).collect();
            format!("/schemas/schema/{}?path={}", file, dir)
        }
        None => format!("/schemas/schema/{}", name),
    }
}

impl HttpClient {
    /// Fetch a schema document, `None` when the registry does not serve it
    pub async fn fetch_schema(&self, name: &str) -> Result<Option<SchemaDocument>, CliError> {
        let response = self.get_response(&schema_path(name)).await?;
        let status = response.status();
        if !status.is_success() {
            warn!("Failed to fetch schema {}: {}", name, status);
            return Ok(None);
        }
        let document: Option<SchemaDocument> = decode(response, "GET").await?;
        Ok(document.filter(|d| !d.is_empty()))
    }
}
