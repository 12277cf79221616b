//! Object storage upload endpoints

use async_trait::async_trait;
use lifecycle_api::models::{PresignRequest, PresignResponse};

use crate::deploy::upload::ObjectUploader;
use crate::errors::CliError;
use crate::http::client::HttpClient;

impl HttpClient {
    /// Request a presigned upload URL for one storage key
    pub async fn generate_presigned_url(&self, key: &str) -> Result<String, CliError> {
        let request = PresignRequest {
            key: key.to_string(),
        };
        let response: PresignResponse = self.post("s3/generate_presigned_url", &request).await?;
        Ok(response.url)
    }
}

#[async_trait]
impl ObjectUploader for HttpClient {
    async fn presign(&self, key: &str) -> Result<String, CliError> {
        self.generate_presigned_url(key).await
    }

    async fn put_object(&self, url: &str, body: Vec<u8>) -> Result<(), CliError> {
        self.put_presigned(url, body).await
    }
}
