//! HTTP client implementation

use std::time::Duration;

use reqwest::{header, Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use crate::errors::CliError;

/// Header carrying the per-environment service account secret
pub const CREDENTIALS_HEADER: header::HeaderName =
    header::HeaderName::from_static("x-servicecredentials");

/// Timeouts applied to a client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Timeout of regular calls; streams are not bounded
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// HTTP client bound to one backend base URL
///
/// Every request carries the service credential header. Uploads to
/// presigned URLs go through a separate client without it.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    upload_client: Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(
        base_url: &str,
        credential: &SecretString,
        options: &ClientOptions,
    ) -> Result<Self, CliError> {
        let mut secret = header::HeaderValue::from_str(credential.expose_secret()).map_err(|_| {
            CliError::CredentialsError(
                "Service account secret contains characters not allowed in a header".to_string(),
            )
        })?;
        secret.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(CREDENTIALS_HEADER, secret);
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(options.connect_timeout)
            .build()?;
        let upload_client = Client::builder()
            .connect_timeout(options.connect_timeout)
            .build()?;

        Ok(Self {
            client,
            upload_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout: options.request_timeout,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path relative to the base URL
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a GET request and return the raw response
    pub async fn get_response(&self, path: &str) -> Result<Response, CliError> {
        let url = self.url(path);
        debug!("GET {}", url);
        Ok(self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await?)
    }

    /// Send a POST request and return the raw response
    pub async fn post_response<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Response, CliError> {
        let url = self.url(path);
        debug!("POST {}", url);
        Ok(self
            .client
            .post(&url)
            .timeout(self.request_timeout)
            .json(body)
            .send()
            .await?)
    }

    /// Send a DELETE request and return the raw response
    pub async fn delete_response(&self, path: &str) -> Result<Response, CliError> {
        let url = self.url(path);
        debug!("DELETE {}", url);
        Ok(self
            .client
            .delete(&url)
            .timeout(self.request_timeout)
            .send()
            .await?)
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, CliError> {
        let response = self.get_response(path).await?;
        decode(response, "GET").await
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, CliError> {
        let response = self.post_response(path, body).await?;
        decode(response, "POST").await
    }

    /// Make a DELETE request
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, CliError> {
        let response = self.delete_response(path).await?;
        decode(response, "DELETE").await
    }

    /// Open a server-sent event stream
    ///
    /// No request timeout applies; the caller owns the read loop.
    pub async fn get_stream(&self, path: &str) -> Result<Response, CliError> {
        let url = self.url(path);
        debug!("GET {} (stream)", url);
        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        ensure_success(response, "GET").await
    }

    /// Upload bytes to a presigned object-storage URL
    pub async fn put_presigned(&self, url: &str, body: Vec<u8>) -> Result<(), CliError> {
        debug!("PUT presigned object ({} bytes)", body.len());
        let response = self
            .upload_client
            .put(url)
            .timeout(self.request_timeout)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header("x-amz-server-side-encryption", "aws:kms")
            .body(body)
            .send()
            .await?;
        ensure_success(response, "PUT").await?;
        Ok(())
    }
}

/// Turn a non-success response into `CliError::Api`
pub async fn ensure_success(response: Response, method: &str) -> Result<Response, CliError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    error!("HTTP {} {} failed: {} - {}", method, url, status, body);
    Err(CliError::Api { status, body })
}

/// Check the status and decode a JSON body; an empty body decodes as null
pub async fn decode<T: DeserializeOwned>(response: Response, method: &str) -> Result<T, CliError> {
    let response = ensure_success(response, method).await?;
    let bytes = response.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_slice(b"null")?);
    }
    Ok(serde_json::from_slice(&bytes)?)
}
