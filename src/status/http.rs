//! HTTP connection status provider.

use super::{ConnectionStatusProvider, RawStatusPayload};
use crate::error::StatusError;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;

const STATUS_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Deserialize)]
struct PairingResponse {
    #[serde(alias = "qr", alias = "qr_code", alias = "code")]
    pairing_artifact: String,
}

// Helper function to map HTTP errors to StatusError
fn map_http_error(error: reqwest::Error) -> StatusError {
    if error.is_timeout() {
        StatusError::Upstream(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        StatusError::Upstream(format!("Connection error: {}", error))
    } else if error.is_decode() {
        StatusError::Validation(format!("Failed to parse response: {}", error))
    } else {
        StatusError::Upstream(format!("HTTP error: {}", error))
    }
}

async fn ensure_success(response: Response) -> Result<Response, StatusError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(StatusError::Upstream(format!(
        "Request failed with status {}: {}",
        status, body
    )))
}

/// Provider speaking to a session service over HTTP.
///
/// `GET {base}/sessions/{subject}/status`, `POST {base}/sessions/{subject}/pairing`,
/// `DELETE {base}/sessions/{subject}`.
pub struct HttpStatusProvider {
    client: Client,
    base_url: String,
}

impl HttpStatusProvider {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self, StatusError> {
        let client = Client::builder()
            .no_proxy()
            .connect_timeout(STATUS_HTTP_CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| StatusError::NotConfigured(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn session_url(&self, subject: &str) -> String {
        format!("{}/sessions/{}", self.base_url, subject)
    }
}

#[async_trait]
impl ConnectionStatusProvider for HttpStatusProvider {
    async fn fetch(&self, subject: &str) -> Result<RawStatusPayload, StatusError> {
        let response = self
            .client
            .get(format!("{}/status", self.session_url(subject)))
            .send()
            .await
            .map_err(map_http_error)?;
        ensure_success(response)
            .await?
            .json::<RawStatusPayload>()
            .await
            .map_err(map_http_error)
    }

    async fn request_pairing(&self, subject: &str) -> Result<String, StatusError> {
        let response = self
            .client
            .post(format!("{}/pairing", self.session_url(subject)))
            .send()
            .await
            .map_err(map_http_error)?;
        let pairing: PairingResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(map_http_error)?;
        Ok(pairing.pairing_artifact)
    }

    async fn disconnect(&self, subject: &str) -> Result<(), StatusError> {
        let response = self
            .client
            .delete(self.session_url(subject))
            .send()
            .await
            .map_err(map_http_error)?;
        ensure_success(response).await?;
        Ok(())
    }
}
