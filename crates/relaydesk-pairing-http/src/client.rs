// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the remote pairing service.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use relaydesk_config::model::PairingConfig;
use relaydesk_core::{
    AdapterType, ConnectionId, HealthStatus, PairingService, PairingTicket, PluginAdapter,
    RelaydeskError, StatusReport,
};

/// Error body returned by the pairing service on failure.
#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Pairing service reached over HTTP with optional bearer auth.
#[derive(Debug, Clone)]
pub struct HttpPairingService {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpPairingService {
    pub fn new(config: &PairingConfig) -> Result<Self, RelaydeskError> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/')).map_err(|e| {
            RelaydeskError::Config(format!("invalid pairing.base_url `{}`: {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(RelaydeskError::Config(format!(
                "pairing.base_url `{}` cannot carry a path",
                config.base_url
            )));
        }

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.api_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                RelaydeskError::Config(format!("invalid pairing.api_token header value: {e}"))
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| RelaydeskError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn session_url(&self, id: &ConnectionId) -> Url {
        self.url(&["sessions", id.as_str()])
    }
}

/// Human-readable failure text from a non-success response.
async fn failure_message(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiError>(&body) {
        Ok(api) => api.message,
        Err(_) if body.trim().is_empty() => format!("pairing service returned {status}"),
        Err(_) => format!("pairing service returned {status}: {}", body.trim()),
    }
}

fn transient(
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
) -> RelaydeskError {
    RelaydeskError::TransientPoll { message, source }
}

#[async_trait]
impl PluginAdapter for HttpPairingService {
    fn name(&self) -> &str {
        "http-pairing"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Pairing
    }

    async fn health_check(&self) -> Result<HealthStatus, RelaydeskError> {
        match self.client.get(self.url(&["health"])).send().await {
            Ok(response) if response.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(response) => Ok(HealthStatus::Degraded(format!(
                "health endpoint returned {}",
                response.status()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "pairing service unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), RelaydeskError> {
        Ok(())
    }
}

#[async_trait]
impl PairingService for HttpPairingService {
    async fn request_pairing(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<PairingTicket, RelaydeskError> {
        let response = self
            .client
            .post(self.session_url(connection_id))
            .send()
            .await
            .map_err(|e| RelaydeskError::PairingRequest {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(connection_id = %connection_id, status = %status, "pairing response received");
        if !status.is_success() {
            return Err(RelaydeskError::PairingRequest {
                message: failure_message(response).await,
                source: None,
            });
        }

        response
            .json::<PairingTicket>()
            .await
            .map_err(|e| RelaydeskError::PairingRequest {
                message: format!("failed to parse pairing response: {e}"),
                source: Some(Box::new(e)),
            })
    }

    /// Every failure here is transient: only a well-formed `error` status
    /// ends the handshake.
    async fn check_status(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<StatusReport, RelaydeskError> {
        let response = self
            .client
            .get(self.session_url(connection_id))
            .send()
            .await
            .map_err(|e| transient(format!("HTTP request failed: {e}"), Some(Box::new(e))))?;

        let status = response.status();
        if !status.is_success() {
            return Err(transient(failure_message(response).await, None));
        }

        response.json::<StatusReport>().await.map_err(|e| {
            transient(
                format!("failed to parse status response: {e}"),
                Some(Box::new(e)),
            )
        })
    }

    async fn terminate(&self, connection_id: &ConnectionId) -> Result<(), RelaydeskError> {
        let response = self
            .client
            .delete(self.session_url(connection_id))
            .send()
            .await
            .map_err(|e| RelaydeskError::Internal(format!("terminate request failed: {e}")))?;

        match response.status() {
            s if s.is_success() || s == StatusCode::NOT_FOUND => Ok(()),
            _ => Err(RelaydeskError::Internal(format!(
                "terminate failed: {}",
                failure_message(response).await
            ))),
        }
    }
}
