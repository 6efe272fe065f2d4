// Webhook transport
// reason: reqwest for HTTP delivery to a messaging gateway, errors classified at the boundary
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use dispatch_core::domain::Metadata;
use dispatch_core::port::{Delivery, Transport, TransportError};
use dispatch_core::{AppError, Result};

/// Gateway rejections that will never succeed on retry (matched lowercase)
pub const PERMANENT_FAILURE_SIGNATURES: &[&str] = &[
    "not registered",
    "does not exist",
    "not found",
    "invalid destination",
    "invalid number",
    "unsupported destination",
    "transport disabled",
];

/// Webhook configuration
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Gateway endpoint receiving one POST per message
    pub url: String,
    /// Sent as `Authorization: Bearer <token>` when present
    pub token: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    destination: &'a str,
    payload: &'a str,
    metadata: &'a Metadata,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    success: bool,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP POST transport
pub struct WebhookTransport {
    config: WebhookConfig,
    client: Client,
}

impl WebhookTransport {
    /// Build the transport and its HTTP client
    ///
    /// # Errors
    /// AppError::Config if the HTTP client cannot be constructed
    pub fn new(config: WebhookConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }
}

#[async_trait]
impl Transport for WebhookTransport {
    async fn send(
        &self,
        destination: &str,
        payload: &str,
        metadata: &Metadata,
    ) -> std::result::Result<Delivery, TransportError> {
        let request = SendRequest {
            destination,
            payload,
            metadata,
        };

        debug!(url = %self.config.url, destination = %destination, "Posting message to gateway");

        let mut builder = self.client.post(&self.config.url).json(&request);
        if let Some(token) = &self.config.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(classify_request_error)?;
        let status = response.status();
        let body = response.text().await.map_err(classify_request_error)?;

        if !status.is_success() {
            let err = classify_status(status, &body);
            warn!(status = status.as_u16(), permanent = err.is_permanent(), "Gateway refused message");
            return Err(err);
        }

        interpret_body(&body)
    }
}

/// Classify a non-2xx response
///
/// 4xx is permanent except 408 and 429; everything else is transient.
pub fn classify_status(status: StatusCode, body: &str) -> TransportError {
    let message = if body.trim().is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, body.trim())
    };

    let retryable_client_error =
        status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::TOO_MANY_REQUESTS;

    if status.is_client_error() && !retryable_client_error {
        TransportError::Permanent(message)
    } else {
        TransportError::Transient(message)
    }
}

/// Classify a gateway-reported rejection by its wording
pub fn classify_rejection(error: &str) -> TransportError {
    let lowered = error.to_lowercase();
    if PERMANENT_FAILURE_SIGNATURES
        .iter()
        .any(|signature| lowered.contains(signature))
    {
        TransportError::Permanent(error.to_string())
    } else {
        TransportError::Transient(error.to_string())
    }
}

/// Interpret a 2xx body; an empty or non-JSON body counts as accepted
pub fn interpret_body(body: &str) -> std::result::Result<Delivery, TransportError> {
    if body.trim().is_empty() {
        return Ok(Delivery::default());
    }

    match serde_json::from_str::<SendResponse>(body) {
        Ok(response) if response.success => Ok(Delivery {
            message_id: response.id,
        }),
        Ok(response) => Err(classify_rejection(
            response
                .error
                .as_deref()
                .unwrap_or("gateway reported failure without reason"),
        )),
        Err(_) => Ok(Delivery::default()),
    }
}

fn classify_request_error(err: reqwest::Error) -> TransportError {
    if err.is_builder() {
        // The request itself can never be built; retrying changes nothing
        return TransportError::Permanent(format!("invalid request: {}", err));
    }
    if err.is_timeout() {
        return TransportError::Transient(format!("request timed out: {}", err));
    }
    if err.is_connect() {
        return TransportError::Transient(format!("connection failed: {}", err));
    }
    TransportError::Transient(err.to_string())
}
