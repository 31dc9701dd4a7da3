//! HTTP transport for the bus gateway endpoint.
//!
//! POSTs one form-encoded request per call:
//!
//! ```text
//! service=open-ils.actor&method=...&param="<token>"&param=[...]
//! ```
//!
//! and reads back the gateway envelope `{"payload": [...], "status": 200}`.
//! Each `param` is a JSON document, so an explicit null is sent as `null`.

use std::time::Duration;

use async_trait::async_trait;
use backon::Retryable;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{BusTransport, RemoteCall};
use crate::error::{GatewayError, TransportError};
use crate::utils::retry::{is_retryable_transport, RetryConfig};

/// Default gateway endpoint path on an ILS web host.
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost/osrf-gateway-v1";

/// Envelope status for a successful call.
const ENVELOPE_OK: u16 = 200;

/// Bus connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Gateway endpoint URL.
    pub gateway_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Retry policy for transient transport failures.
    pub retry: RetryConfig,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            timeout_secs: 30,
            retry: RetryConfig::default(),
        }
    }
}

impl BusConfig {
    /// Set the gateway URL.
    pub fn with_gateway_url(mut self, url: &str) -> Self {
        self.gateway_url = url.to_string();
        self
    }

    /// Set the request timeout, rounded up to whole seconds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let partial = u64::from(timeout.subsec_nanos() > 0);
        self.timeout_secs = timeout.as_secs().saturating_add(partial).max(1);
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Effective request timeout; never shorter than one second.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    payload: Option<Vec<Value>>,
    status: Option<u16>,
    #[serde(default)]
    debug: Option<String>,
}

/// Bus transport over the HTTP gateway.
pub struct HttpBusTransport {
    client: Client,
    config: BusConfig,
}

impl HttpBusTransport {
    /// Create a transport with the given configuration.
    pub fn new(config: BusConfig) -> Result<Self, GatewayError> {
        if config.gateway_url.is_empty() {
            return Err(GatewayError::Config(
                "bus gateway URL not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GatewayError::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Form fields for a call, one `param` per positional parameter.
    fn form_fields(call: &RemoteCall) -> Result<Vec<(&'static str, String)>, TransportError> {
        let mut fields = Vec::with_capacity(call.params.len() + 2);
        fields.push(("service", call.service.clone()));
        fields.push(("method", call.method.clone()));
        for param in &call.params {
            let encoded = serde_json::to_string(param)
                .map_err(|e| TransportError::Framing(format!("cannot encode param: {e}")))?;
            fields.push(("param", encoded));
        }
        Ok(fields)
    }

    /// Read the payload list out of a gateway response body.
    fn parse_envelope(body: &str) -> Result<Vec<Value>, TransportError> {
        let envelope: Envelope = serde_json::from_str(body).map_err(|e| {
            TransportError::Framing(format!(
                "{e}: {}",
                body.chars().take(200).collect::<String>()
            ))
        })?;

        let status = envelope.status.unwrap_or(ENVELOPE_OK);
        if status != ENVELOPE_OK {
            return Err(TransportError::Status {
                status,
                debug: envelope.debug.unwrap_or_default(),
            });
        }

        envelope
            .payload
            .ok_or_else(|| TransportError::Framing("envelope has no payload".to_string()))
    }

    async fn post_call(&self, call: &RemoteCall) -> Result<Vec<Value>, TransportError> {
        let fields = Self::form_fields(call)?;

        let response = self
            .client
            .post(&self.config.gateway_url)
            .form(&fields)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TransportError::Http {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        Self::parse_envelope(&body)
    }
}

#[async_trait]
impl BusTransport for HttpBusTransport {
    async fn raw_call(&self, call: &RemoteCall) -> Result<Vec<Value>, TransportError> {
        let payload = (|| async { self.post_call(call).await })
            .retry(self.config.retry.backoff())
            .when(is_retryable_transport)
            .notify(|err, delay| {
                warn!(
                    method = %call.method,
                    error = %err,
                    delay = ?delay,
                    "Bus call failed, retrying"
                );
            })
            .await?;

        debug!(
            endpoint = %self.config.gateway_url,
            method = %call.method,
            "Bus gateway call completed"
        );
        Ok(payload)
    }

    fn name(&self) -> &str {
        "http"
    }
}
