//! REST client for the metrics and alerting backend.
//!
//! Wraps the backend's four HTTP endpoints using [`reqwest`]:
//!
//! | Operation      | Request                           | Success body            |
//! |----------------|-----------------------------------|-------------------------|
//! | `query_alerts` | `GET /alerts`                     | JSON array of alerts    |
//! | `query`        | `GET /query?target=<query>`       | `{ "value": <float> }`  |
//! | `notify`       | `POST /notify` `{alertName, message}` | ignored             |
//! | `resolve`      | `POST /resolve` `{alertName}`     | ignored                 |

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vigil_core::alert::AlertDefinition;

use crate::backend::AlertBackend;
use crate::error::BackendError;

/// Backend address used when none is configured.
pub const DEFAULT_ADDRESS: &str = "http://127.0.0.1:9001";

const ALERTS_PATH: &str = "/alerts";
const QUERY_PATH: &str = "/query";
const NOTIFY_PATH: &str = "/notify";
const RESOLVE_PATH: &str = "/resolve";

#[derive(Debug, Deserialize)]
struct QueryResponse {
    value: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NotifyRequest<'a> {
    alert_name: &'a str,
    message: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolveRequest<'a> {
    alert_name: &'a str,
}

/// HTTP implementation of [`AlertBackend`].
///
/// Cheap to share: the inner [`reqwest::Client`] pools connections and is
/// safe for concurrent use by every alert task.
#[derive(Debug, Clone)]
pub struct HttpAlertBackend {
    client: reqwest::Client,
    address: String,
}

impl HttpAlertBackend {
    /// Create a client for `address` whose calls time out after `timeout`.
    ///
    /// An empty address falls back to [`DEFAULT_ADDRESS`].
    pub fn new(address: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, address))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, address: &str) -> Self {
        Self {
            client,
            address: normalize_address(address),
        }
    }

    /// Base URL every request is sent to.
    pub fn address(&self) -> &str {
        &self.address
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.address)
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. On failure the
    /// status and body text are returned as [`BackendError::Status`].
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Decode a successful JSON body, keeping the raw text on failure.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let body = Self::ensure_success(response).await?.text().await?;
        serde_json::from_str(&body).map_err(|e| BackendError::Decode {
            reason: e.to_string(),
            body,
        })
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<(), BackendError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl AlertBackend for HttpAlertBackend {
    async fn query_alerts(&self) -> Result<Vec<AlertDefinition>, BackendError> {
        let response = self.client.get(self.url(ALERTS_PATH)).send().await?;
        Self::parse_response(response).await
    }

    async fn query(&self, target: &str) -> Result<f64, BackendError> {
        let response = self
            .client
            .get(self.url(QUERY_PATH))
            .query(&[("target", target)])
            .send()
            .await?;

        let parsed: QueryResponse = Self::parse_response(response).await?;
        Ok(parsed.value)
    }

    async fn notify(&self, alert_name: &str, message: &str) -> Result<(), BackendError> {
        self.post(
            NOTIFY_PATH,
            &NotifyRequest {
                alert_name,
                message,
            },
        )
        .await
    }

    async fn resolve(&self, alert_name: &str) -> Result<(), BackendError> {
        self.post(RESOLVE_PATH, &ResolveRequest { alert_name }).await
    }
}

fn normalize_address(address: &str) -> String {
    let trimmed = address.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        DEFAULT_ADDRESS.to_string()
    } else {
        trimmed.to_string()
    }
}
