//! Typed client for test drivers
//!
//! Wraps the simulator's HTTP surface so integration tests can rotate
//! secrets and arm faults without hand-building JSON.

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use crate::item::SecretItem;

/// Client-side failures.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport or body decoding failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The simulator answered with a non-success status.
    #[error("{path} returned {status}: {body}")]
    Status {
        /// Request path.
        path: String,
        /// Response status.
        status: StatusCode,
        /// Decoded response body, `null` if it was not JSON.
        body: Value,
    },
}

/// What a secret read produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SecretRead {
    /// Response status; 500 for an injected failure.
    pub status: StatusCode,
    /// Decoded response body.
    pub body: Value,
}

impl SecretRead {
    /// The item data inside the KV-v2 envelope, if the read succeeded.
    pub fn data(&self) -> Option<&Value> {
        if self.status.is_success() {
            self.body.get("data").and_then(|d| d.get("data"))
        } else {
            None
        }
    }
}

/// Client for one simulator instance.
#[derive(Debug, Clone)]
pub struct ControlClient {
    base_url: String,
    http: Client,
}

impl ControlClient {
    /// `base_url` without a trailing slash, e.g. `http://127.0.0.1:18200`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_control(&self, path: &str, body: Value) -> Result<(), ClientError> {
        let response = self.http.post(self.url(path)).json(&body).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        Err(ClientError::Status {
            path: path.to_string(),
            status,
            body,
        })
    }

    /// `POST /control/set-version`.
    pub async fn set_version(
        &self,
        service: &str,
        item: SecretItem,
        version: u64,
    ) -> Result<(), ClientError> {
        self.post_control(
            "/control/set-version",
            json!({ "service": service, "item": item, "version": version }),
        )
        .await
    }

    /// `POST /control/fail-next`.
    pub async fn fail_next(
        &self,
        service: &str,
        item: SecretItem,
        count: u32,
    ) -> Result<(), ClientError> {
        self.post_control(
            "/control/fail-next",
            json!({ "service": service, "item": item, "count": count }),
        )
        .await
    }

    /// `POST /control/reset`.
    pub async fn reset(&self) -> Result<(), ClientError> {
        self.post_control("/control/reset", json!({})).await
    }

    /// Read a secret the way the agent would. Non-2xx statuses are returned,
    /// not raised, since injected failures are an expected outcome.
    pub async fn read_secret(
        &self,
        service: &str,
        item: SecretItem,
    ) -> Result<SecretRead, ClientError> {
        let path = format!("/v1/secret/data/bootroot/services/{service}/{item}");
        let response = self.http.get(self.url(&path)).send().await?;
        let status = response.status();
        let body = response.json::<Value>().await?;
        Ok(SecretRead { status, body })
    }

    /// AppRole login; returns the client token.
    pub async fn login(&self) -> Result<String, ClientError> {
        let path = "/v1/auth/approle/login";
        let response = self
            .http
            .post(self.url(path))
            .json(&json!({ "role_id": "role", "secret_id": "secret" }))
            .send()
            .await?;
        let status = response.status();
        let body = response.json::<Value>().await?;
        match body["auth"]["client_token"].as_str() {
            Some(token) if status.is_success() => Ok(token.to_string()),
            _ => Err(ClientError::Status {
                path: path.to_string(),
                status,
                body,
            }),
        }
    }

    /// True when `sys/health` reports initialized and unsealed.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let response = self.http.get(self.url("/v1/sys/health")).send().await?;
        if !response.status().is_success() {
            return Ok(false);
        }
        let body = response.json::<Value>().await?;
        Ok(body["initialized"] == true && body["sealed"] == false)
    }
}
