//! Access to the REST backend.
//!
//! One request per call, no retries. Whether a failure is kept offline is
//! decided by the caller from [`RemoteError::class`].

use async_trait::async_trait;
use practice_engine::{ErrorClass, RecordId};
use reqwest::{Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Failure of a single request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// No response was received
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    /// A success response whose body was not the expected JSON
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl RemoteError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RemoteError::Transport(_) => ErrorClass::Transport,
            RemoteError::Server { status, .. } => ErrorClass::Server(*status),
            RemoteError::Malformed(_) => ErrorClass::Malformed,
        }
    }
}

/// Raw access to entity endpoints.
///
/// Records are exchanged in their wire shape; translating them is the
/// caller's job.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch every record of an entity type.
    async fn list(&self, endpoint: &str) -> Result<Vec<Value>, RemoteError>;

    /// Create a record, returning the response body (`Null` when empty).
    async fn create(&self, endpoint: &str, body: &Value) -> Result<Value, RemoteError>;

    /// Update a record, returning the response body (`Null` when empty).
    async fn update(&self, endpoint: &str, id: RecordId, body: &Value)
        -> Result<Value, RemoteError>;

    /// Delete a record. `false` means the server no longer had it.
    async fn delete(&self, endpoint: &str, id: RecordId) -> Result<bool, RemoteError>;
}

#[async_trait]
impl<T: RemoteStore + ?Sized> RemoteStore for Arc<T> {
    async fn list(&self, endpoint: &str) -> Result<Vec<Value>, RemoteError> {
        (**self).list(endpoint).await
    }

    async fn create(&self, endpoint: &str, body: &Value) -> Result<Value, RemoteError> {
        (**self).create(endpoint, body).await
    }

    async fn update(
        &self,
        endpoint: &str,
        id: RecordId,
        body: &Value,
    ) -> Result<Value, RemoteError> {
        (**self).update(endpoint, id, body).await
    }

    async fn delete(&self, endpoint: &str, id: RecordId) -> Result<bool, RemoteError> {
        (**self).delete(endpoint, id).await
    }
}

/// [`RemoteStore`] over HTTP with JSON bodies.
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRemoteStore {
    /// Create a client for `base_url`, e.g. `http://localhost:5000/api`.
    ///
    /// Without a timeout a request waits as long as the transport allows.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, RemoteError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| RemoteError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    fn item_url(&self, endpoint: &str, id: RecordId) -> String {
        format!("{}/{}/{}", self.base_url, endpoint, id)
    }

    async fn send(request: reqwest::RequestBuilder, url: &str) -> Result<Response, RemoteError> {
        request.send().await.map_err(|e| {
            let reason = if e.is_timeout() {
                "timed out"
            } else if e.is_connect() {
                "connection failed"
            } else {
                "request failed"
            };
            RemoteError::Transport(format!("{reason} for {url}: {e}"))
        })
    }

    /// Read the body of a response, failing for non-success statuses.
    async fn read_body(response: Response, url: &str) -> Result<Value, RemoteError> {
        let status = response.status();
        let text = response.text().await.map_err(|e| {
            RemoteError::Transport(format!("failed to read response body from {url}: {e}"))
        })?;

        if !status.is_success() {
            return Err(RemoteError::Server {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text)
            .map_err(|e| RemoteError::Malformed(format!("invalid JSON from {url}: {e}")))
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn list(&self, endpoint: &str) -> Result<Vec<Value>, RemoteError> {
        let url = self.collection_url(endpoint);
        debug!("GET {}", url);

        let response = Self::send(self.client.get(&url), &url).await?;
        match Self::read_body(response, &url).await? {
            Value::Array(records) => Ok(records),
            Value::Object(mut envelope) => match envelope.remove("data") {
                Some(Value::Array(records)) => Ok(records),
                _ => Err(RemoteError::Malformed(format!(
                    "expected a list of records from {url}"
                ))),
            },
            _ => Err(RemoteError::Malformed(format!(
                "expected a list of records from {url}"
            ))),
        }
    }

    async fn create(&self, endpoint: &str, body: &Value) -> Result<Value, RemoteError> {
        let url = self.collection_url(endpoint);
        debug!("POST {}", url);

        let response = Self::send(self.client.post(&url).json(body), &url).await?;
        Self::read_body(response, &url).await
    }

    async fn update(
        &self,
        endpoint: &str,
        id: RecordId,
        body: &Value,
    ) -> Result<Value, RemoteError> {
        let url = self.item_url(endpoint, id);
        debug!("PUT {}", url);

        let response = Self::send(self.client.put(&url).json(body), &url).await?;
        Self::read_body(response, &url).await
    }

    async fn delete(&self, endpoint: &str, id: RecordId) -> Result<bool, RemoteError> {
        let url = self.item_url(endpoint, id);
        debug!("DELETE {}", url);

        let response = Self::send(self.client.delete(&url), &url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Self::read_body(response, &url).await.map(|_| true).or_else(|e| match e {
            // Some backends answer a delete with a plain-text confirmation
            RemoteError::Malformed(_) => Ok(true),
            other => Err(other),
        })
    }
}
