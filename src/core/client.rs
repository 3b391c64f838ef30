//! Targetprocess REST client
//!
//! Queries go through the v2 API (`GET {base}/api/v2/{type}?{query}&token=..`),
//! creates and updates through the v1 API (`POST {base}/api/v1/{resource}?token=..`).
//! Every call is made exactly once; callers decide what a failure means.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::core::query::QuerySpec;

const USER_AGENT: &str = concat!("tp-import/", env!("CARGO_PKG_VERSION"));

/// Errors talking to the remote system
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

/// An entity returned by a query; only `id` and `name` are interpreted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEntity {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl RemoteEntity {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            extra: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ItemsResponse {
    #[serde(default)]
    items: Option<Vec<RemoteEntity>>,
}

/// Capabilities the import pipeline needs from the remote system
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// All entities of `entity_type` matching `query`
    async fn fetch(
        &self,
        entity_type: &str,
        query: &QuerySpec,
    ) -> Result<Vec<RemoteEntity>, ClientError>;

    /// Create (or, when the payload carries an `id`, update) an entity
    async fn submit(&self, resource: &str, payload: &Value) -> Result<(), ClientError>;
}

/// reqwest-backed [`RemoteApi`]
pub struct TpClient {
    http_client: reqwest::Client,
    base_url: String,
    token: String,
}

impl TpClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// URL of a v2 query, without the token
    pub fn query_url(&self, entity_type: &str, query: &QuerySpec) -> String {
        format!(
            "{}/api/v2/{}?{}",
            self.base_url,
            entity_type,
            query.to_query_string()
        )
    }

    /// URL of a v1 create/update, without the token
    pub fn submit_url(&self, resource: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, resource)
    }

    fn with_token(&self, url: &str) -> Result<reqwest::Url, ClientError> {
        let mut parsed = reqwest::Url::parse(url).map_err(|e| ClientError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        parsed.query_pairs_mut().append_pair("token", &self.token);
        Ok(parsed)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl RemoteApi for TpClient {
    async fn fetch(
        &self,
        entity_type: &str,
        query: &QuerySpec,
    ) -> Result<Vec<RemoteEntity>, ClientError> {
        let url = self.query_url(entity_type, query);
        tracing::debug!(entity_type = %entity_type, url = %url, "Querying entities");

        let response = self
            .http_client
            .get(self.with_token(&url)?)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let parsed: ItemsResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        Ok(parsed.items.unwrap_or_default())
    }

    async fn submit(&self, resource: &str, payload: &Value) -> Result<(), ClientError> {
        let url = self.submit_url(resource);
        tracing::debug!(resource = %resource, url = %url, "Submitting entity");

        let response = self
            .http_client
            .post(self.with_token(&url)?)
            .json(payload)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Self::check(response).await?;
        Ok(())
    }
}
