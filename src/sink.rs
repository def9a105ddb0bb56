//! Dispatch sink - the boundary to the host automation runtime.
//!
//! Controllers never open sockets themselves; they issue named backend
//! actions (or plain HTTP fetches) through this trait. The production
//! implementation speaks the Home Assistant REST service API.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::error::TransportError;

/// Transport boundary for issuing backend actions.
#[async_trait]
pub trait DispatchSink: Send + Sync {
    /// Issue a named action against a backend with a parameter map.
    ///
    /// `expect_response` asks the host to return the action's response
    /// payload; hosts reject response collection on actions that produce
    /// none, so callers opt in explicitly.
    async fn issue(
        &self,
        backend: &str,
        action: &str,
        params: Value,
        expect_response: bool,
    ) -> Result<Option<Value>, TransportError>;

    /// Plain HTTP fetch for URL-driven controllers.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError>;
}

/// Dispatch sink backed by the Home Assistant REST API.
///
/// Actions map to `POST {base_url}/api/services/{backend}/{action}` with a
/// bearer token; fetches are plain GETs.
pub struct HassSink {
    client: reqwest::Client,
    base_url: Url,
    token: String,
}

impl HassSink {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, TransportError> {
        // Trailing slash so Url::join keeps the base path intact.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized)?;

        #[allow(clippy::expect_used)] // HTTP client creation only fails if TLS setup fails
        let client = reqwest::Client::builder()
            .user_agent("ir-control-bridge")
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Ok(Self {
            client,
            base_url,
            token: token.into(),
        })
    }
}

#[async_trait]
impl DispatchSink for HassSink {
    async fn issue(
        &self,
        backend: &str,
        action: &str,
        params: Value,
        expect_response: bool,
    ) -> Result<Option<Value>, TransportError> {
        let mut url = self.base_url.join(&format!("api/services/{backend}/{action}"))?;
        if expect_response {
            url.set_query(Some("return_response"));
        }

        tracing::debug!(%backend, %action, "issuing service action");

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TransportError::Rejected {
                backend: backend.to_string(),
                action: action.to_string(),
                status: response.status().as_u16(),
            });
        }

        if expect_response {
            let body: Value = response.json().await?;
            // The host wraps responses as {"service_response": ...}; hand
            // the caller the inner payload when that wrapper is present.
            Ok(Some(
                body.get("service_response").cloned().unwrap_or(body),
            ))
        } else {
            Ok(None)
        }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        tracing::debug!(%url, "fetching");
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(TransportError::Rejected {
                backend: "http".to_string(),
                action: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
