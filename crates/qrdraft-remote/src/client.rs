// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared HTTP client for the remote session and configuration stores.
//!
//! Provides [`StoreClient`], which builds URLs against the configured base,
//! applies the request timeout and retries idempotent requests once on
//! transient errors (429, 500, 502, 503).

use std::time::Duration;

use qrdraft_config::model::RemoteConfig;
use qrdraft_core::DraftError;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// HTTP client for the remote stores.
#[derive(Debug, Clone)]
pub struct StoreClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl StoreClient {
    /// Creates a client rooted at `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DraftError> {
        let mut headers = HeaderMap::new();
        headers.insert("accept", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| DraftError::Persistence {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            max_retries: 1,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Creates a client from the `[remote]` config section.
    pub fn from_config(config: &RemoteConfig) -> Result<Self, DraftError> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    /// Overrides the retry delay (tests run against wiremock without sleeping).
    #[cfg(test)]
    pub(crate) fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Sends a request and returns the final response, whatever its status.
    ///
    /// POST is never retried: a retried create could store the
    /// configuration twice.
    pub(crate) async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, DraftError> {
        let url = self.url(path);
        let retries = if method == Method::POST {
            0
        } else {
            self.max_retries
        };

        let mut attempt = 0;
        loop {
            let mut request = self.client.request(method.clone(), &url);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await.map_err(|e| self.transport_error(e))?;
            let status = response.status();
            debug!(%method, url = %url, status = %status, attempt, "store response received");

            if is_transient_error(status) && attempt < retries {
                let text = response.text().await.unwrap_or_default();
                warn!(%method, url = %url, status = %status, body = %text, "transient error, will retry");
                attempt += 1;
                tokio::time::sleep(self.retry_delay).await;
                continue;
            }
            return Ok(response);
        }
    }

    /// Checks whether the store answers at all. Any HTTP status counts.
    pub(crate) async fn probe(&self, path: &str) -> Result<(), DraftError> {
        self.client
            .head(self.url(path))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| self.transport_error(e))
    }

    fn transport_error(&self, e: reqwest::Error) -> DraftError {
        if e.is_timeout() {
            DraftError::Timeout {
                duration: self.timeout,
            }
        } else {
            DraftError::Persistence {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            }
        }
    }
}

/// Decodes a JSON success body.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, DraftError> {
    let body = response.text().await.map_err(|e| DraftError::Persistence {
        message: format!("failed to read response body: {e}"),
        source: Some(Box::new(e)),
    })?;
    serde_json::from_str(&body).map_err(|e| DraftError::Persistence {
        message: format!("failed to parse store response: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Turns a non-success response into a persistence error carrying the body.
pub(crate) async fn status_error(context: &str, response: Response) -> DraftError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    DraftError::persistence(if body.is_empty() {
        format!("{context}: store returned {status}")
    } else {
        format!("{context}: store returned {status}: {body}")
    })
}

/// Encodes a request body.
pub(crate) fn to_body<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, DraftError> {
    serde_json::to_value(value).map_err(|e| DraftError::Internal(format!("failed to encode body: {e}")))
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> StoreClient {
        StoreClient::new(base_url, Duration::from_secs(5))
            .unwrap()
            .with_retry_delay(Duration::ZERO)
    }

    #[test]
    fn url_joins_without_double_slash() {
        let client = StoreClient::new("http://store.local/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://store.local/api");
        assert_eq!(client.url("/sessions/sess-1"), "http://store.local/api/sessions/sess-1");
        assert_eq!(client.url("configurations"), "http://store.local/api/configurations");
    }

    #[test]
    fn transient_statuses() {
        assert!(is_transient_error(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_error(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_transient_error(StatusCode::NOT_FOUND));
        assert!(!is_transient_error(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn idempotent_request_retries_once_on_503() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/sessions/s"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/sessions/s"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let response = client
            .send(Method::PUT, "/sessions/s", Some(&serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn post_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/configurations"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let response = client
            .send(Method::POST, "/configurations", Some(&serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let err = status_error("create configuration", response).await;
        assert!(err.to_string().contains("503"), "got: {err}");
    }

    #[tokio::test]
    async fn slow_store_maps_to_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/configurations"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let client = StoreClient::new(&server.uri(), Duration::from_millis(50))
            .unwrap()
            .with_retry_delay(Duration::ZERO);
        let err = client
            .send(Method::GET, "/configurations", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DraftError::Timeout { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn unreachable_store_is_a_persistence_error() {
        let client = test_client("http://127.0.0.1:9");
        let err = client.probe("/").await.unwrap_err();
        assert!(matches!(err, DraftError::Persistence { .. }), "got: {err:?}");
    }
}
