// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote session store over `/sessions/{id}`.

use async_trait::async_trait;
use qrdraft_core::{AdapterType, DraftError, DraftSession, HealthStatus, SessionStore, StoreAdapter};
use reqwest::{Method, StatusCode};
use tracing::debug;

use crate::client::{StoreClient, read_json, status_error, to_body};

/// HTTP-backed [`SessionStore`].
#[derive(Debug, Clone)]
pub struct HttpSessionStore {
    client: StoreClient,
}

impl HttpSessionStore {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }
}

fn session_path(session_id: &str) -> String {
    format!("/sessions/{session_id}")
}

#[async_trait]
impl StoreAdapter for HttpSessionStore {
    fn name(&self) -> &str {
        "http-session-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::SessionStore
    }

    async fn health_check(&self) -> Result<HealthStatus, DraftError> {
        Ok(match self.client.probe("/sessions").await {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }
}

#[async_trait]
impl SessionStore for HttpSessionStore {
    async fn get_session(&self, session_id: &str) -> Result<Option<DraftSession>, DraftError> {
        let response = self
            .client
            .send(Method::GET, &session_path(session_id), None)
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!(session_id, "no remote session");
                Ok(None)
            }
            status if status.is_success() => read_json(response).await.map(Some),
            _ => Err(status_error("get session", response).await),
        }
    }

    async fn put_session(&self, session_id: &str, draft: &DraftSession) -> Result<(), DraftError> {
        let body = to_body(draft)?;
        let response = self
            .client
            .send(Method::PUT, &session_path(session_id), Some(&body))
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(status_error("put session", response).await)
        }
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), DraftError> {
        let response = self
            .client
            .send(Method::DELETE, &session_path(session_id), None)
            .await?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(status_error("delete session", response).await)
        }
    }
}
