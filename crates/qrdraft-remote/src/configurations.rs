// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable configuration store over `/configurations`.

use async_trait::async_trait;
use qrdraft_core::{
    AdapterType, ConfigurationStore, DraftError, HealthStatus, NamedConfiguration,
    NewConfiguration, StoreAdapter,
};
use reqwest::{Method, StatusCode};
use tracing::info;

use crate::client::{StoreClient, read_json, status_error, to_body};

const CONFIGURATIONS: &str = "/configurations";

/// HTTP-backed [`ConfigurationStore`].
#[derive(Debug, Clone)]
pub struct HttpConfigurationStore {
    client: StoreClient,
}

impl HttpConfigurationStore {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StoreAdapter for HttpConfigurationStore {
    fn name(&self) -> &str {
        "http-configuration-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::ConfigurationStore
    }

    async fn health_check(&self) -> Result<HealthStatus, DraftError> {
        Ok(match self.client.probe(CONFIGURATIONS).await {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }
}

#[async_trait]
impl ConfigurationStore for HttpConfigurationStore {
    async fn list_configurations(&self) -> Result<Vec<NamedConfiguration>, DraftError> {
        let response = self.client.send(Method::GET, CONFIGURATIONS, None).await?;
        if !response.status().is_success() {
            return Err(status_error("list configurations", response).await);
        }
        read_json(response).await
    }

    async fn create_configuration(
        &self,
        configuration: &NewConfiguration,
    ) -> Result<NamedConfiguration, DraftError> {
        let body = to_body(configuration)?;
        let response = self
            .client
            .send(Method::POST, CONFIGURATIONS, Some(&body))
            .await?;
        if !response.status().is_success() {
            return Err(status_error("create configuration", response).await);
        }
        let created: NamedConfiguration = read_json(response).await?;
        info!(id = %created.id, name = %created.name, "configuration created");
        Ok(created)
    }

    async fn update_configuration(
        &self,
        configuration: &NamedConfiguration,
    ) -> Result<NamedConfiguration, DraftError> {
        let body = to_body(configuration)?;
        let response = self
            .client
            .send(
                Method::PUT,
                &format!("{CONFIGURATIONS}/{}", configuration.id),
                Some(&body),
            )
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(DraftError::NotFound(configuration.id.clone())),
            StatusCode::NO_CONTENT => Ok(configuration.clone()),
            status if status.is_success() => read_json(response).await,
            _ => Err(status_error("update configuration", response).await),
        }
    }

    async fn delete_configuration(&self, id: &str) -> Result<(), DraftError> {
        let response = self
            .client
            .send(Method::DELETE, &format!("{CONFIGURATIONS}/{id}"), None)
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(DraftError::NotFound(id.to_string())),
            status if status.is_success() => Ok(()),
            _ => Err(status_error("delete configuration", response).await),
        }
    }
}
