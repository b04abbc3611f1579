// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP adapters for the remote session store and the durable configuration
//! store.
//!
//! Both stores share one [`StoreClient`] (and so one connection pool) built
//! from the `[remote]` config section.

pub mod client;
pub mod configurations;
pub mod sessions;

use qrdraft_config::model::RemoteConfig;
use qrdraft_core::DraftError;
use tracing::info;

pub use client::StoreClient;
pub use configurations::HttpConfigurationStore;
pub use sessions::HttpSessionStore;

/// Builds both remote stores over a shared client.
pub fn connect(
    config: &RemoteConfig,
) -> Result<(HttpSessionStore, HttpConfigurationStore), DraftError> {
    let client = StoreClient::from_config(config)?;
    info!(base_url = %client.base_url(), timeout_secs = config.timeout_secs, "remote stores configured");
    Ok((
        HttpSessionStore::new(client.clone()),
        HttpConfigurationStore::new(client),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use qrdraft_core::{AdapterType, StoreAdapter};

    #[test]
    fn connect_builds_both_stores() {
        let config = RemoteConfig {
            base_url: "http://127.0.0.1:8080/api".into(),
            render_base_url: None,
            timeout_secs: 3,
        };
        let (sessions, configurations) = connect(&config).unwrap();
        assert_eq!(sessions.adapter_type(), AdapterType::SessionStore);
        assert_eq!(configurations.adapter_type(), AdapterType::ConfigurationStore);
        assert_eq!(sessions.name(), "http-session-store");
    }
}
