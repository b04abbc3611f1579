// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-side stores: draft sessions and named configurations.

use async_trait::async_trait;

use crate::error::DraftError;
use crate::traits::adapter::StoreAdapter;
use crate::types::{DraftSession, NamedConfiguration, NewConfiguration};

/// Durable store of in-progress drafts keyed by client-generated session id.
#[async_trait]
pub trait SessionStore: StoreAdapter {
    /// Fetches the stored draft, or `None` when the session is unknown.
    async fn get_session(&self, session_id: &str) -> Result<Option<DraftSession>, DraftError>;

    /// Replaces the stored draft (last writer wins).
    async fn put_session(&self, session_id: &str, draft: &DraftSession) -> Result<(), DraftError>;

    /// Deletes the stored draft. Deleting an unknown session succeeds.
    async fn delete_session(&self, session_id: &str) -> Result<(), DraftError>;
}

/// Durable store of saved configurations.
#[async_trait]
pub trait ConfigurationStore: StoreAdapter {
    /// Lists every saved configuration.
    async fn list_configurations(&self) -> Result<Vec<NamedConfiguration>, DraftError>;

    /// Creates a configuration; the store assigns its permanent id.
    async fn create_configuration(
        &self,
        configuration: &NewConfiguration,
    ) -> Result<NamedConfiguration, DraftError>;

    /// Replaces a configuration body (edits and repairs share this path).
    async fn update_configuration(
        &self,
        configuration: &NamedConfiguration,
    ) -> Result<NamedConfiguration, DraftError>;

    /// Deletes a configuration by id.
    async fn delete_configuration(&self, id: &str) -> Result<(), DraftError>;
}
