// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-device persistence: the ephemeral key/value cache and the repair log.

use async_trait::async_trait;

use crate::error::DraftError;
use crate::traits::adapter::StoreAdapter;
use crate::types::RepairRecord;

/// Well-known local cache keys.
pub mod keys {
    /// Serialized in-progress draft.
    pub const DRAFT: &str = "draft";
    /// Session identifier reused until the draft is cleared.
    pub const SESSION_ID: &str = "session_id";
    /// Inbox slot holding a single pending resource descriptor.
    pub const PENDING_RESOURCE: &str = "pendingResource";
    /// Inbox slot holding a list of pending resource descriptors.
    pub const PENDING_RESOURCES: &str = "pendingResources";

    /// Inbox keys in the order the poller drains them.
    pub const INBOX: [&str; 2] = [PENDING_RESOURCE, PENDING_RESOURCES];
}

/// Key/value persistence that survives restarts on one device/profile.
///
/// Values are opaque strings (JSON in practice). Callers that must never
/// fail on cache errors wrap this trait and log instead of propagating.
#[async_trait]
pub trait LocalCache: StoreAdapter {
    /// Reads the raw value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, DraftError>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), DraftError>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), DraftError>;
}

/// Append-only history of consistency repairs.
#[async_trait]
pub trait RepairLog: Send + Sync {
    /// Appends records in order.
    async fn append(&self, records: &[RepairRecord]) -> Result<(), DraftError>;

    /// Returns all records, oldest first.
    async fn records(&self) -> Result<Vec<RepairRecord>, DraftError>;
}
