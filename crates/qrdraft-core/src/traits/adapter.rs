// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base trait that every store adapter implements.

use async_trait::async_trait;

use crate::error::DraftError;
use crate::types::{AdapterType, HealthStatus};

/// The base trait for all qrdraft store adapters.
///
/// Every store (local cache, session store, configuration store) implements
/// this trait, which provides identity and health check capabilities.
#[async_trait]
pub trait StoreAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the semantic version of this adapter.
    fn version(&self) -> semver::Version;

    /// Returns the kind of store this adapter fronts.
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, DraftError>;
}
