// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the qrdraft engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level qrdraft configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QrdraftConfig {
    /// Process-level settings (logging).
    #[serde(default)]
    pub agent: AgentConfig,

    /// Remote session and configuration store endpoints.
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Local cache database settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Debounced remote draft synchronization.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Externally created resource ingestion.
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Process-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Remote store endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    /// Base URL serving `/sessions` and `/configurations`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Base URL used when building resource render links.
    /// Falls back to `base_url` when unset.
    #[serde(default)]
    pub render_base_url: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            render_base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RemoteConfig {
    /// Base URL for resource render links.
    pub fn render_base(&self) -> &str {
        self.render_base_url.as_deref().unwrap_or(&self.base_url)
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Local cache storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("qrdraft").join("qrdraft.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("qrdraft.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Remote draft synchronization settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Quiet period before a burst of edits is written to the session store.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    800
}

/// Resource ingestion settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    /// Run the inbox poller alongside the push channel.
    #[serde(default = "default_poll_enabled")]
    pub poll_enabled: bool,

    /// Inbox poll interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Buffer size of the push channel.
    #[serde(default = "default_push_capacity")]
    pub push_capacity: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            poll_enabled: default_poll_enabled(),
            poll_interval_ms: default_poll_interval_ms(),
            push_capacity: default_push_capacity(),
        }
    }
}

fn default_poll_enabled() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_push_capacity() -> usize {
    64
}
