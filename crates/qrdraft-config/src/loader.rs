// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./qrdraft.toml` > `~/.config/qrdraft/qrdraft.toml` > `/etc/qrdraft/qrdraft.toml`
//! with environment variable overrides via `QRDRAFT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::QrdraftConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/qrdraft/qrdraft.toml` (system-wide)
/// 3. `~/.config/qrdraft/qrdraft.toml` (user XDG config)
/// 4. `./qrdraft.toml` (local directory)
/// 5. `QRDRAFT_*` environment variables
pub fn load_config() -> Result<QrdraftConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<QrdraftConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(QrdraftConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<QrdraftConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(QrdraftConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for XDG config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(QrdraftConfig::default()))
        .merge(Toml::file("/etc/qrdraft/qrdraft.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("qrdraft/qrdraft.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("qrdraft.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")`: `QRDRAFT_REMOTE_BASE_URL`
/// must map to `remote.base_url`, not `remote.base.url`.
fn env_provider() -> Env {
    Env::prefixed("QRDRAFT_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env var name to a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    const SECTIONS: [&str; 5] = ["agent", "remote", "storage", "sync", "ingest"];
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(map_env_key("remote_base_url"), "remote.base_url");
        assert_eq!(map_env_key("sync_debounce_ms"), "sync.debounce_ms");
        assert_eq!(map_env_key("ingest_poll_interval_ms"), "ingest.poll_interval_ms");
        assert_eq!(map_env_key("unknown_key"), "unknown_key");
    }
}
