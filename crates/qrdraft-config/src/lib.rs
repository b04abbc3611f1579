// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the qrdraft engine.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, environment variable overrides, and miette
//! diagnostics with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use qrdraft_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("remote store: {}", config.remote.base_url);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::QrdraftConfig;

use std::path::{Path, PathBuf};

type Source = (String, String);

/// Load configuration from the XDG hierarchy and validate it.
///
/// Returns either a valid `QrdraftConfig` or every diagnostic found.
pub fn load_and_validate() -> Result<QrdraftConfig, Vec<ConfigError>> {
    checked(loader::load_config(), xdg_sources)
}

/// Load configuration from an explicit file path and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<QrdraftConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_path(path), || {
        read_source(path).into_iter().collect()
    })
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<QrdraftConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

/// Runs semantic validation, or turns a parse failure into diagnostics
/// anchored in `sources`.
fn checked(
    loaded: Result<QrdraftConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<Source>,
) -> Result<QrdraftConfig, Vec<ConfigError>> {
    let config =
        loaded.map_err(|err| diagnostic::figment_to_config_errors(err, &sources()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

fn read_source(path: &Path) -> Option<Source> {
    let content = std::fs::read_to_string(path).ok()?;
    Some((path.display().to_string(), content))
}

/// Contents of every XDG config file that exists, for error spans.
fn xdg_sources() -> Vec<Source> {
    let local = std::env::current_dir()
        .map(|dir| dir.join("qrdraft.toml"))
        .unwrap_or_else(|_| PathBuf::from("qrdraft.toml"));
    let user = dirs::config_dir().map(|dir| dir.join("qrdraft").join("qrdraft.toml"));
    let system = PathBuf::from("/etc/qrdraft/qrdraft.toml");

    std::iter::once(local)
        .chain(user)
        .chain(std::iter::once(system))
        .filter_map(|path| read_source(&path))
        .collect()
}
