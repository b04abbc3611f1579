// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as URL schemes, non-empty paths and non-zero intervals.

use crate::diagnostic::ConfigError;
use crate::model::QrdraftConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &QrdraftConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "agent.log_level `{}` must be one of: {}",
                config.agent.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    check_http_url(&mut errors, "remote.base_url", &config.remote.base_url);
    if let Some(render) = &config.remote.render_base_url {
        check_http_url(&mut errors, "remote.render_base_url", render);
    }

    if config.remote.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "remote.timeout_secs must be at least 1".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.ingest.poll_enabled && config.ingest.poll_interval_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "ingest.poll_interval_ms must be greater than 0 when polling is enabled"
                .to_string(),
        });
    }

    if config.ingest.push_capacity == 0 {
        errors.push(ConfigError::Validation {
            message: "ingest.push_capacity must be at least 1".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_http_url(errors: &mut Vec<ConfigError>, key: &str, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        errors.push(ConfigError::Validation {
            message: format!("{key} must not be empty"),
        });
    } else if !(value.starts_with("http://") || value.starts_with("https://")) {
        errors.push(ConfigError::Validation {
            message: format!("{key} `{value}` must start with http:// or https://"),
        });
    }
}
