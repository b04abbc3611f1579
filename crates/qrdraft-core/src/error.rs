// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the qrdraft draft engine.

use thiserror::Error;

use crate::types::SectionIndex;

/// The primary error type used across all store traits and engine operations.
#[derive(Debug, Error)]
pub enum DraftError {
    /// Save preconditions failed (incomplete sections or missing name).
    ///
    /// Always recoverable: the draft is left untouched.
    #[error("{}", validation_message(.missing_sections, .missing_name))]
    Validation {
        missing_sections: Vec<SectionIndex>,
        missing_name: bool,
    },

    /// Ephemeral local cache failure (quota, corrupt content, database error).
    #[error("local persistence error: {source}")]
    LocalPersistence {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Remote session or configuration store failure.
    #[error("persistence error: {message}")]
    Persistence {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A referenced draft resource or configuration does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Configuration errors (invalid TOML, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DraftError {
    /// Builds a remote persistence error without an underlying source.
    pub fn persistence(message: impl Into<String>) -> Self {
        DraftError::Persistence {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true for save-time precondition failures.
    pub fn is_validation(&self) -> bool {
        matches!(self, DraftError::Validation { .. })
    }
}

fn validation_message(missing_sections: &[SectionIndex], missing_name: &bool) -> String {
    let mut parts = Vec::new();
    match missing_sections {
        [] => {}
        [single] => parts.push(format!("section {single} not configured")),
        many => {
            let list = many
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            parts.push(format!("sections {list} not configured"));
        }
    }
    if *missing_name {
        parts.push("configuration name is required".to_string());
    }
    if parts.is_empty() {
        "validation failed".to_string()
    } else {
        parts.join("; ")
    }
}
