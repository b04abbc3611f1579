// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the qrdraft configuration draft engine.
//!
//! This crate provides the domain types (drafts, resources, saved
//! configurations), the error taxonomy, resource link handling, and the store
//! traits implemented by the storage, remote and test-utils crates.

pub mod error;
pub mod link;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::DraftError;
pub use types::{
    AdapterType, ConsistencyIssue, DraftSession, EmailTemplates, HealthStatus,
    NamedConfiguration, NewConfiguration, RepairRecord, ResourceSnapshot, SectionIndex,
    SectionPayloads, TemplateAttachments, TemplateKind, TemporaryResource,
};

pub use traits::{ConfigurationStore, LocalCache, RepairLog, SessionStore, StoreAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_error_has_all_variants() {
        let _validation = DraftError::Validation {
            missing_sections: vec![],
            missing_name: true,
        };
        let _local = DraftError::LocalPersistence {
            source: Box::new(std::io::Error::other("test")),
        };
        let _remote = DraftError::Persistence {
            message: "test".into(),
            source: None,
        };
        let _not_found = DraftError::NotFound("tmp-1".into());
        let _config = DraftError::Config("test".into());
        let _timeout = DraftError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = DraftError::Internal("test".into());
    }

    #[test]
    fn adapter_type_round_trips() {
        use std::str::FromStr;

        for variant in [
            AdapterType::LocalCache,
            AdapterType::SessionStore,
            AdapterType::ConfigurationStore,
        ] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn all_store_traits_are_exported() {
        fn _assert_local_cache<T: LocalCache>() {}
        fn _assert_session_store<T: SessionStore>() {}
        fn _assert_configuration_store<T: ConfigurationStore>() {}
        fn _assert_repair_log<T: RepairLog>() {}
    }
}
