// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Draft lifecycle engine for the qrdraft configuration wizard.
//!
//! The [`DraftEngine`] is the central coordinator that:
//! - Tracks which wizard sections are complete
//! - Mirrors the draft to the local cache and, debounced, to the session store
//! - Merges resources pushed or left in the inbox by a sibling editor
//! - Promotes a complete draft into a named configuration
//! - Audits saved configurations and repairs stale resource links

pub mod audit;
pub mod engine;
pub mod ingest;
pub mod save;
pub mod shutdown;
pub mod sync;
pub mod tracker;

pub use audit::AuditReport;
pub use engine::{DraftEngine, EngineConfig, Stores};
pub use ingest::ResourceBus;
pub use sync::DraftSource;
