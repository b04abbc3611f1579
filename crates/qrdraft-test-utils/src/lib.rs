// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for qrdraft integration tests.
//!
//! Provides in-memory store doubles and a harness for fast, deterministic
//! tests without a database or HTTP server.
//!
//! # Components
//!
//! - [`MockSessionStore`] - Session store recording every PUT and DELETE
//! - [`MockConfigurationStore`] - Configuration store with scripted ids and failures
//! - [`MemoryLocalCache`] / [`MemoryRepairLog`] - Per-device persistence in memory
//! - [`TestHarness`] - A draft engine wired to all of the above

pub mod harness;
pub mod memory_cache;
pub mod mock_configurations;
pub mod mock_sessions;

pub use harness::{TEST_RENDER_BASE, TestHarness};
pub use memory_cache::{MemoryLocalCache, MemoryRepairLog};
pub use mock_configurations::MockConfigurationStore;
pub use mock_sessions::{MockSessionStore, SessionEvent};
