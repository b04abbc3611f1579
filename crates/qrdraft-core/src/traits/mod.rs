// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store trait definitions.
//!
//! All stores extend the [`StoreAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod remote;
pub mod storage;

pub use adapter::StoreAdapter;
pub use remote::{ConfigurationStore, SessionStore};
pub use storage::{LocalCache, RepairLog};
