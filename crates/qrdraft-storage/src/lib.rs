// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed local cache for qrdraft.
//!
//! Holds the draft snapshot, the session id, the resource inbox keys and the
//! link repair log. Schema changes ship as embedded refinery migrations and
//! all access is serialized through a single `tokio-rusqlite` connection.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteLocalCache;
pub use database::Database;
