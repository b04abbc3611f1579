// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the local cache tables.

pub mod kv;
pub mod repairs;
