// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `qrdraft watch` command implementation.
//!
//! Keeps an engine running with its background tasks: the debounced remote
//! writer, the push consumer and the inbox poller. Runs the configuration
//! audit once on startup and flushes on SIGINT/SIGTERM.

use qrdraft_config::QrdraftConfig;
use qrdraft_core::DraftError;
use qrdraft_engine::shutdown;
use tracing::{info, warn};

use crate::commands::Runtime;

pub async fn run_watch(config: &QrdraftConfig) -> Result<(), DraftError> {
    info!("starting qrdraft watch");

    let runtime = Runtime::open(config).await?;
    match runtime.engine.audit_configurations().await {
        Ok(report) if report.is_clean() => info!("saved configurations consistent"),
        Ok(report) => info!(
            issues = report.issues.len(),
            repaired = report.repaired.len(),
            failed = report.failed.len(),
            "saved configurations audited"
        ),
        Err(e) => warn!(error = %e, "configuration audit skipped"),
    }

    let cancel = shutdown::install_signal_handler();
    runtime.engine.start();
    info!(
        session_id = %runtime.engine.session_id().await,
        poll_enabled = config.ingest.poll_enabled,
        "watching draft"
    );

    cancel.cancelled().await;
    runtime.close().await;
    info!("qrdraft watch stopped");
    Ok(())
}
