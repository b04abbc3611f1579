// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown coordination with signal handling.
//!
//! Installs handlers for SIGTERM and SIGINT (Ctrl+C), triggering a
//! [`CancellationToken`]. Long-running commands wait on the token and then
//! call [`drain`] so the last pending remote write is not lost.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::DraftEngine;

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                        _ = token_clone.cancelled() => return,
                    }
                }
                Err(e) => {
                    warn!(error = %e, "SIGTERM handler unavailable, listening for Ctrl+C only");
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = token_clone.cancelled() => return,
                    }
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                _ = ctrl_c => info!("received Ctrl+C, initiating shutdown"),
                _ = token_clone.cancelled() => return,
            }
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Shuts the engine down, giving the final remote write up to `timeout`.
///
/// Returns `false` when the timeout elapsed first.
pub async fn drain(engine: &DraftEngine, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, engine.shutdown()).await {
        Ok(()) => true,
        Err(_) => {
            warn!(
                timeout_ms = timeout.as_millis() as u64,
                "shutdown timed out, pending draft may not have reached the remote store"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::engine::{EngineConfig, Stores};
    use qrdraft_test_utils::{MemoryLocalCache, MockConfigurationStore, MockSessionStore};

    #[tokio::test]
    async fn install_signal_handler_returns_token() {
        let token = install_signal_handler();
        assert!(!token.is_cancelled());
        token.cancel();
    }

    #[tokio::test]
    async fn drain_flushes_pending_write() {
        let sessions = Arc::new(MockSessionStore::new());
        let stores = Stores {
            cache: Arc::new(MemoryLocalCache::new()),
            sessions: sessions.clone(),
            configurations: Arc::new(MockConfigurationStore::new()),
            repair_log: None,
        };
        let config = EngineConfig {
            debounce: Duration::from_secs(3600),
            ..EngineConfig::default()
        };
        let engine = DraftEngine::open(config, stores).await;
        engine.start();
        engine
            .mark_touched(qrdraft_core::SectionIndex::RESOURCES)
            .await
            .unwrap();

        assert!(drain(&engine, Duration::from_secs(5)).await);
        assert_eq!(sessions.puts().len(), 1);
    }
}
