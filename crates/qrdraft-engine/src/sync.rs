// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Two-tier draft synchronization.
//!
//! The local tier is fast and lossy: writes that fail are logged and dropped,
//! unreadable content reads as absent. The remote tier is written through a
//! single-flight debounced [`RemoteWriter`]. On load both tiers are read and
//! the newer draft by `updated_at` wins.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use qrdraft_core::traits::storage::keys;
use qrdraft_core::{DraftError, DraftSession, LocalCache, SessionStore};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::tracker;

/// Lossy wrapper over the local cache for draft and session-id slots.
pub struct LocalTier {
    cache: Arc<dyn LocalCache>,
    /// `updated_at` of the newest draft written so far; older snapshots are skipped.
    written: Mutex<Option<DateTime<Utc>>>,
}

impl LocalTier {
    pub fn new(cache: Arc<dyn LocalCache>) -> Self {
        Self {
            cache,
            written: Mutex::new(None),
        }
    }

    pub fn cache(&self) -> &Arc<dyn LocalCache> {
        &self.cache
    }

    /// Reads the cached draft. Missing, unreadable or malformed content is `None`.
    pub async fn read_draft(&self) -> Option<DraftSession> {
        let raw = match self.cache.get(keys::DRAFT).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "local draft unreadable");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(draft) => Some(draft),
            Err(e) => {
                warn!(error = %e, "discarding malformed local draft");
                None
            }
        }
    }

    /// Writes the draft unless a newer one was already written.
    pub async fn write_draft(&self, draft: &DraftSession) {
        let mut written = self.written.lock().await;
        if written.is_some_and(|at| draft.updated_at < at) {
            debug!(session_id = %draft.session_id, "skipping stale local write");
            return;
        }
        let raw = match serde_json::to_string(draft) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "failed to encode draft for local cache");
                return;
            }
        };
        match self.cache.set(keys::DRAFT, &raw).await {
            Ok(()) => *written = Some(draft.updated_at),
            Err(e) => warn!(error = %e, "local draft write dropped"),
        }
    }

    /// Removes the draft and the session id.
    pub async fn clear(&self) {
        let mut written = self.written.lock().await;
        *written = None;
        for key in [keys::DRAFT, keys::SESSION_ID] {
            if let Err(e) = self.cache.remove(key).await {
                warn!(error = %e, key, "failed to clear local cache entry");
            }
        }
    }

    pub async fn session_id(&self) -> Option<String> {
        match self.cache.get(keys::SESSION_ID).await {
            Ok(id) => id.filter(|id| !id.is_empty()),
            Err(e) => {
                warn!(error = %e, "session id unreadable");
                None
            }
        }
    }

    pub async fn store_session_id(&self, session_id: &str) {
        if let Err(e) = self.cache.set(keys::SESSION_ID, session_id).await {
            warn!(error = %e, "failed to persist session id");
        }
    }
}

/// Which tier a resolved draft came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftSource {
    Local,
    Remote,
    Fresh,
}

/// Picks between the local and remote copies.
///
/// Remote wins when local is absent or empty, or when remote is strictly
/// newer. A remote pick gets its completion re-derived.
pub fn choose(
    local: Option<DraftSession>,
    remote: Option<DraftSession>,
) -> Option<(DraftSession, DraftSource)> {
    let pick_remote = match (&local, &remote) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(l), Some(r)) => l.is_empty() || r.updated_at > l.updated_at,
    };
    if pick_remote {
        let mut draft = remote?;
        tracker::rederive(&mut draft);
        Some((draft, DraftSource::Remote))
    } else {
        local.map(|draft| (draft, DraftSource::Local))
    }
}

/// Reads both tiers for `session_id` and returns the winner.
///
/// A remote failure degrades to the local copy.
pub async fn resolve(
    local: &LocalTier,
    remote: &dyn SessionStore,
    session_id: &str,
) -> (DraftSession, DraftSource) {
    let local_draft = local
        .read_draft()
        .await
        .filter(|d| d.session_id == session_id);
    let remote_draft = match remote.get_session(session_id).await {
        Ok(draft) => draft,
        Err(e) => {
            warn!(session_id, error = %e, "remote session unavailable, using local copy");
            None
        }
    };
    match choose(local_draft, remote_draft) {
        Some((mut draft, source)) => {
            draft.session_id = session_id.to_string();
            debug!(session_id, ?source, "draft resolved");
            (draft, source)
        }
        None => (DraftSession::new(session_id), DraftSource::Fresh),
    }
}

/// Single-flight debounced writer to the remote session store.
///
/// [`RemoteWriter::schedule`] replaces the pending snapshot; the background
/// task sends it once the quiet period passes without another change. At
/// most one PUT is in flight; edits arriving meanwhile yield one follow-up.
pub struct RemoteWriter {
    store: Arc<dyn SessionStore>,
    pending: watch::Sender<Option<DraftSession>>,
    flight: Mutex<()>,
    quiet: Duration,
}

impl RemoteWriter {
    pub fn new(store: Arc<dyn SessionStore>, quiet: Duration) -> Arc<Self> {
        let (pending, _) = watch::channel(None);
        Arc::new(Self {
            store,
            pending,
            flight: Mutex::new(()),
            quiet,
        })
    }

    /// Replaces the pending snapshot unless it is older than the one queued.
    pub fn schedule(&self, draft: DraftSession) {
        self.pending.send_if_modified(|slot| {
            if slot
                .as_ref()
                .is_some_and(|queued| queued.updated_at > draft.updated_at)
            {
                return false;
            }
            *slot = Some(draft);
            true
        });
    }

    pub fn has_pending(&self) -> bool {
        self.pending.borrow().is_some()
    }

    fn take_pending(&self) -> Option<DraftSession> {
        self.take_pending_if(|_| true)
    }

    fn take_pending_if(&self, predicate: impl FnOnce(&DraftSession) -> bool) -> Option<DraftSession> {
        let mut taken = None;
        self.pending.send_if_modified(|slot| {
            if slot.as_ref().is_some_and(predicate) {
                taken = slot.take();
            }
            false
        });
        taken
    }

    async fn write(&self, draft: &DraftSession) -> Result<(), DraftError> {
        self.store.put_session(&draft.session_id, draft).await
    }

    /// Sends the pending snapshot now, skipping the quiet period.
    pub async fn flush(&self) -> Result<(), DraftError> {
        let _flight = self.flight.lock().await;
        match self.take_pending() {
            Some(draft) => {
                self.write(&draft).await?;
                debug!(session_id = %draft.session_id, "pending draft flushed");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Drops a pending snapshot of `session_id` and deletes the remote session.
    ///
    /// Waits for an in-flight PUT first so it cannot land after the delete.
    /// Snapshots of other sessions stay queued.
    pub async fn discard_and_delete(&self, session_id: &str) -> Result<(), DraftError> {
        let _flight = self.flight.lock().await;
        if self
            .take_pending_if(|draft| draft.session_id == session_id)
            .is_some()
        {
            debug!(session_id, "pending remote write cancelled");
        }
        self.store.delete_session(session_id).await
    }

    /// Spawns the debounce loop. It stops when `cancel` fires.
    pub fn spawn(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let writer = Arc::clone(self);
        let mut rx = self.pending.subscribe();
        tokio::spawn(async move {
            info!(quiet_ms = writer.quiet.as_millis() as u64, "remote writer started");
            'outer: loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = rx.changed() => if changed.is_err() { break },
                }

                // Wait out the quiet period, restarting it on every change.
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break 'outer,
                        _ = tokio::time::sleep(writer.quiet) => break,
                        changed = rx.changed() => if changed.is_err() { break 'outer },
                    }
                }

                let _flight = writer.flight.lock().await;
                let Some(draft) = writer.take_pending() else {
                    continue;
                };
                match writer.write(&draft).await {
                    Ok(()) => debug!(session_id = %draft.session_id, "remote draft written"),
                    Err(e) => {
                        warn!(session_id = %draft.session_id, error = %e, "remote draft write failed")
                    }
                }
            }
            debug!("remote writer stopped");
        })
    }
}
