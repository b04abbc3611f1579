// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The draft engine facade.
//!
//! [`DraftEngine`] owns the in-memory draft and the configuration list and
//! wires the tracker, both sync tiers, ingestion, promotion and auditing
//! together. Every mutation goes through one path: apply under the draft
//! lock, re-derive completion, release the lock, then write the local tier
//! and schedule the remote write.

use std::sync::{Arc, Weak};
use std::time::Duration;

use qrdraft_config::QrdraftConfig;
use qrdraft_core::link::{self, DRAFT_PLACEHOLDER};
use qrdraft_core::types::generate_session_id;
use qrdraft_core::{
    ConfigurationStore, DraftError, DraftSession, LocalCache, NamedConfiguration, RepairLog,
    RepairRecord, SectionIndex, SessionStore, TemplateKind, TemporaryResource,
};
use serde_json::Value;
use tokio::sync::{Mutex, Notify, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::audit::{self, AuditReport};
use crate::ingest::{self, InboxPoller, ResourceBus};
use crate::save;
use crate::sync::{self, DraftSource, LocalTier, RemoteWriter};
use crate::tracker;

/// Runtime knobs for the engine, usually derived from [`QrdraftConfig`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Quiet period before a remote session write.
    pub debounce: Duration,
    pub poll_enabled: bool,
    pub poll_interval: Duration,
    /// Capacity of the push channel.
    pub push_capacity: usize,
    /// Base URL for generated resource links.
    pub render_base: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_config(&QrdraftConfig::default())
    }
}

impl EngineConfig {
    pub fn from_config(config: &QrdraftConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.sync.debounce_ms),
            poll_enabled: config.ingest.poll_enabled,
            poll_interval: Duration::from_millis(config.ingest.poll_interval_ms),
            push_capacity: config.ingest.push_capacity,
            render_base: config.remote.render_base().to_string(),
        }
    }
}

/// The stores an engine talks to.
#[derive(Clone)]
pub struct Stores {
    pub cache: Arc<dyn LocalCache>,
    pub sessions: Arc<dyn SessionStore>,
    pub configurations: Arc<dyn ConfigurationStore>,
    pub repair_log: Option<Arc<dyn RepairLog>>,
}

struct Inner {
    config: EngineConfig,
    draft: Mutex<DraftSession>,
    /// Held while a draft snapshot is written to the tiers, so a reset
    /// never interleaves with the persistence of an edit.
    persist: Mutex<()>,
    configurations: Mutex<Vec<NamedConfiguration>>,
    local: LocalTier,
    sessions: Arc<dyn SessionStore>,
    configuration_store: Arc<dyn ConfigurationStore>,
    repair_log: Option<Arc<dyn RepairLog>>,
    writer: Arc<RemoteWriter>,
    poller: InboxPoller,
    bus: ResourceBus,
    bus_rx: std::sync::Mutex<Option<mpsc::Receiver<TemporaryResource>>>,
    refocus: Arc<Notify>,
    cancel: CancellationToken,
    tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Handle to the draft engine. Clones share state.
#[derive(Clone)]
pub struct DraftEngine {
    inner: Arc<Inner>,
}

impl DraftEngine {
    /// Creates an engine holding an unloaded fresh draft.
    ///
    /// Call [`DraftEngine::load`] to pick up persisted state and
    /// [`DraftEngine::start`] to run the background tasks.
    pub fn new(config: EngineConfig, stores: Stores) -> Self {
        let (bus, bus_rx) = ResourceBus::channel(config.push_capacity);
        let writer = RemoteWriter::new(Arc::clone(&stores.sessions), config.debounce);
        Self {
            inner: Arc::new(Inner {
                draft: Mutex::new(DraftSession::fresh()),
                persist: Mutex::new(()),
                configurations: Mutex::new(Vec::new()),
                local: LocalTier::new(Arc::clone(&stores.cache)),
                poller: InboxPoller::new(stores.cache),
                sessions: stores.sessions,
                configuration_store: stores.configurations,
                repair_log: stores.repair_log,
                writer,
                bus,
                bus_rx: std::sync::Mutex::new(Some(bus_rx)),
                refocus: Arc::new(Notify::new()),
                cancel: CancellationToken::new(),
                tasks: std::sync::Mutex::new(Vec::new()),
                config,
            }),
        }
    }

    /// Creates an engine and loads the persisted draft.
    pub async fn open(config: EngineConfig, stores: Stores) -> Self {
        let engine = Self::new(config, stores);
        engine.load().await;
        engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Resolves the draft from both tiers, generating a session id if the
    /// profile has none yet.
    pub async fn load(&self) -> DraftSession {
        let inner = &self.inner;
        let session_id = match inner.local.session_id().await {
            Some(id) => id,
            None => {
                let id = generate_session_id();
                inner.local.store_session_id(&id).await;
                debug!(session_id = %id, "new session id generated");
                id
            }
        };

        let (draft, source) = sync::resolve(&inner.local, inner.sessions.as_ref(), &session_id).await;
        if source == DraftSource::Remote {
            inner.local.write_draft(&draft).await;
        }
        info!(
            session_id = %draft.session_id,
            ?source,
            completed = draft.completed_sections.len(),
            resources = draft.temporary_resources.len(),
            "draft loaded"
        );
        *inner.draft.lock().await = draft.clone();
        draft
    }

    /// Snapshot of the current draft.
    pub async fn draft(&self) -> DraftSession {
        self.inner.draft.lock().await.clone()
    }

    pub async fn session_id(&self) -> String {
        self.inner.draft.lock().await.session_id.clone()
    }

    /// Applies `f` to the draft. When it reports a change the draft is
    /// touched, re-derived and persisted to both tiers.
    async fn mutate<R>(
        &self,
        f: impl FnOnce(&mut DraftSession) -> Result<(R, bool), DraftError>,
    ) -> Result<R, DraftError> {
        let _persist = self.inner.persist.lock().await;
        let (result, snapshot) = {
            let mut draft = self.inner.draft.lock().await;
            let (result, changed) = f(&mut draft)?;
            if !changed {
                return Ok(result);
            }
            draft.touch();
            tracker::rederive(&mut draft);
            (result, draft.clone())
        };
        self.inner.local.write_draft(&snapshot).await;
        self.inner.writer.schedule(snapshot);
        Ok(result)
    }

    /// Replaces a section payload and marks the section touched.
    pub async fn update_section(&self, section: SectionIndex, payload: Value) -> Result<(), DraftError> {
        self.mutate(|draft| {
            draft.sections.set(section, payload);
            tracker::mark_touched(draft, section);
            Ok(((), true))
        })
        .await
    }

    pub async fn mark_touched(&self, section: SectionIndex) -> Result<(), DraftError> {
        self.mutate(|draft| {
            let changed = !draft.completed_sections.contains(&section);
            tracker::mark_touched(draft, section);
            Ok(((), changed))
        })
        .await
    }

    /// Adds a resource created in the wizard itself.
    ///
    /// Without an explicit target the resource gets a render link carrying
    /// the draft placeholder, rewritten on save.
    pub async fn add_resource(
        &self,
        name: &str,
        target: Option<String>,
    ) -> Result<TemporaryResource, DraftError> {
        let mut resource = TemporaryResource::new(name, None);
        resource.target = Some(target.unwrap_or_else(|| {
            link::render_link(&self.inner.config.render_base, DRAFT_PLACEHOLDER, &resource.id)
        }));
        self.ingest(vec![resource.clone()]).await;
        Ok(resource)
    }

    /// Merges resources into the draft, skipping ids already present.
    pub async fn ingest(&self, resources: Vec<TemporaryResource>) -> usize {
        let result = self
            .mutate(|draft| {
                let appended = ingest::merge(draft, resources);
                Ok((appended, appended > 0))
            })
            .await;
        // The merge closure never fails.
        result.unwrap_or_default()
    }

    pub async fn remove_resource(&self, id: &str) -> Result<(), DraftError> {
        self.mutate(|draft| {
            let position = draft
                .temporary_resources
                .iter()
                .position(|r| r.id == id)
                .ok_or_else(|| DraftError::NotFound(id.to_string()))?;
            draft.temporary_resources.remove(position);
            draft.selected_resource_ids.remove(id);
            Ok(((), true))
        })
        .await
    }

    pub async fn set_resource_selected(&self, id: &str, selected: bool) -> Result<(), DraftError> {
        self.mutate(|draft| {
            if draft.resource(id).is_none() {
                return Err(DraftError::NotFound(id.to_string()));
            }
            let changed = if selected {
                draft.selected_resource_ids.insert(id.to_string())
            } else {
                draft.selected_resource_ids.remove(id)
            };
            Ok(((), changed))
        })
        .await
    }

    pub async fn set_resource_customizations(
        &self,
        id: &str,
        customizations: Option<Value>,
    ) -> Result<(), DraftError> {
        self.mutate(|draft| {
            let resource = draft
                .resource_mut(id)
                .ok_or_else(|| DraftError::NotFound(id.to_string()))?;
            let changed = resource.customizations != customizations;
            resource.customizations = customizations;
            Ok(((), changed))
        })
        .await
    }

    pub async fn attach_template(&self, kind: TemplateKind, payload: Value) -> Result<(), DraftError> {
        self.mutate(|draft| {
            *draft.templates.slot_mut(kind) = Some(payload);
            Ok(((), true))
        })
        .await
    }

    pub async fn detach_template(&self, kind: TemplateKind) -> Result<(), DraftError> {
        self.mutate(|draft| {
            let changed = draft.templates.slot_mut(kind).take().is_some();
            Ok(((), changed))
        })
        .await
    }

    /// One pass over the local-cache inbox. Returns the number of resources
    /// appended.
    pub async fn poll_inbox(&self) -> usize {
        let mut appended = 0;
        for entry in self.inner.poller.pending().await {
            appended += self.ingest(entry.resources.clone()).await;
            self.inner.poller.acknowledge(&entry).await;
        }
        appended
    }

    /// Signals that the user came back; triggers an immediate inbox poll.
    pub fn refocus(&self) {
        self.inner.refocus.notify_one();
    }

    /// Producer handle for pushing resources into this engine.
    pub fn resource_bus(&self) -> ResourceBus {
        self.inner.bus.clone()
    }

    /// Spawns the remote writer, the push consumer and (when enabled) the
    /// inbox poller. Calling it again is a no-op.
    pub fn start(&self) {
        let Some(rx) = self
            .inner
            .bus_rx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
        else {
            return;
        };

        let cancel = self.inner.cancel.clone();
        let mut handles = vec![
            self.inner.writer.spawn(cancel.child_token()),
            spawn_push_consumer(Arc::downgrade(&self.inner), rx, cancel.child_token()),
        ];
        if self.inner.config.poll_enabled {
            handles.push(spawn_inbox_poller(
                Arc::downgrade(&self.inner),
                Arc::clone(&self.inner.refocus),
                self.inner.config.poll_interval,
                cancel.child_token(),
            ));
        }
        info!(poll_enabled = self.inner.config.poll_enabled, "draft engine started");
        self.inner
            .tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend(handles);
    }

    /// Sends any pending remote write now.
    pub async fn flush(&self) -> Result<(), DraftError> {
        self.inner.writer.flush().await
    }

    /// Flushes, stops background tasks and waits for them.
    pub async fn shutdown(&self) {
        if let Err(e) = self.flush().await {
            warn!(error = %e, "final remote write failed");
        }
        self.inner.cancel.cancel();
        let handles: Vec<_> = self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain(..)
            .collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task ended abnormally");
            }
        }
        info!("draft engine stopped");
    }

    /// Returns the newest known draft, adopting a newer stored copy written
    /// by another window.
    async fn latest_draft(&self) -> DraftSession {
        let current = self.draft().await;
        let (stored, source) =
            sync::resolve(&self.inner.local, self.inner.sessions.as_ref(), &current.session_id).await;
        if source == DraftSource::Fresh || stored.updated_at <= current.updated_at {
            return current;
        }
        let mut draft = self.inner.draft.lock().await;
        if draft.updated_at < stored.updated_at {
            debug!(session_id = %stored.session_id, ?source, "adopting newer stored draft");
            *draft = stored;
        }
        draft.clone()
    }

    /// Promotes the draft into a named configuration and resets it.
    ///
    /// Validation failures and a failed create leave the draft untouched.
    pub async fn save(&self, name: &str, description: &str) -> Result<NamedConfiguration, DraftError> {
        let draft = self.latest_draft().await;
        let saved = save::promote(
            self.inner.configuration_store.as_ref(),
            &draft,
            name,
            description,
        )
        .await?;
        self.inner.configurations.lock().await.push(saved.clone());
        self.reset(Some(&draft)).await;
        Ok(saved)
    }

    /// Discards all progress without saving.
    pub async fn clear_progress(&self) {
        self.reset(None).await;
    }

    /// Starts a new session. With `promoted`, resources ingested after that
    /// snapshot was taken move to the new draft instead of being dropped.
    async fn reset(&self, promoted: Option<&DraftSession>) {
        let _persist = self.inner.persist.lock().await;
        let mut fresh = DraftSession::new(generate_session_id());
        let new_id = fresh.session_id.clone();
        let (previous, carried) = {
            let mut draft = self.inner.draft.lock().await;
            let carried = match promoted {
                Some(promoted) => {
                    let late: Vec<TemporaryResource> = draft
                        .temporary_resources
                        .iter()
                        .filter(|r| promoted.resource(&r.id).is_none())
                        .cloned()
                        .collect();
                    ingest::merge(&mut fresh, late)
                }
                None => 0,
            };
            (std::mem::replace(&mut *draft, fresh.clone()), carried)
        };

        if let Err(e) = self
            .inner
            .writer
            .discard_and_delete(&previous.session_id)
            .await
        {
            warn!(session_id = %previous.session_id, error = %e, "remote session not deleted");
        }
        self.inner.local.clear().await;
        self.inner.local.store_session_id(&new_id).await;
        if carried > 0 {
            self.inner.local.write_draft(&fresh).await;
            self.inner.writer.schedule(fresh);
        }
        info!(previous = %previous.session_id, session_id = %new_id, carried, "draft reset");
    }

    /// Lists saved configurations, auditing and repairing them.
    pub async fn load_configurations(&self) -> Result<Vec<NamedConfiguration>, DraftError> {
        self.audit_configurations().await?;
        Ok(self.configurations().await)
    }

    /// Like [`DraftEngine::load_configurations`] but returns the audit report.
    pub async fn audit_configurations(&self) -> Result<AuditReport, DraftError> {
        let (list, report) = audit::load_and_audit(
            self.inner.configuration_store.as_ref(),
            self.inner.repair_log.as_deref(),
        )
        .await?;
        *self.inner.configurations.lock().await = list;
        Ok(report)
    }

    /// The configuration list as last loaded or saved.
    pub async fn configurations(&self) -> Vec<NamedConfiguration> {
        self.inner.configurations.lock().await.clone()
    }

    pub async fn delete_configuration(&self, id: &str) -> Result<(), DraftError> {
        self.inner
            .configuration_store
            .delete_configuration(id)
            .await?;
        self.inner.configurations.lock().await.retain(|c| c.id != id);
        info!(configuration_id = id, "configuration deleted");
        Ok(())
    }

    /// Repairs recorded so far, oldest first.
    pub async fn repair_history(&self) -> Result<Vec<RepairRecord>, DraftError> {
        match &self.inner.repair_log {
            Some(log) => log.records().await,
            None => Ok(Vec::new()),
        }
    }
}

fn spawn_push_consumer(
    inner: Weak<Inner>,
    mut rx: mpsc::Receiver<TemporaryResource>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let first = tokio::select! {
                _ = cancel.cancelled() => break,
                received = rx.recv() => match received {
                    Some(resource) => resource,
                    None => break,
                },
            };
            let mut batch = vec![first];
            while let Ok(more) = rx.try_recv() {
                batch.push(more);
            }
            let Some(inner) = inner.upgrade() else {
                break;
            };
            let appended = DraftEngine { inner }.ingest(batch).await;
            debug!(appended, "pushed resources merged");
        }
        debug!("push consumer stopped");
    })
}

fn spawn_inbox_poller(
    inner: Weak<Inner>,
    refocus: Arc<Notify>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
                _ = refocus.notified() => debug!("refocus, polling inbox"),
            }
            let Some(inner) = inner.upgrade() else {
                break;
            };
            let appended = DraftEngine { inner }.poll_inbox().await;
            if appended > 0 {
                debug!(appended, "inbox resources merged");
            }
        }
        debug!("inbox poller stopped");
    })
}
