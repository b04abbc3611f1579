// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory remote session store with call recording.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use qrdraft_core::{AdapterType, DraftError, DraftSession, HealthStatus, SessionStore, StoreAdapter};

/// One observed write against the mock store, in completion order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Put(DraftSession),
    Delete(String),
}

/// A session store that keeps drafts in a map and records every write.
///
/// `put_session` can be slowed down with [`MockSessionStore::set_put_delay`]
/// to hold a write in flight; the highest number of concurrent PUTs is
/// tracked so single-flight behavior can be asserted.
#[derive(Default)]
pub struct MockSessionStore {
    sessions: Mutex<HashMap<String, DraftSession>>,
    events: Mutex<Vec<SessionEvent>>,
    put_delay: Mutex<Duration>,
    fail_puts: AtomicBool,
    fail_gets: AtomicBool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a stored draft without recording an event.
    pub fn insert(&self, draft: DraftSession) {
        self.sessions
            .lock()
            .unwrap()
            .insert(draft.session_id.clone(), draft);
    }

    pub fn stored(&self, session_id: &str) -> Option<DraftSession> {
        self.sessions.lock().unwrap().get(session_id).cloned()
    }

    pub fn set_put_delay(&self, delay: Duration) {
        *self.put_delay.lock().unwrap() = delay;
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Drafts sent by successful PUTs, oldest first.
    pub fn puts(&self) -> Vec<DraftSession> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::Put(draft) => Some(draft),
                SessionEvent::Delete(_) => None,
            })
            .collect()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::Delete(id) => Some(id),
                SessionEvent::Put(_) => None,
            })
            .collect()
    }

    pub fn max_concurrent_puts(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreAdapter for MockSessionStore {
    fn name(&self) -> &str {
        "mock-session-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::SessionStore
    }

    async fn health_check(&self) -> Result<HealthStatus, DraftError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl SessionStore for MockSessionStore {
    async fn get_session(&self, session_id: &str) -> Result<Option<DraftSession>, DraftError> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(DraftError::persistence("mock session store unavailable"));
        }
        Ok(self.stored(session_id))
    }

    async fn put_session(&self, session_id: &str, draft: &DraftSession) -> Result<(), DraftError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = *self.put_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(DraftError::persistence("mock put failed"));
        }
        self.sessions
            .lock()
            .unwrap()
            .insert(session_id.to_string(), draft.clone());
        self.events
            .lock()
            .unwrap()
            .push(SessionEvent::Put(draft.clone()));
        Ok(())
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), DraftError> {
        self.sessions.lock().unwrap().remove(session_id);
        self.events
            .lock()
            .unwrap()
            .push(SessionEvent::Delete(session_id.to_string()));
        Ok(())
    }
}
