// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory durable configuration store.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use qrdraft_core::{
    AdapterType, ConfigurationStore, DraftError, HealthStatus, NamedConfiguration,
    NewConfiguration, StoreAdapter,
};

/// A configuration store that assigns ids `cfg-1`, `cfg-2`, ... and counts
/// every call.
pub struct MockConfigurationStore {
    configurations: Mutex<Vec<NamedConfiguration>>,
    next_id: AtomicU64,
    creates: Mutex<Vec<NewConfiguration>>,
    updates: Mutex<Vec<NamedConfiguration>>,
    lists: AtomicUsize,
    create_delay: Mutex<Duration>,
    fail_create: AtomicBool,
    fail_update: AtomicBool,
}

impl Default for MockConfigurationStore {
    fn default() -> Self {
        Self {
            configurations: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            creates: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            lists: AtomicUsize::new(0),
            create_delay: Mutex::new(Duration::ZERO),
            fail_create: AtomicBool::new(false),
            fail_update: AtomicBool::new(false),
        }
    }
}

impl MockConfigurationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `configurations`.
    pub fn with_configurations(configurations: Vec<NamedConfiguration>) -> Self {
        let store = Self::default();
        *store.configurations.lock().unwrap() = configurations;
        store
    }

    /// The next created configuration gets `cfg-{id}`.
    pub fn set_next_id(&self, id: u64) {
        self.next_id.store(id, Ordering::SeqCst);
    }

    /// Holds every create in flight for `delay` before answering.
    pub fn set_create_delay(&self, delay: Duration) {
        *self.create_delay.lock().unwrap() = delay;
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_update(&self, fail: bool) {
        self.fail_update.store(fail, Ordering::SeqCst);
    }

    pub fn stored(&self) -> Vec<NamedConfiguration> {
        self.configurations.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<NewConfiguration> {
        self.creates.lock().unwrap().clone()
    }

    pub fn updated(&self) -> Vec<NamedConfiguration> {
        self.updates.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    /// Total writes (creates plus updates).
    pub fn write_count(&self) -> usize {
        self.creates.lock().unwrap().len() + self.updates.lock().unwrap().len()
    }
}

#[async_trait]
impl StoreAdapter for MockConfigurationStore {
    fn name(&self) -> &str {
        "mock-configuration-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::ConfigurationStore
    }

    async fn health_check(&self) -> Result<HealthStatus, DraftError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl ConfigurationStore for MockConfigurationStore {
    async fn list_configurations(&self) -> Result<Vec<NamedConfiguration>, DraftError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        Ok(self.stored())
    }

    async fn create_configuration(
        &self,
        configuration: &NewConfiguration,
    ) -> Result<NamedConfiguration, DraftError> {
        let delay = *self.create_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(DraftError::persistence("mock create failed"));
        }
        self.creates.lock().unwrap().push(configuration.clone());

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let created = NamedConfiguration {
            id: format!("cfg-{id}"),
            name: configuration.name.clone(),
            description: configuration.description.clone(),
            created_at: Utc::now(),
            sections: configuration.sections.clone(),
            resources: configuration.resources.clone(),
            selected_resource_ids: configuration.selected_resource_ids.clone(),
            email_templates: configuration.email_templates.clone(),
            landing_template: configuration.landing_template.clone(),
        };
        self.configurations.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_configuration(
        &self,
        configuration: &NamedConfiguration,
    ) -> Result<NamedConfiguration, DraftError> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(DraftError::persistence("mock update failed"));
        }
        let mut stored = self.configurations.lock().unwrap();
        let slot = stored
            .iter_mut()
            .find(|c| c.id == configuration.id)
            .ok_or_else(|| DraftError::NotFound(configuration.id.clone()))?;
        *slot = configuration.clone();
        self.updates.lock().unwrap().push(configuration.clone());
        Ok(configuration.clone())
    }

    async fn delete_configuration(&self, id: &str) -> Result<(), DraftError> {
        let mut stored = self.configurations.lock().unwrap();
        let before = stored.len();
        stored.retain(|c| c.id != id);
        if stored.len() == before {
            return Err(DraftError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
