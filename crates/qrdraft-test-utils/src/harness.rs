// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end engine testing.
//!
//! `TestHarness` assembles a [`DraftEngine`] over in-memory mock stores and
//! keeps handles to every store so tests can seed and inspect them. Several
//! engines opened from one harness behave like windows sharing one profile.

use std::sync::Arc;
use std::time::Duration;

use qrdraft_core::NamedConfiguration;
use qrdraft_engine::{DraftEngine, EngineConfig, Stores};

use crate::memory_cache::{MemoryLocalCache, MemoryRepairLog};
use crate::mock_configurations::MockConfigurationStore;
use crate::mock_sessions::MockSessionStore;

/// Render base used by harness engines.
pub const TEST_RENDER_BASE: &str = "https://qr.example";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: EngineConfig,
    configurations: Vec<NamedConfiguration>,
    next_configuration_id: Option<u64>,
    start: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: EngineConfig {
                debounce: Duration::from_millis(800),
                poll_enabled: false,
                poll_interval: Duration::from_millis(2000),
                push_capacity: 16,
                render_base: TEST_RENDER_BASE.to_string(),
            },
            configurations: Vec::new(),
            next_configuration_id: None,
            start: false,
        }
    }

    /// Set the quiet period of the remote writer.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.config.debounce = debounce;
        self
    }

    /// Enable the inbox poller with the given interval.
    pub fn with_polling(mut self, interval: Duration) -> Self {
        self.config.poll_enabled = true;
        self.config.poll_interval = interval;
        self
    }

    /// Seed the configuration store.
    pub fn with_configurations(mut self, configurations: Vec<NamedConfiguration>) -> Self {
        self.configurations = configurations;
        self
    }

    /// Numeric part of the next id the configuration store assigns.
    pub fn with_next_configuration_id(mut self, id: u64) -> Self {
        self.next_configuration_id = Some(id);
        self
    }

    /// Start background tasks after loading.
    pub fn started(mut self) -> Self {
        self.start = true;
        self
    }

    /// Build the harness and open its first engine.
    pub async fn build(self) -> TestHarness {
        let configurations = Arc::new(MockConfigurationStore::with_configurations(
            self.configurations,
        ));
        if let Some(id) = self.next_configuration_id {
            configurations.set_next_id(id);
        }

        let cache = Arc::new(MemoryLocalCache::new());
        let sessions = Arc::new(MockSessionStore::new());
        let repair_log = Arc::new(MemoryRepairLog::new());
        let stores = Stores {
            cache: cache.clone(),
            sessions: sessions.clone(),
            configurations: configurations.clone(),
            repair_log: Some(repair_log.clone()),
        };
        let engine = DraftEngine::open(self.config.clone(), stores).await;
        if self.start {
            engine.start();
        }
        TestHarness {
            engine,
            cache,
            sessions,
            configurations,
            repair_log,
            config: self.config,
        }
    }
}

/// A complete engine stack over mock stores.
pub struct TestHarness {
    pub engine: DraftEngine,
    pub cache: Arc<MemoryLocalCache>,
    pub sessions: Arc<MockSessionStore>,
    pub configurations: Arc<MockConfigurationStore>,
    pub repair_log: Arc<MemoryRepairLog>,
    config: EngineConfig,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Store handles shared by every engine of this harness.
    pub fn stores(&self) -> Stores {
        Stores {
            cache: self.cache.clone(),
            sessions: self.sessions.clone(),
            configurations: self.configurations.clone(),
            repair_log: Some(self.repair_log.clone()),
        }
    }

    /// Opens another engine over the same stores, as a reload or a second
    /// window on the same profile would.
    pub async fn open_window(&self) -> DraftEngine {
        DraftEngine::open(self.config.clone(), self.stores()).await
    }
}
