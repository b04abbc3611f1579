// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory local cache and repair log.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use qrdraft_core::{
    AdapterType, DraftError, HealthStatus, LocalCache, RepairLog, RepairRecord, StoreAdapter,
};

/// A [`LocalCache`] backed by a `HashMap`. Writes can be made to fail to
/// exercise the lossy local tier.
#[derive(Default)]
pub struct MemoryLocalCache {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
    after_write: Mutex<Option<AfterWrite>>,
}

/// A one-shot raw write fired after a successful `set` of `trigger`.
struct AfterWrite {
    trigger: String,
    key: String,
    value: String,
}

impl MemoryLocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a raw value, bypassing failure injection.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    /// Once `trigger` is next written through [`LocalCache::set`], stores
    /// `value` under `key` as a concurrent writer would.
    pub fn write_after(&self, trigger: &str, key: &str, value: &str) {
        *self.after_write.lock().unwrap() = Some(AfterWrite {
            trigger: trigger.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), DraftError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DraftError::LocalPersistence {
                source: "quota exceeded".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl StoreAdapter for MemoryLocalCache {
    fn name(&self) -> &str {
        "memory-local-cache"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::LocalCache
    }

    async fn health_check(&self) -> Result<HealthStatus, DraftError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl LocalCache for MemoryLocalCache {
    async fn get(&self, key: &str) -> Result<Option<String>, DraftError> {
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), DraftError> {
        self.check_writable()?;
        self.insert_raw(key, value);
        let fired = {
            let mut after = self.after_write.lock().unwrap();
            if after.as_ref().is_some_and(|a| a.trigger == key) {
                after.take()
            } else {
                None
            }
        };
        if let Some(after) = fired {
            self.insert_raw(&after.key, &after.value);
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), DraftError> {
        self.check_writable()?;
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// A [`RepairLog`] that keeps records in a `Vec`.
#[derive(Default)]
pub struct MemoryRepairLog {
    records: Mutex<Vec<RepairRecord>>,
}

impl MemoryRepairLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RepairLog for MemoryRepairLog {
    async fn append(&self, records: &[RepairRecord]) -> Result<(), DraftError> {
        self.records.lock().unwrap().extend_from_slice(records);
        Ok(())
    }

    async fn records(&self) -> Result<Vec<RepairRecord>, DraftError> {
        Ok(self.records.lock().unwrap().clone())
    }
}
