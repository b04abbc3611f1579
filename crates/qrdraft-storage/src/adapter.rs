// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the local cache and repair log traits.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use qrdraft_config::model::StorageConfig;
use qrdraft_core::{
    AdapterType, DraftError, HealthStatus, LocalCache, RepairLog, RepairRecord, StoreAdapter,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed local cache.
///
/// The database is opened lazily by [`SqliteLocalCache::initialize`]; every
/// other operation fails with a local persistence error until then.
pub struct SqliteLocalCache {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteLocalCache {
    /// Create a cache for the configured database path without opening it.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database and run pending migrations.
    pub async fn initialize(&self) -> Result<(), DraftError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db
            .set(db)
            .map_err(|_| DraftError::Internal("local cache already initialized".into()))?;
        debug!(path = %self.config.database_path, "local cache initialized");
        Ok(())
    }

    /// Checkpoint the WAL. Closing an uninitialized cache is a no-op.
    pub async fn close(&self) -> Result<(), DraftError> {
        if let Some(db) = self.db.get() {
            db.close().await?;
        }
        Ok(())
    }

    fn db(&self) -> Result<&Database, DraftError> {
        self.db.get().ok_or_else(|| DraftError::LocalPersistence {
            source: "local cache not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl StoreAdapter for SqliteLocalCache {
    fn name(&self) -> &str {
        "sqlite-local-cache"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::LocalCache
    }

    async fn health_check(&self) -> Result<HealthStatus, DraftError> {
        let Ok(db) = self.db() else {
            return Ok(HealthStatus::Unhealthy("not initialized".into()));
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl LocalCache for SqliteLocalCache {
    async fn get(&self, key: &str) -> Result<Option<String>, DraftError> {
        queries::kv::get(self.db()?, key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), DraftError> {
        queries::kv::set(self.db()?, key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), DraftError> {
        queries::kv::remove(self.db()?, key).await
    }
}

#[async_trait]
impl RepairLog for SqliteLocalCache {
    async fn append(&self, records: &[RepairRecord]) -> Result<(), DraftError> {
        queries::repairs::append(self.db()?, records).await
    }

    async fn records(&self) -> Result<Vec<RepairRecord>, DraftError> {
        queries::repairs::list(self.db()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qrdraft_core::traits::storage::keys;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn sqlite_cache_reports_adapter_metadata() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("meta.db");
        let cache = SqliteLocalCache::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(cache.name(), "sqlite-local-cache");
        assert_eq!(cache.version(), semver::Version::new(0, 1, 0));
        assert_eq!(cache.adapter_type(), AdapterType::LocalCache);
        assert_eq!(
            cache.health_check().await.unwrap(),
            HealthStatus::Unhealthy("not initialized".into())
        );
    }

    #[tokio::test]
    async fn initialize_creates_nested_database_file() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("cache.db");
        let cache = SqliteLocalCache::new(make_config(db_path.to_str().unwrap()));

        cache.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
        assert_eq!(cache.health_check().await.unwrap(), HealthStatus::Healthy);
        assert!(cache.initialize().await.is_err(), "double init must fail");
        cache.close().await.unwrap();
    }

    #[tokio::test]
    async fn operations_before_initialize_fail() {
        let cache = SqliteLocalCache::new(make_config("/nonexistent/never-opened.db"));
        let err = cache.get(keys::DRAFT).await.unwrap_err();
        assert!(matches!(err, DraftError::LocalPersistence { .. }));
        cache.close().await.unwrap();
    }

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("reopen.db");
        let path = db_path.to_str().unwrap();

        {
            let cache = SqliteLocalCache::new(make_config(path));
            cache.initialize().await.unwrap();
            cache.set(keys::SESSION_ID, "sess-abc").await.unwrap();
            cache.set(keys::DRAFT, "{}").await.unwrap();
            cache.remove(keys::DRAFT).await.unwrap();
            cache.close().await.unwrap();
        }

        let cache = SqliteLocalCache::new(make_config(path));
        cache.initialize().await.unwrap();
        assert_eq!(
            cache.get(keys::SESSION_ID).await.unwrap().as_deref(),
            Some("sess-abc")
        );
        assert!(cache.get(keys::DRAFT).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn repair_log_round_trip() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("repairs.db");
        let cache = SqliteLocalCache::new(make_config(db_path.to_str().unwrap()));
        cache.initialize().await.unwrap();

        assert!(cache.records().await.unwrap().is_empty());
        let record = RepairRecord {
            configuration_id: "cfg-42".into(),
            resource_id: "tmp-1".into(),
            previous_target: "https://qr.example/render/DRAFT?resourceId=tmp-1".into(),
            repaired_target: "https://qr.example/render/cfg-42?resourceId=tmp-1".into(),
            repaired_at: chrono::Utc::now(),
        };
        cache.append(std::slice::from_ref(&record)).await.unwrap();

        let stored = cache.records().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].configuration_id, "cfg-42");
        assert_eq!(stored[0].repaired_target, record.repaired_target);
    }
}
