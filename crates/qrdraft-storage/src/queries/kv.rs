// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key/value operations on the `kv` table.

use qrdraft_core::DraftError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Read the value stored under `key`.
pub async fn get(db: &Database, key: &str) -> Result<Option<String>, DraftError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            );
            match result {
                Ok(value) => Ok(Some(value)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or replace the value under `key`.
pub async fn set(db: &Database, key: &str, value: &str) -> Result<(), DraftError> {
    let key = key.to_string();
    let value = value.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO kv (key, value, updated_at)
                 VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Delete `key` if present.
pub async fn remove(db: &Database, key: &str) -> Result<(), DraftError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("kv.db");
        let db = Database::open(db_path.to_str().unwrap(), true).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn set_then_get_returns_value() {
        let (db, _dir) = setup_db().await;
        set(&db, "draft", r#"{"a":1}"#).await.unwrap();
        assert_eq!(get(&db, "draft").await.unwrap().as_deref(), Some(r#"{"a":1}"#));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn set_overwrites_existing_value() {
        let (db, _dir) = setup_db().await;
        set(&db, "session_id", "sess-1").await.unwrap();
        set(&db, "session_id", "sess-2").await.unwrap();
        assert_eq!(get(&db, "session_id").await.unwrap().as_deref(), Some("sess-2"));
    }

    #[tokio::test]
    async fn missing_key_returns_none_and_remove_is_idempotent() {
        let (db, _dir) = setup_db().await;
        assert!(get(&db, "nope").await.unwrap().is_none());
        remove(&db, "nope").await.unwrap();

        set(&db, "pendingResource", "{}").await.unwrap();
        remove(&db, "pendingResource").await.unwrap();
        assert!(get(&db, "pendingResource").await.unwrap().is_none());
    }
}
