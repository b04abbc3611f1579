// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only repair log operations.

use chrono::{DateTime, Utc};
use qrdraft_core::{DraftError, RepairRecord};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Append repair records in a single transaction.
pub async fn append(db: &Database, records: &[RepairRecord]) -> Result<(), DraftError> {
    if records.is_empty() {
        return Ok(());
    }
    let records = records.to_vec();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO repair_log
                     (configuration_id, resource_id, previous_target, repaired_target, repaired_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for record in &records {
                    stmt.execute(params![
                        record.configuration_id,
                        record.resource_id,
                        record.previous_target,
                        record.repaired_target,
                        record.repaired_at.to_rfc3339(),
                    ])?;
                }
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// All repair records, oldest first.
pub async fn list(db: &Database) -> Result<Vec<RepairRecord>, DraftError> {
    let rows = db
        .connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT configuration_id, resource_id, previous_target, repaired_target, repaired_at
                 FROM repair_log ORDER BY id ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)?;

    rows.into_iter()
        .map(
            |(configuration_id, resource_id, previous_target, repaired_target, repaired_at)| {
                let repaired_at = DateTime::parse_from_rfc3339(&repaired_at)
                    .map_err(|e| DraftError::LocalPersistence {
                        source: Box::new(e),
                    })?
                    .with_timezone(&Utc);
                Ok(RepairRecord {
                    configuration_id,
                    resource_id,
                    previous_target,
                    repaired_target,
                    repaired_at,
                })
            },
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(resource: &str) -> RepairRecord {
        RepairRecord {
            configuration_id: "cfg-A".into(),
            resource_id: resource.into(),
            previous_target: format!("/render/cfg-B?resourceId={resource}"),
            repaired_target: format!("/render/cfg-A?resourceId={resource}"),
            repaired_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn append_preserves_order() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("log.db").to_str().unwrap(), true)
            .await
            .unwrap();

        append(&db, &[record("r1"), record("r2")]).await.unwrap();
        append(&db, &[record("r3")]).await.unwrap();
        append(&db, &[]).await.unwrap();

        let all = list(&db).await.unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.resource_id.as_str()).collect();
        assert_eq!(ids, ["r1", "r2", "r3"]);
        assert_eq!(all[0].repaired_target, "/render/cfg-A?resourceId=r1");
    }
}
