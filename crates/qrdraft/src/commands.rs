// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot draft and configuration commands.
//!
//! Each command opens the engine over the SQLite local cache and the HTTP
//! stores, runs one operation, and closes it again, flushing any remote
//! session write the operation scheduled.

use std::sync::Arc;
use std::time::Duration;

use qrdraft_config::QrdraftConfig;
use qrdraft_core::{DraftError, NamedConfiguration, SectionIndex};
use qrdraft_engine::shutdown;
use qrdraft_engine::{AuditReport, DraftEngine, EngineConfig, Stores};
use qrdraft_storage::SqliteLocalCache;
use serde_json::Value;
use tracing::warn;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// An engine together with the resources it must release.
pub struct Runtime {
    pub engine: DraftEngine,
    cache: Arc<SqliteLocalCache>,
}

impl Runtime {
    /// Opens the local cache, connects the remote stores and loads the draft.
    pub async fn open(config: &QrdraftConfig) -> Result<Self, DraftError> {
        let cache = Arc::new(SqliteLocalCache::new(config.storage.clone()));
        cache.initialize().await?;
        let (sessions, configurations) = qrdraft_remote::connect(&config.remote)?;

        let stores = Stores {
            cache: cache.clone(),
            sessions: Arc::new(sessions),
            configurations: Arc::new(configurations),
            repair_log: Some(cache.clone()),
        };
        let engine = DraftEngine::open(EngineConfig::from_config(config), stores).await;
        Ok(Self { engine, cache })
    }

    /// Flushes pending writes, stops the engine and closes the database.
    pub async fn close(self) {
        shutdown::drain(&self.engine, CLOSE_TIMEOUT).await;
        if let Err(e) = self.cache.close().await {
            warn!(error = %e, "local cache did not close cleanly");
        }
    }
}

/// Runs `op` against a freshly opened runtime and always closes it.
async fn with_runtime<T, F, Fut>(config: &QrdraftConfig, op: F) -> Result<T, DraftError>
where
    F: FnOnce(DraftEngine) -> Fut,
    Fut: std::future::Future<Output = Result<T, DraftError>>,
{
    let runtime = Runtime::open(config).await?;
    let result = op(runtime.engine.clone()).await;
    runtime.close().await;
    result
}

fn section(n: u8) -> Result<SectionIndex, DraftError> {
    SectionIndex::new(n).ok_or_else(|| DraftError::NotFound(format!("section {n}")))
}

fn parse_payload(raw: &str) -> Result<Value, DraftError> {
    let payload: Value = serde_json::from_str(raw)
        .map_err(|e| DraftError::Internal(format!("invalid section payload: {e}")))?;
    if !payload.is_object() {
        return Err(DraftError::Internal(
            "section payload must be a JSON object".into(),
        ));
    }
    Ok(payload)
}

pub async fn touch(config: &QrdraftConfig, n: u8) -> Result<(), DraftError> {
    let section = section(n)?;
    with_runtime(config, |engine| async move {
        engine.mark_touched(section).await?;
        println!("section {section} marked configured");
        Ok(())
    })
    .await
}

pub async fn set_section(config: &QrdraftConfig, n: u8, raw: &str) -> Result<(), DraftError> {
    let section = section(n)?;
    let payload = parse_payload(raw)?;
    with_runtime(config, |engine| async move {
        engine.update_section(section, payload).await?;
        println!("section {section} updated");
        Ok(())
    })
    .await
}

pub async fn add_resource(
    config: &QrdraftConfig,
    name: &str,
    target: Option<String>,
    select: bool,
) -> Result<(), DraftError> {
    with_runtime(config, |engine| async move {
        let resource = engine.add_resource(name, target).await?;
        if select {
            engine.set_resource_selected(&resource.id, true).await?;
        }
        println!(
            "{}  {}  {}",
            resource.id,
            resource.name,
            resource.target.as_deref().unwrap_or("-")
        );
        Ok(())
    })
    .await
}

pub async fn ingest(config: &QrdraftConfig) -> Result<(), DraftError> {
    with_runtime(config, |engine| async move {
        let merged = engine.poll_inbox().await;
        println!("merged {merged} resource(s)");
        Ok(())
    })
    .await
}

pub async fn save(config: &QrdraftConfig, name: &str, description: &str) -> Result<(), DraftError> {
    with_runtime(config, |engine| async move {
        let configuration = engine.save(name, description).await?;
        println!(
            "saved {} ({}, {} resource(s))",
            configuration.id,
            configuration.name,
            configuration.resources.len()
        );
        Ok(())
    })
    .await
}

pub async fn clear(config: &QrdraftConfig) -> Result<(), DraftError> {
    with_runtime(config, |engine| async move {
        engine.clear_progress().await;
        println!("draft cleared, new session {}", engine.session_id().await);
        Ok(())
    })
    .await
}

pub async fn list_configurations(config: &QrdraftConfig, json: bool) -> Result<(), DraftError> {
    with_runtime(config, |engine| async move {
        let configurations = engine.load_configurations().await?;
        if json {
            let rendered = serde_json::to_string_pretty(&configurations)
                .map_err(|e| DraftError::Internal(format!("failed to render JSON: {e}")))?;
            println!("{rendered}");
        } else {
            print!("{}", format_configurations(&configurations));
        }
        Ok(())
    })
    .await
}

pub async fn audit(config: &QrdraftConfig) -> Result<(), DraftError> {
    with_runtime(config, |engine| async move {
        let report = engine.audit_configurations().await?;
        print!("{}", format_report(&report));
        Ok(())
    })
    .await
}

pub async fn delete(config: &QrdraftConfig, id: &str) -> Result<(), DraftError> {
    with_runtime(config, |engine| async move {
        engine.delete_configuration(id).await?;
        println!("deleted {id}");
        Ok(())
    })
    .await
}

fn format_configurations(configurations: &[NamedConfiguration]) -> String {
    if configurations.is_empty() {
        return "no saved configurations\n".to_string();
    }
    configurations
        .iter()
        .map(|c| {
            format!(
                "{:<12} {:<24} {:>3} resource(s)  {}\n",
                c.id,
                c.name,
                c.resources.len(),
                c.created_at.format("%Y-%m-%d %H:%M")
            )
        })
        .collect()
}

fn format_report(report: &AuditReport) -> String {
    if report.is_clean() {
        return "all resource links consistent\n".to_string();
    }
    let mut out = format!("{} mismatched link(s)\n", report.issues.len());
    for record in &report.repaired {
        out.push_str(&format!(
            "  repaired {} / {}: {} -> {}\n",
            record.configuration_id,
            record.resource_id,
            record.previous_target,
            record.repaired_target
        ));
    }
    for id in &report.failed {
        out.push_str(&format!("  not repaired: {id}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use qrdraft_core::{ConsistencyIssue, RepairRecord, SectionPayloads};

    #[test]
    fn payload_must_be_an_object() {
        assert!(parse_payload(r#"{"guestCount": 2}"#).is_ok());
        assert!(parse_payload("[1, 2]").is_err());
        assert!(parse_payload("{oops").is_err());
    }

    #[test]
    fn empty_list_has_a_message() {
        assert_eq!(format_configurations(&[]), "no saved configurations\n");
    }

    #[test]
    fn configuration_rows_show_id_and_count() {
        let row = format_configurations(&[NamedConfiguration {
            id: "cfg-42".into(),
            name: "Promo".into(),
            description: String::new(),
            created_at: Utc::now(),
            sections: SectionPayloads::default(),
            resources: vec![],
            selected_resource_ids: vec![],
            email_templates: None,
            landing_template: None,
        }]);
        assert!(row.starts_with("cfg-42"));
        assert!(row.contains("0 resource(s)"));
    }

    #[test]
    fn report_lists_repairs_and_failures() {
        let report = AuditReport {
            issues: vec![ConsistencyIssue {
                configuration_id: "cfg-A".into(),
                resource_id: "r1".into(),
                embedded_id: "cfg-B".into(),
            }],
            repaired: vec![RepairRecord {
                configuration_id: "cfg-A".into(),
                resource_id: "r1".into(),
                previous_target: "/render/cfg-B?resourceId=r1".into(),
                repaired_target: "/render/cfg-A?resourceId=r1".into(),
                repaired_at: Utc::now(),
            }],
            failed: vec!["cfg-C".into()],
            reloaded: true,
        };
        let text = format_report(&report);
        assert!(text.starts_with("1 mismatched link(s)"));
        assert!(text.contains("/render/cfg-B?resourceId=r1 -> /render/cfg-A?resourceId=r1"));
        assert!(text.contains("not repaired: cfg-C"));
    }

    #[test]
    fn clean_report_is_one_line() {
        assert_eq!(
            format_report(&AuditReport::default()),
            "all resource links consistent\n"
        );
    }
}
