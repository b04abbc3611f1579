// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Consistency auditing of saved configurations.
//!
//! Every resource target embedding a `/render/{id}` segment must name its
//! owning configuration. Mismatches are repaired in place, written back via
//! `update_configuration` and appended to the repair log. A pass over a
//! consistent list performs no writes.

use chrono::Utc;
use qrdraft_core::link;
use qrdraft_core::{
    ConfigurationStore, ConsistencyIssue, DraftError, NamedConfiguration, RepairLog, RepairRecord,
};
use tracing::{debug, info, warn};

/// Outcome of one audit pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditReport {
    /// Every mismatch found before repairing.
    pub issues: Vec<ConsistencyIssue>,
    /// Repairs that were persisted.
    pub repaired: Vec<RepairRecord>,
    /// Configurations whose repair could not be written.
    pub failed: Vec<String>,
    /// Whether the list was fetched again after writing.
    pub reloaded: bool,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Mismatched back-references across `configurations`.
pub fn find_issues(configurations: &[NamedConfiguration]) -> Vec<ConsistencyIssue> {
    configurations
        .iter()
        .flat_map(|cfg| {
            cfg.resources.iter().filter_map(move |resource| {
                let embedded = resource.embedded_configuration_id()?;
                (embedded != cfg.id).then(|| ConsistencyIssue {
                    configuration_id: cfg.id.clone(),
                    resource_id: resource.id.clone(),
                    embedded_id: embedded.to_string(),
                })
            })
        })
        .collect()
}

/// Points every embedded reference at `configuration.id`.
///
/// Only the configuration-id segment changes. Returns one record per
/// rewritten target; an empty result means nothing changed.
pub fn align_targets(configuration: &mut NamedConfiguration) -> Vec<RepairRecord> {
    let owner = configuration.id.clone();
    let mut records = Vec::new();
    for resource in &mut configuration.resources {
        let Some(target) = resource.target.as_deref() else {
            continue;
        };
        if link::embedded_configuration_id(target) == Some(owner.as_str()) {
            continue;
        }
        let Some(rewritten) = link::rewrite_configuration_id(target, &owner) else {
            continue;
        };
        records.push(RepairRecord {
            configuration_id: owner.clone(),
            resource_id: resource.id.clone(),
            previous_target: target.to_string(),
            repaired_target: rewritten.clone(),
            repaired_at: Utc::now(),
        });
        resource.target = Some(rewritten);
    }
    records
}

/// Audits `configurations`, repairing and persisting mismatches.
///
/// Returns the list to keep (re-fetched once when anything was written) and
/// the report. A failed write or reload is logged, never escalated.
pub async fn audit(
    store: &dyn ConfigurationStore,
    repair_log: Option<&dyn RepairLog>,
    mut configurations: Vec<NamedConfiguration>,
) -> (Vec<NamedConfiguration>, AuditReport) {
    let mut report = AuditReport {
        issues: find_issues(&configurations),
        ..AuditReport::default()
    };
    if report.is_clean() {
        debug!(count = configurations.len(), "configurations consistent");
        return (configurations, report);
    }
    for issue in &report.issues {
        info!(
            configuration_id = %issue.configuration_id,
            resource_id = %issue.resource_id,
            embedded_id = %issue.embedded_id,
            "resource back-reference mismatch"
        );
    }

    for cfg in configurations.iter_mut() {
        if !report.issues.iter().any(|i| i.configuration_id == cfg.id) {
            continue;
        }
        let mut repaired = cfg.clone();
        let records = align_targets(&mut repaired);
        if records.is_empty() {
            continue;
        }
        match store.update_configuration(&repaired).await {
            Ok(stored) => {
                info!(configuration_id = %cfg.id, repaired = records.len(), "configuration repaired");
                if let Some(log) = repair_log
                    && let Err(e) = log.append(&records).await
                {
                    warn!(configuration_id = %cfg.id, error = %e, "failed to append repair log");
                }
                *cfg = stored;
                report.repaired.extend(records);
            }
            Err(e) => {
                warn!(configuration_id = %cfg.id, error = %e, "configuration repair not persisted");
                report.failed.push(cfg.id.clone());
            }
        }
    }

    if !report.repaired.is_empty() {
        match store.list_configurations().await {
            Ok(fresh) => {
                configurations = fresh;
                report.reloaded = true;
            }
            Err(e) => warn!(error = %e, "reload after repair failed, keeping repaired list"),
        }
    }
    (configurations, report)
}

/// Lists configurations and audits them.
pub async fn load_and_audit(
    store: &dyn ConfigurationStore,
    repair_log: Option<&dyn RepairLog>,
) -> Result<(Vec<NamedConfiguration>, AuditReport), DraftError> {
    let configurations = store.list_configurations().await?;
    Ok(audit(store, repair_log, configurations).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qrdraft_core::{ResourceSnapshot, SectionPayloads};
    use qrdraft_test_utils::{MemoryRepairLog, MockConfigurationStore};

    fn snapshot(id: &str, target: Option<&str>) -> ResourceSnapshot {
        ResourceSnapshot {
            id: id.into(),
            name: id.into(),
            target: target.map(str::to_string),
            description: None,
            is_temporary: false,
            customizations: None,
        }
    }

    fn configuration(id: &str, resources: Vec<ResourceSnapshot>) -> NamedConfiguration {
        NamedConfiguration {
            id: id.into(),
            name: format!("config {id}"),
            description: String::new(),
            created_at: Utc::now(),
            sections: SectionPayloads::default(),
            resources,
            selected_resource_ids: vec![],
            email_templates: None,
            landing_template: None,
        }
    }

    #[test]
    fn finds_only_mismatched_references() {
        let configs = vec![configuration(
            "cfg-A",
            vec![
                snapshot("r1", Some("https://qr.example/render/cfg-A?resourceId=r1")),
                snapshot("r2", Some("https://qr.example/render/cfg-B?resourceId=r2")),
                snapshot("r3", Some("https://elsewhere.example/menu")),
                snapshot("r4", None),
            ],
        )];
        let issues = find_issues(&configs);
        assert_eq!(
            issues,
            vec![ConsistencyIssue {
                configuration_id: "cfg-A".into(),
                resource_id: "r2".into(),
                embedded_id: "cfg-B".into(),
            }]
        );
    }

    #[tokio::test]
    async fn repairs_foreign_reference_and_preserves_url() {
        let store = MockConfigurationStore::with_configurations(vec![configuration(
            "cfg-A",
            vec![snapshot(
                "r1",
                Some("https://qr.example/app/render/cfg-B?resourceId=r1&lang=de"),
            )],
        )]);
        let log = MemoryRepairLog::new();

        let (configs, report) = load_and_audit(&store, Some(&log)).await.unwrap();

        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.repaired.len(), 1);
        assert!(report.reloaded);
        assert_eq!(
            configs[0].resources[0].target.as_deref(),
            Some("https://qr.example/app/render/cfg-A?resourceId=r1&lang=de")
        );
        assert_eq!(store.updated().len(), 1);
        assert_eq!(store.list_calls(), 2);
        let logged = log.records().await.unwrap();
        assert_eq!(logged.len(), 1);
        assert_eq!(
            logged[0].previous_target,
            "https://qr.example/app/render/cfg-B?resourceId=r1&lang=de"
        );
    }

    #[tokio::test]
    async fn second_pass_performs_zero_writes() {
        let store = MockConfigurationStore::with_configurations(vec![
            configuration(
                "cfg-A",
                vec![snapshot("r1", Some("/render/DRAFT?resourceId=r1"))],
            ),
            configuration(
                "cfg-B",
                vec![snapshot("r2", Some("/render/cfg-B?resourceId=r2"))],
            ),
        ]);

        let (_, first) = load_and_audit(&store, None).await.unwrap();
        assert_eq!(first.repaired.len(), 1);
        let writes_after_first = store.write_count();

        let (_, second) = load_and_audit(&store, None).await.unwrap();
        assert!(second.is_clean());
        assert!(!second.reloaded);
        assert_eq!(store.write_count(), writes_after_first);
    }

    #[tokio::test]
    async fn failed_repair_is_reported_not_raised() {
        let store = MockConfigurationStore::with_configurations(vec![configuration(
            "cfg-A",
            vec![snapshot("r1", Some("/render/cfg-Z?resourceId=r1"))],
        )]);
        store.fail_update(true);

        let (configs, report) = load_and_audit(&store, None).await.unwrap();
        assert_eq!(report.failed, vec!["cfg-A".to_string()]);
        assert!(report.repaired.is_empty());
        assert!(!report.reloaded);
        assert_eq!(
            configs[0].resources[0].target.as_deref(),
            Some("/render/cfg-Z?resourceId=r1")
        );
    }

    #[test]
    fn align_targets_touches_only_mismatches() {
        let mut cfg = configuration(
            "cfg-42",
            vec![
                snapshot("tmp-1", Some("https://qr.example/render/DRAFT?resourceId=tmp-1")),
                snapshot("tmp-2", Some("https://qr.example/render/cfg-42?resourceId=tmp-2")),
            ],
        );
        let records = align_targets(&mut cfg);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].resource_id, "tmp-1");
        assert_eq!(
            cfg.resources[0].target.as_deref(),
            Some("https://qr.example/render/cfg-42?resourceId=tmp-1")
        );
        assert!(align_targets(&mut cfg).is_empty());
    }
}
