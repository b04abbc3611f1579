// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `qrdraft doctor` command implementation.
//!
//! Runs diagnostic checks against the configuration, the local cache
//! database and both remote stores.

use std::io::IsTerminal;
use std::path::Path;
use std::time::{Duration, Instant};

use qrdraft_config::QrdraftConfig;
use qrdraft_core::{DraftError, HealthStatus, StoreAdapter};
use qrdraft_storage::SqliteLocalCache;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `qrdraft doctor` command.
pub async fn run_doctor(config: &QrdraftConfig, plain: bool) -> Result<(), DraftError> {
    let use_color = !plain && std::io::stdout().is_terminal();

    let mut results = vec![check_database(config).await];
    match qrdraft_remote::connect(&config.remote) {
        Ok((sessions, configurations)) => {
            results.push(check_store("Session store", &sessions).await);
            results.push(check_store("Configuration store", &configurations).await);
        }
        Err(e) => results.push(CheckResult::new(
            "Remote stores",
            CheckStatus::Fail,
            format!("client error: {e}"),
            Instant::now(),
        )),
    }

    println!();
    println!("  qrdraft doctor");
    println!("  {}", "-".repeat(50));

    let mut issues = 0;
    for result in &results {
        if result.status != CheckStatus::Pass {
            issues += 1;
        }
        println!("{}", format_line(result, use_color));
    }

    println!();
    if issues > 0 {
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    Ok(())
}

fn format_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green(), result.message.normal()),
            CheckStatus::Warn => ("!".yellow(), result.message.yellow()),
            CheckStatus::Fail => ("✗".red(), result.message.red()),
        };
        format!("    {symbol} {:<20} {message} ({duration_ms}ms)", result.name)
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

/// Check the local cache database opens and answers queries.
async fn check_database(config: &QrdraftConfig) -> CheckResult {
    let start = Instant::now();
    let db_path = &config.storage.database_path;
    if !Path::new(db_path).exists() {
        return CheckResult::new(
            "Local cache",
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first run)"),
            start,
        );
    }

    let cache = SqliteLocalCache::new(config.storage.clone());
    if let Err(e) = cache.initialize().await {
        return CheckResult::new("Local cache", CheckStatus::Fail, format!("open failed: {e}"), start);
    }
    let result = health_result("Local cache", cache.health_check().await, start);
    let _ = cache.close().await;
    result
}

async fn check_store(name: &str, store: &dyn StoreAdapter) -> CheckResult {
    let start = Instant::now();
    health_result(name, store.health_check().await, start)
}

fn health_result(
    name: &str,
    health: Result<HealthStatus, DraftError>,
    start: Instant,
) -> CheckResult {
    match health {
        Ok(HealthStatus::Healthy) => CheckResult::new(name, CheckStatus::Pass, "reachable", start),
        Ok(HealthStatus::Degraded(reason)) => CheckResult::new(name, CheckStatus::Warn, reason, start),
        Ok(HealthStatus::Unhealthy(reason)) => CheckResult::new(name, CheckStatus::Fail, reason, start),
        Err(e) => CheckResult::new(name, CheckStatus::Fail, e.to_string(), start),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qrdraft_config::model::StorageConfig;

    fn config_with_db(path: &str) -> QrdraftConfig {
        QrdraftConfig {
            storage: StorageConfig {
                database_path: path.to_string(),
                wal_mode: true,
            },
            ..QrdraftConfig::default()
        }
    }

    #[tokio::test]
    async fn missing_database_warns() {
        let result = check_database(&config_with_db("/tmp/nonexistent-qrdraft-test-xyz.db")).await;
        assert_eq!(result.status, CheckStatus::Warn);
        assert!(result.message.contains("not found"));
    }

    #[tokio::test]
    async fn existing_database_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        let config = config_with_db(path.to_str().unwrap());

        let cache = SqliteLocalCache::new(config.storage.clone());
        cache.initialize().await.unwrap();
        cache.close().await.unwrap();

        let result = check_database(&config).await;
        assert_eq!(result.status, CheckStatus::Pass, "{}", result.message);
    }

    #[test]
    fn health_maps_to_check_status() {
        let start = Instant::now();
        assert_eq!(
            health_result("x", Ok(HealthStatus::Degraded("slow".into())), start).status,
            CheckStatus::Warn
        );
        let failed = health_result("x", Err(DraftError::persistence("down")), start);
        assert_eq!(failed.status, CheckStatus::Fail);
        assert!(failed.message.contains("down"));
    }

    #[test]
    fn plain_lines_carry_tags() {
        let line = format_line(
            &CheckResult {
                name: "Local cache".into(),
                status: CheckStatus::Fail,
                message: "open failed".into(),
                duration: Duration::from_millis(3),
            },
            false,
        );
        assert!(line.contains("[FAIL]"));
        assert!(line.contains("open failed (3ms)"));
    }
}
