// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `qrdraft status` command implementation.
//!
//! Loads the draft the same way the engine does on startup and shows which
//! sections are configured and whether the draft can be saved.

use std::io::IsTerminal;

use chrono::{DateTime, Utc};
use qrdraft_config::QrdraftConfig;
use qrdraft_core::{DraftError, DraftSession, SectionIndex};
use serde::Serialize;

use crate::commands::Runtime;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub session_id: String,
    pub completed_sections: Vec<u8>,
    pub missing_sections: Vec<u8>,
    pub resources: usize,
    pub selected_resources: usize,
    pub templates: Vec<&'static str>,
    pub ready_to_save: bool,
    pub updated_at: DateTime<Utc>,
}

impl StatusResponse {
    pub fn from_draft(draft: &DraftSession) -> Self {
        let mut templates = Vec::new();
        if draft.templates.welcome.is_some() {
            templates.push("welcome");
        }
        if draft.templates.rebuy.is_some() {
            templates.push("rebuy");
        }
        if draft.templates.landing.is_some() {
            templates.push("landing");
        }
        Self {
            session_id: draft.session_id.clone(),
            completed_sections: draft.completed_sections.iter().map(|s| s.get()).collect(),
            missing_sections: draft.missing_sections().iter().map(|s| s.get()).collect(),
            resources: draft.temporary_resources.len(),
            selected_resources: draft.selected_resource_ids.len(),
            templates,
            ready_to_save: draft.all_sections_complete(),
            updated_at: draft.updated_at,
        }
    }
}

/// Run the `qrdraft status` command.
///
/// If `--json` is passed, outputs structured JSON for scripting.
/// If `--plain` is passed or stdout is not a TTY, disables colors.
pub async fn run_status(config: &QrdraftConfig, json: bool, plain: bool) -> Result<(), DraftError> {
    let runtime = Runtime::open(config).await?;
    let status = StatusResponse::from_draft(&runtime.engine.draft().await);
    runtime.close().await;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&status).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print_status(&status, use_color);
    }
    Ok(())
}

fn print_status(status: &StatusResponse, use_color: bool) {
    println!();
    println!("  qrdraft status");
    println!("  {}", "-".repeat(35));
    println!("    Session:   {}", status.session_id);

    for section in SectionIndex::ALL {
        let done = status.completed_sections.contains(&section.get());
        if use_color {
            use colored::Colorize;
            let mark = if done { "✓".green() } else { "·".dimmed() };
            println!("    Section {section}: {mark}");
        } else {
            let mark = if done { "[OK]" } else { "[--]" };
            println!("    Section {section}: {mark}");
        }
    }

    println!(
        "    Resources: {} ({} in use)",
        status.resources, status.selected_resources
    );
    if !status.templates.is_empty() {
        println!("    Templates: {}", status.templates.join(", "));
    }
    println!("    Updated:   {}", status.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!();
    if status.ready_to_save {
        println!("  Ready to save: qrdraft save <name>");
    } else {
        let missing: Vec<String> = status.missing_sections.iter().map(u8::to_string).collect();
        println!("  Not configured yet: section {}", missing.join(", "));
    }
    println!();
}
