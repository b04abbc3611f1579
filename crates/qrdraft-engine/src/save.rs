// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Promotion of a draft into a named configuration.

use qrdraft_core::{ConfigurationStore, DraftError, DraftSession, NamedConfiguration, NewConfiguration};
use tracing::{info, warn};

use crate::audit;

/// Checks save preconditions: every section complete and a non-blank name.
pub fn validate(draft: &DraftSession, name: &str) -> Result<(), DraftError> {
    let missing_sections = draft.missing_sections();
    let missing_name = name.trim().is_empty();
    if missing_sections.is_empty() && !missing_name {
        return Ok(());
    }
    Err(DraftError::Validation {
        missing_sections,
        missing_name,
    })
}

/// Freezes the draft into the body sent to the configuration store.
pub fn assemble(draft: &DraftSession, name: &str, description: &str) -> NewConfiguration {
    NewConfiguration {
        name: name.trim().to_string(),
        description: description.trim().to_string(),
        sections: draft.sections.clone(),
        resources: draft
            .temporary_resources
            .iter()
            .map(|r| r.snapshot())
            .collect(),
        selected_resource_ids: draft
            .temporary_resources
            .iter()
            .filter(|r| draft.selected_resource_ids.contains(&r.id))
            .map(|r| r.id.clone())
            .collect(),
        email_templates: draft.templates.email_templates(),
        landing_template: draft.templates.landing.clone(),
    }
}

/// Validates, creates, and points resource targets at the new id.
///
/// The create is the only write whose failure is returned. When the
/// follow-up target rewrite cannot be stored the created configuration is
/// returned as the store has it, and the auditor fixes it on the next load.
pub async fn promote(
    store: &dyn ConfigurationStore,
    draft: &DraftSession,
    name: &str,
    description: &str,
) -> Result<NamedConfiguration, DraftError> {
    validate(draft, name)?;

    let body = assemble(draft, name, description);
    let mut created = store.create_configuration(&body).await?;
    info!(
        configuration_id = %created.id,
        resources = created.resources.len(),
        "draft promoted"
    );

    let mut aligned = created.clone();
    if !audit::align_targets(&mut aligned).is_empty() {
        match store.update_configuration(&aligned).await {
            Ok(stored) => created = stored,
            Err(e) => warn!(
                configuration_id = %created.id,
                error = %e,
                "resource targets not rewritten, leaving repair to the auditor"
            ),
        }
    }
    Ok(created)
}
