// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Section completion tracking.
//!
//! A section is complete when it was explicitly touched or when its policy
//! in [`SECTION_POLICIES`] is satisfied by the current payload. Completion is
//! monotone: nothing here ever removes an index.

use qrdraft_core::{DraftSession, SectionIndex, SectionPayloads};
use serde_json::Value;
use tracing::debug;

/// How completion is derived for one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionPolicy {
    /// Complete when any listed field differs from the factory default.
    ValueDiffersFromDefault { fields: &'static [&'static str] },
    /// Complete only through an explicit touch.
    ExplicitOnly,
}

/// Policies for sections 1 through 5, in order.
pub const SECTION_POLICIES: [SectionPolicy; 5] = [
    SectionPolicy::ValueDiffersFromDefault {
        fields: &["guestCount", "guestRange"],
    },
    SectionPolicy::ValueDiffersFromDefault {
        fields: &["deliveryMethod", "fixedPrice", "pricingRules"],
    },
    SectionPolicy::ExplicitOnly,
    SectionPolicy::ExplicitOnly,
    SectionPolicy::ExplicitOnly,
];

impl SectionPolicy {
    pub fn for_section(section: SectionIndex) -> Self {
        SECTION_POLICIES[usize::from(section.get()) - 1]
    }

    /// Whether `payload` satisfies this policy without an explicit touch.
    pub fn is_satisfied(&self, section: SectionIndex, payload: &Value) -> bool {
        match self {
            SectionPolicy::ExplicitOnly => false,
            SectionPolicy::ValueDiffersFromDefault { fields } => {
                let defaults = SectionPayloads::default_for(section);
                fields.iter().any(|field| {
                    payload
                        .get(field)
                        .is_some_and(|value| Some(value) != defaults.get(field))
                })
            }
        }
    }
}

/// Marks `section` complete unconditionally.
pub fn mark_touched(draft: &mut DraftSession, section: SectionIndex) {
    if draft.completed_sections.insert(section) {
        debug!(section = %section, "section marked complete");
    }
}

/// Unions the heuristic result into `completed_sections`.
///
/// Returns the sections newly completed by this pass.
pub fn rederive(draft: &mut DraftSession) -> Vec<SectionIndex> {
    let mut added = Vec::new();
    for section in SectionIndex::ALL {
        if draft.completed_sections.contains(&section) {
            continue;
        }
        let policy = SectionPolicy::for_section(section);
        if policy.is_satisfied(section, draft.sections.get(section)) {
            draft.completed_sections.insert(section);
            added.push(section);
        }
    }
    if !added.is_empty() {
        debug!(sections = ?added, "sections completed by heuristic");
    }
    added
}
