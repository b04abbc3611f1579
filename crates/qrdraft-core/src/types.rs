// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the stores, the engine and the CLI.
//!
//! Wire names are camelCase so the same JSON shapes travel through the local
//! cache, the remote session store and the configuration store.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum::{Display, EnumString};

use crate::link;

/// Prefix of session identifiers generated by this engine.
pub const SESSION_ID_PREFIX: &str = "sess-";

/// Prefix distinguishing temporary (not yet promoted) resource ids.
pub const TEMPORARY_ID_PREFIX: &str = "tmp-";

/// Number of sections in the wizard.
pub const SECTION_COUNT: usize = 5;

/// One of the five wizard sections, numbered 1 through 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SectionIndex(u8);

impl SectionIndex {
    /// All sections in order.
    pub const ALL: [SectionIndex; SECTION_COUNT] = [
        SectionIndex(1),
        SectionIndex(2),
        SectionIndex(3),
        SectionIndex(4),
        SectionIndex(5),
    ];

    /// The section that tracks attached resources (landing links).
    pub const RESOURCES: SectionIndex = SectionIndex(5);

    /// Returns `None` unless `n` is within `1..=5`.
    pub fn new(n: u8) -> Option<Self> {
        (1..=SECTION_COUNT as u8).contains(&n).then_some(SectionIndex(n))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    fn slot(self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl fmt::Display for SectionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for SectionIndex {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        SectionIndex::new(n).ok_or_else(|| format!("section index {n} is outside 1..=5"))
    }
}

impl From<SectionIndex> for u8 {
    fn from(index: SectionIndex) -> u8 {
        index.0
    }
}

/// The five free-form section payloads of a draft.
///
/// The engine treats payloads as opaque JSON and only inspects the fields
/// named by the section policy table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionPayloads([Value; SECTION_COUNT]);

impl SectionPayloads {
    /// Factory default payload of a single section.
    pub fn default_for(section: SectionIndex) -> Value {
        match section.get() {
            1 => json!({ "guestCount": 1, "guestRange": { "min": 1, "max": 1 } }),
            2 => json!({ "deliveryMethod": "DIRECT", "fixedPrice": 0, "pricingRules": [] }),
            3 => json!({ "rebuyDiscount": null, "loyaltyTiers": [] }),
            4 => json!({ "welcomeTemplateId": null, "rebuyTemplateId": null }),
            _ => json!({ "landingTemplateId": null, "theme": null }),
        }
    }

    pub fn get(&self, section: SectionIndex) -> &Value {
        &self.0[section.slot()]
    }

    pub fn set(&mut self, section: SectionIndex, payload: Value) {
        self.0[section.slot()] = payload;
    }

    /// Iterates `(section, payload)` pairs in section order.
    pub fn iter(&self) -> impl Iterator<Item = (SectionIndex, &Value)> {
        SectionIndex::ALL.into_iter().zip(self.0.iter())
    }
}

impl Default for SectionPayloads {
    fn default() -> Self {
        SectionPayloads(SectionIndex::ALL.map(SectionPayloads::default_for))
    }
}

/// Which attached template slot a payload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Welcome,
    Rebuy,
    Landing,
}

/// Templates attached to a draft, each independently nullable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateAttachments {
    #[serde(default)]
    pub welcome: Option<Value>,
    #[serde(default)]
    pub rebuy: Option<Value>,
    #[serde(default)]
    pub landing: Option<Value>,
}

impl TemplateAttachments {
    pub fn slot_mut(&mut self, kind: TemplateKind) -> &mut Option<Value> {
        match kind {
            TemplateKind::Welcome => &mut self.welcome,
            TemplateKind::Rebuy => &mut self.rebuy,
            TemplateKind::Landing => &mut self.landing,
        }
    }

    /// Frozen email templates, or `None` when neither slot is filled.
    pub fn email_templates(&self) -> Option<EmailTemplates> {
        if self.welcome.is_none() && self.rebuy.is_none() {
            return None;
        }
        Some(EmailTemplates {
            welcome: self.welcome.clone(),
            rebuy: self.rebuy.clone(),
        })
    }
}

/// A named link created during the draft and not yet promoted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporaryResource {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_temporary: bool,
    /// Section-shaped overrides for this one resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customizations: Option<Value>,
}

fn default_true() -> bool {
    true
}

impl TemporaryResource {
    /// Creates a resource with a fresh `tmp-` id.
    pub fn new(name: impl Into<String>, target: Option<String>) -> Self {
        Self {
            id: format!("{TEMPORARY_ID_PREFIX}{}", uuid::Uuid::new_v4()),
            name: name.into(),
            target,
            description: None,
            is_temporary: true,
            customizations: None,
        }
    }

    /// Freezes this resource into a configuration-owned snapshot.
    pub fn snapshot(&self) -> ResourceSnapshot {
        ResourceSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            target: self.target.clone(),
            description: self.description.clone(),
            is_temporary: false,
            customizations: self.customizations.clone(),
        }
    }
}

/// The in-progress wizard state for one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSession {
    pub session_id: String,
    #[serde(default)]
    pub sections: SectionPayloads,
    #[serde(default)]
    pub completed_sections: BTreeSet<SectionIndex>,
    #[serde(default)]
    pub temporary_resources: Vec<TemporaryResource>,
    #[serde(default)]
    pub selected_resource_ids: BTreeSet<String>,
    #[serde(default)]
    pub templates: TemplateAttachments,
    pub updated_at: DateTime<Utc>,
}

impl DraftSession {
    /// Creates an empty draft for the given session id.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            sections: SectionPayloads::default(),
            completed_sections: BTreeSet::new(),
            temporary_resources: Vec::new(),
            selected_resource_ids: BTreeSet::new(),
            templates: TemplateAttachments::default(),
            updated_at: Utc::now(),
        }
    }

    /// Creates an empty draft under a newly generated session id.
    pub fn fresh() -> Self {
        Self::new(generate_session_id())
    }

    /// Records a mutation. `updated_at` strictly increases across calls.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + chrono::Duration::microseconds(1)
        };
    }

    /// True when nothing has been entered yet.
    pub fn is_empty(&self) -> bool {
        self.completed_sections.is_empty()
            && self.temporary_resources.is_empty()
            && self.selected_resource_ids.is_empty()
            && self.templates == TemplateAttachments::default()
            && self.sections == SectionPayloads::default()
    }

    pub fn all_sections_complete(&self) -> bool {
        self.completed_sections.len() == SECTION_COUNT
    }

    /// Sections not yet marked complete, in order.
    pub fn missing_sections(&self) -> Vec<SectionIndex> {
        SectionIndex::ALL
            .into_iter()
            .filter(|s| !self.completed_sections.contains(s))
            .collect()
    }

    pub fn resource(&self, id: &str) -> Option<&TemporaryResource> {
        self.temporary_resources.iter().find(|r| r.id == id)
    }

    pub fn resource_mut(&mut self, id: &str) -> Option<&mut TemporaryResource> {
        self.temporary_resources.iter_mut().find(|r| r.id == id)
    }
}

/// Generates a new opaque session identifier.
pub fn generate_session_id() -> String {
    format!("{SESSION_ID_PREFIX}{}", uuid::Uuid::new_v4())
}

/// Frozen email templates of a saved configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTemplates {
    #[serde(default)]
    pub welcome: Option<Value>,
    #[serde(default)]
    pub rebuy: Option<Value>,
}

/// A resource owned by a saved configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSnapshot {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Always `false` once owned by a configuration.
    #[serde(default)]
    pub is_temporary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customizations: Option<Value>,
}

impl ResourceSnapshot {
    /// The owning-configuration id embedded in `target`, if any.
    pub fn embedded_configuration_id(&self) -> Option<&str> {
        self.target.as_deref().and_then(link::embedded_configuration_id)
    }
}

/// Snapshot submitted to the configuration store; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConfiguration {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub sections: SectionPayloads,
    #[serde(default)]
    pub resources: Vec<ResourceSnapshot>,
    #[serde(default)]
    pub selected_resource_ids: Vec<String>,
    #[serde(default)]
    pub email_templates: Option<EmailTemplates>,
    #[serde(default)]
    pub landing_template: Option<Value>,
}

/// A durably saved configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedConfiguration {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub sections: SectionPayloads,
    #[serde(default)]
    pub resources: Vec<ResourceSnapshot>,
    #[serde(default)]
    pub selected_resource_ids: Vec<String>,
    #[serde(default)]
    pub email_templates: Option<EmailTemplates>,
    #[serde(default)]
    pub landing_template: Option<Value>,
}

/// A resource whose embedded owner reference does not match its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyIssue {
    pub configuration_id: String,
    pub resource_id: String,
    pub embedded_id: String,
}

/// One applied repair, kept in the append-only repair log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairRecord {
    pub configuration_id: String,
    pub resource_id: String,
    pub previous_target: String,
    pub repaired_target: String,
    pub repaired_at: DateTime<Utc>,
}

/// Health status reported by store health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Store is fully operational.
    Healthy,
    /// Store is operational but experiencing issues.
    Degraded(String),
    /// Store is not operational.
    Unhealthy(String),
}

/// Identifies the kind of store behind an adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    LocalCache,
    SessionStore,
    ConfigurationStore,
}
