// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resource ingestion from a sibling editor.
//!
//! Resources arrive on two paths: the [`ResourceBus`] push channel and the
//! local-cache inbox read by [`InboxPoller`]. Both end in [`merge`], which
//! appends only ids not already present, so duplicate deliveries converge.

use std::collections::HashSet;
use std::sync::Arc;

use qrdraft_core::traits::storage::keys;
use qrdraft_core::{DraftError, DraftSession, LocalCache, SectionIndex, TemporaryResource};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::tracker;

/// Producer side of the push channel.
#[derive(Debug, Clone)]
pub struct ResourceBus {
    tx: mpsc::Sender<TemporaryResource>,
}

impl ResourceBus {
    /// Creates a bus and the receiver the engine consumes.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<TemporaryResource>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Publishes a resource, waiting for capacity.
    pub async fn publish(&self, resource: TemporaryResource) -> Result<(), DraftError> {
        self.tx
            .send(resource)
            .await
            .map_err(|_| DraftError::Internal("resource bus closed".into()))
    }
}

/// Decodes an inbox slot holding one descriptor or a list of them.
///
/// List elements that do not decode are skipped. Returns `None` when the
/// slot is not JSON or holds neither shape.
fn decode_slot(key: &str, raw: &str) -> Option<Vec<TemporaryResource>> {
    match serde_json::from_str::<Value>(raw).ok()? {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match serde_json::from_value(item) {
                    Ok(resource) => Some(resource),
                    Err(e) => {
                        warn!(key, error = %e, "skipping malformed inbox element");
                        None
                    }
                })
                .collect(),
        ),
        item @ Value::Object(_) => serde_json::from_value(item).ok().map(|one| vec![one]),
        _ => None,
    }
}

/// Appends every resource whose id is not already in the draft.
///
/// Any append marks the resources section complete. Returns the number of
/// resources appended.
pub fn merge(draft: &mut DraftSession, incoming: Vec<TemporaryResource>) -> usize {
    let mut known: HashSet<String> = draft
        .temporary_resources
        .iter()
        .map(|r| r.id.clone())
        .collect();

    let mut appended = 0;
    for resource in incoming {
        if !known.insert(resource.id.clone()) {
            debug!(resource_id = %resource.id, "duplicate resource ignored");
            continue;
        }
        debug!(resource_id = %resource.id, name = %resource.name, "resource ingested");
        draft.temporary_resources.push(resource);
        appended += 1;
    }
    if appended > 0 {
        tracker::mark_touched(draft, SectionIndex::RESOURCES);
    }
    appended
}

/// One inbox slot that held resources.
#[derive(Debug)]
pub struct InboxEntry {
    pub key: &'static str,
    pub resources: Vec<TemporaryResource>,
    /// The slot exactly as read.
    raw: String,
}

/// Reads the local-cache inbox keys.
///
/// The poller never modifies the draft itself: callers merge the entries
/// and then [`InboxPoller::acknowledge`] them.
pub struct InboxPoller {
    cache: Arc<dyn LocalCache>,
}

impl InboxPoller {
    pub fn new(cache: Arc<dyn LocalCache>) -> Self {
        Self { cache }
    }

    /// Collects pending entries. Slots that do not decode at all are logged
    /// and cleared.
    pub async fn pending(&self) -> Vec<InboxEntry> {
        let mut entries = Vec::new();
        for key in keys::INBOX {
            let raw = match self.cache.get(key).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    warn!(key, error = %e, "inbox unreadable");
                    continue;
                }
            };
            match decode_slot(key, &raw) {
                Some(resources) => entries.push(InboxEntry { key, resources, raw }),
                None => {
                    warn!(key, "discarding malformed inbox entry");
                    self.remove(key).await;
                }
            }
        }
        entries
    }

    /// Clears the descriptors of a merged entry from its slot.
    ///
    /// A slot rewritten since it was read keeps every descriptor the entry
    /// did not carry.
    pub async fn acknowledge(&self, entry: &InboxEntry) {
        let key = entry.key;
        let current = match self.cache.get(key).await {
            Ok(Some(current)) => current,
            Ok(None) => return,
            Err(e) => {
                warn!(key, error = %e, "inbox unreadable, entry left in place");
                return;
            }
        };
        if current == entry.raw {
            self.remove(key).await;
            return;
        }

        let consumed: HashSet<&str> = entry.resources.iter().map(|r| r.id.as_str()).collect();
        let remainder: Vec<TemporaryResource> = decode_slot(key, &current)
            .unwrap_or_default()
            .into_iter()
            .filter(|r| !consumed.contains(r.id.as_str()))
            .collect();
        if remainder.is_empty() {
            self.remove(key).await;
            return;
        }

        let written = match serde_json::to_string(&remainder) {
            Ok(json) => self.cache.set(key, &json).await,
            Err(e) => Err(DraftError::Internal(format!("failed to encode inbox: {e}"))),
        };
        match written {
            Ok(()) => info!(key, left = remainder.len(), "inbox entry consumed, newer descriptors kept"),
            Err(e) => warn!(key, error = %e, "failed to rewrite inbox entry"),
        }
    }

    async fn remove(&self, key: &str) {
        match self.cache.remove(key).await {
            Ok(()) => info!(key, "inbox entry consumed"),
            Err(e) => warn!(key, error = %e, "failed to clear inbox entry"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qrdraft_test_utils::MemoryLocalCache;

    fn resource(id: &str) -> TemporaryResource {
        TemporaryResource {
            id: id.into(),
            name: format!("Resource {id}"),
            target: Some(format!("https://qr.example/render/DRAFT?resourceId={id}")),
            description: None,
            is_temporary: true,
            customizations: None,
        }
    }

    #[test]
    fn merging_same_descriptor_twice_yields_one_entry() {
        let mut draft = DraftSession::new("sess-1");
        assert_eq!(merge(&mut draft, vec![resource("tmp-1")]), 1);
        assert_eq!(merge(&mut draft, vec![resource("tmp-1")]), 0);
        assert_eq!(draft.temporary_resources.len(), 1);
        assert!(draft.completed_sections.contains(&SectionIndex::RESOURCES));
    }

    #[test]
    fn duplicates_within_one_batch_collapse() {
        let mut draft = DraftSession::new("sess-1");
        let appended = merge(
            &mut draft,
            vec![resource("tmp-1"), resource("tmp-2"), resource("tmp-1")],
        );
        assert_eq!(appended, 2);
        let ids: Vec<_> = draft.temporary_resources.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["tmp-1", "tmp-2"]);
    }

    #[test]
    fn empty_merge_leaves_completion_alone() {
        let mut draft = DraftSession::new("sess-1");
        assert_eq!(merge(&mut draft, vec![]), 0);
        assert!(draft.completed_sections.is_empty());
    }

    #[tokio::test]
    async fn poller_reads_single_and_list_slots() {
        let cache = Arc::new(MemoryLocalCache::new());
        cache.insert_raw(
            keys::PENDING_RESOURCE,
            r#"{"id":"tmp-a","name":"A","target":null}"#,
        );
        cache.insert_raw(
            keys::PENDING_RESOURCES,
            r#"[{"id":"tmp-b","name":"B"},{"id":"tmp-c","name":"C"}]"#,
        );
        let poller = InboxPoller::new(cache.clone());

        let entries = poller.pending().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, keys::PENDING_RESOURCE);
        assert_eq!(entries[0].resources[0].id, "tmp-a");
        assert_eq!(entries[1].resources.len(), 2);

        // Reading alone does not consume.
        assert!(cache.raw(keys::PENDING_RESOURCE).is_some());
        poller.acknowledge(&entries[0]).await;
        assert!(cache.raw(keys::PENDING_RESOURCE).is_none());
    }

    #[tokio::test]
    async fn acknowledge_keeps_descriptors_written_after_the_read() {
        let cache = Arc::new(MemoryLocalCache::new());
        cache.insert_raw(keys::PENDING_RESOURCES, r#"[{"id":"tmp-a","name":"A"}]"#);
        let poller = InboxPoller::new(cache.clone());
        let entries = poller.pending().await;

        // The sibling editor appends while the entry is being merged.
        cache.insert_raw(
            keys::PENDING_RESOURCES,
            r#"[{"id":"tmp-a","name":"A"},{"id":"tmp-late","name":"Late"}]"#,
        );
        poller.acknowledge(&entries[0]).await;

        let left = poller.pending().await;
        assert_eq!(left.len(), 1);
        let ids: Vec<_> = left[0].resources.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["tmp-late"]);
    }

    #[tokio::test]
    async fn acknowledge_removes_slot_once_only_merged_ids_remain() {
        let cache = Arc::new(MemoryLocalCache::new());
        cache.insert_raw(keys::PENDING_RESOURCE, r#"{"id":"tmp-a","name":"A"}"#);
        let poller = InboxPoller::new(cache.clone());
        let entries = poller.pending().await;

        // Same descriptor, different formatting.
        cache.insert_raw(keys::PENDING_RESOURCE, r#"{"name":"A","id":"tmp-a"}"#);
        poller.acknowledge(&entries[0]).await;
        assert!(cache.raw(keys::PENDING_RESOURCE).is_none());
    }

    #[tokio::test]
    async fn malformed_list_element_does_not_drop_its_neighbours() {
        let cache = Arc::new(MemoryLocalCache::new());
        cache.insert_raw(
            keys::PENDING_RESOURCES,
            r#"[{"id":"tmp-a","name":"A"},{"name":42},{"id":"tmp-b","name":"B"}]"#,
        );
        let poller = InboxPoller::new(cache.clone());

        let entries = poller.pending().await;
        assert_eq!(entries.len(), 1);
        let ids: Vec<_> = entries[0].resources.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["tmp-a", "tmp-b"]);
    }

    #[tokio::test]
    async fn malformed_inbox_slot_is_cleared() {
        let cache = Arc::new(MemoryLocalCache::new());
        cache.insert_raw(keys::PENDING_RESOURCES, "[oops");
        let poller = InboxPoller::new(cache.clone());

        assert!(poller.pending().await.is_empty());
        assert!(cache.raw(keys::PENDING_RESOURCES).is_none());
    }

    #[tokio::test]
    async fn bus_delivers_in_order() {
        let (bus, mut rx) = ResourceBus::channel(4);
        bus.publish(resource("tmp-1")).await.unwrap();
        bus.publish(resource("tmp-2")).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().id, "tmp-1");
        assert_eq!(rx.recv().await.unwrap().id, "tmp-2");

        drop(rx);
        assert!(bus.publish(resource("tmp-3")).await.is_err());
    }
}
