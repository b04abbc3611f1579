// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end draft lifecycle tests over the mock stores.

use std::time::Duration;

use chrono::Utc;
use qrdraft_core::traits::storage::keys;
use qrdraft_core::{
    DraftError, NamedConfiguration, ResourceSnapshot, SectionIndex, SectionPayloads,
    TemplateKind, TemporaryResource,
};
use qrdraft_test_utils::{SessionEvent, TestHarness};
use serde_json::json;

fn s(n: u8) -> SectionIndex {
    SectionIndex::new(n).unwrap()
}

fn draft_resource(id: &str) -> TemporaryResource {
    TemporaryResource {
        id: id.into(),
        name: "Table 1".into(),
        target: Some(format!("https://qr.example/render/DRAFT?resourceId={id}")),
        description: None,
        is_temporary: true,
        customizations: None,
    }
}

fn saved(id: &str, resources: Vec<ResourceSnapshot>) -> NamedConfiguration {
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

#[tokio::test]
async fn save_with_section_five_untouched_is_rejected() {
    let h = TestHarness::builder().build().await;
    for n in 1..=4 {
        h.engine.mark_touched(s(n)).await.unwrap();
    }

    let err = h.engine.save("Summer promo", "").await.unwrap_err();
    assert!(matches!(err, DraftError::Validation { .. }));
    assert_eq!(err.to_string(), "section 5 not configured");
    assert_eq!(h.configurations.write_count(), 0);
    assert_eq!(h.engine.draft().await.completed_sections.len(), 4);
}

#[tokio::test]
async fn save_promotes_and_rewrites_draft_links() {
    let h = TestHarness::builder()
        .with_next_configuration_id(42)
        .build()
        .await;
    let engine = &h.engine;
    for n in 1..=4 {
        engine.mark_touched(s(n)).await.unwrap();
    }
    engine.ingest(vec![draft_resource("tmp-1")]).await;
    engine.set_resource_selected("tmp-1", true).await.unwrap();
    engine
        .attach_template(TemplateKind::Welcome, json!({"subject": "Welcome"}))
        .await
        .unwrap();
    let old_session = engine.session_id().await;

    let configuration = engine.save("Summer promo", "Terrace tables").await.unwrap();

    assert_eq!(configuration.id, "cfg-42");
    assert_eq!(
        configuration.resources[0].target.as_deref(),
        Some("https://qr.example/render/cfg-42?resourceId=tmp-1")
    );
    assert!(!configuration.resources[0].is_temporary);
    assert_eq!(configuration.selected_resource_ids, vec!["tmp-1".to_string()]);
    assert!(
        configuration
            .email_templates
            .as_ref()
            .is_some_and(|t| t.welcome.is_some())
    );

    let draft = engine.draft().await;
    assert!(draft.is_empty());
    assert_ne!(draft.session_id, old_session);
    assert_eq!(engine.configurations().await, vec![configuration]);
    assert!(
        h.sessions
            .events()
            .contains(&SessionEvent::Delete(old_session))
    );
}

#[tokio::test]
async fn fresh_load_after_save_is_empty() {
    let h = TestHarness::builder().build().await;
    for n in 1..=5 {
        h.engine.mark_touched(s(n)).await.unwrap();
    }
    h.engine.flush().await.unwrap();
    h.engine.save("Promo", "").await.unwrap();

    let reloaded = h.open_window().await;
    let draft = reloaded.draft().await;
    assert!(draft.completed_sections.is_empty());
    assert!(draft.temporary_resources.is_empty());
    assert_eq!(draft.session_id, h.engine.session_id().await);
}

#[tokio::test]
async fn failed_create_keeps_everything() {
    let h = TestHarness::builder().build().await;
    for n in 1..=5 {
        h.engine.mark_touched(s(n)).await.unwrap();
    }
    h.configurations.fail_create(true);
    let before = h.engine.draft().await;

    assert!(h.engine.save("Promo", "").await.is_err());
    assert_eq!(h.engine.draft().await, before);
    assert!(h.engine.configurations().await.is_empty());

    let reloaded = h.open_window().await;
    assert_eq!(reloaded.draft().await.completed_sections.len(), 5);
}

#[tokio::test]
async fn save_adopts_newer_state_from_another_window() {
    let h = TestHarness::builder().build().await;
    for n in 1..=4 {
        h.engine.mark_touched(s(n)).await.unwrap();
    }

    // A second window on the same profile finishes the last section.
    let other = h.open_window().await;
    other.ingest(vec![draft_resource("tmp-9")]).await;

    let configuration = h.engine.save("Promo", "").await.unwrap();
    assert_eq!(configuration.resources.len(), 1);
    assert_eq!(configuration.resources[0].id, "tmp-9");
}

#[tokio::test]
async fn newer_remote_copy_wins_on_load() {
    let h = TestHarness::builder().build().await;
    h.engine
        .update_section(s(1), json!({"guestCount": 4, "guestRange": {"min": 1, "max": 4}}))
        .await
        .unwrap();
    h.engine.flush().await.unwrap();

    // Another device advanced the remote copy past the local one.
    let mut remote = h.sessions.stored(&h.engine.session_id().await).unwrap();
    remote
        .sections
        .set(s(2), json!({"deliveryMethod": "PICKUP", "fixedPrice": 0, "pricingRules": []}));
    remote.touch();
    h.sessions.insert(remote);

    let reloaded = h.open_window().await;
    let draft = reloaded.draft().await;
    assert_eq!(draft.sections.get(s(2))["deliveryMethod"], json!("PICKUP"));
    // Section 2 was never marked; the heuristic derives it.
    assert!(draft.completed_sections.contains(&s(2)));
    assert!(draft.completed_sections.contains(&s(1)));
}

#[tokio::test]
async fn older_remote_copy_loses_on_load() {
    let h = TestHarness::builder().build().await;
    h.engine.mark_touched(s(3)).await.unwrap();
    h.engine.flush().await.unwrap();
    h.engine.mark_touched(s(4)).await.unwrap();

    let reloaded = h.open_window().await;
    let draft = reloaded.draft().await;
    assert!(draft.completed_sections.contains(&s(4)));
}

#[tokio::test(start_paused = true)]
async fn burst_of_edits_sends_one_put() {
    let h = TestHarness::builder().started().build().await;
    for n in 1..=3u64 {
        h.engine
            .update_section(s(1), json!({"guestCount": n, "guestRange": {"min": 1, "max": n}}))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    tokio::time::sleep(Duration::from_secs(2)).await;

    let puts = h.sessions.puts();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].sections.get(s(1))["guestCount"], json!(3));
    h.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn push_and_poll_paths_converge() {
    let h = TestHarness::builder()
        .with_polling(Duration::from_millis(500))
        .started()
        .build()
        .await;

    let pushed = draft_resource("tmp-shared");
    h.engine.resource_bus().publish(pushed.clone()).await.unwrap();
    h.cache.insert_raw(
        keys::PENDING_RESOURCES,
        &serde_json::to_string(&vec![pushed, draft_resource("tmp-other")]).unwrap(),
    );
    tokio::time::sleep(Duration::from_secs(1)).await;

    let draft = h.engine.draft().await;
    let ids: Vec<_> = draft.temporary_resources.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["tmp-shared", "tmp-other"]);
    assert!(draft.completed_sections.contains(&SectionIndex::RESOURCES));
    assert!(h.cache.raw(keys::PENDING_RESOURCES).is_none());
    h.engine.shutdown().await;
}

#[tokio::test]
async fn configuration_load_repairs_foreign_links_once() {
    let h = TestHarness::builder()
        .with_configurations(vec![
            saved(
                "cfg-A",
                vec![ResourceSnapshot {
                    id: "r1".into(),
                    name: "Bar".into(),
                    target: Some("https://qr.example/render/cfg-B?resourceId=r1#top".into()),
                    description: None,
                    is_temporary: false,
                    customizations: None,
                }],
            ),
            saved("cfg-B", vec![]),
        ])
        .build()
        .await;

    let list = h.engine.load_configurations().await.unwrap();
    assert_eq!(
        list[0].resources[0].target.as_deref(),
        Some("https://qr.example/render/cfg-A?resourceId=r1#top")
    );
    let writes = h.configurations.write_count();
    assert_eq!(writes, 1);
    assert_eq!(h.engine.repair_history().await.unwrap().len(), 1);

    let report = h.engine.audit_configurations().await.unwrap();
    assert!(report.is_clean());
    assert_eq!(h.configurations.write_count(), writes);
}

#[tokio::test]
async fn deleting_configuration_drops_it_from_list() {
    let h = TestHarness::builder()
        .with_configurations(vec![saved("cfg-1", vec![]), saved("cfg-2", vec![])])
        .build()
        .await;
    h.engine.load_configurations().await.unwrap();

    h.engine.delete_configuration("cfg-1").await.unwrap();
    let ids: Vec<_> = h
        .engine
        .configurations()
        .await
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids, ["cfg-2"]);
    assert!(matches!(
        h.engine.delete_configuration("cfg-1").await,
        Err(DraftError::NotFound(_))
    ));
}
