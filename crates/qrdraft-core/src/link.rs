// SPDX-FileCopyrightText: 2026 qrdraft Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resource link parsing and rewriting.
//!
//! A resource target looks like `.../render/{configurationId}?resourceId={id}`.
//! Only the `{configurationId}` path segment is ever read or replaced; the
//! scheme, host, remaining path, query and fragment are preserved byte for byte.

use std::sync::LazyLock;

use regex::Regex;

/// Configuration id used in links generated before the draft is saved.
pub const DRAFT_PLACEHOLDER: &str = "DRAFT";

static RENDER_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/render/([^/?#]+)").expect("render segment pattern is valid")
});

/// Returns the configuration id embedded in `target`, if it has one.
pub fn embedded_configuration_id(target: &str) -> Option<&str> {
    RENDER_SEGMENT
        .captures(target)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Replaces the embedded configuration id with `configuration_id`.
///
/// Returns `None` when `target` has no `/render/{id}` segment.
pub fn rewrite_configuration_id(target: &str, configuration_id: &str) -> Option<String> {
    let segment = RENDER_SEGMENT.captures(target)?.get(1)?;
    let mut rewritten = String::with_capacity(target.len() + configuration_id.len());
    rewritten.push_str(&target[..segment.start()]);
    rewritten.push_str(configuration_id);
    rewritten.push_str(&target[segment.end()..]);
    Some(rewritten)
}

/// Builds the canonical render link for a resource.
pub fn render_link(base_url: &str, configuration_id: &str, resource_id: &str) -> String {
    format!(
        "{}/render/{configuration_id}?resourceId={resource_id}",
        base_url.trim_end_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn extracts_configuration_segment() {
        let target = "https://qr.example/app/render/cfg-B?resourceId=tmp-1&lang=de";
        assert_eq!(embedded_configuration_id(target), Some("cfg-B"));
    }

    #[test]
    fn no_segment_means_no_reference() {
        assert_eq!(embedded_configuration_id("https://example.com/menu"), None);
        assert_eq!(rewrite_configuration_id("https://example.com/menu", "cfg-A"), None);
    }

    #[test]
    fn rewrite_preserves_everything_else() {
        let target = "https://qr.example/app/render/cfg-B?resourceId=tmp-1&lang=de#top";
        assert_eq!(
            rewrite_configuration_id(target, "cfg-A").as_deref(),
            Some("https://qr.example/app/render/cfg-A?resourceId=tmp-1&lang=de#top")
        );
    }

    #[test]
    fn rewrite_handles_trailing_path() {
        let target = "/render/DRAFT/preview?resourceId=tmp-2";
        assert_eq!(
            rewrite_configuration_id(target, "cfg-42").as_deref(),
            Some("/render/cfg-42/preview?resourceId=tmp-2")
        );
    }

    #[test]
    fn render_link_trims_trailing_slash() {
        assert_eq!(
            render_link("https://qr.example/", DRAFT_PLACEHOLDER, "tmp-1"),
            "https://qr.example/render/DRAFT?resourceId=tmp-1"
        );
    }

    proptest! {
        #[test]
        fn rewritten_link_embeds_new_id(
            old in "[A-Za-z0-9-]{1,12}",
            new in "[A-Za-z0-9-]{1,12}",
            resource in "[a-z0-9-]{1,12}",
        ) {
            let target = render_link("https://qr.example", &old, &resource);
            let rewritten = rewrite_configuration_id(&target, &new).unwrap();
            prop_assert_eq!(embedded_configuration_id(&rewritten), Some(new.as_str()));
            prop_assert_eq!(rewritten, render_link("https://qr.example", &new, &resource));
        }

        #[test]
        fn rewrite_to_same_id_is_identity(id in "[A-Za-z0-9-]{1,12}") {
            let target = render_link("https://qr.example", &id, "tmp-1");
            prop_assert_eq!(rewrite_configuration_id(&target, &id), Some(target.clone()));
        }
    }
}
