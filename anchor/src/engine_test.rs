#![allow(clippy::float_cmp)]

use uuid::Uuid;

use super::*;
use crate::marker::open_tag;

fn ann(context: &str, comment: &str) -> Annotation {
    Annotation::new(Uuid::new_v4(), context, comment)
}

fn marked(a: &Annotation, text: &str) -> String {
    format!("{}{text}</span>", open_tag(&a.id.to_string(), &a.comment_text))
}

// =============================================================
// Scenarios
// =============================================================

#[test]
fn exact_match_wraps_single_span() {
    let a = ann("quick brown", "nice fox");
    let out = anchor_default("The quick brown fox", std::slice::from_ref(&a));

    assert_eq!(out.content, format!("The {} fox", marked(&a, "quick brown")));
    assert_eq!(out.content.matches("context-highlight").count(), 1);
    assert!(out.content.contains("data-comment=\"nice%20fox\""));

    let r = &out.results[0];
    assert_eq!(r.match_kind, MatchKind::Exact);
    assert_eq!(r.matched_span.as_deref(), Some("quick brown"));
    assert_eq!(r.start_offset, Some(4));
    assert_eq!(r.similarity, 1.0);
}

#[test]
fn longer_span_wins_and_nested_shorter_is_unmatched() {
    let short = ann("brown fox", "short");
    let long = ann("quick brown fox", "long");
    let out = anchor_default("The quick brown fox", &[short.clone(), long.clone()]);

    assert_eq!(out.content, format!("The {}", marked(&long, "quick brown fox")));
    assert_eq!(out.results[0].annotation_id, short.id);
    assert_eq!(out.results[0].match_kind, MatchKind::Unmatched);
    assert_eq!(out.results[0].matched_span, None);
    assert_eq!(out.results[0].start_offset, None);
    assert_eq!(out.results[1].annotation_id, long.id);
    assert_eq!(out.results[1].match_kind, MatchKind::Exact);
}

#[test]
fn single_substitution_is_recovered_by_fuzzy_match() {
    let a = ann("quick brown", "nice fox");
    let out = anchor_default("The quick brawn fox", std::slice::from_ref(&a));

    assert_eq!(out.content, format!("The {} fox", marked(&a, "quick brawn")));
    let r = &out.results[0];
    assert_eq!(r.match_kind, MatchKind::Fuzzy);
    assert_eq!(r.matched_span.as_deref(), Some("quick brawn"));
    assert_eq!(r.start_offset, Some(4));
    assert_eq!(r.similarity, 10.0 / 11.0);
}

#[test]
fn strict_threshold_rejects_borderline_window() {
    let a = ann("abcdefghij", "c");
    let default = anchor_default("xx abcdefghiX", std::slice::from_ref(&a));
    assert_eq!(default.results[0].match_kind, MatchKind::Fuzzy);

    let strict = anchor("xx abcdefghiX", std::slice::from_ref(&a), &AnchorOptions::strict());
    assert_eq!(strict.results[0].match_kind, MatchKind::Unmatched);
    assert_eq!(strict.content, "xx abcdefghiX");
}

#[test]
fn insertion_defeats_positional_match() {
    let a = ann("quick brown", "c");
    let out = anchor_default("The quick  brown fox", std::slice::from_ref(&a));
    assert_eq!(out.results[0].match_kind, MatchKind::Unmatched);
    assert_eq!(out.content, "The quick  brown fox");
}

// =============================================================
// Ordering and idempotence
// =============================================================

#[test]
fn longest_context_is_processed_first_regardless_of_input_order() {
    let a = ann("cdef", "a");
    let b = ann("zzzz", "b");
    let c = ann("abcdefghij", "c");
    let out = anchor_default("xx abcdefghij yy cdef", &[a.clone(), b.clone(), c.clone()]);

    // Had "cdef" gone first it would have split the longer span.
    let rc = out.result_for(c.id).unwrap();
    assert_eq!(rc.match_kind, MatchKind::Exact);
    assert_eq!(rc.start_offset, Some(3));
    let ra = out.result_for(a.id).unwrap();
    assert_eq!(ra.match_kind, MatchKind::Exact);
    assert_eq!(ra.start_offset, Some(17));
    assert_eq!(out.result_for(b.id).unwrap().match_kind, MatchKind::Unmatched);

    let ids: Vec<_> = out.results.iter().map(|r| r.annotation_id).collect();
    assert_eq!(ids, vec![a.id, b.id, c.id]);
    assert_eq!(out.matched_count(), 2);
}

#[test]
fn equal_lengths_keep_input_order() {
    let first = ann("fox", "first");
    let second = ann("fox", "second");
    let out = anchor_default("fox and fox", &[first.clone(), second.clone()]);
    assert_eq!(out.result_for(first.id).unwrap().start_offset, Some(0));
    assert_eq!(out.result_for(second.id).unwrap().start_offset, Some(8));
    assert_eq!(out.content, format!("{} and {}", marked(&first, "fox"), marked(&second, "fox")));
}

#[test]
fn duplicate_context_with_one_occurrence_leaves_second_unmatched() {
    let first = ann("fox", "1");
    let second = ann("fox", "2");
    let out = anchor_default("the fox jumps", &[first.clone(), second.clone()]);
    assert_eq!(out.result_for(first.id).unwrap().match_kind, MatchKind::Exact);
    assert_eq!(out.result_for(second.id).unwrap().match_kind, MatchKind::Unmatched);
}

#[test]
fn duplicate_context_takes_the_next_occurrence() {
    let first = ann("fox", "1");
    let second = ann("fox", "2");
    let out = anchor_default("a fox and a fox", &[first.clone(), second.clone()]);

    let r1 = out.result_for(first.id).unwrap();
    let r2 = out.result_for(second.id).unwrap();
    assert_eq!((r1.match_kind, r1.start_offset), (MatchKind::Exact, Some(2)));
    assert_eq!((r2.match_kind, r2.start_offset), (MatchKind::Exact, Some(12)));
    assert_eq!(markers(&out.content).len(), 2);
    assert_eq!(out.content, format!("a {} and a {}", marked(&first, "fox"), marked(&second, "fox")));
}

#[test]
fn rerunning_on_output_is_a_no_op() {
    let a = ann("quick brown", "nice fox");
    let once = anchor_default("The quick brown fox", std::slice::from_ref(&a));
    let twice = anchor_default(&once.content, std::slice::from_ref(&a));

    assert_eq!(twice.content, once.content);
    assert_eq!(twice.results[0].match_kind, MatchKind::Exact);
    assert_eq!(twice.results[0].matched_span.as_deref(), Some("quick brown"));
}

#[test]
fn existing_highlight_blocks_other_annotations() {
    let a = ann("quick brown", "first");
    let rendered = anchor_default("The quick brown fox", std::slice::from_ref(&a)).content;

    let b = ann("brown", "second");
    let out = anchor_default(&rendered, std::slice::from_ref(&b));
    assert_eq!(out.results[0].match_kind, MatchKind::Unmatched);
    assert_eq!(out.content, rendered);
}

// =============================================================
// Incremental wrap
// =============================================================

#[test]
fn wrap_new_only_touches_the_new_span() {
    let a = ann("quick brown", "first");
    let rendered = anchor_default("The quick brown fox", std::slice::from_ref(&a)).content;

    let b = ann("fox", "second");
    let out = wrap_new(&rendered, &b, &AnchorOptions::default());
    assert_eq!(out.content, format!("The {} {}", marked(&a, "quick brown"), marked(&b, "fox")));
    assert_eq!(out.results.len(), 1);
    assert_eq!(out.results[0].annotation_id, b.id);
}

// =============================================================
// Edge cases
// =============================================================

#[test]
fn no_annotations_returns_content_unchanged() {
    let out = anchor_default("<p>hello &amp; world</p>", &[]);
    assert_eq!(out.content, "<p>hello &amp; world</p>");
    assert!(out.results.is_empty());
}

#[test]
fn empty_context_is_reported_unmatched() {
    let a = ann("", "c");
    let out = anchor_default("anything", std::slice::from_ref(&a));
    assert_eq!(out.results[0].match_kind, MatchKind::Unmatched);
    assert_eq!(out.content, "anything");
}

#[test]
fn context_spanning_markup_matches_raw_characters() {
    let a = ann("quick <em>brown</em>", "c");
    let out = anchor_default("The quick <em>brown</em> fox", std::slice::from_ref(&a));
    assert_eq!(out.results[0].match_kind, MatchKind::Exact);
    assert_eq!(out.content, format!("The {} fox", marked(&a, "quick <em>brown</em>")));
}

#[test]
fn multibyte_offsets_are_code_points() {
    let a = ann("本語", "c");
    let out = anchor_default("日本語のテキスト", std::slice::from_ref(&a));
    assert_eq!(out.results[0].start_offset, Some(1));
}

#[test]
fn comment_markup_is_escaped_in_metadata() {
    let a = ann("fox", "<script>\"x\"</script>");
    let out = anchor_default("the fox", std::slice::from_ref(&a));
    assert!(!out.content.contains("<script>"));
    assert!(out.content.contains("%3Cscript%3E"));
}

#[test]
fn match_kind_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&MatchKind::Fuzzy).unwrap(), "\"fuzzy\"");
}

#[test]
fn markers_lists_metadata_of_rendered_highlights() {
    let a = ann("quick", "fast & loose");
    let b = ann("fox", "animal");
    let out = anchor_default("The quick brown fox", &[a.clone(), b.clone()]);

    let found = markers(&out.content);
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].id, a.id.to_string());
    assert_eq!(found[0].comment, "fast & loose");
    assert_eq!(found[0].text, "quick");
    assert_eq!(found[1].text, "fox");
    assert!(markers("plain text").is_empty());
}
