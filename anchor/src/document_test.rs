use super::*;
use crate::marker::open_tag;

fn marked(id: &str, comment: &str, text: &str) -> String {
    format!("{}{text}</span>", open_tag(id, comment))
}

#[test]
fn parse_render_round_trips_plain_content() {
    let content = "<p>The <em>quick</em> brown fox</p>";
    let doc = Document::parse(content);
    assert_eq!(doc.render(), content);
    assert_eq!(doc.markers().count(), 0);
}

#[test]
fn parse_recognizes_existing_markers() {
    let content = format!("The {} fox", marked("a1", "nice fox", "quick brown"));
    let doc = Document::parse(&content);
    let markers: Vec<&Marker> = doc.markers().collect();
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].id, "a1");
    assert_eq!(markers[0].comment, "nice fox");
    assert_eq!(markers[0].text, "quick brown");
    assert_eq!(doc.render(), content);
}

#[test]
fn parse_keeps_foreign_attribute_order_verbatim() {
    let content = r#"a <span data-comment="x%20y" class="context-highlight" data-comment-id="9">b</span> c"#;
    let doc = Document::parse(content);
    assert_eq!(doc.marker("9").map(|m| m.comment.as_str()), Some("x y"));
    assert_eq!(doc.render(), content);
}

#[test]
fn parse_tracks_nested_spans_inside_marker() {
    let content = format!("x {} y", marked("n", "c", "a <span class=\"k\">b</span> c"));
    let doc = Document::parse(&content);
    let marker = doc.marker("n").unwrap();
    assert_eq!(marker.text, "a <span class=\"k\">b</span> c");
    assert_eq!(doc.render(), content);
}

#[test]
fn parse_treats_unclosed_marker_as_raw() {
    let content = format!("x {}never closed", open_tag("u", "c"));
    let doc = Document::parse(&content);
    assert_eq!(doc.markers().count(), 0);
    assert_eq!(doc.render(), content);
}

#[test]
fn plain_spans_are_not_markers() {
    let content = r#"<span class="note">quick</span> brown"#;
    let doc = Document::parse(content);
    assert_eq!(doc.markers().count(), 0);
    assert!(doc.find_exact("quick").is_some());
}

#[test]
fn marker_source_start_is_code_point_offset() {
    let content = format!("日本 {}", marked("m", "c", "語"));
    let doc = Document::parse(&content);
    let tag_chars = open_tag("m", "c").chars().count();
    assert_eq!(doc.marker("m").unwrap().source_start, 3 + tag_chars);
}

#[test]
fn find_exact_skips_marker_text() {
    let content = format!("The {} fox", marked("a", "c", "quick brown"));
    let doc = Document::parse(&content);
    assert!(doc.find_exact("quick").is_none());
    let hit = doc.find_exact("fox").unwrap();
    assert_eq!(doc.hit_text(&hit), "fox");
}

#[test]
fn find_exact_reports_code_point_offsets() {
    let doc = Document::parse("日本語のテキスト");
    let hit = doc.find_exact("テキ").unwrap();
    assert_eq!(hit.source_start, 4);
    assert_eq!(doc.hit_text(&hit), "テキ");
}

#[test]
fn find_fuzzy_prefers_earliest_on_ties() {
    let doc = Document::parse("abcX abcY");
    let hit = doc.find_fuzzy("abcZ", 0.7).unwrap();
    assert_eq!(hit.source_start, 0);
    assert_eq!(doc.hit_text(&hit), "abcX");
}

#[test]
fn find_fuzzy_prefers_higher_score_over_position() {
    let doc = Document::parse("abXX abcX");
    let hit = doc.find_fuzzy("abcd", 0.4).unwrap();
    assert_eq!(doc.hit_text(&hit), "abcX");
}

#[test]
fn find_fuzzy_requires_strictly_above_threshold() {
    let doc = Document::parse("abcdefghiX");
    assert!(doc.find_fuzzy("abcdefghij", 0.9).is_none());
    assert!(doc.find_fuzzy("abcdefghij", 0.8).is_some());
}

#[test]
fn find_fuzzy_does_not_straddle_markers() {
    let content = format!("ab{}cd", marked("m", "c", "ZZ"));
    let doc = Document::parse(&content);
    assert!(doc.find_fuzzy("abcd", 0.5).is_none());
}

#[test]
fn wrap_splits_raw_segment_around_marker() {
    let mut doc = Document::parse("The quick brown fox");
    let hit = doc.find_exact("quick brown").unwrap();
    doc.wrap(&hit, "id1", "nice fox");
    assert_eq!(doc.render(), format!("The {} fox", marked("id1", "nice fox", "quick brown")));
    assert_eq!(doc.marker("id1").unwrap().source_start, 4);
}

#[test]
fn wrap_at_content_edges_leaves_no_empty_segments() {
    let mut doc = Document::parse("fox");
    let hit = doc.find_exact("fox").unwrap();
    doc.wrap(&hit, "id", "c");
    assert_eq!(doc.render(), marked("id", "c", "fox"));
    assert_eq!(doc.segments.len(), 1);
}

#[test]
fn later_raw_segments_keep_input_offsets() {
    let mut doc = Document::parse("one two three");
    let hit = doc.find_exact("one").unwrap();
    doc.wrap(&hit, "a", "c");
    let hit = doc.find_exact("three").unwrap();
    assert_eq!(hit.source_start, 8);
}
