use super::render;
use mustache_pipeline::{Delimiters, ParseError, RenderOptions, Template};
use serde_json::json;

#[test]
fn changed_delimiters_apply_to_later_tags() {
    assert_eq!(render("{{=<% %>=}}<%n%>", json!({"n": 1})).unwrap(), "1");
}

#[test]
fn old_markers_become_plain_text_after_a_change() {
    assert_eq!(
        render("{{=<% %>=}}{{n}} <%n%>", json!({"n": 1})).unwrap(),
        "{{n}} 1"
    );
}

#[test]
fn switching_back_restores_the_default_pair() {
    assert_eq!(
        render("{{=<< >>=}}<<a>><<={{ }}=>>{{b}}", json!({"a": 1, "b": 2})).unwrap(),
        "12"
    );
}

#[test]
fn chained_changes_each_take_effect() {
    assert_eq!(
        render("{{=<< >>=}}<<a>><<=$$ $$=>>$$b$$", json!({"a": 1, "b": 2})).unwrap(),
        "12"
    );
}

#[test]
fn changes_inside_sections_cover_children_and_beyond() {
    // The close tag itself must use the new pair, and the change persists
    // after the section.
    assert_eq!(
        render(
            "{{#s}}{{=<% %>=}}<%x%><%/s%><%y%>",
            json!({"s": {"x": "a"}, "y": "b"})
        )
        .unwrap(),
        "ab"
    );
}

#[test]
fn standalone_delimiter_lines_vanish() {
    assert_eq!(render("|\n{{= @ @ =}}\n|", json!({})).unwrap(), "|\n|");
}

#[test]
fn pairs_with_surrounding_space_parse() {
    assert_eq!(render("{{= <% %> =}}<%n%>", json!({"n": 1})).unwrap(), "1");
}

#[test]
fn malformed_bodies_are_invalid_delimiters() {
    assert!(matches!(
        render("{{=<%%>=}}x", json!({})),
        Err(mustache_pipeline::Error::Parse(
            ParseError::InvalidDelimiters { offset: 0 }
        ))
    ));
    assert!(matches!(
        render("{{=<% %> missing=close", json!({})),
        Err(mustache_pipeline::Error::Parse(_))
    ));
}

#[test]
fn markers_may_not_contain_equals_or_whitespace() {
    assert!(Delimiters::new("<=", ">").is_none());
    assert!(Delimiters::new("a b", "c").is_none());
}

#[test]
fn templates_can_start_with_custom_delimiters() {
    let delimiters = Delimiters::new("<%", "%>").unwrap();
    let template = Template::parse_with_delimiters("<%greeting%> {{n}}", delimiters).unwrap();
    let out = template
        .render_to_string(&json!({"greeting": "hi", "n": 1}), &RenderOptions::default())
        .unwrap();
    // `{{n}}` is plain text under the custom pair.
    assert_eq!(out, "hi {{n}}");
}

#[test]
fn render_str_honors_the_delimiters_option() {
    let options = RenderOptions {
        delimiters: Delimiters::new("<%", "%>"),
        ..Default::default()
    };
    let mut sink = Vec::new();
    mustache_pipeline::render_str("<%n%>", &json!({"n": 9}), &mut sink, &options).unwrap();
    assert_eq!(sink, b"9");
}
