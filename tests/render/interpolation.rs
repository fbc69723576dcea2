use super::render;
use serde_json::json;

pub mod basic {
    use super::*;

    #[test]
    fn renders_a_named_value() {
        assert_eq!(
            render("Hello {{name}}!", json!({"name": "World"})).unwrap(),
            "Hello World!"
        );
    }

    #[test]
    fn missing_names_render_empty() {
        assert_eq!(render("<{{missing}}>", json!({})).unwrap(), "<>");
    }

    #[test]
    fn adjacent_whitespace_is_preserved() {
        assert_eq!(
            render("| {{string}} |", json!({"string": "---"})).unwrap(),
            "| --- |"
        );
    }

    #[test]
    fn null_renders_empty() {
        assert_eq!(render("<{{x}}>", json!({"x": null})).unwrap(), "<>");
    }

    #[test]
    fn integers_render_base_10() {
        assert_eq!(render("{{n}}", json!({"n": 42})).unwrap(), "42");
        assert_eq!(render("{{n}}", json!({"n": -7})).unwrap(), "-7");
        assert_eq!(
            render("{{n}}", json!({"n": 18_446_744_073_709_551_615u64})).unwrap(),
            "18446744073709551615"
        );
    }

    #[test]
    fn floats_render_in_decimal() {
        assert_eq!(render("{{power}}", json!({"power": 1.21})).unwrap(), "1.21");
    }

    #[test]
    fn booleans_render_as_words() {
        assert_eq!(
            render("{{yes}}/{{no}}", json!({"yes": true, "no": false})).unwrap(),
            "true/false"
        );
    }

    #[test]
    fn aggregates_interpolate_as_empty() {
        assert_eq!(
            render("<{{seq}}{{obj}}>", json!({"seq": [1, 2], "obj": {"a": 1}})).unwrap(),
            "<>"
        );
    }
}

pub mod escaping {
    use super::*;

    #[test]
    fn plain_interpolation_escapes_html() {
        assert_eq!(
            render("<{{html}}>", json!({"html": "<b>"})).unwrap(),
            "<&lt;b&gt;>"
        );
    }

    #[test]
    fn ampersand_sigil_is_verbatim() {
        assert_eq!(
            render("<{{&html}}>", json!({"html": "<b>"})).unwrap(),
            "<<b>>"
        );
    }

    #[test]
    fn triple_mustache_is_verbatim() {
        assert_eq!(
            render("<{{{html}}}>", json!({"html": "<b>"})).unwrap(),
            "<<b>>"
        );
    }

    #[test]
    fn the_escape_set_is_exactly_five_characters() {
        assert_eq!(
            render("{{chars}}", json!({"chars": "&<>\"'"})).unwrap(),
            "&amp;&lt;&gt;&quot;&#39;"
        );
        // Slashes, equals and backticks pass through.
        assert_eq!(
            render("{{chars}}", json!({"chars": "a/b=c`d"})).unwrap(),
            "a/b=c`d"
        );
    }
}

pub mod dotted_paths {
    use super::*;

    #[test]
    fn paths_descend_through_objects() {
        assert_eq!(
            render("{{a.b.c}}", json!({"a": {"b": {"c": "deep"}}})).unwrap(),
            "deep"
        );
    }

    #[test]
    fn first_segment_resolves_against_the_whole_stack() {
        assert_eq!(
            render(
                "{{#inner}}{{outer_field}}{{/inner}}",
                json!({"inner": {"x": 1}, "outer_field": "seen"})
            )
            .unwrap(),
            "seen"
        );
    }

    #[test]
    fn broken_chains_do_not_fall_back_to_outer_frames() {
        // `a` matches the section frame, so the failed `.b` lookup is
        // final even though the root also has an `a.b`.
        assert_eq!(
            render(
                "{{#inner}}<{{a.b}}>{{/inner}}",
                json!({"inner": {"a": {}}, "a": {"b": "outer"}})
            )
            .unwrap(),
            "<>"
        );
    }

    #[test]
    fn sequences_expose_a_synthetic_len() {
        assert_eq!(
            render("{{items.len}}", json!({"items": ["a", "b", "c"]})).unwrap(),
            "3"
        );
        assert_eq!(
            render("<{{items.first}}>", json!({"items": ["a"]})).unwrap(),
            "<>"
        );
    }
}
