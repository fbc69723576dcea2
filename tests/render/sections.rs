use super::render;
use serde_json::json;

pub mod truthiness {
    use super::*;

    #[test]
    fn false_skips_the_body() {
        assert_eq!(render("{{#a}}x{{/a}}", json!({"a": false})).unwrap(), "");
    }

    #[test]
    fn true_renders_the_body_once() {
        assert_eq!(render("{{#a}}x{{/a}}", json!({"a": true})).unwrap(), "x");
    }

    #[test]
    fn missing_names_skip_the_body() {
        assert_eq!(render("{{#a}}x{{/a}}", json!({})).unwrap(), "");
    }

    #[test]
    fn null_skips_the_body() {
        assert_eq!(render("{{#a}}x{{/a}}", json!({"a": null})).unwrap(), "");
    }

    #[test]
    fn empty_strings_are_falsy() {
        assert_eq!(render("{{#a}}x{{/a}}", json!({"a": ""})).unwrap(), "");
        assert_eq!(render("{{#a}}x{{/a}}", json!({"a": "y"})).unwrap(), "x");
    }

    #[test]
    fn zero_is_truthy() {
        assert_eq!(render("{{#n}}<{{n}}>{{/n}}", json!({"n": 0})).unwrap(), "<0>");
    }

    #[test]
    fn empty_objects_are_truthy() {
        assert_eq!(render("{{#o}}x{{/o}}", json!({"o": {}})).unwrap(), "x");
    }
}

pub mod iteration {
    use super::*;

    #[test]
    fn sequences_render_once_per_element() {
        assert_eq!(
            render("{{#list}}({{.}}){{/list}}", json!({"list": ["a", "b", "c"]})).unwrap(),
            "(a)(b)(c)"
        );
    }

    #[test]
    fn empty_sequences_skip_the_body() {
        assert_eq!(render("{{#list}}x{{/list}}", json!({"list": []})).unwrap(), "");
    }

    #[test]
    fn elements_become_the_top_frame() {
        assert_eq!(
            render(
                "{{#users}}<{{name}}>{{/users}}",
                json!({"users": [{"name": "a"}, {"name": "b"}]})
            )
            .unwrap(),
            "<a><b>"
        );
    }

    #[test]
    fn output_follows_iteration_order() {
        assert_eq!(
            render("{{#n}}{{.}}{{/n}}", json!({"n": [1, 2, 3, 4, 5]})).unwrap(),
            "12345"
        );
    }

    #[test]
    fn strings_are_scalars_not_iterated() {
        // A string section pushes the string itself; the implicit iterator
        // yields the whole value, not its bytes.
        assert_eq!(
            render("{{#word}}[{{.}}]{{/word}}", json!({"word": "hi"})).unwrap(),
            "[hi]"
        );
    }

    #[test]
    fn nested_sections_iterate_independently() {
        assert_eq!(
            render(
                "{{#rows}}{{#cols}}{{.}}{{/cols}};{{/rows}}",
                json!({"rows": [{"cols": [1, 2]}, {"cols": [3]}]})
            )
            .unwrap(),
            "12;3;"
        );
    }

    #[test]
    fn truthy_scalars_push_a_frame() {
        assert_eq!(
            render(
                "{{#person}}{{name}} is {{age}}{{/person}}",
                json!({"person": {"name": "Ada", "age": 36}})
            )
            .unwrap(),
            "Ada is 36"
        );
    }

    #[test]
    fn dotted_section_paths_resolve() {
        assert_eq!(
            render("{{#a.b}}{{.}}{{/a.b}}", json!({"a": {"b": [1, 2]}})).unwrap(),
            "12"
        );
    }
}

pub mod inverted {
    use super::*;

    #[test]
    fn empty_sequences_render_inverted_bodies() {
        assert_eq!(render("{{^a}}x{{/a}}", json!({"a": []})).unwrap(), "x");
    }

    #[test]
    fn false_renders_inverted_bodies() {
        assert_eq!(render("{{^a}}x{{/a}}", json!({"a": false})).unwrap(), "x");
    }

    #[test]
    fn missing_names_render_inverted_bodies() {
        assert_eq!(render("{{^a}}x{{/a}}", json!({})).unwrap(), "x");
    }

    #[test]
    fn truthy_values_skip_inverted_bodies() {
        assert_eq!(render("{{^a}}x{{/a}}", json!({"a": [1]})).unwrap(), "");
        assert_eq!(render("{{^a}}x{{/a}}", json!({"a": true})).unwrap(), "");
    }

    #[test]
    fn inverted_sections_push_no_frame() {
        assert_eq!(
            render("{{^missing}}{{name}}{{/missing}}", json!({"name": "top"})).unwrap(),
            "top"
        );
    }
}

pub mod native_adapters {
    use mustache_pipeline::{ContextValue, RenderOptions, Template};
    use std::collections::HashMap;

    fn render_native(template: &str, data: &dyn ContextValue) -> String {
        Template::parse(template)
            .unwrap()
            .render_to_string(data, &RenderOptions::default())
            .unwrap()
    }

    #[test]
    fn vectors_iterate() {
        let mut data: HashMap<String, Box<dyn ContextValue>> = HashMap::new();
        data.insert("list".to_string(), Box::new(vec![1i64, 2, 3]));
        assert_eq!(render_native("{{#list}}{{.}}{{/list}}", &data), "123");
    }

    #[test]
    fn tuples_iterate_by_position() {
        let mut data: HashMap<String, Box<dyn ContextValue>> = HashMap::new();
        data.insert(
            "pair".to_string(),
            Box::new((1i64, "two".to_string())),
        );
        assert_eq!(render_native("{{#pair}}[{{.}}]{{/pair}}", &data), "[1][two]");
    }

    #[test]
    fn present_optionals_iterate_as_their_inner_value() {
        let mut data: HashMap<String, Box<dyn ContextValue>> = HashMap::new();
        data.insert("opt".to_string(), Box::new(Some("inner".to_string())));
        assert_eq!(render_native("{{#opt}}{{.}}{{/opt}}", &data), "inner");
        assert_eq!(render_native("<{{opt}}>", &data), "<inner>");
    }

    #[test]
    fn absent_optionals_are_falsy() {
        let absent: Option<String> = None;
        let mut data: HashMap<String, Box<dyn ContextValue>> = HashMap::new();
        data.insert("opt".to_string(), Box::new(absent));
        assert_eq!(render_native("{{#opt}}x{{/opt}}{{^opt}}y{{/opt}}", &data), "y");
        assert_eq!(render_native("<{{opt}}>", &data), "<>");
    }

    #[test]
    fn enum_like_values_render_their_tag() {
        struct Status;
        impl ContextValue for Status {
            fn kind(&self) -> mustache_pipeline::ValueKind {
                mustache_pipeline::ValueKind::Enum
            }

            fn enum_tag(&self) -> Option<&str> {
                Some("Active")
            }
        }

        let mut data: HashMap<String, Box<dyn ContextValue>> = HashMap::new();
        data.insert("status".to_string(), Box::new(Status));
        assert_eq!(render_native("{{status}}", &data), "Active");
    }
}
