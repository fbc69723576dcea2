use mustache_pipeline::{ContextValue, Lambda, RenderOptions, Template};
use std::collections::HashMap;

type Data = HashMap<String, Box<dyn ContextValue>>;

fn render_with(template: &str, data: &Data) -> String {
    Template::parse(template)
        .unwrap()
        .render_to_string(data, &RenderOptions::default())
        .unwrap()
}

fn string_value(text: &str) -> Box<dyn ContextValue> {
    Box::new(text.to_string())
}

#[test]
fn interpolation_lambdas_supply_the_value() {
    let mut data = Data::new();
    data.insert(
        "lambda".to_string(),
        Box::new(Lambda::new(|_: &str| "world".to_string())),
    );
    assert_eq!(render_with("Hello, {{lambda}}!", &data), "Hello, world!");
}

#[test]
fn interpolation_lambda_output_is_expanded() {
    let mut data = Data::new();
    data.insert("planet".to_string(), string_value("world"));
    data.insert(
        "lambda".to_string(),
        Box::new(Lambda::new(|_: &str| "{{planet}}".to_string())),
    );
    assert_eq!(render_with("Hello, {{lambda}}!", &data), "Hello, world!");
}

#[test]
fn interpolation_lambda_output_parses_with_default_delimiters() {
    let mut data = Data::new();
    data.insert("planet".to_string(), string_value("world"));
    data.insert(
        "lambda".to_string(),
        Box::new(Lambda::new(|_: &str| "|planet| => {{planet}}".to_string())),
    );
    assert_eq!(
        render_with("{{= | | =}}\nHello, (|&lambda|)!", &data),
        "Hello, (|planet| => world)!"
    );
}

#[test]
fn escaping_applies_to_expanded_lambda_output() {
    let mut data = Data::new();
    data.insert(
        "lambda".to_string(),
        Box::new(Lambda::new(|_: &str| ">".to_string())),
    );
    assert_eq!(render_with("<{{lambda}}{{{lambda}}}", &data), "<&gt;>");
}

#[test]
fn section_lambdas_receive_the_raw_inner_source() {
    let mut data = Data::new();
    data.insert("planet".to_string(), string_value("Earth"));
    data.insert(
        "lambda".to_string(),
        Box::new(Lambda::new(|body: &str| format!("{body}{{{{planet}}}}{body}"))),
    );
    assert_eq!(
        render_with("<{{#lambda}}-{{/lambda}}>", &data),
        "<-Earth->"
    );
}

#[test]
fn section_lambda_output_parses_with_the_current_delimiters() {
    let mut data = Data::new();
    data.insert("planet".to_string(), string_value("Earth"));
    data.insert(
        "lambda".to_string(),
        Box::new(Lambda::new(|body: &str| {
            format!("{body}{{{{planet}}}} => |planet|{body}")
        })),
    );
    assert_eq!(
        render_with("{{= | | =}}<|#lambda|-|/lambda|>", &data),
        "<-{{planet}} => Earth->"
    );
}

#[test]
fn section_lambda_output_is_not_re_escaped() {
    let mut data = Data::new();
    data.insert(
        "wrap".to_string(),
        Box::new(Lambda::new(|body: &str| format!("<b>{body}</b>"))),
    );
    assert_eq!(render_with("{{#wrap}}hi{{/wrap}}", &data), "<b>hi</b>");
}

#[test]
fn lambda_sections_render_against_the_current_stack() {
    let mut data = Data::new();
    data.insert("name".to_string(), string_value("Ada"));
    data.insert(
        "twice".to_string(),
        Box::new(Lambda::new(|body: &str| format!("{body}{body}"))),
    );
    assert_eq!(render_with("{{#twice}}{{name}};{{/twice}}", &data), "Ada;Ada;");
}

#[test]
fn failed_lambdas_contribute_empty_output() {
    let mut data = Data::new();
    data.insert("broken".to_string(), Box::new(Lambda::fallible(|_| None)));
    assert_eq!(render_with("a{{#broken}}x{{/broken}}b", &data), "ab");
    assert_eq!(render_with("a{{broken}}b", &data), "ab");
}

#[test]
fn unparseable_lambda_fragments_are_swallowed() {
    let mut data = Data::new();
    data.insert(
        "bad".to_string(),
        Box::new(Lambda::new(|_: &str| "{{#unclosed}}".to_string())),
    );
    assert_eq!(render_with("a{{bad}}b", &data), "ab");
}

#[test]
fn inverted_sections_treat_lambdas_as_truthy() {
    let mut data = Data::new();
    data.insert(
        "lambda".to_string(),
        Box::new(Lambda::new(|_: &str| "x".to_string())),
    );
    assert_eq!(render_with("<{{^lambda}}y{{/lambda}}>", &data), "<>");
}

#[test]
fn lambdas_mid_path_break_the_chain() {
    let mut data = Data::new();
    data.insert(
        "f".to_string(),
        Box::new(Lambda::new(|_: &str| "x".to_string())),
    );
    assert_eq!(render_with("<{{f.inner}}>", &data), "<>");
}
