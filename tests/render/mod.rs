use mustache_pipeline::{Error, RenderOptions, Template};

/// Parse `template` and render it against a JSON data context.
pub fn render(template: &str, data: serde_json::Value) -> Result<String, Error> {
    let template = Template::parse(template)?;
    Ok(template.render_to_string(&data, &RenderOptions::default())?)
}

pub mod delimiters;
pub mod interpolation;
pub mod lambdas;
pub mod sections;
