//! Parsed template type and render entry points.
//!
//! This module provides the [`Template`] type: an immutable element tree
//! produced by the scanner/parser pair, plus the rendering surface that
//! drives the stack-based interpreter against host data.
//!
//! # Template Syntax
//!
//! Templates follow the public Mustache specification:
//! - **Interpolation**: `{{name}}` (HTML-escaped), `{{&name}}` /
//!   `{{{name}}}` (verbatim), dotted paths like `{{user.name}}`, and the
//!   implicit iterator `{{.}}`.
//! - **Sections**: `{{#items}}…{{/items}}` iterate sequences, push truthy
//!   scalars, and expand lambdas; `{{^items}}…{{/items}}` render when the
//!   value is absent or falsy.
//! - **Partials**: `{{>name}}`, resolved through a host callback, with
//!   standalone-line indentation propagated into the partial.
//! - **Comments and delimiters**: `{{! note }}` vanishes; `{{=<% %>=}}`
//!   switches the active markers for everything after it.
//!
//! # Concurrency
//!
//! A parsed template is immutable and `Send + Sync`. One template can be
//! rendered concurrently from many threads, each with its own data, sink
//! and options.

use std::fmt::Display;
use std::io;
use std::path::Path;

use crate::engine::context::ContextValue;
use crate::engine::parser;
use crate::engine::partials::PartialsResolver;
use crate::engine::render;
use crate::engine::{Delimiters, Element, Error, ParseError, RenderError};

/* ------------------------------------------------------------------------ */
/*  Template                                                                */
/* ------------------------------------------------------------------------ */

/// A preprocessed Mustache template, ready to render against host data.
///
/// The tree keeps byte ranges into its own source, so static text streams
/// to the sink without copying and section bodies stay available verbatim
/// for lambdas.
///
/// # Examples
///
/// ## Basic rendering
///
/// ```rust
/// use mustache_pipeline::Template;
///
/// let template = Template::parse("Hello {{name}}!").unwrap();
/// let out = template
///     .render_to_string(&serde_json::json!({"name": "World"}), &Default::default())
///     .unwrap();
/// assert_eq!(out, "Hello World!");
/// ```
///
/// ## Sections and escaping
///
/// ```rust
/// use mustache_pipeline::Template;
///
/// let template = Template::parse("{{#admin}}<{{tag}}>{{/admin}}").unwrap();
/// let data = serde_json::json!({"admin": true, "tag": "b"});
/// assert_eq!(
///     template.render_to_string(&data, &Default::default()).unwrap(),
///     "<b>"
/// );
/// ```
///
/// ## Rendering to a sink
///
/// ```rust
/// use mustache_pipeline::Template;
///
/// let template = Template::parse("{{greeting}}, {{name}}!").unwrap();
/// let data = serde_json::json!({"greeting": "Hi", "name": "there"});
/// let mut sink = Vec::new();
/// template.render(&data, &mut sink, &Default::default()).unwrap();
/// assert_eq!(sink, b"Hi, there!");
/// ```
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    elements: Vec<Element>,
}

/// Options for a render call.
///
/// `delimiters` only affects the parse-and-render entry points
/// ([`render_str`](crate::render_str) / [`render_file`](crate::render_file));
/// a pre-parsed tree has delimiter scope baked in already.
#[derive(Default)]
pub struct RenderOptions<'a> {
    /// Initial delimiter pair for parse-and-render entry points.
    pub delimiters: Option<Delimiters>,
    /// Resolver consulted for `{{>name}}`. Without one, every partial
    /// renders as empty.
    pub partials: Option<&'a dyn PartialsResolver>,
    /// Cap, in bytes, on intermediate allocation during the render.
    /// Exhaustion fails the render with
    /// [`RenderError::OutOfBudget`](crate::RenderError::OutOfBudget).
    pub budget: Option<usize>,
    /// Print render tracing to stderr.
    pub debug: bool,
}

impl Template {
    /* -------- constructors ---------------------------------------------- */

    /// Parse a template from source with the default `{{` / `}}` pair.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] carrying the byte offset of the offending
    /// tag: unclosed tags or sections, mismatched section names, malformed
    /// delimiter changes, or empty tag names.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        Self::parse_with_delimiters(source, Delimiters::default())
    }

    /// Parse a template whose outermost delimiters are not `{{` / `}}`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mustache_pipeline::{Delimiters, Template};
    ///
    /// let delimiters = Delimiters::new("<%", "%>").unwrap();
    /// let template = Template::parse_with_delimiters("<%n%>", delimiters).unwrap();
    /// let out = template
    ///     .render_to_string(&serde_json::json!({"n": 1}), &Default::default())
    ///     .unwrap();
    /// assert_eq!(out, "1");
    /// ```
    pub fn parse_with_delimiters(
        source: &str,
        delimiters: Delimiters,
    ) -> Result<Self, ParseError> {
        let elements = parser::parse(source, delimiters)?;
        Ok(Template {
            source: source.to_string(),
            elements,
        })
    }

    /// Read and parse a template file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&source)?)
    }

    /* -------- rendering -------------------------------------------------- */

    /// Render against `data`, streaming output into `sink`.
    ///
    /// The renderer never buffers the full output: static text is written
    /// straight from the template source and values are escaped on the
    /// fly. A sink error aborts the render immediately; bytes already
    /// written stay written.
    pub fn render(
        &self,
        data: &dyn ContextValue,
        sink: &mut dyn io::Write,
        options: &RenderOptions<'_>,
    ) -> Result<(), RenderError> {
        render::render_template(self, data, sink, options)
    }

    /// Render against `data` into a fresh `String`.
    pub fn render_to_string(
        &self,
        data: &dyn ContextValue,
        options: &RenderOptions<'_>,
    ) -> Result<String, RenderError> {
        let mut buffer = Vec::new();
        self.render(data, &mut buffer, options)?;
        // The source and every value view are &str, so output is UTF-8.
        Ok(String::from_utf8(buffer).expect("rendered output is valid UTF-8"))
    }

    /* -------- introspection ---------------------------------------------- */

    /// The original template source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of top-level elements in the parsed tree.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub(crate) fn elements(&self) -> &[Element] {
        &self.elements
    }
}

/// Displays the original template source.
impl Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}
