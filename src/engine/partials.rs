//! Partials resolution.
//!
//! The renderer looks partials up through a host callback. A resolver may
//! hand back raw source (parsed on demand through the interning cache), a
//! pre-parsed template, or nothing — an unresolved partial renders as
//! empty, per spec.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::engine::ParseError;
use crate::engine::template::Template;

/// What a resolver hands back for a partial name.
pub enum PartialSource<'a> {
    /// Raw template source, parsed on demand.
    Source(Cow<'a, str>),
    /// A template parsed ahead of time.
    Parsed(Arc<Template>),
}

/// Host callback mapping a partial name to its template.
pub trait PartialsResolver {
    fn resolve_partial(&self, name: &str) -> Option<PartialSource<'_>>;
}

/// Plain maps of `name -> source` work directly as resolvers.
impl PartialsResolver for HashMap<String, String> {
    fn resolve_partial(&self, name: &str) -> Option<PartialSource<'_>> {
        self.get(name)
            .map(|source| PartialSource::Source(Cow::Borrowed(source)))
    }
}

/// A set of named partials parsed up front.
///
/// # Examples
///
/// ```rust
/// use mustache_pipeline::{InMemoryPartials, RenderOptions, Template};
///
/// let mut partials = InMemoryPartials::new();
/// partials.insert("greeting", "Hello {{name}}!").unwrap();
///
/// let template = Template::parse("{{>greeting}}").unwrap();
/// let options = RenderOptions {
///     partials: Some(&partials),
///     ..Default::default()
/// };
/// let out = template
///     .render_to_string(&serde_json::json!({"name": "World"}), &options)
///     .unwrap();
/// assert_eq!(out, "Hello World!");
/// ```
#[derive(Default)]
pub struct InMemoryPartials {
    templates: HashMap<String, Arc<Template>>,
}

impl InMemoryPartials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `source` and register it under `name`.
    pub fn insert(&mut self, name: impl Into<String>, source: &str) -> Result<(), ParseError> {
        self.templates
            .insert(name.into(), Arc::new(Template::parse(source)?));
        Ok(())
    }

    /// Register an already parsed template under `name`.
    pub fn insert_parsed(&mut self, name: impl Into<String>, template: Arc<Template>) {
        self.templates.insert(name.into(), template);
    }
}

impl PartialsResolver for InMemoryPartials {
    fn resolve_partial(&self, name: &str) -> Option<PartialSource<'_>> {
        self.templates
            .get(name)
            .map(|template| PartialSource::Parsed(Arc::clone(template)))
    }
}

/// Resolves `{{>name}}` against `root/name.<extension>`, lazily parsing
/// and caching each file the first time it is referenced.
///
/// Files that are missing or fail to parse resolve as absent.
pub struct DirectoryPartials {
    root: PathBuf,
    extension: String,
    cache: RwLock<HashMap<String, Arc<Template>>>,
}

impl DirectoryPartials {
    /// Resolve partials against `root` with the conventional `.mustache`
    /// extension.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_extension(root, "mustache")
    }

    pub fn with_extension(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        DirectoryPartials {
            root: root.into(),
            extension: extension.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn load(&self, name: &str) -> Option<Arc<Template>> {
        if let Some(hit) = self.cache.read().get(name) {
            return Some(Arc::clone(hit));
        }
        // Names must stay inside the partials directory.
        if name.contains("..") || name.starts_with('/') || name.starts_with('\\') {
            return None;
        }
        let path = self.root.join(format!("{name}.{}", self.extension));
        let source = std::fs::read_to_string(path).ok()?;
        let template = Arc::new(Template::parse(&source).ok()?);
        self.cache
            .write()
            .insert(name.to_string(), Arc::clone(&template));
        Some(template)
    }
}

impl PartialsResolver for DirectoryPartials {
    fn resolve_partial(&self, name: &str) -> Option<PartialSource<'_>> {
        self.load(name).map(PartialSource::Parsed)
    }
}
