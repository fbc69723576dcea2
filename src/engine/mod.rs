//! Mustache engine implementation.
//!
//! This module contains the core of the template engine: the scanner and
//! parser that turn template source into an element tree, the renderer that
//! walks the tree against a context stack, and the supporting types shared
//! between them.
//!
//! The engine processes templates as opaque bytes. Only the ASCII sigil and
//! delimiter characters are meaningful; everything else passes through to
//! the output sink untouched.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use smallvec::SmallVec;
use thiserror::Error;

pub mod context;
mod debug;
pub mod parser;
pub mod partials;
mod render;
mod scanner;
pub mod template;

pub use crate::engine::context::ContextValue;
pub use crate::engine::template::{RenderOptions, Template};

pub(crate) use debug::DebugTracer;

// Parsed-template interning cache. Templates are published immutable behind
// an Arc, so a cached entry can be rendered concurrently by many callers.
static TEMPLATE_CACHE: Lazy<DashMap<u64, Arc<Template>>> = Lazy::new(DashMap::new);

// Only cache reasonably sized sources to avoid memory bloat.
const CACHE_MAX_SOURCE_LEN: usize = 64 * 1024;
const CACHE_MAX_ENTRIES: usize = 256;

/// Parse a template through the global interning cache.
///
/// Identical sources share one parsed [`Template`]. Entries are verified
/// against the original source on lookup, so a hash collision falls back to
/// a fresh parse instead of returning the wrong tree.
pub fn parse_cached(source: &str) -> Result<Arc<Template>, ParseError> {
    let mut hasher = DefaultHasher::new();
    source.hash(&mut hasher);
    let key = hasher.finish();

    if let Some(hit) = TEMPLATE_CACHE.get(&key)
        && hit.source() == source
    {
        return Ok(Arc::clone(&hit));
    }

    let template = Arc::new(Template::parse(source)?);
    if source.len() <= CACHE_MAX_SOURCE_LEN && TEMPLATE_CACHE.len() < CACHE_MAX_ENTRIES {
        TEMPLATE_CACHE.insert(key, Arc::clone(&template));
    }
    Ok(template)
}

/// Parse a template string and render it against `data` in one call.
///
/// Equivalent to [`Template::parse`] (honoring `options.delimiters`)
/// followed by [`Template::render`].
pub fn render_str(
    source: &str,
    data: &dyn ContextValue,
    sink: &mut dyn io::Write,
    options: &RenderOptions,
) -> Result<(), Error> {
    let template = match &options.delimiters {
        Some(delimiters) => Template::parse_with_delimiters(source, delimiters.clone())?,
        None => Template::parse(source)?,
    };
    template.render(data, sink, options)?;
    Ok(())
}

/// Read a template from disk and render it against `data` in one call.
pub fn render_file(
    path: impl AsRef<Path>,
    data: &dyn ContextValue,
    sink: &mut dyn io::Write,
    options: &RenderOptions,
) -> Result<(), Error> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    render_str(&source, data, sink, options)
}

/* ---------- delimiters -------------------------------------------------- */

/// The pair of markers opening and closing a tag.
///
/// Defaults to `{{` / `}}`. A marker is a non-empty byte string containing
/// neither `=` nor whitespace; [`Delimiters::new`] rejects anything else.
/// The active pair is mutated only by a `{{=open close=}}` tag, with effect
/// strictly after that tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    open: String,
    close: String,
}

impl Delimiters {
    /// Build a validated delimiter pair, or `None` if either marker is
    /// empty or contains `=` or whitespace.
    pub fn new(open: &str, close: &str) -> Option<Self> {
        if marker_is_valid(open) && marker_is_valid(close) {
            Some(Delimiters {
                open: open.to_string(),
                close: close.to_string(),
            })
        } else {
            None
        }
    }

    pub fn open(&self) -> &str {
        &self.open
    }

    pub fn close(&self) -> &str {
        &self.close
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Delimiters {
            open: "{{".to_string(),
            close: "}}".to_string(),
        }
    }
}

fn marker_is_valid(marker: &str) -> bool {
    !marker.is_empty()
        && !marker
            .bytes()
            .any(|b| b == b'=' || b.is_ascii_whitespace())
}

/* ---------- tag paths --------------------------------------------------- */

/// A dotted tag name, split into its segments.
///
/// The single token `.` is the implicit iterator (the current top context
/// frame itself) and carries no segments.
#[derive(Debug, Clone)]
pub(crate) struct TagPath {
    raw: Box<str>,
    segments: SmallVec<[Box<str>; 4]>,
}

impl TagPath {
    /// Split a trimmed tag body on `.`. Empty bodies and empty segments
    /// (`a..b`, `.a`) are rejected.
    pub(crate) fn parse(raw: &str, offset: usize) -> Result<Self, ParseError> {
        if raw.is_empty() {
            return Err(ParseError::EmptyPath { offset });
        }
        if raw == "." {
            return Ok(TagPath {
                raw: raw.into(),
                segments: SmallVec::new(),
            });
        }
        let mut segments = SmallVec::new();
        for segment in raw.split('.') {
            if segment.is_empty() {
                return Err(ParseError::EmptyPath { offset });
            }
            segments.push(segment.into());
        }
        Ok(TagPath {
            raw: raw.into(),
            segments,
        })
    }

    /// `true` for the single-dot implicit iterator.
    pub(crate) fn is_implicit(&self) -> bool {
        self.segments.is_empty()
    }

    pub(crate) fn raw(&self) -> &str {
        &self.raw
    }

    pub(crate) fn segments(&self) -> &[Box<str>] {
        &self.segments
    }
}

/* ---------- element tree ------------------------------------------------ */

/// One node of a parsed template.
///
/// Text and section bodies are stored as byte ranges into the owning
/// [`Template`]'s source, so static content streams to the sink without
/// copying. Comments and delimiter changes are consumed at scan time and
/// never materialize as elements.
#[derive(Debug, Clone)]
pub(crate) enum Element {
    /// Verbatim output.
    Text(Range<usize>),
    /// `{{name}}`, `{{&name}}` or `{{{name}}}`.
    Interpolation { path: TagPath, escaped: bool },
    /// `{{#name}}…{{/name}}` or `{{^name}}…{{/name}}`.
    ///
    /// `inner` is the exact source range between the opening and closing
    /// tags and `delimiters` the pair active at the opening tag; both are
    /// needed to re-parse lambda output.
    Section {
        path: TagPath,
        inverted: bool,
        inner: Range<usize>,
        delimiters: Delimiters,
        children: Vec<Element>,
    },
    /// `{{>name}}`. `indent` is the whitespace prefix of the partial's
    /// line when the tag stood alone on it.
    Partial { name: String, indent: String },
    /// `{{<name}}…{{/name}}` or `{{$name}}…{{/name}}`: parsed for source
    /// fidelity, rejected at render time.
    Inherit {
        name: String,
        parent: bool,
        children: Vec<Element>,
    },
}

/* ---------- errors ------------------------------------------------------ */

/// Errors surfaced while scanning and parsing a template.
///
/// Every variant carries the byte offset of the offending tag within the
/// template source.
#[derive(Debug, Error)]
pub enum ParseError {
    /// End of input was reached inside a tag.
    #[error("unclosed tag at byte {offset}")]
    UnclosedTag { offset: usize },
    /// A section was opened but its closing tag never appeared.
    #[error("section `{name}` opened at byte {offset} is never closed")]
    UnclosedSection { name: String, offset: usize },
    /// A closing tag named a different section than the innermost open one.
    #[error("closing tag `{found}` at byte {offset} does not match open section `{expected}`")]
    MismatchedSection {
        expected: String,
        found: String,
        offset: usize,
    },
    /// A `{{=…=}}` body did not match `= open sp close =`.
    #[error("malformed delimiter change at byte {offset}")]
    InvalidDelimiters { offset: usize },
    /// A tag body was empty, or a dotted name contained an empty segment.
    #[error("empty tag name at byte {offset}")]
    EmptyPath { offset: usize },
}

/// Errors surfaced while rendering a parsed template.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The output sink failed; rendering aborts immediately.
    #[error("failed to write to the output sink")]
    Sink(#[source] io::Error),
    /// Intermediate allocation exceeded the configured budget.
    #[error("render exceeded the memory budget at element {element}")]
    OutOfBudget { element: usize },
    /// A template inheritance tag (`{{<…}}` / `{{$…}}`) was reached.
    #[error("template inheritance tag `{name}` at element {element} is not supported")]
    Unsupported { name: String, element: usize },
}

impl From<io::Error> for RenderError {
    fn from(source: io::Error) -> Self {
        RenderError::Sink(source)
    }
}

/// Union of the per-layer errors, returned by the parse-and-render entry
/// points.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("failed to read template `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
