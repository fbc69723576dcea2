//! Renderer: context stack, path resolution, element dispatch, escaping.
//!
//! The renderer walks a parsed element tree against a stack of context
//! frames and streams output to the sink. Per-call state (frames, indent,
//! escape depth, budget) is explicit, so the renderer can re-enter itself
//! for partials and lambda-returned fragments.
//!
//! Context frames live on the call stack as a parent-linked list: sections
//! push by constructing a child frame in their scope and pop by returning.
//! Frames are never mutated.

use std::io;
use std::time::Instant;

use crate::engine::context::{ContextValue, ValueKind};
use crate::engine::parser;
use crate::engine::partials::{PartialSource, PartialsResolver};
use crate::engine::template::{RenderOptions, Template};
use crate::engine::{DebugTracer, Delimiters, Element, RenderError, TagPath, parse_cached};

/* ---------- context stack ------------------------------------------------ */

/// One frame of the context stack, linked to the frame below it.
pub(crate) struct Frame<'a> {
    value: &'a dyn ContextValue,
    parent: Option<&'a Frame<'a>>,
}

impl<'a> Frame<'a> {
    fn root(value: &'a dyn ContextValue) -> Self {
        Frame {
            value,
            parent: None,
        }
    }
}

/* ---------- path resolution ---------------------------------------------- */

/// Outcome of resolving a dotted path against the context stack.
///
/// Resolution never fails with an error; every outcome renders as
/// something (possibly nothing).
pub(crate) enum Lookup<'a> {
    /// The traversal reached a terminal value.
    Value(&'a dyn ContextValue),
    /// The synthetic `len` member of a sequence or tuple.
    SeqLen(usize),
    /// The terminal is a lambda; the renderer invokes it specially.
    Lambda(&'a dyn ContextValue),
    /// A non-first segment failed against a matched frame. The search does
    /// not continue outward.
    ChainBroken,
    /// No frame has the first segment.
    NotFound,
}

/// How a single value answers a member probe.
enum Member<'a> {
    Found(&'a dyn ContextValue),
    SeqLen(usize),
    Absent,
}

/// Resolve `path` against the stack, innermost frame first.
///
/// The first frame that *has* the leading segment wins; whatever happens
/// while descending inside that frame is final, even a broken chain.
pub(crate) fn resolve<'a>(top: &Frame<'a>, path: &TagPath) -> Lookup<'a> {
    if path.is_implicit() {
        return classify(top.value);
    }

    let segments = path.segments();
    let first = &*segments[0];
    let mut cursor = Some(top);
    while let Some(frame) = cursor {
        match probe(frame.value, first) {
            Member::Found(value) => return descend(value, &segments[1..]),
            Member::SeqLen(len) if segments.len() == 1 => return Lookup::SeqLen(len),
            Member::SeqLen(_) => return Lookup::ChainBroken,
            Member::Absent => cursor = frame.parent,
        }
    }
    Lookup::NotFound
}

/// Probe one value for a named member. Optionals unwrap transparently;
/// sequences and tuples expose only the synthetic `len`.
fn probe<'a>(value: &'a dyn ContextValue, name: &str) -> Member<'a> {
    match value.kind() {
        ValueKind::Struct => value.member(name).map_or(Member::Absent, Member::Found),
        ValueKind::Optional => match value.unwrap_optional() {
            Some(inner) => probe(inner, name),
            None => Member::Absent,
        },
        ValueKind::Sequence | ValueKind::Tuple if name == "len" => Member::SeqLen(value.len()),
        _ => Member::Absent,
    }
}

/// Walk the remaining segments inside a matched frame.
fn descend<'a>(mut value: &'a dyn ContextValue, rest: &[Box<str>]) -> Lookup<'a> {
    for (i, segment) in rest.iter().enumerate() {
        // Lambdas are terminal only; mid-path they break the chain.
        if value.kind() == ValueKind::Lambda {
            return Lookup::ChainBroken;
        }
        match probe(value, segment) {
            Member::Found(next) => value = next,
            Member::SeqLen(len) if i + 1 == rest.len() => return Lookup::SeqLen(len),
            Member::SeqLen(_) | Member::Absent => return Lookup::ChainBroken,
        }
    }
    classify(value)
}

fn classify(value: &dyn ContextValue) -> Lookup<'_> {
    if value.kind() == ValueKind::Lambda {
        Lookup::Lambda(value)
    } else {
        Lookup::Value(value)
    }
}

/// A section is truthy unless its value is false, nil, an absent optional,
/// an empty sequence, or an empty string.
fn is_truthy(value: &dyn ContextValue) -> bool {
    match value.kind() {
        ValueKind::Nil => false,
        ValueKind::Bool => value.as_bool().unwrap_or(false),
        ValueKind::Optional => value.unwrap_optional().is_some_and(is_truthy),
        ValueKind::Sequence | ValueKind::Tuple => !value.is_empty(),
        ValueKind::String => value.as_str().is_some_and(|s| !s.is_empty()),
        _ => true,
    }
}

/* ---------- render budget ------------------------------------------------ */

/// Byte budget for intermediate allocation. Static text streams from the
/// source slice and is never charged; lambda fragments, staging buffers,
/// value stringification, on-demand partial parses and indent pushes are.
struct Budget {
    limit: usize,
    used: usize,
}

impl Budget {
    fn new(limit: Option<usize>) -> Self {
        Budget {
            limit: limit.unwrap_or(usize::MAX),
            used: 0,
        }
    }

    #[must_use]
    fn charge(&mut self, bytes: usize) -> bool {
        self.used = self.used.saturating_add(bytes);
        self.used <= self.limit
    }
}

/* ---------- renderer ----------------------------------------------------- */

/// Render a parsed template against `data` into `sink`.
pub(crate) fn render_template(
    template: &Template,
    data: &dyn ContextValue,
    sink: &mut dyn io::Write,
    options: &RenderOptions<'_>,
) -> Result<(), RenderError> {
    let tracer = options.debug.then(|| DebugTracer::new(true));
    let start = options.debug.then(Instant::now);
    if let Some(tracer) = &tracer {
        tracer.session_start("RENDER", template.source());
    }

    let mut renderer = Renderer {
        sink,
        partials: options.partials,
        budget: Budget::new(options.budget),
        tracer,
        indent: String::new(),
        at_line_start: true,
        escape_depth: 0,
        element: 0,
    };
    let root = Frame::root(data);
    renderer.render_elements(template.source(), template.elements(), &root)?;

    if let Some(tracer) = &renderer.tracer {
        tracer.session_end("RENDER", start.map(|s| s.elapsed()));
    }
    Ok(())
}

struct Renderer<'r> {
    sink: &'r mut dyn io::Write,
    partials: Option<&'r dyn PartialsResolver>,
    budget: Budget,
    tracer: Option<DebugTracer>,
    /// Concatenated indentation of the active partial chain.
    indent: String,
    at_line_start: bool,
    /// How many escaped-lambda expansions enclose the current write.
    escape_depth: usize,
    /// Preorder element counter, reported in render errors.
    element: usize,
}

impl Renderer<'_> {
    fn render_elements(
        &mut self,
        source: &str,
        elements: &[Element],
        frame: &Frame<'_>,
    ) -> Result<(), RenderError> {
        for element in elements {
            self.element += 1;
            match element {
                Element::Text(range) => self.write_static(&source[range.clone()])?,
                Element::Interpolation { path, escaped } => {
                    self.render_interpolation(frame, path, *escaped)?;
                }
                Element::Section {
                    path,
                    inverted,
                    inner,
                    delimiters,
                    children,
                } => {
                    if *inverted {
                        self.render_inverted(source, children, frame, path)?;
                    } else {
                        self.render_section(source, children, frame, path, inner.clone(), delimiters)?;
                    }
                }
                Element::Partial { name, indent } => self.render_partial(name, indent, frame)?,
                Element::Inherit { name, .. } => {
                    return Err(RenderError::Unsupported {
                        name: name.clone(),
                        element: self.element,
                    });
                }
            }
        }
        Ok(())
    }

    fn render_interpolation(
        &mut self,
        frame: &Frame<'_>,
        path: &TagPath,
        escaped: bool,
    ) -> Result<(), RenderError> {
        match resolve(frame, path) {
            Lookup::Value(value) => self.write_value(value, escaped),
            Lookup::SeqLen(len) => {
                let text = len.to_string();
                self.charge(text.len())?;
                self.emit(&text, escaped)
            }
            Lookup::Lambda(value) => {
                let Some(fragment) = value.invoke("") else {
                    return Ok(());
                };
                // Interpolation-position lambda output parses with the
                // default delimiters; only section lambdas inherit the
                // pair active at the tag.
                self.render_fragment(&fragment, &Delimiters::default(), frame, escaped)
            }
            Lookup::ChainBroken | Lookup::NotFound => Ok(()),
        }
    }

    fn render_section(
        &mut self,
        source: &str,
        children: &[Element],
        frame: &Frame<'_>,
        path: &TagPath,
        inner: std::ops::Range<usize>,
        delimiters: &Delimiters,
    ) -> Result<(), RenderError> {
        match resolve(frame, path) {
            Lookup::NotFound | Lookup::ChainBroken => Ok(()),
            Lookup::SeqLen(len) => {
                let synthetic = len as i64;
                let child = Frame {
                    value: &synthetic,
                    parent: Some(frame),
                };
                self.render_elements(source, children, &child)
            }
            Lookup::Lambda(value) => {
                let Some(fragment) = value.invoke(&source[inner]) else {
                    return Ok(());
                };
                if let Some(tracer) = &self.tracer {
                    tracer.step("lambda", &format!("section `{}`", path.raw()));
                }
                self.render_fragment(&fragment, delimiters, frame, false)
            }
            Lookup::Value(value) => {
                if !is_truthy(value) {
                    return Ok(());
                }
                match value.kind() {
                    ValueKind::Sequence | ValueKind::Tuple => {
                        for i in 0..value.len() {
                            if let Some(item) = value.index(i) {
                                let child = Frame {
                                    value: item,
                                    parent: Some(frame),
                                };
                                self.render_elements(source, children, &child)?;
                            }
                        }
                        Ok(())
                    }
                    ValueKind::Optional => {
                        // Truthy optionals are present; iterate as the inner
                        // value.
                        match value.unwrap_optional() {
                            Some(inner_value) => {
                                let child = Frame {
                                    value: inner_value,
                                    parent: Some(frame),
                                };
                                self.render_elements(source, children, &child)
                            }
                            None => Ok(()),
                        }
                    }
                    _ => {
                        let child = Frame {
                            value,
                            parent: Some(frame),
                        };
                        self.render_elements(source, children, &child)
                    }
                }
            }
        }
    }

    /// Inverted sections render when the value is absent or falsy, with no
    /// frame pushed.
    fn render_inverted(
        &mut self,
        source: &str,
        children: &[Element],
        frame: &Frame<'_>,
        path: &TagPath,
    ) -> Result<(), RenderError> {
        let truthy = match resolve(frame, path) {
            Lookup::Value(value) => is_truthy(value),
            Lookup::SeqLen(_) | Lookup::Lambda(_) => true,
            Lookup::ChainBroken | Lookup::NotFound => false,
        };
        if truthy {
            Ok(())
        } else {
            self.render_elements(source, children, frame)
        }
    }

    fn render_partial(
        &mut self,
        name: &str,
        indent: &str,
        frame: &Frame<'_>,
    ) -> Result<(), RenderError> {
        let Some(resolver) = self.partials else {
            return Ok(());
        };
        // An unresolved partial renders as empty, per spec.
        let Some(partial) = resolver.resolve_partial(name) else {
            if let Some(tracer) = &self.tracer {
                tracer.step("partial", &format!("`{name}` absent, renders empty"));
            }
            return Ok(());
        };
        if let Some(tracer) = &self.tracer {
            tracer.step("partial", &format!("inlining `{name}`"));
        }

        let saved_indent = self.indent.len();
        if !indent.is_empty() {
            self.charge(indent.len())?;
            self.indent.push_str(indent);
        }
        let result = match partial {
            PartialSource::Parsed(template) => {
                self.render_elements(template.source(), template.elements(), frame)
            }
            PartialSource::Source(text) => {
                self.charge(text.len())?;
                match parse_cached(&text) {
                    Ok(template) => {
                        self.render_elements(template.source(), template.elements(), frame)
                    }
                    // A partial that fails to parse contributes nothing,
                    // like an absent one.
                    Err(_) => Ok(()),
                }
            }
        };
        self.indent.truncate(saved_indent);
        result
    }

    /// Parse a lambda-returned fragment with the delimiters active at the
    /// tag and render it against the current stack. `escaped` marks an
    /// escaped interpolation tag: the whole expansion is escaped on the
    /// way out.
    fn render_fragment(
        &mut self,
        fragment: &str,
        delimiters: &Delimiters,
        frame: &Frame<'_>,
        escaped: bool,
    ) -> Result<(), RenderError> {
        self.charge(fragment.len())?;
        let elements = match parser::parse(fragment, delimiters.clone()) {
            Ok(elements) => elements,
            // A fragment that fails to parse is a failed lambda: empty
            // output, rendering continues.
            Err(_) => return Ok(()),
        };
        if escaped {
            self.escape_depth += 1;
        }
        let result = self.render_elements(fragment, &elements, frame);
        if escaped {
            self.escape_depth -= 1;
        }
        result
    }

    /* -------- value output ---------------------------------------------- */

    fn write_value(&mut self, value: &dyn ContextValue, escaped: bool) -> Result<(), RenderError> {
        match value.kind() {
            ValueKind::Nil => Ok(()),
            ValueKind::Optional => match value.unwrap_optional() {
                Some(inner) => self.write_value(inner, escaped),
                None => Ok(()),
            },
            ValueKind::Bool => {
                let text = if value.as_bool().unwrap_or(false) {
                    "true"
                } else {
                    "false"
                };
                self.emit(text, escaped)
            }
            ValueKind::Integer => match value.as_integer() {
                Some(n) => {
                    let text = n.to_string();
                    self.charge(text.len())?;
                    self.emit(&text, escaped)
                }
                None => Ok(()),
            },
            ValueKind::Float => match value.as_float() {
                Some(n) => {
                    let text = n.to_string();
                    self.charge(text.len())?;
                    self.emit(&text, escaped)
                }
                None => Ok(()),
            },
            ValueKind::String => match value.as_str() {
                Some(text) => self.emit(text, escaped),
                None => Ok(()),
            },
            ValueKind::Enum => match value.enum_tag() {
                Some(tag) => self.emit(tag, escaped),
                None => Ok(()),
            },
            // Aggregates have no interpolated form; lambdas are handled
            // before this point.
            ValueKind::Struct | ValueKind::Sequence | ValueKind::Tuple | ValueKind::Lambda => {
                Ok(())
            }
        }
    }

    /* -------- sink plumbing --------------------------------------------- */

    fn charge(&mut self, bytes: usize) -> Result<(), RenderError> {
        if self.budget.charge(bytes) {
            Ok(())
        } else {
            Err(RenderError::OutOfBudget {
                element: self.element,
            })
        }
    }

    /// Static text: indent-aware. While a partial indent is active, each
    /// line begun by the template source gets the indent before its first
    /// content. Newlines inside interpolated values never re-arm the
    /// indent; the output matches rendering the partial with its source
    /// pre-indented, as the spec describes.
    fn write_static(&mut self, text: &str) -> Result<(), RenderError> {
        if self.indent.is_empty() {
            if text.is_empty() {
                return Ok(());
            }
            self.write_passes(text, self.escape_depth)?;
            self.at_line_start = text.ends_with('\n');
            return Ok(());
        }
        for piece in text.split_inclusive('\n') {
            if self.at_line_start && piece != "\n" && piece != "\r\n" {
                self.sink.write_all(self.indent.as_bytes())?;
            }
            self.write_passes(piece, self.escape_depth)?;
            self.at_line_start = piece.ends_with('\n');
        }
        Ok(())
    }

    /// Interpolated value output. A value beginning a source line receives
    /// the active indent once, in front of its first byte.
    fn emit(&mut self, text: &str, escaped: bool) -> Result<(), RenderError> {
        if text.is_empty() {
            return Ok(());
        }
        if self.at_line_start && !self.indent.is_empty() {
            self.sink.write_all(self.indent.as_bytes())?;
        }
        self.write_passes(text, self.escape_depth + usize::from(escaped))?;
        self.at_line_start = false;
        Ok(())
    }

    /// Write `text` through `passes` rounds of HTML escaping. Zero and one
    /// rounds stream; deeper nesting (an escaped lambda inside an escaped
    /// lambda) stages one round and recurses.
    fn write_passes(&mut self, text: &str, passes: usize) -> Result<(), RenderError> {
        match passes {
            0 => self.sink.write_all(text.as_bytes())?,
            1 => escape_into(self.sink, text)?,
            _ => {
                let staged = escape_to_string(text);
                self.charge(staged.len())?;
                self.write_passes(&staged, passes - 1)?;
            }
        }
        Ok(())
    }
}

/* ---------- escaper ------------------------------------------------------ */

/// Stream `text` with the five-character HTML escape set applied.
fn escape_into(sink: &mut dyn io::Write, text: &str) -> io::Result<()> {
    let bytes = text.as_bytes();
    let mut last = 0;
    for (i, &b) in bytes.iter().enumerate() {
        let replacement = match b {
            b'&' => "&amp;",
            b'<' => "&lt;",
            b'>' => "&gt;",
            b'"' => "&quot;",
            b'\'' => "&#39;",
            _ => continue,
        };
        if last < i {
            sink.write_all(&bytes[last..i])?;
        }
        sink.write_all(replacement.as_bytes())?;
        last = i + 1;
    }
    if last < bytes.len() {
        sink.write_all(&bytes[last..])?;
    }
    Ok(())
}

fn escape_to_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
