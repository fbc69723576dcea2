//! Streaming template scanner.
//!
//! Turns raw template bytes into a sequence of text runs and tag tokens,
//! honoring the active delimiter pair and the standalone-line rules. The
//! scanner is byte-oriented: it searches for the open marker with `memmem`,
//! classifies the sigil byte, and reads to the matching close marker.
//! Delimiter changes (`{{=<% %>=}}`) take effect immediately for everything
//! scanned after the tag.

use std::ops::Range;

use memchr::memmem;
use memchr::memrchr;

use crate::engine::{Delimiters, ParseError};

/// Tag kind as determined by the byte immediately after the open marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sigil {
    /// `{{name}}` — escaped interpolation (no sigil byte).
    Interpolation,
    /// `{{&name}}` or `{{{name}}}` — unescaped interpolation.
    Unescaped,
    /// `{{#name}}`
    SectionOpen,
    /// `{{^name}}`
    InvertedOpen,
    /// `{{/name}}`
    SectionClose,
    /// `{{!…}}`
    Comment,
    /// `{{>name}}`
    Partial,
    /// `{{<name}}`
    Parent,
    /// `{{$name}}`
    Block,
    /// `{{=open close=}}`
    SetDelimiters,
}

impl Sigil {
    /// Interpolation tags are never standalone; everything else may be.
    fn standalone_eligible(self) -> bool {
        !matches!(self, Sigil::Interpolation | Sigil::Unescaped)
    }
}

/// One scanner event: a run of static text or a single tag.
#[derive(Debug)]
pub(crate) enum Event<'t> {
    /// Verbatim text, as a byte range into the source.
    Text(Range<usize>),
    Tag(TagToken<'t>),
}

/// A scanned tag with its trimmed body and standalone bookkeeping.
#[derive(Debug)]
pub(crate) struct TagToken<'t> {
    pub sigil: Sigil,
    /// Whitespace-trimmed bytes between the markers, sigil byte excluded.
    pub content: &'t str,
    /// Byte offset of the open marker. Parse errors point here.
    pub offset: usize,
    /// Effective start: the line start for standalone tags, else the open
    /// marker. Section inner ranges end at the closing tag's `start`.
    pub start: usize,
    /// Effective end: past the consumed newline for standalone tags, else
    /// past the close marker. Section inner ranges begin at the opening
    /// tag's `end`.
    pub end: usize,
    pub standalone: bool,
    /// Leading line whitespace of a standalone tag; becomes the indent of
    /// a `{{>partial}}`.
    pub indent: &'t str,
}

/// Lazy scanner over one template source. Finite; not restartable.
pub(crate) struct Scanner<'t> {
    src: &'t str,
    pos: usize,
    delimiters: Delimiters,
    pending: Option<TagToken<'t>>,
}

impl<'t> Scanner<'t> {
    pub(crate) fn new(src: &'t str, delimiters: Delimiters) -> Self {
        Scanner {
            src,
            pos: 0,
            delimiters,
            pending: None,
        }
    }

    /// The pair currently in effect. The parser snapshots this when a
    /// section opens so lambda output can be re-parsed consistently.
    pub(crate) fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    /// Produce the next event, or `None` at end of input.
    ///
    /// A tag preceded by text on the same scan step is buffered so the
    /// text run (already shortened by standalone trimming) comes out
    /// first.
    pub(crate) fn next_event(&mut self) -> Result<Option<Event<'t>>, ParseError> {
        if let Some(tag) = self.pending.take() {
            return Ok(Some(Event::Tag(tag)));
        }
        if self.pos >= self.src.len() {
            return Ok(None);
        }

        let text_start = self.pos;
        let open = self.delimiters.open();
        let Some(rel) = memmem::find(&self.src.as_bytes()[text_start..], open.as_bytes()) else {
            self.pos = self.src.len();
            return Ok(Some(Event::Text(text_start..self.src.len())));
        };

        let at = text_start + rel;
        let token = self.scan_tag(at)?;
        self.pos = token.end;

        // Standalone tags swallow the whitespace between the line start and
        // the open marker; it is never emitted as text.
        let text_end = if token.standalone { token.start } else { at };
        if text_end > text_start {
            self.pending = Some(token);
            Ok(Some(Event::Text(text_start..text_end)))
        } else {
            Ok(Some(Event::Tag(token)))
        }
    }

    /// Scan the tag whose open marker sits at `at`, applying any delimiter
    /// change before returning.
    fn scan_tag(&mut self, at: usize) -> Result<TagToken<'t>, ParseError> {
        let bytes = self.src.as_bytes();
        let mut body_start = at + self.delimiters.open().len();
        if body_start >= bytes.len() {
            return Err(ParseError::UnclosedTag { offset: at });
        }

        let (sigil, has_sigil_byte) = match bytes[body_start] {
            b'{' => (Sigil::Unescaped, true),
            b'&' => (Sigil::Unescaped, true),
            b'#' => (Sigil::SectionOpen, true),
            b'^' => (Sigil::InvertedOpen, true),
            b'/' => (Sigil::SectionClose, true),
            b'!' => (Sigil::Comment, true),
            b'>' => (Sigil::Partial, true),
            b'<' => (Sigil::Parent, true),
            b'$' => (Sigil::Block, true),
            b'=' => (Sigil::SetDelimiters, true),
            _ => (Sigil::Interpolation, false),
        };
        let triple = bytes[body_start] == b'{';
        if has_sigil_byte {
            body_start += 1;
        }

        // Triple-mustache closes with `}` + the active close marker.
        let close = self.delimiters.close();
        let (body_end, tag_end) = if triple {
            let mut pattern = String::with_capacity(close.len() + 1);
            pattern.push('}');
            pattern.push_str(close);
            let rel = memmem::find(&bytes[body_start..], pattern.as_bytes())
                .ok_or(ParseError::UnclosedTag { offset: at })?;
            (body_start + rel, body_start + rel + pattern.len())
        } else {
            let rel = memmem::find(&bytes[body_start..], close.as_bytes())
                .ok_or(ParseError::UnclosedTag { offset: at })?;
            (body_start + rel, body_start + rel + close.len())
        };

        let mut content = self.src[body_start..body_end].trim();
        if sigil == Sigil::SetDelimiters {
            // Body must read `= open sp close =`; the leading `=` was the
            // sigil byte, the trailing one is stripped here.
            content = content
                .strip_suffix('=')
                .ok_or(ParseError::InvalidDelimiters { offset: at })?
                .trim_end();
        }

        let line_start = memrchr(b'\n', &bytes[..at]).map_or(0, |nl| nl + 1);
        let leading = &self.src[line_start..at];
        let mut standalone = sigil.standalone_eligible()
            && leading.bytes().all(|b| b == b' ' || b == b'\t');
        let mut end = tag_end;
        if standalone {
            let mut i = tag_end;
            loop {
                match bytes.get(i) {
                    None => {
                        end = i;
                        break;
                    }
                    Some(b' ') | Some(b'\t') => i += 1,
                    Some(b'\n') => {
                        end = i + 1;
                        break;
                    }
                    Some(b'\r') if bytes.get(i + 1) == Some(&b'\n') => {
                        end = i + 2;
                        break;
                    }
                    Some(_) => {
                        standalone = false;
                        end = tag_end;
                        break;
                    }
                }
            }
        }
        let (start, indent) = if standalone { (line_start, leading) } else { (at, "") };

        if sigil == Sigil::SetDelimiters {
            self.delimiters = parse_delimiter_body(content, at)?;
        }

        Ok(TagToken {
            sigil,
            content,
            offset: at,
            start,
            end,
            standalone,
            indent,
        })
    }
}

/// Parse the inner `open sp close` of a delimiter change.
fn parse_delimiter_body(content: &str, offset: usize) -> Result<Delimiters, ParseError> {
    let mut parts = content.split_whitespace();
    let open = parts.next();
    let close = parts.next();
    match (open, close, parts.next()) {
        (Some(open), Some(close), None) => {
            Delimiters::new(open, close).ok_or(ParseError::InvalidDelimiters { offset })
        }
        _ => Err(ParseError::InvalidDelimiters { offset }),
    }
}
