//! Tag classification and element tree construction.
//!
//! The parser drives the scanner, maps each tag token to a typed element,
//! and maintains a section stack to nest children and record `inner`
//! source ranges. Comments and delimiter changes are consumed here and
//! never reach the tree.

use crate::engine::scanner::{Event, Scanner, Sigil, TagToken};
use crate::engine::{Delimiters, Element, ParseError, TagPath};

/// What a `{{/name}}` will close into.
enum FrameKind {
    Section { inverted: bool },
    Parent,
    Block,
}

/// An open section (or inheritance block) awaiting its closing tag.
struct SectionFrame {
    path: TagPath,
    kind: FrameKind,
    open_offset: usize,
    inner_start: usize,
    delimiters: Delimiters,
    children: Vec<Element>,
}

/// Parse a template source into its element tree, starting from the given
/// delimiter pair.
///
/// The same routine serves fresh templates and lambda-returned fragments;
/// only the initial delimiters differ.
pub(crate) fn parse(source: &str, delimiters: Delimiters) -> Result<Vec<Element>, ParseError> {
    let mut scanner = Scanner::new(source, delimiters);
    let mut root: Vec<Element> = Vec::new();
    let mut stack: Vec<SectionFrame> = Vec::new();

    while let Some(event) = scanner.next_event()? {
        match event {
            Event::Text(range) => {
                current(&mut root, &mut stack).push(Element::Text(range));
            }
            Event::Tag(tag) => {
                let snapshot = scanner.delimiters().clone();
                handle_tag(tag, snapshot, &mut root, &mut stack)?;
            }
        }
    }

    if let Some(frame) = stack.pop() {
        return Err(ParseError::UnclosedSection {
            name: frame.path.raw().to_string(),
            offset: frame.open_offset,
        });
    }
    Ok(root)
}

/// The element list currently receiving nodes: the innermost open section,
/// or the root.
fn current<'a>(
    root: &'a mut Vec<Element>,
    stack: &'a mut Vec<SectionFrame>,
) -> &'a mut Vec<Element> {
    match stack.last_mut() {
        Some(frame) => &mut frame.children,
        None => root,
    }
}

fn handle_tag(
    tag: TagToken<'_>,
    delimiters: Delimiters,
    root: &mut Vec<Element>,
    stack: &mut Vec<SectionFrame>,
) -> Result<(), ParseError> {
    match tag.sigil {
        Sigil::Interpolation | Sigil::Unescaped => {
            let path = TagPath::parse(tag.content, tag.offset)?;
            current(root, stack).push(Element::Interpolation {
                path,
                escaped: tag.sigil == Sigil::Interpolation,
            });
        }
        Sigil::SectionOpen | Sigil::InvertedOpen | Sigil::Parent | Sigil::Block => {
            let path = TagPath::parse(tag.content, tag.offset)?;
            let kind = match tag.sigil {
                Sigil::SectionOpen => FrameKind::Section { inverted: false },
                Sigil::InvertedOpen => FrameKind::Section { inverted: true },
                Sigil::Parent => FrameKind::Parent,
                _ => FrameKind::Block,
            };
            stack.push(SectionFrame {
                path,
                kind,
                open_offset: tag.offset,
                inner_start: tag.end,
                delimiters,
                children: Vec::new(),
            });
        }
        Sigil::SectionClose => {
            let path = TagPath::parse(tag.content, tag.offset)?;
            let Some(frame) = stack.pop() else {
                return Err(ParseError::MismatchedSection {
                    expected: String::new(),
                    found: path.raw().to_string(),
                    offset: tag.offset,
                });
            };
            if frame.path.raw() != path.raw() {
                return Err(ParseError::MismatchedSection {
                    expected: frame.path.raw().to_string(),
                    found: path.raw().to_string(),
                    offset: tag.offset,
                });
            }
            let element = match frame.kind {
                FrameKind::Section { inverted } => Element::Section {
                    path: frame.path,
                    inverted,
                    inner: frame.inner_start..tag.start,
                    delimiters: frame.delimiters,
                    children: frame.children,
                },
                FrameKind::Parent | FrameKind::Block => Element::Inherit {
                    name: frame.path.raw().to_string(),
                    parent: matches!(frame.kind, FrameKind::Parent),
                    children: frame.children,
                },
            };
            current(root, stack).push(element);
        }
        Sigil::Partial => {
            if tag.content.is_empty() {
                return Err(ParseError::EmptyPath { offset: tag.offset });
            }
            current(root, stack).push(Element::Partial {
                name: tag.content.to_string(),
                indent: tag.indent.to_string(),
            });
        }
        // Standalone handling already happened in the scanner; nothing of
        // these survives into the tree.
        Sigil::Comment | Sigil::SetDelimiters => {}
    }
    Ok(())
}
