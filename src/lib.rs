//! # mustache_pipeline
//!
//! A streaming, logic-less Mustache template engine for Rust.

mod engine;

pub use engine::context::{ContextValue, Lambda, ValueKind};
pub use engine::partials::{DirectoryPartials, InMemoryPartials, PartialSource, PartialsResolver};
pub use engine::template::{RenderOptions, Template};
pub use engine::{Delimiters, Error, ParseError, RenderError};
pub use engine::{parse_cached, render_file, render_str};
