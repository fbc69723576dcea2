//! Debug tracer for render sessions.
//!
//! Prints `DEBUG:`-prefixed lines to stderr when enabled, giving a
//! section-by-section view of a render: partial resolution, lambda
//! expansion, and session timing.

use std::time::Duration;

/// Stderr tracer gated by an enabled flag.
pub(crate) struct DebugTracer {
    enabled: bool,
}

impl DebugTracer {
    pub(crate) fn new(enabled: bool) -> Self {
        DebugTracer { enabled }
    }

    /// Print the session header with a preview of the template source.
    pub(crate) fn session_start(&self, title: &str, source: &str) {
        if !self.enabled {
            return;
        }
        eprintln!("DEBUG: ═══════════════════════════════════════════════");
        eprintln!("DEBUG: {title} START");
        eprintln!("DEBUG: Template: {:?}", preview(source));
        eprintln!("DEBUG: ───────────────────────────────────────────────");
    }

    /// Print one traced step.
    pub(crate) fn step(&self, label: &str, detail: &str) {
        if !self.enabled {
            return;
        }
        eprintln!("DEBUG: {label}: {detail}");
    }

    /// Print the session footer, with timing when available.
    pub(crate) fn session_end(&self, title: &str, elapsed: Option<Duration>) {
        if !self.enabled {
            return;
        }
        match elapsed {
            Some(elapsed) => eprintln!("DEBUG: {title} COMPLETE in {elapsed:?}"),
            None => eprintln!("DEBUG: {title} COMPLETE"),
        }
        eprintln!("DEBUG: ═══════════════════════════════════════════════");
    }
}

/// Shorten long template sources for the header line.
fn preview(source: &str) -> String {
    const MAX: usize = 60;
    if source.len() <= MAX {
        return source.to_string();
    }
    let mut cut = MAX;
    while !source.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... ({} bytes)", &source[..cut], source.len())
}
