//! `TerminalReporter` - Presentation-layer implementation of `ProgressReporter`.
//!
//! Wraps `&OutputContext` and implements the `application::ports::ProgressReporter`
//! trait so application services can emit progress events without depending on
//! any presentation type directly.

use owo_colors::OwoColorize as _;

use crate::application::ports::ProgressReporter;
use crate::output::OutputContext;

/// Terminal progress reporter that wraps an `OutputContext`.
///
/// - `step()` prints `"  → {message}"`
/// - `success()` prints `"  ✓ {message}"`
/// - `warn()` prints `"  ! {message}"`
/// - `dump()` prints a dimmed title followed by the body, indented
///
/// All of them are suppressed when `ctx.quiet`.
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
}

impl<'a> TerminalReporter<'a> {
    /// Create a new `TerminalReporter` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        self.ctx
            .line(&format!("  {} {message}", "→".style(self.ctx.styles.step)));
    }

    fn success(&self, message: &str) {
        self.ctx
            .line(&format!("  {} {message}", "✓".style(self.ctx.styles.success)));
    }

    fn warn(&self, message: &str) {
        self.ctx
            .line(&format!("  {} {message}", "!".style(self.ctx.styles.warning)));
    }

    fn dump(&self, title: &str, body: &str) {
        self.ctx
            .line(&format!("  {}", title.style(self.ctx.styles.dim)));
        for row in body.lines() {
            self.ctx.line(&format!("    {row}"));
        }
    }
}
