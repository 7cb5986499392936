//! `TerminalReporter` — Presentation-layer implementation of `Reporter`.
//!
//! Wraps `&OutputContext` and implements the `application::ports::Reporter`
//! trait so application services and executor back-ends can emit the
//! fixed-prefix log lines without depending on any presentation type.

use crate::application::ports::Reporter;
use crate::output::OutputContext;

/// Terminal reporter that wraps an `OutputContext`.
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

impl Reporter for TerminalReporter<'_> {
    fn info(&self, message: &str) {
        self.ctx.info(message);
    }

    fn warn(&self, message: &str) {
        self.ctx.warn(message);
    }

    fn verbose(&self, message: &str) {
        self.ctx.verbose(message);
    }
}
