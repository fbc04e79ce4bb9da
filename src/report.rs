// ABOUTME: Diagnostic sink tracking whether static or runtime errors occurred

use crate::error::RuntimeError;
use std::cell::Cell;

/// Collects diagnostics for one program run.
///
/// The lexer, parser, and resolver all report through the same instance, so
/// after each pipeline stage the driver can check `had_error` and decide
/// whether to keep going. The REPL resets the flags between inputs.
#[derive(Debug, Default)]
pub struct Reporter {
    had_error: Cell<bool>,
    had_runtime_error: Cell<bool>,
}

impl Reporter {
    pub fn new() -> Self {
        Reporter::default()
    }

    /// Reports a lexical, syntactic, or resolution error.
    pub fn static_error(&self, line: usize, message: &str) {
        eprintln!("[line {}] Error: {}", line, message);
        self.had_error.set(true);
    }

    pub fn runtime_error(&self, error: &RuntimeError) {
        eprintln!("{}\n[line {}]", error.message, error.line);
        self.had_runtime_error.set(true);
    }

    pub fn had_error(&self) -> bool {
        self.had_error.get()
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error.get()
    }

    /// Clears both flags so the next REPL input starts fresh.
    pub fn reset(&self) {
        self.had_error.set(false);
        self.had_runtime_error.set(false);
    }
}
