//! Output capture for script evaluation.
//!
//! The sink is an explicit handle rather than a redirected ambient
//! stream: it is cloned into the engine's `print` and `debug`
//! callbacks at construction time, so captured output never touches
//! process-global state and nothing needs restoring when an
//! evaluation exits early.

use std::sync::{Arc, Mutex, PoisonError};

/// A cloneable, shared text buffer that receives everything a fragment
/// prints during evaluation.
///
/// Cleared by the context before each evaluation; its contents become
/// the `return` value of the `eval` response.
#[derive(Debug, Clone, Default)]
pub struct OutputSink {
    buffer: Arc<Mutex<String>>,
}

impl OutputSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw text to the buffer.
    pub fn push(&self, text: &str) {
        self.lock().push_str(text);
    }

    /// Append a line of text followed by a newline, the shape `print`
    /// output takes.
    pub fn push_line(&self, line: &str) {
        let mut buffer = self.lock();
        buffer.push_str(line);
        buffer.push('\n');
    }

    /// Discard everything captured so far.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// A copy of the captured text.
    pub fn contents(&self) -> String {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, String> {
        // A poisoned buffer only means a previous writer panicked
        // mid-append; the text itself is still usable.
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
