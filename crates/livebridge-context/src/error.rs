//! Error types for the execution context.

use std::path::PathBuf;

/// Errors that can occur inside the execution context.
///
/// Evaluation faults are deliberately *not* represented here: a fragment
/// that raises or fails to parse is captured into the
/// [`EvalReport`](crate::context::EvalReport) as text, never surfaced
/// as an `Err`. Only the lookup, invocation, and loading paths return
/// errors.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// A `get` targeted a name that is not bound in the namespace.
    #[error("no such variable: {0}")]
    NoSuchVariable(String),

    /// A `call` targeted a routine that is not defined.
    #[error("no such routine: {0}")]
    NoSuchRoutine(String),

    /// A located routine raised while executing. Propagated to the
    /// caller rather than captured as text; the dispatch loop treats
    /// this as a crash boundary.
    #[error("routine `{routine}` failed: {source}")]
    Invocation {
        /// Name of the routine that raised.
        routine: String,
        /// The underlying script error.
        #[source]
        source: Box<rhai::EvalAltResult>,
    },

    /// A value could not be converted between JSON and a script value.
    #[error("could not convert value: {0}")]
    Conversion(String),

    /// A script file could not be read or executed during
    /// [`load_script`](crate::context::ExecutionContext::load_script).
    #[error("failed to load script {path}: {message}")]
    ScriptLoad {
        /// Path of the offending script file.
        path: PathBuf,
        /// What went wrong (I/O, parse, or runtime fault).
        message: String,
    },

    /// The built-in seed fragment failed to compile. Indicates a bug in
    /// the bridge itself, not in user code.
    #[error("failed to seed context: {0}")]
    Seed(String),
}
