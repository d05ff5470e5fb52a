//! Error types for the bridge server.

use livebridge_context::ContextError;

/// Errors that terminate processing of a single request.
///
/// These are the *unrecovered* faults of the protocol: an error raised
/// inside a successfully located routine (or a `call` on an absent
/// routine) propagates out of the dispatcher instead of becoming an
/// error response. The dispatch loop treats them as a crash boundary --
/// it logs the fault and keeps serving subsequent requests.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A `call` verb failed inside or before the routine.
    #[error("call failed: {source}")]
    Call {
        /// The underlying context error.
        #[from]
        source: ContextError,
    },
}
