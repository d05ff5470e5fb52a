//! Execution context for the livebridge server.
//!
//! This crate hosts the single mutable scripting namespace the bridge
//! exposes to remote clients:
//!
//! - [`ExecutionContext`] -- a persistent [`rhai`] scope evaluated
//!   fragment-by-fragment with output capture and per-call exception
//!   tracking (REPL semantics, not a one-shot expression evaluator)
//! - [`Model`] -- the designated mutable entity whose `modules` and
//!   `connections` state is mirrored to clients
//! - [`ChangeDetector`] -- decides after each evaluation whether the
//!   model must be re-published
//! - [`ContextSlot`] / [`ReloadController`] -- the shared indirection
//!   cell holding the current context, and the rebuild-on-trigger logic
//!   that swaps in a fresh one
//!
//! # Concurrency
//!
//! The context itself is synchronous and single-owner. The server runs
//! all verb handling on one dispatch task, so no two evaluations ever
//! interleave; the [`ContextSlot`] lock exists to let the reload
//! controller swap contexts without racing an in-flight request.

pub mod change;
pub mod context;
pub mod convert;
pub mod error;
pub mod model;
pub mod reload;
pub mod sink;

// Re-export primary types for convenience.
pub use change::{ChangeDetector, MODEL_VAR};
pub use context::{EvalReport, ExecutionContext};
pub use convert::{dynamic_to_json, json_to_dynamic};
pub use error::ContextError;
pub use model::Model;
pub use reload::{ContextSlot, ReloadController};
pub use sink::OutputSink;
