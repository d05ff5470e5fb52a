//! Change detection for the model entity.
//!
//! After every evaluation the dispatcher asks the detector whether the
//! model's observable state must be pushed to clients. Detection runs
//! only on the `eval` path: `call` and `set` can also mutate the model
//! but never trigger a push. The asymmetry is deliberate: the console
//! is the primary mutation surface, and clients that mutate through
//! the other verbs are expected to follow up with an evaluation.

use livebridge_protocol::StateSnapshot;
use tracing::debug;

use crate::context::ExecutionContext;
use crate::convert::dynamic_to_json;
use crate::model::Model;

/// Reserved namespace variable under which the model entity lives.
pub const MODEL_VAR: &str = "model";

/// Tracks the last published model generation and produces snapshots.
///
/// One detector lives on the dispatch task for the lifetime of the
/// process. It needs no explicit reset on context rebuild: generations
/// come from a process-wide monotonic counter, so a model constructed
/// in a fresh context always compares as changed.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last_generation: Option<u64>,
}

impl ChangeDetector {
    /// Create a detector that has published nothing yet.
    pub const fn new() -> Self {
        Self {
            last_generation: None,
        }
    }

    /// Decide whether the model must be re-published.
    ///
    /// Returns a snapshot when the reserved `model` variable holds a
    /// model entity that is dirty or whose generation differs from the
    /// last recorded one (a reassignment counts as a change even when
    /// the new entity is clean). Producing a snapshot clears the dirty
    /// flag and records the generation. When no model is bound, no
    /// snapshot logic runs at all.
    pub fn inspect(&mut self, ctx: &ExecutionContext) -> Option<StateSnapshot> {
        let value = ctx.peek(MODEL_VAR)?;
        let model = value.try_cast::<Model>()?;

        let generation = model.generation();
        if !model.dirty() && self.last_generation == Some(generation) {
            return None;
        }

        model.set_dirty(false);
        self.last_generation = Some(generation);

        let (modules, connections) = model.snapshot_parts();
        debug!(generation, "model changed, publishing snapshot");
        Some(StateSnapshot {
            modules: dynamic_to_json(&rhai::Dynamic::from_map(modules)),
            connections: dynamic_to_json(&rhai::Dynamic::from_array(connections)),
        })
    }
}
