//! The model entity and its script-facing API.
//!
//! The model is the distinguished mutable object inside the namespace
//! whose `modules`/`connections` state is mirrored to every connected
//! client. Scripts obtain one by calling `init()` (seeded into every
//! fresh context) or `new_model()` directly, and typically bind it to
//! the reserved `model` variable:
//!
//! ```rhai
//! model = init();
//! model.add_module("osc1", #{ kind: "oscillator", freq: 440 });
//! model.connect("osc1", "out");
//! ```
//!
//! Identity is tracked with a process-wide monotonic generation counter
//! stamped at construction, so reassigning `model` to a brand-new
//! entity is detectable by value comparison even when the new entity's
//! dirty flag is clear.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rhai::{Array, Dynamic, Engine, Map};

/// Source of model generations. Never reset, so a model built in a
/// freshly rebuilt context always carries an unseen generation.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
struct ModelState {
    dirty: bool,
    generation: u64,
    modules: Map,
    connections: Array,
}

/// A cheap cloneable handle to one model entity.
///
/// Clones alias the same underlying state, so the copy a script holds
/// in its scope and the copy the change detector inspects are the same
/// entity.
#[derive(Debug, Clone)]
pub struct Model {
    inner: Arc<Mutex<ModelState>>,
}

impl Model {
    /// Create an empty model with a fresh generation.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ModelState {
                dirty: false,
                generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
                modules: Map::new(),
                connections: Array::new(),
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ModelState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the model has unpublished changes.
    pub fn dirty(&self) -> bool {
        self.lock().dirty
    }

    /// Set or clear the dirty flag.
    pub fn set_dirty(&self, dirty: bool) {
        self.lock().dirty = dirty;
    }

    /// The generation stamped at construction; the model's identity.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// A copy of the module table.
    pub fn modules(&self) -> Map {
        self.lock().modules.clone()
    }

    /// Replace the module table wholesale and mark the model dirty.
    pub fn set_modules(&self, modules: Map) {
        let mut state = self.lock();
        state.modules = modules;
        state.dirty = true;
    }

    /// A copy of the connection list.
    pub fn connections(&self) -> Array {
        self.lock().connections.clone()
    }

    /// Replace the connection list wholesale and mark the model dirty.
    pub fn set_connections(&self, connections: Array) {
        let mut state = self.lock();
        state.connections = connections;
        state.dirty = true;
    }

    /// Add or replace a named module and mark the model dirty.
    pub fn add_module(&self, name: &str, definition: Map) {
        let mut state = self.lock();
        state
            .modules
            .insert(name.into(), Dynamic::from_map(definition));
        state.dirty = true;
    }

    /// Remove a named module. Marks the model dirty only when the
    /// module existed.
    pub fn remove_module(&self, name: &str) -> bool {
        let mut state = self.lock();
        let removed = state.modules.remove(name).is_some();
        if removed {
            state.dirty = true;
        }
        removed
    }

    /// Append a `[from, to]` connection and mark the model dirty.
    pub fn connect(&self, from: &str, to: &str) {
        let mut state = self.lock();
        let pair: Array = vec![Dynamic::from(from.to_owned()), Dynamic::from(to.to_owned())];
        state.connections.push(Dynamic::from_array(pair));
        state.dirty = true;
    }

    /// Remove every connection matching `[from, to]`. Marks the model
    /// dirty only when something was removed.
    pub fn disconnect(&self, from: &str, to: &str) -> bool {
        let mut state = self.lock();
        let before = state.connections.len();
        state.connections.retain(|entry| {
            entry.read_lock::<Array>().is_none_or(|pair| {
                let matches = pair.first().map(ToString::to_string) == Some(from.to_owned())
                    && pair.get(1).map(ToString::to_string) == Some(to.to_owned());
                !matches
            })
        });
        let removed = state.connections.len() != before;
        if removed {
            state.dirty = true;
        }
        removed
    }

    /// A consistent copy of `(modules, connections)` for snapshotting.
    pub fn snapshot_parts(&self) -> (Map, Array) {
        let state = self.lock();
        (state.modules.clone(), state.connections.clone())
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

/// Register the model type and its constructor with a script engine.
pub(crate) fn register_model_api(engine: &mut Engine) {
    engine
        .register_type_with_name::<Model>("Model")
        .register_fn("new_model", Model::new)
        .register_get_set(
            "dirty",
            |model: &mut Model| model.dirty(),
            |model: &mut Model, dirty: bool| model.set_dirty(dirty),
        )
        .register_get_set(
            "modules",
            |model: &mut Model| model.modules(),
            |model: &mut Model, modules: Map| model.set_modules(modules),
        )
        .register_get_set(
            "connections",
            |model: &mut Model| model.connections(),
            |model: &mut Model, connections: Array| model.set_connections(connections),
        )
        .register_fn(
            "add_module",
            |model: &mut Model, name: &str, definition: Map| {
                model.add_module(name, definition);
            },
        )
        .register_fn("remove_module", |model: &mut Model, name: &str| {
            model.remove_module(name)
        })
        .register_fn("connect", |model: &mut Model, from: &str, to: &str| {
            model.connect(from, to);
        })
        .register_fn("disconnect", |model: &mut Model, from: &str, to: &str| {
            model.disconnect(from, to)
        });
}
