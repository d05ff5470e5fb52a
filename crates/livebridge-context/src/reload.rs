//! The shared context cell and rebuild-on-trigger logic.
//!
//! All verb handlers reach the current [`ExecutionContext`] through a
//! [`ContextSlot`]; the [`ReloadController`] is the slot's sole writer.
//! On trigger (a watched source file changed), the controller builds a
//! brand-new context -- discarding every namespace binding, including
//! any bound model -- and atomically swaps it in. An in-flight request
//! holding the lock completes against the old context; anything
//! arriving after the swap sees the new, empty one.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

use crate::context::ExecutionContext;
use crate::error::ContextError;

/// Shared indirection cell holding the single current context.
#[derive(Debug, Clone)]
pub struct ContextSlot {
    inner: Arc<RwLock<ExecutionContext>>,
}

impl ContextSlot {
    /// Wrap an initial context.
    pub fn new(context: ExecutionContext) -> Self {
        Self {
            inner: Arc::new(RwLock::new(context)),
        }
    }

    /// Borrow the current context for reading.
    pub async fn read(&self) -> RwLockReadGuard<'_, ExecutionContext> {
        self.inner.read().await
    }

    /// Borrow the current context for mutation.
    pub async fn write(&self) -> RwLockWriteGuard<'_, ExecutionContext> {
        self.inner.write().await
    }

    /// Swap in a replacement context, dropping the old one.
    pub async fn replace(&self, context: ExecutionContext) {
        *self.inner.write().await = context;
    }
}

/// Rebuilds the execution context when triggered.
#[derive(Debug)]
pub struct ReloadController {
    slot: ContextSlot,
    extension: Option<PathBuf>,
}

impl ReloadController {
    /// Create a controller that rebuilds with the given extension
    /// script (the same one loaded at boot).
    pub const fn new(slot: ContextSlot, extension: Option<PathBuf>) -> Self {
        Self { slot, extension }
    }

    /// Construct a fresh context and swap it into the slot.
    ///
    /// All prior namespace state is lost. Coalescing of rapid
    /// successive triggers is the watcher's responsibility, not ours.
    ///
    /// # Errors
    ///
    /// Returns the construction error when the fresh context cannot be
    /// built (for example, the extension script no longer parses); the
    /// old context stays current in that case.
    pub async fn rebuild(&self) -> Result<(), ContextError> {
        let fresh = ExecutionContext::new(self.extension.as_deref())?;
        self.slot.replace(fresh).await;
        match &self.extension {
            Some(path) => info!(extension = %path.display(), "execution context rebuilt"),
            None => info!("execution context rebuilt"),
        }
        Ok(())
    }
}
