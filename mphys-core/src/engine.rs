//! Process-wide lifecycle guard for native microphysics engines.
//!
//! Engines backing a scheme adapter may hold global state, so at most one instance of a
//! given engine may be live in a process.
//! An adapter acquires an [`EngineHandle`] when it starts its engine and releases it when the
//! engine is shut down.
//! A second acquisition while the first handle is alive fails with [`MPhysError::Engine`]
//! instead of silently starting the engine again.
//!
//! ```rust
//! use mphys_core::engine::EngineHandle;
//!
//! let handle = EngineHandle::acquire("doc-example-engine").unwrap();
//! assert!(EngineHandle::acquire("doc-example-engine").is_err());
//!
//! handle.release();
//! assert!(EngineHandle::acquire("doc-example-engine").is_ok());
//! ```

use crate::errors::{MPhysError, MPhysResult};
use std::collections::HashSet;
use std::sync::{LazyLock, PoisonError, RwLock};
use tracing::info;

/// Registry of the engines that are currently live.
///
/// The global registry instance is available as [`ENGINE_REGISTRY`].
/// Entries are only added and removed through [`EngineHandle`].
#[derive(Debug, Default)]
pub struct EngineRegistry {
    live: RwLock<HashSet<String>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an engine with this name is currently held.
    pub fn is_live(&self, name: &str) -> bool {
        self.live
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }

    /// Names of all live engines, sorted.
    pub fn live_engines(&self) -> Vec<String> {
        let live = self.live.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = live.iter().cloned().collect();
        names.sort();
        names
    }

    fn register(&self, name: &str) -> MPhysResult<()> {
        let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);
        if !live.insert(name.to_string()) {
            return Err(MPhysError::engine(
                name,
                "engine is already initialised in this process",
            ));
        }
        Ok(())
    }

    fn unregister(&self, name: &str) {
        self.live
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }
}

/// Global engine registry instance.
pub static ENGINE_REGISTRY: LazyLock<EngineRegistry> = LazyLock::new(EngineRegistry::new);

/// Owning handle on a live engine.
///
/// The engine is released when the handle is dropped or [`EngineHandle::release`] is called.
#[derive(Debug)]
pub struct EngineHandle {
    name: String,
}

impl EngineHandle {
    /// Mark the engine `name` as live.
    ///
    /// # Errors
    ///
    /// Returns [`MPhysError::Engine`] if another handle for `name` is alive.
    pub fn acquire(name: impl Into<String>) -> MPhysResult<Self> {
        let name = name.into();
        ENGINE_REGISTRY.register(&name)?;
        info!(engine = %name, "engine acquired");
        Ok(Self { name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Release the engine explicitly.
    pub fn release(self) {
        // Drop does the work
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        ENGINE_REGISTRY.unregister(&self.name);
        info!(engine = %self.name, "engine released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Registry names are process-wide so every test uses its own.

    #[test]
    fn repeated_acquire_fails() {
        let _handle = EngineHandle::acquire("test-repeated").unwrap();
        let err = EngineHandle::acquire("test-repeated").unwrap_err();
        assert!(matches!(err, MPhysError::Engine { ref engine, .. } if engine == "test-repeated"));
    }

    #[test]
    fn drop_releases() {
        {
            let handle = EngineHandle::acquire("test-drop").unwrap();
            assert_eq!(handle.name(), "test-drop");
            assert!(ENGINE_REGISTRY.is_live("test-drop"));
        }
        assert!(!ENGINE_REGISTRY.is_live("test-drop"));
        let _again = EngineHandle::acquire("test-drop").unwrap();
    }

    #[test]
    fn engines_are_independent() {
        let _a = EngineHandle::acquire("test-independent-a").unwrap();
        let _b = EngineHandle::acquire("test-independent-b").unwrap();
        let live = ENGINE_REGISTRY.live_engines();
        assert!(live.contains(&"test-independent-a".to_string()));
        assert!(live.contains(&"test-independent-b".to_string()));
    }
}
