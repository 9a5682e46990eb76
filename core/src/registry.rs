//! Registry of slice names.
//!
//! Every composed slice claims its name here exactly once. The set only
//! grows: there is no teardown. Tests and embedders that need isolation
//! construct their own registry with [`SliceRegistry::new`]; everything else
//! shares [`SliceRegistry::global`].

use crate::error::SliceError;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// A set of claimed slice names with atomic check-and-insert.
///
/// Clones share the same underlying set.
///
/// # Example
///
/// ```
/// use slicekit_core::{SliceError, SliceRegistry};
///
/// let registry = SliceRegistry::new();
/// registry.register("counter")?;
/// assert_eq!(
///     registry.register("counter"),
///     Err(SliceError::DuplicateSliceName("counter".to_string()))
/// );
/// # Ok::<(), SliceError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct SliceRegistry {
    names: Arc<Mutex<BTreeSet<String>>>,
}

impl SliceRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<SliceRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::new)
    }

    /// Claim `name`
    ///
    /// # Errors
    ///
    /// Returns [`SliceError::DuplicateSliceName`] if the name was already
    /// claimed; the registry is left unchanged.
    pub fn register(&self, name: &str) -> Result<(), SliceError> {
        let inserted = self
            .names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string());

        if !inserted {
            tracing::warn!(slice = name, "Rejected duplicate slice name");
            return Err(SliceError::DuplicateSliceName(name.to_string()));
        }

        metrics::counter!("slice.registry.registered").increment(1);
        tracing::debug!(slice = name, "Registered slice");
        Ok(())
    }

    /// Whether `name` has been claimed
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }

    /// Number of claimed names
    #[must_use]
    pub fn len(&self) -> usize {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no name has been claimed yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Claimed names in sorted order
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}
