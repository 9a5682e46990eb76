//! Root composition: several independently authored slices in one store.
//!
//! The process-wide state is a [`RootState`], a map from slice name to that
//! slice's [`SliceState`]. A [`RootReducer`] routes each action to the slice
//! named in its type, and also offers it to every other slice composed with
//! an extra reducer. Only entries whose reducer produced a new state are
//! replaced; every other entry keeps its allocation, so consumers can detect
//! "this slice changed" with a pointer comparison ([`RootState::shares_slice`]).
//!
//! # Examples
//!
//! ```
//! use serde::Serialize;
//! use slicekit_core::composition::RootReducer;
//! use slicekit_core::reducer::Reducer;
//! use slicekit_core::{Action, SliceComposer, SliceDefinition, SliceRegistry, Transitions};
//!
//! #[derive(Clone, Debug, Serialize)]
//! struct Flag {
//!     on: bool,
//! }
//!
//! #[derive(Clone, Debug, Serialize)]
//! struct Total {
//!     bumps: u32,
//! }
//!
//! let registry = SliceRegistry::new();
//! let flag = SliceComposer::<Flag, ()>::new(
//!     SliceDefinition::named("flag")
//!         .with_initial_fields(Flag { on: false })
//!         .with_transitions(Transitions::new().on("toggle", |f: Flag, _| Flag { on: !f.on })),
//! )
//! .compose(&registry)?;
//! let total = SliceComposer::<Total, ()>::new(
//!     SliceDefinition::named("total")
//!         .with_initial_fields(Total { bumps: 0 })
//!         .with_transitions(Transitions::new().on("bump", |t: Total, _| Total { bumps: t.bumps + 1 })),
//! )
//! .compose(&registry)?;
//!
//! let root = RootReducer::new().mount(&flag)?.mount(&total)?;
//! let before = root.initial_state();
//! let mut after = before.clone();
//! let _ = root.reduce(&mut after, Action::transition("flag", "toggle", None), &());
//!
//! assert_eq!(after.slice::<Flag>("flag").map(|s| s.fields.on), Some(true));
//! assert!(!after.shares_slice(&before, "flag"));
//! assert!(after.shares_slice(&before, "total"));
//! # Ok::<(), slicekit_core::SliceError>(())
//! ```

use crate::action::Action;
use crate::compose::{ComposedSlice, SliceReducer, SliceState};
use crate::effect::Effect;
use crate::error::SliceError;
use crate::reducer::Reducer;
use crate::slice::SliceFields;
use smallvec::{smallvec, SmallVec};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

type ErasedState = Arc<dyn Any + Send + Sync>;

/// Full process state: every mounted slice's state keyed by slice name.
///
/// Cloning is cheap; clones share every slice allocation.
#[derive(Clone, Default)]
pub struct RootState {
    slices: BTreeMap<String, ErasedState>,
}

impl RootState {
    /// State of slice `name`, if mounted with fields of type `S`
    #[must_use]
    pub fn slice<S: SliceFields>(&self, name: &str) -> Option<&SliceState<S>> {
        self.slices.get(name)?.downcast_ref()
    }

    /// Shared handle to the state of slice `name`
    #[must_use]
    pub fn slice_arc<S: SliceFields>(&self, name: &str) -> Option<Arc<SliceState<S>>> {
        Arc::clone(self.slices.get(name)?).downcast().ok()
    }

    /// Whether `self` and `other` hold the very same allocation for `name`
    #[must_use]
    pub fn shares_slice(&self, other: &Self, name: &str) -> bool {
        match (self.slices.get(name), other.slices.get(name)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Whether slice `name` is mounted
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.slices.contains_key(name)
    }

    /// Mounted slice names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.slices.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for RootState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootState")
            .field("slices", &self.names())
            .finish()
    }
}

/// A slice reducer with its state type erased.
trait MountedSlice<E>: Send + Sync {
    fn initial(&self) -> ErasedState;

    /// Whether actions of other slices can change this one
    fn observes_foreign(&self) -> bool;

    fn step(
        &self,
        state: &ErasedState,
        action: Action,
        env: &E,
    ) -> Option<(ErasedState, SmallVec<[Effect<Action>; 4]>)>;
}

impl<S: SliceFields, E> MountedSlice<E> for SliceReducer<S, E> {
    fn initial(&self) -> ErasedState {
        Arc::new(self.initial_state().clone())
    }

    fn observes_foreign(&self) -> bool {
        self.has_extra_reducer()
    }

    fn step(
        &self,
        state: &ErasedState,
        action: Action,
        env: &E,
    ) -> Option<(ErasedState, SmallVec<[Effect<Action>; 4]>)> {
        let Some(current) = state.downcast_ref::<SliceState<S>>() else {
            tracing::error!(slice = %self.name(), "Mounted state has an unexpected type");
            return None;
        };
        let (next, effects) = SliceReducer::step(self, current, action, env)?;
        Some((Arc::new(next) as ErasedState, effects))
    }
}

/// Reducer over [`RootState`] routing actions to mounted slices.
pub struct RootReducer<E> {
    slices: BTreeMap<String, Arc<dyn MountedSlice<E>>>,
}

impl<E> Clone for RootReducer<E> {
    fn clone(&self) -> Self {
        Self {
            slices: self.slices.clone(),
        }
    }
}

impl<E> Default for RootReducer<E> {
    fn default() -> Self {
        Self {
            slices: BTreeMap::new(),
        }
    }
}

impl<E> fmt::Debug for RootReducer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootReducer")
            .field("slices", &self.slices.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<E: 'static> RootReducer<E> {
    /// A root with no slices
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a composed slice
    ///
    /// # Errors
    ///
    /// Returns [`SliceError::DuplicateSliceName`] if a slice with the same
    /// name is already mounted; the existing slice is kept.
    pub fn mount<S: SliceFields>(self, slice: &ComposedSlice<S, E>) -> Result<Self, SliceError> {
        self.mount_reducer(slice.reducer())
    }

    /// Mount a slice reducer
    ///
    /// # Errors
    ///
    /// Returns [`SliceError::DuplicateSliceName`] if a slice with the same
    /// name is already mounted; the existing slice is kept.
    pub fn mount_reducer<S: SliceFields>(
        mut self,
        reducer: SliceReducer<S, E>,
    ) -> Result<Self, SliceError> {
        let name = reducer.name().to_string();
        if self.slices.contains_key(&name) {
            tracing::warn!(slice = %name, "Rejected duplicate mount");
            return Err(SliceError::DuplicateSliceName(name));
        }

        tracing::debug!(slice = %name, "Mounted slice");
        self.slices.insert(name, Arc::new(reducer));
        Ok(self)
    }

    /// Full state with every slice at its initial state
    #[must_use]
    pub fn initial_state(&self) -> RootState {
        RootState {
            slices: self
                .slices
                .iter()
                .map(|(name, slice)| (name.clone(), slice.initial()))
                .collect(),
        }
    }

    /// Mounted slice names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.slices.keys().map(String::as_str).collect()
    }
}

impl<E: 'static> Reducer for RootReducer<E> {
    type State = RootState;
    type Action = Action;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let name = action.slice().to_string();

        for (observer, slice) in &self.slices {
            if *observer == name || !slice.observes_foreign() {
                continue;
            }
            let Some(current) = state.slices.get(observer) else {
                continue;
            };
            // Foreign actions never start work in the observer
            if let Some((next, _)) = slice.step(current, action.clone(), env) {
                tracing::trace!(slice = %observer, action = %action.action_type, "Extra reducer applied");
                state.slices.insert(observer.clone(), next);
            }
        }

        let (Some(slice), Some(current)) = (self.slices.get(&name), state.slices.get(&name)) else {
            tracing::trace!(slice = %name, "No mounted slice for action");
            return smallvec![Effect::None];
        };

        match slice.step(current, action, env) {
            Some((next, effects)) => {
                state.slices.insert(name, next);
                effects
            },
            None => smallvec![Effect::None],
        }
    }
}
