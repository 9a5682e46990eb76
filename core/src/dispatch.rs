//! Dispatch tables: one externally visible name per transition and per
//! async operation.
//!
//! A table maps each name to a [`DispatchKey`] and builds the correctly
//! shaped [`Action`] from the caller's argument, so callers never assemble
//! action types by hand. Binding a table to a store lives in the runtime.

use crate::action::{Action, Payload};
use crate::error::SliceError;
use std::collections::BTreeMap;

/// What a dispatch name resolves to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchKey {
    /// A caller-declared synchronous transition
    Transition(String),
    /// The generated `resetState` transition
    Reset,
    /// An async operation; dispatching it emits the start signal
    Operation(String),
}

/// Action creators of one slice.
///
/// Names are validated unique when the slice is composed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchTable {
    slice: String,
    entries: BTreeMap<String, DispatchKey>,
}

impl DispatchTable {
    pub(crate) const fn new(slice: String, entries: BTreeMap<String, DispatchKey>) -> Self {
        Self { slice, entries }
    }

    /// The owning slice
    #[must_use]
    pub fn slice(&self) -> &str {
        &self.slice
    }

    /// All dispatch names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// What `name` resolves to
    #[must_use]
    pub fn key(&self, name: &str) -> Option<&DispatchKey> {
        self.entries.get(name)
    }

    /// Build the action dispatched for `name` with `argument`.
    ///
    /// Transitions carry the argument as payload; operations carry it as
    /// the input of their pending action (`null` when absent); `resetState`
    /// ignores it.
    ///
    /// # Errors
    ///
    /// Returns [`SliceError::UnknownDispatch`] if `name` is not in the table.
    pub fn action(&self, name: &str, argument: Option<Payload>) -> Result<Action, SliceError> {
        let key = self.key(name).ok_or_else(|| SliceError::UnknownDispatch {
            slice: self.slice.clone(),
            name: name.to_string(),
        })?;

        Ok(match key {
            DispatchKey::Transition(transition) => {
                Action::transition(self.slice.as_str(), transition.as_str(), argument)
            },
            DispatchKey::Reset => Action::reset(self.slice.as_str()),
            DispatchKey::Operation(op) => Action::pending(
                self.slice.as_str(),
                op.as_str(),
                argument.unwrap_or(Payload::Null),
            ),
        })
    }
}
