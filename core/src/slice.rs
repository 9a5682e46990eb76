//! Caller-supplied slice definitions.

use crate::action::Payload;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Requirements on a slice's caller-owned fields.
///
/// Fields are owned data, cheap enough to clone per transition, and
/// serializable so the default projection can expose them as props. They
/// must serialize to a map without an `operations` entry, which composing
/// checks.
pub trait SliceFields: Clone + fmt::Debug + Serialize + Send + Sync + 'static {}

impl<T> SliceFields for T where T: Clone + fmt::Debug + Serialize + Send + Sync + 'static {}

/// A synchronous transition: takes the current fields by value and returns
/// the next value.
pub type Transition<S> = Arc<dyn Fn(S, &Payload) -> S + Send + Sync>;

/// Named synchronous transitions, in declaration order.
///
/// Names are not deduplicated here; repeated names are reported when the
/// slice is composed.
pub struct Transitions<S> {
    entries: Vec<(String, Transition<S>)>,
}

impl<S> Transitions<S> {
    /// An empty transition map
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add a transition named `name`
    #[must_use]
    pub fn on<F>(mut self, name: impl Into<String>, transition: F) -> Self
    where
        F: Fn(S, &Payload) -> S + Send + Sync + 'static,
    {
        self.entries.push((name.into(), Arc::new(transition)));
        self
    }

    /// Number of declared transitions
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no transition was declared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Declared names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub(crate) fn into_entries(self) -> Vec<(String, Transition<S>)> {
        self.entries
    }
}

impl<S> Default for Transitions<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for Transitions<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Declaration of a slice: its name, initial fields and transitions.
///
/// Every part is required; a definition missing any of them is rejected
/// with [`SliceError::MissingSliceConfiguration`](crate::SliceError) when
/// composed.
///
/// # Example
///
/// ```
/// use serde::Serialize;
/// use slicekit_core::{SliceDefinition, Transitions};
///
/// #[derive(Clone, Debug, Serialize)]
/// struct Flag {
///     on: bool,
/// }
///
/// let definition = SliceDefinition::named("flag")
///     .with_initial_fields(Flag { on: false })
///     .with_transitions(Transitions::new().on("toggle", |flag: Flag, _| Flag { on: !flag.on }));
/// assert_eq!(definition.name(), "flag");
/// ```
#[derive(Debug)]
pub struct SliceDefinition<S> {
    pub(crate) name: String,
    pub(crate) initial_fields: Option<S>,
    pub(crate) transitions: Option<Transitions<S>>,
}

impl<S> SliceDefinition<S> {
    /// Start a definition for the slice `name`
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            initial_fields: None,
            transitions: None,
        }
    }

    /// Set the initial fields
    #[must_use]
    pub fn with_initial_fields(mut self, fields: S) -> Self {
        self.initial_fields = Some(fields);
        self
    }

    /// Set the synchronous transitions
    #[must_use]
    pub fn with_transitions(mut self, transitions: Transitions<S>) -> Self {
        self.transitions = Some(transitions);
        self
    }

    /// The slice name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}
