//! Slice composition: the factory that turns a [`SliceDefinition`] plus
//! [`AsyncOperation`]s into a wired slice.
//!
//! # Examples
//!
//! ```
//! use serde::Serialize;
//! use slicekit_core::{Action, SliceComposer, SliceDefinition, SliceRegistry, Transitions};
//! use serde_json::json;
//!
//! #[derive(Clone, Debug, Default, PartialEq, Serialize)]
//! struct Total {
//!     sum: i64,
//! }
//!
//! let registry = SliceRegistry::new();
//! let slice = SliceComposer::<Total, ()>::new(
//!     SliceDefinition::named("total")
//!         .with_initial_fields(Total::default())
//!         .with_transitions(Transitions::new().on("add", |t: Total, p| Total {
//!             sum: t.sum + p.as_i64().unwrap_or_default(),
//!         })),
//! )
//! .compose(&registry)?;
//!
//! let reducer = slice.reducer();
//! let once = reducer.reduce_state(slice.initial_state(), &Action::transition("total", "add", Some(json!(4))));
//! let reset = reducer.reduce_state(&once, &Action::reset("total"));
//! assert_eq!(once.fields.sum, 4);
//! assert_eq!(&reset, slice.initial_state());
//! # Ok::<(), slicekit_core::SliceError>(())
//! ```

use crate::action::{Action, ActionKind, Payload, RESET_STATE};
use crate::dispatch::{DispatchKey, DispatchTable};
use crate::effect::Effect;
use crate::error::SliceError;
use crate::operation::{AsyncOperation, CompiledOperation, OperationId};
use crate::reducer::Reducer;
use crate::registry::SliceRegistry;
use crate::selector::{ProjectionInput, Selector};
use crate::slice::{SliceDefinition, SliceFields, Transition};
use crate::status::OperationStatus;
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

static NO_PAYLOAD: Payload = Payload::Null;

/// Key the operation statuses serialize under, next to the caller fields
const OPERATIONS_KEY: &str = "operations";

/// The composed state of a slice: caller fields plus one status per async
/// operation.
///
/// Serializes as the caller fields flattened next to an `operations` object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SliceState<S> {
    /// Caller-owned fields
    #[serde(flatten)]
    pub fields: S,
    /// Status of each declared async operation
    pub operations: BTreeMap<String, OperationStatus>,
}

impl<S> SliceState<S> {
    /// Status of the operation `name`, if declared
    #[must_use]
    pub fn status(&self, name: &str) -> Option<OperationStatus> {
        self.operations.get(name).copied()
    }

    /// Whether any declared operation is running
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.operations.values().any(|s| s.is_loading())
    }

    fn map_status(mut self, name: &str, f: impl FnOnce(OperationStatus) -> OperationStatus) -> Self {
        if let Some(status) = self.operations.get_mut(name) {
            *status = f(*status);
        }
        self
    }

    fn map_fields(self, f: impl FnOnce(S) -> S) -> Self {
        Self {
            fields: f(self.fields),
            operations: self.operations,
        }
    }
}

struct SliceInner<S, E> {
    name: String,
    initial: SliceState<S>,
    transitions: HashMap<String, Transition<S>>,
    operations: HashMap<String, CompiledOperation<S, E>>,
    extra: Option<ExtraReducer<S>>,
}

/// The composed reducer of one slice.
///
/// Holds the merged transition table: caller transitions, `resetState`, and
/// start/success/fail for each async operation. Clones share the table.
pub struct SliceReducer<S, E> {
    inner: Arc<SliceInner<S, E>>,
}

impl<S, E> Clone for SliceReducer<S, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, E> std::fmt::Debug for SliceReducer<S, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SliceReducer")
            .field("slice", &self.inner.name)
            .field("transitions", &self.inner.transitions.keys().collect::<Vec<_>>())
            .field("operations", &self.inner.operations.keys().collect::<Vec<_>>())
            .field("extra", &self.inner.extra.is_some())
            .finish()
    }
}

impl<S: SliceFields, E> SliceReducer<S, E> {
    /// Name of the slice this reducer owns
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The originally computed initial state
    #[must_use]
    pub fn initial_state(&self) -> &SliceState<S> {
        &self.inner.initial
    }

    /// Whether this slice reacts to actions owned by other slices
    #[must_use]
    pub fn has_extra_reducer(&self) -> bool {
        self.inner.extra.is_some()
    }

    /// Whether this reducer has a transition for `action`
    ///
    /// Only the slice's own actions count; the extra reducer is not
    /// consulted.
    #[must_use]
    pub fn handles(&self, action: &Action) -> bool {
        if action.slice() != self.inner.name {
            return false;
        }
        match action.kind() {
            ActionKind::Transition(name) => self.inner.transitions.contains_key(name),
            ActionKind::Reset => true,
            ActionKind::Pending(op) | ActionKind::Fulfilled(op) | ActionKind::Rejected(op) => {
                self.inner.operations.contains_key(op)
            },
        }
    }

    /// Pure transition function.
    ///
    /// Returns the next state without touching `state`. Actions this slice
    /// does not handle yield an equal copy.
    #[must_use]
    pub fn reduce_state(&self, state: &SliceState<S>, action: &Action) -> SliceState<S> {
        self.apply(state, action).unwrap_or_else(|| state.clone())
    }

    /// Apply `action`, or `None` if this slice does not handle it
    fn apply(&self, state: &SliceState<S>, action: &Action) -> Option<SliceState<S>> {
        if action.slice() != self.inner.name {
            let extra = self.inner.extra.as_ref()?;
            let fields = extra(&state.fields, action)?;
            return Some(SliceState {
                fields,
                operations: state.operations.clone(),
            });
        }
        let payload = action.payload.as_ref().unwrap_or(&NO_PAYLOAD);

        let next = match action.kind() {
            ActionKind::Transition(name) => {
                let transition = self.inner.transitions.get(name)?;
                state.clone().map_fields(|fields| transition(fields, payload))
            },
            ActionKind::Reset => self.inner.initial.clone(),
            ActionKind::Pending(op) => {
                let operation = self.inner.operations.get(op)?;
                state
                    .clone()
                    .map_status(op, OperationStatus::start)
                    .map_fields(|fields| operation.start(fields))
            },
            ActionKind::Fulfilled(op) => {
                let operation = self.inner.operations.get(op)?;
                state
                    .clone()
                    .map_status(op, OperationStatus::succeed)
                    .map_fields(|fields| operation.succeed(fields, payload))
            },
            ActionKind::Rejected(op) => {
                let operation = self.inner.operations.get(op)?;
                state
                    .clone()
                    .map_status(op, OperationStatus::fail)
                    .map_fields(|fields| operation.fail(fields))
            },
        };
        Some(next)
    }

    /// Apply `action` and describe the async work it starts.
    ///
    /// Returns `None` when this slice does not handle the action. Actions of
    /// other slices accepted by the extra reducer never start work here.
    pub fn step(
        &self,
        state: &SliceState<S>,
        action: Action,
        env: &E,
    ) -> Option<(SliceState<S>, SmallVec<[Effect<Action>; 4]>)> {
        let next = self.apply(state, &action)?;
        let own = action.slice() == self.inner.name;
        let Action {
            action_type,
            payload,
        } = action;

        let effects = match (&action_type.kind, payload) {
            (ActionKind::Pending(op), input) if own => match self.inner.operations.get(op) {
                Some(operation) => smallvec![operation.run(env, input.unwrap_or(Payload::Null))],
                None => smallvec![Effect::None],
            },
            _ => smallvec![Effect::None],
        };
        Some((next, effects))
    }
}

impl<S: SliceFields, E> Reducer for SliceReducer<S, E> {
    type State = SliceState<S>;
    type Action = Action;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match self.step(state, action, env) {
            Some((next, effects)) => {
                *state = next;
                effects
            },
            None => {
                tracing::trace!(slice = %self.inner.name, "Ignoring unhandled action");
                smallvec![Effect::None]
            },
        }
    }
}

/// A projection replacing the default props shape.
pub type Projection<S> = Arc<dyn Fn(ProjectionInput<'_, S>) -> Payload + Send + Sync>;

/// Reaction to actions owned by other slices: the next fields, or `None`
/// when the action is of no interest.
pub type ExtraReducer<S> = Arc<dyn Fn(&S, &Action) -> Option<S> + Send + Sync>;

/// Factory for composed slices.
///
/// See the [module documentation](self) for an example.
pub struct SliceComposer<S, E> {
    definition: SliceDefinition<S>,
    operations: Vec<AsyncOperation<S, E>>,
    projection: Option<Projection<S>>,
    extra: Option<ExtraReducer<S>>,
}

impl<S: SliceFields, E> SliceComposer<S, E> {
    /// Start composing `definition`
    #[must_use]
    pub const fn new(definition: SliceDefinition<S>) -> Self {
        Self {
            definition,
            operations: Vec::new(),
            projection: None,
            extra: None,
        }
    }

    /// Declare an async operation
    #[must_use]
    pub fn operation(mut self, operation: AsyncOperation<S, E>) -> Self {
        self.operations.push(operation);
        self
    }

    /// Replace the default projection
    #[must_use]
    pub fn projection<F>(mut self, projection: F) -> Self
    where
        F: Fn(ProjectionInput<'_, S>) -> Payload + Send + Sync + 'static,
    {
        self.projection = Some(Arc::new(projection));
        self
    }

    /// React to actions owned by other slices
    ///
    /// `reducer` sees every action whose slice is not this one and returns
    /// the next fields, or `None` to leave the state untouched. Statuses are
    /// never changed by it, and it does not see this slice's own actions.
    ///
    /// ```
    /// use serde::Serialize;
    /// use slicekit_core::{Action, ActionKind, SliceComposer, SliceDefinition, SliceRegistry, Transitions};
    ///
    /// #[derive(Clone, Debug, Default, Serialize)]
    /// struct Audit {
    ///     increments: u32,
    /// }
    ///
    /// let audit = SliceComposer::<Audit, ()>::new(
    ///     SliceDefinition::named("audit")
    ///         .with_initial_fields(Audit::default())
    ///         .with_transitions(Transitions::new()),
    /// )
    /// .extra_reducer(|audit: &Audit, action: &Action| {
    ///     matches!(action.kind(), ActionKind::Transition(name) if name == "increment").then(|| Audit {
    ///         increments: audit.increments + 1,
    ///     })
    /// })
    /// .compose(&SliceRegistry::new())?;
    ///
    /// let next = audit
    ///     .reducer()
    ///     .reduce_state(audit.initial_state(), &Action::transition("counter", "increment", None));
    /// assert_eq!(next.fields.increments, 1);
    /// # Ok::<(), slicekit_core::SliceError>(())
    /// ```
    #[must_use]
    pub fn extra_reducer<F>(mut self, reducer: F) -> Self
    where
        F: Fn(&S, &Action) -> Option<S> + Send + Sync + 'static,
    {
        self.extra = Some(Arc::new(reducer));
        self
    }

    /// Validate, register and build the slice.
    ///
    /// All validation happens before the name is claimed, so a rejected
    /// call leaves `registry` untouched.
    ///
    /// # Errors
    ///
    /// - [`SliceError::MissingSliceConfiguration`]: empty name, or initial
    ///   fields or transitions never supplied
    /// - [`SliceError::InvalidName`]: a name is empty or contains `/`
    /// - [`SliceError::InvalidFields`]: the initial fields do not serialize
    ///   to a map, or have a field named `operations`
    /// - [`SliceError::DuplicateDispatchName`]: a transition or operation
    ///   name repeats, or one is `resetState`
    /// - [`SliceError::DuplicateSliceName`]: the name is already registered
    pub fn compose(self, registry: &SliceRegistry) -> Result<ComposedSlice<S, E>, SliceError> {
        let SliceDefinition {
            name,
            initial_fields,
            transitions,
        } = self.definition;

        if name.is_empty() {
            return Err(SliceError::MissingSliceConfiguration("slice name"));
        }
        let fields =
            initial_fields.ok_or(SliceError::MissingSliceConfiguration("initial fields"))?;
        let transitions =
            transitions.ok_or(SliceError::MissingSliceConfiguration("transitions"))?;
        validate_name(&name)?;
        validate_fields(&name, &fields)?;

        let transitions = transitions.into_entries();
        let keys = dispatch_keys(
            transitions.iter().map(|(n, _)| n.as_str()),
            self.operations.iter().map(AsyncOperation::name),
        )?;

        registry.register(&name)?;

        let operations: HashMap<String, CompiledOperation<S, E>> = self
            .operations
            .into_iter()
            .map(|op| (op.name().to_string(), op.compile(&name)))
            .collect();
        let initial = SliceState {
            fields,
            operations: operations
                .keys()
                .map(|op| (op.clone(), OperationStatus::Idle))
                .collect(),
        };

        tracing::debug!(
            slice = %name,
            transitions = transitions.len(),
            operations = operations.len(),
            "Composed slice"
        );

        let reducer = SliceReducer {
            inner: Arc::new(SliceInner {
                name: name.clone(),
                initial,
                transitions: transitions.into_iter().collect(),
                operations,
                extra: self.extra,
            }),
        };

        Ok(ComposedSlice {
            dispatch: DispatchTable::new(name.clone(), keys),
            selector: Selector::new(name, self.projection),
            reducer,
        })
    }
}

fn validate_name(name: &str) -> Result<(), SliceError> {
    if name.is_empty() || name.contains('/') {
        return Err(SliceError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// The fields must serialize to a map that leaves room for the statuses.
fn validate_fields<S: SliceFields>(slice: &str, fields: &S) -> Result<(), SliceError> {
    let invalid = |message: String| SliceError::InvalidFields {
        slice: slice.to_string(),
        message,
    };
    match serde_json::to_value(fields) {
        Ok(Payload::Object(map)) if map.contains_key(OPERATIONS_KEY) => Err(invalid(format!(
            "the field name {OPERATIONS_KEY:?} is reserved for operation statuses"
        ))),
        Ok(Payload::Object(_)) => Ok(()),
        Ok(other) => Err(invalid(format!(
            "fields must serialize to a map, got {}",
            kind_of(&other)
        ))),
        Err(e) => Err(invalid(e.to_string())),
    }
}

const fn kind_of(value: &Payload) -> &'static str {
    match value {
        Payload::Null => "null",
        Payload::Bool(_) => "a boolean",
        Payload::Number(_) => "a number",
        Payload::String(_) => "a string",
        Payload::Array(_) => "a sequence",
        Payload::Object(_) => "a map",
    }
}

/// Build the dispatch keys, rejecting any repeated externally visible name.
fn dispatch_keys<'a>(
    transitions: impl Iterator<Item = &'a str>,
    operations: impl Iterator<Item = &'a str>,
) -> Result<BTreeMap<String, DispatchKey>, SliceError> {
    let mut keys = BTreeMap::new();
    keys.insert(RESET_STATE.to_string(), DispatchKey::Reset);

    let declared = transitions
        .map(|n| (n, DispatchKey::Transition(n.to_string())))
        .chain(operations.map(|n| (n, DispatchKey::Operation(n.to_string()))));

    for (name, key) in declared {
        validate_name(name)?;
        if keys.insert(name.to_string(), key).is_some() {
            return Err(SliceError::DuplicateDispatchName(name.to_string()));
        }
    }
    Ok(keys)
}

/// A fully wired slice: initial state, reducer, dispatch table and selector.
pub struct ComposedSlice<S, E> {
    reducer: SliceReducer<S, E>,
    dispatch: DispatchTable,
    selector: Selector<S>,
}

impl<S: SliceFields, E> ComposedSlice<S, E> {
    /// The slice name
    #[must_use]
    pub fn name(&self) -> &str {
        self.reducer.name()
    }

    /// The originally computed initial state
    #[must_use]
    pub fn initial_state(&self) -> &SliceState<S> {
        self.reducer.initial_state()
    }

    /// The composed reducer
    #[must_use]
    pub fn reducer(&self) -> SliceReducer<S, E> {
        self.reducer.clone()
    }

    /// Action creators for every transition and operation
    #[must_use]
    pub const fn dispatch_table(&self) -> &DispatchTable {
        &self.dispatch
    }

    /// The read path
    #[must_use]
    pub const fn selector(&self) -> &Selector<S> {
        &self.selector
    }

    /// Identifiers of the declared async operations, sorted
    #[must_use]
    pub fn operation_ids(&self) -> Vec<OperationId> {
        let mut ids: Vec<OperationId> = self
            .reducer
            .inner
            .operations
            .values()
            .map(|op| op.id().clone())
            .collect();
        ids.sort();
        ids
    }
}

impl<S, E> std::fmt::Debug for ComposedSlice<S, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposedSlice")
            .field("reducer", &self.reducer)
            .field("dispatch", &self.dispatch)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OperationError;
    use crate::slice::Transitions;
    use proptest::prelude::*;
    use serde_json::json;

    #[derive(Clone, Debug, Default, PartialEq, Serialize)]
    struct Counter {
        value: i64,
    }

    fn counter_transitions() -> Transitions<Counter> {
        Transitions::new()
            .on("increment", |s: Counter, _| Counter { value: s.value + 1 })
            .on("decrement", |s: Counter, _| Counter { value: s.value - 1 })
            .on("incrementByAmount", |s: Counter, p: &Payload| match p.as_i64() {
                Some(n) => Counter { value: s.value + n },
                None => s,
            })
    }

    fn increment_async() -> AsyncOperation<Counter, ()> {
        AsyncOperation::new(
            "incrementAsync",
            |_env: &(), amount| Box::pin(async move { Ok(amount) }),
            |s: Counter, result| Counter {
                value: s.value + result.as_i64().unwrap_or_default(),
            },
        )
    }

    fn compose_counter(registry: &SliceRegistry) -> Result<ComposedSlice<Counter, ()>, SliceError> {
        SliceComposer::new(
            SliceDefinition::named("counter")
                .with_initial_fields(Counter::default())
                .with_transitions(counter_transitions()),
        )
        .operation(increment_async())
        .compose(registry)
    }

    #[test]
    fn test_initial_state_has_idle_operations() -> Result<(), SliceError> {
        let slice = compose_counter(&SliceRegistry::new())?;
        let state = slice.initial_state();

        assert_eq!(state.fields, Counter { value: 0 });
        assert_eq!(state.status("incrementAsync"), Some(OperationStatus::Idle));
        assert_eq!(state.operations.len(), 1);
        Ok(())
    }

    #[test]
    fn test_missing_configuration() {
        let registry = SliceRegistry::new();

        let unnamed = SliceComposer::<Counter, ()>::new(
            SliceDefinition::named("")
                .with_initial_fields(Counter::default())
                .with_transitions(Transitions::new()),
        )
        .compose(&registry);
        assert_eq!(
            unnamed.err(),
            Some(SliceError::MissingSliceConfiguration("slice name"))
        );

        let no_fields = SliceComposer::<Counter, ()>::new(
            SliceDefinition::named("a").with_transitions(Transitions::new()),
        )
        .compose(&registry);
        assert_eq!(
            no_fields.err(),
            Some(SliceError::MissingSliceConfiguration("initial fields"))
        );

        let no_transitions = SliceComposer::<Counter, ()>::new(
            SliceDefinition::named("b").with_initial_fields(Counter::default()),
        )
        .compose(&registry);
        assert_eq!(
            no_transitions.err(),
            Some(SliceError::MissingSliceConfiguration("transitions"))
        );

        assert!(registry.is_empty());
    }

    #[test]
    fn test_empty_transition_map_is_valid() -> Result<(), SliceError> {
        let slice = SliceComposer::<Counter, ()>::new(
            SliceDefinition::named("bare")
                .with_initial_fields(Counter::default())
                .with_transitions(Transitions::new()),
        )
        .compose(&SliceRegistry::new())?;

        assert_eq!(slice.dispatch_table().names(), vec!["resetState"]);
        Ok(())
    }

    #[test]
    fn test_duplicate_slice_name() -> Result<(), SliceError> {
        let registry = SliceRegistry::new();
        compose_counter(&registry)?;

        assert_eq!(
            compose_counter(&registry).err(),
            Some(SliceError::DuplicateSliceName("counter".to_string()))
        );
        Ok(())
    }

    #[test]
    fn test_duplicate_operation_names() {
        let registry = SliceRegistry::new();
        let result = SliceComposer::new(
            SliceDefinition::named("loader")
                .with_initial_fields(Counter::default())
                .with_transitions(Transitions::new()),
        )
        .operation(AsyncOperation::new(
            "load",
            |_env: &(), i| Box::pin(async move { Ok(i) }),
            |s, _| s,
        ))
        .operation(AsyncOperation::new(
            "load",
            |_env: &(), i| Box::pin(async move { Ok(i) }),
            |s, _| s,
        ))
        .compose(&registry);

        assert_eq!(
            result.err(),
            Some(SliceError::DuplicateDispatchName("load".to_string()))
        );
        assert!(!registry.contains("loader"));
    }

    #[test]
    fn test_transition_and_operation_share_name() {
        let registry = SliceRegistry::new();
        let result = SliceComposer::new(
            SliceDefinition::named("clash")
                .with_initial_fields(Counter::default())
                .with_transitions(Transitions::new().on("sync", |s: Counter, _| s)),
        )
        .operation(AsyncOperation::new(
            "sync",
            |_env: &(), i| Box::pin(async move { Ok(i) }),
            |s, _| s,
        ))
        .compose(&registry);

        assert_eq!(
            result.err(),
            Some(SliceError::DuplicateDispatchName("sync".to_string()))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reset_state_is_reserved() {
        let result = SliceComposer::<Counter, ()>::new(
            SliceDefinition::named("reserved")
                .with_initial_fields(Counter::default())
                .with_transitions(Transitions::new().on("resetState", |s: Counter, _| s)),
        )
        .compose(&SliceRegistry::new());

        assert_eq!(
            result.err(),
            Some(SliceError::DuplicateDispatchName("resetState".to_string()))
        );
    }

    #[test]
    fn test_invalid_names() {
        let slash_slice = SliceComposer::<Counter, ()>::new(
            SliceDefinition::named("a/b")
                .with_initial_fields(Counter::default())
                .with_transitions(Transitions::new()),
        )
        .compose(&SliceRegistry::new());
        assert_eq!(slash_slice.err(), Some(SliceError::InvalidName("a/b".to_string())));

        let slash_transition = SliceComposer::<Counter, ()>::new(
            SliceDefinition::named("ok")
                .with_initial_fields(Counter::default())
                .with_transitions(Transitions::new().on("x/pending", |s: Counter, _| s)),
        )
        .compose(&SliceRegistry::new());
        assert_eq!(
            slash_transition.err(),
            Some(SliceError::InvalidName("x/pending".to_string()))
        );
    }

    #[test]
    fn test_non_map_fields_are_rejected() {
        let registry = SliceRegistry::new();

        let scalar = SliceComposer::<i64, ()>::new(
            SliceDefinition::named("total")
                .with_initial_fields(0)
                .with_transitions(Transitions::new()),
        )
        .compose(&registry);
        assert!(matches!(
            scalar.err(),
            Some(SliceError::InvalidFields { slice, message })
                if slice == "total" && message.contains("a number")
        ));

        let sequence = SliceComposer::<Vec<String>, ()>::new(
            SliceDefinition::named("labels")
                .with_initial_fields(Vec::new())
                .with_transitions(Transitions::new()),
        )
        .compose(&registry);
        assert!(matches!(
            sequence.err(),
            Some(SliceError::InvalidFields { slice, message })
                if slice == "labels" && message.contains("a sequence")
        ));

        assert!(registry.is_empty());
    }

    #[test]
    fn test_operations_field_is_reserved() {
        #[derive(Clone, Debug, Serialize)]
        struct Shadowing {
            operations: u32,
        }

        let registry = SliceRegistry::new();
        let result = SliceComposer::<Shadowing, ()>::new(
            SliceDefinition::named("shadow")
                .with_initial_fields(Shadowing { operations: 0 })
                .with_transitions(Transitions::new()),
        )
        .compose(&registry);

        assert!(matches!(
            result.err(),
            Some(SliceError::InvalidFields { slice, message })
                if slice == "shadow" && message.contains("operations")
        ));
        assert!(!registry.contains("shadow"));
    }

    #[derive(Clone, Debug, Default, PartialEq, Serialize)]
    struct Audit {
        increments: u32,
    }

    fn compose_audit(registry: &SliceRegistry) -> Result<ComposedSlice<Audit, ()>, SliceError> {
        SliceComposer::new(
            SliceDefinition::named("audit")
                .with_initial_fields(Audit::default())
                .with_transitions(Transitions::new()),
        )
        .operation(AsyncOperation::new(
            "incrementAsync",
            |_env: &(), i| Box::pin(async move { Ok(i) }),
            |s: Audit, _| s,
        ))
        .extra_reducer(|audit: &Audit, action: &Action| match action.kind() {
            ActionKind::Transition(name) if name == "increment" => Some(Audit {
                increments: audit.increments + 1,
            }),
            _ => None,
        })
        .compose(registry)
    }

    #[test]
    fn test_extra_reducer_sees_foreign_actions() -> Result<(), SliceError> {
        let slice = compose_audit(&SliceRegistry::new())?;
        let reducer = slice.reducer();
        let increment = Action::transition("counter", "increment", None);

        assert!(reducer.has_extra_reducer());
        assert!(!reducer.handles(&increment));
        let once = reducer.reduce_state(slice.initial_state(), &increment);
        let twice = reducer.reduce_state(&once, &increment);
        assert_eq!(twice.fields.increments, 2);
        assert_eq!(twice.operations, slice.initial_state().operations);

        let ignored = reducer.reduce_state(&twice, &Action::transition("counter", "decrement", None));
        assert_eq!(ignored, twice);

        // Own actions never reach the extra reducer
        let own = reducer.reduce_state(&twice, &Action::transition("audit", "increment", None));
        assert_eq!(own, twice);
        Ok(())
    }

    #[test]
    fn test_foreign_pending_never_starts_own_operation() -> Result<(), Box<dyn std::error::Error>> {
        let slice = SliceComposer::new(
            SliceDefinition::named("audit")
                .with_initial_fields(Audit::default())
                .with_transitions(Transitions::new()),
        )
        .operation(AsyncOperation::new(
            "incrementAsync",
            |_env: &(), i| Box::pin(async move { Ok(i) }),
            |s: Audit, _| s,
        ))
        .extra_reducer(|audit: &Audit, action: &Action| {
            matches!(action.kind(), ActionKind::Pending(_)).then(|| Audit {
                increments: audit.increments + 1,
            })
        })
        .compose(&SliceRegistry::new())?;

        let (next, effects) = slice
            .reducer()
            .step(
                slice.initial_state(),
                Action::pending("counter", "incrementAsync", json!(1)),
                &(),
            )
            .ok_or("audit ignored the foreign pending action")?;

        assert_eq!(next.fields.increments, 1);
        assert_eq!(next.status("incrementAsync"), Some(OperationStatus::Idle));
        assert!(matches!(effects.as_slice(), [Effect::None]));
        Ok(())
    }

    #[test]
    fn test_sync_transitions() -> Result<(), SliceError> {
        let slice = compose_counter(&SliceRegistry::new())?;
        let reducer = slice.reducer();

        let state = reducer.reduce_state(
            slice.initial_state(),
            &Action::transition("counter", "increment", None),
        );
        let state = reducer.reduce_state(
            &state,
            &Action::transition("counter", "incrementByAmount", Some(json!(2))),
        );
        assert_eq!(state.fields.value, 3);

        let state = reducer.reduce_state(&state, &Action::transition("counter", "decrement", None));
        assert_eq!(state.fields.value, 2);
        Ok(())
    }

    #[test]
    fn test_async_lifecycle_transitions() -> Result<(), SliceError> {
        let slice = compose_counter(&SliceRegistry::new())?;
        let reducer = slice.reducer();
        let mut given = slice.initial_state().clone();
        given.fields.value = 3;

        let loading =
            reducer.reduce_state(&given, &Action::pending("counter", "incrementAsync", json!(2)));
        assert_eq!(loading.fields.value, 3);
        assert_eq!(loading.status("incrementAsync"), Some(OperationStatus::Loading));
        assert!(loading.is_loading());

        let done =
            reducer.reduce_state(&loading, &Action::fulfilled("counter", "incrementAsync", json!(2)));
        assert_eq!(done.fields.value, 5);
        assert_eq!(done.status("incrementAsync"), Some(OperationStatus::Idle));

        let failed = reducer.reduce_state(&loading, &Action::rejected("counter", "incrementAsync"));
        assert_eq!(failed.fields.value, 3);
        assert_eq!(failed.status("incrementAsync"), Some(OperationStatus::Failed));
        Ok(())
    }

    #[test]
    fn test_hooks_run_with_their_phase() -> Result<(), SliceError> {
        let slice = SliceComposer::new(
            SliceDefinition::named("hooks")
                .with_initial_fields(Counter::default())
                .with_transitions(Transitions::new()),
        )
        .operation(
            AsyncOperation::new(
                "load",
                |_env: &(), _| Box::pin(async { Err(OperationError::new("offline")) }),
                |s: Counter, _| s,
            )
            .on_start(|_| Counter { value: 100 })
            .on_error(|_| Counter { value: -1 }),
        )
        .compose(&SliceRegistry::new())?;
        let reducer = slice.reducer();

        let started =
            reducer.reduce_state(slice.initial_state(), &Action::pending("hooks", "load", json!(null)));
        assert_eq!(started.fields.value, 100);

        let failed = reducer.reduce_state(&started, &Action::rejected("hooks", "load"));
        assert_eq!(failed.fields.value, -1);
        Ok(())
    }

    #[test]
    fn test_reset_restores_initial_state() -> Result<(), SliceError> {
        let slice = compose_counter(&SliceRegistry::new())?;
        let reducer = slice.reducer();

        let dirty = reducer.reduce_state(
            slice.initial_state(),
            &Action::transition("counter", "incrementByAmount", Some(json!(9))),
        );
        let dirty = reducer.reduce_state(&dirty, &Action::rejected("counter", "incrementAsync"));

        assert_eq!(
            &reducer.reduce_state(&dirty, &Action::reset("counter")),
            slice.initial_state()
        );
        Ok(())
    }

    #[test]
    fn test_foreign_and_unknown_actions_are_ignored() -> Result<(), SliceError> {
        let slice = compose_counter(&SliceRegistry::new())?;
        let reducer = slice.reducer();
        let initial = slice.initial_state();

        for action in [
            Action::transition("other", "increment", None),
            Action::transition("counter", "explode", None),
            Action::pending("counter", "unknownAsync", json!(1)),
        ] {
            assert!(!reducer.handles(&action));
            assert_eq!(&reducer.reduce_state(initial, &action), initial);
        }
        Ok(())
    }

    #[test]
    fn test_reduce_describes_trigger_only_for_pending() -> Result<(), SliceError> {
        let slice = compose_counter(&SliceRegistry::new())?;
        let reducer = slice.reducer();
        let mut state = slice.initial_state().clone();

        let effects = reducer.reduce(
            &mut state,
            Action::pending("counter", "incrementAsync", json!(2)),
            &(),
        );
        assert!(matches!(effects.as_slice(), [Effect::Future(_)]));
        assert!(state.is_loading());

        let effects = reducer.reduce(&mut state, Action::transition("counter", "increment", None), &());
        assert!(matches!(effects.as_slice(), [Effect::None]));
        Ok(())
    }

    #[test]
    fn test_serialized_shape() -> Result<(), Box<dyn std::error::Error>> {
        let slice = compose_counter(&SliceRegistry::new())?;
        assert_eq!(
            serde_json::to_value(slice.initial_state())?,
            json!({
                "value": 0,
                "operations": {
                    "incrementAsync": {"isLoading": false, "isIdle": true, "hasError": false}
                }
            })
        );
        Ok(())
    }

    fn any_counter_action() -> impl Strategy<Value = Action> {
        prop_oneof![
            Just(Action::transition("counter", "increment", None)),
            Just(Action::transition("counter", "decrement", None)),
            (-100i64..100).prop_map(|n| Action::transition(
                "counter",
                "incrementByAmount",
                Some(json!(n))
            )),
            Just(Action::pending("counter", "incrementAsync", json!(1))),
            (-100i64..100).prop_map(|n| Action::fulfilled("counter", "incrementAsync", json!(n))),
            Just(Action::rejected("counter", "incrementAsync")),
            Just(Action::reset("counter")),
        ]
    }

    proptest! {
        #[test]
        fn prop_reducer_is_pure(actions in prop::collection::vec(any_counter_action(), 0..32)) {
            let slice = compose_counter(&SliceRegistry::new())
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            let reducer = slice.reducer();

            let mut state = slice.initial_state().clone();
            for action in &actions {
                let before = state.clone();
                let first = reducer.reduce_state(&state, action);
                let second = reducer.reduce_state(&state, action);
                prop_assert_eq!(&first, &second);
                prop_assert_eq!(&state, &before);
                state = first;
            }

            let reset = reducer.reduce_state(&state, &Action::reset("counter"));
            prop_assert_eq!(&reset, slice.initial_state());
        }

        #[test]
        fn prop_pending_always_loads(actions in prop::collection::vec(any_counter_action(), 0..16)) {
            let slice = compose_counter(&SliceRegistry::new())
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            let reducer = slice.reducer();

            let state = actions
                .iter()
                .fold(slice.initial_state().clone(), |s, a| reducer.reduce_state(&s, a));
            let started =
                reducer.reduce_state(&state, &Action::pending("counter", "incrementAsync", json!(0)));
            prop_assert_eq!(started.status("incrementAsync"), Some(OperationStatus::Loading));
        }
    }
}
