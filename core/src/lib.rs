//! # Slicekit Core
//!
//! Composable state slices for unidirectional state management.
//!
//! A slice is an independently named fragment of application state. Given a
//! declarative description of its synchronous transitions and asynchronous
//! operations, this crate produces a fully wired fragment:
//!
//! - **Initial state**: caller fields plus one [`OperationStatus`] per async operation
//! - **Reducer**: a pure transition function over [`SliceState`], merging caller
//!   transitions with the generated start/success/fail lifecycle transitions
//! - **Dispatch table**: one action creator per transition and per operation
//! - **Selector**: projects full process state plus own parameters into props
//!
//! ## Core Concepts
//!
//! - **State**: [`SliceState`] owned by a store, replaced (never mutated) per action
//! - **Action**: [`Action`], a typed action identifier plus an optional payload
//! - **Reducer**: `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: description of asynchronous work whose outcome is fed back as an action
//! - **Environment**: injected collaborators, e.g. an [`environment::Transport`]
//!
//! ## Example
//!
//! ```
//! use slicekit_core::{
//!     AsyncOperation, Payload, SliceComposer, SliceDefinition, SliceRegistry, Transitions,
//! };
//! use serde::Serialize;
//!
//! #[derive(Clone, Debug, Default, Serialize)]
//! struct Counter {
//!     value: i64,
//! }
//!
//! let registry = SliceRegistry::new();
//! let definition = SliceDefinition::named("counter")
//!     .with_initial_fields(Counter::default())
//!     .with_transitions(
//!         Transitions::new().on("increment", |s: Counter, _| Counter { value: s.value + 1 }),
//!     );
//!
//! let slice = SliceComposer::<Counter, ()>::new(definition)
//!     .operation(AsyncOperation::new(
//!         "incrementAsync",
//!         |_env: &(), amount: Payload| Box::pin(async move { Ok(amount) }),
//!         |s: Counter, result: &Payload| Counter {
//!             value: s.value + result.as_i64().unwrap_or_default(),
//!         },
//!     ))
//!     .compose(&registry)?;
//!
//! let action = slice.dispatch_table().action("increment", None)?;
//! let next = slice.reducer().reduce_state(slice.initial_state(), &action);
//! assert_eq!(next.fields.value, 1);
//! assert!(next.status("incrementAsync").is_some_and(|s| s.is_idle()));
//! # Ok::<(), slicekit_core::SliceError>(())
//! ```

/// Action wire model and typed action identifiers
pub mod action;

/// Root composition of several slices into one process-wide state
pub mod composition;

/// Construction of composed slices (initial state and reducer)
pub mod compose;

/// Dispatch tables mapping externally visible names to actions
pub mod dispatch;

/// Error types
pub mod error;

/// Asynchronous operation definitions and their compiled lifecycle
pub mod operation;

/// Process-wide slice name registry
pub mod registry;

/// Read-side projections
pub mod selector;

/// Slice definitions supplied by callers
pub mod slice;

/// Operation status state machine
pub mod status;

pub use action::{Action, ActionKind, ActionType, Payload};
pub use composition::{RootReducer, RootState};
pub use compose::{ComposedSlice, ExtraReducer, SliceComposer, SliceReducer, SliceState};
pub use dispatch::{DispatchKey, DispatchTable};
pub use error::{OperationError, SliceError};
pub use operation::{AsyncOperation, CompiledOperation, OperationId};
pub use registry::SliceRegistry;
pub use selector::{ProjectionInput, Selector};
pub use slice::{SliceDefinition, SliceFields, Transitions};
pub use status::{OperationStatus, StatusFlags};

// Re-export commonly used types
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

/// Reducer module - The core trait for state transitions
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all transition logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for state transitions
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for SliceReducer<Counter, CounterEnvironment> {
    ///     type State = SliceState<Counter>;
    ///     type Action = Action;
    ///     type Environment = CounterEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut SliceState<Counter>,
    ///         action: Action,
    ///         env: &CounterEnvironment,
    ///     ) -> SmallVec<[Effect<Action>; 4]> {
    ///         // apply the transition, describe async work
    ///         smallvec![Effect::None]
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into a state change and effects
        ///
        /// # Arguments
        ///
        /// - `state`: Mutable reference to the store-owned state slot
        /// - `action`: The action to process
        /// - `env`: Reference to injected dependencies
        ///
        /// # Returns
        ///
        /// Effects to be executed by the runtime
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe asynchronous work to be performed by the runtime.
/// They are values (not execution).
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Whether this effect does no work
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Environment module - Dependency injection traits
///
/// External collaborators are abstracted behind traits and injected
/// via the Environment parameter of a reducer.
pub mod environment {
    use crate::action::Payload;
    use crate::error::OperationError;
    use futures::future::BoxFuture;

    /// Transport trait - resolves the result of an asynchronous operation
    ///
    /// Slices never perform I/O themselves; an operation's trigger hands its
    /// input to a transport held in the environment.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::future::BoxFuture;
    /// use slicekit_core::environment::Transport;
    /// use slicekit_core::{OperationError, Payload};
    ///
    /// // Echoes the input back as the result
    /// struct Echo;
    ///
    /// impl Transport for Echo {
    ///     fn call(
    ///         &self,
    ///         _operation: &str,
    ///         input: Payload,
    ///     ) -> BoxFuture<'static, Result<Payload, OperationError>> {
    ///         Box::pin(async move { Ok(input) })
    ///     }
    /// }
    /// ```
    pub trait Transport: Send + Sync {
        /// Resolve `input` for the named operation
        fn call(
            &self,
            operation: &str,
            input: Payload,
        ) -> BoxFuture<'static, Result<Payload, OperationError>>;
    }
}
