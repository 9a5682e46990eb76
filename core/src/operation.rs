//! Asynchronous operations ("thunks") and their three-phase lifecycle.
//!
//! An [`AsyncOperation`] is what a caller declares: a trigger that resolves
//! a result, a mandatory success hook and optional start/error hooks.
//! Composition compiles it into a [`CompiledOperation`] bound to its slice,
//! which owns the status bookkeeping and turns one invocation into:
//!
//! 1. the start transition, applied synchronously with the pending action
//! 2. an [`Effect::Future`] running the trigger
//! 3. exactly one of the fulfilled (with result) or rejected (no payload) actions

use crate::action::{Action, Payload};
use crate::effect::Effect;
use crate::error::OperationError;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// Runs an operation: receives the environment and the caller's input.
pub type Trigger<E> =
    Arc<dyn Fn(&E, Payload) -> BoxFuture<'static, Result<Payload, OperationError>> + Send + Sync>;

/// Hook run on start or on failure.
pub type Hook<S> = Arc<dyn Fn(S) -> S + Send + Sync>;

/// Hook run on success with the operation result.
pub type SuccessHook<S> = Arc<dyn Fn(S, &Payload) -> S + Send + Sync>;

/// Identifier of an operation, displayed as `<slice>/<operation>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId {
    /// Owning slice
    pub slice: String,
    /// Operation name, unique within the slice
    pub operation: String,
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.slice, self.operation)
    }
}

/// Declaration of an asynchronous operation.
///
/// # Example
///
/// ```
/// use slicekit_core::{AsyncOperation, Payload};
///
/// #[derive(Clone, Debug, Default)]
/// struct Inbox {
///     items: Vec<String>,
/// }
///
/// let load = AsyncOperation::<Inbox, ()>::new(
///     "load",
///     |_env, _input| Box::pin(async { Ok(Payload::from("item")) }),
///     |mut inbox, result| {
///         inbox.items.extend(result.as_str().map(str::to_string));
///         inbox
///     },
/// )
/// .on_error(|_| Inbox::default());
/// assert_eq!(load.name(), "load");
/// ```
pub struct AsyncOperation<S, E> {
    name: String,
    trigger: Trigger<E>,
    on_start: Option<Hook<S>>,
    on_success: SuccessHook<S>,
    on_error: Option<Hook<S>>,
}

impl<S, E> AsyncOperation<S, E> {
    /// Declare an operation with its trigger and success hook
    #[must_use]
    pub fn new<T, F>(name: impl Into<String>, trigger: T, on_success: F) -> Self
    where
        T: Fn(&E, Payload) -> BoxFuture<'static, Result<Payload, OperationError>>
            + Send
            + Sync
            + 'static,
        F: Fn(S, &Payload) -> S + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            trigger: Arc::new(trigger),
            on_start: None,
            on_success: Arc::new(on_success),
            on_error: None,
        }
    }

    /// Run `hook` whenever the operation starts
    #[must_use]
    pub fn on_start<F>(mut self, hook: F) -> Self
    where
        F: Fn(S) -> S + Send + Sync + 'static,
    {
        self.on_start = Some(Arc::new(hook));
        self
    }

    /// Run `hook` whenever the operation fails
    #[must_use]
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(S) -> S + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// The operation name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn compile(self, slice: &str) -> CompiledOperation<S, E> {
        CompiledOperation {
            id: OperationId {
                slice: slice.to_string(),
                operation: self.name,
            },
            trigger: self.trigger,
            on_start: self.on_start,
            on_success: self.on_success,
            on_error: self.on_error,
        }
    }
}

impl<S, E> fmt::Debug for AsyncOperation<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncOperation")
            .field("name", &self.name)
            .field("on_start", &self.on_start.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}

/// An operation bound to its slice.
///
/// The lifecycle methods only touch the caller's fields through the hooks;
/// status bookkeeping is done by the composed reducer.
pub struct CompiledOperation<S, E> {
    id: OperationId,
    trigger: Trigger<E>,
    on_start: Option<Hook<S>>,
    on_success: SuccessHook<S>,
    on_error: Option<Hook<S>>,
}

impl<S, E> CompiledOperation<S, E> {
    /// The operation identifier
    #[must_use]
    pub const fn id(&self) -> &OperationId {
        &self.id
    }

    /// Apply the start hook, if any
    pub fn start(&self, fields: S) -> S {
        match &self.on_start {
            Some(hook) => hook(fields),
            None => fields,
        }
    }

    /// Apply the success hook
    pub fn succeed(&self, fields: S, result: &Payload) -> S {
        (self.on_success)(fields, result)
    }

    /// Apply the error hook, if any
    pub fn fail(&self, fields: S) -> S {
        match &self.on_error {
            Some(hook) => hook(fields),
            None => fields,
        }
    }

    /// Invoke the trigger and describe its settlement as an effect.
    ///
    /// The trigger is called immediately; the returned future is only
    /// polled once the runtime executes the effect.
    pub fn run(&self, env: &E, input: Payload) -> Effect<Action> {
        let pending = (self.trigger)(env, input);
        let id = self.id.clone();

        metrics::counter!("slice.operations.started", "operation" => id.to_string()).increment(1);
        tracing::debug!(operation = %id, "Operation started");

        Effect::Future(Box::pin(async move {
            match pending.await {
                Ok(result) => {
                    metrics::counter!("slice.operations.fulfilled", "operation" => id.to_string())
                        .increment(1);
                    tracing::debug!(operation = %id, "Operation fulfilled");
                    Some(Action::fulfilled(id.slice, id.operation, result))
                },
                Err(error) => {
                    metrics::counter!("slice.operations.rejected", "operation" => id.to_string())
                        .increment(1);
                    tracing::warn!(operation = %id, error = %error, "Operation rejected");
                    Some(Action::rejected(id.slice, id.operation))
                },
            }
        }))
    }
}

impl<S, E> fmt::Debug for CompiledOperation<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledOperation")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
