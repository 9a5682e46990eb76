//! # Slicekit Runtime
//!
//! Runtime for composed slices.
//!
//! This crate provides the Store that owns the process-wide state, applies
//! reducers and executes their effects, plus the bindings that connect a
//! slice's dispatch table and selector to a store.
//!
//! ## Core Components
//!
//! - **Store**: manages state and executes effects
//! - **Effect Executor**: runs effect descriptions and feeds resulting actions back to the reducer
//! - **Bindings**: [`BoundDispatch`] and [`Binding`], the consumer-facing surface of a slice
//!
//! ## Example
//!
//! ```
//! use serde::Serialize;
//! use slicekit_core::{RootReducer, SliceComposer, SliceDefinition, SliceRegistry, Transitions};
//! use slicekit_runtime::{Binding, Store};
//!
//! #[derive(Clone, Debug, Default, Serialize)]
//! struct Counter {
//!     value: i64,
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let slice = SliceComposer::<Counter, ()>::new(
//!     SliceDefinition::named("counter")
//!         .with_initial_fields(Counter::default())
//!         .with_transitions(
//!             Transitions::new().on("increment", |s: Counter, _| Counter { value: s.value + 1 }),
//!         ),
//! )
//! .compose(&SliceRegistry::new())?;
//!
//! let store = Store::mounted(RootReducer::new().mount(&slice)?, ());
//! let binding = Binding::new(store.clone(), &slice);
//!
//! binding.dispatches().call("increment", None).await?;
//! let props = binding.props(&serde_json::Value::Null).await?;
//! assert_eq!(props["value"], 1);
//! # Ok(())
//! # }
//! ```

use slicekit_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Consumer bindings of a slice to a store
pub mod binding;

/// Prometheus metrics for observability
pub mod metrics;

/// Error types for the Store runtime
pub mod error {
    use slicekit_core::SliceError;
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effects were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for terminal action
        ///
        /// Returned by `send_and_wait_for` when the timeout expires before
        /// a matching action is received.
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,

        /// A slice-level failure (unknown dispatch name, unmounted slice, ...)
        #[error(transparent)]
        Slice(#[from] SliceError),
    }
}

pub use binding::{Binding, BoundDispatch};
pub use error::StoreError;

use slicekit_core::{Action, RootReducer, RootState};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;

/// Configuration for Store instances
///
/// # Example
///
/// ```
/// use slicekit_runtime::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::default()
///     .with_broadcast_capacity(256)
///     .with_shutdown_timeout(Duration::from_secs(5));
/// assert_eq!(config.broadcast_capacity, 256);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Number of effect-produced actions buffered for observers
    pub broadcast_capacity: usize,
    /// Default timeout for graceful shutdown
    pub default_shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub const fn new(broadcast_capacity: usize, default_shutdown_timeout: Duration) -> Self {
        Self {
            broadcast_capacity,
            default_shutdown_timeout,
        }
    }

    /// Set the action broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.default_shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
            default_shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] to allow waiting for the effects of one
/// action to complete. An effect counts as complete once the action it
/// produced has been reduced, so after `wait()` the settlement of an async
/// operation is visible in the state.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(pending).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    /// Create a handle plus the tracking used internally by effect execution
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };
        let tracking = EffectTracking {
            counter,
            notifier: tx,
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (tx, rx) = watch::channel(());
        let _ = tx.send(());

        Self {
            effects: Arc::new(AtomicUsize::new(0)),
            completion: rx,
        }
    }

    /// Number of effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                // Every tracker is gone, so the counter cannot move anymore
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires before all
    /// effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: effect tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
}

impl EffectTracking {
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements the effect counter on drop
///
/// Ensures the counter is always decremented, even if the effect panics.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store module - The runtime for reducers
pub mod store {
    use super::{
        Action, Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, DecrementGuard, Duration,
        Effect, EffectHandle, EffectTracking, Ordering, Reducer, RootReducer, RootState, RwLock,
        StoreConfig, StoreError,
    };
    use tokio::sync::broadcast;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` for concurrent access)
    /// 2. Reducer (transition logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop)
    ///
    /// Reducer application is serialized by the write lock: concurrent
    /// `send` calls never observe a partially applied action.
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        default_shutdown_timeout: Duration,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        /// Observers of every action produced by an effect
        action_broadcast: broadcast::Sender<A>,
    }

    /// A store over the root state of mounted slices.
    pub type SliceStore<E> = Store<RootState, Action, E, RootReducer<E>>;

    impl<E> Store<RootState, Action, E, RootReducer<E>>
    where
        E: Send + Sync + 'static,
    {
        /// Create a store whose state is every mounted slice at its
        /// initial state
        #[must_use]
        pub fn mounted(reducer: RootReducer<E>, environment: E) -> Self {
            Self::mounted_with_config(reducer, environment, StoreConfig::default())
        }

        /// Like [`Store::mounted`], with custom configuration
        #[must_use]
        pub fn mounted_with_config(
            reducer: RootReducer<E>,
            environment: E,
            config: StoreConfig,
        ) -> Self {
            let initial_state = reducer.initial_state();
            Self::with_config(initial_state, reducer, environment, config)
        }
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// Uses [`StoreConfig::default`].
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a new Store with custom configuration
        ///
        /// # Example
        ///
        /// ```ignore
        /// let config = StoreConfig::default().with_broadcast_capacity(256);
        /// let store = Store::with_config(root.initial_state(), root, env, config);
        /// ```
        #[must_use]
        pub fn with_config(
            initial_state: S,
            reducer: R,
            environment: E,
            config: StoreConfig,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                default_shutdown_timeout: config.default_shutdown_timeout,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                action_broadcast,
            }
        }

        /// The environment effects run against
        #[must_use]
        pub const fn environment(&self) -> &E {
            &self.environment
        }

        /// Number of effects currently running across all actions
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.pending_effects.load(Ordering::Acquire)
        }

        /// Initiate graceful shutdown of the store
        ///
        /// Sets the shutdown flag (rejecting new actions), then waits for
        /// pending effects to complete.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(10);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    metrics::counter!("store.shutdown.completed").increment(1);
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(pending_effects = pending, "Shutdown timed out");
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tracing::debug!(
                    pending_effects = pending,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Waiting for effects to complete"
                );

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Shut down with the configured default timeout
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if effects are still
        /// running when the timeout expires.
        pub async fn shutdown_default(&self) -> Result<(), StoreError> {
            self.shutdown(self.default_shutdown_timeout).await
        }

        /// Send an action to the store
        ///
        /// 1. Acquires the write lock on state
        /// 2. Calls the reducer with (state, action, environment)
        /// 3. Spawns the returned effects
        /// 4. Actions produced by effects are reduced, then broadcast
        ///
        /// `send()` returns after starting effect execution, not completion;
        /// use the returned [`EffectHandle`] to wait.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError>
        where
            R: Clone,
            E: Clone,
        {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            tracing::debug!("Processing action");
            metrics::counter!("store.commands.total").increment(1);

            let (handle, tracking) = EffectHandle::new();

            let effects = {
                let mut state = self.state.write().await;
                tracing::trace!("Acquired write lock on state");

                let span = tracing::debug_span!("reducer_execution");
                let _enter = span.enter();

                let start = std::time::Instant::now();
                let effects = self.reducer.reduce(&mut *state, action, &self.environment);
                metrics::histogram!("store.reducer.duration_seconds")
                    .record(start.elapsed().as_secs_f64());

                tracing::trace!("Reducer completed, returned {} effects", effects.len());
                effects
            };

            for effect in effects {
                self.execute_effect(effect, tracking.clone());
            }

            Ok(handle)
        }

        /// Send an action and wait for a matching action produced by its
        /// effects
        ///
        /// Subscribes to the action broadcast before sending, so a fast
        /// effect cannot slip past. The matching action has already been
        /// reduced when this returns.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: timeout expired before a matching action arrived
        /// - [`StoreError::ChannelClosed`]: the action broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: the store is shutting down
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            R: Clone,
            E: Clone,
            F: Fn(&A) -> bool,
        {
            let mut rx = self.action_broadcast.subscribe();

            self.send(action).await?;

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Action observer lagged");
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to every action produced by effects
        ///
        /// Each action is broadcast once it has been reduced, so the state
        /// read on receipt already reflects it. Actions sent directly via
        /// `send` are not broadcast.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let value = store.state(|s| s.slice::<Counter>("counter").map(|c| c.fields.value)).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Execute an effect with tracking
        ///
        /// A panicking effect is isolated in its task; the guards keep the
        /// counters correct.
        #[allow(clippy::needless_pass_by_value)] // tracking is cloned into the task
        fn execute_effect(&self, effect: Effect<A>, tracking: EffectTracking)
        where
            R: Clone,
            E: Clone,
        {
            match effect {
                Effect::None => {
                    tracing::trace!("Executing Effect::None (no-op)");
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    tracing::trace!("Executing Effect::Future");
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    tracking.increment();

                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = DecrementGuard(tracking);
                        let _pending_guard = pending_guard;

                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, sending to store");
                            store.feed_back(action).await;
                        } else {
                            tracing::trace!("Effect::Future completed with no action");
                        }
                    });
                },
            }
        }

        /// Reduce an action produced by an effect, then broadcast it
        ///
        /// Settlements of in-flight work are still applied while shutting
        /// down; only new actions from callers are rejected.
        async fn feed_back(&self, action: A)
        where
            R: Clone,
            E: Clone,
        {
            metrics::counter!("store.feedback.total").increment(1);
            let observed = action.clone();
            let effects = {
                let mut state = self.state.write().await;
                self.reducer.reduce(&mut *state, action, &self.environment)
            };
            // No receivers is fine
            let _ = self.action_broadcast.send(observed);

            let (mut handle, tracking) = EffectHandle::new();
            for effect in effects {
                self.execute_effect(effect, tracking.clone());
            }
            drop(tracking);
            handle.wait().await;
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                default_shutdown_timeout: self.default_shutdown_timeout,
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

pub use store::{SliceStore, Store};

#[cfg(test)]
#[allow(clippy::panic)] // Effects panic on purpose to check isolation
mod tests {
    use super::*;
    use serde::Serialize;
    use serde_json::json;
    use slicekit_core::{AsyncOperation, SliceComposer, SliceDefinition, SliceRegistry, Transitions};

    #[derive(Clone, Debug, Default, Serialize)]
    struct Tally {
        count: u32,
    }

    /// `bumpLater` settles after `input` milliseconds; `explode` panics on a
    /// null input and echoes anything else
    fn tally_store() -> Result<SliceStore<()>, StoreError> {
        let slice = SliceComposer::<Tally, ()>::new(
            SliceDefinition::named("tally")
                .with_initial_fields(Tally::default())
                .with_transitions(
                    Transitions::new().on("bump", |t: Tally, _| Tally { count: t.count + 1 }),
                ),
        )
        .operation(AsyncOperation::new(
            "bumpLater",
            |_env: &(), delay_ms| {
                Box::pin(async move {
                    let delay = delay_ms.as_u64().unwrap_or_default();
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    Ok(delay_ms)
                })
            },
            |t: Tally, _| Tally { count: t.count + 1 },
        ))
        .operation(AsyncOperation::new(
            "explode",
            |_env: &(), input| {
                Box::pin(async move {
                    if input.is_null() {
                        panic!("operation blew up");
                    }
                    Ok(input)
                })
            },
            |t: Tally, _| t,
        ))
        .compose(&SliceRegistry::new())?;

        Ok(Store::mounted(RootReducer::new().mount(&slice)?, ()))
    }

    async fn count(store: &SliceStore<()>) -> Option<u32> {
        store
            .state(|root| root.slice::<Tally>("tally").map(|s| s.fields.count))
            .await
    }

    #[tokio::test]
    async fn test_send_transition() -> Result<(), StoreError> {
        let store = tally_store()?;

        store.send(Action::transition("tally", "bump", None)).await?;
        store.send(Action::transition("tally", "unknown", None)).await?;
        store.send(Action::transition("elsewhere", "bump", None)).await?;

        assert_eq!(count(&store).await, Some(1));
        Ok(())
    }

    #[tokio::test]
    async fn test_settlement_is_tracked() -> Result<(), StoreError> {
        let store = tally_store()?;

        let mut handle = store.send(Action::pending("tally", "bumpLater", json!(5))).await?;
        assert_eq!(handle.pending(), 1);
        handle.wait_with_timeout(Duration::from_secs(1)).await?;

        assert_eq!(count(&store).await, Some(1));
        assert_eq!(handle.pending(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_broadcast_follows_reduction() -> Result<(), StoreError> {
        let store = tally_store()?;
        let mut rx = store.subscribe_actions();

        store.send(Action::pending("tally", "bumpLater", json!(0))).await?;

        let action = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(|_| StoreError::ChannelClosed)?;
        assert_eq!(action, Action::fulfilled("tally", "bumpLater", json!(0)));
        // Observers see the state the action produced
        assert_eq!(count(&store).await, Some(1));
        Ok(())
    }

    #[tokio::test]
    async fn test_send_and_wait_for() -> Result<(), StoreError> {
        let store = tally_store()?;

        let action = store
            .send_and_wait_for(
                Action::pending("tally", "bumpLater", json!(1)),
                |a| a.settles("bumpLater"),
                Duration::from_secs(1),
            )
            .await?;
        assert_eq!(action, Action::fulfilled("tally", "bumpLater", json!(1)));
        assert_eq!(count(&store).await, Some(1));

        let timed_out = store
            .send_and_wait_for(
                Action::transition("tally", "bump", None),
                |_| true,
                Duration::from_millis(20),
            )
            .await;
        assert!(matches!(timed_out, Err(StoreError::Timeout)));
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_sends() -> Result<(), StoreError> {
        let store = tally_store()?;

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.send(Action::transition("tally", "bump", None)).await })
            })
            .collect();

        for task in tasks {
            match task.await {
                Ok(sent) => {
                    sent?;
                },
                Err(e) => panic!("concurrent send task panicked: {e}"),
            }
        }

        assert_eq!(count(&store).await, Some(10));
        Ok(())
    }

    #[tokio::test]
    async fn test_operation_panic_is_isolated() -> Result<(), StoreError> {
        let store = tally_store()?;

        let mut handle = store.send(Action::pending("tally", "explode", json!(null))).await?;
        handle.wait_with_timeout(Duration::from_secs(1)).await?;

        store.send(Action::transition("tally", "bump", None)).await?;
        assert_eq!(count(&store).await, Some(1));
        assert_eq!(store.pending_effects(), 0);
        // The panicked run never settled
        let status = store
            .state(|root| root.slice::<Tally>("tally").and_then(|s| s.status("explode")))
            .await;
        assert!(status.is_some_and(|s| s.is_loading()));
        Ok(())
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_operations() -> Result<(), StoreError> {
        let store = tally_store()?;

        store.send(Action::pending("tally", "bumpLater", json!(50))).await?;
        store.shutdown(Duration::from_secs(2)).await?;

        assert_eq!(count(&store).await, Some(1));
        assert!(matches!(
            store.send(Action::transition("tally", "bump", None)).await,
            Err(StoreError::ShutdownInProgress)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_shutdown_timeout() -> Result<(), StoreError> {
        let store = tally_store()?;

        store.send(Action::pending("tally", "bumpLater", json!(500))).await?;
        let result = store.shutdown(Duration::from_millis(20)).await;
        assert!(matches!(result, Err(StoreError::ShutdownTimeout(1))));
        Ok(())
    }

    #[tokio::test]
    async fn test_completed_handle() {
        let mut handle = EffectHandle::completed();
        handle.wait().await;
        assert_eq!(handle.pending(), 0);
    }

    #[test]
    fn test_config_builder() {
        let config = StoreConfig::new(8, Duration::from_secs(1))
            .with_broadcast_capacity(64)
            .with_shutdown_timeout(Duration::from_millis(500));
        assert_eq!(config.broadcast_capacity, 64);
        assert_eq!(config.default_shutdown_timeout, Duration::from_millis(500));
    }
}
