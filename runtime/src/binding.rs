//! Consumer bindings: a slice's dispatch table and selector attached to a
//! running store.
//!
//! [`BoundDispatch`] turns dispatch names into sent actions. [`Binding`]
//! pairs it with memoized props, so a consumer re-renders only when the
//! slice it reads actually changed.

use crate::store::SliceStore;
use crate::{EffectHandle, StoreError};
use slicekit_core::{
    Action, ComposedSlice, DispatchKey, DispatchTable, Payload, RootState, Selector, SliceFields,
    SliceState,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// A slice's dispatch table bound to a store.
///
/// Clones share the store.
pub struct BoundDispatch<E>
where
    E: Send + Sync + 'static,
{
    store: SliceStore<E>,
    table: DispatchTable,
}

impl<E> Clone for BoundDispatch<E>
where
    E: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            table: self.table.clone(),
        }
    }
}

impl<E> std::fmt::Debug for BoundDispatch<E>
where
    E: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundDispatch")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl<E> BoundDispatch<E>
where
    E: Clone + Send + Sync + 'static,
{
    /// Bind `table` to `store`
    #[must_use]
    pub const fn new(store: SliceStore<E>, table: DispatchTable) -> Self {
        Self { store, table }
    }

    /// All dispatch names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.table.names()
    }

    /// Dispatch `name` with `argument`.
    ///
    /// For an async operation the returned handle completes once the
    /// operation has settled and its outcome has been reduced.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Slice`] wrapping [`slicekit_core::SliceError::UnknownDispatch`]
    ///   if `name` is not in the table
    /// - [`StoreError::ShutdownInProgress`] if the store is shutting down
    pub async fn call(
        &self,
        name: &str,
        argument: Option<Payload>,
    ) -> Result<EffectHandle, StoreError> {
        let action = self.table.action(name, argument)?;
        tracing::debug!(slice = self.table.slice(), dispatch = name, "Dispatching");
        self.store.send(action).await
    }

    /// Dispatch an async operation and wait for its settlement action.
    ///
    /// Returns the fulfilled or rejected action. Calling this with a
    /// transition name resolves with a timeout, since transitions never
    /// settle.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Slice`] if `name` is not in the table
    /// - [`StoreError::Timeout`] if no settlement arrived in time
    pub async fn call_and_settle(
        &self,
        name: &str,
        argument: Option<Payload>,
        timeout: Duration,
    ) -> Result<Action, StoreError> {
        let action = self.table.action(name, argument)?;
        let operation = match self.table.key(name) {
            Some(DispatchKey::Operation(op)) => op.clone(),
            _ => String::new(),
        };
        let slice = self.table.slice().to_string();

        self.store
            .send_and_wait_for(
                action,
                move |a| !operation.is_empty() && a.slice() == slice && a.settles(&operation),
                timeout,
            )
            .await
    }
}

struct Memo<S> {
    slice: Arc<SliceState<S>>,
    own: Payload,
    props: Payload,
}

/// A consumer's view of one slice: memoized props plus bound dispatches.
///
/// [`Binding::props`] re-runs the selector only when the slice's state
/// allocation or the own parameters differ from the previous call. Since
/// the root reducer replaces only the addressed slice, actions on other
/// slices never cause a re-derivation.
pub struct Binding<S, E>
where
    E: Send + Sync + 'static,
{
    store: SliceStore<E>,
    selector: Selector<S>,
    dispatch: BoundDispatch<E>,
    memo: Mutex<Option<Memo<S>>>,
    derivations: AtomicUsize,
}

impl<S, E> Binding<S, E>
where
    S: SliceFields,
    E: Clone + Send + Sync + 'static,
{
    /// Connect `slice` to `store`
    #[must_use]
    pub fn new(store: SliceStore<E>, slice: &ComposedSlice<S, E>) -> Self {
        Self {
            dispatch: BoundDispatch::new(store.clone(), slice.dispatch_table().clone()),
            selector: slice.selector().clone(),
            store,
            memo: Mutex::new(None),
            derivations: AtomicUsize::new(0),
        }
    }

    /// Current props for `own`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Slice`] if the slice is not mounted in the
    /// store or its state cannot be projected.
    pub async fn props(&self, own: &Payload) -> Result<Payload, StoreError> {
        let root = self.store.state(RootState::clone).await;
        let slice = root
            .slice_arc::<S>(self.selector.slice_name())
            .ok_or_else(|| {
                slicekit_core::SliceError::SliceNotMounted(self.selector.slice_name().to_string())
            })?;

        let mut memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = memo.as_ref() {
            if Arc::ptr_eq(&cached.slice, &slice) && &cached.own == own {
                tracing::trace!(slice = self.selector.slice_name(), "Props unchanged");
                return Ok(cached.props.clone());
            }
        }

        let props = self.selector.project(&root, own)?;
        self.derivations.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(slice = self.selector.slice_name(), "Props derived");

        *memo = Some(Memo {
            slice,
            own: own.clone(),
            props: props.clone(),
        });
        Ok(props)
    }

    /// The bound dispatches
    #[must_use]
    pub const fn dispatches(&self) -> &BoundDispatch<E> {
        &self.dispatch
    }

    /// How many times props were derived rather than served from the memo
    #[must_use]
    pub fn derivations(&self) -> usize {
        self.derivations.load(Ordering::Relaxed)
    }
}

impl<S, E> std::fmt::Debug for Binding<S, E>
where
    E: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("selector", &self.selector)
            .field("dispatch", &self.dispatch)
            .field("derivations", &self.derivations.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
