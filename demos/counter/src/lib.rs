//! # Counter Example
//!
//! The tutorial counter as a composed slice.
//!
//! This example showcases:
//! - Synchronous transitions (`increment`, `decrement`, `incrementByAmount`)
//! - An async operation (`incrementAsync`) resolved through a [`Transport`]
//! - Mounting the slice in a [`Store`](slicekit_runtime::Store) and binding it
//!
//! ## Example
//!
//! ```no_run
//! use counter::{counter_slice, CounterEnvironment, MockCountApi};
//! use serde_json::json;
//! use slicekit_core::{RootReducer, SliceRegistry};
//! use slicekit_runtime::{Binding, Store};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let slice = counter_slice(&SliceRegistry::new())?;
//! let env = CounterEnvironment::new(MockCountApi::new());
//! let store = Store::mounted(RootReducer::new().mount(&slice)?, env);
//! let binding = Binding::new(store, &slice);
//!
//! binding.dispatches().call("increment", None).await?;
//! let props = binding.props(&json!({ "initialValue": 0 })).await?;
//! assert_eq!(props["value"], json!(1));
//! # Ok(())
//! # }
//! ```

use futures::future::BoxFuture;
use serde::Serialize;
use slicekit_core::environment::Transport;
use slicekit_core::{
    AsyncOperation, ComposedSlice, OperationError, Payload, SliceComposer, SliceDefinition,
    SliceError, SliceRegistry, Transitions,
};
use std::sync::Arc;
use std::time::Duration;

/// Name the counter slice is registered under
pub const SLICE_NAME: &str = "counter";

/// Operation name understood by [`MockCountApi`]
pub const FETCH_COUNT: &str = "fetchCount";

/// Counter fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CounterFields {
    /// Current count value
    pub value: i64,
}

impl CounterFields {
    fn add(self, amount: &Payload) -> Self {
        match parse_int(amount) {
            Some(n) => Self {
                value: self.value.saturating_add(n),
            },
            None => self,
        }
    }
}

/// Coerce a payload into an integer amount
///
/// Strings yield their leading integer (`"12px"` is 12, `" -3"` is -3),
/// numbers are truncated toward zero. Anything else, including strings
/// without leading digits, yields `None`.
///
/// ```
/// use counter::parse_int;
/// use serde_json::json;
///
/// assert_eq!(parse_int(&json!("2")), Some(2));
/// assert_eq!(parse_int(&json!(7.9)), Some(7));
/// assert_eq!(parse_int(&json!("abc")), None);
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Truncation is the point
pub fn parse_int(payload: &Payload) -> Option<i64> {
    match payload {
        Payload::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }),
        Payload::String(s) => {
            let s = s.trim_start();
            let (sign, digits) = match s.as_bytes().first() {
                Some(b'-') => (-1, &s[1..]),
                Some(b'+') => (1, &s[1..]),
                _ => (1, s),
            };
            let end = digits
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(digits.len());
            digits[..end].parse::<i64>().ok().map(|n| sign * n)
        },
        _ => None,
    }
}

/// Counter environment
///
/// Holds the transport `incrementAsync` resolves through.
#[derive(Clone)]
pub struct CounterEnvironment {
    /// Transport used by async operations
    pub transport: Arc<dyn Transport>,
}

impl CounterEnvironment {
    /// Create a new counter environment
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }
}

impl std::fmt::Debug for CounterEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterEnvironment").finish_non_exhaustive()
    }
}

/// Mock count API: echoes the requested amount after a delay
#[derive(Debug, Clone, Copy)]
pub struct MockCountApi {
    delay: Duration,
}

impl MockCountApi {
    /// Default response latency
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

    /// Create a mock API with the default latency
    #[must_use]
    pub const fn new() -> Self {
        Self::with_delay(Self::DEFAULT_DELAY)
    }

    /// Create a mock API answering after `delay`
    #[must_use]
    pub const fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for MockCountApi {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockCountApi {
    fn call(
        &self,
        operation: &str,
        input: Payload,
    ) -> BoxFuture<'static, Result<Payload, OperationError>> {
        let delay = self.delay;
        let operation = operation.to_string();
        tracing::debug!(%operation, %input, delay_ms = delay.as_millis(), "Mock count API call");
        Box::pin(async move {
            if operation != FETCH_COUNT {
                return Err(OperationError::new(format!("unknown operation {operation}")));
            }
            tokio::time::sleep(delay).await;
            Ok(input)
        })
    }
}

/// Compose the counter slice, claiming its name in `registry`
///
/// # Errors
///
/// Returns [`SliceError::DuplicateSliceName`] if `counter` is already taken
/// in `registry`.
pub fn counter_slice(
    registry: &SliceRegistry,
) -> Result<ComposedSlice<CounterFields, CounterEnvironment>, SliceError> {
    SliceComposer::new(
        SliceDefinition::named(SLICE_NAME)
            .with_initial_fields(CounterFields::default())
            .with_transitions(
                Transitions::new()
                    .on("increment", |s: CounterFields, _| CounterFields {
                        value: s.value.saturating_add(1),
                    })
                    .on("decrement", |s: CounterFields, _| CounterFields {
                        value: s.value.saturating_sub(1),
                    })
                    .on("incrementByAmount", |s: CounterFields, amount| s.add(amount)),
            ),
    )
    .operation(AsyncOperation::new(
        "incrementAsync",
        |env: &CounterEnvironment, amount| env.transport.call(FETCH_COUNT, amount),
        |s: CounterFields, result| s.add(result),
    ))
    .compose(registry)
}
