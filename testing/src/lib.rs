//! # Slicekit Testing
//!
//! Testing utilities for composed slices.
//!
//! This crate provides:
//! - [`MockTransport`]: a scripted [`Transport`](slicekit_core::environment::Transport)
//!   that records every call
//! - [`ReducerTest`]: Given-When-Then reducer tests
//! - Assertion helpers for effects and operation statuses
//! - proptest strategies for payloads
//!
//! ## Example
//!
//! ```
//! use slicekit_core::environment::Transport;
//! use slicekit_testing::MockTransport;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let transport = MockTransport::new().succeed("fetchCount", json!(5));
//! assert_eq!(transport.call("fetchCount", json!(5)).await.ok(), Some(json!(5)));
//! assert_eq!(transport.call_count("fetchCount"), 1);
//! # });
//! ```


pub use reducer_test::{assertions, ReducerTest};

/// Mock implementations of Environment traits
pub mod mocks {
    use futures::future::BoxFuture;
    use slicekit_core::environment::Transport;
    use slicekit_core::{OperationError, Payload};
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex, PoisonError};
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct Script {
        responses: HashMap<String, VecDeque<Result<Payload, OperationError>>>,
        calls: Vec<(String, Payload)>,
    }

    /// Scripted transport for deterministic tests
    ///
    /// Responses are queued per operation and consumed in order. An
    /// operation with an empty queue echoes its input when the transport was
    /// built with [`MockTransport::echo`], and fails otherwise.
    ///
    /// Clones share the script and the call log.
    #[derive(Debug, Clone, Default)]
    pub struct MockTransport {
        script: Arc<Mutex<Script>>,
        delay: Duration,
        echo: bool,
    }

    impl MockTransport {
        /// A transport with no scripted responses
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// A transport that echoes the input of unscripted calls
        #[must_use]
        pub fn echo() -> Self {
            Self {
                echo: true,
                ..Self::default()
            }
        }

        /// Delay every response by `delay`
        #[must_use]
        pub const fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        /// Queue a response for `operation`
        #[must_use]
        pub fn respond(
            self,
            operation: impl Into<String>,
            response: Result<Payload, OperationError>,
        ) -> Self {
            self.lock()
                .responses
                .entry(operation.into())
                .or_default()
                .push_back(response);
            self
        }

        /// Queue a successful response for `operation`
        #[must_use]
        pub fn succeed(self, operation: impl Into<String>, result: Payload) -> Self {
            self.respond(operation, Ok(result))
        }

        /// Queue a failure for `operation`
        #[must_use]
        pub fn fail(self, operation: impl Into<String>, message: &str) -> Self {
            self.respond(operation, Err(OperationError::new(message)))
        }

        /// Every call so far as `(operation, input)`, oldest first
        #[must_use]
        pub fn calls(&self) -> Vec<(String, Payload)> {
            self.lock().calls.clone()
        }

        /// Number of calls made to `operation`
        #[must_use]
        pub fn call_count(&self, operation: &str) -> usize {
            self.lock()
                .calls
                .iter()
                .filter(|(op, _)| op == operation)
                .count()
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
            self.script.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    impl Transport for MockTransport {
        fn call(
            &self,
            operation: &str,
            input: Payload,
        ) -> BoxFuture<'static, Result<Payload, OperationError>> {
            let response = {
                let mut script = self.lock();
                script.calls.push((operation.to_string(), input.clone()));
                script
                    .responses
                    .get_mut(operation)
                    .and_then(VecDeque::pop_front)
            };

            let result = match response {
                Some(result) => result,
                None if self.echo => Ok(input),
                None => Err(OperationError::new(format!(
                    "no response scripted for {operation}"
                ))),
            };
            let delay = self.delay;

            Box::pin(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                result
            })
        }
    }
}

/// Test helpers and utilities
pub mod helpers {
    use slicekit_core::SliceRegistry;
    use tracing_subscriber::EnvFilter;

    /// A fresh registry, isolated from the process-wide one
    #[must_use]
    pub fn test_registry() -> SliceRegistry {
        SliceRegistry::new()
    }

    /// Install a test-friendly tracing subscriber
    ///
    /// Honors `RUST_LOG`; safe to call from every test.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities
pub mod properties {
    use proptest::prelude::*;
    use slicekit_core::Payload;

    /// Arbitrary JSON payloads, nested up to a few levels
    pub fn arb_payload() -> impl Strategy<Value = Payload> {
        let leaf = prop_oneof![
            Just(Payload::Null),
            any::<bool>().prop_map(Payload::from),
            any::<i64>().prop_map(Payload::from),
            any::<f64>()
                .prop_filter("finite", |f| f.is_finite())
                .prop_map(Payload::from),
            ".*".prop_map(Payload::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Payload::from),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| Payload::Object(m.into_iter().collect())),
            ]
        })
    }
}

pub use helpers::{init_tracing, test_registry};
pub use mocks::MockTransport;
