//! MockTransport driving slices mounted in a Store
//!
//! Scripted responses decide how each async operation settles.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use proptest::prelude::*;
use serde::Serialize;
use serde_json::json;
use slicekit_core::environment::Transport;
use slicekit_core::{
    Action, AsyncOperation, ComposedSlice, OperationStatus, RootReducer, SliceComposer,
    SliceDefinition, Transitions,
};
use slicekit_runtime::Store;
use slicekit_testing::properties::arb_payload;
use slicekit_testing::{init_tracing, test_registry, MockTransport};
use std::time::Duration;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
struct Profile {
    name: Option<String>,
}

fn profile_slice() -> ComposedSlice<Profile, MockTransport> {
    SliceComposer::new(
        SliceDefinition::named("profile")
            .with_initial_fields(Profile::default())
            .with_transitions(Transitions::new().on("clear", |_, _| Profile::default())),
    )
    .operation(AsyncOperation::new(
        "load",
        |transport: &MockTransport, input| transport.call("load", input),
        |_, result| Profile {
            name: result.as_str().map(str::to_string),
        },
    ))
    .compose(&test_registry())
    .expect("profile slice composes")
}

#[tokio::test]
async fn test_scripted_success_then_failure() {
    init_tracing();
    let transport = MockTransport::new()
        .succeed("load", json!("ada"))
        .fail("load", "not found");
    let slice = profile_slice();
    let store = Store::mounted(RootReducer::new().mount(&slice).unwrap(), transport.clone());

    let fulfilled = store
        .send_and_wait_for(
            Action::pending("profile", "load", json!(1)),
            |a| a.settles("load"),
            Duration::from_secs(1),
        )
        .await
        .unwrap();
    assert_eq!(fulfilled, Action::fulfilled("profile", "load", json!("ada")));

    let rejected = store
        .send_and_wait_for(
            Action::pending("profile", "load", json!(2)),
            |a| a.settles("load"),
            Duration::from_secs(1),
        )
        .await
        .unwrap();
    assert_eq!(rejected, Action::rejected("profile", "load"));

    let (name, status) = store
        .state(|root| {
            let slice = root.slice::<Profile>("profile").unwrap();
            (slice.fields.name.clone(), slice.status("load"))
        })
        .await;
    // A failure leaves the fields of the earlier success in place
    assert_eq!(name.as_deref(), Some("ada"));
    assert_eq!(status, Some(OperationStatus::Failed));
    assert_eq!(transport.call_count("load"), 2);
}

#[tokio::test]
async fn test_delayed_transport_shows_loading() {
    let transport = MockTransport::echo().with_delay(Duration::from_millis(30));
    let slice = profile_slice();
    let store = Store::mounted(RootReducer::new().mount(&slice).unwrap(), transport);

    let mut handle = store
        .send(Action::pending("profile", "load", json!("grace")))
        .await
        .unwrap();
    let loading = store
        .state(|root| root.slice::<Profile>("profile").and_then(|s| s.status("load")))
        .await;
    assert_eq!(loading, Some(OperationStatus::Loading));

    handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();
    let name = store
        .state(|root| root.slice::<Profile>("profile").and_then(|s| s.fields.name.clone()))
        .await;
    assert_eq!(name.as_deref(), Some("grace"));
}

proptest! {
    /// The echo transport hands back exactly what it was given
    #[test]
    fn prop_echo_returns_input(payload in arb_payload()) {
        let transport = MockTransport::echo();
        let result = tokio_test::block_on(transport.call("any", payload.clone()));
        prop_assert_eq!(result, Ok(payload));
        prop_assert_eq!(transport.call_count("any"), 1);
    }
}
