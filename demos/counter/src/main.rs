//! Counter example binary
//!
//! Mounts the counter slice in a store, drives it through its binding and
//! prints the projected props after every step.

use anyhow::Context;
use counter::{counter_slice, CounterEnvironment, CounterFields, MockCountApi, SLICE_NAME};
use serde_json::json;
use slicekit_core::{RootReducer, SliceRegistry};
use slicekit_runtime::{metrics, Binding, Store};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "counter=debug,slicekit_runtime=debug,slicekit_core=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let prometheus = metrics::install_recorder().context("installing metrics recorder")?;

    println!("=== Counter Example: Composed Slices ===\n");

    let slice = counter_slice(SliceRegistry::global()).context("composing counter slice")?;
    let root = RootReducer::new()
        .mount(&slice)
        .context("mounting counter slice")?;
    let store = Store::mounted(root, CounterEnvironment::new(MockCountApi::new()));
    let binding = Binding::new(store.clone(), &slice);
    let own = json!({ "initialValue": 10 });

    println!("Dispatches: {:?}", binding.dispatches().names());
    println!("Initial props: {}", binding.props(&own).await?);

    for (name, argument) in [
        ("increment", None),
        ("increment", None),
        ("decrement", None),
        ("incrementByAmount", Some(json!("5"))),
        ("incrementByAmount", Some(json!("abc"))),
    ] {
        println!("\n>>> Dispatching: {name} {argument:?}");
        binding.dispatches().call(name, argument).await?;
        println!("Props: {}", binding.props(&own).await?);
    }

    println!("\n>>> Dispatching: incrementAsync \"3\"");
    let mut handle = binding
        .dispatches()
        .call("incrementAsync", Some(json!("3")))
        .await?;
    println!("While loading: {}", binding.props(&own).await?);
    handle
        .wait_with_timeout(Duration::from_secs(2))
        .await
        .context("waiting for incrementAsync")?;
    println!("After settlement: {}", binding.props(&own).await?);

    println!("\n>>> Dispatching: resetState");
    binding.dispatches().call("resetState", None).await?;
    let value = store
        .state(|root| root.slice::<CounterFields>(SLICE_NAME).map(|s| s.fields.value))
        .await;
    println!("Value after reset: {value:?}");
    println!("Props derived {} times", binding.derivations());

    store
        .shutdown(Duration::from_secs(5))
        .await
        .context("shutting down store")?;

    println!("\n=== Metrics ===\n{}", prometheus.render());
    Ok(())
}
