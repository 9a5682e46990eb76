//! Prometheus metrics for observability and monitoring.
//!
//! Metrics are recorded with the `metrics` facade throughout the workspace:
//! - Store: actions sent, reducer latency, effects executed, shutdown
//! - Slices: async operation lifecycle, registry claims
//!
//! Nothing is exported until a recorder is installed. [`install_recorder`]
//! installs a Prometheus recorder and returns the handle used to render the
//! scrape output.
//!
//! # Example
//!
//! ```rust,no_run
//! use slicekit_runtime::metrics::install_recorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handle = install_recorder()?;
//! println!("{}", handle.render());
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

// Re-export metrics macros for use by embedders
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Latency buckets for `*duration_seconds` histograms
const DURATION_BUCKETS: &[f64] = &[
    0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0,
];

/// Register descriptions and install a Prometheus recorder.
///
/// # Errors
///
/// Returns [`MetricsError::Build`] if the exporter cannot be configured, or
/// [`MetricsError::Install`] if a global recorder is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, MetricsError> {
    register_metrics();

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            DURATION_BUCKETS,
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    tracing::info!("Prometheus metrics recorder installed");
    Ok(handle)
}

/// Register all metric descriptions.
pub fn register_metrics() {
    // Store
    describe_counter!(
        "store.commands.total",
        "Total number of actions sent to a store"
    );
    describe_counter!(
        "store.feedback.total",
        "Total number of effect-produced actions reduced"
    );
    describe_histogram!(
        "store.reducer.duration_seconds",
        Unit::Seconds,
        "Time taken to apply the reducer"
    );
    describe_counter!(
        "store.effects.executed",
        "Total number of effects executed, by type"
    );
    describe_counter!(
        "store.shutdown.initiated",
        "Number of graceful shutdowns started"
    );
    describe_counter!(
        "store.shutdown.completed",
        "Number of graceful shutdowns that drained all effects"
    );
    describe_counter!(
        "store.shutdown.timeout",
        "Number of graceful shutdowns that timed out"
    );
    describe_counter!(
        "store.shutdown.rejected_actions",
        "Actions rejected because the store was shutting down"
    );

    // Slices
    describe_counter!(
        "slice.registry.registered",
        "Total number of slice names claimed"
    );
    describe_counter!(
        "slice.operations.started",
        "Async operations started, by operation"
    );
    describe_counter!(
        "slice.operations.fulfilled",
        "Async operations that fulfilled, by operation"
    );
    describe_counter!(
        "slice.operations.rejected",
        "Async operations that rejected, by operation"
    );
}
