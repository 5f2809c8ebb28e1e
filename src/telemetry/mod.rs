//! Runtime counters and latency histograms for the worker pool.

pub mod metrics;

pub use metrics::{Metrics, MetricsSnapshot};
