//! Lightweight in-process metrics.
//!
//! Request latency, status codes and the key-count gauge are stored as atomics
//! and rendered by the `/metrics` handler in Prometheus text format.

pub mod metrics;

pub use metrics::{KvMetrics, RequestTimer};
