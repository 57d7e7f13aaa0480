//! Monitoring module
//!
//! Tracks prediction counters and latency for the serving endpoints and
//! renders them in Prometheus text exposition format.

mod metrics;

pub use metrics::{HistogramBucket, MetricsSnapshot, PredictionMetrics};
