//! Prediction metrics
//!
//! Counter and latency tracking for the prediction endpoint. Mutable
//! histogram state sits under a single `RwLock`; plain counters are
//! lock-free atomics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Histogram bucket for the latency distribution
#[derive(Debug, Clone)]
pub struct HistogramBucket {
    /// Upper bound of this bucket (in seconds)
    pub le: f64,
    /// Count of observations that landed in this bucket
    pub count: u64,
}

struct MetricsInner {
    latency_histogram: Vec<HistogramBucket>,
    latency_sum_secs: f64,
}

/// Metrics collector for the prediction endpoint.
///
/// Buckets hold per-bucket counts internally; [`PredictionMetrics::render`]
/// accumulates them into the cumulative counts Prometheus expects.
pub struct PredictionMetrics {
    inner: RwLock<MetricsInner>,
    requests_total: AtomicU64,
    positive_total: AtomicU64,
    negative_total: AtomicU64,
}

impl PredictionMetrics {
    pub fn new() -> Self {
        let latency_histogram = [0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, f64::INFINITY]
            .iter()
            .map(|&le| HistogramBucket { le, count: 0 })
            .collect();

        Self {
            inner: RwLock::new(MetricsInner {
                latency_histogram,
                latency_sum_secs: 0.0,
            }),
            requests_total: AtomicU64::new(0),
            positive_total: AtomicU64::new(0),
            negative_total: AtomicU64::new(0),
        }
    }

    /// Record one served prediction and its handler latency.
    pub fn record(&self, latency_secs: f64, positive: bool) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if positive {
            self.positive_total.fetch_add(1, Ordering::Relaxed);
        } else {
            self.negative_total.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut inner) = self.inner.write() {
            inner.latency_sum_secs += latency_secs;
            for bucket in inner.latency_histogram.iter_mut() {
                if latency_secs <= bucket.le {
                    bucket.count += 1;
                    break;
                }
            }
        }
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn positive_total(&self) -> u64 {
        self.positive_total.load(Ordering::Relaxed)
    }

    pub fn negative_total(&self) -> u64 {
        self.negative_total.load(Ordering::Relaxed)
    }

    /// Per-bucket (non-cumulative) histogram counts.
    pub fn histogram(&self) -> Vec<HistogramBucket> {
        self.inner
            .read()
            .map(|inner| inner.latency_histogram.clone())
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total(),
            positive_total: self.positive_total(),
            negative_total: self.negative_total(),
            latency_sum_secs: self
                .inner
                .read()
                .map(|inner| inner.latency_sum_secs)
                .unwrap_or(0.0),
        }
    }

    /// Prometheus text exposition of all prediction metrics.
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str("# HELP pred_requests_total Total predictions served.\n");
        out.push_str("# TYPE pred_requests_total counter\n");
        out.push_str(&format!("pred_requests_total {}\n", self.requests_total()));

        out.push_str("# HELP pred_positive_total Predictions of the positive class.\n");
        out.push_str("# TYPE pred_positive_total counter\n");
        out.push_str(&format!("pred_positive_total {}\n", self.positive_total()));

        out.push_str("# HELP pred_negative_total Predictions of the negative class.\n");
        out.push_str("# TYPE pred_negative_total counter\n");
        out.push_str(&format!("pred_negative_total {}\n", self.negative_total()));

        out.push_str("# HELP pred_latency_seconds Prediction handler latency.\n");
        out.push_str("# TYPE pred_latency_seconds histogram\n");
        if let Ok(inner) = self.inner.read() {
            let mut cumulative = 0u64;
            for bucket in &inner.latency_histogram {
                cumulative += bucket.count;
                let le = if bucket.le.is_infinite() {
                    "+Inf".to_string()
                } else {
                    format!("{}", bucket.le)
                };
                out.push_str(&format!(
                    "pred_latency_seconds_bucket{{le=\"{le}\"}} {cumulative}\n"
                ));
            }
            out.push_str(&format!(
                "pred_latency_seconds_sum {}\n",
                inner.latency_sum_secs
            ));
            out.push_str(&format!("pred_latency_seconds_count {cumulative}\n"));
        }

        out
    }
}

impl Default for PredictionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time counter values.
#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub positive_total: u64,
    pub negative_total: u64,
    pub latency_sum_secs: f64,
}
