//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes a minimal set of counters/gauges relevant to file manager traffic.

use std::convert::TryFrom;
use std::sync::Arc;
use std::time::Duration;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    batch_items_total: IntCounterVec,
    batches_in_flight: IntGauge,
    batch_latency_ms: IntGauge,
    uploaded_bytes_total: IntCounter,
}

/// Snapshot of selected gauges and counters for health reporting and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Batches currently waiting on their settle barrier.
    pub batches_in_flight: i64,
    /// Latency (ms) of the most recently settled batch.
    pub batch_latency_ms: i64,
    /// Total bytes persisted by uploads.
    pub uploaded_bytes_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = counter_vec(
            "http_requests_total",
            "Total HTTP requests received",
            &["route", "code"],
        )?;
        let batch_items_total = counter_vec(
            "batch_items_total",
            "Batch items settled by operation and outcome",
            &["operation", "outcome"],
        )?;
        let batches_in_flight = gauge("batches_in_flight", "Batches awaiting settlement")?;
        let batch_latency_ms = gauge(
            "batch_latency_ms",
            "Wall-clock time of the most recently settled batch (ms)",
        )?;
        let uploaded_bytes_total =
            IntCounter::with_opts(Opts::new("uploaded_bytes_total", "Bytes persisted by uploads"))
                .map_err(|source| TelemetryError::MetricsCollector {
                    name: "uploaded_bytes_total",
                    source,
                })?;

        register(&registry, "http_requests_total", http_requests_total.clone())?;
        register(&registry, "batch_items_total", batch_items_total.clone())?;
        register(&registry, "batches_in_flight", batches_in_flight.clone())?;
        register(&registry, "batch_latency_ms", batch_latency_ms.clone())?;
        register(&registry, "uploaded_bytes_total", uploaded_bytes_total.clone())?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                batch_items_total,
                batches_in_flight,
                batch_latency_ms,
                uploaded_bytes_total,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        let code = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[route, code.as_str()])
            .inc();
    }

    /// Count one settled batch item.
    pub fn record_batch_item(&self, operation: &str, outcome: &str) {
        self.inner
            .batch_items_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    /// Mark a batch as started.
    pub fn batch_started(&self) {
        self.inner.batches_in_flight.inc();
    }

    /// Mark a batch as settled after `elapsed`.
    pub fn batch_settled(&self, elapsed: Duration) {
        self.inner.batches_in_flight.dec();
        self.inner
            .batch_latency_ms
            .set(Self::duration_to_ms(elapsed));
    }

    /// Add persisted upload bytes.
    pub fn add_uploaded_bytes(&self, bytes: u64) {
        self.inner.uploaded_bytes_total.inc_by(bytes);
    }

    /// Number of settled items recorded for an operation/outcome pair.
    #[must_use]
    pub fn batch_item_count(&self, operation: &str, outcome: &str) -> u64 {
        self.inner
            .batch_items_total
            .with_label_values(&[operation, outcome])
            .get()
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches_in_flight: self.inner.batches_in_flight.get(),
            batch_latency_ms: self.inner.batch_latency_ms.get(),
            uploaded_bytes_total: self.inner.uploaded_bytes_total.get(),
        }
    }

    pub(crate) fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn gauge(name: &'static str, help: &str) -> Result<IntGauge> {
    IntGauge::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: C) -> Result<()>
where
    C: prometheus::core::Collector + 'static,
{
    registry
        .register(Box::new(collector))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}
