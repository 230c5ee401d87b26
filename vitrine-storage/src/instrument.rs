//! Upstream call instrumentation.
//!
//! [`InstrumentedSource`] wraps a [`CatalogSource`] and records how long each
//! call took and whether it failed. Every call is logged: at debug level
//! normally, at warn level when it exceeds the slow-call threshold, and at
//! error level when it fails.
//!
//! Counts and latencies live in Prometheus collectors on a registry owned by
//! the source, so several sources (and tests) never collide on metric names.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, error, warn};
use vitrine_core::{
    OrderSummary, Product, ProductId, TelemetryError, Theme, UserId, VitrineResult,
};

use crate::catalog::{CatalogOp, CatalogSource};

/// Upstream call latency buckets (seconds)
const CALL_LATENCY_BUCKETS: &[f64] =
    &[0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0];

const STATUS_SUCCESS: &str = "success";
const STATUS_ERROR: &str = "error";

fn metrics_error(metric: &str, e: prometheus::Error) -> TelemetryError {
    TelemetryError::Metrics {
        metric: metric.to_string(),
        reason: e.to_string(),
    }
}

/// Totals for one operation, read back from the collectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CallMetrics {
    pub calls: u64,
    pub failures: u64,
    pub slow_calls: u64,
    pub total_seconds: f64,
}

impl CallMetrics {
    /// Mean call duration, zero when nothing was recorded.
    pub fn mean(&self) -> Duration {
        if self.calls == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(self.total_seconds / self.calls as f64)
        }
    }
}

/// A [`CatalogSource`] that times and logs every call to the wrapped source.
pub struct InstrumentedSource<S> {
    inner: S,
    slow_call_threshold: Duration,
    registry: Registry,
    /// Catalog call counter - labels: operation, status
    calls_total: CounterVec,
    /// Catalog call duration histogram - labels: operation
    call_duration_seconds: HistogramVec,
    /// Calls over the slow-call threshold - labels: operation
    slow_calls_total: CounterVec,
}

impl<S: CatalogSource> InstrumentedSource<S> {
    /// Wrap `inner`, flagging calls slower than `slow_call_threshold`.
    pub fn new(inner: S, slow_call_threshold: Duration) -> VitrineResult<Self> {
        let registry = Registry::new();

        let calls_total = CounterVec::new(
            Opts::new("vitrine_catalog_calls_total", "Total number of catalog calls"),
            &["operation", "status"],
        )
        .map_err(|e| metrics_error("vitrine_catalog_calls_total", e))?;

        let call_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "vitrine_catalog_call_duration_seconds",
                "Catalog call duration in seconds",
            )
            .buckets(CALL_LATENCY_BUCKETS.to_vec()),
            &["operation"],
        )
        .map_err(|e| metrics_error("vitrine_catalog_call_duration_seconds", e))?;

        let slow_calls_total = CounterVec::new(
            Opts::new(
                "vitrine_catalog_slow_calls_total",
                "Catalog calls slower than the configured threshold",
            ),
            &["operation"],
        )
        .map_err(|e| metrics_error("vitrine_catalog_slow_calls_total", e))?;

        registry
            .register(Box::new(calls_total.clone()))
            .map_err(|e| metrics_error("vitrine_catalog_calls_total", e))?;
        registry
            .register(Box::new(call_duration_seconds.clone()))
            .map_err(|e| metrics_error("vitrine_catalog_call_duration_seconds", e))?;
        registry
            .register(Box::new(slow_calls_total.clone()))
            .map_err(|e| metrics_error("vitrine_catalog_slow_calls_total", e))?;

        Ok(Self {
            inner,
            slow_call_threshold,
            registry,
            calls_total,
            call_duration_seconds,
            slow_calls_total,
        })
    }

    /// Get a reference to the wrapped source.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// The registry holding this source's collectors.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render the collectors in the Prometheus text exposition format.
    pub fn encode_text(&self) -> VitrineResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| metrics_error("registry", e))?;
        String::from_utf8(buffer).map_err(|e| {
            TelemetryError::Metrics {
                metric: "registry".to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Snapshot of per-operation metrics. Operations never called are absent.
    pub fn metrics(&self) -> BTreeMap<CatalogOp, CallMetrics> {
        CatalogOp::ALL
            .into_iter()
            .map(|op| (op, self.metrics_for(op)))
            .filter(|(_, metrics)| metrics.calls > 0)
            .collect()
    }

    /// Metrics for a single operation.
    pub fn metrics_for(&self, op: CatalogOp) -> CallMetrics {
        let operation = op.as_str();
        let successes = self
            .calls_total
            .with_label_values(&[operation, STATUS_SUCCESS])
            .get() as u64;
        let failures = self
            .calls_total
            .with_label_values(&[operation, STATUS_ERROR])
            .get() as u64;
        let slow_calls = self.slow_calls_total.with_label_values(&[operation]).get() as u64;
        let total_seconds = self
            .call_duration_seconds
            .with_label_values(&[operation])
            .get_sample_sum();

        CallMetrics {
            calls: successes + failures,
            failures,
            slow_calls,
            total_seconds,
        }
    }

    fn record(&self, op: CatalogOp, elapsed: Duration, success: bool, slow: bool) {
        let operation = op.as_str();
        let status = if success { STATUS_SUCCESS } else { STATUS_ERROR };
        self.calls_total
            .with_label_values(&[operation, status])
            .inc();
        self.call_duration_seconds
            .with_label_values(&[operation])
            .observe(elapsed.as_secs_f64());
        if slow {
            self.slow_calls_total.with_label_values(&[operation]).inc();
        }
    }

    async fn observe<T, Fut>(&self, op: CatalogOp, call: Fut) -> VitrineResult<T>
    where
        Fut: Future<Output = VitrineResult<T>>,
    {
        let started = Instant::now();
        let result = call.await;
        let elapsed = started.elapsed();
        let slow = elapsed > self.slow_call_threshold;
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;

        match &result {
            Err(e) => error!(operation = op.as_str(), elapsed_ms, error = %e, "catalog call failed"),
            Ok(_) if slow => warn!(
                operation = op.as_str(),
                elapsed_ms,
                threshold_ms = u64::try_from(self.slow_call_threshold.as_millis()).unwrap_or(u64::MAX),
                "slow catalog call"
            ),
            Ok(_) => debug!(operation = op.as_str(), elapsed_ms, "catalog call"),
        }

        self.record(op, elapsed, result.is_ok(), slow);
        result
    }
}

impl<S> std::fmt::Debug for InstrumentedSource<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentedSource")
            .field("slow_call_threshold", &self.slow_call_threshold)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<S: CatalogSource> CatalogSource for InstrumentedSource<S> {
    async fn list_products(&self) -> VitrineResult<Vec<Product>> {
        self.observe(CatalogOp::ListProducts, self.inner.list_products())
            .await
    }

    async fn get_product(&self, id: ProductId) -> VitrineResult<Product> {
        self.observe(CatalogOp::GetProduct, self.inner.get_product(id))
            .await
    }

    async fn order_summary(&self, user_id: UserId) -> VitrineResult<OrderSummary> {
        self.observe(CatalogOp::OrderSummary, self.inner.order_summary(user_id))
            .await
    }

    async fn theme(&self, name: &str) -> VitrineResult<Theme> {
        self.observe(CatalogOp::Theme, self.inner.theme(name)).await
    }

    async fn update_product(&self, product: &Product) -> VitrineResult<Product> {
        self.observe(CatalogOp::UpdateProduct, self.inner.update_product(product))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockCatalog;
    use std::sync::Arc;
    use vitrine_core::CatalogError;

    fn dark_theme() -> Theme {
        Theme {
            name: "dark".to_string(),
            primary_color: "#111111".to_string(),
            accent_color: "#ff6600".to_string(),
            logo_url: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_records_calls_and_failures() {
        let mock = Arc::new(MockCatalog::new());
        mock.insert_theme(dark_theme());
        let source = InstrumentedSource::new(Arc::clone(&mock), Duration::from_millis(250)).unwrap();

        source.theme("dark").await.unwrap();
        assert!(source.theme("light").await.is_err());
        mock.fail_next(CatalogError::unavailable("postgres", "reset"));
        assert!(source.list_products().await.is_err());

        let theme = source.metrics_for(CatalogOp::Theme);
        assert_eq!(theme.calls, 2);
        assert_eq!(theme.failures, 1);

        let listing = source.metrics_for(CatalogOp::ListProducts);
        assert_eq!(listing.calls, 1);
        assert_eq!(listing.failures, 1);

        assert!(!source.metrics().contains_key(&CatalogOp::OrderSummary));
        assert_eq!(source.metrics().len(), 2);
        assert_eq!(mock.total_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flags_slow_calls() {
        let mock = MockCatalog::new().with_latency(Duration::from_millis(400));
        mock.insert_theme(dark_theme());
        let source = InstrumentedSource::new(mock, Duration::from_millis(250)).unwrap();

        source.theme("dark").await.unwrap();

        let metrics = source.metrics_for(CatalogOp::Theme);
        assert_eq!(metrics.slow_calls, 1);
        assert!(metrics.total_seconds >= 0.399);
        assert!(metrics.mean() >= Duration::from_millis(399));
    }

    #[tokio::test(start_paused = true)]
    async fn test_encode_text_exposes_labelled_series() {
        let source = InstrumentedSource::new(MockCatalog::new(), Duration::from_millis(250)).unwrap();
        assert!(source.theme("missing").await.is_err());

        let text = source.encode_text().unwrap();
        assert!(text.contains("vitrine_catalog_calls_total"));
        assert!(text.contains("operation=\"theme\""));
        assert!(text.contains("status=\"error\""));
        assert!(text.contains("vitrine_catalog_call_duration_seconds_bucket"));
    }

    #[test]
    fn test_sources_keep_separate_registries() {
        let first = InstrumentedSource::new(MockCatalog::new(), Duration::from_millis(250));
        let second = InstrumentedSource::new(MockCatalog::new(), Duration::from_millis(250));
        assert!(first.is_ok());
        assert!(second.is_ok());
    }

    #[test]
    fn test_call_metrics_mean() {
        let metrics = CallMetrics {
            calls: 2,
            failures: 1,
            slow_calls: 0,
            total_seconds: 0.040,
        };
        assert!((metrics.mean().as_secs_f64() - 0.020).abs() < 1e-9);
        assert_eq!(CallMetrics::default().mean(), Duration::ZERO);
    }
}
