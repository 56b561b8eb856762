//! Prometheus metrics module
//!
//! Sprint S-5: Bus metrics for publish/delivery observability.

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Duration;

/// Bus metrics collector
///
/// Install is best-effort: if the embedding service already installed a
/// global recorder, the bus records into that one and `render()` returns
/// an empty string (the service owns the scrape endpoint).
#[derive(Clone)]
pub struct BusMetrics {
    handle: Option<Arc<PrometheusHandle>>,
}

impl BusMetrics {
    /// Initialize metrics and return handle
    pub fn new() -> Self {
        let handle = PrometheusBuilder::new().install_recorder().ok();

        // Register metric descriptions
        Self::register_metrics();

        Self {
            handle: handle.map(Arc::new),
        }
    }

    /// Register metric descriptions
    fn register_metrics() {
        // Publish counters
        describe_counter!(
            "bus_messages_published_total",
            Unit::Count,
            "Messages committed to the broker"
        );
        describe_counter!(
            "bus_publish_failures_total",
            Unit::Count,
            "Publishes rejected by the broker or failed to encode"
        );

        // Delivery counters
        describe_counter!(
            "bus_deliveries_total",
            Unit::Count,
            "Deliveries resolved, labeled by outcome (ack/nak)"
        );
        describe_counter!(
            "bus_errors_total",
            Unit::Count,
            "Total bus errors by error_type"
        );

        // Latency histograms
        describe_histogram!(
            "bus_publish_duration_seconds",
            Unit::Seconds,
            "Time from publish call to broker acknowledgement"
        );
        describe_histogram!(
            "bus_handler_duration_seconds",
            Unit::Seconds,
            "Time spent in the application handler per delivery"
        );

        // Gauges
        describe_gauge!(
            "bus_connected",
            Unit::Count,
            "Broker connection status (1=connected, 0=disconnected)"
        );
    }

    /// Record a successful publish
    pub fn record_publish(&self, subject: &str, duration: Duration) {
        counter!(
            "bus_messages_published_total",
            "subject" => subject.to_string()
        )
        .increment(1);

        histogram!(
            "bus_publish_duration_seconds",
            "subject" => subject.to_string()
        )
        .record(duration.as_secs_f64());
    }

    /// Record a failed publish
    pub fn record_publish_failure(&self, subject: &str) {
        counter!(
            "bus_publish_failures_total",
            "subject" => subject.to_string()
        )
        .increment(1);
    }

    /// Record a resolved delivery and the time spent in the handler
    pub fn record_delivery(&self, subject: &str, outcome: &'static str, duration: Duration) {
        counter!(
            "bus_deliveries_total",
            "subject" => subject.to_string(),
            "outcome" => outcome
        )
        .increment(1);

        histogram!(
            "bus_handler_duration_seconds",
            "subject" => subject.to_string()
        )
        .record(duration.as_secs_f64());
    }

    /// Record a bus error
    pub fn record_error(&self, error_type: &'static str) {
        counter!(
            "bus_errors_total",
            "error_type" => error_type
        )
        .increment(1);
    }

    /// Set broker connection status
    pub fn set_connected(&self, connected: bool) {
        gauge!("bus_connected").set(if connected { 1.0 } else { 0.0 });
    }

    /// Render metrics in Prometheus format
    ///
    /// Empty when another recorder owns the metrics registry.
    pub fn render(&self) -> String {
        self.handle
            .as_ref()
            .map(|handle| handle.render())
            .unwrap_or_default()
    }
}

impl Default for BusMetrics {
    fn default() -> Self {
        Self::new()
    }
}
