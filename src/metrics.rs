/// Metrics and telemetry
///
/// Prometheus-compatible counters for HTTP traffic, registrations,
/// contributions and notification delivery.

use lazy_static::lazy_static;
use prometheus::{
    register_gauge, register_histogram_vec, register_int_counter, register_int_counter_vec,
    Encoder, Gauge, HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // ========== Domain Metrics ==========

    /// Agent registrations
    pub static ref AGENT_REGISTRATIONS_TOTAL: IntCounter = register_int_counter!(
        "agent_registrations_total",
        "Total number of agent registrations"
    )
    .unwrap();

    /// Customers created
    pub static ref CUSTOMERS_CREATED_TOTAL: IntCounter = register_int_counter!(
        "customers_created_total",
        "Total number of customers created"
    )
    .unwrap();

    /// Payments recorded by receipt channel
    pub static ref PAYMENTS_RECORDED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "payments_recorded_total",
        "Total number of payments recorded",
        &["notify_type"]
    )
    .unwrap();

    /// Sum of recorded payment amounts
    pub static ref PAYMENT_AMOUNT_TOTAL: IntCounter = register_int_counter!(
        "payment_amount_total",
        "Sum of all recorded payment amounts"
    )
    .unwrap();

    /// Notification sends by channel and outcome
    pub static ref NOTIFICATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "notifications_total",
        "Total number of notification attempts",
        &["channel", "outcome"]
    )
    .unwrap();

    // ========== System Metrics ==========

    /// Application uptime in seconds
    pub static ref UPTIME_SECONDS: Gauge = register_gauge!(
        "uptime_seconds",
        "Application uptime in seconds"
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

pub fn record_agent_registration() {
    AGENT_REGISTRATIONS_TOTAL.inc();
}

pub fn record_customer_created() {
    CUSTOMERS_CREATED_TOTAL.inc();
}

/// Record a payment and its amount
pub fn record_payment(notify_type: &str, amount: i64) {
    PAYMENTS_RECORDED_TOTAL
        .with_label_values(&[notify_type])
        .inc();
    if amount > 0 {
        PAYMENT_AMOUNT_TOTAL.inc_by(amount as u64);
    }
}

/// Record a notification attempt
pub fn record_notification(channel: &str, outcome: &str) {
    NOTIFICATIONS_TOTAL
        .with_label_values(&[channel, outcome])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/customers/list", 200, 0.05);
        let metrics = render_metrics();
        assert!(metrics.contains("http_requests_total"));
        assert!(metrics.contains("http_request_duration_seconds"));
    }

    #[test]
    fn test_record_payment() {
        let before = PAYMENT_AMOUNT_TOTAL.get();
        record_payment("sms", 5000);
        assert!(PAYMENT_AMOUNT_TOTAL.get() >= before + 5000);
        assert!(render_metrics().contains("payments_recorded_total"));
    }

    #[test]
    fn test_record_notification() {
        record_notification("email", "skipped");
        let metrics = render_metrics();
        assert!(metrics.contains("notifications_total"));
    }
}
