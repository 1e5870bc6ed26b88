//! Prometheus metrics collection for lexparty.
//!
//! Exposed on the health server's `/metrics` endpoint. Every recorder is a
//! no-op until [`init`] has run, so sessions can be exercised in tests
//! without a registry.
//!
//! - `lexparty_updates_total{kind}` - inbound updates by kind
//! - `lexparty_command_total{command}` - commands dispatched by name
//! - `lexparty_command_duration_seconds{command}` - command latency
//! - `lexparty_handler_errors_total{error}` - failed updates by error code
//! - `lexparty_active_matches`, `lexparty_building_sessions` - live sessions

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters
// ========================================================================

/// Inbound updates by kind (message, callback).
pub static UPDATES: OnceLock<IntCounterVec> = OnceLock::new();

/// Commands dispatched by name.
pub static COMMAND_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

/// Command latency by name.
pub static COMMAND_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Updates whose processing failed, by error code.
pub static HANDLER_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Outbound sends rejected by the platform or the network.
pub static SEND_FAILURES: OnceLock<IntCounter> = OnceLock::new();

/// Matches that reached the results screen.
pub static MATCHES_FINISHED: OnceLock<IntCounter> = OnceLock::new();

/// Matches written to the snapshot store at shutdown.
pub static MATCHES_SNAPSHOTTED: OnceLock<IntCounter> = OnceLock::new();

// ========================================================================
// Gauges
// ========================================================================

/// Live match sessions.
pub static ACTIVE_MATCHES: OnceLock<IntGauge> = OnceLock::new();

/// Live building sessions.
pub static BUILDING_SESSIONS: OnceLock<IntGauge> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Call once at startup before serving `/metrics`. Later calls are no-ops.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            if $metric.get().is_none() {
                match $init {
                    Ok(m) => {
                        if let Err(e) = r.register(Box::new(m.clone())) {
                            tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                        }
                        let _ = $metric.set(m);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                    }
                }
            }
        };
    }

    register!(UPDATES, IntCounterVec::new(Opts::new("lexparty_updates_total", "Inbound updates by kind"), &["kind"]));
    register!(COMMAND_COUNTER, IntCounterVec::new(Opts::new("lexparty_command_total", "Commands dispatched by name"), &["command"]));
    register!(COMMAND_LATENCY, HistogramVec::new(
        HistogramOpts::new("lexparty_command_duration_seconds", "Command latency by name")
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["command"]));
    register!(HANDLER_ERRORS, IntCounterVec::new(Opts::new("lexparty_handler_errors_total", "Failed updates by error code"), &["error"]));
    register!(SEND_FAILURES, IntCounter::new("lexparty_send_failures_total", "Outbound sends that failed"));
    register!(MATCHES_FINISHED, IntCounter::new("lexparty_matches_finished_total", "Matches that reached the results"));
    register!(MATCHES_SNAPSHOTTED, IntCounter::new("lexparty_matches_snapshotted_total", "Matches snapshotted at shutdown"));
    register!(ACTIVE_MATCHES, IntGauge::new("lexparty_active_matches", "Live match sessions"));
    register!(BUILDING_SESSIONS, IntGauge::new("lexparty_building_sessions", "Live building sessions"));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Recorders
// ============================================================================

#[inline]
pub fn record_update(kind: &str) {
    if let Some(c) = UPDATES.get() {
        c.with_label_values(&[kind]).inc();
    }
}

/// Record a command execution with latency.
#[inline]
pub fn record_command(command: &str, duration_secs: f64) {
    if let Some(c) = COMMAND_COUNTER.get() {
        c.with_label_values(&[command]).inc();
    }
    if let Some(h) = COMMAND_LATENCY.get() {
        h.with_label_values(&[command]).observe(duration_secs);
    }
}

#[inline]
pub fn record_handler_error(error: &str) {
    if let Some(c) = HANDLER_ERRORS.get() {
        c.with_label_values(&[error]).inc();
    }
}

#[inline]
pub fn record_send_failure() {
    if let Some(c) = SEND_FAILURES.get() {
        c.inc();
    }
}

#[inline]
pub fn record_match_finished() {
    if let Some(c) = MATCHES_FINISHED.get() {
        c.inc();
    }
}

#[inline]
pub fn record_snapshot() {
    if let Some(c) = MATCHES_SNAPSHOTTED.get() {
        c.inc();
    }
}

#[inline]
pub fn set_active_matches(count: usize) {
    if let Some(g) = ACTIVE_MATCHES.get() {
        g.set(count as i64);
    }
}

#[inline]
pub fn set_building_sessions(count: usize) {
    if let Some(g) = BUILDING_SESSIONS.get() {
        g.set(count as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_lifecycle() {
        init();
        init();

        record_update("message");
        record_command("start", 0.001);
        record_handler_error("unknown_code");
        set_active_matches(2);

        let output = gather_metrics();
        assert!(output.contains("lexparty_updates_total"));
        assert!(output.contains("lexparty_command_total"));
        assert!(output.contains("lexparty_handler_errors_total"));
        assert!(output.contains("lexparty_active_matches"));
    }
}
