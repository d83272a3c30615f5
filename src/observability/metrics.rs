//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_admission_decisions_total` (counter): decisions by scope, outcome
//! - `gate_store_failovers_total` (counter): shared→local transitions
//! - `gate_store_recoveries_total` (counter): local→shared transitions
//! - `gate_violation_reports_total` (counter): reports by outcome
//!
//! # Design Decisions
//! - Updates are cheap atomic increments behind the `metrics` facade
//! - Transition counters pair with the once-per-transition warning logs

use std::net::SocketAddr;

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    if let Err(error) = PrometheusBuilder::new().with_http_listener(addr).install() {
        tracing::error!(%error, "failed to install Prometheus exporter");
        return;
    }

    describe_counter!(
        "gate_admission_decisions_total",
        "Admission decisions by scope and outcome"
    );
    describe_counter!(
        "gate_store_failovers_total",
        "Transitions from the shared counter backend to the in-process store"
    );
    describe_counter!(
        "gate_store_recoveries_total",
        "Recoveries back to the shared counter backend"
    );
    describe_counter!(
        "gate_violation_reports_total",
        "CSP violation reports by outcome"
    );

    tracing::info!(address = %addr, "metrics exporter listening");
}

pub fn record_decision(scope: &'static str, outcome: &'static str) {
    counter!("gate_admission_decisions_total", "scope" => scope, "outcome" => outcome)
        .increment(1);
}

pub fn record_store_failover() {
    counter!("gate_store_failovers_total").increment(1);
}

pub fn record_store_recovery() {
    counter!("gate_store_recoveries_total").increment(1);
}

pub fn record_report(outcome: &'static str) {
    counter!("gate_violation_reports_total", "outcome" => outcome).increment(1);
}
