//! Metrics (§10 "Metrics"): per-stage throughput, latency, and error-rate
//! counters/histograms registered with `prometheus`, exposed over a minimal
//! hand-rolled HTTP endpoint rather than a full web framework crate for one
//! route. The exposition endpoint is a bare `tokio::net::TcpListener` loop
//! that answers every request with the text exposition format.

use std::net::SocketAddr;
use std::sync::Arc;

use prometheus::{CounterVec, HistogramVec, IntGaugeVec, Registry};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Process-wide metric handles, one instance shared (via `Arc`) across every
/// worker and the discovery loop.
pub struct Metrics {
    pub registry: Registry,
    pub stage_completed_total: CounterVec,
    pub stage_failed_total: CounterVec,
    pub stage_duration_seconds: HistogramVec,
    pub circuit_breaker_state: IntGaugeVec,
    pub queue_depth: IntGaugeVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let stage_completed_total = CounterVec::new(
            prometheus::Opts::new("clipforge_stage_completed_total", "Stage executions that committed success"),
            &["stage"],
        )?;
        let stage_failed_total = CounterVec::new(
            prometheus::Opts::new("clipforge_stage_failed_total", "Stage executions that committed failure"),
            &["stage", "error_kind"],
        )?;
        let stage_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "clipforge_stage_duration_seconds",
                "Wall-clock duration of a single stage execution",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
            &["stage"],
        )?;
        let circuit_breaker_state = IntGaugeVec::new(
            prometheus::Opts::new(
                "clipforge_circuit_breaker_state",
                "0=closed, 1=half_open, 2=open, sampled on each discovery tick",
            ),
            &["service", "op_class"],
        )?;
        let queue_depth = IntGaugeVec::new(
            prometheus::Opts::new("clipforge_stage_queue_depth", "Approximate pending jobs per stage queue"),
            &["stage"],
        )?;

        registry.register(Box::new(stage_completed_total.clone()))?;
        registry.register(Box::new(stage_failed_total.clone()))?;
        registry.register(Box::new(stage_duration_seconds.clone()))?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;
        registry.register(Box::new(queue_depth.clone()))?;

        Ok(Self { registry, stage_completed_total, stage_failed_total, stage_duration_seconds, circuit_breaker_state, queue_depth })
    }

    pub fn record_circuit_breaker_snapshot(&self, snapshots: &[clipforge_resilience::CircuitBreakerSnapshot]) {
        use clipforge_resilience::CircuitState;
        for snapshot in snapshots {
            let value = match snapshot.state {
                CircuitState::Closed => 0,
                CircuitState::HalfOpen => 1,
                CircuitState::Open => 2,
            };
            self.circuit_breaker_state
                .with_label_values(&[&snapshot.service, &snapshot.op_class])
                .set(value);
        }
    }

    fn exposition_text(&self) -> String {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        if let Err(err) = encoder.encode(&metric_families, &mut buf) {
            tracing::warn!(?err, "failed to encode metrics");
            return String::new();
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// Serves `GET /metrics` (and a bare 404 for anything else) until
/// `cancellation` fires. Errors accepting an individual connection are
/// logged and do not bring down the listener.
pub async fn serve(metrics: Arc<Metrics>, addr: SocketAddr, cancellation: CancellationToken) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "metrics endpoint listening");
    loop {
        tokio::select! {
            _ = cancellation.cancelled() => return Ok(()),
            accepted = listener.accept() => {
                let (mut socket, _) = match accepted {
                    Ok(pair) => pair,
                    Err(err) => {
                        tracing::warn!(?err, "failed to accept metrics connection");
                        continue;
                    }
                };
                let metrics = metrics.clone();
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let Ok(n) = socket.read(&mut buf).await else { return };
                    let request = String::from_utf8_lossy(&buf[..n]);
                    let body = if request.starts_with("GET /metrics") {
                        metrics.exposition_text()
                    } else {
                        String::new()
                    };
                    let status = if body.is_empty() { "404 Not Found" } else { "200 OK" };
                    let response = format!(
                        "HTTP/1.1 {status}\r\nContent-Type: text/plain; version=0.0.4\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_without_duplicate_metric_name_conflicts() {
        let metrics = Metrics::new().unwrap();
        metrics.stage_completed_total.with_label_values(&["scripting"]).inc();
        let text = metrics.exposition_text();
        assert!(text.contains("clipforge_stage_completed_total"));
    }
}
