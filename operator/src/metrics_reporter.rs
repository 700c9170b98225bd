use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use kube::core::GroupVersionKind;
use prometheus::IntGaugeVec;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const METRIC_NAME: &str = "arcane_operator_stream_class_active";

#[derive(Clone)]
struct Entry {
    kind: String,
    group: String,
}

/// Periodically re-emits one gauge sample per registered StreamClass so a
/// scrape always reflects which Kinds currently have a running Stream
/// controller, not just the ones that changed since the last tick.
pub struct MetricsReporter {
    entries: RwLock<HashMap<String, Entry>>,
    gauge: IntGaugeVec,
}

impl MetricsReporter {
    pub fn new() -> Arc<Self> {
        let gauge = IntGaugeVec::new(
            prometheus::Opts::new(METRIC_NAME, "Whether a Stream controller is running for a StreamClass (1) or not."),
            &["stream_class", "kind", "group"],
        )
        .expect("static metric descriptor is well-formed");

        Arc::new(Self {
            entries: RwLock::new(HashMap::new()),
            gauge,
        })
    }

    pub fn registry_collector(&self) -> IntGaugeVec {
        self.gauge.clone()
    }

    pub async fn add_stream_class(&self, name: &str, gvk: &GroupVersionKind) {
        self.entries.write().await.insert(
            name.to_string(),
            Entry {
                kind: gvk.kind.clone(),
                group: gvk.group.clone(),
            },
        );
    }

    pub async fn remove_stream_class(&self, name: &str) {
        if let Some(entry) = self.entries.write().await.remove(name) {
            let _ = self.gauge.remove_label_values(&[name, &entry.kind, &entry.group]);
        }
    }

    async fn emit_once(&self) {
        let entries = self.entries.read().await;
        for (name, entry) in entries.iter() {
            self.gauge.with_label_values(&[name, &entry.kind, &entry.group]).set(1);
        }
        debug!(count = entries.len(), "emitted stream class metrics");
    }

    /// Runs the periodic emission loop until `shutdown` is cancelled.
    pub async fn run(self: Arc<Self>, initial_delay: Duration, report_interval: Duration, shutdown: CancellationToken) {
        tokio::select! {
            _ = tokio::time::sleep(initial_delay) => {}
            _ = shutdown.cancelled() => return,
        }

        let mut ticker = tokio::time::interval(report_interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => self.emit_once().await,
            }
        }
    }
}
