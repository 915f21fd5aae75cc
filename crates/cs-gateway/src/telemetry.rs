//! Usage Telemetry Recorder
//!
//! Appends a usage record for every completed request so migration progress
//! (legacy vs. canonical traffic) can be tracked offline. Recording is
//! strictly fire-and-forget: the request path does a non-blocking send into
//! a bounded channel; a full or closed channel drops the record and bumps a
//! counter, and the response is never affected.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{info, warn};

use cs_common::{TelemetryStats, UsageRecord};

use crate::metrics;

/// Destination for usage records, consumed by a single drain task.
#[async_trait]
pub trait UsageSink: Send + Sync {
    async fn record(&self, record: UsageRecord);
}

/// Default sink: structured log lines, picked up by the log pipeline.
pub struct TracingSink;

#[async_trait]
impl UsageSink for TracingSink {
    async fn record(&self, record: UsageRecord) {
        if record.variant.is_legacy() {
            warn!(
                route = %record.route,
                caller = %record.caller,
                status = record.status,
                "Deprecated API usage"
            );
        } else {
            info!(
                route = %record.route,
                caller = %record.caller,
                status = record.status,
                "API usage"
            );
        }
    }
}

/// Test sink collecting records in memory.
#[derive(Default)]
pub struct MemorySink {
    records: parking_lot::Mutex<Vec<UsageRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<UsageRecord> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl UsageSink for MemorySink {
    async fn record(&self, record: UsageRecord) {
        self.records.lock().push(record);
    }
}

/// Hands records off the request path into the sink.
pub struct UsageRecorder {
    tx: mpsc::Sender<UsageRecord>,
    recorded: AtomicU64,
    dropped: AtomicU64,
}

impl UsageRecorder {
    /// Create a recorder with a bounded buffer and spawn its drain task.
    pub fn spawn(buffer_size: usize, sink: Arc<dyn UsageSink>) -> Arc<Self> {
        let (tx, mut rx) = mpsc::channel::<UsageRecord>(buffer_size);

        tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                sink.record(record).await;
            }
        });

        Arc::new(Self {
            tx,
            recorded: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        })
    }

    /// Enqueue a record without waiting. Never fails the caller.
    pub fn record(&self, record: UsageRecord) {
        match self.tx.try_send(record) {
            Ok(()) => {
                self.recorded.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                metrics::record_usage_dropped();
            }
        }
    }

    pub fn stats(&self) -> TelemetryStats {
        TelemetryStats {
            recorded: self.recorded.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_common::RouteVariant;
    use std::time::Duration;

    fn sample(route: &str) -> UsageRecord {
        UsageRecord::new(route, "semester", "list", RouteVariant::Canonical, 200, "anonymous")
    }

    #[tokio::test]
    async fn test_records_reach_sink() {
        let sink = Arc::new(MemorySink::new());
        let recorder = UsageRecorder::spawn(16, sink.clone());

        recorder.record(sample("GET /api/v2/semester/"));
        recorder.record(sample("GET /api/v2/semester/"));

        // Drain task runs on the same runtime; give it a beat
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(sink.records().len(), 2);
        assert_eq!(recorder.stats().recorded, 2);
        assert_eq!(recorder.stats().dropped, 0);
    }

    #[tokio::test]
    async fn test_full_buffer_drops_without_error() {
        // Sink that never drains
        struct StuckSink;
        #[async_trait]
        impl UsageSink for StuckSink {
            async fn record(&self, _record: UsageRecord) {
                futures::future::pending::<()>().await;
            }
        }

        let recorder = UsageRecorder::spawn(1, Arc::new(StuckSink));
        for _ in 0..10 {
            recorder.record(sample("GET /api/semester"));
        }

        let stats = recorder.stats();
        assert!(stats.dropped > 0, "overflow must be counted, not surfaced");
        assert_eq!(stats.recorded + stats.dropped, 10);
    }
}
