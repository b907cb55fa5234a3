//! Process-wide counters, audit/query log lines, and a thread-local capture of aggregation
//! stage events for deterministic assertions in tests.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use serde::Serialize;

pub const AUDIT_TARGET: &str = "bsonite::audit";
pub const METRICS_TARGET: &str = "bsonite::metrics";

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub slow_query_ms: u64,
    pub enable_audit: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { slow_query_ms: 500, enable_audit: true }
    }
}

#[derive(Default)]
pub struct Metrics {
    pub queries_total: AtomicU64,
    pub queries_slow_total: AtomicU64,
    pub writes_total: AtomicU64,
    pub audits_total: AtomicU64,
    pub documents_scanned: AtomicU64,
}

#[derive(Default)]
pub struct Telemetry {
    pub cfg: RwLock<TelemetryConfig>,
    pub metrics: Metrics,
    // For tests we can capture audit lines in-memory
    audit_sink: RwLock<Option<Arc<RwLock<Vec<String>>>>>,
}

pub(crate) static TELEMETRY: LazyLock<Telemetry> = LazyLock::new(Telemetry::default);

pub fn set_slow_query_ms(ms: u64) {
    TELEMETRY.cfg.write().slow_query_ms = ms;
}

pub fn set_audit_enabled(enabled: bool) {
    TELEMETRY.cfg.write().enable_audit = enabled;
}

pub fn set_audit_sink_for_tests(sink: Arc<RwLock<Vec<String>>>) {
    *TELEMETRY.audit_sink.write() = Some(sink);
}

fn now_ts() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub(crate) fn record_scanned(n: u64) {
    TELEMETRY.metrics.documents_scanned.fetch_add(n, Ordering::Relaxed);
}

/// Counts a query and emits a metrics line, at `warn` when it crossed the slow threshold.
pub fn log_query(
    namespace: &str,
    filter_dbg: &str,
    duration_ms: u128,
    limit: Option<usize>,
    skip: Option<usize>,
) {
    TELEMETRY.metrics.queries_total.fetch_add(1, Ordering::Relaxed);
    let slow_ms = TELEMETRY.cfg.read().slow_query_ms;
    let slow = u64::try_from(duration_ms).map_or(true, |ms| ms >= slow_ms);
    let line = serde_json::json!({
        "ts": now_ts(),
        "namespace": namespace,
        "filter": filter_dbg,
        "duration_ms": u64::try_from(duration_ms).unwrap_or(u64::MAX),
        "limit": limit,
        "skip": skip,
        "slow": slow
    })
    .to_string();
    if slow {
        TELEMETRY.metrics.queries_slow_total.fetch_add(1, Ordering::Relaxed);
        log::warn!(target: METRICS_TARGET, "{line}");
    } else {
        log::debug!(target: METRICS_TARGET, "{line}");
    }
}

/// Counts a write and, when auditing is enabled, records who touched which document.
pub fn log_audit(op: &str, namespace: &str, doc_id: &str) {
    TELEMETRY.metrics.writes_total.fetch_add(1, Ordering::Relaxed);
    if !TELEMETRY.cfg.read().enable_audit {
        return;
    }
    TELEMETRY.metrics.audits_total.fetch_add(1, Ordering::Relaxed);
    let line = serde_json::json!({
        "ts": now_ts(), "op": op, "namespace": namespace, "doc_id": doc_id
    })
    .to_string();
    let sink = TELEMETRY.audit_sink.read().clone();
    if let Some(sink) = sink {
        sink.write().push(line.clone());
    }
    log::info!(target: AUDIT_TARGET, "{line}");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub queries_total: u64,
    pub queries_slow_total: u64,
    pub writes_total: u64,
    pub audits_total: u64,
    pub documents_scanned: u64,
}

#[must_use]
pub fn metrics_snapshot() -> MetricsSnapshot {
    let m = &TELEMETRY.metrics;
    MetricsSnapshot {
        queries_total: m.queries_total.load(Ordering::Relaxed),
        queries_slow_total: m.queries_slow_total.load(Ordering::Relaxed),
        writes_total: m.writes_total.load(Ordering::Relaxed),
        audits_total: m.audits_total.load(Ordering::Relaxed),
        documents_scanned: m.documents_scanned.load(Ordering::Relaxed),
    }
}

/// OpenMetrics/Prometheus exposition format (no types/HELP for brevity)
#[must_use]
pub fn metrics_text() -> String {
    let m = metrics_snapshot();
    format!(
        "bsonite_queries_total {}\n\
         bsonite_queries_slow_total {}\n\
         bsonite_writes_total {}\n\
         bsonite_audits_total {}\n\
         bsonite_documents_scanned {}\n",
        m.queries_total, m.queries_slow_total, m.writes_total, m.audits_total, m.documents_scanned,
    )
}

// --- Aggregation stage events ---

/// One pipeline stage: its name and how many documents went in and came out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageEvent {
    pub stage: String,
    pub input: usize,
    pub output: usize,
}

thread_local! {
    static TL_STAGES: RefCell<Option<Vec<StageEvent>>> = const { RefCell::new(None) };
}

/// Guard that disables stage capture on drop.
pub struct StageCaptureGuard;

impl Drop for StageCaptureGuard {
    fn drop(&mut self) {
        TL_STAGES.with(|s| *s.borrow_mut() = None);
    }
}

/// Enables stage capture for the current thread until the guard drops.
pub fn capture_stage_events() -> StageCaptureGuard {
    TL_STAGES.with(|s| *s.borrow_mut() = Some(Vec::new()));
    StageCaptureGuard
}

pub(crate) fn record_stage(event: StageEvent) {
    log::trace!(
        target: METRICS_TARGET,
        "{{\"stage\":\"{}\",\"input\":{},\"output\":{}}}",
        event.stage,
        event.input,
        event.output
    );
    TL_STAGES.with(|s| {
        if let Some(buf) = s.borrow_mut().as_mut() {
            buf.push(event);
        }
    });
}

/// Drains the events captured on this thread; empty when capture is off.
pub fn drain_stage_events() -> Vec<StageEvent> {
    TL_STAGES.with(|s| s.borrow_mut().as_mut().map(std::mem::take).unwrap_or_default())
}
