//! Minimal metrics registry for the server.
//!
//! Counter/gauge/histogram types with dynamic labels backed by `DashMap`.
//! Labels are flattened into sorted key vectors, and series are sorted again at
//! render time so the exposition output is deterministic. Histogram buckets are
//! fixed in microseconds to keep the hot path integer-only; they are rendered
//! in seconds.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, Instant};

type LabelKey = Vec<(String, String)>;

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn label_key(labels: &[(&str, &str)]) -> LabelKey {
    let mut key: LabelKey = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn label_str(key: &LabelKey) -> String {
    key.iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

fn write_header(out: &mut String, name: &str, help: &str, kind: &str) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} {}", name, kind);
}

fn micros_as_secs(micros: u64) -> f64 {
    micros as f64 / 1_000_000.0
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl CounterVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) {
        let counter = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Current value for a label set (0 when never touched).
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Render in Prometheus text exposition format.
    fn render(&self, name: &str, help: &str, out: &mut String) {
        write_header(out, name, help, "counter");
        let mut rows: Vec<(String, u64)> = self
            .map
            .iter()
            .map(|r| (label_str(r.key()), r.value().load(Ordering::Relaxed)))
            .collect();
        rows.sort();
        for (labels, val) in rows {
            let _ = writeln!(out, "{}{{{}}} {}", name, labels, val);
        }
    }
}

/// Unlabeled gauge.
#[derive(Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    pub fn set(&self, v: i64) {
        self.value.store(v, Ordering::Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    fn render(&self, name: &str, help: &str, out: &mut String) {
        write_header(out, name, help, "gauge");
        let _ = writeln!(out, "{} {}", name, self.get());
    }
}

// Fixed buckets in microseconds:
// 100us, 500us, 1ms, 5ms, 10ms, 50ms, 100ms, 500ms, 1s
const BUCKETS_MICROS: [u64; 9] = [
    100, 500, 1_000, 5_000, 10_000, 50_000, 100_000, 500_000, 1_000_000,
];

#[derive(Default)]
struct AtomicHistogram {
    count: AtomicU64,
    sum: AtomicU64,
    buckets: [AtomicU64; 9],
}

#[derive(Default)]
pub struct HistogramVec {
    map: DashMap<LabelKey, AtomicHistogram>,
}

impl HistogramVec {
    /// Observe a duration and increment cumulative buckets (microsecond scale).
    pub fn observe(&self, labels: &[(&str, &str)], duration: Duration) {
        let hist = self
            .map
            .entry(label_key(labels))
            .or_insert_with(AtomicHistogram::default);
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);

        hist.count.fetch_add(1, Ordering::Relaxed);
        hist.sum.fetch_add(micros, Ordering::Relaxed);

        for (i, &b) in BUCKETS_MICROS.iter().enumerate() {
            if micros <= b {
                hist.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Number of observations for a label set.
    pub fn count(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|h| h.count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Render in Prometheus text exposition format (unit: seconds).
    fn render(&self, name: &str, help: &str, out: &mut String) {
        write_header(out, name, help, "histogram");

        let mut keys: Vec<LabelKey> = self.map.iter().map(|r| r.key().clone()).collect();
        keys.sort();

        for key in keys {
            let Some(hist) = self.map.get(&key) else { continue };
            let labels = label_str(&key);
            let prefix = if labels.is_empty() { String::new() } else { format!("{},", labels) };

            for (i, &le) in BUCKETS_MICROS.iter().enumerate() {
                let count = hist.buckets[i].load(Ordering::Relaxed);
                let le = micros_as_secs(le);
                let _ = writeln!(out, "{}_bucket{{{}le=\"{}\"}} {}", name, prefix, le, count);
            }
            let count = hist.count.load(Ordering::Relaxed);
            let _ = writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", name, prefix, count);

            let sum = micros_as_secs(hist.sum.load(Ordering::Relaxed));
            let _ = writeln!(out, "{}_sum{{{}}} {}", name, labels, sum);
            let _ = writeln!(out, "{}_count{{{}}} {}", name, labels, count);
        }
    }
}

/// Per-endpoint request instrumentation.
#[derive(Default)]
pub struct KvMetrics {
    pub request_duration: HistogramVec,
    pub status_codes: CounterVec,
    pub total_keys: Gauge,
}

impl KvMetrics {
    /// Start timing a request; the duration is recorded when the timer drops.
    pub fn start_timer(&self, endpoint: &'static str) -> RequestTimer<'_> {
        RequestTimer {
            metrics: self,
            endpoint,
            started: Instant::now(),
        }
    }

    pub fn record_status(&self, endpoint: &str, status: u16) {
        let status = status.to_string();
        self.status_codes.inc(&[("endpoint", endpoint), ("status", &status)]);
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.request_duration.render(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
            &mut out,
        );
        self.status_codes.render(
            "http_status_codes_total",
            "Total HTTP status codes per endpoint",
            &mut out,
        );
        self.total_keys.render("total_keys", "Total number of keys in the DB", &mut out);
        out
    }
}

/// Records the elapsed time into `request_duration` on drop.
pub struct RequestTimer<'a> {
    metrics: &'a KvMetrics,
    endpoint: &'static str,
    started: Instant,
}

impl Drop for RequestTimer<'_> {
    fn drop(&mut self) {
        self.metrics
            .request_duration
            .observe(&[("endpoint", self.endpoint)], self.started.elapsed());
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn counter_labels_are_order_insensitive() {
        let c = CounterVec::default();
        c.inc(&[("endpoint", "getHandler"), ("status", "200")]);
        c.inc(&[("status", "200"), ("endpoint", "getHandler")]);
        assert_eq!(c.get(&[("endpoint", "getHandler"), ("status", "200")]), 2);
    }

    #[test]
    fn histogram_buckets_are_cumulative() {
        let h = HistogramVec::default();
        h.observe(&[("endpoint", "x")], Duration::from_micros(50));
        h.observe(&[("endpoint", "x")], Duration::from_millis(20));

        let mut out = String::new();
        h.render("lat", "latency", &mut out);

        assert!(out.contains("lat_bucket{endpoint=\"x\",le=\"0.0001\"} 1"));
        assert!(out.contains("lat_bucket{endpoint=\"x\",le=\"0.05\"} 2"));
        assert!(out.contains("lat_bucket{endpoint=\"x\",le=\"+Inf\"} 2"));
        assert!(out.contains("lat_count{endpoint=\"x\"} 2"));
        assert!(out.contains("lat_sum{endpoint=\"x\"} 0.02005"));
    }

    #[test]
    fn timer_observes_on_drop() {
        let m = KvMetrics::default();
        {
            let _t = m.start_timer("setHandler");
        }
        assert_eq!(m.request_duration.count(&[("endpoint", "setHandler")]), 1);
    }

    #[test]
    fn render_contains_all_families() {
        let m = KvMetrics::default();
        m.record_status("searchHandler", 200);
        m.total_keys.set(7);

        let out = m.render();
        assert!(out.contains("# TYPE http_request_duration_seconds histogram"));
        assert!(out.contains(
            "http_status_codes_total{endpoint=\"searchHandler\",status=\"200\"} 1"
        ));
        assert!(out.contains("# TYPE total_keys gauge\ntotal_keys 7\n"));
    }

    #[test]
    fn label_values_are_escaped() {
        assert_eq!(escape_label("a\"b\\c\nd"), "a\\\"b\\\\c\\nd");
    }
}
