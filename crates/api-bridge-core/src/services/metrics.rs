//! Lock-free-on-the-hot-path metric collectors, exported by
//! `api-bridge-server`'s `/metrics` route.
//!
//! Atomic counters with a snapshot method, labeled per metric
//! (`http_requests_total{method,path,status}` and similar) rather than
//! one flat struct of unlabeled atomics. A label tuple is only
//! write-locked on first sight; every subsequent increment is a single
//! atomic fetch-add.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::services::circuit_breaker::CircuitState;

#[derive(Default)]
struct LabeledCounter {
    values: RwLock<HashMap<String, AtomicU64>>,
}

impl LabeledCounter {
    fn inc(&self, key: &str) {
        if let Some(counter) = self.values.read().unwrap().get(key) {
            counter.fetch_add(1, Ordering::Relaxed);
            return;
        }
        let mut values = self.values.write().unwrap();
        values
            .entry(key.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> Vec<(String, u64)> {
        self.values
            .read()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
            .collect()
    }
}

struct HistogramEntry {
    count: AtomicU64,
    sum_micros: AtomicU64,
}

#[derive(Default)]
struct LabeledHistogram {
    values: RwLock<HashMap<String, HistogramEntry>>,
}

impl LabeledHistogram {
    fn observe(&self, key: &str, duration: std::time::Duration) {
        let micros = duration.as_micros().min(u64::MAX as u128) as u64;
        if let Some(entry) = self.values.read().unwrap().get(key) {
            entry.count.fetch_add(1, Ordering::Relaxed);
            entry.sum_micros.fetch_add(micros, Ordering::Relaxed);
            return;
        }
        let mut values = self.values.write().unwrap();
        let entry = values.entry(key.to_string()).or_insert_with(|| HistogramEntry {
            count: AtomicU64::new(0),
            sum_micros: AtomicU64::new(0),
        });
        entry.count.fetch_add(1, Ordering::Relaxed);
        entry.sum_micros.fetch_add(micros, Ordering::Relaxed);
    }

    fn snapshot(&self) -> Vec<(String, u64, u64)> {
        self.values
            .read()
            .unwrap()
            .iter()
            .map(|(k, v)| {
                (
                    k.clone(),
                    v.count.load(Ordering::Relaxed),
                    v.sum_micros.load(Ordering::Relaxed),
                )
            })
            .collect()
    }
}

#[derive(Default)]
struct Gauge {
    values: RwLock<HashMap<String, f64>>,
}

impl Gauge {
    fn set(&self, key: &str, value: f64) {
        self.values.write().unwrap().insert(key.to_string(), value);
    }

    fn snapshot(&self) -> Vec<(String, f64)> {
        self.values
            .read()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }
}

/// The process-wide metric collector, shared via `Arc` across the
/// Processor, Dispatcher, Orchestration Engine and Circuit Breaker
/// Registry. Every method name maps directly to a metric listed in the
/// external interface this process exposes.
#[derive(Default)]
pub struct MetricsCollector {
    http_requests_total: LabeledCounter,
    external_api_calls_total: LabeledCounter,
    cache_hits_total: AtomicU64,
    cache_misses_total: AtomicU64,
    default_routing_used_total: LabeledCounter,
    api_mode_transitions: LabeledCounter,
    circuit_breaker_state_change: LabeledCounter,
    parallel_api_calls_failed: AtomicU64,

    http_request_duration_seconds: LabeledHistogram,
    external_api_call_duration_seconds: LabeledHistogram,
    parallel_api_call_duration: LabeledHistogram,
    circuit_breaker_execution_duration: LabeledHistogram,

    api_comparison_match_rate: Gauge,
}

impl MetricsCollector {
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration: std::time::Duration) {
        self.http_requests_total
            .inc(&format!("{}:{}:{}", method, path, status));
        self.http_request_duration_seconds
            .observe(&format!("{}:{}", method, path), duration);
    }

    pub fn record_external_api_call(&self, endpoint: &str, success: bool, duration: std::time::Duration) {
        self.external_api_calls_total
            .inc(&format!("{}:{}", endpoint, success));
        self.external_api_call_duration_seconds
            .observe(endpoint, duration);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_default_routing_used(&self, method: &str, path: &str) {
        self.default_routing_used_total
            .inc(&format!("{}:{}", method, path));
    }

    pub fn record_mode_transition(&self, rule_id: &str, from: &str, to: &str) {
        self.api_mode_transitions
            .inc(&format!("{}:{}:{}", rule_id, from, to));
    }

    pub fn record_circuit_breaker_state_change(&self, name: &str, from: &str, to: &str) {
        self.circuit_breaker_state_change
            .inc(&format!("{}:{}:{}", name, from, to));
    }

    pub fn record_circuit_breaker_execution(&self, name: &str, duration: std::time::Duration) {
        self.circuit_breaker_execution_duration.observe(name, duration);
    }

    pub fn record_parallel_call(&self, rule_id: &str, duration: std::time::Duration, failed: bool) {
        self.parallel_api_call_duration.observe(rule_id, duration);
        if failed {
            self.parallel_api_calls_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn set_comparison_match_rate(&self, routing_rule_id: &str, rate: f64) {
        self.api_comparison_match_rate.set(routing_rule_id, rate);
    }

    /// Renders every collected metric in Prometheus text exposition format.
    pub fn render_prometheus(&self) -> String {
        let mut out = String::new();

        render_counter(&mut out, "http_requests_total", &self.http_requests_total, &["method", "path", "status"]);
        render_counter(&mut out, "external_api_calls_total", &self.external_api_calls_total, &["endpoint", "success"]);
        render_counter(&mut out, "default_routing_used_total", &self.default_routing_used_total, &["method", "path"]);
        render_counter(&mut out, "api_mode_transitions", &self.api_mode_transitions, &["rule_id", "from", "to"]);
        render_counter(&mut out, "circuit_breaker_state_change", &self.circuit_breaker_state_change, &["name", "from", "to"]);

        out.push_str(&format!(
            "# TYPE cache_hits_total counter\ncache_hits_total {}\n",
            self.cache_hits_total.load(Ordering::Relaxed)
        ));
        out.push_str(&format!(
            "# TYPE cache_misses_total counter\ncache_misses_total {}\n",
            self.cache_misses_total.load(Ordering::Relaxed)
        ));
        out.push_str(&format!(
            "# TYPE parallel_api_calls_failed counter\nparallel_api_calls_failed {}\n",
            self.parallel_api_calls_failed.load(Ordering::Relaxed)
        ));

        render_histogram(&mut out, "http_request_duration_seconds", &self.http_request_duration_seconds, &["method", "path"]);
        render_histogram(&mut out, "external_api_call_duration_seconds", &self.external_api_call_duration_seconds, &["endpoint"]);
        render_histogram(&mut out, "parallel_api_call_duration", &self.parallel_api_call_duration, &["rule_id"]);
        render_histogram(&mut out, "circuit_breaker_execution_duration", &self.circuit_breaker_execution_duration, &["name"]);

        out.push_str("# TYPE api_comparison_match_rate gauge\n");
        for (key, value) in self.api_comparison_match_rate.snapshot() {
            out.push_str(&format!("api_comparison_match_rate{{rule_id=\"{}\"}} {}\n", key, value));
        }

        out
    }
}

fn render_counter(out: &mut String, name: &str, counter: &LabeledCounter, label_names: &[&str]) {
    out.push_str(&format!("# TYPE {} counter\n", name));
    for (key, value) in counter.snapshot() {
        out.push_str(&format!("{}{{{}}} {}\n", name, labels(&key, label_names), value));
    }
}

fn render_histogram(out: &mut String, name: &str, histogram: &LabeledHistogram, label_names: &[&str]) {
    out.push_str(&format!("# TYPE {} histogram\n", name));
    for (key, count, sum_micros) in histogram.snapshot() {
        let labels = labels(&key, label_names);
        out.push_str(&format!("{}_count{{{}}} {}\n", name, labels, count));
        out.push_str(&format!(
            "{}_sum{{{}}} {}\n",
            name,
            labels,
            sum_micros as f64 / 1_000_000.0
        ));
    }
}

fn labels(key: &str, label_names: &[&str]) -> String {
    let parts: Vec<&str> = key.splitn(label_names.len(), ':').collect();
    label_names
        .iter()
        .zip(parts.iter())
        .map(|(name, value)| format!("{}=\"{}\"", name, value))
        .collect::<Vec<_>>()
        .join(",")
}

/// Exposed for documentation purposes: the values [`MetricsCollector`]'s
/// breaker-state labels take, matching
/// [`crate::services::circuit_breaker::CircuitState::as_str`].
pub const CIRCUIT_STATES: [CircuitState; 3] = [
    CircuitState::Closed,
    CircuitState::Open,
    CircuitState::HalfOpen,
];
