//! Latency and throughput instrumentation
//!
//! Records per-component latency samples and throughput counters and
//! evaluates them against configured SLA thresholds. Percentiles are
//! computed over a bounded rolling window (most recent 1000 samples by
//! default) to bound memory.
//!
//! The monitor is constructed once at startup and shared by reference
//! across call sites; all counters are lock-protected and safe to
//! update concurrently.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use serde::Serialize;
use tracing::warn;
use types::errors::ConfigError;

/// Well-known component names used across the pipeline.
pub mod component {
    pub const VALIDATION: &str = "validation";
    pub const ORDERBOOK: &str = "orderbook_analysis";
    pub const AGGREGATION: &str = "aggregation";
    pub const BUFFER: &str = "buffer_ops";
}

/// Monitor configuration; validated at construction.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Rolling window size for percentile statistics.
    pub window_size: usize,
    /// Minimum acceptable throughput in ops/sec, enforced only once
    /// throughput has been recorded for a component.
    pub throughput_floor: f64,
    /// Threshold applied to components without an explicit override.
    pub default_threshold_ms: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window_size: 1000,
            throughput_floor: 100.0,
            default_threshold_ms: 50.0,
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::InvalidCapacity {
                value: self.window_size,
            });
        }
        if self.default_threshold_ms <= 0.0 {
            return Err(ConfigError::InvalidThreshold {
                name: "default_threshold_ms".to_string(),
                value: self.default_threshold_ms.to_string(),
            });
        }
        if self.throughput_floor < 0.0 {
            return Err(ConfigError::InvalidThreshold {
                name: "throughput_floor".to_string(),
                value: self.throughput_floor.to_string(),
            });
        }
        Ok(())
    }
}

/// Latency statistics for one component.
#[derive(Debug, Clone, Serialize)]
pub struct LatencyStats {
    pub count: u64,
    pub sum_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub avg_ms: f64,
    /// 95th percentile over the rolling window.
    pub p95_ms: f64,
    /// 99th percentile over the rolling window.
    pub p99_ms: f64,
}

/// SLA evaluation for one component.
#[derive(Debug, Clone, Serialize)]
pub struct SlaCompliance {
    pub component: String,
    pub compliant: bool,
    pub violations: Vec<String>,
    pub avg_ms: f64,
    pub p95_ms: f64,
    pub throughput: f64,
    pub threshold_ms: f64,
}

/// Overall service grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PerformanceGrade {
    A,
    B,
    C,
}

/// Aggregate performance report across all instrumented components.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    pub grade: PerformanceGrade,
    pub overall_avg_ms: f64,
    pub components: Vec<SlaCompliance>,
}

/// Opaque timer handle returned by [`PerformanceMonitor::start_timer`].
#[derive(Debug)]
pub struct TimerToken {
    started: Instant,
}

struct ComponentMetrics {
    window: VecDeque<f64>,
    count: u64,
    sum_ms: f64,
    min_ms: f64,
    max_ms: f64,
    ops: u64,
    /// First sample or last reset; anchors throughput measurement.
    epoch: Instant,
}

impl ComponentMetrics {
    fn new() -> Self {
        Self {
            window: VecDeque::new(),
            count: 0,
            sum_ms: 0.0,
            min_ms: f64::INFINITY,
            max_ms: 0.0,
            ops: 0,
            epoch: Instant::now(),
        }
    }

    fn record(&mut self, ms: f64, window_size: usize) {
        if self.window.len() >= window_size {
            self.window.pop_front();
        }
        self.window.push_back(ms);
        self.count += 1;
        self.sum_ms += ms;
        if ms < self.min_ms {
            self.min_ms = ms;
        }
        if ms > self.max_ms {
            self.max_ms = ms;
        }
    }

    fn percentile(&self, p: f64) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<f64> = self.window.iter().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let idx = (p / 100.0 * (sorted.len() - 1) as f64).round() as usize;
        sorted[idx.min(sorted.len() - 1)]
    }

    fn stats(&self) -> LatencyStats {
        let avg_ms = if self.count == 0 {
            0.0
        } else {
            self.sum_ms / self.count as f64
        };
        LatencyStats {
            count: self.count,
            sum_ms: self.sum_ms,
            min_ms: if self.count == 0 { 0.0 } else { self.min_ms },
            max_ms: self.max_ms,
            avg_ms,
            p95_ms: self.percentile(95.0),
            p99_ms: self.percentile(99.0),
        }
    }

    /// Ops per elapsed second since the epoch.
    fn throughput(&self) -> f64 {
        let elapsed = self.epoch.elapsed().as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        self.ops as f64 / elapsed
    }
}

/// Records latency/throughput per component and checks SLA compliance.
pub struct PerformanceMonitor {
    config: MonitorConfig,
    thresholds: Mutex<BTreeMap<String, f64>>,
    metrics: Mutex<BTreeMap<String, ComponentMetrics>>,
}

impl PerformanceMonitor {
    /// Create a monitor with the given configuration and the standard
    /// per-component thresholds.
    pub fn new(config: MonitorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            thresholds: Mutex::new(Self::default_thresholds()),
            metrics: Mutex::new(BTreeMap::new()),
        })
    }

    /// Create a monitor with default configuration.
    pub fn with_defaults() -> Self {
        Self {
            config: MonitorConfig::default(),
            thresholds: Mutex::new(Self::default_thresholds()),
            metrics: Mutex::new(BTreeMap::new()),
        }
    }

    fn default_thresholds() -> BTreeMap<String, f64> {
        let mut t = BTreeMap::new();
        t.insert(component::ORDERBOOK.to_string(), 5.0);
        t.insert(component::VALIDATION.to_string(), 10.0);
        t.insert(component::AGGREGATION.to_string(), 50.0);
        t.insert(component::BUFFER.to_string(), 1.0);
        t
    }

    fn lock_metrics(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, ComponentMetrics>> {
        self.metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_thresholds(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, f64>> {
        self.thresholds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Start timing an operation.
    pub fn start_timer(&self, _component: &str) -> TimerToken {
        TimerToken {
            started: Instant::now(),
        }
    }

    /// Stop the timer, record the sample, and return the elapsed
    /// milliseconds.
    pub fn end_timer(&self, component: &str, token: TimerToken) -> f64 {
        let elapsed_ms = token.started.elapsed().as_secs_f64() * 1000.0;
        self.record_latency(component, elapsed_ms);
        elapsed_ms
    }

    /// Record an externally measured latency sample.
    pub fn record_latency(&self, component: &str, ms: f64) {
        let mut metrics = self.lock_metrics();
        metrics
            .entry(component.to_string())
            .or_insert_with(ComponentMetrics::new)
            .record(ms, self.config.window_size);
    }

    /// Record `count` completed operations for throughput tracking.
    pub fn record_throughput(&self, component: &str, count: u64) {
        let mut metrics = self.lock_metrics();
        metrics
            .entry(component.to_string())
            .or_insert_with(ComponentMetrics::new)
            .ops += count;
    }

    /// Latency statistics for a component, `None` if never sampled.
    pub fn get_latency_stats(&self, component: &str) -> Option<LatencyStats> {
        self.lock_metrics().get(component).map(|m| m.stats())
    }

    /// Ops per second since the component's first sample or last reset.
    pub fn get_current_throughput(&self, component: &str) -> f64 {
        self.lock_metrics()
            .get(component)
            .map(|m| m.throughput())
            .unwrap_or(0.0)
    }

    /// Override the latency threshold for one component.
    pub fn set_latency_threshold(&self, component: &str, ms: f64) {
        self.lock_thresholds().insert(component.to_string(), ms);
    }

    fn threshold_for(&self, component: &str) -> f64 {
        self.lock_thresholds()
            .get(component)
            .copied()
            .unwrap_or(self.config.default_threshold_ms)
    }

    /// Evaluate one component against its SLA.
    ///
    /// Non-compliant when average latency exceeds the threshold, p95
    /// exceeds 1.5x the threshold, or measured throughput falls below
    /// the floor once any throughput has been recorded.
    pub fn check_sla_compliance(&self, component: &str) -> SlaCompliance {
        let threshold_ms = self.threshold_for(component);
        let metrics = self.lock_metrics();
        let (stats, ops, throughput) = match metrics.get(component) {
            Some(m) => (m.stats(), m.ops, m.throughput()),
            None => {
                return SlaCompliance {
                    component: component.to_string(),
                    compliant: true,
                    violations: Vec::new(),
                    avg_ms: 0.0,
                    p95_ms: 0.0,
                    throughput: 0.0,
                    threshold_ms,
                }
            }
        };
        drop(metrics);

        let mut violations = Vec::new();
        if stats.avg_ms > threshold_ms {
            violations.push(format!(
                "average latency {:.3}ms exceeds threshold {:.3}ms",
                stats.avg_ms, threshold_ms
            ));
        }
        let p95_limit = threshold_ms * 1.5;
        if stats.p95_ms > p95_limit {
            violations.push(format!(
                "p95 latency {:.3}ms exceeds {:.3}ms",
                stats.p95_ms, p95_limit
            ));
        }
        if ops > 0 && throughput < self.config.throughput_floor {
            violations.push(format!(
                "throughput {:.1} ops/sec below floor {:.1}",
                throughput, self.config.throughput_floor
            ));
        }

        if !violations.is_empty() {
            warn!(component, ?violations, "SLA violation");
        }

        SlaCompliance {
            component: component.to_string(),
            compliant: violations.is_empty(),
            violations,
            avg_ms: stats.avg_ms,
            p95_ms: stats.p95_ms,
            throughput,
            threshold_ms,
        }
    }

    /// Latency statistics for every instrumented component.
    pub fn get_system_performance(&self) -> BTreeMap<String, LatencyStats> {
        self.lock_metrics()
            .iter()
            .map(|(name, m)| (name.clone(), m.stats()))
            .collect()
    }

    /// Aggregate report with an A/B/C grade.
    ///
    /// A: every component compliant with overall average latency at or
    /// under 25ms. B: every component compliant but the average runs
    /// above 25ms. C: at least one component in violation.
    pub fn get_performance_report(&self) -> PerformanceReport {
        let names: Vec<String> = self.lock_metrics().keys().cloned().collect();
        let components: Vec<SlaCompliance> = names
            .iter()
            .map(|name| self.check_sla_compliance(name))
            .collect();

        let sampled: Vec<&SlaCompliance> =
            components.iter().filter(|c| c.avg_ms > 0.0).collect();
        let overall_avg_ms = if sampled.is_empty() {
            0.0
        } else {
            sampled.iter().map(|c| c.avg_ms).sum::<f64>() / sampled.len() as f64
        };

        let all_compliant = components.iter().all(|c| c.compliant);
        let grade = if !all_compliant {
            PerformanceGrade::C
        } else if overall_avg_ms > 25.0 {
            PerformanceGrade::B
        } else {
            PerformanceGrade::A
        };

        PerformanceReport {
            grade,
            overall_avg_ms,
            components,
        }
    }

    /// Reset one component, or everything when `component` is `None`.
    pub fn reset_metrics(&self, component: Option<&str>) {
        let mut metrics = self.lock_metrics();
        match component {
            Some(name) => {
                metrics.remove(name);
            }
            None => metrics.clear(),
        }
    }
}
