//! Machine-readable benchmark report.
//!
//! The JSON printed by `oltp-bench --json` deserializes into these types, so
//! scripts can consume runs without scraping the console lines.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level report of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    /// Metadata about this run (hardware, timestamp).
    pub metadata: RunMetadata,
    /// One entry per completed worker, then the aggregate.
    pub results: Vec<BenchmarkResult>,
}

/// Metadata captured at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    /// ISO 8601 timestamp.
    pub timestamp: String,
    /// Crate version.
    pub version: String,
    /// Store kind label (e.g. "sqlite").
    pub store: String,
    /// Access policy label (e.g. "uniform").
    pub access_policy: String,
    pub partition_count: usize,
    pub record_count: u64,
    pub iteration_count: u64,
    pub seed: u64,
    pub hardware: HardwareInfo,
}

/// Hardware information for reproducibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareInfo {
    /// CPU model string.
    pub cpu: String,
    /// Number of logical cores.
    pub cores: usize,
    /// Total RAM in GB.
    pub ram_gb: u64,
    /// Operating system.
    pub os: String,
    /// CPU architecture.
    pub arch: String,
}

/// A single measurement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Benchmark name (e.g. "lookup/worker-0", "lookup/aggregate").
    pub benchmark: String,
    /// Benchmark-specific parameters.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
    /// Measured metrics.
    pub metrics: BenchmarkMetrics,
}

/// Metrics of one measurement. Fields that don't apply are omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchmarkMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ops_per_sec: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_workers: Option<usize>,
}
