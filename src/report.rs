//! Run output: the console lines scripts grep for, and the JSON report.

use std::collections::HashMap;
use std::io::{self, Write};
use std::time::SystemTime;

use crate::config::BenchConfig;
use crate::orchestrator::RunSummary;
use crate::schema::{BenchmarkMetrics, BenchmarkReport, BenchmarkResult, HardwareInfo, RunMetadata};

pub const SCHEMA_VERSION: u32 = 1;

/// Write one `Thread <id> query time: <ms> msec` line per completed worker,
/// then `Elapsed time query execution: <ms> msec`.
///
/// Failed workers produce no line.
pub fn write_console(summary: &RunSummary, out: &mut impl Write) -> io::Result<()> {
    for report in summary.reports() {
        writeln!(
            out,
            "Thread {} query time: {} msec",
            report.worker,
            report.elapsed_ms()
        )?;
    }
    writeln!(
        out,
        "Elapsed time query execution: {} msec",
        summary.elapsed_ms()
    )?;
    Ok(())
}

/// Build the JSON report of a run.
pub fn build_report(summary: &RunSummary, config: &BenchConfig) -> BenchmarkReport {
    let mut results: Vec<BenchmarkResult> = summary
        .reports()
        .map(|r| {
            let mut parameters = HashMap::new();
            parameters.insert("worker".into(), serde_json::json!(r.worker));
            parameters.insert("populated".into(), serde_json::json!(r.populated));
            BenchmarkResult {
                benchmark: format!("lookup/worker-{}", r.worker),
                parameters,
                metrics: BenchmarkMetrics {
                    elapsed_ms: Some(r.elapsed_ms() as u64),
                    ops_per_sec: Some(r.ops_per_sec()),
                    samples: Some(r.iterations),
                    found: Some(r.found),
                    ..Default::default()
                },
            }
        })
        .collect();

    let secs = summary.elapsed.as_secs_f64();
    let lookups = summary.completed_lookups();
    let mut parameters = HashMap::new();
    let failures: Vec<String> = summary.failures().map(|f| f.to_string()).collect();
    if !failures.is_empty() {
        parameters.insert("failures".into(), serde_json::json!(failures));
    }
    results.push(BenchmarkResult {
        benchmark: "lookup/aggregate".to_string(),
        parameters,
        metrics: BenchmarkMetrics {
            elapsed_ms: Some(summary.elapsed_ms() as u64),
            ops_per_sec: (secs > 0.0).then(|| lookups as f64 / secs),
            samples: Some(lookups),
            threads: Some(summary.outcomes.len()),
            failed_workers: Some(summary.failed_workers()),
            ..Default::default()
        },
    });

    BenchmarkReport {
        schema_version: SCHEMA_VERSION,
        metadata: RunMetadata {
            timestamp: iso8601_now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            store: config.store.label().to_string(),
            access_policy: config.access_policy.label().to_string(),
            partition_count: config.partition_count,
            record_count: config.record_count,
            iteration_count: config.iteration_count,
            seed: config.seed,
            hardware: capture_hardware(),
        },
        results,
    }
}

/// Pretty-printed JSON report.
pub fn write_json(
    summary: &RunSummary,
    config: &BenchConfig,
    out: &mut impl Write,
) -> serde_json::Result<()> {
    let report = build_report(summary, config);
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out).map_err(serde_json::Error::io)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Metadata capture helpers
// ---------------------------------------------------------------------------

fn iso8601_now() -> String {
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format_utc(secs)
}

fn format_utc(secs: u64) -> String {
    let days = secs / 86400;
    let time_of_day = secs % 86400;
    let (year, month, day) = days_to_ymd(days);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year,
        month,
        day,
        time_of_day / 3600,
        (time_of_day % 3600) / 60,
        time_of_day % 60
    )
}

fn days_to_ymd(mut days: u64) -> (u64, u64, u64) {
    // Howard Hinnant's civil_from_days
    days += 719468;
    let era = days / 146097;
    let doe = days - era * 146097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}

fn read_cpu_model() -> String {
    std::fs::read_to_string("/proc/cpuinfo")
        .ok()
        .and_then(|info| {
            info.lines()
                .find(|line| line.starts_with("model name"))
                .and_then(|line| line.split(':').nth(1))
                .map(|model| model.trim().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn read_total_ram_gb() -> u64 {
    std::fs::read_to_string("/proc/meminfo")
        .ok()
        .and_then(|info| {
            info.lines()
                .find(|line| line.starts_with("MemTotal:"))
                .and_then(|line| line.split_whitespace().nth(1))
                .and_then(|kb| kb.parse::<u64>().ok())
        })
        .map(|kb| kb / (1024 * 1024))
        .unwrap_or(0)
}

fn capture_hardware() -> HardwareInfo {
    HardwareInfo {
        cpu: read_cpu_model(),
        cores: std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(0),
        ram_gb: read_total_ram_gb(),
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
    }
}
