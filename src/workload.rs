//! Lookup request generation.
//!
//! Each worker owns one [`WorkloadGenerator`] seeded from the run seed and its
//! own id, so request streams need no synchronization and are reproducible.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BenchError;

// ---------------------------------------------------------------------------
// Access policy
// ---------------------------------------------------------------------------

/// Which partitions a worker's lookups target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessPolicy {
    /// Any partition, chosen uniformly. No data locality.
    #[default]
    Uniform,
    /// Always the worker's own partition. Perfect data locality.
    Partitioned,
}

impl AccessPolicy {
    pub const ALL: [AccessPolicy; 2] = [AccessPolicy::Uniform, AccessPolicy::Partitioned];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::Partitioned => "partitioned",
        }
    }
}

impl fmt::Display for AccessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AccessPolicy {
    type Err = BenchError;

    /// Same matching rule as [`StoreKind`](crate::config::StoreKind): case
    /// insensitive, and the selector must start with the policy's label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| lower.starts_with(p.label()))
            .ok_or_else(|| BenchError::UnsupportedPolicy(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// One point lookup: `key` in table `partition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Request {
    pub partition: usize,
    pub key: u64,
}

// ---------------------------------------------------------------------------
// Fast LCG random number generator
// ---------------------------------------------------------------------------

/// 64-bit LCG. Not cryptographic; cheap enough not to show up in lookup timings.
#[derive(Debug, Clone)]
pub struct FastRng {
    state: u64,
}

impl FastRng {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0x5DEECE66D,
        }
    }

    /// Generator for one worker, derived from the run seed.
    pub fn for_worker(seed: u64, worker: usize) -> Self {
        Self::new(seed ^ (worker as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    /// Returns a pseudo-random u64.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    /// Returns a value in [0, n). `n` must be non-zero.
    ///
    /// Uses the high bits of the state: the low bits of a power-of-two LCG
    /// cycle with a short period.
    #[inline]
    pub fn next_below(&mut self, n: u64) -> u64 {
        ((self.next_u64() as u128 * n as u128) >> 64) as u64
    }
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Produces the request stream of one worker.
#[derive(Debug, Clone)]
pub struct WorkloadGenerator {
    policy: AccessPolicy,
    home: usize,
    partition_count: u64,
    record_count: u64,
    rng: FastRng,
}

impl WorkloadGenerator {
    /// `home` is the worker's own partition. Counts of zero are clamped to one.
    pub fn new(
        policy: AccessPolicy,
        home: usize,
        partition_count: usize,
        record_count: u64,
        rng: FastRng,
    ) -> Self {
        Self {
            policy,
            home,
            partition_count: partition_count.max(1) as u64,
            record_count: record_count.max(1),
            rng,
        }
    }

    pub fn next_request(&mut self) -> Request {
        let partition = match self.policy {
            AccessPolicy::Uniform => self.rng.next_below(self.partition_count) as usize,
            AccessPolicy::Partitioned => self.home,
        };
        let key = self.rng.next_below(self.record_count);
        Request { partition, key }
    }
}

impl Iterator for WorkloadGenerator {
    type Item = Request;

    fn next(&mut self) -> Option<Request> {
        Some(self.next_request())
    }
}
