//! Security posture score.
//!
//! A weighted-penalty heuristic used when no scan-provided score exists:
//! `max(0, 100 - (critical*10 + high*5 + medium*2 + low*0.5))`, rounded.
//! It is not a certified scoring model.

use serde::{Deserialize, Serialize};

use crate::query::models::{Finding, SecurityScan, Severity};

pub const CRITICAL_WEIGHT: f64 = 10.0;
pub const HIGH_WEIGHT: f64 = 5.0;
pub const MEDIUM_WEIGHT: f64 = 2.0;
pub const LOW_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    #[serde(default)]
    pub critical: u64,
    #[serde(default)]
    pub high: u64,
    #[serde(default)]
    pub medium: u64,
    #[serde(default)]
    pub low: u64,
}

impl SeverityCounts {
    pub fn new(critical: u64, high: u64, medium: u64, low: u64) -> Self {
        Self {
            critical,
            high,
            medium,
            low,
        }
    }

    /// Count open findings by severity. Informational findings carry no
    /// penalty.
    pub fn from_findings(findings: &[Finding]) -> Self {
        findings
            .iter()
            .filter(|f| f.status.is_open())
            .fold(Self::default(), |mut counts, f| {
                match f.severity {
                    Severity::Critical => counts.critical += 1,
                    Severity::High => counts.high += 1,
                    Severity::Medium => counts.medium += 1,
                    Severity::Low => counts.low += 1,
                    Severity::Info => {}
                }
                counts
            })
    }

    pub fn from_scan(scan: &SecurityScan) -> Self {
        Self::new(scan.critical_count, scan.high_count, scan.medium_count, scan.low_count)
    }

    pub fn total(&self) -> u64 {
        self.critical + self.high + self.medium + self.low
    }

    pub fn penalty(&self) -> f64 {
        self.critical as f64 * CRITICAL_WEIGHT
            + self.high as f64 * HIGH_WEIGHT
            + self.medium as f64 * MEDIUM_WEIGHT
            + self.low as f64 * LOW_WEIGHT
    }
}

/// Score in `0..=100`.
pub fn security_score(counts: &SeverityCounts) -> u32 {
    (100.0 - counts.penalty()).max(0.0).round() as u32
}
