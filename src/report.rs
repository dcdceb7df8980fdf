//! Aggregated simulation results.

use crate::config::Thresholds;
use crate::grid::GridPoint;
use crate::stats::{Confusion, Tally};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Qualitative level of a metric under the configured thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    BelowMin,
    Min,
    Desirable,
    Optimal,
}

impl Bucket {
    /// Bucket of a fraction in `[0, 1]`, compared in percent.
    pub fn of(frac: f64, thresholds: &Thresholds) -> Self {
        let pct = frac * 100.0;
        if pct >= thresholds.opt {
            Self::Optimal
        } else if pct >= thresholds.des {
            Self::Desirable
        } else if pct >= thresholds.min {
            Self::Min
        } else {
            Self::BelowMin
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BelowMin => "below_min",
            Self::Min => "min",
            Self::Desirable => "desirable",
            Self::Optimal => "optimal",
        }
    }

    /// Threshold (percent) that opens this bucket, if any.
    pub fn threshold(self, thresholds: &Thresholds) -> Option<f64> {
        match self {
            Self::BelowMin => None,
            Self::Min => Some(thresholds.min),
            Self::Desirable => Some(thresholds.des),
            Self::Optimal => Some(thresholds.opt),
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metrics of a single grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationPoint {
    pub mu: f64,
    pub bias: f64,

    /// Fraction of comparisons whose full category matches.
    pub agreement: f64,
    /// Sensitivity pooled over all decision limits.
    pub sensitivity: f64,
    /// Specificity pooled over all decision limits.
    pub specificity: f64,

    pub agreement_cat: Bucket,
    pub sensitivity_cat: Bucket,
    pub specificity_cat: Bucket,

    /// One entry per decision limit.
    pub sublevel_agreement: Vec<f64>,
    pub sublevel_sensitivity: Vec<f64>,
    pub sublevel_specificity: Vec<f64>,

    /// Number of (data point, trial) comparisons behind the metrics.
    pub comparisons: u64,
}

impl SimulationPoint {
    /// Convert the counts of a grid point into metrics.
    pub fn from_tally(point: GridPoint, tally: &Tally, thresholds: &Thresholds) -> Self {
        let agreement = tally.agreement();
        let pooled = tally.pooled();
        let sensitivity = pooled.sensitivity();
        let specificity = pooled.specificity();

        let per_limit = tally.per_limit();
        let sublevel = |metric: fn(&Confusion) -> f64| -> Vec<f64> {
            per_limit.iter().map(metric).collect()
        };

        Self {
            mu: point.mu,
            bias: point.bias,
            agreement,
            sensitivity,
            specificity,
            agreement_cat: Bucket::of(agreement, thresholds),
            sensitivity_cat: Bucket::of(sensitivity, thresholds),
            specificity_cat: Bucket::of(specificity, thresholds),
            sublevel_agreement: sublevel(Confusion::agreement),
            sublevel_sensitivity: sublevel(Confusion::sensitivity),
            sublevel_specificity: sublevel(Confusion::specificity),
            comparisons: tally.comparisons(),
        }
    }
}

/// Outcome of a complete simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Grid points in construction order.
    pub points: Vec<SimulationPoint>,
    /// Label of each decision limit, tagging the sublevel series.
    pub names: Vec<String>,
    /// Seed that reproduces this run.
    pub seed: u64,
}
