//! Analytical performance specifications read off a finished grid.
//!
//! This is a lookup over the simulated points, not part of the simulation
//! itself: for each agreement threshold, keep the points that reach it and
//! take the largest error magnitude among them.

use crate::config::{ModelKind, Thresholds};
use crate::report::{Bucket, SimulationResult};
use serde::{Deserialize, Serialize};

/// Largest tolerable errors meeting one agreement threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApsLimit {
    pub level: Bucket,
    /// Agreement threshold in percent.
    pub threshold: f64,
    /// Largest `mu` (percent) reaching the threshold without bias.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_mu: Option<f64>,
    /// Largest `|bias|` (percent) reaching the threshold without imprecision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_bias: Option<f64>,
}

/// Specifications of a run, one per threshold level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApsReport {
    pub model: ModelKind,
    pub seed: u64,
    pub limits: Vec<ApsLimit>,
}

const LEVELS: [Bucket; 3] = [Bucket::Min, Bucket::Desirable, Bucket::Optimal];

/// Look up the specifications meeting each threshold level.
pub fn aps_report(result: &SimulationResult, model: ModelKind, thresholds: &Thresholds) -> ApsReport {
    let limits = LEVELS
        .iter()
        .filter_map(|&level| {
            let threshold = level.threshold(thresholds)?;
            let meets = |agreement: f64| agreement * 100.0 >= threshold;

            let max_mu = result
                .points
                .iter()
                .filter(|point| point.bias == 0.0 && meets(point.agreement))
                .map(|point| point.mu * 100.0)
                .reduce(f64::max);

            let max_bias = if model.has_bias() {
                result
                    .points
                    .iter()
                    .filter(|point| point.mu == 0.0 && meets(point.agreement))
                    .map(|point| point.bias.abs() * 100.0)
                    .reduce(f64::max)
            } else {
                None
            };

            Some(ApsLimit {
                level,
                threshold,
                max_mu,
                max_bias,
            })
        })
        .collect();

    ApsReport {
        model,
        seed: result.seed,
        limits,
    }
}
