//! Error-parameter grid.

use crate::config::{ModelKind, SimulationConfig};
use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};

/// Ceiling on the number of grid points of a single run.
pub const MAX_GRID_POINTS: usize = 1_000_000;

/// Absorbs representation error in `max / step` (e.g. `33.1 / 0.1`).
const AXIS_TOL: f64 = 1e-9;

/// Candidate error-parameter combination.
///
/// Both fields are fractions. `bias` is zero for measurement-uncertainty models.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    /// Measurement uncertainty or imprecision.
    pub mu: f64,
    /// Signed systematic bias.
    pub bias: f64,
}

/// Number of steps of size `step` that fit in `[0, max]`.
///
/// Checked in floating point, before the cast, so a tiny step cannot
/// saturate the count.
fn n_steps(max: f64, step: f64) -> SimResult<usize> {
    let n_steps = (max / step + AXIS_TOL).floor();
    if !(n_steps < MAX_GRID_POINTS as f64) {
        return Err(SimError::Runtime(format!(
            "axis from 0 to {max} in steps of {step} exceeds {MAX_GRID_POINTS} points"
        )));
    }
    Ok(n_steps as usize)
}

/// Number of points of an ascending axis from 0 to `max` (percent) in steps of `step`.
pub fn axis_len(max: f64, step: f64) -> SimResult<usize> {
    Ok(n_steps(max, step)? + 1)
}

/// Ascending axis from 0 to `max`, converted from percent to fractions.
fn axis(max: f64, step: f64) -> SimResult<Vec<f64>> {
    let axis = (0..=n_steps(max, step)?)
        .map(|i_step| i_step as f64 * step / 100.0)
        .collect();
    Ok(axis)
}

/// Symmetric axis from `-max` to `max`, converted from percent to fractions.
fn signed_axis(max: f64, step: f64) -> SimResult<Vec<f64>> {
    let n_steps = n_steps(max, step)? as i64;
    let axis = (-n_steps..=n_steps)
        .map(|i_step| i_step as f64 * step / 100.0)
        .collect();
    Ok(axis)
}

/// Predicted number of grid points for a (validated) configuration.
///
/// # Errors
/// Returns [`SimError::Runtime`] if an axis alone exceeds [`MAX_GRID_POINTS`].
pub fn grid_len(cfg: &SimulationConfig) -> SimResult<usize> {
    let bounds = &cfg.bounds;
    if cfg.model.has_bias() {
        let step = bounds.step_size_imp_bias();
        let n_bias = 2 * n_steps(bounds.max_bias(), step)? + 1;
        axis_len(bounds.max_imprecision(), step)?
            .checked_mul(n_bias)
            .ok_or_else(|| SimError::Runtime("grid size overflows".to_string()))
    } else {
        axis_len(bounds.max_mu(), bounds.step_size_mu())
    }
}

/// Build the ordered grid for a validated configuration.
///
/// Measurement-uncertainty models get a single ascending `mu` axis.
/// Imprecision and bias models get the Cartesian product of the imprecision
/// axis (outer) and the signed bias axis (inner).
///
/// # Errors
/// Returns [`SimError::Runtime`] if the grid exceeds [`MAX_GRID_POINTS`]
/// or cannot be allocated.
pub fn build_grid(cfg: &SimulationConfig) -> SimResult<Vec<GridPoint>> {
    let n_points = grid_len(cfg)?;
    if n_points > MAX_GRID_POINTS {
        return Err(SimError::Runtime(format!(
            "grid has {n_points} points, but at most {MAX_GRID_POINTS} are supported"
        )));
    }

    let mut grid = Vec::new();
    grid.try_reserve_exact(n_points)
        .map_err(|error| SimError::Runtime(format!("failed to allocate grid: {error}")))?;

    let bounds = &cfg.bounds;
    match cfg.model {
        ModelKind::MuAnalytical | ModelKind::MuResampling => {
            let mu_axis = axis(bounds.max_mu(), bounds.step_size_mu())?;
            grid.extend(mu_axis.into_iter().map(|mu| GridPoint { mu, bias: 0.0 }));
        }
        ModelKind::ImpBiasAnalytical | ModelKind::ImpBiasResampling => {
            let step = bounds.step_size_imp_bias();
            let imp_axis = axis(bounds.max_imprecision(), step)?;
            let bias_axis = signed_axis(bounds.max_bias(), step)?;
            for &mu in &imp_axis {
                grid.extend(bias_axis.iter().map(|&bias| GridPoint { mu, bias }));
            }
        }
    }

    Ok(grid)
}
