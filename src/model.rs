//! Perturbation models.
//!
//! Every model produces a simulated result of the form
//!
//! ```text
//! simulated = v * (1 + bias) + v * z * scale,    z ~ N(0, 1)
//! ```
//!
//! where `scale` is the analytical noise (`mu`) for rerun models and
//! `sqrt(mu^2 + cv_i^2)` for resampling models, whose noise is the analytical
//! and the within-subject biological variation added in variance.
//! Measurement-uncertainty models carry no bias.

use crate::config::{ModelKind, SimulationConfig};
use crate::grid::GridPoint;
use rand::Rng;
use rand_distr::StandardNormal;

/// Perturbation strategy of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Perturbation {
    MuAnalytical,
    MuResampling { cv_i: f64 },
    ImpBiasAnalytical,
    ImpBiasResampling { cv_i: f64 },
}

impl Perturbation {
    /// Select the strategy of a validated configuration.
    ///
    /// `cv_i` is read as a fraction. Resampling models fall back to zero
    /// biological variation when none is configured, which validation rejects.
    pub fn from_config(cfg: &SimulationConfig) -> Self {
        let cv_i = cfg.cv_i_fraction().unwrap_or(0.0);
        match cfg.model {
            ModelKind::MuAnalytical => Self::MuAnalytical,
            ModelKind::MuResampling => Self::MuResampling { cv_i },
            ModelKind::ImpBiasAnalytical => Self::ImpBiasAnalytical,
            ModelKind::ImpBiasResampling => Self::ImpBiasResampling { cv_i },
        }
    }

    /// Resolve the strategy at a grid point.
    pub fn kernel(&self, point: GridPoint) -> Kernel {
        match *self {
            Self::MuAnalytical => Kernel {
                gain: 1.0,
                scale: point.mu,
            },
            Self::MuResampling { cv_i } => Kernel {
                gain: 1.0,
                scale: point.mu.hypot(cv_i),
            },
            Self::ImpBiasAnalytical => Kernel {
                gain: 1.0 + point.bias,
                scale: point.mu,
            },
            Self::ImpBiasResampling { cv_i } => Kernel {
                gain: 1.0 + point.bias,
                scale: point.mu.hypot(cv_i),
            },
        }
    }
}

/// Perturbation resolved at a single grid point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kernel {
    /// Systematic multiplier, `1 + bias`.
    pub gain: f64,
    /// Relative standard deviation of the random error.
    pub scale: f64,
}

impl Kernel {
    /// Simulated value of `val` for the standard normal deviate `z`.
    pub fn apply(&self, val: f64, z: f64) -> f64 {
        val * self.gain + val * z * self.scale
    }

    /// Draw one simulated value of `val`.
    pub fn sample<R: Rng>(&self, val: f64, rng: &mut R) -> f64 {
        let z: f64 = rng.sample(StandardNormal);
        self.apply(val, z)
    }
}
