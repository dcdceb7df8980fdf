//! Monte Carlo derivation of analytical performance specifications.
//!
//! Given measurand values and clinical decision limits, the engine sweeps a
//! grid of candidate analytical errors and estimates how often a perturbed
//! result is still classified like the true one.

pub mod analysis;
pub mod classify;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod grid;
pub mod manager;
pub mod model;
pub mod progress;
pub mod report;
pub mod stats;

pub use config::{Bounds, ModelKind, SimulationConfig, Thresholds};
pub use engine::{Engine, run_simulation};
pub use error::{SimError, SimResult};
pub use progress::{CancelToken, Progress};
pub use report::{Bucket, SimulationPoint, SimulationResult};
