//! Error types for the simulation core.

use thiserror::Error;

/// Result type alias for simulation operations.
pub type SimResult<T> = Result<T, SimError>;

/// Terminal failure of a simulation run.
///
/// No variant ever carries a partial result: a run either produces a complete
/// [`SimulationResult`](crate::report::SimulationResult) or fails with one of these.
#[derive(Debug, Error)]
pub enum SimError {
    /// The configuration was rejected before any computation started.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The run could not be carried out (oversized grid, overflow, entropy failure).
    #[error("simulation failed: {0}")]
    Runtime(String),

    /// The run was cancelled at a grid-point boundary.
    #[error("simulation was cancelled")]
    Cancelled,
}
