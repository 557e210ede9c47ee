//! Error taxonomy for a simulation run.

use thiserror::Error;

/// Everything that can go wrong while building or integrating a closed
/// loop.
///
/// All failures surface at the public entry points; there is no internal
/// recovery, and a failed integration never yields a truncated
/// trajectory.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// A state vector or gain matrix has the wrong shape.
    #[error("{name} has shape {actual:?}, expected {expected:?}")]
    Dimension {
        name: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// `t_stop` and `dt` do not describe a usable time grid.
    #[error("invalid horizon: t_stop = {t_stop}, dt = {dt} (need 0 < dt < t_stop)")]
    InvalidHorizon { t_stop: f64, dt: f64 },

    /// The solver could not carry the state to the end of the horizon.
    ///
    /// `t_reached` is how far the integration got before giving up.
    #[error("integration failed at t = {t_reached}: {reason}")]
    IntegrationFailure { t_reached: f64, reason: &'static str },
}
