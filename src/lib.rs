//! Closed-loop simulation of a planar double-integrator plant under
//! linear state feedback.
//!
//! The plant is two decoupled position/velocity axes with acceleration
//! as the control input. A 1x2 gain matrix per axis closes the loop with
//! the control law $u = -K x$, and the resulting linear system is
//! integrated over a uniform sample grid to produce a
//! [`Trajectory`](simulation::Trajectory) that downstream plotting and
//! export collaborators consume by row index.
//!
//! The simulation module holds the public entry points, with the other
//! modules supporting it. The most commonly used functionality is
//! re-exported to the top level for ease-of-use.

pub mod analytic;
pub mod dynamics;
pub mod error;
pub mod feedback;
pub mod integrator;
pub mod simulation;
pub use error::SimulationError;
pub use simulation::*;
