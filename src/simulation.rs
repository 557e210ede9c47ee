//! Run one closed-loop simulation: the crate's public entry points.
//!
//! A run is a single-shot, stateless computation. The caller owns the
//! [`ControllerConfig`]; it is borrowed for the duration of one call and
//! never retained, so independent runs can execute in parallel without
//! any shared state.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::analytic;
use crate::dynamics::STATE_DIM;
use crate::error::SimulationError;
use crate::feedback;
use crate::integrator::{AdaptiveRKF45, Integrator};

/// Everything one simulation run needs.
///
/// `init_state` is the stacked planar state `[px, vx, py, vy]`; `kx`
/// and `ky` are the 1x2 per-axis feedback gains (positive gains
/// stabilize, see the [`feedback`] module for the sign convention);
/// the horizon is sampled at `0, dt, 2 dt, ...` up to but excluding
/// `t_stop`.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub init_state: Array1<f64>,
    pub kx: Array2<f64>,
    pub ky: Array2<f64>,
    pub t_stop: f64,
    pub dt: f64,
}

impl ControllerConfig {
    /// Check the state dimension and the time grid.
    ///
    /// Gain shapes are checked where the closed loop is built.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.init_state.len() != STATE_DIM {
            return Err(SimulationError::Dimension {
                name: "init_state",
                expected: vec![STATE_DIM],
                actual: vec![self.init_state.len()],
            });
        }
        // Written with `!` so that NaN horizons are rejected as well.
        if !(self.t_stop > 0.0) || !(self.dt > 0.0) || !(self.dt < self.t_stop) {
            return Err(SimulationError::InvalidHorizon {
                t_stop: self.t_stop,
                dt: self.dt,
            });
        }
        Ok(())
    }

    /// Number of samples in the grid: `floor(t_stop / dt)`.
    pub fn n_samples(&self) -> usize {
        (self.t_stop / self.dt).floor() as usize
    }

    fn times(&self) -> Vec<f64> {
        (0..self.n_samples()).map(|i| i as f64 * self.dt).collect()
    }
}

/// The time-sampled result of one run.
///
/// Row `i` holds the state `[x, vx, y, vy]` at exactly `i * dt`;
/// solver-internal adaptive times never appear here. Immutable after
/// construction.
#[derive(Debug, Clone)]
pub struct Trajectory {
    states: Array2<f64>,
    dt: f64,
}

impl Trajectory {
    fn new(states: Array2<f64>, dt: f64) -> Trajectory {
        Trajectory { states, dt }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.states.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.states.nrows() == 0
    }

    /// The sample spacing the trajectory was produced with.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// The time associated with row `i`.
    pub fn time(&self, i: usize) -> f64 {
        i as f64 * self.dt
    }

    /// The state at row `i`. Panics if `i` is out of range.
    pub fn state(&self, i: usize) -> ArrayView1<'_, f64> {
        self.states.row(i)
    }

    /// All samples as an `(len, 4)` view.
    pub fn states(&self) -> ArrayView2<'_, f64> {
        self.states.view()
    }

    /// Iterate over `(time, state)` pairs, the shape renderers want.
    pub fn samples(&self) -> impl Iterator<Item = (f64, ArrayView1<'_, f64>)> + '_ {
        self.states
            .rows()
            .into_iter()
            .enumerate()
            .map(move |(i, row)| (i as f64 * self.dt, row))
    }
}

/// Simulate the closed loop described by `config`.
///
/// Builds the block-diagonal closed-loop system once, then integrates
/// it with the adaptive RKF45 solver, reporting the state on the
/// uniform grid. Either the whole horizon succeeds or an error is
/// returned; partial trajectories never escape.
///
/// # Examples
/// ```
/// use ndarray::array;
/// use planar_feedback::{simulate, ControllerConfig};
///
/// let config = ControllerConfig {
///     init_state: array![-3., 1., 2., 1.],
///     kx: array![[4., 5.]],
///     ky: array![[4., 5.]],
///     t_stop: 5.0,
///     dt: 0.02,
/// };
/// let trajectory = simulate(&config).unwrap();
/// assert_eq!(trajectory.len(), 250);
/// assert_eq!(trajectory.time(100), 2.0);
/// ```
pub fn simulate(config: &ControllerConfig) -> Result<Trajectory, SimulationError> {
    config.validate()?;
    let closed = feedback::closed_loop(&config.kx, &config.ky)?;
    let zero_input = |_t: f64, _x: &Array1<f64>| Array1::zeros(1);
    let history = AdaptiveRKF45::simulate(&config.times(), &config.init_state, &closed, &zero_input)?;
    Ok(Trajectory::new(history.reversed_axes(), config.dt))
}

/// Simulate the closed loop through its closed-form solution.
///
/// Same contract as [`simulate`], but propagates with the matrix
/// exponential $x_{i+1} = e^{M\,dt} x_i$ instead of a numerical solver.
/// Exact up to rounding, and faster for long horizons.
pub fn simulate_exact(config: &ControllerConfig) -> Result<Trajectory, SimulationError> {
    config.validate()?;
    let m = feedback::closed_loop_matrix(&config.kx, &config.ky)?;
    let states = analytic::exact_history(&m, &config.init_state, config.n_samples(), config.dt);
    Ok(Trajectory::new(states, config.dt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn config(kx: Array2<f64>, ky: Array2<f64>) -> ControllerConfig {
        ControllerConfig {
            init_state: array![-3., 1., 2., 1.],
            kx,
            ky,
            t_stop: 5.0,
            dt: 0.02,
        }
    }

    #[test]
    fn test_row_count_is_floor_of_horizon() {
        let mut cfg = config(array![[4., 5.]], array![[4., 5.]]);
        assert_eq!(simulate(&cfg).unwrap().len(), 250);

        cfg.t_stop = 1.0;
        cfg.dt = 0.1;
        assert_eq!(simulate(&cfg).unwrap().len(), 10);

        cfg.t_stop = 3.0;
        cfg.dt = 2.0;
        assert_eq!(simulate(&cfg).unwrap().len(), 1);
    }

    #[test]
    fn test_time_alignment_is_exact() {
        let cfg = config(array![[4., 5.]], array![[4., 5.]]);
        let trajectory = simulate(&cfg).unwrap();
        for i in 0..trajectory.len() {
            assert_eq!(trajectory.time(i), i as f64 * 0.02);
        }
        for (i, (t, _state)) in trajectory.samples().enumerate() {
            assert_eq!(t, i as f64 * 0.02);
        }
    }

    #[test]
    fn test_matches_matrix_exponential() {
        let cfg = config(array![[4., 5.]], array![[4., 5.]]);
        let numeric = simulate(&cfg).unwrap();
        let exact = simulate_exact(&cfg).unwrap();

        assert_eq!(numeric.len(), exact.len());
        for i in 0..numeric.len() {
            assert!(numeric.state(i).abs_diff_eq(&exact.state(i), 1e-6));
        }
    }

    #[test]
    fn test_stabilizing_gain_decays_to_origin() {
        let cfg = config(array![[4., 5.]], array![[4., 5.]]);
        let trajectory = simulate(&cfg).unwrap();

        let norm = |state: ArrayView1<f64>| state.iter().map(|el| el * el).sum::<f64>().sqrt();
        let first = norm(trajectory.state(0));
        let last = norm(trajectory.state(trajectory.len() - 1));
        assert!(last < 0.1, "final norm {last} has not decayed");
        assert!(last < 0.05 * first);
    }

    #[test]
    fn test_p_controller_oscillates_bounded() {
        // Position-only gain: per-axis poles at +/- 2i, no damping.
        let cfg = config(array![[4., 0.]], array![[4., 0.]]);
        let trajectory = simulate(&cfg).unwrap();

        // Energy bound on the x amplitude: sqrt(x0^2 + (vx0/2)^2).
        let amplitude = (9.0f64 + 0.25).sqrt();
        let mut sign_changes = 0;
        for i in 1..trajectory.len() {
            let x = trajectory.state(i)[0];
            assert!(x.abs() <= amplitude + 1e-3);
            if x.signum() != trajectory.state(i - 1)[0].signum() {
                sign_changes += 1;
            }
        }
        assert!(sign_changes >= 2, "expected oscillation, got {sign_changes} sign changes");

        // The undamped loop is a pure cosine response.
        for (t, state) in trajectory.samples() {
            let (s, c) = (2.0 * t).sin_cos();
            assert!(state.abs_diff_eq(
                &array![
                    -3.0 * c + 0.5 * s,
                    6.0 * s + c,
                    2.0 * c + 0.5 * s,
                    -4.0 * s + c
                ],
                1e-5
            ));
        }
    }

    #[test]
    fn test_axes_are_decoupled() {
        // Zero gain on x leaves that axis in pure constant-velocity
        // drift no matter what y does.
        let cfg = config(array![[0., 0.]], array![[4., 5.]]);
        let trajectory = simulate(&cfg).unwrap();

        for (t, state) in trajectory.samples() {
            assert!((state[0] - (-3.0 + t)).abs() < 1e-8);
            assert!((state[1] - 1.0).abs() < 1e-9);
        }
        // Meanwhile y decays under its stabilizing gain.
        let last = trajectory.state(trajectory.len() - 1);
        assert!(last[2].abs() < 0.1);
    }

    #[test]
    fn test_invalid_horizons_are_rejected() {
        let mut cfg = config(array![[4., 5.]], array![[4., 5.]]);
        for (t_stop, dt) in [
            (5.0, 0.0),
            (5.0, -0.1),
            (0.0, 0.02),
            (-2.0, 0.02),
            (5.0, 5.0),
            (1.0, 2.0),
            (5.0, f64::NAN),
        ] {
            cfg.t_stop = t_stop;
            cfg.dt = dt;
            let err = simulate(&cfg).unwrap_err();
            assert!(
                matches!(err, SimulationError::InvalidHorizon { .. }),
                "({t_stop}, {dt}) produced {err:?}"
            );
            assert!(matches!(
                simulate_exact(&cfg).unwrap_err(),
                SimulationError::InvalidHorizon { .. }
            ));
        }
    }

    #[test]
    fn test_malformed_shapes_are_rejected() {
        let mut cfg = config(array![[4., 5.]], array![[4., 5.]]);
        cfg.init_state = array![-3., 1., 2.];
        assert!(matches!(
            simulate(&cfg).unwrap_err(),
            SimulationError::Dimension {
                name: "init_state",
                ..
            }
        ));

        let cfg = config(array![[4., 5., 6.]], array![[4., 5.]]);
        assert!(matches!(
            simulate(&cfg).unwrap_err(),
            SimulationError::Dimension { name: "Kx", .. }
        ));
    }

    #[test]
    fn test_unstable_loop_fails_instead_of_clipping() {
        // Negative gains flip the sign convention into positive
        // feedback; the state overflows well before t_stop.
        let mut cfg = config(array![[-1.0e4, -200.]], array![[-1.0e4, -200.]]);
        cfg.dt = 0.05;
        match simulate(&cfg).unwrap_err() {
            SimulationError::IntegrationFailure { t_reached, .. } => {
                assert!(t_reached > 0.0 && t_reached < cfg.t_stop);
            }
            other => panic!("expected IntegrationFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_exact_propagation_row_zero_is_initial_state() {
        let cfg = config(array![[4., 5.]], array![[4., 5.]]);
        let trajectory = simulate_exact(&cfg).unwrap();
        assert_eq!(trajectory.state(0), cfg.init_state.view());
        assert_eq!(trajectory.dt(), 0.02);
        assert!(!trajectory.is_empty());
    }
}
