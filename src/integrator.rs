//! Integrators for dynamic systems: fixed-step Euler and RK4, plus an
//! adaptive Runge-Kutta-Fehlberg 4(5) scheme used as the default
//! solver.

use ndarray::{Array1, Array2, LinalgScalar, ScalarOperand, ShapeBuilder};

use crate::dynamics::Dynamics;
use crate::error::SimulationError;

/// Define the interface for integrating dynamics.
pub trait Integrator<T, D, U>
where
    T: LinalgScalar,
    D: Dynamics<T>,
    U: Fn(T, &Array1<T>) -> Array1<T>,
{
    /// Integrate over the dynamics and input for one time step from
    /// `t0` to `tf`, with initial state `x0`.
    ///
    /// The input is a function of time and state (ignore either or both
    /// if desired); for a closed loop driven through its cached system
    /// matrix the input law is simply zero.
    fn step(
        t0: T,
        tf: T,
        x0: &Array1<T>,
        dynamics: &D,
        input: &U,
    ) -> Result<Array1<T>, SimulationError>;

    /// Simulate the dynamics with the input function over a time
    /// vector, `times`, starting at initial state `x0`.
    ///
    /// Column `i` of the result holds the state at `times[i]`. The
    /// default implementation applies [`step`](Integrator::step) over
    /// each adjacent pair of times and fails atomically: either the
    /// whole grid is covered or the first solver error is returned and
    /// no partial history escapes.
    fn simulate(
        times: &Vec<T>,
        x0: &Array1<T>,
        dynamics: &D,
        input: &U,
    ) -> Result<Array2<T>, SimulationError> {
        let mut history = Array2::zeros((x0.len(), times.len()).f());
        if times.is_empty() {
            return Ok(history);
        }
        history.column_mut(0).assign(x0);
        let mut x_curr = x0.clone();
        for (i, &t0) in times.iter().enumerate() {
            if i == times.len() - 1 {
                break;
            }
            let tf = times[i + 1];
            let x_next = Self::step(t0, tf, &x_curr, dynamics, input)?;
            history.column_mut(i + 1).assign(&x_next);
            x_curr = x_next;
        }
        Ok(history)
    }
}

/// Implement Euler integration
///
/// I.e.,
/// $\int_{t_0}^{t_f} \dot{x} = x_0 + (t_f - t_0) f(t_0, x_0, u(t_0, x_0))$
pub struct EulerIntegration;

impl<T, D, U> Integrator<T, D, U> for EulerIntegration
where
    T: LinalgScalar + ScalarOperand,
    D: Dynamics<T>,
    U: Fn(T, &Array1<T>) -> Array1<T>,
{
    fn step(
        t0: T,
        tf: T,
        x0: &Array1<T>,
        dynamics: &D,
        input: &U,
    ) -> Result<Array1<T>, SimulationError> {
        let delta_t = tf - t0;
        let u = input(t0, x0);
        Ok(x0 + &(dynamics.dynamics(t0, x0, &u) * delta_t))
    }
}

/// Implement the classic Runge-Kutta Order 4 integrator
///
/// I.e.,
/// $\int_{t_0}^{t_f} \dot{x} = x_0 + h / 6 (k_1 + 2k_2 + 2k_3 + k_4)$
/// with the stages evaluated at `t0`, the midpoint (twice), and `tf`,
/// where $h = t_f - t_0$.
pub struct RK4;

impl<T, D, U> Integrator<T, D, U> for RK4
where
    T: LinalgScalar + ScalarOperand + From<f64>,
    D: Dynamics<T>,
    U: Fn(T, &Array1<T>) -> Array1<T>,
{
    fn step(
        t0: T,
        tf: T,
        x0: &Array1<T>,
        dynamics: &D,
        input: &U,
    ) -> Result<Array1<T>, SimulationError> {
        let delta_t = tf - t0;
        let t_half = delta_t * T::from(0.5);
        let t_mid = t0 + t_half;
        let k1 = dynamics.dynamics(t0, x0, &input(t0, x0));
        let x_mid_1 = x0 + &(&k1 * t_half);
        let k2 = dynamics.dynamics(t_mid, &x_mid_1, &input(t_mid, &x_mid_1));
        let x_mid_2 = x0 + &(&k2 * t_half);
        let k3 = dynamics.dynamics(t_mid, &x_mid_2, &input(t_mid, &x_mid_2));
        let x_end = x0 + &(&k3 * delta_t);
        let k4 = dynamics.dynamics(tf, &x_end, &input(tf, &x_end));
        let two = T::from(2.0);
        Ok(x0 + &((k1 + &k2 * two + &k3 * two + k4) * (delta_t * T::from(1. / 6.))))
    }
}

fn inf_norm(v: &Array1<f64>) -> f64 {
    v.iter().fold(0.0, |acc, &el| acc.max(el.abs()))
}

/// An adaptive Runge-Kutta-Fehlberg 4(5) integrator.
///
/// The classic embedded pair: six stages yield a fourth- and a
/// fifth-order estimate whose difference drives the step-size control.
/// A step is accepted when that local error estimate stays below
/// `atol + rtol * ||x||_inf`, and the fifth-order solution is carried
/// forward. Only the requested end time is reported; the internal
/// adaptive times never leak out.
#[derive(Clone, Copy, Debug)]
pub struct AdaptiveRKF45 {
    atol: f64,
    rtol: f64,
}

impl AdaptiveRKF45 {
    pub fn new(atol: f64, rtol: f64) -> Self {
        AdaptiveRKF45 { atol, rtol }
    }

    pub fn adaptive_step<D, U>(
        &self,
        t0: f64,
        tf: f64,
        x0: &Array1<f64>,
        dynamics: &D,
        input: &U,
    ) -> Result<Array1<f64>, SimulationError>
    where
        D: Dynamics<f64>,
        U: Fn(f64, &Array1<f64>) -> Array1<f64>,
    {
        let f = |t: f64, x: &Array1<f64>| dynamics.dynamics(t, x, &input(t, x));
        let mut t = t0;
        let mut x = x0.clone();
        // Conservative initial step; the controller grows it quickly on
        // smooth problems.
        let mut h = (0.5 * self.rtol.sqrt()).min(tf - t0);

        while t < tf {
            if t + h == t {
                return Err(SimulationError::IntegrationFailure {
                    t_reached: t,
                    reason: "step size fell below machine precision",
                });
            }

            let k1 = f(t, &x);
            let k2 = f(t + 0.25 * h, &(&x + &(&k1 * (0.25 * h))));
            let k3 = f(
                t + 0.375 * h,
                &(&x + &(&k1 * (3.0 / 32.0 * h)) + &(&k2 * (9.0 / 32.0 * h))),
            );
            let k4 = f(
                t + 12.0 / 13.0 * h,
                &(&x + &(&k1 * (1932.0 / 2197.0 * h)) - &(&k2 * (7200.0 / 2197.0 * h))
                    + &(&k3 * (7296.0 / 2197.0 * h))),
            );
            let k5 = f(
                t + h,
                &(&x + &(&k1 * (439.0 / 216.0 * h)) - &(&k2 * (8.0 * h))
                    + &(&k3 * (3680.0 / 513.0 * h))
                    - &(&k4 * (845.0 / 4104.0 * h))),
            );
            let k6 = f(
                t + 0.5 * h,
                &(&x - &(&k1 * (8.0 / 27.0 * h)) + &(&k2 * (2.0 * h))
                    - &(&k3 * (3544.0 / 2565.0 * h))
                    + &(&k4 * (1859.0 / 4104.0 * h))
                    - &(&k5 * (11.0 / 40.0 * h))),
            );

            // Difference between the embedded fourth- and fifth-order
            // solutions.
            let err_vec = &k1 * (1.0 / 360.0) - &k3 * (128.0 / 4275.0)
                - &k4 * (2197.0 / 75240.0)
                + &k5 * (1.0 / 50.0)
                + &k6 * (2.0 / 55.0);
            let err = h * inf_norm(&err_vec);

            if !err.is_finite() {
                // A stage evaluation overflowed; shrinking the step is
                // the only option left. If that stalls the clock the
                // run is lost.
                h *= 0.5;
                if t + h == t {
                    return Err(SimulationError::IntegrationFailure {
                        t_reached: t,
                        reason: "state is no longer finite",
                    });
                }
                continue;
            }

            let tol = self.atol + self.rtol * inf_norm(&x);
            if err <= tol {
                t += h;
                x = &x
                    + &((&k1 * (16.0 / 135.0)
                        + &k3 * (6656.0 / 12825.0)
                        + &k4 * (28561.0 / 56430.0)
                        - &k5 * (9.0 / 50.0)
                        + &k6 * (2.0 / 55.0))
                        * h);
                if x.iter().any(|el| !el.is_finite()) {
                    return Err(SimulationError::IntegrationFailure {
                        t_reached: t,
                        reason: "state is no longer finite",
                    });
                }
            }
            // Near-optimal step size for a fourth-order error estimate,
            // with a 0.9 safety factor; don't let the step grow too
            // much at once or run past the end time.
            let growth = (0.9 * (tol / err).powf(0.2)).min(4.0);
            h = (growth * h).min(tf - t);
        }
        Ok(x)
    }
}

impl Default for AdaptiveRKF45 {
    fn default() -> Self {
        AdaptiveRKF45 {
            atol: 1e-8,
            rtol: 1e-6,
        }
    }
}

impl<D, U> Integrator<f64, D, U> for AdaptiveRKF45
where
    D: Dynamics<f64>,
    U: Fn(f64, &Array1<f64>) -> Array1<f64>,
{
    fn step(
        t0: f64,
        tf: f64,
        x0: &Array1<f64>,
        dynamics: &D,
        input: &U,
    ) -> Result<Array1<f64>, SimulationError> {
        AdaptiveRKF45::default().adaptive_step(t0, tf, x0, dynamics, input)
    }
}
