//! Close the loop: combine the plant with per-axis feedback gains.
//!
//! The control law is $u = -K x_{\text{axis}}$ per axis, so the
//! closed-loop system matrix is $A - BK$ and stabilizing gains are
//! stored positive (e.g. `[[4., 5.]]` places the poles of one axis at
//! $-1$ and $-4$). Because the axes are fully decoupled, the 4x4
//! closed-loop matrix is block-diagonal and is built once per run
//! rather than re-assembled from per-axis products at every solver
//! step.

use ndarray::{s, Array1, Array2};

use crate::dynamics::{axis_matrices, LtiDynamics, AXIS_STATES, N_AXES, STATE_DIM};
use crate::error::SimulationError;

fn check_gain(name: &'static str, k: &Array2<f64>) -> Result<(), SimulationError> {
    if k.shape() != [1, AXIS_STATES] {
        return Err(SimulationError::Dimension {
            name,
            expected: vec![1, AXIS_STATES],
            actual: k.shape().to_vec(),
        });
    }
    Ok(())
}

/// The closed-loop system matrix $\text{blockdiag}(A - BK_x, A - BK_y)$.
///
/// # Examples
/// ```
/// use ndarray::array;
/// use planar_feedback::feedback::closed_loop_matrix;
///
/// let m = closed_loop_matrix(&array![[4., 5.]], &array![[4., 5.]]).unwrap();
/// assert_eq!(m.row(1).to_owned(), array![-4., -5., 0., 0.]);
/// assert_eq!(m.row(3).to_owned(), array![0., 0., -4., -5.]);
/// ```
pub fn closed_loop_matrix(
    kx: &Array2<f64>,
    ky: &Array2<f64>,
) -> Result<Array2<f64>, SimulationError> {
    check_gain("Kx", kx)?;
    check_gain("Ky", ky)?;
    let (a_axis, b_axis) = axis_matrices();
    let mut m = Array2::zeros((STATE_DIM, STATE_DIM));
    m.slice_mut(s![..AXIS_STATES, ..AXIS_STATES])
        .assign(&(&a_axis - &b_axis.dot(kx)));
    m.slice_mut(s![AXIS_STATES.., AXIS_STATES..])
        .assign(&(&a_axis - &b_axis.dot(ky)));
    Ok(m)
}

/// The closed loop packaged as an autonomous LTI system.
///
/// The returned system takes a single input that it ignores (its $B$ is
/// zero), so it can be driven by any integrator with a zero input law.
pub fn closed_loop(
    kx: &Array2<f64>,
    ky: &Array2<f64>,
) -> Result<LtiDynamics<f64>, SimulationError> {
    Ok(LtiDynamics::new(
        closed_loop_matrix(kx, ky)?,
        Array2::zeros((STATE_DIM, 1)),
    ))
}

/// The state-feedback input law $u(t, x) = -\text{blockdiag}(K_x, K_y) x$
/// for the open-loop planar plant.
///
/// Driving [`planar_plant`](crate::dynamics::planar_plant) with this law
/// is equivalent to integrating the autonomous system from
/// [`closed_loop`]; the latter is what the entry points use since the
/// combined matrix is cheaper per solver step.
pub fn state_feedback(
    kx: &Array2<f64>,
    ky: &Array2<f64>,
) -> Result<impl Fn(f64, &Array1<f64>) -> Array1<f64>, SimulationError> {
    check_gain("Kx", kx)?;
    check_gain("Ky", ky)?;
    let mut k_block = Array2::zeros((N_AXES, STATE_DIM));
    k_block.slice_mut(s![..1, ..AXIS_STATES]).assign(kx);
    k_block.slice_mut(s![1.., AXIS_STATES..]).assign(ky);
    Ok(move |_t: f64, x: &Array1<f64>| -k_block.dot(x))
}
