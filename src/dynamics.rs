//! Plant models: generic LTI dynamics and the planar double integrator.

use ndarray::{array, linalg::kron, Array1, Array2, LinalgScalar};

/// Number of states per axis (position and velocity).
pub const AXIS_STATES: usize = 2;
/// Number of axes in the planar plant.
pub const N_AXES: usize = 2;
/// Dimension of the stacked planar state `[x, vx, y, vy]`.
pub const STATE_DIM: usize = AXIS_STATES * N_AXES;

/// Continuous-time dynamics of the form $\dot{x} = f(t, x, u)$.
///
/// This crate only ever builds linear time-invariant systems, but the
/// integrators accept anything implementing this trait. Time is passed
/// through even though the systems here are time-invariant because the
/// integrator interface requires it.
pub trait Dynamics<T: LinalgScalar> {
    /// Evaluate the state derivative $\dot{x} = f(t, x, u)$.
    fn dynamics(&self, t: T, x: &Array1<T>, u: &Array1<T>) -> Array1<T>;
    /// Dimension of the state $x$.
    fn n_state(&self) -> usize;
    /// Dimension of the input $u$.
    fn n_input(&self) -> usize;
}

/// Linear time-invariant dynamics $\dot{x} = A x + B u$.
///
/// # Examples
/// ```
/// use ndarray::array;
/// use planar_feedback::dynamics::{Dynamics, LtiDynamics};
///
/// let axis = LtiDynamics::new(array![[0., 1.], [0., 0.]], array![[0.], [1.]]);
/// assert_eq!(axis.dynamics(0., &array![0.5, 2.], &array![1.]), array![2., 1.]);
/// assert_eq!(axis.n_state(), 2);
/// assert_eq!(axis.n_input(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct LtiDynamics<T: LinalgScalar> {
    a_mat: Array2<T>,
    b_mat: Array2<T>,
}

impl<T: LinalgScalar> LtiDynamics<T> {
    /// Create an LTI system from an $A$ matrix (`a_mat`) and a $B$
    /// matrix (`b_mat`).
    pub fn new(a_mat: Array2<T>, b_mat: Array2<T>) -> LtiDynamics<T> {
        LtiDynamics { a_mat, b_mat }
    }
}

impl<T: LinalgScalar> Dynamics<T> for LtiDynamics<T> {
    fn dynamics(&self, _t: T, x: &Array1<T>, u: &Array1<T>) -> Array1<T> {
        self.a_mat.dot(x) + self.b_mat.dot(u)
    }

    fn n_state(&self) -> usize {
        self.a_mat.ncols()
    }

    fn n_input(&self) -> usize {
        self.b_mat.ncols()
    }
}

/// The `(A, B)` pair of a single double-integrator axis.
///
/// Position feeds from velocity and acceleration is the input:
/// $A = \begin{bmatrix}0 & 1\\\\0 & 0\end{bmatrix}$,
/// $B = \begin{bmatrix}0\\\\1\end{bmatrix}$.
/// These are fixed constants of the domain, shared by both axes.
pub fn axis_matrices() -> (Array2<f64>, Array2<f64>) {
    (array![[0., 1.], [0., 0.]], array![[0.], [1.]])
}

/// The open-loop planar plant: both axes stacked block-diagonally.
///
/// State ordering is `[x, vx, y, vy]` and the input is the acceleration
/// pair `[ux, uy]`. There is no coupling between the axes.
pub fn planar_plant() -> LtiDynamics<f64> {
    let (a_axis, b_axis) = axis_matrices();
    let eye = Array2::eye(N_AXES);
    LtiDynamics::new(kron(&eye, &a_axis), kron(&eye, &b_axis))
}
