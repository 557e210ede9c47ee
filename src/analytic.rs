//! Closed-form propagation of a linear system via the matrix
//! exponential.
//!
//! For an autonomous linear system $\dot{x} = Mx$ the solution is known
//! exactly: $x(t) = e^{Mt} x(0)$. On a uniform grid this reduces to one
//! exponential $\Phi = e^{M\,dt}$ applied repeatedly, which doubles as
//! the reference oracle for the numerical integrators.

use ndarray::{Array1, Array2};

/// The matrix exponential $e^{M}$ by scaling-and-squaring.
///
/// The matrix is scaled by a power of two until its infinity norm is at
/// most one half, the exponential of the scaled matrix is summed as a
/// truncated Taylor series, and the result is squared back up. For the
/// small dense matrices this crate works with the series converges to
/// machine precision in well under twenty terms.
pub fn expm(m: &Array2<f64>) -> Array2<f64> {
    assert_eq!(m.nrows(), m.ncols());
    let n = m.nrows();
    let norm = m
        .rows()
        .into_iter()
        .map(|row| row.iter().map(|el| el.abs()).sum::<f64>())
        .fold(0.0, f64::max);
    let squarings = if norm > 0.5 {
        (norm / 0.5).log2().ceil() as i32
    } else {
        0
    };
    let scaled = m / 2f64.powi(squarings);

    let mut result = Array2::eye(n);
    let mut term = Array2::eye(n);
    for k in 1..=24 {
        term = term.dot(&scaled) / k as f64;
        result = result + &term;
        let term_max = term.iter().fold(0.0f64, |acc, &el| acc.max(el.abs()));
        if term_max < f64::EPSILON {
            break;
        }
    }
    for _ in 0..squarings {
        result = result.dot(&result);
    }
    result
}

/// Propagate `x0` exactly over `n_samples` uniform steps of `dt`.
///
/// Row `i` of the result is the state at `i * dt`; row 0 is `x0`
/// itself.
pub fn exact_history(m: &Array2<f64>, x0: &Array1<f64>, n_samples: usize, dt: f64) -> Array2<f64> {
    let mut states = Array2::zeros((n_samples, x0.len()));
    if n_samples == 0 {
        return states;
    }
    states.row_mut(0).assign(x0);
    let phi = expm(&(m * dt));
    for i in 1..n_samples {
        let next = phi.dot(&states.row(i - 1));
        states.row_mut(i).assign(&next);
    }
    states
}
