//! Inner nonlinear solver
//!
//! The inner solver only sees a [`ResidualSystem`]: a pure map from a candidate vector to
//! a residual vector of the same length. Which algorithm drives the residuals to zero
//! is a configuration choice, serialised through `typetag`.

mod levenberg_marquardt;

pub use levenberg_marquardt::LevenbergMarquardt;

use crate::errors::CGEResult;
use crate::FloatValue;
use nalgebra::DVector;
use std::fmt::Debug;

/// Square system of equations `r(x) = 0`.
///
/// Implementations must be referentially transparent: repeated evaluations at the same
/// point return the same residuals and leave no observable state behind.
pub trait ResidualSystem {
    /// Number of unknowns (and of equations)
    fn dimension(&self) -> usize;

    /// Residuals at `x`.
    ///
    /// Entries may be non-finite when `x` is outside the domain of the equations.
    fn residuals(&self, x: &DVector<FloatValue>) -> DVector<FloatValue>;
}

/// Result of a successful inner solve
#[derive(Debug, Clone, PartialEq)]
pub struct InnerSolution {
    pub x: DVector<FloatValue>,
    /// Euclidean norm of the residuals at `x`
    pub residual_norm: FloatValue,
    pub iterations: usize,
    /// Number of residual evaluations, including those for the Jacobian
    pub evaluations: usize,
}

/// Root finder for a [`ResidualSystem`].
///
/// A failed solve returns [`crate::errors::CGEError::InnerSolveNonConvergence`] carrying
/// the best iterate found, so callers can restart from it.
#[typetag::serde(tag = "type")]
pub trait InnerSolver: Debug + Send + Sync {
    fn solve(
        &self,
        system: &dyn ResidualSystem,
        guess: &DVector<FloatValue>,
    ) -> CGEResult<InnerSolution>;

    /// Residual norm under which a system counts as solved
    fn tolerance(&self) -> FloatValue;
}
