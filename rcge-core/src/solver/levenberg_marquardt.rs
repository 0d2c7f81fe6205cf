use crate::errors::{CGEError, CGEResult};
use crate::solver::{InnerSolution, InnerSolver, ResidualSystem};
use crate::FloatValue;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Square root of machine epsilon, the relative step of the finite-difference Jacobian
const JACOBIAN_STEP: FloatValue = 1.490_116_119_384_765_6e-8;
const MIN_DAMPING: FloatValue = 1e-12;
const MAX_DAMPING: FloatValue = 1e16;
const MIN_DIAGONAL: FloatValue = 1e-12;

/// Damped Gauss-Newton (Levenberg-Marquardt) root finder.
///
/// Each iteration builds a forward-difference Jacobian $J$ and solves
///
/// $$ (J^T J + \lambda \, \mathrm{diag}(J^T J)) \, \delta = -J^T r $$
///
/// A step is accepted when it lowers $\|r\|^2$, after which $\lambda$ shrinks tenfold;
/// rejected steps grow $\lambda$ tenfold until a step is accepted or $\lambda$ exceeds
/// its ceiling. Residual entries that are not finite count as `invalid_residual`, so
/// trial points outside the domain of the equations are rejected instead of aborting.
///
/// Reaching `tolerance` does not stop the iteration by itself. The solver keeps
/// stepping until the relative step falls under `step_tolerance` or no step lowers
/// the residual, so a warm start that is already within `tolerance` is still refined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevenbergMarquardt {
    /// Residual norm under which the system is solved.
    ///
    /// Default: 1e-5
    pub tolerance: FloatValue,

    /// Relative step size under which a solved system stops refining.
    ///
    /// Default: 1e-10
    pub step_tolerance: FloatValue,

    /// Iteration budget.
    ///
    /// Default: 200
    pub max_iterations: usize,

    /// Starting value of the damping parameter $\lambda$.
    ///
    /// Default: 1e-3
    pub initial_damping: FloatValue,

    /// Value substituted for non-finite residual entries.
    ///
    /// Default: 1e10
    pub invalid_residual: FloatValue,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self {
            tolerance: 1e-5,
            step_tolerance: 1e-10,
            max_iterations: 200,
            initial_damping: 1e-3,
            invalid_residual: 1e10,
        }
    }
}

impl LevenbergMarquardt {
    pub fn with_max_iterations(self, max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..self
        }
    }

    fn evaluate(
        &self,
        system: &dyn ResidualSystem,
        x: &DVector<FloatValue>,
        evaluations: &mut usize,
    ) -> DVector<FloatValue> {
        *evaluations += 1;
        system.residuals(x).map(|v| {
            if v.is_finite() {
                v
            } else {
                self.invalid_residual
            }
        })
    }

    fn jacobian(
        &self,
        system: &dyn ResidualSystem,
        x: &DVector<FloatValue>,
        r: &DVector<FloatValue>,
        evaluations: &mut usize,
    ) -> DMatrix<FloatValue> {
        let n = x.len();
        let mut jacobian = DMatrix::zeros(r.len(), n);
        for j in 0..n {
            let h = JACOBIAN_STEP * x[j].abs().max(1.0);
            let mut shifted = x.clone();
            shifted[j] += h;
            let column = (self.evaluate(system, &shifted, evaluations) - r) / h;
            jacobian.set_column(j, &column);
        }
        jacobian
    }

    fn step_is_negligible(&self, step: &DVector<FloatValue>, x: &DVector<FloatValue>) -> bool {
        step.norm() <= self.step_tolerance * (x.norm() + self.step_tolerance)
    }

    fn failure(
        &self,
        iterations: usize,
        residual_norm: FloatValue,
        best: &DVector<FloatValue>,
    ) -> CGEError {
        CGEError::InnerSolveNonConvergence {
            iterations,
            residual_norm,
            best: best.iter().copied().collect(),
        }
    }
}

#[typetag::serde]
impl InnerSolver for LevenbergMarquardt {
    fn solve(
        &self,
        system: &dyn ResidualSystem,
        guess: &DVector<FloatValue>,
    ) -> CGEResult<InnerSolution> {
        let mut evaluations = 0;
        let mut x = guess.clone();
        let mut r = self.evaluate(system, &x, &mut evaluations);
        let mut norm = r.norm();
        let mut damping = self.initial_damping;
        let mut taken = 0;

        for iteration in 1..=self.max_iterations {
            let jacobian = self.jacobian(system, &x, &r, &mut evaluations);
            let jtj = jacobian.transpose() * &jacobian;
            let gradient = jacobian.transpose() * &r;
            let cost = r.norm_squared();

            let mut accepted = false;
            while damping < MAX_DAMPING {
                let mut lhs = jtj.clone();
                for i in 0..lhs.nrows() {
                    lhs[(i, i)] += damping * jtj[(i, i)].max(MIN_DIAGONAL);
                }
                let step = match lhs.lu().solve(&(-&gradient)) {
                    Some(step) => step,
                    None => {
                        damping *= 10.0;
                        continue;
                    }
                };
                if norm < self.tolerance && self.step_is_negligible(&step, &x) {
                    return Ok(InnerSolution {
                        x,
                        residual_norm: norm,
                        iterations: taken,
                        evaluations,
                    });
                }

                let trial = &x + &step;
                let trial_r = self.evaluate(system, &trial, &mut evaluations);
                if trial_r.norm_squared() < cost {
                    x = trial;
                    r = trial_r;
                    damping = (damping / 10.0).max(MIN_DAMPING);
                    accepted = true;
                    taken = iteration;
                    break;
                }
                damping *= 10.0;
            }

            norm = r.norm();
            log::trace!(
                "Levenberg-Marquardt iteration {}: residual norm {:e}, damping {:e}",
                iteration,
                norm,
                damping
            );

            if !accepted {
                if norm < self.tolerance {
                    return Ok(InnerSolution {
                        x,
                        residual_norm: norm,
                        iterations: taken,
                        evaluations,
                    });
                }
                log::debug!(
                    "Levenberg-Marquardt stalled after {} iterations at residual norm {:e}",
                    iteration,
                    norm
                );
                return Err(self.failure(iteration, norm, &x));
            }
        }

        if norm < self.tolerance {
            return Ok(InnerSolution {
                x,
                residual_norm: norm,
                iterations: taken,
                evaluations,
            });
        }
        Err(self.failure(self.max_iterations, norm, &x))
    }

    fn tolerance(&self) -> FloatValue {
        self.tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::sync::Arc;

    /// x^2 + y^2 = 4, x = y
    struct Circle;

    impl ResidualSystem for Circle {
        fn dimension(&self) -> usize {
            2
        }

        fn residuals(&self, x: &DVector<FloatValue>) -> DVector<FloatValue> {
            DVector::from_vec(vec![x[0] * x[0] + x[1] * x[1] - 4.0, x[0] - x[1]])
        }
    }

    /// sqrt(x) = 2, undefined for negative x
    struct SquareRoot;

    impl ResidualSystem for SquareRoot {
        fn dimension(&self) -> usize {
            1
        }

        fn residuals(&self, x: &DVector<FloatValue>) -> DVector<FloatValue> {
            DVector::from_vec(vec![x[0].sqrt() - 2.0])
        }
    }

    /// x^2 + 1 = 0 has no real root
    struct NoRoot;

    impl ResidualSystem for NoRoot {
        fn dimension(&self) -> usize {
            1
        }

        fn residuals(&self, x: &DVector<FloatValue>) -> DVector<FloatValue> {
            DVector::from_vec(vec![x[0] * x[0] + 1.0])
        }
    }

    #[test]
    fn solves_nonlinear_system() {
        let solver = LevenbergMarquardt::default();
        let solution = solver
            .solve(&Circle, &DVector::from_vec(vec![1.0, 3.0]))
            .unwrap();

        let expected = 2.0_f64.sqrt();
        assert_abs_diff_eq!(solution.x[0], expected, epsilon = 1e-5);
        assert_abs_diff_eq!(solution.x[1], expected, epsilon = 1e-5);
        assert!(solution.residual_norm < solver.tolerance);
        assert!(solution.iterations > 0);
        assert!(solution.evaluations > solution.iterations);
    }

    #[test]
    fn solved_guess_needs_no_iterations() {
        let solver = LevenbergMarquardt::default();
        let guess = DVector::from_element(2, 2.0_f64.sqrt());
        let solution = solver.solve(&Circle, &guess).unwrap();
        assert_eq!(solution.iterations, 0);
        // Residual plus one Jacobian
        assert_eq!(solution.evaluations, 3);
        assert_eq!(solution.x, guess);
    }

    #[test]
    fn guess_within_tolerance_is_refined() {
        let solver = LevenbergMarquardt::default();
        let root = 2.0_f64.sqrt();
        let guess = DVector::from_vec(vec![root + 1e-6, root - 1e-6]);
        assert!(Circle.residuals(&guess).norm() < solver.tolerance);

        let solution = solver.solve(&Circle, &guess).unwrap();
        assert!(solution.iterations > 0);
        assert!(solution.residual_norm < 1e-10);
        assert_abs_diff_eq!(solution.x[0], root, epsilon = 1e-10);
        assert_abs_diff_eq!(solution.x[1], root, epsilon = 1e-10);
    }

    #[test]
    fn loose_step_tolerance_accepts_guess_within_tolerance() {
        let solver = LevenbergMarquardt {
            step_tolerance: 1e-3,
            ..Default::default()
        };
        let root = 2.0_f64.sqrt();
        let guess = DVector::from_vec(vec![root + 1e-6, root - 1e-6]);
        let solution = solver.solve(&Circle, &guess).unwrap();
        assert_eq!(solution.iterations, 0);
        assert_eq!(solution.x, guess);
    }

    #[test]
    fn invalid_trial_points_are_rejected() {
        // The undamped first step from 100 lands at a negative x
        let solver = LevenbergMarquardt::default();
        let solution = solver
            .solve(&SquareRoot, &DVector::from_vec(vec![100.0]))
            .unwrap();
        assert_abs_diff_eq!(solution.x[0], 4.0, epsilon = 1e-3);
    }

    #[test]
    fn reports_best_iterate_without_root() {
        let solver = LevenbergMarquardt::default();
        match solver.solve(&NoRoot, &DVector::from_vec(vec![3.0])) {
            Err(CGEError::InnerSolveNonConvergence {
                residual_norm,
                best,
                ..
            }) => {
                assert_eq!(best.len(), 1);
                assert!(residual_norm >= 1.0);
                assert!(best[0].abs() < 3.0);
            }
            other => panic!("Expected non-convergence, got {:?}", other),
        }
    }

    #[test]
    fn iteration_cap() {
        let solver = LevenbergMarquardt::default().with_max_iterations(1);
        match solver.solve(&Circle, &DVector::from_vec(vec![10.0, -7.0])) {
            Err(CGEError::InnerSolveNonConvergence { iterations, .. }) => {
                assert_eq!(iterations, 1)
            }
            other => panic!("Expected non-convergence, got {:?}", other),
        }
    }

    #[test]
    fn serialises_as_trait_object() {
        let solver: Arc<dyn InnerSolver> = Arc::new(LevenbergMarquardt {
            tolerance: 1e-8,
            ..Default::default()
        });
        let json = serde_json::to_string(&solver).unwrap();
        assert!(json.contains(r#""type":"LevenbergMarquardt""#));

        let restored: Arc<dyn InnerSolver> =
            serde_json::from_str(r#"{"type": "LevenbergMarquardt", "max_iterations": 5}"#)
                .unwrap();
        assert_eq!(restored.tolerance(), 1e-5);
        let json = serde_json::to_string(&restored).unwrap();
        assert!(json.contains(r#""step_tolerance":1e-10"#));
    }
}
