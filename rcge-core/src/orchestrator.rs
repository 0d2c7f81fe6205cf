//! Two-level equilibrium search
//!
//! The orchestrator owns the outer loop: it runs the inner solver against the frozen
//! outer state, restarts failed inner solves from their best iterate a bounded number of
//! times, feeds solutions to the [`DampedIteration`] and turns terminal states into
//! results or errors.

use crate::config::SolverConfig;
use crate::errors::{CGEError, CGEResult};
use crate::iteration::{DampedIteration, FixedPointProblem, IterationStatus};
use crate::solver::{InnerSolution, ResidualSystem};
use crate::FloatValue;
use nalgebra::DVector;

/// Converged outer state and the prices solving the inner problem for it
#[derive(Debug, Clone)]
pub struct FixedPoint<S> {
    pub state: S,
    pub prices: DVector<FloatValue>,
    /// Number of damped updates applied before convergence
    pub iterations: usize,
    /// Inner residual norm at `prices`
    pub residual_norm: FloatValue,
    /// Final distance between the outer state and its provisional update
    pub distance: FloatValue,
}

pub struct Orchestrator<'a> {
    config: &'a SolverConfig,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a SolverConfig) -> Self {
        Self { config }
    }

    /// Solve from the problem's own initial guess
    pub fn solve<P: FixedPointProblem>(&self, problem: &P) -> CGEResult<FixedPoint<P::State>> {
        self.solve_from(problem, problem.initial_guess())
    }

    /// Solve starting the first inner solve at `guess`.
    ///
    /// Later passes start from the previous pass's solution.
    pub fn solve_from<P: FixedPointProblem>(
        &self,
        problem: &P,
        guess: DVector<FloatValue>,
    ) -> CGEResult<FixedPoint<P::State>> {
        self.config.validate()?;
        if guess.len() != problem.inner_dimension() {
            return Err(CGEError::Config(format!(
                "initial guess has {} entries, the inner problem has {} unknowns",
                guess.len(),
                problem.inner_dimension()
            )));
        }

        let mut iteration = DampedIteration::new(
            problem,
            self.config.damping,
            self.config.outer_tolerance,
            self.config.max_outer_iterations,
        )
        .with_guess(guess);

        log::info!(
            "Starting damped iteration over {} unknowns (damping {}, tolerance {:e})",
            problem.inner_dimension(),
            self.config.damping,
            self.config.outer_tolerance
        );

        loop {
            let solution = self.inner_solve(&iteration.frozen(), iteration.prices())?;
            let inner_iterations = solution.iterations;
            let status = iteration.advance(solution);

            log::debug!(
                "Outer pass {}: distance {:e}, {} inner iterations, residual norm {:e}",
                iteration.iterations(),
                iteration.distance(),
                inner_iterations,
                iteration.residual_norm()
            );

            match status {
                IterationStatus::Running => continue,
                IterationStatus::Converged => {
                    log::info!(
                        "Converged after {} damped updates (distance {:e})",
                        iteration.iterations(),
                        iteration.distance()
                    );
                    return Ok(FixedPoint {
                        state: iteration.state().clone(),
                        prices: iteration.prices().clone(),
                        iterations: iteration.iterations(),
                        residual_norm: iteration.residual_norm(),
                        distance: iteration.distance(),
                    });
                }
                IterationStatus::Diverged => {
                    log::warn!(
                        "Outer iteration diverged after {} updates",
                        iteration.iterations()
                    );
                    return Err(CGEError::OuterDiverged(Box::new(iteration.diagnostics())));
                }
                IterationStatus::MaxIterExceeded => {
                    log::warn!(
                        "Outer iteration stopped at the cap of {} updates (distance {:e})",
                        iteration.iterations(),
                        iteration.distance()
                    );
                    return Err(CGEError::OuterMaxIterationsExceeded(Box::new(
                        iteration.diagnostics(),
                    )));
                }
            }
        }
    }

    /// Inner solve with bounded restarts from the best iterate of a failed attempt
    fn inner_solve(
        &self,
        system: &dyn ResidualSystem,
        guess: &DVector<FloatValue>,
    ) -> CGEResult<InnerSolution> {
        let mut guess = guess.clone();
        let mut retries = 0;
        loop {
            match self.config.inner_solver.solve(system, &guess) {
                Err(CGEError::InnerSolveNonConvergence {
                    iterations,
                    residual_norm,
                    best,
                }) if retries < self.config.max_inner_retries => {
                    retries += 1;
                    log::warn!(
                        "Inner solve failed after {} iterations (residual norm {:e}), restart {} of {}",
                        iterations,
                        residual_norm,
                        retries,
                        self.config.max_inner_retries
                    );
                    guess = DVector::from_vec(best);
                }
                result => return result,
            }
        }
    }
}
