//! Outer damped fixed-point iteration
//!
//! The slow-moving state of a model is held fixed while the inner solver finds prices;
//! the prices then imply a provisional state, and the next state is a convex combination
//! of the previous and the provisional one:
//!
//! $$ s_{k+1} = \xi \, s'_k + (1 - \xi) \, s_k $$
//!
//! [`DampedIteration`] is the state machine driving this update. It never runs the inner
//! solver itself, which keeps every transition testable in isolation.

use crate::errors::Diagnostics;
use crate::solver::{InnerSolution, ResidualSystem};
use crate::FloatValue;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Outer state that can be blended with a provisional value.
pub trait DampedState: Clone + Debug {
    /// Flatten the state in a fixed order
    fn to_vector(&self) -> Vec<FloatValue>;

    /// Rebuild a state of the same shape from flattened values
    fn with_values(&self, values: &[FloatValue]) -> Self;

    /// Convex combination `damping * provisional + (1 - damping) * self`
    fn relax(&self, provisional: &Self, damping: FloatValue) -> Self {
        let blended: Vec<FloatValue> = self
            .to_vector()
            .iter()
            .zip(provisional.to_vector())
            .map(|(previous, next)| damping * next + (1.0 - damping) * previous)
            .collect();
        self.with_values(&blended)
    }
}

impl DampedState for FloatValue {
    fn to_vector(&self) -> Vec<FloatValue> {
        vec![*self]
    }

    fn with_values(&self, values: &[FloatValue]) -> Self {
        values.first().copied().unwrap_or(*self)
    }
}

impl DampedState for Vec<FloatValue> {
    fn to_vector(&self) -> Vec<FloatValue> {
        self.clone()
    }

    fn with_values(&self, values: &[FloatValue]) -> Self {
        values.to_vec()
    }
}

/// A model solved by damped iteration over an inner root-finding problem.
pub trait FixedPointProblem {
    type State: DampedState;

    /// Number of unknowns of the inner problem
    fn inner_dimension(&self) -> usize;

    /// Outer state before the first pass
    fn initial_state(&self) -> Self::State;

    /// Starting point of the first inner solve
    fn initial_guess(&self) -> DVector<FloatValue> {
        DVector::from_element(self.inner_dimension(), 1.0)
    }

    /// Inner residuals at `x` with the outer state held fixed
    fn inner_residuals(&self, state: &Self::State, x: &DVector<FloatValue>) -> DVector<FloatValue>;

    /// Outer state implied by an inner solution
    fn provisional(&self, state: &Self::State, x: &DVector<FloatValue>) -> Self::State;

    /// Distance between the current and provisional state used for the convergence test
    fn distance(&self, state: &Self::State, provisional: &Self::State) -> FloatValue;
}

/// Inner problem of a [`FixedPointProblem`] for one frozen outer state
pub struct FrozenState<'a, P: FixedPointProblem> {
    problem: &'a P,
    state: &'a P::State,
}

impl<'a, P: FixedPointProblem> FrozenState<'a, P> {
    pub fn new(problem: &'a P, state: &'a P::State) -> Self {
        Self { problem, state }
    }
}

impl<P: FixedPointProblem> ResidualSystem for FrozenState<'_, P> {
    fn dimension(&self) -> usize {
        self.problem.inner_dimension()
    }

    fn residuals(&self, x: &DVector<FloatValue>) -> DVector<FloatValue> {
        self.problem.inner_residuals(self.state, x)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IterationStatus {
    Running,
    Converged,
    /// The distance between successive states stopped being finite
    Diverged,
    MaxIterExceeded,
}

impl IterationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, IterationStatus::Running)
    }
}

/// Damped update state machine.
///
/// Starts `Running` from the problem's initial state and guess. Each call to
/// [`DampedIteration::advance`] consumes the inner solution for the current state and
/// either terminates or applies one damped update.
#[derive(Debug, Clone)]
pub struct DampedIteration<'a, P: FixedPointProblem> {
    problem: &'a P,
    damping: FloatValue,
    tolerance: FloatValue,
    max_iterations: usize,
    state: P::State,
    prices: DVector<FloatValue>,
    iterations: usize,
    residual_norm: FloatValue,
    distance: FloatValue,
    status: IterationStatus,
}

impl<'a, P: FixedPointProblem> DampedIteration<'a, P> {
    pub fn new(
        problem: &'a P,
        damping: FloatValue,
        tolerance: FloatValue,
        max_iterations: usize,
    ) -> Self {
        Self {
            problem,
            damping,
            tolerance,
            max_iterations,
            state: problem.initial_state(),
            prices: problem.initial_guess(),
            iterations: 0,
            residual_norm: FloatValue::NAN,
            distance: FloatValue::INFINITY,
            status: IterationStatus::Running,
        }
    }

    /// Replace the starting point of the next inner solve
    pub fn with_guess(mut self, guess: DVector<FloatValue>) -> Self {
        self.prices = guess;
        self
    }

    /// Inner problem for the current state
    pub fn frozen(&self) -> FrozenState<'_, P> {
        FrozenState::new(self.problem, &self.state)
    }

    /// Consume the inner solution for the current state.
    ///
    /// On convergence the state the solution was computed against is kept, so the
    /// returned prices and quantities are mutually consistent.
    pub fn advance(&mut self, solution: InnerSolution) -> IterationStatus {
        if self.status.is_terminal() {
            return self.status;
        }

        let provisional = self.problem.provisional(&self.state, &solution.x);
        self.distance = self.problem.distance(&self.state, &provisional);
        self.residual_norm = solution.residual_norm;
        self.prices = solution.x;

        self.status = if !self.distance.is_finite() {
            IterationStatus::Diverged
        } else if self.distance < self.tolerance {
            IterationStatus::Converged
        } else if self.iterations >= self.max_iterations {
            IterationStatus::MaxIterExceeded
        } else {
            self.state = self.state.relax(&provisional, self.damping);
            self.iterations += 1;
            IterationStatus::Running
        };
        self.status
    }

    pub fn status(&self) -> IterationStatus {
        self.status
    }

    pub fn state(&self) -> &P::State {
        &self.state
    }

    /// Latest inner solution, or the starting guess before the first pass
    pub fn prices(&self) -> &DVector<FloatValue> {
        &self.prices
    }

    /// Number of damped updates applied so far
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn residual_norm(&self) -> FloatValue {
        self.residual_norm
    }

    pub fn distance(&self) -> FloatValue {
        self.distance
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            iterations: self.iterations,
            residual_norm: self.residual_norm,
            distance: self.distance,
            prices: self.prices.iter().copied().collect(),
            outer_state: self.state.to_vector(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;

    /// Inner problem `x = s`, provisional state `target - x`
    struct Reflect {
        target: FloatValue,
    }

    impl FixedPointProblem for Reflect {
        type State = FloatValue;

        fn inner_dimension(&self) -> usize {
            1
        }

        fn initial_state(&self) -> FloatValue {
            0.0
        }

        fn inner_residuals(&self, state: &FloatValue, x: &DVector<FloatValue>) -> DVector<FloatValue> {
            DVector::from_element(1, x[0] - state)
        }

        fn provisional(&self, _state: &FloatValue, x: &DVector<FloatValue>) -> FloatValue {
            self.target - x[0]
        }

        fn distance(&self, state: &FloatValue, provisional: &FloatValue) -> FloatValue {
            (provisional - state).powi(2)
        }
    }

    fn exact(state: FloatValue) -> InnerSolution {
        InnerSolution {
            x: DVector::from_element(1, state),
            residual_norm: 0.0,
            iterations: 1,
            evaluations: 2,
        }
    }

    #[test]
    fn relax_blends_elementwise() {
        let previous = vec![1.0, 2.0];
        let blended = previous.relax(&vec![3.0, 0.0], 0.25);
        assert!(is_close!(blended[0], 1.5));
        assert!(is_close!(blended[1], 1.5));
        assert!(is_close!(4.0_f64.relax(&0.0, 1.0), 0.0));
    }

    #[test]
    fn damped_update() {
        let problem = Reflect { target: 1.0 };
        let mut iteration = DampedIteration::new(&problem, 0.1, 1e-10, 10);
        assert_eq!(iteration.status(), IterationStatus::Running);

        let status = iteration.advance(exact(0.0));
        assert_eq!(status, IterationStatus::Running);
        assert_eq!(iteration.iterations(), 1);
        assert!(is_close!(*iteration.state(), 0.1));
        assert!(is_close!(iteration.distance(), 1.0));
    }

    #[test]
    fn converged_state_is_not_blended() {
        let problem = Reflect { target: 1.0 };
        let mut iteration = DampedIteration::new(&problem, 0.1, 1e-10, 10);
        // s = 0.5 is the fixed point
        iteration.state = 0.5;
        assert_eq!(iteration.advance(exact(0.5)), IterationStatus::Converged);
        assert_eq!(iteration.iterations(), 0);
        assert!(is_close!(*iteration.state(), 0.5));

        // terminal states are sticky
        assert_eq!(iteration.advance(exact(0.0)), IterationStatus::Converged);
    }

    #[test]
    fn undamped_oscillation_hits_the_cap() {
        let problem = Reflect { target: 1.0 };
        let mut iteration = DampedIteration::new(&problem, 1.0, 1e-10, 5);
        let mut status = IterationStatus::Running;
        while !status.is_terminal() {
            let s = *iteration.state();
            status = iteration.advance(exact(s));
        }
        assert_eq!(status, IterationStatus::MaxIterExceeded);
        assert_eq!(iteration.iterations(), 5);

        let diagnostics = iteration.diagnostics();
        assert_eq!(diagnostics.iterations, 5);
        assert_eq!(diagnostics.outer_state.len(), 1);
        assert!(is_close!(diagnostics.distance, 1.0));
    }

    #[test]
    fn non_finite_distance_diverges() {
        let problem = Reflect {
            target: FloatValue::NAN,
        };
        let mut iteration = DampedIteration::new(&problem, 0.1, 1e-10, 5);
        assert_eq!(iteration.advance(exact(0.0)), IterationStatus::Diverged);
    }
}
