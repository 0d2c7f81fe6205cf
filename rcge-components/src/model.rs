//! The general equilibrium model
//!
//! A [`CGEModel`] is built once from a validated accounting table and a configuration.
//! Solving it runs the damped two-level iteration from `rcge-core` and packages the
//! converged state, prices and market-balance diagnostics into an [`Equilibrium`].

use crate::config::ModelConfig;
use crate::economy::Economy;
use crate::parameters::ParameterSet;
use crate::residuals::MarketClearing;
use crate::state::{OuterState, Prices};
use nalgebra::DVector;
use ndarray::Axis;
use rcge_core::config::SolverConfig;
use rcge_core::errors::{CGEError, CGEResult};
use rcge_core::iteration::FixedPointProblem;
use rcge_core::orchestrator::{FixedPoint, Orchestrator};
use rcge_core::sam::SocialAccountingMatrix;
use rcge_core::sets::Sets;
use rcge_core::solver::ResidualSystem;
use rcge_core::FloatValue;
use serde::{Deserialize, Serialize};

/// Ordered label/value pairs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelledSeries(pub Vec<(String, FloatValue)>);

impl LabelledSeries {
    pub fn new(labels: &[String], values: impl IntoIterator<Item = FloatValue>) -> Self {
        Self(labels.iter().cloned().zip(values).collect())
    }

    pub fn get(&self, label: &str) -> Option<FloatValue> {
        self.0.iter().find(|(l, _)| l == label).map(|(_, v)| *v)
    }

    pub fn values(&self) -> Vec<FloatValue> {
        self.0.iter().map(|(_, v)| *v).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, FloatValue)> {
        self.0.iter()
    }
}

/// Value of excess demand in each group of markets.
///
/// By Walras' law the sum vanishes at an equilibrium.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketBalance {
    /// Composite demand less composite supply, at composite prices
    pub goods: FloatValue,
    /// Factor demand less endowments, at factor prices
    pub factors: FloatValue,
    /// Savings less investment spending
    pub savings_investment: FloatValue,
    /// Export earnings and capital inflows less imports and income paid abroad
    pub balance_of_payments: FloatValue,
}

impl MarketBalance {
    pub fn evaluate(state: &OuterState, economy: &Economy) -> Self {
        let demand = crate::components::aggregates::composite_demand(
            &economy.household_demand,
            &economy.government_demand,
            &economy.investment_demand,
            &economy.intermediate_demand,
        );
        let employed = economy.factor_demand.sum_axis(Axis(1));

        Self {
            goods: economy.composite_price.dot(&(&demand - &state.composite)),
            factors: economy.prices.factor.dot(&(&employed - &state.factor_supply)),
            savings_investment: economy.private_savings + economy.government_savings
                + economy.foreign_savings
                - economy.composite_price.dot(&economy.investment_demand),
            balance_of_payments: economy.export_price.dot(&economy.exports)
                - economy.import_price.dot(&economy.imports)
                + economy.foreign_savings
                - economy.repatriated,
        }
    }

    pub fn walras_sum(&self) -> FloatValue {
        self.goods + self.factors + self.savings_investment + self.balance_of_payments
    }
}

/// Result of a converged solve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equilibrium {
    /// Composite good supplied in each sector
    pub composite_supply: LabelledSeries,
    /// Value-added prices by sector followed by factor prices
    pub prices: LabelledSeries,
    pub composite_prices: LabelledSeries,
    pub output: LabelledSeries,
    pub outer_state: OuterState,
    /// Damped updates needed to converge
    pub iterations: usize,
    /// Inner residual norm at the returned prices
    pub residual_norm: FloatValue,
    /// Last outer distance
    pub distance: FloatValue,
    pub balance: MarketBalance,
}

/// Calibrated model ready to be solved
#[derive(Debug, Clone)]
pub struct CGEModel {
    parameters: ParameterSet,
}

impl CGEModel {
    pub fn new(parameters: ParameterSet) -> Self {
        Self { parameters }
    }

    /// Validate the table, classify its accounts, calibrate and apply the scenario.
    ///
    /// Structural and calibration errors are returned before any solving happens.
    pub fn from_sam(sam: &SocialAccountingMatrix, config: &ModelConfig) -> CGEResult<Self> {
        sam.validate_with_tolerance(config.balance_tolerance)?;
        let sets = Sets::classify(sam, &config.accounts)?;
        log::info!(
            "Classified {} accounts: sectors {:?}, factors {:?}, households {:?}",
            sam.len(),
            sets.sectors,
            sets.factors,
            sets.households
        );
        let parameters =
            ParameterSet::calibrate(sam, &sets, &config.elasticities, &config.calibration)?
                .with_scenario(&config.scenario)?;
        Ok(Self::new(parameters))
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    /// Equation residuals at `x` for a given outer state.
    ///
    /// `x` holds one price per sector followed by one per factor.
    pub fn residuals(
        &self,
        state: &OuterState,
        x: &DVector<FloatValue>,
    ) -> CGEResult<DVector<FloatValue>> {
        let system = MarketClearing::new(&self.parameters, state);
        if x.len() != system.dimension() {
            return Err(CGEError::Config(format!(
                "Expected {} prices but got {}",
                system.dimension(),
                x.len()
            )));
        }
        Ok(system.residuals(x))
    }

    pub fn solve(&self, solver: &SolverConfig) -> CGEResult<Equilibrium> {
        self.solve_from(solver, self.initial_guess())
    }

    /// Solve with a custom starting point for the first inner solve
    pub fn solve_from(
        &self,
        solver: &SolverConfig,
        guess: DVector<FloatValue>,
    ) -> CGEResult<Equilibrium> {
        let fixed_point = Orchestrator::new(solver).solve_from(self, guess)?;
        Ok(self.equilibrium(fixed_point))
    }

    fn equilibrium(&self, fixed_point: FixedPoint<OuterState>) -> Equilibrium {
        let sets = &self.parameters.sets;
        let prices = Prices::from_vector(&fixed_point.prices, self.parameters.n_sectors());
        let economy = Economy::evaluate(&self.parameters, &fixed_point.state, &prices);
        let balance = MarketBalance::evaluate(&fixed_point.state, &economy);
        let price_labels: Vec<String> = sets.sectors.iter().chain(&sets.factors).cloned().collect();

        Equilibrium {
            composite_supply: LabelledSeries::new(
                &sets.sectors,
                fixed_point.state.composite.iter().copied(),
            ),
            prices: LabelledSeries::new(&price_labels, fixed_point.prices.iter().copied()),
            composite_prices: LabelledSeries::new(
                &sets.sectors,
                economy.composite_price.iter().copied(),
            ),
            output: LabelledSeries::new(&sets.sectors, fixed_point.state.output.iter().copied()),
            outer_state: fixed_point.state,
            iterations: fixed_point.iterations,
            residual_norm: fixed_point.residual_norm,
            distance: fixed_point.distance,
            balance,
        }
    }
}

impl FixedPointProblem for CGEModel {
    type State = OuterState;

    fn inner_dimension(&self) -> usize {
        self.parameters.sets.price_dimension()
    }

    fn initial_state(&self) -> OuterState {
        OuterState::baseline(&self.parameters)
    }

    fn inner_residuals(&self, state: &OuterState, x: &DVector<FloatValue>) -> DVector<FloatValue> {
        MarketClearing::new(&self.parameters, state).residuals(x)
    }

    fn provisional(&self, state: &OuterState, x: &DVector<FloatValue>) -> OuterState {
        let prices = Prices::from_vector(x, self.parameters.n_sectors());
        let economy = Economy::evaluate(&self.parameters, state, &prices);
        state.provisional(&self.parameters, &economy)
    }

    fn distance(&self, state: &OuterState, provisional: &OuterState) -> FloatValue {
        state.output_distance(provisional)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample;
    use approx::assert_relative_eq;

    fn closed_model() -> CGEModel {
        let (sam, config) = sample::two_sector_closed().unwrap();
        CGEModel::from_sam(&sam, &config).unwrap()
    }

    #[test]
    fn closed_economy_is_already_in_equilibrium() {
        let model = closed_model();
        let equilibrium = model.solve(&SolverConfig::default()).unwrap();

        assert_eq!(equilibrium.iterations, 0);
        for (_, price) in equilibrium.prices.iter() {
            assert_relative_eq!(*price, 1.0, max_relative = 1e-9);
        }
        assert_eq!(
            equilibrium.prices.0.iter().map(|(l, _)| l.as_str()).collect::<Vec<_>>(),
            vec!["AGR", "MAN", "K"]
        );
        assert_relative_eq!(equilibrium.output.get("AGR").unwrap(), 60.0, max_relative = 1e-9);
        assert_relative_eq!(equilibrium.output.get("MAN").unwrap(), 60.0, max_relative = 1e-9);
        assert!(equilibrium.balance.walras_sum().abs() < 1e-8);
    }

    #[test]
    fn problem_dimensions() {
        let model = closed_model();
        assert_eq!(model.inner_dimension(), 3);
        let state = model.initial_state();
        let provisional = model.provisional(&state, &model.initial_guess());
        assert!(model.distance(&state, &provisional) < 1e-10);
    }

    #[test]
    fn residuals_check_price_count() {
        let model = closed_model();
        let state = model.initial_state();

        let r = model.residuals(&state, &DVector::from_element(3, 1.0)).unwrap();
        assert_eq!(r.len(), 3);
        assert!(r.amax() < 1e-9);

        let err = model
            .residuals(&state, &DVector::from_element(1, 1.0))
            .unwrap_err();
        assert!(matches!(err, CGEError::Config(_)));
    }

    #[test]
    fn labelled_series() {
        let labels = vec!["A".to_string(), "B".to_string()];
        let series = LabelledSeries::new(&labels, [1.0, 2.0]);
        assert_eq!(series.get("B"), Some(2.0));
        assert_eq!(series.get("C"), None);
        assert_eq!(series.values(), vec![1.0, 2.0]);

        let json = serde_json::to_string(&series).unwrap();
        assert_eq!(json, r#"[["A",1.0],["B",2.0]]"#);
    }
}
