//! Market-clearing residuals
//!
//! One equation per sector (value added equals what the employed factors produce) and
//! one per factor (factor demand equals supply). For capital the supply is the
//! endowment implied by the capital stock valued at the candidate prices.

use crate::components::{aggregates, firms};
use crate::economy::Economy;
use crate::parameters::ParameterSet;
use crate::state::{OuterState, Prices};
use nalgebra::DVector;
use ndarray::Axis;
use rcge_core::solver::ResidualSystem;
use rcge_core::FloatValue;

/// Residuals of every market given the derived quantities
pub fn market_clearing(
    parameters: &ParameterSet,
    state: &OuterState,
    economy: &Economy,
) -> DVector<FloatValue> {
    let production = firms::production_gap(
        &parameters.productivity,
        &parameters.factor_share,
        &economy.factor_demand,
        &economy.value_added,
    );
    let employed = economy.factor_demand.sum_axis(Axis(1));
    let capital = parameters.sets.capital_index();

    let factors = employed.iter().enumerate().map(|(h, demand)| {
        if h == capital {
            demand
                - aggregates::capital_endowment(
                    parameters.baseline.factor_supply[capital],
                    economy.capital_stock,
                    parameters.baseline.capital_stock,
                )
        } else {
            state.factor_supply[h] - demand
        }
    });

    DVector::from_iterator(
        production.len() + employed.len(),
        production.iter().copied().chain(factors),
    )
}

/// Residual system for one frozen outer state.
///
/// Every evaluation recomputes the economy from scratch; nothing is cached between
/// calls.
pub struct MarketClearing<'a> {
    parameters: &'a ParameterSet,
    state: &'a OuterState,
}

impl<'a> MarketClearing<'a> {
    pub fn new(parameters: &'a ParameterSet, state: &'a OuterState) -> Self {
        Self { parameters, state }
    }
}

impl ResidualSystem for MarketClearing<'_> {
    fn dimension(&self) -> usize {
        self.parameters.sets.price_dimension()
    }

    fn residuals(&self, x: &DVector<FloatValue>) -> DVector<FloatValue> {
        let prices = Prices::from_vector(x, self.parameters.n_sectors());
        let economy = Economy::evaluate(self.parameters, self.state, &prices);
        market_clearing(self.parameters, self.state, &economy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample;
    use rcge_core::sets::Sets;

    fn calibrated() -> ParameterSet {
        let (sam, config) = sample::open_economy().unwrap();
        let sets = Sets::classify(&sam, &config.accounts).unwrap();
        ParameterSet::calibrate(&sam, &sets, &config.elasticities, &config.calibration).unwrap()
    }

    #[test]
    fn baseline_prices_clear_every_market() {
        let parameters = calibrated();
        let state = OuterState::baseline(&parameters);
        let system = MarketClearing::new(&parameters, &state);
        assert_eq!(system.dimension(), 4);

        let r = system.residuals(&DVector::from_element(4, 1.0));
        assert_eq!(r.len(), 4);
        assert!(r.norm() < 1e-9, "baseline residuals {:?}", r);
    }

    #[test]
    fn evaluation_is_referentially_transparent() {
        let parameters = calibrated();
        let state = OuterState::baseline(&parameters);
        let system = MarketClearing::new(&parameters, &state);
        let x = DVector::from_vec(vec![1.1, 0.9, 1.05, 0.95]);

        let first = system.residuals(&x);
        let _ = system.residuals(&DVector::from_element(4, 2.0));
        assert_eq!(system.residuals(&x), first);
        assert!(first.norm() > 1e-3);
    }

    #[test]
    fn zero_price_gives_non_finite_residuals() {
        let parameters = calibrated();
        let state = OuterState::baseline(&parameters);
        let system = MarketClearing::new(&parameters, &state);
        let r = system.residuals(&DVector::from_vec(vec![1.0, 1.0, 0.0, 1.0]));
        assert!(r.iter().any(|v| !v.is_finite()));
    }
}
