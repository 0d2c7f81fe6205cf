//! Outer state and price vector
//!
//! The outer state holds the slow-moving quantities that stay fixed during an inner
//! solve. Each pass produces a new state value; nothing is updated in place.

use crate::components::{aggregates, firms};
use crate::economy::Economy;
use crate::parameters::ParameterSet;
use nalgebra::DVector;
use ndarray::{s, Array1};
use rcge_core::iteration::DampedState;
use rcge_core::FloatValue;
use serde::{Deserialize, Serialize};

/// Slow-moving quantities of the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OuterState {
    /// Gross output by sector $Z$
    pub output: Array1<FloatValue>,
    /// Factor endowments $F\!f$
    pub factor_supply: Array1<FloatValue>,
    /// Domestically owned capital $K\!d$
    pub domestic_capital: FloatValue,
    /// Composite good by sector $Q$
    pub composite: Array1<FloatValue>,
    /// Price of domestic sales by sector $p_d$
    pub domestic_price: Array1<FloatValue>,
}

impl OuterState {
    /// State reproducing the baseline table
    pub fn baseline(parameters: &ParameterSet) -> Self {
        let flows = &parameters.baseline;
        Self {
            output: flows.output.clone(),
            factor_supply: flows.factor_supply.clone(),
            domestic_capital: flows.domestic_capital,
            composite: flows.composite.clone(),
            domestic_price: Array1::ones(parameters.n_sectors()),
        }
    }

    /// State implied by the quantities derived at the latest inner solution.
    ///
    /// The capital endowment follows the capital stock valued at this pass's prices
    /// and the endowment the inner solve was run with.
    pub fn provisional(&self, parameters: &ParameterSet, economy: &Economy) -> Self {
        let output = firms::transformed_output(
            &parameters.transformation_scale,
            &parameters.export_share,
            &parameters.domestic_sales_share,
            &parameters.transformation_exponent,
            &economy.exports,
            &economy.domestic_sales,
        );
        let composite = aggregates::composite_demand(
            &economy.household_demand,
            &economy.government_demand,
            &economy.investment_demand,
            &economy.intermediate_demand,
        );
        let domestic_price = firms::domestic_price(
            &parameters.armington_scale,
            &parameters.domestic_share,
            &parameters.armington_exponent,
            &economy.composite_price,
            &economy.domestic_sales,
            &self.composite,
        );
        let domestic_capital = aggregates::domestic_capital(
            economy.private_savings,
            economy.government_savings,
            parameters.investment_rate,
            economy.capital_good_price,
            self.domestic_capital,
        );

        let capital = parameters.sets.capital_index();
        let mut factor_supply = self.factor_supply.clone();
        factor_supply[capital] = aggregates::capital_endowment(
            parameters.baseline.factor_supply[capital],
            economy.capital_stock,
            parameters.baseline.capital_stock,
        );

        Self {
            output,
            factor_supply,
            domestic_capital,
            composite,
            domestic_price,
        }
    }

    /// Sum of squared changes in gross output
    pub fn output_distance(&self, other: &OuterState) -> FloatValue {
        (&other.output - &self.output).mapv(|d| d * d).sum()
    }
}

impl DampedState for OuterState {
    fn to_vector(&self) -> Vec<FloatValue> {
        let mut values = Vec::with_capacity(
            self.output.len() * 3 + self.factor_supply.len() + 1,
        );
        values.extend(self.output.iter());
        values.extend(self.factor_supply.iter());
        values.push(self.domestic_capital);
        values.extend(self.composite.iter());
        values.extend(self.domestic_price.iter());
        values
    }

    fn with_values(&self, values: &[FloatValue]) -> Self {
        let n = self.output.len();
        let m = self.factor_supply.len();
        let values = Array1::from_vec(values.to_vec());
        Self {
            output: values.slice(s![..n]).to_owned(),
            factor_supply: values.slice(s![n..n + m]).to_owned(),
            domestic_capital: values[n + m],
            composite: values.slice(s![n + m + 1..2 * n + m + 1]).to_owned(),
            domestic_price: values.slice(s![2 * n + m + 1..]).to_owned(),
        }
    }
}

/// Candidate prices: value-added price per sector followed by factor prices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prices {
    pub value_added: Array1<FloatValue>,
    pub factor: Array1<FloatValue>,
}

impl Prices {
    pub fn ones(n_sectors: usize, n_factors: usize) -> Self {
        Self {
            value_added: Array1::ones(n_sectors),
            factor: Array1::ones(n_factors),
        }
    }

    /// Split a flat price vector after the first `n_sectors` entries
    pub fn from_vector(x: &DVector<FloatValue>, n_sectors: usize) -> Self {
        let values: Vec<FloatValue> = x.iter().copied().collect();
        Self {
            value_added: Array1::from_vec(values[..n_sectors].to_vec()),
            factor: Array1::from_vec(values[n_sectors..].to_vec()),
        }
    }

    pub fn to_vector(&self) -> DVector<FloatValue> {
        DVector::from_iterator(
            self.value_added.len() + self.factor.len(),
            self.value_added.iter().chain(self.factor.iter()).copied(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn state() -> OuterState {
        OuterState {
            output: array![150.0, 185.0],
            factor_supply: array![110.0, 110.0],
            domestic_capital: 846.0,
            composite: array![137.0, 228.0],
            domestic_price: array![1.0, 1.0],
        }
    }

    #[test]
    fn flattening_preserves_fields() {
        let state = state();
        let values = state.to_vector();
        assert_eq!(values.len(), 9);
        assert_eq!(values[4], 846.0);
        assert_eq!(state.with_values(&values), state);
    }

    #[test]
    fn relax_blends_every_field() {
        let previous = state();
        let mut provisional = state();
        provisional.output = array![160.0, 185.0];
        provisional.domestic_capital = 856.0;

        let next = previous.relax(&provisional, 0.1);
        assert!((next.output[0] - 151.0).abs() < 1e-12);
        assert!((next.domestic_capital - 847.0).abs() < 1e-9);
        assert_eq!(next.composite, previous.composite);
        assert!((previous.output_distance(&provisional) - 100.0).abs() < 1e-12);
    }

    #[test]
    fn price_vector_split() {
        let x = DVector::from_vec(vec![1.0, 1.1, 0.9, 1.2]);
        let prices = Prices::from_vector(&x, 2);
        assert_eq!(prices.value_added, array![1.0, 1.1]);
        assert_eq!(prices.factor, array![0.9, 1.2]);
        assert_eq!(prices.to_vector(), x);
    }
}
