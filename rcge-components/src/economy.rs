//! Quantities derived from prices and the outer state
//!
//! [`Economy::evaluate`] chains the equation library in dependency order: world
//! prices, composite and output prices, the capital account, household and government
//! budgets, trade flows and finally production and demand. Both the residual system
//! and the outer update read from the result.

use crate::components::{aggregates, firms, government, household};
use crate::parameters::ParameterSet;
use crate::state::{OuterState, Prices};
use ndarray::{Array1, Array2};
use rcge_core::FloatValue;
use serde::{Deserialize, Serialize};

/// Every endogenous quantity of the model at one price vector and outer state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Economy {
    pub prices: Prices,
    pub export_price: Array1<FloatValue>,
    pub import_price: Array1<FloatValue>,
    pub composite_price: Array1<FloatValue>,
    pub output_price: Array1<FloatValue>,
    pub capital_good_price: FloatValue,

    pub capital_stock: FloatValue,
    pub foreign_capital: FloatValue,
    pub repatriated: FloatValue,

    pub household_income: FloatValue,
    pub capital_tax: FloatValue,
    pub direct_tax: FloatValue,
    pub transfers: FloatValue,
    pub private_savings: FloatValue,
    pub consumption_budget: FloatValue,
    pub household_demand: Array1<FloatValue>,

    pub exports: Array1<FloatValue>,
    pub domestic_sales: Array1<FloatValue>,
    pub imports: Array1<FloatValue>,

    pub value_added: Array1<FloatValue>,
    /// factor x sector
    pub factor_demand: Array2<FloatValue>,
    /// supplying sector x using sector
    pub intermediate_demand: Array2<FloatValue>,
    pub investment_demand: Array1<FloatValue>,
    pub government_demand: Array1<FloatValue>,

    pub output_tax: FloatValue,
    pub export_tax: FloatValue,
    pub import_tax: FloatValue,
    pub consumption_tax: FloatValue,
    pub government_savings: FloatValue,
    pub foreign_savings: FloatValue,
}

impl Economy {
    pub fn evaluate(parameters: &ParameterSet, state: &OuterState, prices: &Prices) -> Self {
        let p = parameters;
        let capital = p.sets.capital_index();
        let capital_price = prices.factor[capital];
        let capital_supply = state.factor_supply[capital];

        let export_price = firms::domestic_currency_price(p.exchange_rate, &p.world_export_price);
        let import_price = firms::domestic_currency_price(p.exchange_rate, &p.world_import_price);
        let composite_price = firms::composite_price(
            &p.armington_scale,
            &p.import_share,
            &p.domestic_share,
            &p.armington_exponent,
            &p.import_tax_rate,
            &import_price,
            &state.domestic_price,
        );
        let output_price = firms::output_price(
            &p.value_added_share,
            &p.input_output,
            &prices.value_added,
            &composite_price,
        );

        let capital_good_price = aggregates::capital_good_price(&p.investment_share, &composite_price);
        let capital_stock = aggregates::capital_stock(
            capital_price,
            capital_supply,
            p.rental_rate,
            capital_good_price,
        );
        let foreign_capital = capital_stock - state.domestic_capital;
        let repatriated =
            aggregates::repatriated_income(p.foreign_return, foreign_capital, p.exchange_rate);

        let capital_tax = government::capital_tax(p.capital_tax_rate, capital_price, capital_supply);
        let household_income =
            household::income(&prices.factor, &state.factor_supply, capital_tax);
        let direct_tax = government::direct_tax(p.direct_tax_rate, household_income);
        let labour_income: FloatValue = p
            .sets
            .labour_indices()
            .into_iter()
            .map(|h| prices.factor[h] * state.factor_supply[h])
            .sum();
        let transfers = government::transfers(p.transfer_rate, labour_income);
        let private_savings =
            household::savings(p.savings_rate, household_income, repatriated, transfers);
        let consumption_budget = household::consumption_budget(
            household_income,
            private_savings,
            direct_tax,
            repatriated,
            transfers,
        );
        let household_demand = household::consumption_demand(
            &p.consumption_share,
            consumption_budget,
            p.consumption_tax_rate,
            &composite_price,
        );

        let exports = firms::transformation_supply(
            &p.transformation_scale,
            &p.export_share,
            &p.transformation_exponent,
            &p.output_tax_rate,
            &output_price,
            &firms::export_producer_price(&p.export_tax_rate, &export_price),
            &state.output,
        );
        let domestic_sales = firms::transformation_supply(
            &p.transformation_scale,
            &p.domestic_sales_share,
            &p.transformation_exponent,
            &p.output_tax_rate,
            &output_price,
            &state.domestic_price,
            &state.output,
        );
        let imports = firms::import_demand(
            &p.armington_scale,
            &p.import_share,
            &p.armington_exponent,
            &composite_price,
            &p.import_tax_rate,
            &import_price,
            &state.composite,
        );

        let value_added = firms::value_added(&p.value_added_share, &state.output);
        let factor_demand = firms::factor_demand(
            &p.factor_share,
            &prices.value_added,
            &value_added,
            &prices.factor,
        );
        let intermediate_demand = firms::intermediate_demand(&p.input_output, &state.output);
        let investment_demand =
            aggregates::investment_demand(&p.investment_share, p.investment_rate, capital_stock);
        let government_demand = government::demand(&p.government_share, p.government_demand);

        let output_tax = government::ad_valorem_revenue(&p.output_tax_rate, &output_price, &state.output);
        let export_tax = government::ad_valorem_revenue(&p.export_tax_rate, &export_price, &exports);
        let import_tax = government::ad_valorem_revenue(&p.import_tax_rate, &import_price, &imports);
        let consumption_tax =
            government::consumption_tax(p.consumption_tax_rate, &composite_price, &household_demand);
        let revenue =
            direct_tax + output_tax + export_tax + import_tax + consumption_tax + capital_tax;
        let government_savings =
            government::savings(revenue, transfers, &composite_price, &government_demand);
        let foreign_savings =
            aggregates::foreign_savings(p.investment_rate, foreign_capital, capital_good_price);

        Self {
            prices: prices.clone(),
            export_price,
            import_price,
            composite_price,
            output_price,
            capital_good_price,
            capital_stock,
            foreign_capital,
            repatriated,
            household_income,
            capital_tax,
            direct_tax,
            transfers,
            private_savings,
            consumption_budget,
            household_demand,
            exports,
            domestic_sales,
            imports,
            value_added,
            factor_demand,
            intermediate_demand,
            investment_demand,
            government_demand,
            output_tax,
            export_tax,
            import_tax,
            consumption_tax,
            government_savings,
            foreign_savings,
        }
    }
}
