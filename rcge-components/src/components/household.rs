//! Household income, savings and consumption
//!
//! All households are aggregated into one representative consumer receiving every
//! factor payment net of the capital income tax.

use ndarray::Array1;
use rcge_core::FloatValue;

/// Factor income net of capital income tax
pub fn income(
    factor_price: &Array1<FloatValue>,
    factor_supply: &Array1<FloatValue>,
    capital_tax: FloatValue,
) -> FloatValue {
    factor_price.dot(factor_supply) - capital_tax
}

/// Savings out of income net of payments abroad, transfers included
pub fn savings(
    savings_rate: FloatValue,
    income: FloatValue,
    repatriated: FloatValue,
    transfers: FloatValue,
) -> FloatValue {
    savings_rate * (income - repatriated + transfers)
}

/// Spending on consumption, consumption taxes included
pub fn consumption_budget(
    income: FloatValue,
    savings: FloatValue,
    direct_tax: FloatValue,
    repatriated: FloatValue,
    transfers: FloatValue,
) -> FloatValue {
    income - savings - direct_tax - repatriated + transfers
}

/// Cobb-Douglas demand for each composite good
pub fn consumption_demand(
    consumption_share: &Array1<FloatValue>,
    budget: FloatValue,
    consumption_tax_rate: FloatValue,
    composite_price: &Array1<FloatValue>,
) -> Array1<FloatValue> {
    consumption_share * budget / &(composite_price * (1.0 + consumption_tax_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn budget_is_fully_spent() {
        let yh = income(&array![1.0, 1.0], &array![110.0, 110.0], 10.0);
        assert_relative_eq!(yh, 210.0);

        let sp = savings(30.0 / 218.0, yh, 7.0, 15.0);
        assert_relative_eq!(sp, 30.0, max_relative = 1e-12);

        let budget = consumption_budget(yh, sp, 20.0, 7.0, 15.0);
        assert_relative_eq!(budget, 168.0, max_relative = 1e-12);

        let prices = array![1.0, 1.25];
        let demand = consumption_demand(&array![0.4, 0.6], budget, 0.05, &prices);
        let spent = (&demand * &prices).sum() * 1.05;
        assert_relative_eq!(spent, budget, max_relative = 1e-12);
    }
}
