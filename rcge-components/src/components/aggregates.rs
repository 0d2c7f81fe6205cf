//! Capital, investment, foreign savings and market totals

use ndarray::{Array1, Array2, Axis};
use rcge_core::FloatValue;

/// Price of a unit of the capital good
pub fn capital_good_price(
    investment_share: &Array1<FloatValue>,
    composite_price: &Array1<FloatValue>,
) -> FloatValue {
    investment_share.dot(composite_price)
}

/// Capital stock valued from capital income at the rental rate
///
/// $$ K\!k = p_{f,K} F\!f_K / (R \, p_k) $$
pub fn capital_stock(
    capital_price: FloatValue,
    capital_supply: FloatValue,
    rental_rate: FloatValue,
    capital_good_price: FloatValue,
) -> FloatValue {
    capital_price * capital_supply / (rental_rate * capital_good_price)
}

/// Income paid to owners of foreign capital, in domestic currency
pub fn repatriated_income(
    foreign_return: FloatValue,
    foreign_capital: FloatValue,
    exchange_rate: FloatValue,
) -> FloatValue {
    foreign_return * foreign_capital * exchange_rate
}

/// Investment demand for each good needed to grow the capital stock at `investment_rate`
pub fn investment_demand(
    investment_share: &Array1<FloatValue>,
    investment_rate: FloatValue,
    capital_stock: FloatValue,
) -> Array1<FloatValue> {
    investment_share * (investment_rate * capital_stock)
}

/// Savings from abroad financing investment in foreign-owned capital
pub fn foreign_savings(
    investment_rate: FloatValue,
    foreign_capital: FloatValue,
    capital_good_price: FloatValue,
) -> FloatValue {
    investment_rate * foreign_capital * capital_good_price
}

/// Total demand for each composite good
pub fn composite_demand(
    consumption: &Array1<FloatValue>,
    government: &Array1<FloatValue>,
    investment: &Array1<FloatValue>,
    intermediate: &Array2<FloatValue>,
) -> Array1<FloatValue> {
    consumption + government + investment + &intermediate.sum_axis(Axis(1))
}

/// Domestically owned capital financed by domestic savings
///
/// Without investment the capital stock does not change ownership and `current` is kept.
pub fn domestic_capital(
    private_savings: FloatValue,
    government_savings: FloatValue,
    investment_rate: FloatValue,
    capital_good_price: FloatValue,
    current: FloatValue,
) -> FloatValue {
    if investment_rate == 0.0 {
        current
    } else {
        (private_savings + government_savings) / (investment_rate * capital_good_price)
    }
}

/// Capital endowment consistent with the valued capital stock
pub fn capital_endowment(
    baseline_endowment: FloatValue,
    capital_stock: FloatValue,
    baseline_capital_stock: FloatValue,
) -> FloatValue {
    baseline_endowment * capital_stock / baseline_capital_stock
}
