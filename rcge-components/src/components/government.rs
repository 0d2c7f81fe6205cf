//! Tax revenue, transfers and government demand

use ndarray::Array1;
use rcge_core::FloatValue;

pub fn capital_tax(
    capital_tax_rate: FloatValue,
    capital_price: FloatValue,
    capital_supply: FloatValue,
) -> FloatValue {
    capital_tax_rate * capital_price * capital_supply
}

pub fn direct_tax(direct_tax_rate: FloatValue, income: FloatValue) -> FloatValue {
    direct_tax_rate * income
}

/// Transfers to households, indexed to labour income
pub fn transfers(transfer_rate: FloatValue, labour_income: FloatValue) -> FloatValue {
    transfer_rate * labour_income
}

/// Revenue of an ad valorem tax levied per sector on `quantity` valued at `price`
pub fn ad_valorem_revenue(
    rate: &Array1<FloatValue>,
    price: &Array1<FloatValue>,
    quantity: &Array1<FloatValue>,
) -> FloatValue {
    (rate * price * quantity).sum()
}

pub fn consumption_tax(
    consumption_tax_rate: FloatValue,
    composite_price: &Array1<FloatValue>,
    consumption: &Array1<FloatValue>,
) -> FloatValue {
    consumption_tax_rate * composite_price.dot(consumption)
}

/// Government demand for each good, fixed in real terms
pub fn demand(
    government_share: &Array1<FloatValue>,
    real_demand: FloatValue,
) -> Array1<FloatValue> {
    government_share * real_demand
}

/// Revenue net of transfers and spending on goods
pub fn savings(
    revenue: FloatValue,
    transfers: FloatValue,
    composite_price: &Array1<FloatValue>,
    demand: &Array1<FloatValue>,
) -> FloatValue {
    revenue - transfers - composite_price.dot(demand)
}
