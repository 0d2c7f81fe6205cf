//! Production, prices and foreign trade
//!
//! Sectors combine factors into value added with a Cobb-Douglas technology and use
//! intermediate inputs in fixed proportions. Gross output is split between exports and
//! domestic sales by a CET function; domestic sales are combined with imports into the
//! Armington composite good.

use crate::components::ces;
use ndarray::{Array1, Array2, Axis};
use rcge_core::FloatValue;

/// Domestic-currency price of a good traded at `world_price`
pub fn domestic_currency_price(
    exchange_rate: FloatValue,
    world_price: &Array1<FloatValue>,
) -> Array1<FloatValue> {
    world_price * exchange_rate
}

/// Armington composite price, the unit cost of combining imports (tariff included)
/// with domestic sales
pub fn composite_price(
    scale: &Array1<FloatValue>,
    import_share: &Array1<FloatValue>,
    domestic_share: &Array1<FloatValue>,
    exponent: &Array1<FloatValue>,
    import_tax_rate: &Array1<FloatValue>,
    import_price: &Array1<FloatValue>,
    domestic_price: &Array1<FloatValue>,
) -> Array1<FloatValue> {
    Array1::from_shape_fn(scale.len(), |j| {
        ces::unit_cost(
            scale[j],
            &[import_share[j], domestic_share[j]],
            &[(1.0 + import_tax_rate[j]) * import_price[j], domestic_price[j]],
            exponent[j],
        )
    })
}

/// Zero-profit output price: value added plus intermediate inputs per unit of output
///
/// $$ p_{z,j} = a_{y,j} p_{y,j} + \sum_i a_{x,ij} p_{q,i} $$
pub fn output_price(
    value_added_share: &Array1<FloatValue>,
    input_output: &Array2<FloatValue>,
    value_added_price: &Array1<FloatValue>,
    composite_price: &Array1<FloatValue>,
) -> Array1<FloatValue> {
    value_added_share * value_added_price + input_output.t().dot(composite_price)
}

pub fn value_added(
    value_added_share: &Array1<FloatValue>,
    output: &Array1<FloatValue>,
) -> Array1<FloatValue> {
    value_added_share * output
}

/// Intermediate use of each good (rows) by each sector (columns)
pub fn intermediate_demand(
    input_output: &Array2<FloatValue>,
    output: &Array1<FloatValue>,
) -> Array2<FloatValue> {
    input_output * output
}

/// Cost-minimising factor demand (factor x sector)
///
/// $$ F_{hj} = \beta_{hj} p_{y,j} Y_j / p_{f,h} $$
pub fn factor_demand(
    factor_share: &Array2<FloatValue>,
    value_added_price: &Array1<FloatValue>,
    value_added: &Array1<FloatValue>,
    factor_price: &Array1<FloatValue>,
) -> Array2<FloatValue> {
    let value = value_added_price * value_added;
    (factor_share * &value) / &factor_price.view().insert_axis(Axis(1))
}

/// Gap between value added and what the factors employed can produce
pub fn production_gap(
    productivity: &Array1<FloatValue>,
    factor_share: &Array2<FloatValue>,
    factor_demand: &Array2<FloatValue>,
    value_added: &Array1<FloatValue>,
) -> Array1<FloatValue> {
    let mut capacity = productivity.clone();
    for (j, c) in capacity.iter_mut().enumerate() {
        *c *= factor_demand
            .column(j)
            .iter()
            .zip(factor_share.column(j))
            .map(|(f, beta)| f.powf(*beta))
            .product::<FloatValue>();
    }
    value_added - &capacity
}

/// Supply of one destination of gross output from the CET first-order condition
///
/// `price` is what producers receive per unit sold to that destination.
pub fn transformation_supply(
    scale: &Array1<FloatValue>,
    share: &Array1<FloatValue>,
    exponent: &Array1<FloatValue>,
    output_tax_rate: &Array1<FloatValue>,
    output_price: &Array1<FloatValue>,
    price: &Array1<FloatValue>,
    output: &Array1<FloatValue>,
) -> Array1<FloatValue> {
    Array1::from_shape_fn(scale.len(), |j| {
        ces::component_quantity(
            scale[j],
            share[j],
            exponent[j],
            (1.0 + output_tax_rate[j]) * output_price[j],
            price[j],
            output[j],
        )
    })
}

/// Price producers receive for exports, net of export tax
pub fn export_producer_price(
    export_tax_rate: &Array1<FloatValue>,
    export_price: &Array1<FloatValue>,
) -> Array1<FloatValue> {
    export_price * &export_tax_rate.mapv(|te| 1.0 - te)
}

/// Import demand from the Armington first-order condition
pub fn import_demand(
    scale: &Array1<FloatValue>,
    import_share: &Array1<FloatValue>,
    exponent: &Array1<FloatValue>,
    composite_price: &Array1<FloatValue>,
    import_tax_rate: &Array1<FloatValue>,
    import_price: &Array1<FloatValue>,
    composite: &Array1<FloatValue>,
) -> Array1<FloatValue> {
    Array1::from_shape_fn(scale.len(), |j| {
        ces::component_quantity(
            scale[j],
            import_share[j],
            exponent[j],
            composite_price[j],
            (1.0 + import_tax_rate[j]) * import_price[j],
            composite[j],
        )
    })
}

/// Gross output implied by exports and domestic sales
pub fn transformed_output(
    scale: &Array1<FloatValue>,
    export_share: &Array1<FloatValue>,
    domestic_sales_share: &Array1<FloatValue>,
    exponent: &Array1<FloatValue>,
    exports: &Array1<FloatValue>,
    domestic_sales: &Array1<FloatValue>,
) -> Array1<FloatValue> {
    Array1::from_shape_fn(scale.len(), |j| {
        ces::aggregate(
            scale[j],
            &[export_share[j], domestic_sales_share[j]],
            &[exports[j], domestic_sales[j]],
            exponent[j],
        )
    })
}

/// Price of domestic sales consistent with the Armington first-order condition
///
/// $$ p_d = \gamma^\eta \delta_d \, p_q \, (D / Q)^{\eta - 1} $$
pub fn domestic_price(
    scale: &Array1<FloatValue>,
    domestic_share: &Array1<FloatValue>,
    exponent: &Array1<FloatValue>,
    composite_price: &Array1<FloatValue>,
    domestic_sales: &Array1<FloatValue>,
    composite: &Array1<FloatValue>,
) -> Array1<FloatValue> {
    Array1::from_shape_fn(scale.len(), |j| {
        let eta = exponent[j];
        scale[j].powf(eta)
            * domestic_share[j]
            * composite_price[j]
            * (domestic_sales[j] / composite[j]).powf(eta - 1.0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn output_price_adds_value_added_and_inputs() {
        let ay = array![0.5, 0.25];
        let ax = array![[0.25, 0.5], [0.25, 0.25]];
        let pz = output_price(&ay, &ax, &array![2.0, 4.0], &array![1.0, 2.0]);
        // sector 0: 0.5 * 2 + 0.25 * 1 + 0.25 * 2
        assert_relative_eq!(pz[0], 1.75);
        // sector 1: 0.25 * 4 + 0.5 * 1 + 0.25 * 2
        assert_relative_eq!(pz[1], 2.0);
    }

    #[test]
    fn intermediate_demand_scales_columns() {
        let ax = array![[0.25, 0.5], [0.25, 0.25]];
        let x = intermediate_demand(&ax, &array![100.0, 40.0]);
        assert_eq!(x, array![[25.0, 20.0], [25.0, 10.0]]);
    }

    #[test]
    fn factor_demand_exhausts_value_added() {
        let beta = array![[0.4, 0.5], [0.6, 0.5]];
        let f = factor_demand(&beta, &array![1.0, 2.0], &array![100.0, 50.0], &array![2.0, 0.5]);
        assert_relative_eq!(f[[0, 0]], 20.0);
        assert_relative_eq!(f[[1, 1]], 100.0);
        // payments to factors equal value added in each sector
        let prices = [2.0, 0.5];
        let paid: f64 = (0..2).map(|h| prices[h] * f[[h, 1]]).sum();
        assert_relative_eq!(paid, 100.0);
    }

    #[test]
    fn production_gap_vanishes_on_the_frontier() {
        let beta = array![[0.5], [0.5]];
        let factors = array![[16.0], [4.0]];
        let gap = production_gap(&array![2.0], &beta, &factors, &array![16.0]);
        assert_relative_eq!(gap[0], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn domestic_price_inverts_import_share() {
        // no imports: the composite is the domestic good and prices coincide
        let pd = domestic_price(
            &array![1.0],
            &array![1.0],
            &array![0.5],
            &array![1.3],
            &array![80.0],
            &array![80.0],
        );
        assert_relative_eq!(pd[0], 1.3);
    }
}
