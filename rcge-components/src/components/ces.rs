//! Constant elasticity of substitution (and transformation) aggregates
//!
//! With exponent $\rho$ the aggregate of quantities $q_i$ with shares $\delta_i$ is
//!
//! $$ Q = \gamma \left( \sum_i \delta_i q_i^\rho \right)^{1/\rho} $$
//!
//! $\rho < 1$ describes substitution between inputs (Armington), $\rho > 1$ the
//! transformation of output between destinations (CET). As $\rho \to 0$ the aggregate
//! tends to the Cobb-Douglas form $\gamma \prod_i q_i^{\delta_i}$, which is used whenever
//! $|\rho|$ is below [`COBB_DOUGLAS_THRESHOLD`]. Terms with a zero share are skipped, so an
//! account that does not trade at all drops out of the aggregate.

use rcge_core::FloatValue;

pub const COBB_DOUGLAS_THRESHOLD: FloatValue = 1e-12;

/// Exponent of a CES aggregate with elasticity of substitution `sigma`
pub fn substitution_exponent(sigma: FloatValue) -> FloatValue {
    (sigma - 1.0) / sigma
}

/// Exponent of a CET aggregate with elasticity of transformation `psi`
pub fn transformation_exponent(psi: FloatValue) -> FloatValue {
    (psi + 1.0) / psi
}

fn is_cobb_douglas(rho: FloatValue) -> bool {
    rho.abs() < COBB_DOUGLAS_THRESHOLD
}

/// Aggregate quantity
pub fn aggregate(
    scale: FloatValue,
    shares: &[FloatValue],
    quantities: &[FloatValue],
    rho: FloatValue,
) -> FloatValue {
    let terms = shares.iter().zip(quantities).filter(|(s, _)| **s > 0.0);
    if is_cobb_douglas(rho) {
        scale * terms.map(|(s, q)| q.powf(*s)).product::<FloatValue>()
    } else {
        scale
            * terms
                .map(|(s, q)| s * q.powf(rho))
                .sum::<FloatValue>()
                .powf(1.0 / rho)
    }
}

/// Unit cost of a CES aggregate given the prices of its components.
///
/// Only meaningful for substitution aggregates ($\rho < 1$).
pub fn unit_cost(
    scale: FloatValue,
    shares: &[FloatValue],
    prices: &[FloatValue],
    rho: FloatValue,
) -> FloatValue {
    let terms = shares.iter().zip(prices).filter(|(s, _)| **s > 0.0);
    if is_cobb_douglas(rho) {
        terms.map(|(s, p)| (p / s).powf(*s)).product::<FloatValue>() / scale
    } else {
        let sigma = 1.0 / (1.0 - rho);
        terms
            .map(|(s, p)| s.powf(sigma) * p.powf(1.0 - sigma))
            .sum::<FloatValue>()
            .powf(1.0 / (1.0 - sigma))
            / scale
    }
}

/// Quantity of one component from the first-order condition of the aggregate.
///
/// `aggregate_price` is the price of the aggregate, `price` the price of the component
/// and `quantity` the aggregate quantity. Components with a zero share are not used.
pub fn component_quantity(
    scale: FloatValue,
    share: FloatValue,
    rho: FloatValue,
    aggregate_price: FloatValue,
    price: FloatValue,
    quantity: FloatValue,
) -> FloatValue {
    if share == 0.0 {
        return 0.0;
    }
    (scale.powf(rho) * share * aggregate_price / price).powf(1.0 / (1.0 - rho)) * quantity
}

/// Shares reproducing observed quantities `quantities` at relative prices `weights`.
///
/// $\delta_i \propto w_i q_i^{1-\rho}$, normalised to sum to one. Components with a zero
/// quantity get a zero share.
pub fn calibrate_shares(
    weights: &[FloatValue],
    quantities: &[FloatValue],
    rho: FloatValue,
) -> Vec<FloatValue> {
    let raw: Vec<FloatValue> = weights
        .iter()
        .zip(quantities)
        .map(|(w, q)| {
            if *q == 0.0 {
                0.0
            } else {
                w * q.powf(1.0 - rho)
            }
        })
        .collect();
    let total: FloatValue = raw.iter().sum();
    if total == 0.0 {
        return raw;
    }
    raw.iter().map(|r| r / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn exponents() {
        assert_relative_eq!(substitution_exponent(2.0), 0.5);
        assert_relative_eq!(substitution_exponent(1.0), 0.0);
        assert_relative_eq!(transformation_exponent(2.0), 1.5);
    }

    #[test]
    fn calibrated_aggregate_reproduces_quantities() {
        // Armington aggregate of 25 imports paying a 12% tariff and 109 domestic sales
        let rho = substitution_exponent(2.0);
        let quantities = [25.0, 109.0];
        let prices = [1.12, 1.0];
        let shares = calibrate_shares(&prices, &quantities, rho);
        assert_relative_eq!(shares.iter().sum::<f64>(), 1.0, max_relative = 1e-12);

        let scale = 137.0 / aggregate(1.0, &shares, &quantities, rho);
        assert_relative_eq!(
            aggregate(scale, &shares, &quantities, rho),
            137.0,
            max_relative = 1e-12
        );

        // first-order conditions at the calibrated point return the observed quantities
        let price = unit_cost(scale, &shares, &prices, rho);
        for i in 0..2 {
            assert_relative_eq!(
                component_quantity(scale, shares[i], rho, price, prices[i], 137.0),
                quantities[i],
                max_relative = 1e-10
            );
        }
        // and cost exhausts the value of the aggregate
        assert_relative_eq!(price * 137.0, 1.12 * 25.0 + 109.0, max_relative = 1e-10);
    }

    #[test]
    fn cobb_douglas_limit() {
        let shares = [0.25, 0.75];
        let quantities = [16.0, 81.0];
        assert_relative_eq!(
            aggregate(2.0, &shares, &quantities, 0.0),
            108.0,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            aggregate(2.0, &shares, &quantities, 1e-9),
            aggregate(2.0, &shares, &quantities, 0.0),
            max_relative = 1e-6
        );

        let prices = [1.0, 1.0];
        let cost = unit_cost(1.0, &shares, &prices, 0.0);
        assert_relative_eq!(
            cost,
            unit_cost(1.0, &shares, &prices, 1e-9),
            max_relative = 1e-6
        );
    }

    #[test]
    fn zero_shares_drop_out() {
        let shares = calibrate_shares(&[1.0, 1.0], &[0.0, 50.0], 0.5);
        assert_eq!(shares, vec![0.0, 1.0]);
        assert_relative_eq!(
            aggregate(1.0, &shares, &[0.0, 50.0], 0.5),
            50.0,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            unit_cost(1.0, &shares, &[3.0, 2.0], 0.5),
            2.0,
            max_relative = 1e-12
        );
        assert_eq!(component_quantity(1.0, 0.0, 0.5, 1.0, 1.0, 50.0), 0.0);
    }

    #[test]
    fn transformation_splits_output() {
        let rho = transformation_exponent(2.0);
        let quantities = [48.0, 109.0];
        let prices = [1.0, 1.0];
        let shares = calibrate_shares(&prices, &quantities, rho);
        let scale = 157.0 / aggregate(1.0, &shares, &quantities, rho);
        for i in 0..2 {
            assert_relative_eq!(
                component_quantity(scale, shares[i], rho, 1.0, prices[i], 157.0),
                quantities[i],
                max_relative = 1e-10
            );
        }
    }
}
