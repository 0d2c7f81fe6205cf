//! Parameter set and its calibration
//!
//! Calibration reads the baseline flows out of the accounting table and inverts every
//! behavioural equation at unit prices, so evaluating the equation library at the
//! baseline state reproduces the table exactly. The resulting [`ParameterSet`] is never
//! mutated; scenarios derive a modified copy.

use crate::components::ces;
use crate::config::{CalibrationConfig, ElasticityConfig, ScenarioConfig};
use ndarray::{Array1, Array2, Axis};
use rcge_core::errors::{CGEError, CGEResult};
use rcge_core::sam::SocialAccountingMatrix;
use rcge_core::sets::{AccountRole, Sets, TaxKind};
use rcge_core::FloatValue;
use serde::{Deserialize, Serialize};

/// Flows of the baseline table, aggregated to the model's accounts.
///
/// Per-sector vectors follow `Sets::sectors`, factor rows follow `Sets::factors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineFlows {
    /// Gross output $Z_0$
    pub output: Array1<FloatValue>,
    /// Value added $Y_0$
    pub value_added: Array1<FloatValue>,
    /// Factor use by sector $F_0$ (factor x sector)
    pub factor_use: Array2<FloatValue>,
    /// Factor endowments $F\!f_0$
    pub factor_supply: Array1<FloatValue>,
    /// Intermediate use $X_0$ (supplying sector x using sector)
    pub intermediate: Array2<FloatValue>,
    pub exports: Array1<FloatValue>,
    pub imports: Array1<FloatValue>,
    /// Domestic sales $D_0$
    pub domestic: Array1<FloatValue>,
    /// Composite good $Q_0$
    pub composite: Array1<FloatValue>,
    pub household_demand: Array1<FloatValue>,
    pub government_demand: Array1<FloatValue>,
    pub investment_demand: Array1<FloatValue>,
    pub output_tax: Array1<FloatValue>,
    pub export_tax: Array1<FloatValue>,
    pub import_tax: Array1<FloatValue>,
    pub consumption_tax: FloatValue,
    pub capital_tax: FloatValue,
    pub direct_tax: FloatValue,
    pub transfers: FloatValue,
    pub private_savings: FloatValue,
    pub government_savings: FloatValue,
    pub foreign_savings: FloatValue,
    /// Income paid abroad by households $F\!sh_0$
    pub repatriated: FloatValue,
    /// Capital stock $K\!k_0$
    pub capital_stock: FloatValue,
    /// Domestically owned capital $K\!d_0$
    pub domestic_capital: FloatValue,
}

/// Calibrated structural parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub sets: Sets,
    pub baseline: BaselineFlows,

    // === Production ===
    /// Value added per unit of output $a_y$
    pub value_added_share: Array1<FloatValue>,
    /// Input-output coefficients $a_x$ (supplying sector x using sector)
    pub input_output: Array2<FloatValue>,
    /// Cobb-Douglas factor shares $\beta$ (factor x sector)
    pub factor_share: Array2<FloatValue>,
    /// Total factor productivity $b$
    pub productivity: Array1<FloatValue>,

    // === Armington aggregation ===
    /// Substitution exponent $\eta = (\sigma - 1) / \sigma$
    pub armington_exponent: Array1<FloatValue>,
    /// $\delta_m$
    pub import_share: Array1<FloatValue>,
    /// $\delta_d$
    pub domestic_share: Array1<FloatValue>,
    /// $\gamma$
    pub armington_scale: Array1<FloatValue>,

    // === Transformation between exports and domestic sales ===
    /// Transformation exponent $\phi = (\psi + 1) / \psi$
    pub transformation_exponent: Array1<FloatValue>,
    /// $\xi_e$
    pub export_share: Array1<FloatValue>,
    /// $\xi_d$
    pub domestic_sales_share: Array1<FloatValue>,
    /// $\theta$
    pub transformation_scale: Array1<FloatValue>,

    // === Taxes ===
    pub output_tax_rate: Array1<FloatValue>,
    pub export_tax_rate: Array1<FloatValue>,
    pub import_tax_rate: Array1<FloatValue>,
    pub consumption_tax_rate: FloatValue,
    /// Direct tax on household income
    pub direct_tax_rate: FloatValue,
    /// Transfers to households per unit of labour income
    pub transfer_rate: FloatValue,
    pub capital_tax_rate: FloatValue,

    // === Households ===
    /// Budget shares of consumption $\alpha$
    pub consumption_share: Array1<FloatValue>,
    /// Propensity to save out of disposable income
    pub savings_rate: FloatValue,

    // === Government ===
    /// Composition of government demand $\mu$
    pub government_share: Array1<FloatValue>,
    /// Real government demand
    pub government_demand: FloatValue,

    // === Capital and investment ===
    /// Composition of the capital good $\lambda$
    pub investment_share: Array1<FloatValue>,
    /// Rental rate of capital $R$
    pub rental_rate: FloatValue,
    /// Investment per unit of capital $g$
    pub investment_rate: FloatValue,
    /// Return paid on foreign-owned capital $R_f$
    pub foreign_return: FloatValue,

    // === External sector ===
    pub exchange_rate: FloatValue,
    pub world_export_price: Array1<FloatValue>,
    pub world_import_price: Array1<FloatValue>,
}

/// `flow / base`, or zero when neither flow exists.
///
/// A flow without a base cannot be reproduced by any rate and is rejected.
fn rate(parameter: &str, account: &str, flow: FloatValue, base: FloatValue) -> CGEResult<FloatValue> {
    if base != 0.0 {
        Ok(flow / base)
    } else if flow == 0.0 {
        Ok(0.0)
    } else {
        Err(CGEError::calibration_domain(
            parameter,
            account,
            flow,
            "flow has a zero base so no rate reproduces it",
        ))
    }
}

/// Element-wise [`rate`] over sectors
fn rates(
    parameter: &str,
    sectors: &[String],
    flows: &Array1<FloatValue>,
    bases: &Array1<FloatValue>,
) -> CGEResult<Array1<FloatValue>> {
    sectors
        .iter()
        .zip(flows.iter().zip(bases))
        .map(|(sector, (flow, base))| rate(parameter, sector, *flow, *base))
        .collect::<CGEResult<Vec<_>>>()
        .map(Array1::from_vec)
}

/// Share of each entry in the total, uniform when the total is zero
fn shares_or_uniform(values: &Array1<FloatValue>) -> Array1<FloatValue> {
    let total = values.sum();
    if total == 0.0 {
        Array1::from_elem(values.len(), 1.0 / values.len() as FloatValue)
    } else {
        values / total
    }
}

/// Whether the model has an equation carrying a flow from `payer` to `receiver`
fn is_modelled_flow(receiver: AccountRole, payer: AccountRole) -> bool {
    use AccountRole::*;
    matches!(
        (receiver, payer),
        (Sector, Sector)
            | (Capital | Labour, Sector)
            | (
                Tax(TaxKind::Output | TaxKind::Export | TaxKind::Import),
                Sector
            )
            | (RestOfWorld, Sector)
            | (Household, Capital | Labour)
            | (Tax(TaxKind::Capital), Capital)
            | (Sector | Government | Investment | RestOfWorld, Household)
            | (Tax(TaxKind::Consumption), Household)
            | (Household, Household)
            | (Household | Sector | Investment, Government)
            | (Government, Tax(_))
            | (Sector, Investment)
            | (Sector | Investment, RestOfWorld)
    )
}

/// Reject negative flows and flows the model has no equation for
fn check_flows(sam: &SocialAccountingMatrix, sets: &Sets) -> CGEResult<()> {
    let labels = sam.labels();
    for ((r, c), value) in sam.values().indexed_iter() {
        if *value == 0.0 {
            continue;
        }
        let account = format!("{} -> {}", labels[c], labels[r]);
        if *value < 0.0 {
            return Err(CGEError::calibration_domain(
                "flow",
                &account,
                *value,
                "flows must be non-negative",
            ));
        }
        match (sets.role(&labels[r]), sets.role(&labels[c])) {
            (Some(receiver), Some(payer)) if is_modelled_flow(receiver, payer) => {}
            _ => {
                return Err(CGEError::calibration_domain(
                    "flow",
                    &account,
                    *value,
                    "no equation in the model carries this flow",
                ))
            }
        }
    }
    Ok(())
}

fn require_positive(
    parameter: &str,
    labels: &[String],
    values: &Array1<FloatValue>,
) -> CGEResult<()> {
    for (label, value) in labels.iter().zip(values) {
        if !(*value > 0.0) {
            return Err(CGEError::calibration_domain(
                parameter,
                label,
                *value,
                "must be positive",
            ));
        }
    }
    Ok(())
}

/// Sum of payments by each sector to `rows`
fn paid_by_sectors(sam: &SocialAccountingMatrix, rows: &[String], sectors: &[String]) -> Array1<FloatValue> {
    Array1::from_iter(
        sectors
            .iter()
            .map(|j| sam.block(rows, std::slice::from_ref(j))),
    )
}

/// Sum of payments by `columns` to each sector
fn received_by_sectors(
    sam: &SocialAccountingMatrix,
    sectors: &[String],
    columns: &[String],
) -> Array1<FloatValue> {
    Array1::from_iter(
        sectors
            .iter()
            .map(|i| sam.block(std::slice::from_ref(i), columns)),
    )
}

impl BaselineFlows {
    fn from_table(
        sam: &SocialAccountingMatrix,
        sets: &Sets,
        calibration: &CalibrationConfig,
    ) -> Self {
        let sectors = &sets.sectors;
        let households = &sets.households;
        let government = sets.government.as_slice();
        let investment = sets.investment.as_slice();
        let rest_of_world = sets.rest_of_world.as_slice();

        let factor_use = Array2::from_shape_fn((sets.factors.len(), sectors.len()), |(h, j)| {
            sam.flow(&sets.factors[h], &sectors[j])
        });
        let intermediate = Array2::from_shape_fn((sectors.len(), sectors.len()), |(i, j)| {
            sam.flow(&sectors[i], &sectors[j])
        });
        let factor_supply = factor_use.sum_axis(Axis(1));
        let value_added = factor_use.sum_axis(Axis(0));
        let output = &value_added + &intermediate.sum_axis(Axis(0));

        let output_tax = paid_by_sectors(sam, &sets.taxes_of(TaxKind::Output), sectors);
        let export_tax = paid_by_sectors(sam, &sets.taxes_of(TaxKind::Export), sectors);
        let import_tax = paid_by_sectors(sam, &sets.taxes_of(TaxKind::Import), sectors);
        let imports = paid_by_sectors(sam, rest_of_world, sectors);
        let exports = received_by_sectors(sam, sectors, rest_of_world);

        let domestic = &output + &output_tax + &export_tax - &exports;
        let composite = &domestic + &imports + &import_tax;

        let capital_income = factor_supply[sets.capital_index()];
        let capital_stock = calibration
            .capital_stock
            .unwrap_or(capital_income / calibration.rental_rate);
        let investment_demand = received_by_sectors(sam, sectors, investment);
        let private_savings = sam.block(investment, households);
        let government_savings = sam.block(investment, government);

        let investment_rate = if capital_stock != 0.0 {
            investment_demand.sum() / capital_stock
        } else {
            0.0
        };
        let domestic_capital = if investment_rate > 0.0 {
            (private_savings + government_savings) / investment_rate
        } else {
            capital_stock
        };

        Self {
            household_demand: received_by_sectors(sam, sectors, households),
            government_demand: received_by_sectors(sam, sectors, government),
            investment_demand,
            consumption_tax: sam.block(&sets.taxes_of(TaxKind::Consumption), households),
            capital_tax: sam.block(
                &sets.taxes_of(TaxKind::Capital),
                std::slice::from_ref(&sets.capital),
            ),
            direct_tax: sam.block(government, households),
            transfers: sam.block(households, government),
            private_savings,
            government_savings,
            foreign_savings: sam.block(investment, rest_of_world),
            repatriated: sam.block(rest_of_world, households),
            output,
            value_added,
            factor_use,
            factor_supply,
            intermediate,
            exports,
            imports,
            domestic,
            composite,
            output_tax,
            export_tax,
            import_tax,
            capital_stock,
            domestic_capital,
        }
    }
}

impl ParameterSet {
    /// Calibrate every parameter from a validated accounting table.
    pub fn calibrate(
        sam: &SocialAccountingMatrix,
        sets: &Sets,
        elasticities: &ElasticityConfig,
        calibration: &CalibrationConfig,
    ) -> CGEResult<Self> {
        check_flows(sam, sets)?;
        let flows = BaselineFlows::from_table(sam, sets, calibration);
        let sectors = &sets.sectors;
        let n = sectors.len();

        require_positive("output", sectors, &flows.output)?;
        require_positive("value added", sectors, &flows.value_added)?;
        require_positive("domestic sales", sectors, &flows.domestic)?;
        require_positive("composite supply", sectors, &flows.composite)?;

        // Production
        let value_added_share = &flows.value_added / &flows.output;
        let input_output = &flows.intermediate / &flows.output;
        let factor_share = &flows.factor_use / &flows.value_added;
        let productivity = Array1::from_shape_fn(n, |j| {
            let composite_input: FloatValue = flows
                .factor_use
                .column(j)
                .iter()
                .zip(factor_share.column(j))
                .map(|(f, beta)| f.powf(*beta))
                .product();
            flows.value_added[j] / composite_input
        });

        // Taxes
        let output_tax_rate = rates("output tax rate", sectors, &flows.output_tax, &flows.output)?;
        let export_tax_rate = rates("export tax rate", sectors, &flows.export_tax, &flows.exports)?;
        let import_tax_rate = rates("import tax rate", sectors, &flows.import_tax, &flows.imports)?;
        for (sector, rate) in sectors.iter().zip(&export_tax_rate) {
            if 1.0 - rate <= 0.0 {
                return Err(CGEError::calibration_domain(
                    "export tax rate",
                    sector,
                    *rate,
                    "exporters must keep a positive share of the export price",
                ));
            }
        }

        let capital = sets.capital_index();
        let capital_income = flows.factor_supply[capital];
        let labour_income: FloatValue = sets
            .labour_indices()
            .into_iter()
            .map(|h| flows.factor_supply[h])
            .sum();
        let household_income = flows.factor_supply.sum() - flows.capital_tax;
        let total_consumption = flows.household_demand.sum();
        let households = sets.households.join("+");
        let consumption_tax_rate =
            rate("consumption tax rate", &households, flows.consumption_tax, total_consumption)?;
        let direct_tax_rate =
            rate("direct tax rate", &households, flows.direct_tax, household_income)?;
        let transfer_rate = rate("transfer rate", &households, flows.transfers, labour_income)?;
        let savings_rate = rate(
            "savings rate",
            &households,
            flows.private_savings,
            household_income - flows.repatriated + flows.transfers,
        )?;
        let consumption_share = rates(
            "consumption share",
            sectors,
            &flows.household_demand,
            &Array1::from_elem(n, total_consumption),
        )?;
        let government_share = rates(
            "government share",
            sectors,
            &flows.government_demand,
            &Array1::from_elem(n, flows.government_demand.sum()),
        )?;

        // Trade
        let mut armington_exponent = Array1::zeros(n);
        let mut import_share = Array1::zeros(n);
        let mut domestic_share = Array1::zeros(n);
        let mut armington_scale = Array1::zeros(n);
        let mut transformation_exponent = Array1::zeros(n);
        let mut export_share = Array1::zeros(n);
        let mut domestic_sales_share = Array1::zeros(n);
        let mut transformation_scale = Array1::zeros(n);
        for (j, sector) in sectors.iter().enumerate() {
            let sigma = elasticities.armington_for(sector);
            let psi = elasticities.transformation_for(sector);
            if !(sigma > 0.0) {
                return Err(CGEError::calibration_domain(
                    "Armington elasticity",
                    sector,
                    sigma,
                    "must be positive",
                ));
            }
            if !(psi > 0.0) {
                return Err(CGEError::calibration_domain(
                    "transformation elasticity",
                    sector,
                    psi,
                    "must be positive",
                ));
            }

            let eta = ces::substitution_exponent(sigma);
            let sources = [flows.imports[j], flows.domestic[j]];
            let delta = ces::calibrate_shares(&[1.0 + import_tax_rate[j], 1.0], &sources, eta);
            armington_exponent[j] = eta;
            import_share[j] = delta[0];
            domestic_share[j] = delta[1];
            armington_scale[j] = flows.composite[j] / ces::aggregate(1.0, &delta, &sources, eta);

            let phi = ces::transformation_exponent(psi);
            let destinations = [flows.exports[j], flows.domestic[j]];
            let xi = ces::calibrate_shares(&[1.0 - export_tax_rate[j], 1.0], &destinations, phi);
            transformation_exponent[j] = phi;
            export_share[j] = xi[0];
            domestic_sales_share[j] = xi[1];
            transformation_scale[j] = flows.output[j] / ces::aggregate(1.0, &xi, &destinations, phi);
        }

        // Capital
        let capital_stock = flows.capital_stock;
        if !(capital_stock > 0.0) {
            return Err(CGEError::calibration_domain(
                "capital stock",
                &sets.capital,
                capital_stock,
                "must be positive",
            ));
        }
        if !(capital_income > 0.0) {
            return Err(CGEError::calibration_domain(
                "capital income",
                &sets.capital,
                capital_income,
                "must be positive",
            ));
        }
        let foreign_capital = capital_stock - flows.domestic_capital;
        let foreign_return = if foreign_capital == 0.0 {
            if flows.repatriated != 0.0 {
                return Err(CGEError::calibration_domain(
                    "foreign capital",
                    &sets.capital,
                    foreign_capital,
                    "income is paid abroad but no capital is foreign-owned",
                ));
            }
            0.0
        } else {
            flows.repatriated / foreign_capital
        };
        if foreign_return < 0.0 {
            return Err(CGEError::calibration_domain(
                "foreign return",
                &sets.capital,
                foreign_return,
                "must not be negative",
            ));
        }

        let parameters = Self {
            value_added_share,
            input_output,
            factor_share,
            productivity,
            armington_exponent,
            import_share,
            domestic_share,
            armington_scale,
            transformation_exponent,
            export_share,
            domestic_sales_share,
            transformation_scale,
            output_tax_rate,
            export_tax_rate,
            import_tax_rate,
            consumption_tax_rate,
            direct_tax_rate,
            transfer_rate,
            capital_tax_rate: flows.capital_tax / capital_income,
            consumption_share,
            savings_rate,
            government_share,
            government_demand: flows.government_demand.sum(),
            investment_share: shares_or_uniform(&flows.investment_demand),
            rental_rate: capital_income / capital_stock,
            investment_rate: flows.investment_demand.sum() / capital_stock,
            foreign_return,
            exchange_rate: 1.0,
            world_export_price: Array1::ones(n),
            world_import_price: Array1::ones(n),
            sets: sets.clone(),
            baseline: flows,
        };
        parameters.check_finite()?;

        log::info!(
            "Calibrated {} sectors, {} factors, {} households",
            n,
            sets.factors.len(),
            sets.households.len()
        );
        Ok(parameters)
    }

    fn check_finite(&self) -> CGEResult<()> {
        let sectors = &self.sets.sectors;
        let per_sector = [
            ("value added share", &self.value_added_share),
            ("productivity", &self.productivity),
            ("import share", &self.import_share),
            ("domestic share", &self.domestic_share),
            ("Armington scale", &self.armington_scale),
            ("export share", &self.export_share),
            ("domestic sales share", &self.domestic_sales_share),
            ("transformation scale", &self.transformation_scale),
        ];
        for (parameter, values) in per_sector {
            for (sector, value) in sectors.iter().zip(values) {
                if !value.is_finite() {
                    return Err(CGEError::calibration_domain(
                        parameter,
                        sector,
                        *value,
                        "is not finite",
                    ));
                }
            }
        }
        let scalars = [
            ("savings rate", self.savings_rate),
            ("rental rate", self.rental_rate),
            ("foreign return", self.foreign_return),
        ];
        for (parameter, value) in scalars {
            if !value.is_finite() {
                return Err(CGEError::calibration_domain(
                    parameter,
                    "economy",
                    value,
                    "is not finite",
                ));
            }
        }
        Ok(())
    }

    /// Copy of the parameters with a scenario applied.
    pub fn with_scenario(&self, scenario: &ScenarioConfig) -> CGEResult<Self> {
        let mut next = self.clone();
        if !(scenario.exchange_rate > 0.0) {
            return Err(CGEError::Config(format!(
                "exchange rate must be positive, got {}",
                scenario.exchange_rate
            )));
        }
        next.exchange_rate = scenario.exchange_rate;

        for (prices, target) in [
            (&scenario.world_import_prices, &mut next.world_import_price),
            (&scenario.world_export_prices, &mut next.world_export_price),
        ] {
            for (sector, price) in prices {
                let j = self.sector_index(sector)?;
                if !(*price > 0.0) {
                    return Err(CGEError::Config(format!(
                        "world price of {} must be positive, got {}",
                        sector, price
                    )));
                }
                target[j] = *price;
            }
        }

        for (kind, scale) in &scenario.tax_scale {
            match kind {
                TaxKind::Output => next.output_tax_rate *= *scale,
                TaxKind::Export => next.export_tax_rate *= *scale,
                TaxKind::Import => next.import_tax_rate *= *scale,
                TaxKind::Consumption => next.consumption_tax_rate *= scale,
                TaxKind::Capital => next.capital_tax_rate *= scale,
            }
        }
        if next.export_tax_rate.iter().any(|rate| *rate >= 1.0) {
            return Err(CGEError::Config(
                "scaled export tax rates must stay below 1".to_string(),
            ));
        }

        log::debug!("Applied scenario {:?}", scenario);
        Ok(next)
    }

    pub fn sector_index(&self, sector: &str) -> CGEResult<usize> {
        self.sets
            .sectors
            .iter()
            .position(|s| s == sector)
            .ok_or_else(|| CGEError::Config(format!("{} is not a sector", sector)))
    }

    pub fn n_sectors(&self) -> usize {
        self.sets.sectors.len()
    }

    pub fn n_factors(&self) -> usize {
        self.sets.factors.len()
    }
}
