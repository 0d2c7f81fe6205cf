//! Computable general equilibrium solver
//!
//! `rcge` calibrates a single-country CGE model to a balanced social accounting matrix
//! and searches for the equilibrium after a change in world prices or tax rates.
//!
//! The work is split over two crates that are re-exported here:
//! - [`rcge_core`]: the accounting table, account sets, solvers and errors
//! - [`rcge_components`]: calibration, the equation library and the model
//!
//! # Usage
//!
//! ```no_run
//! use rcge::Economy;
//!
//! let (sam, config) = Economy::Open.load().unwrap();
//! let report = rcge::solve(&sam, &config).unwrap();
//! println!("{}", report);
//! ```

pub use rcge_components;
pub use rcge_core;

use rcge_components::{CGEModel, Equilibrium, ModelConfig};
use rcge_core::errors::{CGEError, CGEResult};
use rcge_core::sam::SocialAccountingMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Built-in sample economies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Economy {
    /// Two sectors, two factors, a government and foreign trade
    Open,
    /// Two sectors with capital as the only factor and no foreign trade
    Closed,
}

impl Economy {
    pub fn load(self) -> CGEResult<(SocialAccountingMatrix, ModelConfig)> {
        match self {
            Economy::Open => rcge_components::sample::open_economy(),
            Economy::Closed => rcge_components::sample::two_sector_closed(),
        }
    }
}

/// Read a table and an optional configuration file.
///
/// Without a configuration file every setting takes its default.
pub fn load(
    sam: impl AsRef<Path>,
    config: Option<&Path>,
) -> CGEResult<(SocialAccountingMatrix, ModelConfig)> {
    let sam = SocialAccountingMatrix::from_file(sam)?;
    let config = match config {
        Some(path) => ModelConfig::from_file(path)?,
        None => ModelConfig::default(),
    };
    Ok((sam, config))
}

/// Summary of a successful solve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub sectors: Vec<String>,
    pub factors: Vec<String>,
    pub equilibrium: Equilibrium,
}

/// Calibrate and solve the model described by `sam` and `config`
pub fn solve(sam: &SocialAccountingMatrix, config: &ModelConfig) -> CGEResult<Report> {
    let model = CGEModel::from_sam(sam, config)?;
    let equilibrium = model.solve(&config.solver)?;
    let sets = &model.parameters().sets;
    Ok(Report {
        sectors: sets.sectors.clone(),
        factors: sets.factors.clone(),
        equilibrium,
    })
}

/// Check the table and calibrate without solving
pub fn check(sam: &SocialAccountingMatrix, config: &ModelConfig) -> CGEResult<CGEModel> {
    CGEModel::from_sam(sam, config)
}

impl Report {
    pub fn to_json(&self) -> CGEResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CGEError::Config(e.to_string()))
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let eq = &self.equilibrium;
        writeln!(
            f,
            "{:<12} {:>12} {:>12} {:>12} {:>12}",
            "sector", "composite", "output", "p_value", "p_composite"
        )?;
        for (j, (sector, supply)) in eq.composite_supply.iter().enumerate() {
            writeln!(
                f,
                "{:<12} {:>12.4} {:>12.4} {:>12.6} {:>12.6}",
                sector,
                supply,
                eq.outer_state.output[j],
                eq.prices.0[j].1,
                eq.composite_prices.0[j].1,
            )?;
        }
        writeln!(f)?;
        writeln!(f, "{:<12} {:>12} {:>12}", "factor", "supply", "price")?;
        for (h, factor) in self.factors.iter().enumerate() {
            writeln!(
                f,
                "{:<12} {:>12.4} {:>12.6}",
                factor,
                eq.outer_state.factor_supply[h],
                eq.prices.0[self.sectors.len() + h].1,
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "Converged after {} damped updates (distance {:.3e}, residual norm {:.3e})",
            eq.iterations, eq.distance, eq.residual_norm
        )?;
        let balance = &eq.balance;
        writeln!(f, "Excess demand by market group")?;
        writeln!(f, "  goods               {:>12.3e}", balance.goods)?;
        writeln!(f, "  factors             {:>12.3e}", balance.factors)?;
        writeln!(f, "  savings-investment  {:>12.3e}", balance.savings_investment)?;
        writeln!(f, "  balance of payments {:>12.3e}", balance.balance_of_payments)?;
        write!(f, "  Walras sum          {:>12.3e}", balance.walras_sum())
    }
}
