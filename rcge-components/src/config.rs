//! Model configuration
//!
//! Everything that is not in the accounting table itself: which account plays which
//! role, behavioural elasticities, the capital stock, scenario shocks and solver settings.

use rcge_core::config::SolverConfig;
use rcge_core::errors::{CGEError, CGEResult};
use rcge_core::sam::DEFAULT_BALANCE_TOLERANCE;
use rcge_core::sets::{AccountConfig, TaxKind};
use rcge_core::FloatValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Trade elasticities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticityConfig {
    /// Elasticity of substitution between imports and domestic goods.
    ///
    /// Default: 2.0
    pub armington: FloatValue,

    /// Elasticity of transformation between exports and domestic sales.
    ///
    /// Default: 2.0
    pub transformation: FloatValue,

    /// Sector-specific substitution elasticities
    pub armington_overrides: BTreeMap<String, FloatValue>,

    /// Sector-specific transformation elasticities
    pub transformation_overrides: BTreeMap<String, FloatValue>,
}

impl Default for ElasticityConfig {
    fn default() -> Self {
        Self {
            armington: 2.0,
            transformation: 2.0,
            armington_overrides: BTreeMap::new(),
            transformation_overrides: BTreeMap::new(),
        }
    }
}

impl ElasticityConfig {
    /// Cobb-Douglas trade: unit elasticities everywhere
    pub fn unit() -> Self {
        Self {
            armington: 1.0,
            transformation: 1.0,
            ..Default::default()
        }
    }

    pub fn armington_for(&self, sector: &str) -> FloatValue {
        self.armington_overrides
            .get(sector)
            .copied()
            .unwrap_or(self.armington)
    }

    pub fn transformation_for(&self, sector: &str) -> FloatValue {
        self.transformation_overrides
            .get(sector)
            .copied()
            .unwrap_or(self.transformation)
    }
}

/// Settings for quantities the accounting table does not determine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Baseline capital stock.
    ///
    /// Default: capital income divided by `rental_rate`
    pub capital_stock: Option<FloatValue>,

    /// Rental rate used when no capital stock is given.
    ///
    /// Default: 0.1
    pub rental_rate: FloatValue,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            capital_stock: None,
            rental_rate: 0.1,
        }
    }
}

/// Exogenous changes applied after calibration.
///
/// An empty scenario leaves the calibrated baseline untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Default: 1.0
    pub exchange_rate: FloatValue,

    /// World import prices by sector, relative to the baseline of 1
    pub world_import_prices: BTreeMap<String, FloatValue>,

    /// World export prices by sector, relative to the baseline of 1
    pub world_export_prices: BTreeMap<String, FloatValue>,

    /// Multipliers applied to the calibrated tax rates of each kind
    pub tax_scale: BTreeMap<TaxKind, FloatValue>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            exchange_rate: 1.0,
            world_import_prices: BTreeMap::new(),
            world_export_prices: BTreeMap::new(),
            tax_scale: BTreeMap::new(),
        }
    }
}

/// Complete configuration of a model run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub accounts: AccountConfig,
    pub elasticities: ElasticityConfig,
    pub calibration: CalibrationConfig,
    pub scenario: ScenarioConfig,
    pub solver: SolverConfig,

    /// Tolerance of the row/column balance check.
    ///
    /// Default: 1e-6
    pub balance_tolerance: FloatValue,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            accounts: AccountConfig::default(),
            elasticities: ElasticityConfig::default(),
            calibration: CalibrationConfig::default(),
            scenario: ScenarioConfig::default(),
            solver: SolverConfig::default(),
            balance_tolerance: DEFAULT_BALANCE_TOLERANCE,
        }
    }
}

impl ModelConfig {
    pub fn from_toml_str(content: &str) -> CGEResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| CGEError::Config(e.to_string()))?;
        config.solver.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> CGEResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| CGEError::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_deserialisation() {
        let config = ModelConfig::from_toml_str(
            r#"
            [accounts]
            households = ["HH_R", "HH_U"]

            [elasticities]
            armington = 1.5
            [elasticities.transformation_overrides]
            MAN = 3.0

            [scenario.world_import_prices]
            MAN = 1.1

            [scenario.tax_scale]
            output = 2.0

            [solver]
            damping = 0.2
            "#,
        )
        .unwrap();

        assert_eq!(config.accounts.households, vec!["HH_R", "HH_U"]);
        assert_eq!(config.accounts.capital, "K");
        assert_eq!(config.elasticities.armington_for("AGR"), 1.5);
        assert_eq!(config.elasticities.transformation_for("AGR"), 2.0);
        assert_eq!(config.elasticities.transformation_for("MAN"), 3.0);
        assert_eq!(config.scenario.world_import_prices["MAN"], 1.1);
        assert_eq!(config.scenario.tax_scale[&TaxKind::Output], 2.0);
        assert_eq!(config.scenario.exchange_rate, 1.0);
        assert_eq!(config.solver.damping, 0.2);
        assert_eq!(config.solver.max_outer_iterations, 1000);
        assert_eq!(config.calibration.rental_rate, 0.1);
    }

    #[test]
    fn json_round_trip() {
        let mut config = ModelConfig::default();
        config.calibration.capital_stock = Some(1100.0);
        config.scenario.tax_scale.insert(TaxKind::Import, 0.0);

        let json = serde_json::to_string(&config).unwrap();
        let restored: ModelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.calibration, config.calibration);
        assert_eq!(restored.scenario, config.scenario);
        assert_eq!(restored.accounts, config.accounts);
    }

    #[test]
    fn invalid_solver_settings_are_rejected() {
        let err = ModelConfig::from_toml_str("[solver]\nmax_outer_iterations = 0").unwrap_err();
        assert!(matches!(err, CGEError::Config(_)));
    }
}
