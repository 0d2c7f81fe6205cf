//! Classification of accounts into the model's sets
//!
//! Each label of the accounting table plays exactly one role: a producing sector, a
//! factor of production, a household, the government, a tax account, the investment
//! (savings) account or the rest of the world.

use crate::errors::StructuralError;
use crate::sam::SocialAccountingMatrix;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// What a tax account levies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxKind {
    /// Ad valorem tax on household consumption
    Consumption,
    /// Tax on exports, paid by sectors
    Export,
    /// Tax on capital income
    Capital,
    /// Tax on gross output
    Output,
    /// Tariff on imports, paid by sectors
    Import,
}

/// Role an account plays in the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountRole {
    Sector,
    Capital,
    /// Factor other than capital
    Labour,
    Household,
    Government,
    Investment,
    RestOfWorld,
    Tax(TaxKind),
}

/// Role assignment for the labels of an accounting table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// Producing sectors, in model order.
    ///
    /// Default: every label without another role, in table order.
    pub sectors: Option<Vec<String>>,

    /// Factors of production.
    ///
    /// Default: `["K", "L"]`
    pub factors: Vec<String>,

    /// The factor treated as capital. Must be one of `factors`.
    ///
    /// Default: `"K"`
    pub capital: String,

    /// Households, aggregated into one representative consumer.
    ///
    /// Default: `["HH"]`
    pub households: Vec<String>,

    /// Default: `"Govt"`
    pub government: Option<String>,

    /// Savings-investment account.
    ///
    /// Default: `"Investment"`
    pub investment: Option<String>,

    /// Default: `"ROW"`
    pub rest_of_world: Option<String>,

    /// Tax accounts and what they levy.
    ///
    /// Default: `TC` consumption, `TE` export, `TK` capital, `TY` output and `TM` import
    pub taxes: BTreeMap<String, TaxKind>,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            sectors: None,
            factors: vec!["K".to_string(), "L".to_string()],
            capital: "K".to_string(),
            households: vec!["HH".to_string()],
            government: Some("Govt".to_string()),
            investment: Some("Investment".to_string()),
            rest_of_world: Some("ROW".to_string()),
            taxes: BTreeMap::from([
                ("TC".to_string(), TaxKind::Consumption),
                ("TE".to_string(), TaxKind::Export),
                ("TK".to_string(), TaxKind::Capital),
                ("TY".to_string(), TaxKind::Output),
                ("TM".to_string(), TaxKind::Import),
            ]),
        }
    }
}

/// Immutable sets shared by calibration and every equation.
///
/// Optional accounts that do not appear in the table are dropped, so a closed
/// economy without government is expressed by simply omitting those rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sets {
    pub sectors: Vec<String>,
    pub factors: Vec<String>,
    pub capital: String,
    pub households: Vec<String>,
    pub government: Option<String>,
    pub investment: Option<String>,
    pub rest_of_world: Option<String>,
    pub taxes: Vec<(String, TaxKind)>,
}

impl Sets {
    /// Assign every label of `sam` to a role.
    pub fn classify(
        sam: &SocialAccountingMatrix,
        config: &AccountConfig,
    ) -> Result<Self, StructuralError> {
        let mut roles: HashMap<String, &'static str> = HashMap::new();
        let mut assign = |label: &String, role: &'static str| -> Result<(), StructuralError> {
            if let Some(first) = roles.insert(label.to_string(), role) {
                return Err(StructuralError::ConflictingRole {
                    label: label.to_string(),
                    first: first.to_string(),
                    second: role.to_string(),
                });
            }
            Ok(())
        };
        let require = |label: &String| -> Result<(), StructuralError> {
            if sam.contains(label) {
                Ok(())
            } else {
                Err(StructuralError::UnknownAccount(label.to_string()))
            }
        };

        if !config.factors.contains(&config.capital) {
            return Err(StructuralError::MissingAccount("capital factor".to_string()));
        }
        for factor in &config.factors {
            require(factor)?;
            assign(factor, "factor")?;
        }

        if config.households.is_empty() {
            return Err(StructuralError::MissingAccount("household".to_string()));
        }
        for household in &config.households {
            require(household)?;
            assign(household, "household")?;
        }

        let optional = |label: &Option<String>| label.clone().filter(|l| sam.contains(l));
        let government = optional(&config.government);
        let investment = optional(&config.investment);
        let rest_of_world = optional(&config.rest_of_world);
        for (label, role) in [
            (&government, "government"),
            (&investment, "investment"),
            (&rest_of_world, "rest of world"),
        ] {
            if let Some(label) = label {
                assign(label, role)?;
            }
        }

        let taxes: Vec<(String, TaxKind)> = config
            .taxes
            .iter()
            .filter(|(label, _)| sam.contains(label))
            .map(|(label, kind)| (label.clone(), *kind))
            .collect();
        for (label, _) in &taxes {
            assign(label, "tax")?;
        }

        let sectors = match &config.sectors {
            Some(sectors) => {
                for sector in sectors {
                    require(sector)?;
                    assign(sector, "sector")?;
                }
                if let Some(label) = sam.labels().iter().find(|l| !roles.contains_key(*l)) {
                    return Err(StructuralError::UnclassifiedAccount(label.clone()));
                }
                sectors.clone()
            }
            None => sam
                .labels()
                .iter()
                .filter(|l| !roles.contains_key(*l))
                .cloned()
                .collect(),
        };
        if sectors.is_empty() {
            return Err(StructuralError::MissingAccount("sector".to_string()));
        }

        log::debug!(
            "Classified {} sectors, {} factors, {} households and {} tax accounts",
            sectors.len(),
            config.factors.len(),
            config.households.len(),
            taxes.len()
        );

        Ok(Self {
            sectors,
            factors: config.factors.clone(),
            capital: config.capital.clone(),
            households: config.households.clone(),
            government,
            investment,
            rest_of_world,
            taxes,
        })
    }

    /// Tax accounts levying `kind`
    pub fn taxes_of(&self, kind: TaxKind) -> Vec<String> {
        self.taxes
            .iter()
            .filter(|(_, k)| *k == kind)
            .map(|(label, _)| label.clone())
            .collect()
    }

    /// Role of `label`, if it belongs to the model
    pub fn role(&self, label: &str) -> Option<AccountRole> {
        let is = |candidate: &Option<String>| candidate.as_deref() == Some(label);
        if self.sectors.iter().any(|s| s == label) {
            Some(AccountRole::Sector)
        } else if self.capital == label {
            Some(AccountRole::Capital)
        } else if self.factors.iter().any(|f| f == label) {
            Some(AccountRole::Labour)
        } else if self.households.iter().any(|h| h == label) {
            Some(AccountRole::Household)
        } else if is(&self.government) {
            Some(AccountRole::Government)
        } else if is(&self.investment) {
            Some(AccountRole::Investment)
        } else if is(&self.rest_of_world) {
            Some(AccountRole::RestOfWorld)
        } else {
            self.taxes
                .iter()
                .find(|(l, _)| l == label)
                .map(|(_, kind)| AccountRole::Tax(*kind))
        }
    }

    /// Position of the capital factor within `factors`
    pub fn capital_index(&self) -> usize {
        self.factors
            .iter()
            .position(|f| *f == self.capital)
            .unwrap_or(0)
    }

    /// Positions of the factors other than capital
    pub fn labour_indices(&self) -> Vec<usize> {
        self.factors
            .iter()
            .enumerate()
            .filter(|(_, f)| **f != self.capital)
            .map(|(h, _)| h)
            .collect()
    }

    /// Length of the price vector: one price per sector and per factor
    pub fn price_dimension(&self) -> usize {
        self.sectors.len() + self.factors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(names: &[&str]) -> SocialAccountingMatrix {
        let n = names.len();
        SocialAccountingMatrix::from_rows(
            names.iter().map(|s| s.to_string()).collect(),
            vec![vec![0.0; n]; n],
        )
        .unwrap()
    }

    #[test]
    fn sectors_default_to_unassigned_labels() {
        let sam = table(&["AGR", "MAN", "K", "L", "HH", "Govt", "TC", "ROW"]);
        let sets = Sets::classify(&sam, &AccountConfig::default()).unwrap();

        assert_eq!(sets.sectors, vec!["AGR", "MAN"]);
        assert_eq!(sets.government.as_deref(), Some("Govt"));
        assert_eq!(sets.investment, None);
        assert_eq!(sets.taxes, vec![("TC".to_string(), TaxKind::Consumption)]);
        assert_eq!(sets.capital_index(), 0);
        assert_eq!(sets.labour_indices(), vec![1]);
        assert_eq!(sets.price_dimension(), 4);
        assert_eq!(sets.role("K"), Some(AccountRole::Capital));
        assert_eq!(sets.role("L"), Some(AccountRole::Labour));
        assert_eq!(sets.role("TC"), Some(AccountRole::Tax(TaxKind::Consumption)));
        assert_eq!(sets.role("ROW"), Some(AccountRole::RestOfWorld));
        assert_eq!(sets.role("Investment"), None);
    }

    #[test]
    fn missing_required_account() {
        let sam = table(&["AGR", "K", "L"]);
        let err = Sets::classify(&sam, &AccountConfig::default()).unwrap_err();
        assert_eq!(err, StructuralError::UnknownAccount("HH".to_string()));
    }

    #[test]
    fn explicit_sectors_must_cover_the_table() {
        let sam = table(&["AGR", "MAN", "K", "L", "HH"]);
        let config = AccountConfig {
            sectors: Some(vec!["AGR".to_string()]),
            ..Default::default()
        };
        let err = Sets::classify(&sam, &config).unwrap_err();
        assert_eq!(err, StructuralError::UnclassifiedAccount("MAN".to_string()));
    }

    #[test]
    fn conflicting_roles() {
        let sam = table(&["AGR", "K", "L", "HH"]);
        let config = AccountConfig {
            sectors: Some(vec!["AGR".to_string(), "HH".to_string()]),
            ..Default::default()
        };
        assert!(matches!(
            Sets::classify(&sam, &config),
            Err(StructuralError::ConflictingRole { .. })
        ));
    }

    #[test]
    fn capital_must_be_a_factor() {
        let sam = table(&["AGR", "K", "L", "HH"]);
        let config = AccountConfig {
            capital: "Land".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            Sets::classify(&sam, &config),
            Err(StructuralError::MissingAccount(_))
        ));
    }

    #[test]
    fn partial_config_deserialisation() {
        let config: AccountConfig = toml::from_str(
            r#"
            households = ["HH_R", "HH_U"]
            [taxes]
            TY = "output"
            "#,
        )
        .unwrap();
        assert_eq!(config.households.len(), 2);
        assert_eq!(config.capital, "K");
        assert_eq!(config.taxes.len(), 1);
        assert_eq!(config.taxes["TY"], TaxKind::Output);
    }
}
