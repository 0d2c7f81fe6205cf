//! Small balanced economies used by the command line and the test-suite

use crate::config::{CalibrationConfig, ElasticityConfig, ModelConfig};
use ndarray::Array2;
use rcge_core::errors::{CGEResult, StructuralError};
use rcge_core::sam::SocialAccountingMatrix;
use rcge_core::sets::AccountConfig;
use rcge_core::FloatValue;

/// Build a table from `(row, column, value)` payments; unlisted cells are zero
pub fn table(
    labels: &[&str],
    flows: &[(&str, &str, FloatValue)],
) -> CGEResult<SocialAccountingMatrix> {
    let position = |label: &str| {
        labels
            .iter()
            .position(|l| *l == label)
            .ok_or_else(|| StructuralError::UnknownAccount(label.to_string()))
    };

    let mut values = Array2::zeros((labels.len(), labels.len()));
    for (row, column, value) in flows {
        values[[position(*row)?, position(*column)?]] += *value;
    }
    let labels = labels.iter().map(|l| l.to_string()).collect();
    Ok(SocialAccountingMatrix::new(labels, values)?)
}

/// Two sectors, two factors, two households, a government and a foreign sector.
///
/// Capital is partly foreign owned. Armington and transformation elasticities are 2.
pub fn open_economy() -> CGEResult<(SocialAccountingMatrix, ModelConfig)> {
    let labels = [
        "AGR",
        "MAN",
        "K",
        "L",
        "HH_R",
        "HH_U",
        "Govt",
        "TC",
        "TE",
        "TK",
        "TY",
        "TM",
        "Investment",
        "ROW",
    ];
    let flows = [
        // Sector inputs and payments
        ("AGR", "AGR", 20.0),
        ("MAN", "AGR", 30.0),
        ("K", "AGR", 40.0),
        ("L", "AGR", 60.0),
        ("TY", "AGR", 5.0),
        ("TE", "AGR", 2.0),
        ("TM", "AGR", 3.0),
        ("ROW", "AGR", 25.0),
        ("AGR", "MAN", 25.0),
        ("MAN", "MAN", 40.0),
        ("K", "MAN", 70.0),
        ("L", "MAN", 50.0),
        ("TY", "MAN", 8.0),
        ("TE", "MAN", 1.0),
        ("TM", "MAN", 6.0),
        ("ROW", "MAN", 60.0),
        // Factor income
        ("HH_R", "K", 40.0),
        ("HH_U", "K", 60.0),
        ("TK", "K", 10.0),
        ("HH_R", "L", 50.0),
        ("HH_U", "L", 60.0),
        // Households
        ("AGR", "HH_R", 40.0),
        ("MAN", "HH_R", 30.0),
        ("Govt", "HH_R", 8.0),
        ("TC", "HH_R", 4.0),
        ("Investment", "HH_R", 12.0),
        ("ROW", "HH_R", 6.0),
        ("AGR", "HH_U", 30.0),
        ("MAN", "HH_U", 60.0),
        ("Govt", "HH_U", 12.0),
        ("TC", "HH_U", 4.0),
        ("Investment", "HH_U", 18.0),
        ("ROW", "HH_U", 1.0),
        // Government
        ("HH_R", "Govt", 10.0),
        ("HH_U", "Govt", 5.0),
        ("AGR", "Govt", 10.0),
        ("MAN", "Govt", 28.0),
        ("Investment", "Govt", 10.0),
        ("Govt", "TC", 8.0),
        ("Govt", "TE", 3.0),
        ("Govt", "TK", 10.0),
        ("Govt", "TY", 13.0),
        ("Govt", "TM", 9.0),
        // Capital account and rest of the world
        ("AGR", "Investment", 12.0),
        ("MAN", "Investment", 40.0),
        ("AGR", "ROW", 48.0),
        ("MAN", "ROW", 32.0),
        ("Investment", "ROW", 12.0),
    ];

    let config = ModelConfig {
        accounts: AccountConfig {
            households: vec!["HH_R".to_string(), "HH_U".to_string()],
            ..Default::default()
        },
        calibration: CalibrationConfig {
            capital_stock: Some(1100.0),
            ..Default::default()
        },
        ..Default::default()
    };
    Ok((table(&labels, &flows)?, config))
}

/// Closed economy with capital as the only factor and no government.
///
/// All elasticities are one. The household spends its whole income.
pub fn two_sector_closed() -> CGEResult<(SocialAccountingMatrix, ModelConfig)> {
    let labels = ["AGR", "MAN", "K", "HH"];
    let flows = [
        ("AGR", "AGR", 10.0),
        ("MAN", "AGR", 20.0),
        ("K", "AGR", 30.0),
        ("AGR", "MAN", 15.0),
        ("MAN", "MAN", 5.0),
        ("K", "MAN", 40.0),
        ("HH", "K", 70.0),
        ("AGR", "HH", 35.0),
        ("MAN", "HH", 35.0),
    ];

    let config = ModelConfig {
        accounts: AccountConfig {
            factors: vec!["K".to_string()],
            capital: "K".to_string(),
            households: vec!["HH".to_string()],
            ..Default::default()
        },
        elasticities: ElasticityConfig::unit(),
        ..Default::default()
    };
    Ok((table(&labels, &flows)?, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_are_balanced() {
        let (open, _) = open_economy().unwrap();
        open.validate().unwrap();
        assert_eq!(open.len(), 14);

        let (closed, _) = two_sector_closed().unwrap();
        closed.validate().unwrap();
        assert_eq!(closed.row_total("K"), Some(70.0));
    }

    #[test]
    fn unknown_label() {
        let err = table(&["A"], &[("A", "B", 1.0)]).unwrap_err();
        assert!(matches!(
            err,
            rcge_core::errors::CGEError::StructuralInput(StructuralError::UnknownAccount(ref label))
                if label == "B"
        ));
    }
}
