//! Loading inputs from disk and reporting results.

use is_close::is_close;
use rcge::Economy;
use rcge_core::errors::{CGEError, StructuralError};
use std::path::PathBuf;

fn data(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data").join(name)
}

#[test]
fn test_table_file_matches_sample() {
    let (from_file, _) = rcge::load(data("open_economy.toml"), None).unwrap();
    let (sample, _) = Economy::Open.load().unwrap();
    assert_eq!(from_file, sample);
}

#[test]
fn test_scenario_file() {
    let (sam, config) = rcge::load(
        data("open_economy.toml"),
        Some(data("import_price_shock.toml").as_path()),
    )
    .unwrap();
    assert_eq!(config.scenario.world_import_prices.get("MAN"), Some(&1.1));
    assert_eq!(config.calibration.capital_stock, Some(1100.0));

    let model = rcge::check(&sam, &config).unwrap();
    assert!(is_close!(model.parameters().world_import_price[1], 1.1));
}

#[test]
fn test_missing_table() {
    let err = rcge::load(data("missing.toml"), None).unwrap_err();
    assert!(matches!(
        err,
        CGEError::StructuralInput(StructuralError::Format(_))
    ));
    assert!(err.is_input_error());
}

#[test]
fn test_closed_economy_report() {
    let (sam, config) = Economy::Closed.load().unwrap();
    let report = rcge::solve(&sam, &config).unwrap();

    assert_eq!(report.sectors, vec!["AGR", "MAN"]);
    assert_eq!(report.factors, vec!["K"]);
    assert_eq!(report.equilibrium.iterations, 0);

    let text = report.to_string();
    assert!(text.starts_with("sector"));
    assert!(text.contains("Converged after 0 damped updates"));
    assert!(text.contains("Walras sum"));

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["equilibrium"]["iterations"], 0);
    assert_eq!(json["sectors"][1], "MAN");
}
