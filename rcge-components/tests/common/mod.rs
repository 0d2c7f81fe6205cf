use rcge_components::config::ModelConfig;
use rcge_components::sample;
use rcge_components::CGEModel;
use rcge_core::sam::SocialAccountingMatrix;

pub fn open_economy() -> (SocialAccountingMatrix, ModelConfig) {
    sample::open_economy().expect("sample table")
}

/// Open economy with the world price of manufactured imports raised by 10%
pub fn import_price_shock() -> (CGEModel, ModelConfig) {
    let (sam, mut config) = open_economy();
    config
        .scenario
        .world_import_prices
        .insert("MAN".to_string(), 1.1);
    let model = CGEModel::from_sam(&sam, &config).expect("calibration");
    (model, config)
}

/// Open economy with the world price of agricultural exports raised by 20%
pub fn export_price_shock() -> (CGEModel, ModelConfig) {
    let (sam, mut config) = open_economy();
    config
        .scenario
        .world_export_prices
        .insert("AGR".to_string(), 1.2);
    let model = CGEModel::from_sam(&sam, &config).expect("calibration");
    (model, config)
}
