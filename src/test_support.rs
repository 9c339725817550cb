//! Shared fixtures for unit tests

use std::path::Path;

use serde_json::json;

use crate::domain::HistoricalRecord;
use crate::ml::{FeatureConfig, LinearRegressionModel, ModelBundle};

/// Mix: gas 50%, nuclear 20%, hydro 20%, solar 5%, wind 5%
pub fn record(year: i32, total: f64, low_carbon: f64) -> HistoricalRecord {
    HistoricalRecord {
        country_id: 1,
        iso3: "SWE".to_string(),
        name: Some("Sweden".to_string()),
        region: Some("Europe".to_string()),
        subregion: None,
        income_group: None,
        population_millions: Some(10.4),
        gdp_billions_usd: None,
        year,
        electricity_generation_twh: total,
        coal_twh: 0.0,
        oil_twh: 0.0,
        gas_twh: total * 0.5,
        nuclear_twh: total * 0.2,
        hydro_twh: total * 0.2,
        solar_twh: total * 0.05,
        wind_twh: total * 0.05,
        other_renewables_twh: 0.0,
        low_carbon_share_pct: low_carbon,
        fossil_share_pct: 100.0 - low_carbon,
    }
}

/// `n` consecutive years from `start`, generation 100, 110, ... and share 20, 22, ...
pub fn steady_history(start: i32, n: usize) -> Vec<HistoricalRecord> {
    (0..n)
        .map(|i| record(start + i as i32, 100.0 + 10.0 * i as f64, 20.0 + 2.0 * i as f64))
        .collect()
}

pub fn feature_config(features: &[&str]) -> FeatureConfig {
    FeatureConfig {
        feature_cols: features.iter().map(|f| f.to_string()).collect(),
        best_lc_model_type: "linear".to_string(),
        best_gen_model_type: "linear".to_string(),
        scaler_mean: vec![0.0; features.len()],
        scaler_scale: vec![1.0; features.len()],
    }
}

/// Bundle whose predictors return fixed deltas
pub fn constant_bundle(features: &[&str], lc_delta: f64, log_gen_delta: f64) -> ModelBundle {
    let n = features.len();
    ModelBundle::new(
        feature_config(features),
        Box::new(LinearRegressionModel::constant(n, lc_delta)),
        Box::new(LinearRegressionModel::constant(n, log_gen_delta)),
    )
    .unwrap()
}

/// Write a loadable model directory with constant linear models
pub fn write_bundle_dir(dir: &Path, features: &[&str], lc_delta: f64, log_gen_delta: f64) {
    let cfg = feature_config(features);
    std::fs::write(
        dir.join(FeatureConfig::FILE_NAME),
        serde_json::to_string(&cfg).unwrap(),
    )
    .unwrap();

    for (file, delta) in [
        ("linear_lc_model.json", lc_delta),
        ("linear_gen_model.json", log_gen_delta),
    ] {
        let artifact = json!({
            "kind": "linear",
            "coefficients": vec![0.0; features.len()],
            "intercept": delta,
        });
        std::fs::write(dir.join(file), artifact.to_string()).unwrap();
    }
}
