use std::sync::Arc;

use strum::IntoEnumIterator;
use tracing::{debug, info};

use super::features::{derive, filter_eligible, recompute, SHARE_EPSILON};
use super::ForecastError;
use crate::domain::{DerivedRecord, EnergySource, ForecastResult, ForecastStep, HistoricalRecord};
use crate::ml::ModelBundle;

/// Longest supported horizon in years
pub const MAX_HORIZON: u32 = 10;

/// Floor applied before taking the log of generation
pub const LOG_GENERATION_FLOOR: f64 = 1e-6;

/// Running levels carried from one step to the next
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Levels {
    pub low_carbon_share_pct: f64,
    pub log_generation: f64,
}

impl Levels {
    pub fn from_row(row: &DerivedRecord) -> Self {
        Self {
            low_carbon_share_pct: row.record.low_carbon_share_pct,
            log_generation: row
                .record
                .electricity_generation_twh
                .max(LOG_GENERATION_FLOOR)
                .ln(),
        }
    }

    /// Share moves additively inside [0, 100]; generation moves in log space.
    pub fn advance(self, delta_low_carbon: f64, delta_log_generation: f64) -> Self {
        Self {
            low_carbon_share_pct: (self.low_carbon_share_pct + delta_low_carbon).clamp(0.0, 100.0),
            log_generation: self.log_generation + delta_log_generation,
        }
    }

    pub fn generation_twh(&self) -> f64 {
        self.log_generation.exp()
    }
}

/// Build the next year's row from the latest one.
///
/// The source mix is not predicted: the latest row's shares are held and
/// spread over the new total. Shares and lags are left for `recompute`.
pub fn synthesize_row(
    latest: &DerivedRecord,
    year: i32,
    low_carbon_share_pct: f64,
    generation_twh: f64,
) -> DerivedRecord {
    let mut record = latest.record.clone();
    record.year = year;
    record.low_carbon_share_pct = low_carbon_share_pct;
    record.electricity_generation_twh = generation_twh;

    let total = generation_twh.max(SHARE_EPSILON);
    for source in EnergySource::iter() {
        record.set_generation(source, latest.share(source) * total);
    }
    DerivedRecord::new(record)
}

/// Recursive multi-year forecaster.
///
/// Each step predicts from the newest row, appends a synthesized row for the
/// predicted year and recomputes features over the working history, so the
/// cost is O(n) per step and O(n * horizon) overall.
pub struct ForecastEngine {
    bundle: Arc<ModelBundle>,
}

impl ForecastEngine {
    pub fn new(bundle: Arc<ModelBundle>) -> Self {
        Self { bundle }
    }

    pub fn forecast(
        &self,
        iso3: &str,
        history: &[HistoricalRecord],
        horizon: u32,
    ) -> Result<ForecastResult, ForecastError> {
        if !(1..=MAX_HORIZON).contains(&horizon) {
            return Err(ForecastError::InvalidHorizon {
                got: horizon,
                max: MAX_HORIZON,
            });
        }

        let iso3 = iso3.trim().to_uppercase();
        if history.is_empty() {
            return Err(ForecastError::NoHistory(iso3));
        }

        let mut working = filter_eligible(derive(history))?;
        let Some(last) = working.last() else {
            return Err(ForecastError::InsufficientHistory);
        };
        let base_year = last.year();
        let mut levels = Levels::from_row(last);
        if levels.low_carbon_share_pct.is_nan() {
            return Err(ForecastError::InsufficientHistory);
        }

        let mut steps = Vec::with_capacity(horizon as usize);
        working.reserve(horizon as usize);

        for step in 1..=horizon {
            let Some(latest) = working.last() else {
                return Err(ForecastError::InsufficientHistory);
            };

            let (delta_lc, delta_log_gen) = self.predict_deltas(latest)?;
            levels = levels.advance(delta_lc, delta_log_gen);

            let year = base_year + step as i32;
            let generation_twh = levels.generation_twh();
            if !levels.low_carbon_share_pct.is_finite()
                || !generation_twh.is_finite()
                || generation_twh <= 0.0
            {
                return Err(ForecastError::ModelUnavailable(format!(
                    "forecast for {} out of range at {} (share {}, generation {} TWh)",
                    iso3,
                    year,
                    levels.low_carbon_share_pct,
                    generation_twh
                )));
            }
            debug!(
                iso3 = %iso3,
                step,
                year,
                delta_lc,
                delta_log_gen,
                low_carbon_share_pct = levels.low_carbon_share_pct,
                generation_twh,
                "forecast step"
            );

            steps.push(ForecastStep {
                year,
                low_carbon_share_pct: levels.low_carbon_share_pct,
                electricity_generation_twh: generation_twh,
            });

            let next = synthesize_row(latest, year, levels.low_carbon_share_pct, generation_twh);
            working.push(next);
            recompute(&mut working);
        }

        let result = ForecastResult::assemble(iso3, base_year, steps);
        info!(
            iso3 = %result.iso3,
            base_year,
            horizon = result.horizon(),
            final_year = result.final_year(),
            "forecast complete"
        );
        Ok(result)
    }

    /// Query both models for one row: the LC model sees standardized
    /// features, the GEN model sees the raw vector.
    fn predict_deltas(&self, latest: &DerivedRecord) -> Result<(f64, f64), ForecastError> {
        let raw = self.bundle.layout().reindex(latest);
        let scaled = self.bundle.standardize(&raw).map_err(model_error)?;

        let delta_lc = self
            .bundle
            .predict_low_carbon_delta(&scaled)
            .map_err(model_error)?;
        let delta_log_gen = self
            .bundle
            .predict_log_generation_delta(&raw)
            .map_err(model_error)?;

        if !delta_lc.is_finite() || !delta_log_gen.is_finite() {
            return Err(ForecastError::ModelUnavailable(format!(
                "non-finite model output (lc delta {}, log generation delta {})",
                delta_lc, delta_log_gen
            )));
        }
        Ok((delta_lc, delta_log_gen))
    }
}

fn model_error(e: anyhow::Error) -> ForecastError {
    ForecastError::ModelUnavailable(format!("{:#}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LagSeries;
    use crate::ml::{FeatureConfig, LinearRegressionModel};
    use crate::test_support::{constant_bundle, feature_config, record, steady_history};

    fn engine(bundle: ModelBundle) -> ForecastEngine {
        ForecastEngine::new(Arc::new(bundle))
    }

    fn linear_bundle(cfg: FeatureConfig, lc: Vec<f64>, gen: Vec<f64>) -> ModelBundle {
        ModelBundle::new(
            cfg,
            Box::new(LinearRegressionModel::new(lc, 0.0)),
            Box::new(LinearRegressionModel::new(gen, 0.0)),
        )
        .unwrap()
    }

    #[test]
    fn test_five_year_history_three_step_horizon() {
        let engine = engine(constant_bundle(&["low_carbon_share_pct"], 1.0, 0.1));
        let history = steady_history(2016, 5);

        let result = engine.forecast("swe", &history, 3).unwrap();
        assert_eq!(result.iso3, "SWE");
        assert_eq!(result.base_year, 2020);

        let years: Vec<i32> = result.forecasts.iter().map(|s| s.year).collect();
        assert_eq!(years, vec![2021, 2022, 2023]);

        let shares: Vec<f64> = result.forecasts.iter().map(|s| s.low_carbon_share_pct).collect();
        assert_eq!(shares, vec![29.0, 30.0, 31.0]);

        let mut expected = 140.0_f64;
        for step in &result.forecasts {
            expected *= 0.1_f64.exp();
            assert!((step.electricity_generation_twh - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_empty_history() {
        let engine = engine(constant_bundle(&["year"], 0.0, 0.0));
        let err = engine.forecast(" zzz", &[], 5).unwrap_err();
        assert_eq!(err.to_string(), "no history for ZZZ");
    }

    #[test]
    fn test_not_enough_history() {
        let engine = engine(constant_bundle(&["year"], 0.0, 0.0));
        let err = engine.forecast("SWE", &steady_history(2019, 2), 5).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientHistory));
    }

    #[test]
    fn test_horizon_bounds() {
        let engine = engine(constant_bundle(&["year"], 0.0, 0.0));
        let history = steady_history(2010, 6);
        assert!(matches!(
            engine.forecast("SWE", &history, 0),
            Err(ForecastError::InvalidHorizon { got: 0, .. })
        ));
        assert!(matches!(
            engine.forecast("SWE", &history, 11),
            Err(ForecastError::InvalidHorizon { got: 11, .. })
        ));
        assert_eq!(engine.forecast("SWE", &history, 10).unwrap().horizon(), 10);
    }

    #[test]
    fn test_share_is_clamped() {
        let history = steady_history(2010, 6);

        let up = engine(constant_bundle(&["year"], 50.0, 0.0));
        let result = up.forecast("SWE", &history, 3).unwrap();
        let shares: Vec<f64> = result.forecasts.iter().map(|s| s.low_carbon_share_pct).collect();
        assert_eq!(shares, vec![80.0, 100.0, 100.0]);

        let down = engine(constant_bundle(&["year"], -500.0, 0.0));
        let result = down.forecast("SWE", &history, 2).unwrap();
        assert!(result.forecasts.iter().all(|s| s.low_carbon_share_pct == 0.0));
    }

    #[test]
    fn test_predictions_feed_back_into_lags() {
        // delta = lc - lc_lag1, i.e. continue the last step
        let cfg = feature_config(&["low_carbon_share_pct", "low_carbon_share_pct_lag1"]);
        let engine = engine(linear_bundle(cfg, vec![1.0, -1.0], vec![0.0, 0.0]));

        let result = engine.forecast("SWE", &steady_history(2016, 5), 3).unwrap();
        let shares: Vec<f64> = result.forecasts.iter().map(|s| s.low_carbon_share_pct).collect();
        assert_eq!(shares, vec![30.0, 32.0, 34.0]);
        for step in &result.forecasts {
            assert!((step.electricity_generation_twh - 140.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_lags_recomputed_within_eligible_window() {
        // Eligible rows are 2019 and 2020 only. The first step still sees the
        // 2020 lags from the full history; the synthesized 2021 row has no
        // lag3 inside the working window, so it reads 0.0.
        let cfg = feature_config(&["low_carbon_share_pct_lag3"]);
        let engine = engine(linear_bundle(cfg, vec![1.0], vec![0.0]));

        let result = engine.forecast("SWE", &steady_history(2016, 5), 2).unwrap();
        assert_eq!(result.forecasts[0].low_carbon_share_pct, 50.0);
        assert_eq!(result.forecasts[1].low_carbon_share_pct, 50.0);
    }

    #[test]
    fn test_lc_model_sees_scaled_gen_model_sees_raw() {
        let mut cfg = feature_config(&["year"]);
        cfg.scaler_mean = vec![2000.0];
        cfg.scaler_scale = vec![10.0];
        let engine = engine(linear_bundle(cfg, vec![1.0], vec![0.0001]));

        let result = engine.forecast("SWE", &steady_history(2016, 5), 1).unwrap();
        let step = result.forecasts[0];
        // (2020 - 2000) / 10 = 2
        assert_eq!(step.low_carbon_share_pct, 30.0);
        let expected = 140.0 * (2020.0_f64 * 0.0001).exp();
        assert!((step.electricity_generation_twh - expected).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_model_output_is_rejected() {
        let engine = engine(constant_bundle(&["year"], f64::NAN, 0.0));
        let err = engine.forecast("SWE", &steady_history(2010, 6), 1).unwrap_err();
        assert!(matches!(err, ForecastError::ModelUnavailable(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_generation_overflow_is_rejected() {
        let engine = engine(constant_bundle(&["year"], 0.0, 800.0));
        let err = engine.forecast("SWE", &steady_history(2016, 5), 2).unwrap_err();
        assert!(matches!(err, ForecastError::ModelUnavailable(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_generation_underflow_is_rejected() {
        let engine = engine(constant_bundle(&["year"], 0.0, -800.0));
        let err = engine.forecast("SWE", &steady_history(2016, 5), 1).unwrap_err();
        assert!(matches!(err, ForecastError::ModelUnavailable(_)));
    }

    #[test]
    fn test_missing_latest_share_is_insufficient_history() {
        let engine = engine(constant_bundle(&["year"], 1.0, 0.0));
        let mut history = steady_history(2016, 5);
        history[4].low_carbon_share_pct = f64::NAN;
        let err = engine.forecast("SWE", &history, 1).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientHistory));
    }

    #[test]
    fn test_caller_history_is_untouched() {
        let engine = engine(constant_bundle(&["year"], 1.0, 0.05));
        let history = steady_history(2010, 6);
        let before = history.clone();
        engine.forecast("SWE", &history, 4).unwrap();
        assert_eq!(history, before);
    }

    #[test]
    fn test_synthesized_row_keeps_previous_mix() {
        let rows = derive(&[record(2020, 200.0, 45.0)]);
        let next = synthesize_row(&rows[0], 2021, 47.0, 250.0);

        assert_eq!(next.year(), 2021);
        assert_eq!(next.record.low_carbon_share_pct, 47.0);
        assert_eq!(next.record.fossil_share_pct, 55.0);
        assert!((next.record.gas_twh - 125.0).abs() < 1e-9);
        assert!((next.record.solar_twh - 12.5).abs() < 1e-9);
        assert!((next.record.source_total_twh() - 250.0).abs() < 1e-9);
        assert_eq!(next.lag(LagSeries::LowCarbonSharePct, 1), None);
    }

    #[test]
    fn test_levels_from_zero_generation() {
        let rows = derive(&[record(2020, 0.0, 10.0)]);
        let levels = Levels::from_row(&rows[0]);
        assert!((levels.log_generation - LOG_GENERATION_FLOOR.ln()).abs() < 1e-12);
        assert!(levels.generation_twh() > 0.0);
    }
}
