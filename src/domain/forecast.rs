use serde::{Deserialize, Serialize};

/// One predicted year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastStep {
    pub year: i32,
    /// Low-carbon share of generation, clamped to [0, 100]
    pub low_carbon_share_pct: f64,
    /// Total generation, always > 0
    pub electricity_generation_twh: f64,
}

/// Forecast payload returned for a country
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub iso3: String,
    /// Last year with observed data
    pub base_year: i32,
    pub forecasts: Vec<ForecastStep>,
}

impl ForecastResult {
    /// Package engine output; steps are kept in the order produced.
    pub fn assemble(iso3: impl Into<String>, base_year: i32, forecasts: Vec<ForecastStep>) -> Self {
        Self {
            iso3: iso3.into(),
            base_year,
            forecasts,
        }
    }

    pub fn horizon(&self) -> usize {
        self.forecasts.len()
    }

    /// Last forecast year, or the base year when there are no steps
    pub fn final_year(&self) -> i32 {
        self.forecasts
            .last()
            .map(|s| s.year)
            .unwrap_or(self.base_year)
    }
}
