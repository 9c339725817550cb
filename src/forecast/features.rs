//! Feature engineering for the energy mix models
//!
//! Turns a country's yearly history into share ratios and positional lag
//! features, and lays a row out in the order the models were trained on.

use std::str::FromStr;

use strum::IntoEnumIterator;

use super::ForecastError;
use crate::domain::{DerivedRecord, EnergySource, HistoricalRecord, LagSeries, MAX_LAG};
use crate::ml::FeatureVector;

/// Floor for the share denominator
pub const SHARE_EPSILON: f64 = 1e-9;

/// First year a row may be used as a model input
pub const MIN_FEATURE_YEAR: i32 = 2000;

/// Derive shares and lags for a whole sequence.
///
/// The result is sorted by year (stable, so equal years keep input order).
pub fn derive(records: &[HistoricalRecord]) -> Vec<DerivedRecord> {
    let mut rows: Vec<DerivedRecord> = records.iter().cloned().map(DerivedRecord::new).collect();
    recompute(&mut rows);
    rows
}

/// Recompute shares and lags in place after the sequence changed.
///
/// Lags depend on neighbouring rows, so the whole slice is recomputed:
/// O(n) per call.
pub fn recompute(rows: &mut [DerivedRecord]) {
    rows.sort_by_key(|r| r.year());

    for row in rows.iter_mut() {
        let total = row.record.electricity_generation_twh.max(SHARE_EPSILON);
        for source in EnergySource::iter() {
            row.shares[source.index()] = row.record.generation(source) / total;
        }
    }

    for i in 0..rows.len() {
        for series in LagSeries::iter() {
            for k in 1..=MAX_LAG {
                let value = i.checked_sub(k).map(|j| rows[j].series_value(series));
                rows[i].lags[series.index()][k - 1] = value;
            }
        }
    }
}

/// Keep rows from [`MIN_FEATURE_YEAR`] onwards whose low-carbon lag3 is
/// present and not NaN.
pub fn filter_eligible(rows: Vec<DerivedRecord>) -> Result<Vec<DerivedRecord>, ForecastError> {
    let eligible: Vec<DerivedRecord> = rows
        .into_iter()
        .filter(|r| {
            r.year() >= MIN_FEATURE_YEAR
                && r
                    .lag(LagSeries::LowCarbonSharePct, MAX_LAG)
                    .is_some_and(|v| !v.is_nan())
        })
        .collect();

    if eligible.is_empty() {
        return Err(ForecastError::InsufficientHistory);
    }
    Ok(eligible)
}

/// A model input column resolved against [`DerivedRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKey {
    Year,
    ElectricityGenerationTwh,
    LowCarbonSharePct,
    FossilSharePct,
    PopulationMillions,
    GdpBillionsUsd,
    SourceTwh(EnergySource),
    Share(EnergySource),
    Lag(LagSeries, usize),
    /// Not produced by the feature pipeline; always 0.0
    Unknown,
}

impl FeatureKey {
    pub fn parse(name: &str) -> Self {
        match name {
            "year" => Self::Year,
            "electricity_generation_twh" => Self::ElectricityGenerationTwh,
            "low_carbon_share_pct" => Self::LowCarbonSharePct,
            "fossil_share_pct" => Self::FossilSharePct,
            "population_millions" => Self::PopulationMillions,
            "gdp_billions_usd" => Self::GdpBillionsUsd,
            _ => Self::parse_derived(name).unwrap_or(Self::Unknown),
        }
    }

    fn parse_derived(name: &str) -> Option<Self> {
        if let Some((series, k)) = name.rsplit_once("_lag") {
            let k: usize = k.parse().ok()?;
            if !(1..=MAX_LAG).contains(&k) {
                return None;
            }
            return LagSeries::from_str(series).ok().map(|s| Self::Lag(s, k));
        }
        if let Some(source) = name.strip_suffix("_share") {
            return EnergySource::from_str(source).ok().map(Self::Share);
        }
        if let Some(source) = name.strip_suffix("_twh") {
            return EnergySource::from_str(source).ok().map(Self::SourceTwh);
        }
        None
    }

    /// Value on a row; `None` for undefined lags, missing country data and unknown columns
    pub fn value(self, row: &DerivedRecord) -> Option<f64> {
        let r = &row.record;
        match self {
            Self::Year => Some(f64::from(r.year)),
            Self::ElectricityGenerationTwh => Some(r.electricity_generation_twh),
            Self::LowCarbonSharePct => Some(r.low_carbon_share_pct),
            Self::FossilSharePct => Some(r.fossil_share_pct),
            Self::PopulationMillions => r.population_millions,
            Self::GdpBillionsUsd => r.gdp_billions_usd,
            Self::SourceTwh(source) => Some(r.generation(source)),
            Self::Share(source) => Some(row.share(source)),
            Self::Lag(series, k) => row.lag(series, k),
            Self::Unknown => None,
        }
    }
}

/// Feature ordering of a model bundle
#[derive(Debug, Clone)]
pub struct FeatureLayout {
    names: Vec<String>,
    keys: Vec<FeatureKey>,
}

impl FeatureLayout {
    pub fn new(names: Vec<String>) -> Self {
        let keys = names.iter().map(|n| FeatureKey::parse(n)).collect();
        Self { names, keys }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn unknown_features(&self) -> impl Iterator<Item = &str> {
        self.names
            .iter()
            .zip(self.keys.iter())
            .filter(|(_, k)| **k == FeatureKey::Unknown)
            .map(|(n, _)| n.as_str())
    }

    /// Lay a row out in model order; absent or NaN values become 0.0.
    pub fn reindex(&self, row: &DerivedRecord) -> FeatureVector {
        let features = self
            .keys
            .iter()
            .map(|k| k.value(row).filter(|v| !v.is_nan()).unwrap_or(0.0))
            .collect();

        FeatureVector {
            features,
            feature_names: self.names.clone(),
        }
    }
}
