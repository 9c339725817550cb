use serde::{Deserialize, Deserializer, Serialize};
use strum::{AsRefStr, Display, EnumCount, EnumIter, EnumString, IntoEnumIterator};

/// Number of lag offsets (t-1, t-2, t-3) carried for every lagged series
pub const MAX_LAG: usize = 3;

/// Generation sources tracked per country-year
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display,
    EnumString, EnumIter, EnumCount,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EnergySource {
    Coal,
    Oil,
    Gas,
    Nuclear,
    Hydro,
    Solar,
    Wind,
    OtherRenewables,
}

impl EnergySource {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Series that get t-1..t-3 lag features
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, EnumIter, EnumCount,
)]
#[strum(serialize_all = "snake_case")]
pub enum LagSeries {
    LowCarbonSharePct,
    ElectricityGenerationTwh,
    SolarShare,
    WindShare,
    FossilSharePct,
}

impl LagSeries {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// One country-year observation, as stored in the `energy_yearly` table
/// joined with its country.
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub country_id: i64,
    pub iso3: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub subregion: Option<String>,
    #[serde(default)]
    pub income_group: Option<String>,
    #[serde(default)]
    pub population_millions: Option<f64>,
    #[serde(default)]
    pub gdp_billions_usd: Option<f64>,
    pub year: i32,
    pub electricity_generation_twh: f64,
    pub coal_twh: f64,
    pub oil_twh: f64,
    pub gas_twh: f64,
    pub nuclear_twh: f64,
    pub hydro_twh: f64,
    pub solar_twh: f64,
    pub wind_twh: f64,
    pub other_renewables_twh: f64,
    /// NaN when the source has no value for the year
    #[serde(deserialize_with = "nan_if_null")]
    pub low_carbon_share_pct: f64,
    pub fossil_share_pct: f64,
}

fn nan_if_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

impl HistoricalRecord {
    /// Generation of a single source in TWh
    pub fn generation(&self, source: EnergySource) -> f64 {
        match source {
            EnergySource::Coal => self.coal_twh,
            EnergySource::Oil => self.oil_twh,
            EnergySource::Gas => self.gas_twh,
            EnergySource::Nuclear => self.nuclear_twh,
            EnergySource::Hydro => self.hydro_twh,
            EnergySource::Solar => self.solar_twh,
            EnergySource::Wind => self.wind_twh,
            EnergySource::OtherRenewables => self.other_renewables_twh,
        }
    }

    pub fn set_generation(&mut self, source: EnergySource, twh: f64) {
        let slot = match source {
            EnergySource::Coal => &mut self.coal_twh,
            EnergySource::Oil => &mut self.oil_twh,
            EnergySource::Gas => &mut self.gas_twh,
            EnergySource::Nuclear => &mut self.nuclear_twh,
            EnergySource::Hydro => &mut self.hydro_twh,
            EnergySource::Solar => &mut self.solar_twh,
            EnergySource::Wind => &mut self.wind_twh,
            EnergySource::OtherRenewables => &mut self.other_renewables_twh,
        };
        *slot = twh;
    }

    /// Sum of the eight per-source columns
    pub fn source_total_twh(&self) -> f64 {
        EnergySource::iter().map(|s| self.generation(s)).sum()
    }
}

/// A historical (or synthesized) row extended with share ratios and lags.
///
/// Lags are positional: `lag(series, k)` is the value of `series` k rows
/// earlier in the year-sorted sequence, whatever its calendar year.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRecord {
    pub record: HistoricalRecord,
    pub shares: [f64; EnergySource::COUNT],
    pub lags: [[Option<f64>; MAX_LAG]; LagSeries::COUNT],
}

impl DerivedRecord {
    /// Wrap a record with empty derived fields; `features::recompute` fills them.
    pub fn new(record: HistoricalRecord) -> Self {
        Self {
            record,
            shares: [0.0; EnergySource::COUNT],
            lags: [[None; MAX_LAG]; LagSeries::COUNT],
        }
    }

    pub fn year(&self) -> i32 {
        self.record.year
    }

    pub fn share(&self, source: EnergySource) -> f64 {
        self.shares[source.index()]
    }

    /// Lag `k` (1-based) of a series, `None` when fewer than `k` rows precede this one
    pub fn lag(&self, series: LagSeries, k: usize) -> Option<f64> {
        if k == 0 || k > MAX_LAG {
            return None;
        }
        self.lags[series.index()][k - 1]
    }

    /// Current value of a lagged series on this row
    pub fn series_value(&self, series: LagSeries) -> f64 {
        match series {
            LagSeries::LowCarbonSharePct => self.record.low_carbon_share_pct,
            LagSeries::ElectricityGenerationTwh => self.record.electricity_generation_twh,
            LagSeries::SolarShare => self.share(EnergySource::Solar),
            LagSeries::WindShare => self.share(EnergySource::Wind),
            LagSeries::FossilSharePct => self.record.fossil_share_pct,
        }
    }
}

/// Entry of the `/countries` listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountrySummary {
    pub code: String,
    pub name: String,
}
