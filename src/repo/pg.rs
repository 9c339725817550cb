#![cfg(feature = "db")]

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use super::HistorySource;
use crate::domain::{CountrySummary, HistoricalRecord};

// Numeric columns are cast so they decode as i64/i32/f64 whatever the
// table's declared precision. Missing generation values read as 0; a missing
// low-carbon share reads as NaN so rows lagging it are not eligible.
const HISTORY_SQL: &str = r#"
    SELECT
        c.country_id::int8 AS country_id,
        TRIM(c.iso3) AS iso3,
        c.name,
        c.region,
        c.subregion,
        c.income_group,
        c.population_millions::float8 AS population_millions,
        c.gdp_billions_usd::float8 AS gdp_billions_usd,
        e.year::int4 AS year,
        COALESCE(e.electricity_generation_twh, 0)::float8 AS electricity_generation_twh,
        COALESCE(e.coal_twh, 0)::float8 AS coal_twh,
        COALESCE(e.oil_twh, 0)::float8 AS oil_twh,
        COALESCE(e.gas_twh, 0)::float8 AS gas_twh,
        COALESCE(e.nuclear_twh, 0)::float8 AS nuclear_twh,
        COALESCE(e.hydro_twh, 0)::float8 AS hydro_twh,
        COALESCE(e.solar_twh, 0)::float8 AS solar_twh,
        COALESCE(e.wind_twh, 0)::float8 AS wind_twh,
        COALESCE(e.other_renewables_twh, 0)::float8 AS other_renewables_twh,
        COALESCE(e.low_carbon_share_pct::float8, 'NaN'::float8) AS low_carbon_share_pct,
        COALESCE(e.fossil_share_pct, 0)::float8 AS fossil_share_pct
    FROM energy_yearly e
    JOIN countries c ON c.country_id = e.country_id
    WHERE TRIM(c.iso3) = $1
    ORDER BY e.year
"#;

const COUNTRIES_SQL: &str = r#"
    SELECT TRIM(iso3), name
    FROM countries
    WHERE iso3 IS NOT NULL
    ORDER BY name
"#;

/// History source over the `countries` and `energy_yearly` tables
pub struct PgHistorySource {
    pub pool: PgPool,
}

impl PgHistorySource {
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl HistorySource for PgHistorySource {
    async fn fetch_history(&self, iso3: &str) -> Result<Vec<HistoricalRecord>> {
        let rows = sqlx::query_as::<_, HistoricalRecord>(HISTORY_SQL)
            .bind(iso3)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_countries(&self) -> Result<Vec<CountrySummary>> {
        let rows: Vec<(String, Option<String>)> = sqlx::query_as(COUNTRIES_SQL)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(code, name)| CountrySummary {
                name: name.unwrap_or_else(|| code.clone()),
                code,
            })
            .collect())
    }
}
