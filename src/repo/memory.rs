//! History source backed by rows held in memory (fixtures, JSON exports)

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use super::HistorySource;
use crate::domain::{CountrySummary, HistoricalRecord};

#[derive(Debug, Default)]
pub struct InMemoryHistorySource {
    by_country: HashMap<String, Vec<HistoricalRecord>>,
}

impl InMemoryHistorySource {
    pub fn new(records: Vec<HistoricalRecord>) -> Self {
        let mut by_country: HashMap<String, Vec<HistoricalRecord>> = HashMap::new();
        for record in records {
            by_country
                .entry(record.iso3.trim().to_uppercase())
                .or_default()
                .push(record);
        }
        for rows in by_country.values_mut() {
            rows.sort_by_key(|r| r.year);
        }
        Self { by_country }
    }

    /// Load a JSON array of [`HistoricalRecord`]
    pub async fn from_json_file(path: &Path) -> Result<Self> {
        let txt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read history file {}", path.display()))?;
        let records: Vec<HistoricalRecord> = serde_json::from_str(&txt)
            .with_context(|| format!("failed to parse history file {}", path.display()))?;

        let source = Self::new(records);
        info!(path = %path.display(), countries = source.country_count(), "history loaded");
        Ok(source)
    }

    pub fn country_count(&self) -> usize {
        self.by_country.len()
    }
}

#[async_trait]
impl HistorySource for InMemoryHistorySource {
    async fn fetch_history(&self, iso3: &str) -> Result<Vec<HistoricalRecord>> {
        Ok(self
            .by_country
            .get(&iso3.trim().to_uppercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn list_countries(&self) -> Result<Vec<CountrySummary>> {
        let mut countries: Vec<CountrySummary> = self
            .by_country
            .iter()
            .map(|(code, rows)| CountrySummary {
                code: code.clone(),
                name: rows
                    .iter()
                    .find_map(|r| r.name.clone())
                    .unwrap_or_else(|| code.clone()),
            })
            .collect();
        countries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.code.cmp(&b.code)));
        Ok(countries)
    }
}
