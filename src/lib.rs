//! Energy mix forecaster
//!
//! Forecasts a country's low-carbon generation share and total electricity
//! generation several years ahead from its yearly history, by stepping two
//! pre-trained delta models forward one year at a time.

pub mod api;
pub mod config;
pub mod domain;
pub mod forecast;
pub mod ml;
pub mod repo;
pub mod state;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_support;
