use thiserror::Error;

/// Failures of a single forecast request
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("no history for {0}")]
    NoHistory(String),

    #[error("not enough history to build features")]
    InsufficientHistory,

    #[error("horizon must be between 1 and {max}, got {got}")]
    InvalidHorizon { got: u32, max: u32 },

    /// Bundle missing, unloadable or structurally incompatible
    #[error("model stack unavailable or produced invalid output: {0}")]
    ModelUnavailable(String),

    #[error("history source failed: {0}")]
    Storage(String),
}

impl ForecastError {
    /// Input-caused failures; everything else is an environment problem
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ForecastError::NoHistory(_)
                | ForecastError::InsufficientHistory
                | ForecastError::InvalidHorizon { .. }
        )
    }
}
