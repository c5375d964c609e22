use thiserror::Error;

/// Errors raised by the forecasting core.
///
/// Sparse history never produces an error (rates fall back to 0); only
/// records that cannot be scored honestly do.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("malformed record {match_label}: {reason}")]
    MalformedRecord { match_label: String, reason: String },

    #[error("match {0} is not finished")]
    NotFinished(String),

    #[error("invalid score text {0:?}")]
    InvalidScore(String),
}

impl ForecastError {
    pub fn malformed(match_label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            match_label: match_label.into(),
            reason: reason.into(),
        }
    }
}
