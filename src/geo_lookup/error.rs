use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the lookup core.
///
/// Both are load-time conditions. "No coverage" is never an error.
#[derive(Debug, Error)]
pub enum GeoLookupError {
    #[error("failed to load soil dataset from {}: {reason}", path.display())]
    DataLoad { path: PathBuf, reason: String },

    #[error("soil dataset not loaded; load the polygon store before running lookups")]
    NotLoaded,
}

impl GeoLookupError {
    pub(crate) fn data_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        GeoLookupError::DataLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
