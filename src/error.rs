#[cfg(feature = "python")]
use pyo3::exceptions::{PyRuntimeError, PyValueError};
#[cfg(feature = "python")]
use pyo3::PyErr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GhgError {
    #[error("Data not loaded: {0}")]
    NotLoaded(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    General(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Validation: {0}")]
    Validation(String),

    #[error("InvalidData: {0}")]
    InvalidData(String),

    #[error("Unknown facility: {0}")]
    UnknownFacility(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Unknown factor: {0}")]
    UnknownFactor(String),

    #[error("Factor conflict: {0}")]
    FactorConflict(String),
}

impl GhgError {
    /// Errors caused by the caller's input rather than by the environment.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            GhgError::MissingColumn(_)
                | GhgError::Validation(_)
                | GhgError::InvalidData(_)
                | GhgError::UnknownFacility(_)
                | GhgError::UnknownCategory(_)
                | GhgError::UnknownSource(_)
                | GhgError::UnknownFactor(_)
                | GhgError::FactorConflict(_)
        )
    }
}

#[cfg(feature = "python")]
impl From<GhgError> for PyErr {
    fn from(err: GhgError) -> PyErr {
        if err.is_input_error() {
            PyValueError::new_err(err.to_string())
        } else {
            PyRuntimeError::new_err(err.to_string())
        }
    }
}

#[cfg(feature = "python")]
impl From<PyErr> for GhgError {
    fn from(err: PyErr) -> Self {
        GhgError::General(err.to_string())
    }
}
