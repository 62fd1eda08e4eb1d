use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Persistence read error: {0}")]
    PersistenceRead(String),

    #[error("Persistence write error: {0}")]
    PersistenceWrite(String),

    #[error("Normalization error: {0}")]
    Normalize(String),

    #[error("Reference error: {0}")]
    Reference(String),

    #[error("Source error: {0}")]
    Source(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

impl From<polars::error::PolarsError> for EtlError {
    fn from(err: polars::error::PolarsError) -> Self {
        EtlError::Polars(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
