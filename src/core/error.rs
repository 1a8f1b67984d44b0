use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpsError {
    #[error("Merchant not found: {0}")]
    MerchantNotFound(String),

    #[error("Operation {operation} requires a metric field selector")]
    MissingField { operation: String },

    #[error("Plan contains an unresolved cycle involving task {0}")]
    UnresolvedCycle(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OpsError>;
