use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("invalid payload: {0}")]
    ValidationError(String),

    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("store write failed: {0}")]
    WriteError(#[source] anyhow::Error),

    #[error("store query failed: {0}")]
    QueryError(#[source] anyhow::Error),
}

impl DomainError {
    /// True when the error is the client's fault (bad request parameters).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DomainError::MissingParameter(_) | DomainError::InvalidParameter { .. }
        )
    }
}
