use thiserror::Error;

/// Errors surfaced by the account/ledger persistence boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    /// A conditional write observed a balance other than the expected one.
    /// Transient: callers re-read and retry.
    #[error("Conditional write conflict")]
    Conflict,

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the payment key registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Payment key not found")]
    NotFound,

    #[error("Payment key is inactive")]
    Inactive,

    #[error("Payment key is already registered")]
    Conflict,

    #[error("Registry unavailable: {0}")]
    Unavailable(String),
}
