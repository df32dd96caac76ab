use thiserror::Error;

/// Domain-level errors representing business rule violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Account is not active")]
    AccountInactive,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Payment key is not valid for its type")]
    InvalidKey,
}
