use thiserror::Error;

use crate::domain::AccountId;
use crate::storage::{RegistryError, StoreError};

/// Engine-level errors for transfer, fee and statement operations.
///
/// Every failure carries a stable kind plus a human-readable reason;
/// callers must treat only an explicit receipt as success.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Account is blocked or suspended: {0}")]
    AccountBlocked(AccountId),

    #[error("Recipient account is not active")]
    RecipientInactive,

    #[error("Payment key not found: {0}")]
    KeyNotFound(String),

    #[error("Payment key is not valid for its type")]
    InvalidKey,

    #[error("Payment key is already registered")]
    KeyAlreadyRegistered,

    #[error("Cannot transfer to your own account")]
    SelfTransferNotAllowed,

    #[error("Cannot apply a fee to your own account")]
    SelfFeeNotAllowed,

    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Caller is not authorized for this operation")]
    Unauthorized,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Transfer failed: still contended after {0} attempts")]
    Contention(u32),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}
