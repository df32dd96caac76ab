pub mod account;
pub mod amount;
pub mod error;
pub mod key;
pub mod operations;
pub mod transaction;

// Re-export commonly used types
pub use account::{Account, AccountId, AccountStatus, Role};
pub use amount::Amount;
pub use error::DomainError;
pub use key::{KeyKind, PaymentKey, validate_key};
pub use operations::{credited_balance, debited_balance, levied_balance};
pub use transaction::{
    Direction, FeeCategory, FeeRecord, Transaction, TransactionId, TransactionKind,
    TransactionStatus, TransactionView,
};
