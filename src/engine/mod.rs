pub mod context;
pub mod error;
pub mod fees;
pub mod statement;
pub mod transfer;

// Re-export commonly used types
pub use context::Caller;
pub use error::TransferError;
pub use fees::{FeeEngine, FeeReceipt};
pub use statement::{StatementEntry, StatementFilter, StatementReader};
pub use transfer::{MAX_COMMIT_ATTEMPTS, TransferEngine, TransferReceipt, TransferRequest};
