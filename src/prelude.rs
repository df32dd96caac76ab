//! Prelude module for convenient imports
//!
//! Import everything you need with: `use keypay::prelude::*;`

// Domain types
pub use crate::domain::{
    Account, AccountId, AccountStatus, Amount, Direction, DomainError, FeeCategory, FeeRecord,
    KeyKind, PaymentKey, Role, Transaction, TransactionId, TransactionKind, TransactionStatus,
    TransactionView,
};

// Storage types
pub use crate::storage::{
    AccountEvents, AccountStore, BalanceWrite, CommitBatch, CommitReceipt, KeyRegistry,
    LedgerStore, MemoryKeyRegistry, MemoryStore, RegistryError, StoreError,
};

// Engine types
pub use crate::engine::{
    Caller, FeeEngine, FeeReceipt, StatementEntry, StatementFilter, StatementReader,
    TransferEngine, TransferError, TransferReceipt, TransferRequest,
};
