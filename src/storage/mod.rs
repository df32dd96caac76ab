pub mod error;
pub mod memory;
pub mod registry;
pub mod traits;

// Re-export commonly used types
pub use error::{RegistryError, StoreError};
pub use memory::MemoryStore;
pub use registry::MemoryKeyRegistry;
pub use traits::{
    AccountEvents, AccountStore, BalanceWrite, CommitBatch, CommitReceipt, KeyRegistry,
    LedgerStore,
};
