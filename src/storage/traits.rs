use async_trait::async_trait;
use uuid::Uuid;

use super::error::{RegistryError, StoreError};
use crate::domain::{
    Account, AccountId, AccountStatus, Amount, FeeRecord, PaymentKey, Transaction, TransactionId,
    TransactionView,
};

/// Conditional balance update: only applies if the stored balance still
/// equals `expected` at commit time (optimistic concurrency).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceWrite {
    pub account: AccountId,
    pub expected: Amount,
    pub new_balance: Amount,
}

/// The atomic write group of a single transfer: two conditional balance
/// updates, the canonical transaction, one signed view per participant and
/// an optional fee record appended to the debited account.
///
/// A store applies the whole batch or none of it; readers never observe a
/// partially applied batch.
#[derive(Debug, Clone)]
pub struct CommitBatch {
    pub debit: BalanceWrite,
    pub credit: BalanceWrite,
    pub transaction: Transaction,
    pub sender_view: TransactionView,
    pub recipient_view: TransactionView,
    pub fee: Option<FeeRecord>,
}

impl CommitBatch {
    /// Build the batch for a plain transfer; the per-account views are
    /// derived from the canonical transaction.
    pub fn transfer(transaction: Transaction, debit: BalanceWrite, credit: BalanceWrite) -> Self {
        let sender_view = TransactionView::outbound(&transaction);
        let recipient_view = TransactionView::inbound(&transaction);
        Self {
            debit,
            credit,
            transaction,
            sender_view,
            recipient_view,
            fee: None,
        }
    }

    /// Attach a fee record to be appended to the debited account's history.
    pub fn with_fee(mut self, fee: FeeRecord) -> Self {
        self.fee = Some(fee);
        self
    }
}

/// Result recorded against an idempotency token at commit time, returned
/// verbatim for replayed submissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub transaction_id: TransactionId,
    pub sender_balance: Amount,
}

/// Cancellable stream of account snapshots, delivered in commit order.
/// Dropping the handle cancels the subscription.
pub struct AccountEvents {
    receiver: tokio::sync::broadcast::Receiver<Account>,
}

impl AccountEvents {
    pub(crate) fn new(receiver: tokio::sync::broadcast::Receiver<Account>) -> Self {
        Self { receiver }
    }

    /// Next snapshot, or `None` once the store is gone. A slow subscriber
    /// that lags behind skips to the oldest retained snapshot.
    pub async fn recv(&mut self) -> Option<Account> {
        use tokio::sync::broadcast::error::RecvError;
        loop {
            match self.receiver.recv().await {
                Ok(account) => return Some(account),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// Durable keyed storage of account records
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get(&self, id: &AccountId) -> Result<Account, StoreError>;

    async fn insert(&self, account: Account) -> Result<(), StoreError>;

    /// Operator escape hatch: unconditional status overwrite.
    async fn set_status(&self, id: &AccountId, status: AccountStatus)
    -> Result<Account, StoreError>;

    /// Operator escape hatch: unconditional balance overwrite. Bypasses the
    /// conservation guarantee by design.
    async fn overwrite_balance(&self, id: &AccountId, balance: Amount)
    -> Result<Account, StoreError>;

    /// Subscribe to committed snapshots of one account.
    async fn subscribe(&self, id: &AccountId) -> Result<AccountEvents, StoreError>;
}

/// Append-only store of canonical transaction records plus the atomic
/// multi-record commit used by the engines
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Apply the whole batch or nothing. `Conflict` if any conditional
    /// balance write no longer matches, or if the transaction carries an
    /// idempotency token that already has a recorded receipt; no mutation
    /// happens in either case.
    async fn commit(&self, batch: CommitBatch) -> Result<(), StoreError>;

    async fn transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError>;

    /// All canonical records where the account is sender or recipient.
    async fn transactions_for(&self, account: &AccountId)
    -> Result<Vec<Transaction>, StoreError>;

    /// The account's per-account signed views, in append order.
    async fn views_for(&self, account: &AccountId) -> Result<Vec<TransactionView>, StoreError>;

    /// Prior result for an idempotency token, if that token was committed.
    async fn receipt_for_token(&self, token: &str) -> Result<Option<CommitReceipt>, StoreError>;
}

/// Durable mapping from payment key string to owning account.
///
/// The registry is the single source of truth for key uniqueness; any
/// per-account key list is a derived, read-only projection.
#[async_trait]
pub trait KeyRegistry: Send + Sync {
    /// Resolve an active key to its row. Inactive keys are distinct from
    /// missing ones.
    async fn resolve(&self, key: &str) -> Result<PaymentKey, RegistryError>;

    async fn key_exists(&self, key: &str) -> Result<bool, RegistryError>;

    /// Register a new key. `Conflict` if the key string is already active
    /// anywhere in the registry.
    async fn register(&self, key: PaymentKey) -> Result<(), RegistryError>;

    async fn deactivate(&self, owner: &AccountId, key_id: Uuid) -> Result<(), RegistryError>;

    /// Derived projection of an account's keys.
    async fn keys_for(&self, owner: &AccountId) -> Result<Vec<PaymentKey>, RegistryError>;
}
