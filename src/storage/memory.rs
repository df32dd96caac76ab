use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{RwLock, broadcast};
use tracing::debug;

use super::error::StoreError;
use super::traits::{
    AccountEvents, AccountStore, BalanceWrite, CommitBatch, CommitReceipt, LedgerStore,
};
use crate::domain::{
    Account, AccountId, AccountStatus, Amount, Transaction, TransactionId, TransactionView,
};

const SNAPSHOT_CHANNEL_CAPACITY: usize = 64;

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<AccountId, Account>,
    transactions: BTreeMap<TransactionId, Transaction>,
    views: HashMap<AccountId, Vec<TransactionView>>,
    token_receipts: HashMap<String, CommitReceipt>,
}

/// In-memory account and ledger store.
///
/// One writer lock guards the whole ledger state, so a commit batch is
/// applied as a unit: a reader either sees all of its writes or none.
/// Commits validate every conditional balance write before touching
/// anything, so a `Conflict` leaves the state untouched.
pub struct MemoryStore {
    state: RwLock<LedgerState>,
    watchers: DashMap<AccountId, broadcast::Sender<Account>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
            watchers: DashMap::new(),
        }
    }

    /// Publish a committed snapshot. Called while the write lock is held,
    /// so delivery order matches commit order for the account.
    fn publish(&self, account: &Account) {
        if let Some(sender) = self.watchers.get(account.id()) {
            // Nobody listening is fine; receivers drop to cancel.
            let _ = sender.send(account.clone());
        }
    }

    fn check_write(state: &LedgerState, write: &BalanceWrite) -> Result<(), StoreError> {
        let account = state
            .accounts
            .get(&write.account)
            .ok_or(StoreError::NotFound)?;
        if account.balance() != write.expected {
            return Err(StoreError::Conflict);
        }
        Ok(())
    }

    fn apply_write(state: &mut LedgerState, write: &BalanceWrite) {
        // Presence was validated before any write was applied.
        if let Some(account) = state.accounts.get_mut(&write.account) {
            account.set_balance(write.new_balance);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn get(&self, id: &AccountId) -> Result<Account, StoreError> {
        let state = self.state.read().await;
        state.accounts.get(id).cloned().ok_or(StoreError::NotFound)
    }

    async fn insert(&self, account: Account) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.accounts.contains_key(account.id()) {
            return Err(StoreError::Conflict);
        }
        state.accounts.insert(account.id().clone(), account);
        Ok(())
    }

    async fn set_status(
        &self,
        id: &AccountId,
        status: AccountStatus,
    ) -> Result<Account, StoreError> {
        let mut state = self.state.write().await;
        let account = state.accounts.get_mut(id).ok_or(StoreError::NotFound)?;
        account.set_status(status);
        let snapshot = account.clone();
        self.publish(&snapshot);
        Ok(snapshot)
    }

    async fn overwrite_balance(
        &self,
        id: &AccountId,
        balance: Amount,
    ) -> Result<Account, StoreError> {
        let mut state = self.state.write().await;
        let account = state.accounts.get_mut(id).ok_or(StoreError::NotFound)?;
        account.set_balance(balance);
        let snapshot = account.clone();
        self.publish(&snapshot);
        Ok(snapshot)
    }

    async fn subscribe(&self, id: &AccountId) -> Result<AccountEvents, StoreError> {
        {
            let state = self.state.read().await;
            if !state.accounts.contains_key(id) {
                return Err(StoreError::NotFound);
            }
        }
        let sender = self
            .watchers
            .entry(id.clone())
            .or_insert_with(|| broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY).0);
        Ok(AccountEvents::new(sender.subscribe()))
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn commit(&self, batch: CommitBatch) -> Result<(), StoreError> {
        let mut state = self.state.write().await;

        // Validate the whole group before applying anything. A token that
        // already has a receipt means this logical transfer was committed
        // by a rival submission; it must not land twice.
        if let Some(token) = &batch.transaction.idempotency_token {
            if state.token_receipts.contains_key(token) {
                return Err(StoreError::Conflict);
            }
        }
        Self::check_write(&state, &batch.debit)?;
        Self::check_write(&state, &batch.credit)?;

        Self::apply_write(&mut state, &batch.debit);
        Self::apply_write(&mut state, &batch.credit);

        if let Some(fee) = batch.fee {
            if let Some(target) = state.accounts.get_mut(&batch.debit.account) {
                target.push_fee(fee);
            }
        }

        if let Some(token) = &batch.transaction.idempotency_token {
            state.token_receipts.insert(
                token.clone(),
                CommitReceipt {
                    transaction_id: batch.transaction.id,
                    sender_balance: batch.debit.new_balance,
                },
            );
        }

        state
            .views
            .entry(batch.debit.account.clone())
            .or_default()
            .push(batch.sender_view);
        state
            .views
            .entry(batch.credit.account.clone())
            .or_default()
            .push(batch.recipient_view);

        debug!(
            transaction_id = %batch.transaction.id,
            from = %batch.transaction.from,
            to = %batch.transaction.to,
            "Committed transfer batch"
        );
        state
            .transactions
            .insert(batch.transaction.id, batch.transaction);

        // Snapshots go out before the lock drops so subscribers observe
        // commit order.
        for id in [&batch.debit.account, &batch.credit.account] {
            if let Some(account) = state.accounts.get(id) {
                self.publish(account);
            }
        }

        Ok(())
    }

    async fn transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        let state = self.state.read().await;
        Ok(state.transactions.get(&id).cloned())
    }

    async fn transactions_for(&self, account: &AccountId) -> Result<Vec<Transaction>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .values()
            .filter(|tx| tx.from == *account || tx.to == *account)
            .cloned()
            .collect())
    }

    async fn views_for(&self, account: &AccountId) -> Result<Vec<TransactionView>, StoreError> {
        let state = self.state.read().await;
        Ok(state.views.get(account).cloned().unwrap_or_default())
    }

    async fn receipt_for_token(&self, token: &str) -> Result<Option<CommitReceipt>, StoreError> {
        let state = self.state.read().await;
        Ok(state.token_receipts.get(token).cloned())
    }
}
