use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::error::TransferError;
use crate::domain::{
    AccountId, Amount, Direction, FeeCategory, Transaction, TransactionId, TransactionKind,
};
use crate::storage::{AccountStore, LedgerStore, StoreError};

/// Post-filter over a merged statement. Applied after sorting, so it never
/// changes relative order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementFilter {
    All,
    Inbound,
    Outbound,
    Fee,
}

/// One line of an account statement, seen from that account's perspective.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementEntry {
    pub transaction_id: TransactionId,
    pub kind: TransactionKind,
    pub direction: Direction,
    pub counterparty: Option<AccountId>,
    /// Positive magnitude; use `signed_amount` for the account's view.
    pub amount: Amount,
    pub description: String,
    pub fee_category: Option<FeeCategory>,
    pub created_at: DateTime<Utc>,
}

impl StatementEntry {
    pub fn signed_amount(&self) -> Amount {
        match self.direction {
            Direction::Inbound => self.amount,
            Direction::Outbound => Amount::zero() - self.amount,
        }
    }
}

impl StatementFilter {
    fn matches(&self, entry: &StatementEntry) -> bool {
        match self {
            Self::All => true,
            Self::Inbound => entry.direction == Direction::Inbound,
            Self::Outbound => entry.direction == Direction::Outbound,
            Self::Fee => entry.kind == TransactionKind::Fee,
        }
    }
}

/// Read side: reconciles ledger records with the account's embedded fee
/// history into one chronologically ordered statement.
pub struct StatementReader<S> {
    store: Arc<S>,
}

impl<S> StatementReader<S>
where
    S: AccountStore + LedgerStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Merged statement for one account, most recent first. Ties on the
    /// timestamp break by transaction id ascending so repeated reads are
    /// deterministic. `limit` truncates after sorting and filtering.
    pub async fn statement(
        &self,
        account_id: &AccountId,
        filter: StatementFilter,
        limit: usize,
    ) -> Result<Vec<StatementEntry>, TransferError> {
        let account = match self.store.get(account_id).await {
            Ok(account) => account,
            Err(StoreError::NotFound) => {
                return Err(TransferError::AccountNotFound(account_id.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let transactions = self.store.transactions_for(account_id).await?;

        // Fee categories live only in the embedded history; index them by
        // the canonical transaction id.
        let fee_index: HashMap<TransactionId, &crate::domain::FeeRecord> = account
            .fee_history()
            .iter()
            .map(|fee| (fee.transaction_id, fee))
            .collect();

        let mut seen: HashSet<TransactionId> = HashSet::new();
        let mut entries: Vec<StatementEntry> = Vec::with_capacity(
            transactions.len() + account.fee_history().len(),
        );

        for tx in &transactions {
            seen.insert(tx.id);
            entries.push(self.ledger_entry(account_id, tx, &fee_index));
        }

        // Union with fee history: only records whose transaction is not
        // already present from the ledger. Fees are always outbound from
        // the account's perspective.
        for fee in account.fee_history() {
            if seen.insert(fee.transaction_id) {
                entries.push(StatementEntry {
                    transaction_id: fee.transaction_id,
                    kind: TransactionKind::Fee,
                    direction: Direction::Outbound,
                    counterparty: None,
                    amount: fee.amount,
                    description: fee.description.clone(),
                    fee_category: Some(fee.category),
                    created_at: fee.applied_at,
                });
            }
        }

        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(a.transaction_id.cmp(&b.transaction_id))
        });

        entries.retain(|entry| filter.matches(entry));
        entries.truncate(limit);
        Ok(entries)
    }

    fn ledger_entry(
        &self,
        account_id: &AccountId,
        tx: &Transaction,
        fee_index: &HashMap<TransactionId, &crate::domain::FeeRecord>,
    ) -> StatementEntry {
        let (direction, counterparty) = if tx.to == *account_id {
            (Direction::Inbound, tx.from.clone())
        } else {
            (Direction::Outbound, tx.to.clone())
        };
        StatementEntry {
            transaction_id: tx.id,
            kind: tx.kind,
            direction,
            counterparty: Some(counterparty),
            amount: tx.amount,
            description: tx.description.clone(),
            fee_category: fee_index.get(&tx.id).map(|fee| fee.category),
            created_at: tx.created_at,
        }
    }
}
