use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use super::context::Caller;
use super::error::TransferError;
use super::transfer::{MAX_COMMIT_ATTEMPTS, TransferReceipt};
use crate::domain::{
    self, Account, AccountId, AccountStatus, Amount, DomainError, FeeCategory, FeeRecord,
    Transaction, TransactionId, TransactionKind, TransactionStatus,
};
use crate::storage::{AccountStore, BalanceWrite, CommitBatch, LedgerStore, StoreError};

/// Result of a committed fee application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeReceipt {
    pub fee_id: Uuid,
    pub transaction_id: TransactionId,
    /// Target account balance after the debit.
    pub balance: Amount,
}

/// Operator-initiated money movement: mandatory fees and direct
/// account-id-addressed transfers, plus the administrative escape hatches.
///
/// No key resolution happens here; targets are addressed by account id.
pub struct FeeEngine<S> {
    store: Arc<S>,
}

impl<S> FeeEngine<S>
where
    S: AccountStore + LedgerStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Apply a mandatory fee: debit the target, credit the operator, write
    /// one fee transaction and append the paid fee record to the target's
    /// history, all in one atomic commit.
    ///
    /// Fees are collected regardless of the target's status but never
    /// overdraw.
    pub async fn apply_fee(
        &self,
        caller: &Caller,
        target_id: &AccountId,
        category: FeeCategory,
        description: &str,
        amount: Amount,
        due_at: Option<DateTime<Utc>>,
    ) -> Result<FeeReceipt, TransferError> {
        if !caller.is_operator() {
            return Err(TransferError::Unauthorized);
        }
        if !amount.is_positive() {
            return Err(TransferError::InvalidAmount);
        }
        if *target_id == caller.account_id {
            return Err(TransferError::SelfFeeNotAllowed);
        }

        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let target = self.read_account(target_id).await?;
            let operator = self.read_account(&caller.account_id).await?;

            let new_target_balance =
                domain::levied_balance(&target, amount).map_err(map_levy_error)?;
            let new_operator_balance =
                domain::credited_balance(&operator, amount).map_err(map_levy_error)?;

            let transaction = Transaction {
                id: TransactionId::generate(),
                kind: TransactionKind::Fee,
                from: target.id().clone(),
                to: operator.id().clone(),
                amount,
                description: format!("Fee: {description}"),
                status: TransactionStatus::Completed,
                idempotency_token: None,
                created_at: Utc::now(),
            };
            let fee = FeeRecord {
                id: Uuid::new_v4(),
                transaction_id: transaction.id,
                category,
                description: description.to_string(),
                amount,
                applied_at: transaction.created_at,
                due_at,
                paid: true,
            };
            let fee_id = fee.id;
            let transaction_id = transaction.id;

            let batch = CommitBatch::transfer(
                transaction,
                BalanceWrite {
                    account: target.id().clone(),
                    expected: target.balance(),
                    new_balance: new_target_balance,
                },
                BalanceWrite {
                    account: operator.id().clone(),
                    expected: operator.balance(),
                    new_balance: new_operator_balance,
                },
            )
            .with_fee(fee);

            match self.store.commit(batch).await {
                Ok(()) => {
                    debug!(%transaction_id, target = %target_id, %amount, "Fee applied");
                    return Ok(FeeReceipt {
                        fee_id,
                        transaction_id,
                        balance: new_target_balance,
                    });
                }
                Err(StoreError::Conflict) => {
                    warn!(attempt, target = %target_id, "Fee commit contended, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(TransferError::Contention(MAX_COMMIT_ATTEMPTS))
    }

    /// Transfer from the operator's account to a target addressed by
    /// account id. Same commit protocol as a peer transfer, no key
    /// resolution, operator role required.
    pub async fn operator_transfer(
        &self,
        caller: &Caller,
        target_id: &AccountId,
        amount: Amount,
        description: Option<&str>,
        idempotency_token: Option<&str>,
    ) -> Result<TransferReceipt, TransferError> {
        if !caller.is_operator() {
            return Err(TransferError::Unauthorized);
        }
        if !amount.is_positive() {
            return Err(TransferError::InvalidAmount);
        }
        if *target_id == caller.account_id {
            return Err(TransferError::SelfTransferNotAllowed);
        }

        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            // Checked every attempt: a conflicted commit may mean a rival
            // submission carrying the same token won the race.
            if let Some(token) = idempotency_token {
                if let Some(receipt) = self.store.receipt_for_token(token).await? {
                    return Ok(TransferReceipt {
                        transaction_id: receipt.transaction_id,
                        balance: receipt.sender_balance,
                    });
                }
            }

            let operator = self.read_account(&caller.account_id).await?;
            let target = self.read_account(target_id).await?;

            let new_operator_balance = domain::debited_balance(&operator, amount)
                .map_err(|e| operator_debit_error(caller, e))?;
            let new_target_balance =
                domain::credited_balance(&target, amount).map_err(map_levy_error)?;

            let transaction = Transaction {
                id: TransactionId::generate(),
                kind: TransactionKind::OperatorTransfer,
                from: operator.id().clone(),
                to: target.id().clone(),
                amount,
                description: description
                    .map(str::to_string)
                    .unwrap_or_else(|| "Administrative transfer".to_string()),
                status: TransactionStatus::Completed,
                idempotency_token: idempotency_token.map(str::to_string),
                created_at: Utc::now(),
            };
            let transaction_id = transaction.id;

            let batch = CommitBatch::transfer(
                transaction,
                BalanceWrite {
                    account: operator.id().clone(),
                    expected: operator.balance(),
                    new_balance: new_operator_balance,
                },
                BalanceWrite {
                    account: target.id().clone(),
                    expected: target.balance(),
                    new_balance: new_target_balance,
                },
            );

            match self.store.commit(batch).await {
                Ok(()) => {
                    debug!(%transaction_id, target = %target_id, %amount, "Operator transfer committed");
                    return Ok(TransferReceipt {
                        transaction_id,
                        balance: new_operator_balance,
                    });
                }
                Err(StoreError::Conflict) => {
                    warn!(attempt, target = %target_id, "Operator transfer contended, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(TransferError::Contention(MAX_COMMIT_ATTEMPTS))
    }

    /// Privileged escape hatch: unconditional status overwrite. Outside
    /// the transfer protocol; no transaction record is written.
    pub async fn set_status(
        &self,
        caller: &Caller,
        target_id: &AccountId,
        status: AccountStatus,
    ) -> Result<Account, TransferError> {
        if !caller.is_operator() {
            return Err(TransferError::Unauthorized);
        }
        warn!(target = %target_id, ?status, "Administrative status overwrite");
        match self.store.set_status(target_id, status).await {
            Ok(account) => Ok(account),
            Err(StoreError::NotFound) => Err(TransferError::AccountNotFound(target_id.clone())),
            Err(e) => Err(e.into()),
        }
    }

    /// Privileged escape hatch: unconditional balance overwrite for
    /// administrative correction. Bypasses the conservation guarantee by
    /// design; no transaction record is written.
    pub async fn set_balance(
        &self,
        caller: &Caller,
        target_id: &AccountId,
        balance: Amount,
    ) -> Result<Account, TransferError> {
        if !caller.is_operator() {
            return Err(TransferError::Unauthorized);
        }
        if balance < Amount::zero() {
            return Err(TransferError::InvalidAmount);
        }
        warn!(target = %target_id, %balance, "Administrative balance overwrite");
        match self.store.overwrite_balance(target_id, balance).await {
            Ok(account) => Ok(account),
            Err(StoreError::NotFound) => Err(TransferError::AccountNotFound(target_id.clone())),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_account(&self, id: &AccountId) -> Result<Account, TransferError> {
        match self.store.get(id).await {
            Ok(account) => Ok(account),
            Err(StoreError::NotFound) => Err(TransferError::AccountNotFound(id.clone())),
            Err(e) => Err(e.into()),
        }
    }
}

fn map_levy_error(err: DomainError) -> TransferError {
    match err {
        DomainError::InvalidAmount => TransferError::InvalidAmount,
        DomainError::InsufficientFunds => TransferError::InsufficientFunds,
        DomainError::Overflow => TransferError::Overflow,
        DomainError::AccountInactive | DomainError::InvalidKey => {
            TransferError::Store(StoreError::Unavailable("unexpected levy failure".into()))
        }
    }
}

fn operator_debit_error(caller: &Caller, err: DomainError) -> TransferError {
    match err {
        DomainError::AccountInactive => TransferError::AccountBlocked(caller.account_id.clone()),
        other => map_levy_error(other),
    }
}
