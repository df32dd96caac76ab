use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::context::Caller;
use super::error::TransferError;
use crate::domain::{
    self, Amount, DomainError, KeyKind, PaymentKey, Transaction, TransactionId, TransactionKind,
    TransactionStatus,
};
use crate::storage::{
    AccountStore, BalanceWrite, CommitBatch, KeyRegistry, LedgerStore, RegistryError, StoreError,
};

/// Bounded retry budget for contended commits. Beyond this the transfer
/// surfaces as `Contention`.
pub const MAX_COMMIT_ATTEMPTS: u32 = 3;

/// A transfer submission addressed by payment key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub to_key: String,
    pub amount: Amount,
    pub description: Option<String>,
    pub idempotency_token: Option<String>,
}

impl TransferRequest {
    pub fn new(to_key: impl Into<String>, amount: Amount) -> Self {
        Self {
            to_key: to_key.into(),
            amount,
            description: None,
            idempotency_token: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.idempotency_token = Some(token.into());
        self
    }
}

/// Explicit success result: the committed transaction id and the sender's
/// post-transfer balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub transaction_id: TransactionId,
    pub balance: Amount,
}

/// Orchestrates balance-conserving transfers between two accounts
/// addressed by payment key.
pub struct TransferEngine<S, R> {
    store: Arc<S>,
    registry: Arc<R>,
}

impl<S, R> TransferEngine<S, R>
where
    S: AccountStore + LedgerStore,
    R: KeyRegistry,
{
    pub fn new(store: Arc<S>, registry: Arc<R>) -> Self {
        Self { store, registry }
    }

    /// Move `request.amount` from the caller's account to the account
    /// owning `request.to_key`, writing the canonical transaction and both
    /// per-account views under one atomic commit.
    pub async fn transfer(
        &self,
        caller: &Caller,
        request: TransferRequest,
    ) -> Result<TransferReceipt, TransferError> {
        if !request.amount.is_positive() {
            return Err(TransferError::InvalidAmount);
        }

        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            // A replayed submission returns the prior result without
            // moving funds again. Checked every attempt: a conflicted
            // commit may mean a rival submission carrying the same token
            // won the race.
            if let Some(token) = &request.idempotency_token {
                if let Some(receipt) = self.store.receipt_for_token(token).await? {
                    debug!(%token, transaction_id = %receipt.transaction_id, "Replayed transfer token");
                    return Ok(TransferReceipt {
                        transaction_id: receipt.transaction_id,
                        balance: receipt.sender_balance,
                    });
                }
            }

            // Re-read everything each attempt; a conflict means some
            // observed balance was stale.
            let source = match self.store.get(&caller.account_id).await {
                Ok(account) => account,
                Err(StoreError::NotFound) => {
                    return Err(TransferError::AccountNotFound(caller.account_id.clone()));
                }
                Err(e) => return Err(e.into()),
            };
            if !source.is_active() {
                return Err(TransferError::AccountBlocked(caller.account_id.clone()));
            }

            let key = match self.registry.resolve(&request.to_key).await {
                Ok(key) => key,
                // An inactive key is unusable as a transfer address, same
                // as a missing one.
                Err(RegistryError::NotFound) | Err(RegistryError::Inactive) => {
                    return Err(TransferError::KeyNotFound(request.to_key.clone()));
                }
                Err(e) => return Err(TransferError::Registry(e)),
            };

            let recipient = match self.store.get(&key.owner).await {
                Ok(account) => account,
                // Dangling key row: the address does not lead anywhere.
                Err(StoreError::NotFound) => {
                    return Err(TransferError::KeyNotFound(request.to_key.clone()));
                }
                Err(e) => return Err(e.into()),
            };

            if recipient.id() == source.id() {
                return Err(TransferError::SelfTransferNotAllowed);
            }
            if !recipient.is_active() {
                return Err(TransferError::RecipientInactive);
            }

            let new_source_balance = domain::debited_balance(&source, request.amount)
                .map_err(|e| debit_error(caller, e))?;
            let new_recipient_balance = domain::credited_balance(&recipient, request.amount)
                .map_err(credit_error)?;

            let description = request.description.clone().unwrap_or_else(|| {
                format!("Transfer to {}", recipient.display_name())
            });
            let transaction = Transaction {
                id: TransactionId::generate(),
                kind: TransactionKind::PeerTransfer,
                from: source.id().clone(),
                to: recipient.id().clone(),
                amount: request.amount,
                description,
                status: TransactionStatus::Completed,
                idempotency_token: request.idempotency_token.clone(),
                created_at: Utc::now(),
            };
            let transaction_id = transaction.id;

            let batch = CommitBatch::transfer(
                transaction,
                BalanceWrite {
                    account: source.id().clone(),
                    expected: source.balance(),
                    new_balance: new_source_balance,
                },
                BalanceWrite {
                    account: recipient.id().clone(),
                    expected: recipient.balance(),
                    new_balance: new_recipient_balance,
                },
            );

            match self.store.commit(batch).await {
                Ok(()) => {
                    debug!(
                        %transaction_id,
                        from = %source.id(),
                        to = %recipient.id(),
                        amount = %request.amount,
                        "Transfer committed"
                    );
                    return Ok(TransferReceipt {
                        transaction_id,
                        balance: new_source_balance,
                    });
                }
                Err(StoreError::Conflict) => {
                    warn!(attempt, from = %source.id(), "Transfer commit contended, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(TransferError::Contention(MAX_COMMIT_ATTEMPTS))
    }

    /// Register a payment key owned by the caller's account. Format is
    /// validated per key kind before the registry uniqueness check.
    pub async fn register_key(
        &self,
        caller: &Caller,
        key: &str,
        kind: KeyKind,
    ) -> Result<PaymentKey, TransferError> {
        match self.store.get(&caller.account_id).await {
            Ok(_) => {}
            Err(StoreError::NotFound) => {
                return Err(TransferError::AccountNotFound(caller.account_id.clone()));
            }
            Err(e) => return Err(e.into()),
        }

        let row = PaymentKey::new(key, kind, caller.account_id.clone())
            .map_err(|_| TransferError::InvalidKey)?;

        match self.registry.register(row.clone()).await {
            Ok(()) => Ok(row),
            Err(RegistryError::Conflict) => Err(TransferError::KeyAlreadyRegistered),
            Err(e) => Err(TransferError::Registry(e)),
        }
    }

    /// Deactivate one of the caller's keys. The row stays in the registry
    /// so the string remains visible to `key_exists` until reclaimed.
    pub async fn deactivate_key(
        &self,
        caller: &Caller,
        key_id: Uuid,
    ) -> Result<(), TransferError> {
        match self.registry.deactivate(&caller.account_id, key_id).await {
            Ok(()) => Ok(()),
            Err(RegistryError::NotFound) | Err(RegistryError::Inactive) => {
                Err(TransferError::KeyNotFound(key_id.to_string()))
            }
            Err(e) => Err(TransferError::Registry(e)),
        }
    }

    /// The caller's registered keys (derived registry projection).
    pub async fn keys(&self, caller: &Caller) -> Result<Vec<PaymentKey>, TransferError> {
        Ok(self.registry.keys_for(&caller.account_id).await?)
    }
}

fn debit_error(caller: &Caller, err: DomainError) -> TransferError {
    match err {
        DomainError::InvalidAmount => TransferError::InvalidAmount,
        DomainError::InsufficientFunds => TransferError::InsufficientFunds,
        DomainError::AccountInactive => TransferError::AccountBlocked(caller.account_id.clone()),
        DomainError::Overflow => TransferError::Overflow,
        DomainError::InvalidKey => TransferError::InvalidKey,
    }
}

fn credit_error(err: DomainError) -> TransferError {
    match err {
        DomainError::InvalidAmount => TransferError::InvalidAmount,
        DomainError::AccountInactive => TransferError::RecipientInactive,
        DomainError::Overflow => TransferError::Overflow,
        DomainError::InsufficientFunds | DomainError::InvalidKey => {
            TransferError::Store(StoreError::Unavailable("unexpected credit failure".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Account, AccountId, AccountStatus, Role};
    use crate::storage::{MemoryKeyRegistry, MemoryStore};

    async fn seeded_engine() -> TransferEngine<MemoryStore, MemoryKeyRegistry> {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(MemoryKeyRegistry::new());

        store
            .insert(
                Account::new(AccountId::new("a"), "Alice", "0001-1", Role::Customer)
                    .with_balance(Amount::from_decimal_str("100.00").unwrap()),
            )
            .await
            .unwrap();
        store
            .insert(Account::new(
                AccountId::new("b"),
                "Bruna",
                "0002-2",
                Role::Customer,
            ))
            .await
            .unwrap();
        registry
            .register(
                PaymentKey::new("b@x.com", KeyKind::Email, AccountId::new("b")).unwrap(),
            )
            .await
            .unwrap();

        TransferEngine::new(store, registry)
    }

    fn amount(s: &str) -> Amount {
        Amount::from_decimal_str(s).unwrap()
    }

    #[tokio::test]
    async fn transfer_moves_exact_amount_and_writes_one_transaction() {
        let engine = seeded_engine().await;
        let caller = Caller::customer("a");

        let receipt = engine
            .transfer(
                &caller,
                TransferRequest::new("b@x.com", amount("40.00")).with_description("rent"),
            )
            .await
            .unwrap();

        assert_eq!(receipt.balance, amount("60.00"));

        let a = engine.store.get(&AccountId::new("a")).await.unwrap();
        let b = engine.store.get(&AccountId::new("b")).await.unwrap();
        assert_eq!(a.balance(), amount("60.00"));
        assert_eq!(b.balance(), amount("40.00"));

        let tx = engine
            .store
            .transaction(receipt.transaction_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.kind, TransactionKind::PeerTransfer);
        assert_eq!(tx.amount, amount("40.00"));
        assert_eq!(tx.from, AccountId::new("a"));
        assert_eq!(tx.to, AccountId::new("b"));
        assert_eq!(tx.description, "rent");

        // Exactly one canonical record and one view per participant.
        assert_eq!(
            engine.store.transactions_for(&AccountId::new("a")).await.unwrap().len(),
            1
        );
        assert_eq!(engine.store.views_for(&AccountId::new("a")).await.unwrap().len(), 1);
        assert_eq!(engine.store.views_for(&AccountId::new("b")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn transfer_of_full_balance_is_allowed() {
        let engine = seeded_engine().await;
        let receipt = engine
            .transfer(
                &Caller::customer("a"),
                TransferRequest::new("b@x.com", amount("100.00")),
            )
            .await
            .unwrap();
        assert_eq!(receipt.balance, Amount::zero());
    }

    #[tokio::test]
    async fn insufficient_funds_leaves_ledger_untouched() {
        let engine = seeded_engine().await;
        let err = engine
            .transfer(
                &Caller::customer("a"),
                TransferRequest::new("b@x.com", amount("100.01")),
            )
            .await
            .unwrap_err();

        assert_eq!(err, TransferError::InsufficientFunds);
        let a = engine.store.get(&AccountId::new("a")).await.unwrap();
        assert_eq!(a.balance(), amount("100.00"));
        assert!(
            engine
                .store
                .transactions_for(&AccountId::new("a"))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn non_positive_amount_rejected_first() {
        let engine = seeded_engine().await;
        let err = engine
            .transfer(
                &Caller::customer("a"),
                TransferRequest::new("no-such-key", Amount::zero()),
            )
            .await
            .unwrap_err();
        // Amount check short-circuits before key resolution.
        assert_eq!(err, TransferError::InvalidAmount);
    }

    #[tokio::test]
    async fn unknown_key_is_key_not_found() {
        let engine = seeded_engine().await;
        let err = engine
            .transfer(
                &Caller::customer("a"),
                TransferRequest::new("ghost@x.com", amount("1.00")),
            )
            .await
            .unwrap_err();
        assert_eq!(err, TransferError::KeyNotFound("ghost@x.com".to_string()));
    }

    #[tokio::test]
    async fn transfer_to_own_key_rejected() {
        let engine = seeded_engine().await;
        engine
            .register_key(&Caller::customer("a"), "a@x.com", KeyKind::Email)
            .await
            .unwrap();

        let err = engine
            .transfer(
                &Caller::customer("a"),
                TransferRequest::new("a@x.com", amount("10.00")),
            )
            .await
            .unwrap_err();
        assert_eq!(err, TransferError::SelfTransferNotAllowed);

        let a = engine.store.get(&AccountId::new("a")).await.unwrap();
        assert_eq!(a.balance(), amount("100.00"));
    }

    #[tokio::test]
    async fn blocked_source_cannot_transfer() {
        let engine = seeded_engine().await;
        engine
            .store
            .set_status(&AccountId::new("a"), AccountStatus::Blocked)
            .await
            .unwrap();

        let err = engine
            .transfer(
                &Caller::customer("a"),
                TransferRequest::new("b@x.com", amount("1.00")),
            )
            .await
            .unwrap_err();
        assert_eq!(err, TransferError::AccountBlocked(AccountId::new("a")));
    }

    #[tokio::test]
    async fn inactive_recipient_rejected() {
        let engine = seeded_engine().await;
        engine
            .store
            .set_status(&AccountId::new("b"), AccountStatus::Suspended)
            .await
            .unwrap();

        let err = engine
            .transfer(
                &Caller::customer("a"),
                TransferRequest::new("b@x.com", amount("1.00")),
            )
            .await
            .unwrap_err();
        assert_eq!(err, TransferError::RecipientInactive);
    }

    #[tokio::test]
    async fn deactivated_key_is_unusable() {
        let engine = seeded_engine().await;
        let keys = engine.keys(&Caller::customer("b")).await.unwrap();
        engine
            .deactivate_key(&Caller::customer("b"), keys[0].id)
            .await
            .unwrap();

        let err = engine
            .transfer(
                &Caller::customer("a"),
                TransferRequest::new("b@x.com", amount("1.00")),
            )
            .await
            .unwrap_err();
        assert_eq!(err, TransferError::KeyNotFound("b@x.com".to_string()));
    }

    #[tokio::test]
    async fn replayed_token_returns_prior_receipt() {
        let engine = seeded_engine().await;
        let caller = Caller::customer("a");
        let request = TransferRequest::new("b@x.com", amount("40.00")).with_token("tok-1");

        let first = engine.transfer(&caller, request.clone()).await.unwrap();
        let second = engine.transfer(&caller, request).await.unwrap();

        assert_eq!(first, second);

        // Funds moved exactly once.
        let a = engine.store.get(&AccountId::new("a")).await.unwrap();
        let b = engine.store.get(&AccountId::new("b")).await.unwrap();
        assert_eq!(a.balance(), amount("60.00"));
        assert_eq!(b.balance(), amount("40.00"));
        assert_eq!(
            engine.store.transactions_for(&AccountId::new("a")).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn missing_description_defaults_to_recipient_name() {
        let engine = seeded_engine().await;
        let receipt = engine
            .transfer(
                &Caller::customer("a"),
                TransferRequest::new("b@x.com", amount("5.00")),
            )
            .await
            .unwrap();

        let tx = engine
            .store
            .transaction(receipt.transaction_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.description, "Transfer to Bruna");
    }

    #[tokio::test]
    async fn register_key_validates_format_and_uniqueness() {
        let engine = seeded_engine().await;
        let caller = Caller::customer("a");

        assert_eq!(
            engine
                .register_key(&caller, "not-an-email", KeyKind::Email)
                .await
                .unwrap_err(),
            TransferError::InvalidKey
        );
        assert_eq!(
            engine
                .register_key(&caller, "b@x.com", KeyKind::Email)
                .await
                .unwrap_err(),
            TransferError::KeyAlreadyRegistered
        );

        let key = engine
            .register_key(&caller, "a@x.com", KeyKind::Email)
            .await
            .unwrap();
        assert_eq!(key.owner, AccountId::new("a"));
    }

    struct UnavailableRegistry;

    #[async_trait::async_trait]
    impl crate::storage::KeyRegistry for UnavailableRegistry {
        async fn resolve(&self, _key: &str) -> Result<PaymentKey, RegistryError> {
            Err(RegistryError::Unavailable("registry down".to_string()))
        }

        async fn key_exists(&self, _key: &str) -> Result<bool, RegistryError> {
            Err(RegistryError::Unavailable("registry down".to_string()))
        }

        async fn register(&self, _key: PaymentKey) -> Result<(), RegistryError> {
            Err(RegistryError::Unavailable("registry down".to_string()))
        }

        async fn deactivate(
            &self,
            _owner: &AccountId,
            _key_id: Uuid,
        ) -> Result<(), RegistryError> {
            Err(RegistryError::Unavailable("registry down".to_string()))
        }

        async fn keys_for(&self, _owner: &AccountId) -> Result<Vec<PaymentKey>, RegistryError> {
            Err(RegistryError::Unavailable("registry down".to_string()))
        }
    }

    async fn engine_with_broken_registry() -> TransferEngine<MemoryStore, UnavailableRegistry> {
        let store = Arc::new(MemoryStore::new());
        store
            .insert(
                Account::new(AccountId::new("a"), "Alice", "0001-1", Role::Customer)
                    .with_balance(Amount::from_decimal_str("100.00").unwrap()),
            )
            .await
            .unwrap();
        TransferEngine::new(store, Arc::new(UnavailableRegistry))
    }

    #[tokio::test]
    async fn registry_failure_surfaces_instead_of_empty_key_list() {
        let engine = engine_with_broken_registry().await;
        let err = engine.keys(&Caller::customer("a")).await.unwrap_err();
        assert_eq!(
            err,
            TransferError::Registry(RegistryError::Unavailable("registry down".to_string()))
        );
    }

    #[tokio::test]
    async fn registry_failure_during_transfer_is_an_error() {
        let engine = engine_with_broken_registry().await;
        let err = engine
            .transfer(
                &Caller::customer("a"),
                TransferRequest::new("b@x.com", amount("1.00")),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransferError::Registry(RegistryError::Unavailable("registry down".to_string()))
        );

        let a = engine.store.get(&AccountId::new("a")).await.unwrap();
        assert_eq!(a.balance(), amount("100.00"));
    }

    #[tokio::test]
    async fn unknown_caller_cannot_register_keys() {
        let engine = seeded_engine().await;
        let err = engine
            .register_key(&Caller::customer("ghost"), "g@x.com", KeyKind::Email)
            .await
            .unwrap_err();
        assert_eq!(err, TransferError::AccountNotFound(AccountId::new("ghost")));
    }
}
