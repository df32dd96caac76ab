use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::AccountId;
use super::amount::Amount;

/// Globally unique transaction identifier, generated at commit time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionKind {
    PeerTransfer,
    OperatorTransfer,
    Fee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Completed,
    Failed,
}

/// Canonical, immutable ledger record. Exactly one per committed transfer;
/// never updated or deleted once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub kind: TransactionKind,
    pub from: AccountId,
    pub to: AccountId,
    /// Positive magnitude; the direction lives in `from`/`to`.
    pub amount: Amount,
    pub description: String,
    pub status: TransactionStatus,
    /// Caller-supplied token used to collapse duplicate retries.
    pub idempotency_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Which side of a transaction an account is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Per-account projection of a transaction, written to both participants at
/// commit. Shares the canonical transaction id so readers can deduplicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionView {
    pub transaction_id: TransactionId,
    pub kind: TransactionKind,
    pub counterparty: AccountId,
    pub direction: Direction,
    pub amount: Amount,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl TransactionView {
    /// Build the sender-side (debit) view of a transaction.
    pub fn outbound(tx: &Transaction) -> Self {
        Self {
            transaction_id: tx.id,
            kind: tx.kind,
            counterparty: tx.to.clone(),
            direction: Direction::Outbound,
            amount: tx.amount,
            description: tx.description.clone(),
            created_at: tx.created_at,
        }
    }

    /// Build the recipient-side (credit) view of a transaction.
    pub fn inbound(tx: &Transaction) -> Self {
        Self {
            transaction_id: tx.id,
            kind: tx.kind,
            counterparty: tx.from.clone(),
            direction: Direction::Inbound,
            amount: tx.amount,
            description: tx.description.clone(),
            created_at: tx.created_at,
        }
    }

    /// Signed amount: negative for outbound, positive for inbound.
    pub fn signed_amount(&self) -> Amount {
        match self.direction {
            Direction::Inbound => self.amount,
            Direction::Outbound => Amount::zero() - self.amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeCategory {
    Fine,
    Tax,
    Membership,
}

/// Fee applied to an account, embedded in its fee history. Created only by
/// the fee engine and never mutated afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRecord {
    pub id: Uuid,
    /// Canonical fee transaction this record was written with.
    pub transaction_id: TransactionId,
    pub category: FeeCategory,
    pub description: String,
    pub amount: Amount,
    pub applied_at: DateTime<Utc>,
    pub due_at: Option<DateTime<Utc>>,
    pub paid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction() -> Transaction {
        Transaction {
            id: TransactionId::generate(),
            kind: TransactionKind::PeerTransfer,
            from: AccountId::new("a"),
            to: AccountId::new("b"),
            amount: Amount::from_cents(4_000),
            description: "rent".to_string(),
            status: TransactionStatus::Completed,
            idempotency_token: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(TransactionId::generate(), TransactionId::generate());
    }

    #[test]
    fn outbound_view_carries_negative_sign() {
        let tx = transaction();
        let view = TransactionView::outbound(&tx);

        assert_eq!(view.transaction_id, tx.id);
        assert_eq!(view.direction, Direction::Outbound);
        assert_eq!(view.counterparty, AccountId::new("b"));
        assert_eq!(view.signed_amount(), Amount::from_cents(-4_000));
    }

    #[test]
    fn inbound_view_carries_positive_sign() {
        let tx = transaction();
        let view = TransactionView::inbound(&tx);

        assert_eq!(view.direction, Direction::Inbound);
        assert_eq!(view.counterparty, AccountId::new("a"));
        assert_eq!(view.signed_amount(), Amount::from_cents(4_000));
    }

    #[test]
    fn both_views_share_the_transaction_id() {
        let tx = transaction();
        assert_eq!(
            TransactionView::outbound(&tx).transaction_id,
            TransactionView::inbound(&tx).transaction_id
        );
    }

    #[test]
    fn transaction_is_clonable_and_comparable() {
        let tx = transaction();
        assert_eq!(tx.clone(), tx);
    }
}
