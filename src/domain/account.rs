use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::amount::Amount;
use super::transaction::FeeRecord;

/// Stable account identifier, assigned by the provisioning flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Operator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Blocked,
    Suspended,
}

/// Account record with private fields enforcing invariants.
///
/// The balance is mutated only through the engine commit paths; `balance`
/// never goes negative after a committed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    display_name: String,
    account_number: String,
    balance: Amount,
    role: Role,
    status: AccountStatus,
    fee_history: Vec<FeeRecord>,
    updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new active account with zero balance.
    pub fn new(
        id: AccountId,
        display_name: impl Into<String>,
        account_number: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            account_number: account_number.into(),
            balance: Amount::zero(),
            role,
            status: AccountStatus::Active,
            fee_history: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &AccountId {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn account_number(&self) -> &str {
        &self.account_number
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn status(&self) -> AccountStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    pub fn is_operator(&self) -> bool {
        self.role == Role::Operator
    }

    pub fn fee_history(&self) -> &[FeeRecord] {
        &self.fee_history
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // Internal mutation methods for use by the storage commit path
    pub(crate) fn set_balance(&mut self, balance: Amount) {
        self.balance = balance;
        self.updated_at = Utc::now();
    }

    pub(crate) fn set_status(&mut self, status: AccountStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub(crate) fn push_fee(&mut self, fee: FeeRecord) {
        self.fee_history.push(fee);
    }

    /// Test and seed helper for constructing accounts with an opening balance.
    pub fn with_balance(mut self, balance: Amount) -> Self {
        self.balance = balance;
        self
    }
}
