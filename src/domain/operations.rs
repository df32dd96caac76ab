use super::account::Account;
use super::amount::Amount;
use super::error::DomainError;

/// Compute the post-debit balance for an account.
///
/// Rejects non-positive amounts, inactive accounts and overdrafts. A debit
/// of exactly the full balance is allowed (resulting balance zero).
pub fn debited_balance(account: &Account, amount: Amount) -> Result<Amount, DomainError> {
    if !amount.is_positive() {
        return Err(DomainError::InvalidAmount);
    }

    if !account.is_active() {
        return Err(DomainError::AccountInactive);
    }

    if account.balance() < amount {
        return Err(DomainError::InsufficientFunds);
    }

    account
        .balance()
        .checked_sub(amount)
        .ok_or(DomainError::Overflow)
}

/// Compute the post-debit balance for a mandatory levy.
///
/// Fees ignore the account's status (a blocked account still owes its
/// fines) but are never allowed to overdraw.
pub fn levied_balance(account: &Account, amount: Amount) -> Result<Amount, DomainError> {
    if !amount.is_positive() {
        return Err(DomainError::InvalidAmount);
    }

    if account.balance() < amount {
        return Err(DomainError::InsufficientFunds);
    }

    account
        .balance()
        .checked_sub(amount)
        .ok_or(DomainError::Overflow)
}

/// Compute the post-credit balance for an account.
pub fn credited_balance(account: &Account, amount: Amount) -> Result<Amount, DomainError> {
    if !amount.is_positive() {
        return Err(DomainError::InvalidAmount);
    }

    account
        .balance()
        .checked_add(amount)
        .ok_or(DomainError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::{AccountId, AccountStatus, Role};

    fn account(balance: i64) -> Account {
        Account::new(AccountId::new("a"), "Alice", "0001-1", Role::Customer)
            .with_balance(Amount::from_cents(balance))
    }

    #[test]
    fn debit_subtracts_exactly() {
        let acc = account(10_000);
        assert_eq!(
            debited_balance(&acc, Amount::from_cents(4_000)).unwrap(),
            Amount::from_cents(6_000)
        );
    }

    #[test]
    fn debit_of_full_balance_leaves_zero() {
        let acc = account(5_000);
        assert_eq!(
            debited_balance(&acc, Amount::from_cents(5_000)).unwrap(),
            Amount::zero()
        );
    }

    #[test]
    fn debit_over_balance_is_insufficient_funds() {
        let acc = account(5_000);
        assert_eq!(
            debited_balance(&acc, Amount::from_cents(5_001)),
            Err(DomainError::InsufficientFunds)
        );
    }

    #[test]
    fn debit_rejects_non_positive_amounts() {
        let acc = account(5_000);
        assert_eq!(
            debited_balance(&acc, Amount::zero()),
            Err(DomainError::InvalidAmount)
        );
        assert_eq!(
            debited_balance(&acc, Amount::from_cents(-100)),
            Err(DomainError::InvalidAmount)
        );
    }

    #[test]
    fn debit_rejects_inactive_account() {
        let mut acc = account(5_000);
        acc.set_status(AccountStatus::Blocked);
        assert_eq!(
            debited_balance(&acc, Amount::from_cents(100)),
            Err(DomainError::AccountInactive)
        );
    }

    #[test]
    fn levy_ignores_status_but_not_balance() {
        let mut acc = account(2_000);
        acc.set_status(AccountStatus::Blocked);

        assert_eq!(
            levied_balance(&acc, Amount::from_cents(1_500)).unwrap(),
            Amount::from_cents(500)
        );
        assert_eq!(
            levied_balance(&acc, Amount::from_cents(2_001)),
            Err(DomainError::InsufficientFunds)
        );
        assert_eq!(
            levied_balance(&acc, Amount::zero()),
            Err(DomainError::InvalidAmount)
        );
    }

    #[test]
    fn credit_adds_exactly() {
        let acc = account(0);
        assert_eq!(
            credited_balance(&acc, Amount::from_cents(4_000)).unwrap(),
            Amount::from_cents(4_000)
        );
    }

    #[test]
    fn credit_rejects_non_positive_amounts() {
        let acc = account(0);
        assert_eq!(
            credited_balance(&acc, Amount::zero()),
            Err(DomainError::InvalidAmount)
        );
    }

    #[test]
    fn credit_detects_overflow() {
        let acc = account(i64::MAX);
        assert_eq!(
            credited_balance(&acc, Amount::from_cents(1)),
            Err(DomainError::Overflow)
        );
    }
}
