use crate::domain::{AccountId, Role};

/// Identity of the request issuer, supplied by the session collaborator.
///
/// Always passed explicitly into engine calls; the ledger core trusts it
/// and performs no authentication of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub account_id: AccountId,
    pub role: Role,
}

impl Caller {
    pub fn new(account_id: AccountId, role: Role) -> Self {
        Self { account_id, role }
    }

    pub fn customer(account_id: impl Into<String>) -> Self {
        Self::new(AccountId::new(account_id), Role::Customer)
    }

    pub fn operator(account_id: impl Into<String>) -> Self {
        Self::new(AccountId::new(account_id), Role::Operator)
    }

    pub fn is_operator(&self) -> bool {
        self.role == Role::Operator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_role() {
        assert!(!Caller::customer("u-1").is_operator());
        assert!(Caller::operator("op-1").is_operator());
        assert_eq!(
            Caller::customer("u-1").account_id,
            AccountId::new("u-1")
        );
    }
}
