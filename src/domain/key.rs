use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::AccountId;
use super::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyKind {
    TaxIdIndividual,
    TaxIdBusiness,
    Email,
    Phone,
    Random,
}

/// An alias (tax id, email, phone or random token) resolving to exactly one
/// account for receiving transfers. At most one active key row exists per
/// key string across the whole registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentKey {
    pub id: Uuid,
    pub key: String,
    pub kind: KeyKind,
    pub owner: AccountId,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl PaymentKey {
    /// Build a new active key after validating the format for its kind.
    pub fn new(key: impl Into<String>, kind: KeyKind, owner: AccountId) -> Result<Self, DomainError> {
        let key = key.into();
        validate_key(&key, kind)?;
        Ok(Self {
            id: Uuid::new_v4(),
            key,
            kind,
            owner,
            active: true,
            created_at: Utc::now(),
        })
    }
}

/// Format validation per key kind.
pub fn validate_key(key: &str, kind: KeyKind) -> Result<(), DomainError> {
    let ok = match kind {
        KeyKind::Email => is_valid_email(key),
        KeyKind::Phone => {
            let digits = key.chars().filter(char::is_ascii_digit).count();
            (10..=13).contains(&digits)
        }
        KeyKind::TaxIdIndividual => is_all_digits(key, 11),
        KeyKind::TaxIdBusiness => is_all_digits(key, 14),
        KeyKind::Random => (10..=36).contains(&key.len()),
    };

    if ok { Ok(()) } else { Err(DomainError::InvalidKey) }
}

fn is_valid_email(key: &str) -> bool {
    let Some((local, domain)) = key.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !key.chars().any(char::is_whitespace)
}

fn is_all_digits(key: &str, len: usize) -> bool {
    key.len() == len && key.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_emails_accepted() {
        assert!(validate_key("b@x.com", KeyKind::Email).is_ok());
        assert!(validate_key("first.last@mail.example.org", KeyKind::Email).is_ok());
    }

    #[test]
    fn invalid_emails_rejected() {
        assert!(validate_key("not-an-email", KeyKind::Email).is_err());
        assert!(validate_key("@x.com", KeyKind::Email).is_err());
        assert!(validate_key("a@nodot", KeyKind::Email).is_err());
        assert!(validate_key("a b@x.com", KeyKind::Email).is_err());
        assert!(validate_key("a@.com.", KeyKind::Email).is_err());
    }

    #[test]
    fn phone_requires_10_to_13_digits() {
        assert!(validate_key("11987654321", KeyKind::Phone).is_ok());
        assert!(validate_key("+55 11 98765-4321", KeyKind::Phone).is_ok());
        assert!(validate_key("12345", KeyKind::Phone).is_err());
        assert!(validate_key("12345678901234567", KeyKind::Phone).is_err());
    }

    #[test]
    fn individual_tax_id_is_11_digits() {
        assert!(validate_key("12345678901", KeyKind::TaxIdIndividual).is_ok());
        assert!(validate_key("1234567890", KeyKind::TaxIdIndividual).is_err());
        assert!(validate_key("1234567890a", KeyKind::TaxIdIndividual).is_err());
    }

    #[test]
    fn business_tax_id_is_14_digits() {
        assert!(validate_key("12345678000199", KeyKind::TaxIdBusiness).is_ok());
        assert!(validate_key("12345678901", KeyKind::TaxIdBusiness).is_err());
    }

    #[test]
    fn random_key_length_bounds() {
        assert!(validate_key("abcdef1234", KeyKind::Random).is_ok());
        assert!(validate_key("short", KeyKind::Random).is_err());
        assert!(validate_key(&"x".repeat(37), KeyKind::Random).is_err());
    }

    #[test]
    fn new_key_is_active_and_validated() {
        let key = PaymentKey::new("b@x.com", KeyKind::Email, AccountId::new("b")).unwrap();
        assert!(key.active);
        assert_eq!(key.owner, AccountId::new("b"));
        assert_eq!(key.kind, KeyKind::Email);

        let err = PaymentKey::new("bad", KeyKind::Email, AccountId::new("b"));
        assert_eq!(err.unwrap_err(), DomainError::InvalidKey);
    }
}
