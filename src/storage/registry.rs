use async_trait::async_trait;
use dashmap::{DashMap, Entry};
use tracing::debug;
use uuid::Uuid;

use super::error::RegistryError;
use super::traits::KeyRegistry;
use crate::domain::{AccountId, PaymentKey};

/// In-memory key registry keyed by the key string itself.
///
/// Registration goes through the map's entry API, so the uniqueness check
/// and the insert are one atomic step; two concurrent registrations of the
/// same key string cannot both succeed.
pub struct MemoryKeyRegistry {
    keys: DashMap<String, PaymentKey>,
}

impl MemoryKeyRegistry {
    pub fn new() -> Self {
        Self {
            keys: DashMap::new(),
        }
    }
}

impl Default for MemoryKeyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyRegistry for MemoryKeyRegistry {
    async fn resolve(&self, key: &str) -> Result<PaymentKey, RegistryError> {
        let row = self.keys.get(key).ok_or(RegistryError::NotFound)?;
        if !row.active {
            return Err(RegistryError::Inactive);
        }
        Ok(row.clone())
    }

    async fn key_exists(&self, key: &str) -> Result<bool, RegistryError> {
        Ok(self.keys.contains_key(key))
    }

    async fn register(&self, key: PaymentKey) -> Result<(), RegistryError> {
        match self.keys.entry(key.key.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().active {
                    return Err(RegistryError::Conflict);
                }
                // A deactivated key string may be claimed again.
                entry.insert(key);
                Ok(())
            }
            Entry::Vacant(entry) => {
                debug!(key = %key.key, owner = %key.owner, "Registered payment key");
                entry.insert(key);
                Ok(())
            }
        }
    }

    async fn deactivate(&self, owner: &AccountId, key_id: Uuid) -> Result<(), RegistryError> {
        for mut row in self.keys.iter_mut() {
            if row.id == key_id && row.owner == *owner {
                row.active = false;
                return Ok(());
            }
        }
        Err(RegistryError::NotFound)
    }

    async fn keys_for(&self, owner: &AccountId) -> Result<Vec<PaymentKey>, RegistryError> {
        Ok(self
            .keys
            .iter()
            .filter(|row| row.owner == *owner)
            .map(|row| row.clone())
            .collect())
    }
}
