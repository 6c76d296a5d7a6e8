use std::sync::Arc;

use crate::models::{EnergyState, Profile};
use crate::sync::outbox::PendingWrite;
use crate::sync::remote::Identity;

use super::{KeyValueStore, StoreError};

const PROFILE_KEY: &str = "supra_profile";
const ENERGY_KEY: &str = "supra_energy_v1";
const RATED_KEY: &str = "supra_has_rated";
const SESSION_KEY: &str = "supra_session";
const OUTBOX_KEY: &str = "supra_outbox";

/// Energy state as read from storage, together with the exact raw value so a
/// follow-up write can be made conditional on nothing having changed.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergySnapshot {
    pub raw: Option<String>,
    /// `None` when absent or unparsable.
    pub state: Option<EnergyState>,
}

/// Typed access to the local key-value store, one key per entity.
pub struct LocalRepository {
    store: Arc<dyn KeyValueStore>,
}

impl LocalRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    // Profile

    /// Only text that is not JSON at all is an error; bad fields fall back to
    /// their defaults.
    pub async fn load_profile(&self) -> Result<Option<Profile>, StoreError> {
        match self.store.get(PROFILE_KEY).await? {
            Some(raw) => {
                let value: serde_json::Value = serde_json::from_str(&raw)?;
                Ok(Some(Profile::from_stored(value)))
            }
            None => Ok(None),
        }
    }

    pub async fn store_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        let raw = serde_json::to_string(profile)?;
        self.store.set(PROFILE_KEY, &raw).await
    }

    // Energy

    pub async fn energy_snapshot(&self) -> Result<EnergySnapshot, StoreError> {
        let raw = self.store.get(ENERGY_KEY).await?;
        let state = raw
            .as_deref()
            .and_then(|r| serde_json::from_str::<EnergyState>(r).ok());
        Ok(EnergySnapshot { raw, state })
    }

    pub async fn store_energy(&self, state: &EnergyState) -> Result<(), StoreError> {
        let raw = serde_json::to_string(state)?;
        self.store.set(ENERGY_KEY, &raw).await
    }

    /// Writes `next` only if the stored energy value is still `expected_raw`.
    pub async fn swap_energy(
        &self,
        expected_raw: Option<&str>,
        next: &EnergyState,
    ) -> Result<bool, StoreError> {
        let raw = serde_json::to_string(next)?;
        self.store
            .compare_and_swap(ENERGY_KEY, expected_raw, &raw)
            .await
    }

    // Feedback flag

    pub async fn mark_rated(&self) -> Result<(), StoreError> {
        self.store.set(RATED_KEY, "true").await
    }

    pub async fn has_rated(&self) -> Result<bool, StoreError> {
        Ok(self.store.get(RATED_KEY).await?.as_deref() == Some("true"))
    }

    // Session

    pub async fn load_session(&self) -> Result<Option<Identity>, StoreError> {
        match self.store.get(SESSION_KEY).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn store_session(&self, identity: &Identity) -> Result<(), StoreError> {
        let raw = serde_json::to_string(identity)?;
        self.store.set(SESSION_KEY, &raw).await
    }

    pub async fn clear_session(&self) -> Result<(), StoreError> {
        self.store.delete(SESSION_KEY).await
    }

    // Outbox

    pub async fn load_outbox(&self) -> Result<Vec<PendingWrite>, StoreError> {
        match self.store.get(OUTBOX_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn store_outbox(&self, pending: &[PendingWrite]) -> Result<(), StoreError> {
        if pending.is_empty() {
            return self.store.delete(OUTBOX_KEY).await;
        }
        let raw = serde_json::to_string(pending)?;
        self.store.set(OUTBOX_KEY, &raw).await
    }

    pub async fn push_outbox(&self, write: PendingWrite) -> Result<(), StoreError> {
        let mut pending = self.load_outbox().await?;
        pending.push(write);
        self.store_outbox(&pending).await
    }
}
