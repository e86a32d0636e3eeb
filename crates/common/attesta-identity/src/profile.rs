use async_trait::async_trait;
use attesta_types::party::{PartyId, SettlementAddress};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors raised by the account-profile store
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Profile backend error: {0}")]
    Backend(String),
}

/// A party's account profile as held by the external profile store.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PartyProfile {
    pub party: PartyId,
    pub display_name: String,
    /// Absent while the party has not linked a ledger account
    pub settlement_address: Option<SettlementAddress>,
}

/// The external account-profile store. Only read-your-writes consistency
/// within one request is assumed.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, party: &PartyId) -> Result<Option<PartyProfile>, ProfileError>;

    async fn upsert(&self, profile: PartyProfile) -> Result<(), ProfileError>;
}

/// In-memory profile store for tests and local runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryProfileStore {
    profiles: Arc<RwLock<HashMap<PartyId, PartyProfile>>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, party: &PartyId) -> Result<Option<PartyProfile>, ProfileError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(party).cloned())
    }

    async fn upsert(&self, profile: PartyProfile) -> Result<(), ProfileError> {
        let mut profiles = self.profiles.write().await;
        profiles.insert(profile.party.clone(), profile);
        Ok(())
    }
}
