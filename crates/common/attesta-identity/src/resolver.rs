use crate::profile::{ProfileError, ProfileStore};
use attesta_types::party::{PartyId, SettlementAddress};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while resolving a party's settlement account
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The party exists but has not linked a ledger account, or is
    /// entirely unknown to the profile store. Either way issuance cannot
    /// reference it on the ledger.
    #[error("Party {0} has no settlement address")]
    MissingSettlementAddress(PartyId),

    #[error("Profile lookup failed: {0}")]
    Profile(#[from] ProfileError),
}

/// A party with its externally-addressable account resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParty {
    pub party: PartyId,
    pub display_name: String,
    pub address: SettlementAddress,
}

/// Maps internal party identities to the settlement addresses the ledger
/// knows them by.
#[derive(Clone)]
pub struct IdentityResolver {
    profiles: Arc<dyn ProfileStore>,
}

impl IdentityResolver {
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        IdentityResolver { profiles }
    }

    pub async fn resolve(&self, party: &PartyId) -> Result<ResolvedParty, ResolveError> {
        let profile = self
            .profiles
            .get(party)
            .await?
            .ok_or_else(|| ResolveError::MissingSettlementAddress(party.clone()))?;
        let address = profile
            .settlement_address
            .ok_or_else(|| ResolveError::MissingSettlementAddress(party.clone()))?;
        Ok(ResolvedParty {
            party: profile.party,
            display_name: profile.display_name,
            address,
        })
    }
}
