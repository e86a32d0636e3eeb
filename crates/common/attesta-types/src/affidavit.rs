use crate::content_ref::ContentRef;
use crate::display_id::DisplayId;
use crate::party::{PartyId, PartyRole, SettlementAddress};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Post-issuance lifecycle of an affidavit.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AffidavitStatus {
    Active,
    Revoked,
}

/// A party as it stood at issuance time. Later profile edits never alter
/// an issued affidavit.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PartySnapshot {
    pub party: PartyId,
    pub name: String,
    pub address: SettlementAddress,
    pub role: PartyRole,
}

/// The issued legal document. Created once at commit phase 1 with empty
/// ledger fields; patched exactly once more at phase 2.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Affidavit {
    pub id: Uuid,
    pub display_id: DisplayId,
    /// Back-reference to the request this affidavit was issued for
    pub request_id: Uuid,
    pub title: String,
    pub category: String,
    pub description: String,
    pub declaration: String,
    pub parties: Vec<PartySnapshot>,
    /// Content reference of the packaged metadata blob
    pub metadata_ref: ContentRef,
    pub attachment_refs: Vec<ContentRef>,
    /// Ledger settlement identifier; empty string until phase 2
    pub transaction_hash: String,
    /// Numeric position in the ledger; zero until phase 2
    pub block_reference: u64,
    pub is_verified_on_blockchain: bool,
    pub last_verified_at: Option<DateTime<Utc>>,
    pub status: AffidavitStatus,
    pub issued_at: DateTime<Utc>,
}

impl Affidavit {
    /// Whether phase 2 has recorded the ledger transaction.
    pub fn is_anchored(&self) -> bool {
        !self.transaction_hash.is_empty()
    }

    pub fn issuer(&self) -> Option<&PartySnapshot> {
        self.parties
            .iter()
            .find(|snapshot| snapshot.role == PartyRole::Issuer)
    }

    pub fn witnesses(&self) -> impl Iterator<Item = &PartySnapshot> {
        self.parties
            .iter()
            .filter(|snapshot| snapshot.role == PartyRole::Witness)
    }
}

/// Everything the issuer's signing agent needs to submit the ledger
/// transaction after phase 1. The server's responsibility ends once this
/// payload is returned.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct IssuancePackage {
    pub affidavit_id: Uuid,
    pub display_id: DisplayId,
    pub title: String,
    pub category: String,
    pub metadata_ref: ContentRef,
    pub issuer_address: SettlementAddress,
    /// Resolved settlement addresses of every party, issuer included
    pub party_addresses: Vec<SettlementAddress>,
    pub witness_ids: Vec<PartyId>,
}
