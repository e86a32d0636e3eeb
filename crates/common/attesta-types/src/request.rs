use crate::content::AttachmentId;
use crate::display_id::DisplayId;
use crate::party::{Acceptance, PartyId, PartyRole, PartySlot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// Status of an affidavit request. Terminal once it leaves `Pending`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RequestStatus {
    /// Collecting party responses
    Pending,

    /// Every party accepted; an affidavit has been issued for it
    Accepted,

    /// A party rejected it; no affidavit will ever be issued
    Rejected,
}

/// Errors raised by invalid request state transitions
#[derive(Error, Debug)]
pub enum TransitionError {
    #[error("Cannot transition request from {from:?} to {to:?}")]
    Invalid { from: RequestStatus, to: RequestStatus },
}

/// The caller-supplied fields for a new affidavit request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDraft {
    pub title: String,
    pub category: String,
    pub description: String,
    pub declaration: String,
    pub details: HashMap<String, serde_json::Value>,
    pub attachments: Vec<AttachmentId>,
    pub issuer: PartyId,
    pub seller: Option<PartyId>,
    pub buyer: Option<PartyId>,
    pub witnesses: Vec<PartyId>,
    pub created_by: PartyId,
}

/// A request to issue an affidavit, jointly authorized by its parties.
///
/// Mutated only through the acceptance protocol; never deleted, only
/// terminally transitioned.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AffidavitRequest {
    pub id: Uuid,
    pub display_id: DisplayId,
    pub title: String,
    pub category: String,
    pub description: String,
    pub declaration: String,
    /// Category-specific key/value details
    pub details: HashMap<String, serde_json::Value>,
    /// References into the external upload store
    pub attachments: Vec<AttachmentId>,
    pub issuer: PartySlot,
    pub seller: Option<PartySlot>,
    pub buyer: Option<PartySlot>,
    pub witnesses: Vec<PartySlot>,
    pub status: RequestStatus,
    pub created_by: PartyId,
    pub created_at: DateTime<Utc>,
}

impl AffidavitRequest {
    /// Build a fresh `Pending` request from a draft and an allocated
    /// display identifier.
    pub fn from_draft(draft: RequestDraft, display_id: DisplayId, at: DateTime<Utc>) -> Self {
        AffidavitRequest {
            id: Uuid::new_v4(),
            display_id,
            title: draft.title,
            category: draft.category,
            description: draft.description,
            declaration: draft.declaration,
            details: draft.details,
            attachments: draft.attachments,
            issuer: PartySlot::new(draft.issuer),
            seller: draft.seller.map(PartySlot::new),
            buyer: draft.buyer.map(PartySlot::new),
            witnesses: draft.witnesses.into_iter().map(PartySlot::new).collect(),
            status: RequestStatus::Pending,
            created_by: draft.created_by,
            created_at: at,
        }
    }

    /// All present slots other than the issuer's, in seller/buyer/witness
    /// order.
    pub fn non_issuer_slots(&self) -> impl Iterator<Item = &PartySlot> {
        self.seller
            .iter()
            .chain(self.buyer.iter())
            .chain(self.witnesses.iter())
    }

    /// True when every present non-issuer party has accepted. Vacuously
    /// true for a request with no seller, buyer, or witnesses.
    pub fn non_issuer_unanimous(&self) -> bool {
        self.non_issuer_slots()
            .all(|slot| slot.acceptance == Acceptance::Accepted)
    }

    /// Whether the identity holds any seat on this request.
    pub fn is_party(&self, party: &PartyId) -> bool {
        self.issuer.party == *party
            || self
                .non_issuer_slots()
                .any(|slot| slot.party == *party)
    }

    /// Every (party, role) pair on the request, issuer first.
    pub fn party_roles(&self) -> Vec<(PartyId, PartyRole)> {
        let mut pairs = vec![(self.issuer.party.clone(), PartyRole::Issuer)];
        if let Some(seller) = &self.seller {
            pairs.push((seller.party.clone(), PartyRole::Seller));
        }
        if let Some(buyer) = &self.buyer {
            pairs.push((buyer.party.clone(), PartyRole::Buyer));
        }
        for witness in &self.witnesses {
            pairs.push((witness.party.clone(), PartyRole::Witness));
        }
        pairs
    }

    /// Locate the slot the identity occupies under its claimed role.
    pub fn slot_mut(&mut self, party: &PartyId, role: PartyRole) -> Option<&mut PartySlot> {
        match role {
            PartyRole::Issuer if self.issuer.party == *party => Some(&mut self.issuer),
            PartyRole::Seller => self
                .seller
                .as_mut()
                .filter(|slot| slot.party == *party),
            PartyRole::Buyer => self
                .buyer
                .as_mut()
                .filter(|slot| slot.party == *party),
            PartyRole::Witness => self
                .witnesses
                .iter_mut()
                .find(|slot| slot.party == *party),
            _ => None,
        }
    }

    /// Apply a status transition. A terminal status never moves again.
    pub fn transition(&mut self, to: RequestStatus) -> Result<(), TransitionError> {
        use RequestStatus::*;
        match (self.status, to) {
            (Pending, Accepted) | (Pending, Rejected) => {
                self.status = to;
                Ok(())
            }
            (from, to) => Err(TransitionError::Invalid { from, to }),
        }
    }
}
