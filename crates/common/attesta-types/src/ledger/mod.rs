//! The external append-only ledger, seen from both sides of the protocol:
//! the write path used by a party's signing agent and the read path used
//! by the verification engine and the reconciliation sweep.
//!
//! The ledger's own consensus is opaque here; `submit` returns only after
//! the transaction has settled.

use crate::content_ref::ContentRef;
use crate::display_id::DisplayId;
use crate::party::SettlementAddress;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ed25519_dalek::Signature;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod memory;

pub use memory::MemoryLedger;

/// Errors raised by ledger interactions
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Ledger unreachable: {0}")]
    Unavailable(String),

    #[error("Submission rejected by the ledger program: {0}")]
    Rejected(String),

    #[error("Submission signature does not verify against the submitter address")]
    InvalidSignature,

    #[error("An entry already exists for {0}")]
    DuplicateKey(DisplayId),

    #[error("Canonical encoding failed: {0}")]
    Encoding(String),
}

/// The ledger program's stored copy of an issued affidavit, keyed by its
/// display identifier. This is the minimal descriptive set compared
/// against the durable record during verification.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LedgerEntry {
    pub display_id: DisplayId,
    pub title: String,
    pub category: String,
    pub metadata_ref: ContentRef,
    pub issuer: SettlementAddress,
    pub parties: Vec<SettlementAddress>,
    pub witnesses: Vec<String>,
    pub anchored_at: DateTime<Utc>,
}

/// Settlement proof handed back once a submission lands in a block.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LedgerReceipt {
    pub transaction_hash: String,
    pub block_reference: u64,
}

/// An entry as read back from the ledger, with the settlement proof the
/// ledger recorded for it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LedgerRecord {
    pub entry: LedgerEntry,
    pub receipt: LedgerReceipt,
}

/// The unsigned body of an anchor transaction.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AnchorSubmission {
    pub entry: LedgerEntry,
    pub submitter: SettlementAddress,
}

impl AnchorSubmission {
    /// Canonical DAG-CBOR bytes; this is what gets signed and hashed.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, LedgerError> {
        serde_ipld_dagcbor::to_vec(self).map_err(|e| LedgerError::Encoding(e.to_string()))
    }
}

/// An anchor transaction signed by the submitting party's key.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SignedAnchorSubmission {
    pub submission: AnchorSubmission,
    pub signature: Signature,
}

/// Write path: sign-and-submit, wait for settlement.
#[async_trait]
pub trait LedgerWriter: Send + Sync {
    async fn submit(&self, signed: SignedAnchorSubmission) -> Result<LedgerReceipt, LedgerError>;
}

/// Read path: query the ledger's stored copy by display identifier.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    async fn fetch(&self, display_id: &DisplayId) -> Result<Option<LedgerRecord>, LedgerError>;
}
