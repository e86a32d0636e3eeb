use crate::party::PartyId;
use crate::store::StoreError;
use thiserror::Error;

/// The protocol-level error taxonomy surfaced by the consensus and
/// issuance operations.
///
/// Verification mismatches are deliberately NOT errors; they come back as
/// a normal result so callers can surface them as tamper warnings.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Caller is not permitted to act here: {0}")]
    Forbidden(String),

    #[error("Conflicting operation: {0}")]
    Conflict(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Party {0} has no resolvable settlement address")]
    MissingSettlementAddress(PartyId),

    #[error("Content store unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("Storage backend error: {0}")]
    Store(#[from] StoreError),
}
