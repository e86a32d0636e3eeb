use super::{
    LedgerEntry, LedgerError, LedgerReader, LedgerReceipt, LedgerRecord, LedgerWriter,
    SignedAnchorSubmission,
};
use crate::display_id::DisplayId;
use async_trait::async_trait;
use ed25519_dalek::Verifier;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<String, LedgerRecord>,
    next_block: u64,
}

/// An in-process ledger with the same observable behavior as the real
/// anchor program: signature-checked submissions, monotonically increasing
/// block positions, lookup by display identifier.
///
/// Resubmitting byte-identical transactions returns the original receipt,
/// so a flaky signing agent can retry safely.
#[derive(Debug, Default, Clone)]
pub struct MemoryLedger {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutate a stored entry in place. Returns false when no entry exists
    /// for the identifier. Exists so tamper-detection paths can be
    /// exercised against a ledger whose copy has drifted.
    pub async fn tamper_with<F>(&self, display_id: &DisplayId, mutate: F) -> bool
    where
        F: FnOnce(&mut LedgerEntry),
    {
        let mut inner = self.inner.write().await;
        match inner.records.get_mut(&display_id.to_string()) {
            Some(record) => {
                mutate(&mut record.entry);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl LedgerWriter for MemoryLedger {
    async fn submit(&self, signed: SignedAnchorSubmission) -> Result<LedgerReceipt, LedgerError> {
        let bytes = signed.submission.canonical_bytes()?;

        let verifying_key = signed
            .submission
            .submitter
            .to_verifying_key()
            .map_err(|_| LedgerError::InvalidSignature)?;
        verifying_key
            .verify(&bytes, &signed.signature)
            .map_err(|_| LedgerError::InvalidSignature)?;

        let transaction_hash = format!("0x{}", hex::encode(Sha256::digest(&bytes)));
        let key = signed.submission.entry.display_id.to_string();

        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.records.get(&key) {
            // Byte-identical resubmission settles to the original receipt
            if existing.receipt.transaction_hash == transaction_hash {
                return Ok(existing.receipt.clone());
            }
            return Err(LedgerError::DuplicateKey(
                signed.submission.entry.display_id.clone(),
            ));
        }

        inner.next_block += 1;
        let receipt = LedgerReceipt {
            transaction_hash,
            block_reference: inner.next_block,
        };
        inner.records.insert(
            key,
            LedgerRecord {
                entry: signed.submission.entry,
                receipt: receipt.clone(),
            },
        );
        Ok(receipt)
    }
}

#[async_trait]
impl LedgerReader for MemoryLedger {
    async fn fetch(&self, display_id: &DisplayId) -> Result<Option<LedgerRecord>, LedgerError> {
        let inner = self.inner.read().await;
        Ok(inner.records.get(&display_id.to_string()).cloned())
    }
}
