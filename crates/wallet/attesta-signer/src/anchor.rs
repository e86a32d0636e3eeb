use attesta_identity::party_key::PartyKey;
use attesta_types::affidavit::IssuancePackage;
use attesta_types::ledger::{
    AnchorSubmission, LedgerEntry, LedgerError, LedgerReceipt, LedgerWriter,
    SignedAnchorSubmission,
};
use attesta_types::party::SettlementAddress;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by the signing agent
#[derive(Error, Debug)]
pub enum SignerError {
    #[error("Signing key controls {actual}, but the package names issuer {expected}")]
    WrongKey {
        expected: SettlementAddress,
        actual: SettlementAddress,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Submits issuance transactions to the ledger program on behalf of the
/// issuing party and awaits settlement.
pub struct AnchorClient {
    ledger: Arc<dyn LedgerWriter>,
}

impl AnchorClient {
    pub fn new(ledger: Arc<dyn LedgerWriter>) -> Self {
        AnchorClient { ledger }
    }

    /// Build, sign, and submit the anchor transaction for a freshly
    /// issued affidavit. Returns the settlement receipt the caller then
    /// feeds to the server's confirmation operation.
    pub async fn submit_issuance(
        &self,
        package: &IssuancePackage,
        key: &PartyKey,
    ) -> Result<LedgerReceipt, SignerError> {
        if key.address() != &package.issuer_address {
            return Err(SignerError::WrongKey {
                expected: package.issuer_address.clone(),
                actual: key.address().clone(),
            });
        }

        let entry = LedgerEntry {
            display_id: package.display_id.clone(),
            title: package.title.clone(),
            category: package.category.clone(),
            metadata_ref: package.metadata_ref.clone(),
            issuer: package.issuer_address.clone(),
            parties: package.party_addresses.clone(),
            witnesses: package
                .witness_ids
                .iter()
                .map(|id| id.to_string())
                .collect(),
            anchored_at: Utc::now(),
        };
        let submission = AnchorSubmission {
            entry,
            submitter: key.address().clone(),
        };
        let signature = key.sign(&submission.canonical_bytes()?);

        tracing::info!(display_id = %package.display_id, "submitting anchor transaction");
        let receipt = self
            .ledger
            .submit(SignedAnchorSubmission {
                submission,
                signature,
            })
            .await?;
        tracing::info!(
            display_id = %package.display_id,
            transaction_hash = %receipt.transaction_hash,
            block_reference = receipt.block_reference,
            "anchor transaction settled"
        );
        Ok(receipt)
    }
}
