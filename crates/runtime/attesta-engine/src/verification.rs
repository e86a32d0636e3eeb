use attesta_types::display_id::DisplayId;
use attesta_types::error::ProtocolError;
use attesta_types::ledger::{LedgerReader, LedgerRecord};
use attesta_types::store::AffidavitStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// One divergent field between the durable record and the ledger copy.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct FieldMismatch {
    pub field: &'static str,
    pub stored: String,
    pub on_ledger: String,
}

/// The result of checking an affidavit against the ledger.
///
/// `matched = false` is a reportable finding, not an error; only a failed
/// ledger *read* surfaces as `LedgerUnavailable`.
#[derive(Serialize, Clone, Debug)]
pub struct VerificationOutcome {
    pub display_id: DisplayId,
    pub matched: bool,
    /// Empty when the ledger simply has no entry for the identifier
    pub mismatches: Vec<FieldMismatch>,
    /// The ledger's stored copy, when one exists
    pub ledger_record: Option<LedgerRecord>,
    pub checked_at: DateTime<Utc>,
}

/// Re-derives the ledger's view of an issued affidavit and compares it
/// field-by-field against the durable record.
pub struct VerificationEngine {
    affidavits: Arc<dyn AffidavitStore>,
    ledger: Arc<dyn LedgerReader>,
}

impl VerificationEngine {
    pub fn new(affidavits: Arc<dyn AffidavitStore>, ledger: Arc<dyn LedgerReader>) -> Self {
        VerificationEngine { affidavits, ledger }
    }

    /// Read-only comparison. Holds no locks while the ledger read is in
    /// flight; the read may be slow and is independently retryable.
    pub async fn verify(&self, display_id: &DisplayId) -> Result<VerificationOutcome, ProtocolError> {
        let affidavit = self
            .affidavits
            .get_by_display_id(display_id)
            .await?
            .ok_or_else(|| ProtocolError::NotFound(format!("affidavit {}", display_id)))?;

        let record = self
            .ledger
            .fetch(display_id)
            .await
            .map_err(|e| ProtocolError::LedgerUnavailable(e.to_string()))?;

        let checked_at = Utc::now();
        let Some(record) = record else {
            tracing::warn!(display_id = %display_id, "no ledger entry found for issued affidavit");
            return Ok(VerificationOutcome {
                display_id: display_id.clone(),
                matched: false,
                mismatches: Vec::new(),
                ledger_record: None,
                checked_at,
            });
        };

        let mut mismatches = Vec::new();
        let entry = &record.entry;
        if entry.display_id != affidavit.display_id {
            mismatches.push(FieldMismatch {
                field: "displayId",
                stored: affidavit.display_id.to_string(),
                on_ledger: entry.display_id.to_string(),
            });
        }
        if entry.title != affidavit.title {
            mismatches.push(FieldMismatch {
                field: "title",
                stored: affidavit.title.clone(),
                on_ledger: entry.title.clone(),
            });
        }
        if entry.category != affidavit.category {
            mismatches.push(FieldMismatch {
                field: "category",
                stored: affidavit.category.clone(),
                on_ledger: entry.category.clone(),
            });
        }
        if entry.metadata_ref != affidavit.metadata_ref {
            mismatches.push(FieldMismatch {
                field: "metadataRef",
                stored: affidavit.metadata_ref.to_string(),
                on_ledger: entry.metadata_ref.to_string(),
            });
        }
        // a forged confirmation hash shows up here, not at phase 2
        if affidavit.is_anchored()
            && affidavit.transaction_hash != record.receipt.transaction_hash
        {
            mismatches.push(FieldMismatch {
                field: "transactionHash",
                stored: affidavit.transaction_hash.clone(),
                on_ledger: record.receipt.transaction_hash.clone(),
            });
        }

        let matched = mismatches.is_empty();
        if !matched {
            tracing::warn!(
                display_id = %display_id,
                mismatch_count = mismatches.len(),
                "ledger copy diverges from the durable record"
            );
        }
        Ok(VerificationOutcome {
            display_id: display_id.clone(),
            matched,
            mismatches,
            ledger_record: Some(record),
            checked_at,
        })
    }

    /// The manual "verify on blockchain" composite: on a match, stamps
    /// the record's verification timestamp.
    pub async fn verify_and_stamp(
        &self,
        display_id: &DisplayId,
    ) -> Result<VerificationOutcome, ProtocolError> {
        let outcome = self.verify(display_id).await?;
        if outcome.matched {
            let mut affidavit = self
                .affidavits
                .get_by_display_id(display_id)
                .await?
                .ok_or_else(|| ProtocolError::NotFound(format!("affidavit {}", display_id)))?;
            affidavit.is_verified_on_blockchain = true;
            affidavit.last_verified_at = Some(outcome.checked_at);
            self.affidavits.update(&affidavit).await?;
        }
        Ok(outcome)
    }
}
