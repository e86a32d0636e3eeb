use crate::issuance::CommitOrchestrator;
use attesta_types::error::ProtocolError;
use attesta_types::ledger::LedgerReader;
use attesta_types::store::AffidavitStore;
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Counts from one reconciliation pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    /// Settled on the ledger; phase 2 was completed on their behalf
    pub completed: usize,
    /// Still nowhere to be found on the ledger
    pub still_unanchored: usize,
    /// Ledger reads that failed; retried on the next pass
    pub ledger_failures: usize,
}

/// Closes the loop on clients that finished phase 1 but never returned to
/// confirm: any unanchored affidavit past a minimum age is looked up on
/// the ledger, and those that settled get their phase 2 completed here.
/// Nothing is ever rolled back; an affidavit the ledger has not seen stays
/// queryable as unanchored.
pub struct ReconciliationSweep {
    affidavits: Arc<dyn AffidavitStore>,
    ledger: Arc<dyn LedgerReader>,
    orchestrator: Arc<CommitOrchestrator>,
    min_age: Duration,
}

impl ReconciliationSweep {
    pub fn new(
        affidavits: Arc<dyn AffidavitStore>,
        ledger: Arc<dyn LedgerReader>,
        orchestrator: Arc<CommitOrchestrator>,
        min_age: Duration,
    ) -> Self {
        ReconciliationSweep {
            affidavits,
            ledger,
            orchestrator,
            min_age,
        }
    }

    pub async fn sweep(&self) -> Result<SweepReport, ProtocolError> {
        let cutoff = Utc::now() - self.min_age;
        let unanchored = self.affidavits.list_unanchored(cutoff).await?;

        let mut report = SweepReport {
            examined: unanchored.len(),
            ..SweepReport::default()
        };

        for affidavit in unanchored {
            match self.ledger.fetch(&affidavit.display_id).await {
                Ok(Some(record)) => {
                    self.orchestrator
                        .complete_issuance(
                            &affidavit.display_id,
                            &record.receipt.transaction_hash,
                            record.receipt.block_reference,
                        )
                        .await?;
                    tracing::info!(
                        display_id = %affidavit.display_id,
                        "reconciled an abandoned confirmation from the ledger"
                    );
                    report.completed += 1;
                }
                Ok(None) => {
                    report.still_unanchored += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        display_id = %affidavit.display_id,
                        error = %err,
                        "ledger read failed during reconciliation"
                    );
                    report.ledger_failures += 1;
                }
            }
        }

        if report.examined > 0 {
            tracing::info!(
                examined = report.examined,
                completed = report.completed,
                still_unanchored = report.still_unanchored,
                ledger_failures = report.ledger_failures,
                "reconciliation sweep finished"
            );
        }
        Ok(report)
    }
}
