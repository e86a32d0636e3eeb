use crate::consensus::{ConsensusTracker, ResponseOutcome};
use crate::issuance::CommitOrchestrator;
use crate::packager::MetadataPackager;
use crate::reconcile::ReconciliationSweep;
use crate::sequence::DisplayIdAllocator;
use crate::verification::{VerificationEngine, VerificationOutcome};
use attesta_identity::profile::ProfileStore;
use attesta_identity::resolver::IdentityResolver;
use attesta_types::affidavit::Affidavit;
use attesta_types::content::{ContentStore, UploadStore};
use attesta_types::display_id::DisplayId;
use attesta_types::error::ProtocolError;
use attesta_types::ledger::LedgerReader;
use attesta_types::party::{PartyId, PartyRole};
use attesta_types::request::{AffidavitRequest, RequestDraft};
use attesta_types::store::{AffidavitStore, RequestStore, SequenceStore};
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Everything the service facade is wired from.
pub struct ServiceDeps {
    pub requests: Arc<dyn RequestStore>,
    pub affidavits: Arc<dyn AffidavitStore>,
    pub sequences: Arc<dyn SequenceStore>,
    pub uploads: Arc<dyn UploadStore>,
    pub contents: Arc<dyn ContentStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub ledger: Arc<dyn LedgerReader>,
}

/// The inbound operations of the protocol, strongly typed and dispatched
/// by the caller rather than by payload shape: responding to a request
/// and confirming an issuance are two distinct operations.
pub struct AffidavitService {
    consensus: ConsensusTracker,
    orchestrator: Arc<CommitOrchestrator>,
    verifier: VerificationEngine,
    affidavits: Arc<dyn AffidavitStore>,
    ledger: Arc<dyn LedgerReader>,
}

impl AffidavitService {
    pub fn new(deps: ServiceDeps) -> Self {
        let allocator = DisplayIdAllocator::new(deps.sequences);
        let packager = MetadataPackager::new(deps.uploads, deps.contents);
        let resolver = IdentityResolver::new(deps.profiles);
        let orchestrator = Arc::new(CommitOrchestrator::new(
            deps.affidavits.clone(),
            allocator.clone(),
            packager,
            resolver,
        ));
        let consensus =
            ConsensusTracker::new(deps.requests, allocator, orchestrator.clone());
        let verifier = VerificationEngine::new(deps.affidavits.clone(), deps.ledger.clone());
        AffidavitService {
            consensus,
            orchestrator,
            verifier,
            affidavits: deps.affidavits,
            ledger: deps.ledger,
        }
    }

    /// Open a new affidavit request naming an issuer and any other
    /// parties. Any authenticated identity may do this.
    pub async fn create_request(
        &self,
        draft: RequestDraft,
    ) -> Result<AffidavitRequest, ProtocolError> {
        self.consensus.create_request(draft).await
    }

    /// Record one party's accept/reject response under its claimed role.
    pub async fn respond_to_request(
        &self,
        request_id: &Uuid,
        party: &PartyId,
        role: PartyRole,
        accept: bool,
    ) -> Result<ResponseOutcome, ProtocolError> {
        self.consensus
            .record_response(request_id, party, role, accept)
            .await
    }

    /// Phase-2 confirmation from the signing agent, carrying the settled
    /// transaction's hash and block reference. Idempotent.
    pub async fn confirm_issuance(
        &self,
        display_id: &DisplayId,
        transaction_hash: &str,
        block_reference: u64,
    ) -> Result<Affidavit, ProtocolError> {
        self.orchestrator
            .complete_issuance(display_id, transaction_hash, block_reference)
            .await
    }

    /// Read-only tamper check against the ledger.
    pub async fn verify(
        &self,
        display_id: &DisplayId,
    ) -> Result<VerificationOutcome, ProtocolError> {
        self.verifier.verify(display_id).await
    }

    /// Verify and, on a match, stamp the verification timestamp.
    pub async fn verify_and_stamp(
        &self,
        display_id: &DisplayId,
    ) -> Result<VerificationOutcome, ProtocolError> {
        self.verifier.verify_and_stamp(display_id).await
    }

    /// Fetch an issued affidavit by its display identifier.
    pub async fn affidavit(
        &self,
        display_id: &DisplayId,
    ) -> Result<Option<Affidavit>, ProtocolError> {
        Ok(self.affidavits.get_by_display_id(display_id).await?)
    }

    /// Affidavits still waiting on phase 2, for operator dashboards.
    pub async fn unanchored(&self, min_age: Duration) -> Result<Vec<Affidavit>, ProtocolError> {
        Ok(self.affidavits.list_unanchored(Utc::now() - min_age).await?)
    }

    /// Build the reconciliation sweep that backstops abandoned phase-2
    /// confirmations.
    pub fn reconciler(&self, min_age: Duration) -> ReconciliationSweep {
        ReconciliationSweep::new(
            self.affidavits.clone(),
            self.ledger.clone(),
            self.orchestrator.clone(),
            min_age,
        )
    }
}
