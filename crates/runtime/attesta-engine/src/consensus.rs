use crate::issuance::CommitOrchestrator;
use crate::sequence::DisplayIdAllocator;
use attesta_types::affidavit::IssuancePackage;
use attesta_types::error::ProtocolError;
use attesta_types::party::{PartyId, PartyRole};
use attesta_types::request::{AffidavitRequest, RequestDraft, RequestStatus};
use attesta_types::store::RequestStore;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// What a recorded response did to the request.
#[derive(Debug)]
pub enum ResponseOutcome {
    /// The slot flag was set; the request is still collecting responses.
    Recorded(AffidavitRequest),

    /// A rejection terminally closed the request.
    Rejected(AffidavitRequest),

    /// The issuer's acceptance completed consensus; commit phase 1 ran
    /// and the signing agent can now submit the ledger transaction.
    Issued {
        request: AffidavitRequest,
        package: IssuancePackage,
    },
}

/// Owns the `AffidavitRequest` acceptance state machine.
///
/// Issuance is gated on unanimity: the issuer's accepting response is only
/// legal once every present non-issuer slot reads accepted, and that
/// response triggers commit phase 1 atomically: either the response and
/// the affidavit both land, or neither does.
pub struct ConsensusTracker {
    requests: Arc<dyn RequestStore>,
    allocator: DisplayIdAllocator,
    orchestrator: Arc<CommitOrchestrator>,
}

impl ConsensusTracker {
    pub fn new(
        requests: Arc<dyn RequestStore>,
        allocator: DisplayIdAllocator,
        orchestrator: Arc<CommitOrchestrator>,
    ) -> Self {
        ConsensusTracker {
            requests,
            allocator,
            orchestrator,
        }
    }

    /// Create a new pending request from a draft.
    pub async fn create_request(
        &self,
        draft: RequestDraft,
    ) -> Result<AffidavitRequest, ProtocolError> {
        let now = Utc::now();
        let display_id = self.allocator.allocate(now).await?;
        let request = AffidavitRequest::from_draft(draft, display_id, now);
        self.requests.insert(request.clone()).await?;
        tracing::info!(
            request_id = %request.id,
            display_id = %request.display_id,
            "affidavit request created"
        );
        Ok(request)
    }

    /// Record one party's response under its claimed role.
    pub async fn record_response(
        &self,
        request_id: &Uuid,
        party: &PartyId,
        role: PartyRole,
        accept: bool,
    ) -> Result<ResponseOutcome, ProtocolError> {
        let mut request = self
            .requests
            .get(request_id)
            .await?
            .ok_or_else(|| ProtocolError::NotFound(format!("request {}", request_id)))?;

        if request.status != RequestStatus::Pending {
            return Err(ProtocolError::Conflict(format!(
                "request {} is already {:?}",
                request_id, request.status
            )));
        }

        let is_party = request.is_party(party);
        let now = Utc::now();
        let Some(slot) = request.slot_mut(party, role) else {
            return Err(if is_party {
                ProtocolError::Forbidden(format!("{} holds no {} slot on this request", party, role))
            } else {
                ProtocolError::Forbidden(format!("{} is not a party to this request", party))
            });
        };
        if !slot.is_open() {
            return Err(ProtocolError::Conflict(format!(
                "{} has already responded as {}",
                party, role
            )));
        }

        if !accept {
            // any single rejection kills the request, the issuer's included
            slot.record(false, now);
            request
                .transition(RequestStatus::Rejected)
                .map_err(|e| ProtocolError::Conflict(e.to_string()))?;
            let moved = self
                .requests
                .transition_status(request_id, RequestStatus::Pending, RequestStatus::Rejected)
                .await?;
            if !moved {
                return Err(ProtocolError::Conflict(format!(
                    "request {} reached a terminal state concurrently",
                    request_id
                )));
            }
            self.requests.update(&request).await?;
            tracing::info!(request_id = %request_id, party = %party, "request rejected");
            return Ok(ResponseOutcome::Rejected(request));
        }

        if role == PartyRole::Issuer {
            if !request.non_issuer_unanimous() {
                return Err(ProtocolError::PreconditionFailed(
                    "issuer cannot accept before every other party has accepted".to_string(),
                ));
            }
            return self.accept_and_issue(request, now).await;
        }

        slot.record(true, now);
        self.requests.update(&request).await?;
        tracing::debug!(request_id = %request_id, party = %party, role = %role, "acceptance recorded");
        Ok(ResponseOutcome::Recorded(request))
    }

    /// The issuer's accepting transition. The status CAS is the
    /// serialization point: of two concurrent acceptance attempts only
    /// the CAS winner proceeds to phase 1, and a phase-1 failure rolls
    /// the CAS back so nothing half-issued survives.
    async fn accept_and_issue(
        &self,
        mut request: AffidavitRequest,
        now: chrono::DateTime<Utc>,
    ) -> Result<ResponseOutcome, ProtocolError> {
        let won = self
            .requests
            .transition_status(&request.id, RequestStatus::Pending, RequestStatus::Accepted)
            .await?;
        if !won {
            return Err(ProtocolError::Conflict(format!(
                "request {} was accepted or rejected concurrently",
                request.id
            )));
        }

        request.issuer.record(true, now);
        request
            .transition(RequestStatus::Accepted)
            .map_err(|e| ProtocolError::Conflict(e.to_string()))?;

        match self.orchestrator.begin_issuance(&request).await {
            Ok(package) => {
                self.requests.update(&request).await?;
                tracing::info!(
                    request_id = %request.id,
                    display_id = %package.display_id,
                    "consensus reached, affidavit issued"
                );
                Ok(ResponseOutcome::Issued { request, package })
            }
            Err(err) => {
                // put the request back so the issuer can retry once the
                // cause is fixed; the issuer flag was never persisted
                if let Err(revert_err) = self
                    .requests
                    .transition_status(&request.id, RequestStatus::Accepted, RequestStatus::Pending)
                    .await
                {
                    tracing::error!(
                        request_id = %request.id,
                        error = %revert_err,
                        "failed to revert acceptance after aborted issuance"
                    );
                }
                Err(err)
            }
        }
    }
}
