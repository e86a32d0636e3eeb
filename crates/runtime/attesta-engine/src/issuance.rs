use crate::packager::{AffidavitMetadata, MetadataPackager};
use crate::sequence::DisplayIdAllocator;
use attesta_identity::resolver::{IdentityResolver, ResolveError};
use attesta_types::affidavit::{Affidavit, AffidavitStatus, IssuancePackage, PartySnapshot};
use attesta_types::display_id::DisplayId;
use attesta_types::error::ProtocolError;
use attesta_types::party::PartyRole;
use attesta_types::request::AffidavitRequest;
use attesta_types::store::AffidavitStore;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// The two-phase issuance engine.
///
/// Phase 1 persists the canonical affidavit record with empty ledger
/// fields and hands the issuer's signing agent everything it needs to
/// submit the anchor transaction. Phase 2, invoked after settlement,
/// patches the record with the transaction hash and block reference.
/// The window between the phases is unbounded and a first-class state:
/// the server cannot close it itself because it never holds signing keys.
pub struct CommitOrchestrator {
    affidavits: Arc<dyn AffidavitStore>,
    allocator: DisplayIdAllocator,
    packager: MetadataPackager,
    resolver: IdentityResolver,
}

impl CommitOrchestrator {
    pub fn new(
        affidavits: Arc<dyn AffidavitStore>,
        allocator: DisplayIdAllocator,
        packager: MetadataPackager,
        resolver: IdentityResolver,
    ) -> Self {
        CommitOrchestrator {
            affidavits,
            allocator,
            packager,
            resolver,
        }
    }

    /// Phase 1. Fails atomically: a missing settlement address or a
    /// failed content push aborts before any record is persisted, and
    /// party resolution runs first so no sequence number is consumed on
    /// a doomed attempt.
    pub async fn begin_issuance(
        &self,
        request: &AffidavitRequest,
    ) -> Result<IssuancePackage, ProtocolError> {
        let now = Utc::now();

        let mut parties: Vec<PartySnapshot> = Vec::new();
        for (party, role) in request.party_roles() {
            let resolved = self.resolver.resolve(&party).await.map_err(|e| match e {
                ResolveError::MissingSettlementAddress(p) => {
                    ProtocolError::MissingSettlementAddress(p)
                }
                ResolveError::Profile(e) => ProtocolError::StorageUnavailable(e.to_string()),
            })?;
            parties.push(PartySnapshot {
                party: resolved.party,
                name: resolved.display_name,
                address: resolved.address,
                role,
            });
        }

        let attachments = self.packager.package_attachments(&request.attachments).await?;
        let metadata = AffidavitMetadata::from_parts(request, &parties, &attachments);
        let metadata_ref = self.packager.package_metadata(&metadata).await?;

        let display_id = self.allocator.allocate(now).await?;

        let affidavit = Affidavit {
            id: Uuid::new_v4(),
            display_id: display_id.clone(),
            request_id: request.id,
            title: request.title.clone(),
            category: request.category.clone(),
            description: request.description.clone(),
            declaration: request.declaration.clone(),
            parties: parties.clone(),
            metadata_ref: metadata_ref.clone(),
            attachment_refs: attachments
                .iter()
                .map(|attachment| attachment.content_ref.clone())
                .collect(),
            transaction_hash: String::new(),
            block_reference: 0,
            is_verified_on_blockchain: false,
            last_verified_at: None,
            status: AffidavitStatus::Active,
            issued_at: now,
        };
        self.affidavits.insert(affidavit.clone()).await?;

        tracing::info!(
            display_id = %display_id,
            request_id = %request.id,
            "affidavit persisted, awaiting ledger anchor"
        );

        let issuer_address = parties
            .iter()
            .find(|snapshot| snapshot.role == PartyRole::Issuer)
            .map(|snapshot| snapshot.address.clone())
            .ok_or_else(|| {
                ProtocolError::PreconditionFailed("request carries no issuer".to_string())
            })?;

        Ok(IssuancePackage {
            affidavit_id: affidavit.id,
            display_id,
            title: affidavit.title,
            category: affidavit.category,
            metadata_ref,
            issuer_address,
            party_addresses: parties
                .iter()
                .map(|snapshot| snapshot.address.clone())
                .collect(),
            witness_ids: parties
                .iter()
                .filter(|snapshot| snapshot.role == PartyRole::Witness)
                .map(|snapshot| snapshot.party.clone())
                .collect(),
        })
    }

    /// Phase 2. Idempotent: a record that already carries a transaction
    /// hash is returned unchanged, so flaky clients can retry freely.
    pub async fn complete_issuance(
        &self,
        display_id: &DisplayId,
        transaction_hash: &str,
        block_reference: u64,
    ) -> Result<Affidavit, ProtocolError> {
        if transaction_hash.is_empty() {
            return Err(ProtocolError::PreconditionFailed(
                "transaction hash must not be empty".to_string(),
            ));
        }

        let mut affidavit = self
            .affidavits
            .get_by_display_id(display_id)
            .await?
            .ok_or_else(|| ProtocolError::NotFound(format!("affidavit {}", display_id)))?;

        if affidavit.is_anchored() {
            tracing::debug!(display_id = %display_id, "already anchored, confirmation is a no-op");
            return Ok(affidavit);
        }

        affidavit.transaction_hash = transaction_hash.to_string();
        affidavit.block_reference = block_reference;
        affidavit.is_verified_on_blockchain = true;
        affidavit.last_verified_at = Some(Utc::now());
        self.affidavits.update(&affidavit).await?;

        tracing::info!(
            display_id = %display_id,
            block_reference,
            "ledger anchor recorded"
        );
        Ok(affidavit)
    }
}
