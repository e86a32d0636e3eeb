//! The affidavit protocol core: consensus over request acceptance, the
//! two-phase ledger-anchored issuance commit, metadata packaging,
//! verification against the ledger, and the reconciliation sweep for
//! abandoned phase-2 confirmations.

pub mod consensus;
pub mod issuance;
pub mod packager;
pub mod reconcile;
pub mod sequence;
pub mod service;
pub mod verification;

pub use consensus::{ConsensusTracker, ResponseOutcome};
pub use issuance::CommitOrchestrator;
pub use packager::{AffidavitMetadata, MetadataPackager, PackagedAttachment};
pub use reconcile::{ReconciliationSweep, SweepReport};
pub use sequence::DisplayIdAllocator;
pub use service::{AffidavitService, ServiceDeps};
pub use verification::{FieldMismatch, VerificationEngine, VerificationOutcome};
