//! Durable-store interfaces for requests, affidavits, and the shared
//! per-year display-id sequence, with an in-memory backend and a
//! sled-backed backend behind the `persistence` feature.

use crate::affidavit::Affidavit;
use crate::display_id::DisplayId;
use crate::request::{AffidavitRequest, RequestStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

mod memory;
#[cfg(feature = "persistence")]
pub mod sled;

pub use memory::{MemoryAffidavitStore, MemoryRequestStore, MemorySequenceStore};
#[cfg(feature = "persistence")]
pub use self::sled::{SledAffidavitStore, SledBackend, SledRequestStore, SledSequenceStore};

/// Errors that can occur in the durable store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Display identifier already indexed: {0}")]
    DuplicateDisplayId(DisplayId),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[cfg(feature = "persistence")]
    #[error("Sled error: {0}")]
    Sled(#[from] ::sled::Error),
}

/// Storage for affidavit requests.
#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn insert(&self, request: AffidavitRequest) -> Result<(), StoreError>;

    async fn get(&self, id: &Uuid) -> Result<Option<AffidavitRequest>, StoreError>;

    /// Overwrite the stored record. The status field must only be moved
    /// through `transition_status`.
    async fn update(&self, request: &AffidavitRequest) -> Result<(), StoreError>;

    /// Atomically move the request's status from `from` to `to`. Returns
    /// false when the stored status no longer equals `from`; this is the
    /// serialization point that decides concurrent acceptance races.
    async fn transition_status(
        &self,
        id: &Uuid,
        from: RequestStatus,
        to: RequestStatus,
    ) -> Result<bool, StoreError>;

    async fn list_by_status(&self, status: RequestStatus)
        -> Result<Vec<AffidavitRequest>, StoreError>;
}

/// Storage for issued affidavits, with a unique secondary index on the
/// display identifier.
#[async_trait]
pub trait AffidavitStore: Send + Sync {
    async fn insert(&self, affidavit: Affidavit) -> Result<(), StoreError>;

    async fn get(&self, id: &Uuid) -> Result<Option<Affidavit>, StoreError>;

    async fn get_by_display_id(
        &self,
        display_id: &DisplayId,
    ) -> Result<Option<Affidavit>, StoreError>;

    async fn update(&self, affidavit: &Affidavit) -> Result<(), StoreError>;

    /// Affidavits issued at or before `older_than` whose ledger fields are
    /// still empty: the queryable "accepted but unconfirmed" state.
    async fn list_unanchored(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<Affidavit>, StoreError>;
}

/// The shared per-calendar-year counter behind display-id allocation.
///
/// Implementations must serialize increments per year: two callers racing
/// on the same year never observe the same value.
#[async_trait]
pub trait SequenceStore: Send + Sync {
    /// Returns the next value for `year`; the first call for a year
    /// yields 1.
    async fn next(&self, year: i32) -> Result<u64, StoreError>;
}
