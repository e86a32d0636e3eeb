use super::{AffidavitStore, RequestStore, SequenceStore, StoreError};
use crate::affidavit::Affidavit;
use crate::display_id::DisplayId;
use crate::request::{AffidavitRequest, RequestStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// In-memory request store for tests and local runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryRequestStore {
    requests: Arc<RwLock<HashMap<Uuid, AffidavitRequest>>>,
}

impl MemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestStore for MemoryRequestStore {
    async fn insert(&self, request: AffidavitRequest) -> Result<(), StoreError> {
        let mut requests = self.requests.write().await;
        requests.insert(request.id, request);
        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<AffidavitRequest>, StoreError> {
        let requests = self.requests.read().await;
        Ok(requests.get(id).cloned())
    }

    async fn update(&self, request: &AffidavitRequest) -> Result<(), StoreError> {
        let mut requests = self.requests.write().await;
        if !requests.contains_key(&request.id) {
            return Err(StoreError::NotFound(request.id.to_string()));
        }
        requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn transition_status(
        &self,
        id: &Uuid,
        from: RequestStatus,
        to: RequestStatus,
    ) -> Result<bool, StoreError> {
        let mut requests = self.requests.write().await;
        let request = requests
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if request.status != from {
            return Ok(false);
        }
        request.status = to;
        Ok(true)
    }

    async fn list_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<AffidavitRequest>, StoreError> {
        let requests = self.requests.read().await;
        Ok(requests
            .values()
            .filter(|request| request.status == status)
            .cloned()
            .collect())
    }
}

/// In-memory affidavit store for tests and local runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryAffidavitStore {
    affidavits: Arc<RwLock<HashMap<Uuid, Affidavit>>>,
    /// display id string -> affidavit id
    display_index: Arc<RwLock<HashMap<String, Uuid>>>,
}

impl MemoryAffidavitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AffidavitStore for MemoryAffidavitStore {
    async fn insert(&self, affidavit: Affidavit) -> Result<(), StoreError> {
        let mut affidavits = self.affidavits.write().await;
        let mut display_index = self.display_index.write().await;
        let key = affidavit.display_id.to_string();
        if display_index.contains_key(&key) {
            return Err(StoreError::DuplicateDisplayId(affidavit.display_id.clone()));
        }
        display_index.insert(key, affidavit.id);
        affidavits.insert(affidavit.id, affidavit);
        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Affidavit>, StoreError> {
        let affidavits = self.affidavits.read().await;
        Ok(affidavits.get(id).cloned())
    }

    async fn get_by_display_id(
        &self,
        display_id: &DisplayId,
    ) -> Result<Option<Affidavit>, StoreError> {
        let display_index = self.display_index.read().await;
        let affidavits = self.affidavits.read().await;
        Ok(display_index
            .get(&display_id.to_string())
            .and_then(|id| affidavits.get(id))
            .cloned())
    }

    async fn update(&self, affidavit: &Affidavit) -> Result<(), StoreError> {
        let mut affidavits = self.affidavits.write().await;
        if !affidavits.contains_key(&affidavit.id) {
            return Err(StoreError::NotFound(affidavit.id.to_string()));
        }
        affidavits.insert(affidavit.id, affidavit.clone());
        Ok(())
    }

    async fn list_unanchored(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<Affidavit>, StoreError> {
        let affidavits = self.affidavits.read().await;
        Ok(affidavits
            .values()
            .filter(|affidavit| !affidavit.is_anchored() && affidavit.issued_at <= older_than)
            .cloned()
            .collect())
    }
}

/// In-memory per-year counter. Increments are serialized behind one lock.
#[derive(Debug, Default, Clone)]
pub struct MemorySequenceStore {
    counters: Arc<Mutex<HashMap<i32, u64>>>,
}

impl MemorySequenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SequenceStore for MemorySequenceStore {
    async fn next(&self, year: i32) -> Result<u64, StoreError> {
        let mut counters = self.counters.lock().await;
        let counter = counters.entry(year).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }
}
