use super::{AffidavitStore, RequestStore, SequenceStore, StoreError};
use crate::affidavit::Affidavit;
use crate::display_id::DisplayId;
use crate::request::{AffidavitRequest, RequestStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::convert::TryInto;
use std::path::Path;
use uuid::Uuid;

const REQUESTS_TREE: &str = "requests";
const AFFIDAVITS_TREE: &str = "affidavits";
const DISPLAY_INDEX_TREE: &str = "affidavits_by_display_id";
const SEQUENCES_TREE: &str = "display_sequences";

/// A sled database shared by the request, affidavit, and sequence stores.
#[derive(Debug, Clone)]
pub struct SledBackend {
    db: ::sled::Db,
}

impl SledBackend {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = ::sled::open(path)?;
        Ok(SledBackend { db })
    }

    pub fn request_store(&self) -> Result<SledRequestStore, StoreError> {
        Ok(SledRequestStore {
            tree: self.db.open_tree(REQUESTS_TREE)?,
        })
    }

    pub fn affidavit_store(&self) -> Result<SledAffidavitStore, StoreError> {
        Ok(SledAffidavitStore {
            affidavits: self.db.open_tree(AFFIDAVITS_TREE)?,
            display_index: self.db.open_tree(DISPLAY_INDEX_TREE)?,
        })
    }

    pub fn sequence_store(&self) -> Result<SledSequenceStore, StoreError> {
        Ok(SledSequenceStore {
            tree: self.db.open_tree(SEQUENCES_TREE)?,
        })
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    Ok(serde_json::to_vec(value)?)
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Sled-backed request store.
#[derive(Debug, Clone)]
pub struct SledRequestStore {
    tree: ::sled::Tree,
}

#[async_trait]
impl RequestStore for SledRequestStore {
    async fn insert(&self, request: AffidavitRequest) -> Result<(), StoreError> {
        self.tree
            .insert(request.id.as_bytes(), encode(&request)?)?;
        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<AffidavitRequest>, StoreError> {
        match self.tree.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, request: &AffidavitRequest) -> Result<(), StoreError> {
        if self.tree.get(request.id.as_bytes())?.is_none() {
            return Err(StoreError::NotFound(request.id.to_string()));
        }
        self.tree
            .insert(request.id.as_bytes(), encode(request)?)?;
        Ok(())
    }

    async fn transition_status(
        &self,
        id: &Uuid,
        from: RequestStatus,
        to: RequestStatus,
    ) -> Result<bool, StoreError> {
        // compare-and-swap loop over the encoded record; concurrent
        // writers retry until the swap or a status mismatch settles it
        loop {
            let current = self
                .tree
                .get(id.as_bytes())?
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            let mut request: AffidavitRequest = decode(&current)?;
            if request.status != from {
                return Ok(false);
            }
            request.status = to;
            let swapped = self.tree.compare_and_swap(
                id.as_bytes(),
                Some(current),
                Some(encode(&request)?),
            )?;
            if swapped.is_ok() {
                return Ok(true);
            }
        }
    }

    async fn list_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<AffidavitRequest>, StoreError> {
        let mut result = Vec::new();
        for item in self.tree.iter() {
            let (_, bytes) = item?;
            let request: AffidavitRequest = decode(&bytes)?;
            if request.status == status {
                result.push(request);
            }
        }
        Ok(result)
    }
}

/// Sled-backed affidavit store with a unique display-id index tree.
#[derive(Debug, Clone)]
pub struct SledAffidavitStore {
    affidavits: ::sled::Tree,
    display_index: ::sled::Tree,
}

#[async_trait]
impl AffidavitStore for SledAffidavitStore {
    async fn insert(&self, affidavit: Affidavit) -> Result<(), StoreError> {
        let display_key = affidavit.display_id.to_string();
        // claim the display id first; losing the swap means a duplicate
        let claimed = self.display_index.compare_and_swap(
            display_key.as_bytes(),
            None::<&[u8]>,
            Some(affidavit.id.as_bytes().to_vec()),
        )?;
        if claimed.is_err() {
            return Err(StoreError::DuplicateDisplayId(affidavit.display_id.clone()));
        }
        self.affidavits
            .insert(affidavit.id.as_bytes(), encode(&affidavit)?)?;
        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Affidavit>, StoreError> {
        match self.affidavits.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn get_by_display_id(
        &self,
        display_id: &DisplayId,
    ) -> Result<Option<Affidavit>, StoreError> {
        let Some(id_bytes) = self.display_index.get(display_id.to_string().as_bytes())? else {
            return Ok(None);
        };
        match self.affidavits.get(&id_bytes)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, affidavit: &Affidavit) -> Result<(), StoreError> {
        if self.affidavits.get(affidavit.id.as_bytes())?.is_none() {
            return Err(StoreError::NotFound(affidavit.id.to_string()));
        }
        self.affidavits
            .insert(affidavit.id.as_bytes(), encode(affidavit)?)?;
        Ok(())
    }

    async fn list_unanchored(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<Affidavit>, StoreError> {
        let mut result = Vec::new();
        for item in self.affidavits.iter() {
            let (_, bytes) = item?;
            let affidavit: Affidavit = decode(&bytes)?;
            if !affidavit.is_anchored() && affidavit.issued_at <= older_than {
                result.push(affidavit);
            }
        }
        Ok(result)
    }
}

/// Sled-backed per-year counter; `update_and_fetch` makes the increment
/// atomic across threads and processes sharing the tree.
#[derive(Debug, Clone)]
pub struct SledSequenceStore {
    tree: ::sled::Tree,
}

#[async_trait]
impl SequenceStore for SledSequenceStore {
    async fn next(&self, year: i32) -> Result<u64, StoreError> {
        let value = self
            .tree
            .update_and_fetch(year.to_be_bytes(), |old| {
                let current = old
                    .and_then(|bytes| bytes.try_into().ok())
                    .map(u64::from_be_bytes)
                    .unwrap_or(0);
                Some(current.wrapping_add(1).to_be_bytes().to_vec())
            })?
            .ok_or_else(|| StoreError::Backend("sequence update returned nothing".to_string()))?;
        let bytes: [u8; 8] = value
            .as_ref()
            .try_into()
            .map_err(|_| StoreError::Backend("corrupt sequence value".to_string()))?;
        Ok(u64::from_be_bytes(bytes))
    }
}
