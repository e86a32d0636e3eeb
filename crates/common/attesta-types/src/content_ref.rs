use cid::{Cid as ExternalCid, Version};
use multihash::Multihash;
use sha2::{Digest, Sha256};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::TryFrom;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when building or parsing content references
#[derive(Error, Debug)]
pub enum ContentRefError {
    #[error("Failed to build content reference: {0}")]
    BuildError(String),
    #[error("Failed to parse content reference from string: {0}")]
    FromStrError(String),
}

/// An opaque, content-derived key into the external content store.
///
/// Wraps a CIDv1 (raw codec, sha2-256) so that identical bytes always map
/// to the identical reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContentRef(ExternalCid);

impl ContentRef {
    /// Derive the reference for a blob of raw bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ContentRefError> {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let digest = hasher.finalize();

        // 0x12 is the multicodec code for sha2-256
        let mh = Multihash::wrap(0x12, &digest)
            .map_err(|e| ContentRefError::BuildError(format!("multihash wrap error: {}", e)))?;

        // 0x55 is the multicodec code for the raw codec
        let cid = ExternalCid::new(Version::V1, 0x55, mh)
            .map_err(|e| ContentRefError::BuildError(e.to_string()))?;
        Ok(ContentRef(cid))
    }

    /// Get the raw bytes of this reference
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }
}

impl FromStr for ContentRef {
    type Err = ContentRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExternalCid::from_str(s)
            .map(ContentRef)
            .map_err(|e| ContentRefError::FromStrError(e.to_string()))
    }
}

impl Deref for ContentRef {
    type Target = ExternalCid;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<ExternalCid> for ContentRef {
    fn from(cid: ExternalCid) -> Self {
        ContentRef(cid)
    }
}

impl From<ContentRef> for ExternalCid {
    fn from(reference: ContentRef) -> Self {
        reference.0
    }
}

impl TryFrom<&[u8]> for ContentRef {
    type Error = ContentRefError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        ExternalCid::try_from(bytes)
            .map(ContentRef)
            .map_err(|e| ContentRefError::FromStrError(e.to_string()))
    }
}

// --- Serde Implementations ---
impl Serialize for ContentRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(&self.0.to_bytes())
    }
}

impl<'de> Deserialize<'de> for ContentRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        ExternalCid::try_from(bytes)
            .map(ContentRef)
            .map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
