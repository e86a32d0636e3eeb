use chrono::{DateTime, Utc};
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use std::convert::TryInto;
use std::fmt;

/// The internal identity token of a participant, as issued by the
/// account-profile store. Opaque to the protocol.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PartyId(String);

impl PartyId {
    pub fn new(id: impl Into<String>) -> Self {
        PartyId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PartyId {
    fn from(s: &str) -> Self {
        PartyId(s.to_string())
    }
}

/// The externally-addressable ledger account of a party: a multicodec-
/// prefixed, base58btc multibase encoding of its Ed25519 verifying key.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SettlementAddress(String);

impl SettlementAddress {
    const ED25519_MULTICODEC_PREFIX: &'static [u8] = &[0xed, 0x01];

    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        let mut prefixed = Self::ED25519_MULTICODEC_PREFIX.to_vec();
        prefixed.extend_from_slice(&key.to_bytes());
        SettlementAddress(multibase::encode(multibase::Base::Base58Btc, prefixed))
    }

    /// Recover the verifying key behind this address, for signature checks
    /// on the ledger side.
    pub fn to_verifying_key(&self) -> Result<VerifyingKey, AddressError> {
        let (base, decoded) = multibase::decode(&self.0)?;
        if base != multibase::Base::Base58Btc {
            return Err(AddressError::InvalidEncoding(
                "expected base58btc encoding (prefix 'z')".to_string(),
            ));
        }
        if !decoded.starts_with(Self::ED25519_MULTICODEC_PREFIX) {
            return Err(AddressError::InvalidMulticodecPrefix(
                decoded.get(..2).unwrap_or_default().to_vec(),
            ));
        }
        let key_bytes = &decoded[Self::ED25519_MULTICODEC_PREFIX.len()..];
        let key_array: &[u8; 32] = key_bytes
            .try_into()
            .map_err(|_| AddressError::InvalidKeyLength(key_bytes.len()))?;
        VerifyingKey::from_bytes(key_array).map_err(AddressError::InvalidKey)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SettlementAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised when decoding a settlement address
#[derive(thiserror::Error, Debug)]
pub enum AddressError {
    #[error("Invalid multibase encoding: {0}")]
    InvalidMultibase(#[from] multibase::Error),
    #[error("Invalid address encoding: {0}")]
    InvalidEncoding(String),
    #[error("Invalid multicodec prefix: expected 0xed01, got {0:?}")]
    InvalidMulticodecPrefix(Vec<u8>),
    #[error("Invalid key bytes length: {0}")]
    InvalidKeyLength(usize),
    #[error("Invalid verifying key: {0}")]
    InvalidKey(ed25519_dalek::SignatureError),
}

/// The role a party plays on an affidavit request
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum PartyRole {
    Issuer,
    Seller,
    Buyer,
    Witness,
}

impl fmt::Display for PartyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PartyRole::Issuer => "issuer",
            PartyRole::Seller => "seller",
            PartyRole::Buyer => "buyer",
            PartyRole::Witness => "witness",
        };
        write!(f, "{}", label)
    }
}

/// Per-slot response flag: a party that has not yet responded is `Pending`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Acceptance {
    Pending,
    Accepted,
    Rejected,
}

/// One party's seat on a request, with its acceptance state.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PartySlot {
    pub party: PartyId,
    pub acceptance: Acceptance,
    pub responded_at: Option<DateTime<Utc>>,
}

impl PartySlot {
    pub fn new(party: PartyId) -> Self {
        PartySlot {
            party,
            acceptance: Acceptance::Pending,
            responded_at: None,
        }
    }

    /// A slot is open while the party has not responded.
    pub fn is_open(&self) -> bool {
        self.acceptance == Acceptance::Pending
    }

    pub fn record(&mut self, accepted: bool, at: DateTime<Utc>) {
        self.acceptance = if accepted {
            Acceptance::Accepted
        } else {
            Acceptance::Rejected
        };
        self.responded_at = Some(at);
    }
}
