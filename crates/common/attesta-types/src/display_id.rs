use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised when parsing a display identifier
#[derive(Error, Debug)]
pub enum DisplayIdError {
    #[error("Invalid display identifier: {0}")]
    InvalidFormat(String),
}

/// The human-readable identifier of a request or an issued affidavit, in
/// the `AFF-<year>-<sequence>` form (sequence zero-padded to five digits).
///
/// Both requests and affidavits draw their sequence numbers from the same
/// per-calendar-year counter, so identifiers are unique across the two.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DisplayId {
    year: i32,
    sequence: u64,
}

impl DisplayId {
    const PREFIX: &'static str = "AFF";

    pub fn new(year: i32, sequence: u64) -> Self {
        DisplayId { year, sequence }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{:05}", Self::PREFIX, self.year, self.sequence)
    }
}

impl FromStr for DisplayId {
    type Err = DisplayIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '-');
        let prefix = parts.next().unwrap_or_default();
        let year = parts.next().unwrap_or_default();
        let sequence = parts.next().unwrap_or_default();
        if prefix != Self::PREFIX {
            return Err(DisplayIdError::InvalidFormat(format!(
                "expected '{}' prefix in '{}'",
                Self::PREFIX,
                s
            )));
        }
        let year: i32 = year
            .parse()
            .map_err(|_| DisplayIdError::InvalidFormat(format!("bad year in '{}'", s)))?;
        if sequence.len() < 5 {
            return Err(DisplayIdError::InvalidFormat(format!(
                "sequence must be at least five digits in '{}'",
                s
            )));
        }
        let sequence: u64 = sequence
            .parse()
            .map_err(|_| DisplayIdError::InvalidFormat(format!("bad sequence in '{}'", s)))?;
        Ok(DisplayId { year, sequence })
    }
}

// Serialized as the display string so the identifier reads the same in
// JSON payloads, ledger entries, and persisted records.
impl Serialize for DisplayId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DisplayId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
