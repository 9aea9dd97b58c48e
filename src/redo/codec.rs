//! Value encoding for the redo log tables.
//!
//! Keys are native integers; records are stored as encoded bytes. A store
//! records its schema version and encoding when it is created and refuses
//! to open with anything else.

use super::error::RedoError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Version identifier for the table layout
pub const SCHEMA_VERSION: u64 = 1;

/// Encoding of stored records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    /// Human-readable JSON
    #[default]
    Json,
    /// Compact binary encoding
    Bincode,
}

impl Encoding {
    pub(crate) fn encode<T: Serialize>(self, value: &T) -> Result<Vec<u8>, RedoError> {
        match self {
            Self::Json => Ok(serde_json::to_vec(value)?),
            Self::Bincode => Ok(bincode::serialize(value)?),
        }
    }

    pub(crate) fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T, RedoError> {
        match self {
            Self::Json => Ok(serde_json::from_slice(bytes)?),
            Self::Bincode => Ok(bincode::deserialize(bytes)?),
        }
    }

    pub(crate) fn tag(self) -> u64 {
        match self {
            Self::Json => 0,
            Self::Bincode => 1,
        }
    }

    pub(crate) fn from_tag(tag: u64) -> Option<Self> {
        match tag {
            0 => Some(Self::Json),
            1 => Some(Self::Bincode),
            _ => None,
        }
    }
}
