//! Content-derived blob references.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::error::StoreError;

/// Hash name prefix of every textual reference.
pub const REF_PREFIX: &str = "sha256-";

/// Length of the hex digest part of a reference.
const DIGEST_HEX_LEN: usize = 64;

/// Identifier of an immutable blob, derived from the SHA-256 of its bytes.
///
/// The textual form is `sha256-<64 lowercase hex digits>`. Two references
/// are equal iff the content they were computed from is byte-identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentRef(Arc<str>);

impl ContentRef {
    /// Compute the reference of `data`.
    pub fn of(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        Self(format!("{}{}", REF_PREFIX, hex::encode(digest)).into())
    }

    /// The full textual form, including the hash prefix.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The hex digest without the hash prefix.
    pub fn digest_hex(&self) -> &str {
        &self.0[REF_PREFIX.len()..]
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentRef {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_part = s
            .strip_prefix(REF_PREFIX)
            .ok_or_else(|| StoreError::InvalidRef(s.to_string()))?;
        let valid = hex_part.len() == DIGEST_HEX_LEN
            && hex_part
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !valid {
            return Err(StoreError::InvalidRef(s.to_string()));
        }
        Ok(Self(s.into()))
    }
}
