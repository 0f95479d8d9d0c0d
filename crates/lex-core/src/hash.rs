//! Content hashing for evidence tamper-evidence
//!
//! Provides [`ContentHash`], a strongly-typed SHA-256 digest used to seal
//! source texts, finished documents and audit-log entries.

use sha2::{Digest, Sha256};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte SHA-256 content hash
///
/// Immutable and cheap to clone (Copy). Renders as lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create hash from byte slice
    ///
    /// # Errors
    /// Returns error if slice length is not exactly 32 bytes
    #[inline]
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HashError> {
        if bytes.len() != 32 {
            return Err(HashError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Compute SHA-256 of arbitrary data
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        Self(digest.into())
    }

    /// Compute a hash over several parts, each terminated by a zero byte
    ///
    /// Used where a hash must bind multiple fields without ambiguity.
    #[must_use]
    pub fn compute_parts<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
            hasher.update([0]);
        }
        Self(hasher.finalize().into())
    }

    /// Short string representation (first 12 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }

    /// Prefixed representation used in audit trails (`sha256:<hex>`)
    #[inline]
    #[must_use]
    pub fn tagged(&self) -> String {
        format!("sha256:{self}")
    }

    /// Check if hash is all zeros (chain genesis)
    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for ContentHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("sha256:").unwrap_or(s);
        let bytes = hex::decode(raw)?;
        Self::from_slice(&bytes)
    }
}

impl Default for ContentHash {
    fn default() -> Self {
        Self([0; 32])
    }
}

impl serde::Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.tagged())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> serde::Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ContentHashVisitor;

        impl serde::de::Visitor<'_> for ContentHashVisitor {
            type Value = ContentHash;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                formatter.write_str("a sha256 hash as hex string or 32 bytes")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                value.parse().map_err(serde::de::Error::custom)
            }

            fn visit_bytes<E>(self, value: &[u8]) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                ContentHash::from_slice(value).map_err(serde::de::Error::custom)
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_str(ContentHashVisitor)
        } else {
            deserializer.deserialize_bytes(ContentHashVisitor)
        }
    }
}

/// Errors that can occur when working with content hashes
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Invalid hash length
    #[error("invalid hash length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Hex encoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_is_deterministic() {
        let h1 = ContentHash::compute(b"Ley 1480 de 2011");
        let h2 = ContentHash::compute(b"Ley 1480 de 2011");
        assert_eq!(h1, h2);
        assert_ne!(h1, ContentHash::compute(b"Ley 1481 de 2011"));
    }

    #[test]
    fn known_sha256_vector() {
        let hash = ContentHash::compute(b"abc");
        assert_eq!(
            hash.to_string(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn parts_are_unambiguous() {
        let a = ContentHash::compute_parts([b"ab".as_slice(), b"c".as_slice()]);
        let b = ContentHash::compute_parts([b"a".as_slice(), b"bc".as_slice()]);
        assert_ne!(a, b);
    }

    #[test]
    fn tagged_form_parses_back() {
        let hash = ContentHash::compute(b"test");
        let tagged = hash.tagged();
        assert!(tagged.starts_with("sha256:"));
        let parsed: ContentHash = tagged.parse().unwrap();
        assert_eq!(parsed, hash);
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        let result = ContentHash::from_slice(&[1u8; 31]);
        assert!(matches!(
            result,
            Err(HashError::InvalidLength {
                expected: 32,
                actual: 31
            })
        ));
    }

    #[test]
    fn short_is_prefix() {
        let hash = ContentHash::compute(b"test");
        assert_eq!(hash.short().len(), 12);
        assert!(hash.to_string().starts_with(&hash.short()));
    }

    #[test]
    fn zero_hash() {
        assert!(ContentHash::default().is_zero());
        assert!(!ContentHash::compute(b"x").is_zero());
    }

    #[test]
    fn serde_json_uses_tagged_hex() {
        let hash = ContentHash::compute(b"test");
        let json = serde_json::to_string(&hash).unwrap();
        assert!(json.starts_with("\"sha256:"));
        let decoded: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, hash);
    }
}
