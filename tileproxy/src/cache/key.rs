//! Index keys and entries.
//!
//! The key packs a tile identity into bytes: zoom as one byte, `x` and `y` as
//! little-endian `u32`, then the raw provider name with no terminator. The
//! fixed-width prefix keeps keys for different providers from colliding.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::cache::error::CacheError;
use crate::coord::Tile;

/// Length of the fixed-width key prefix.
const KEY_PREFIX_LEN: usize = 1 + 4 + 4;

/// Binary lookup key for one tile identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexKey(Vec<u8>);

impl IndexKey {
    /// Encodes the key for `tile`.
    pub fn for_tile(tile: &Tile) -> Self {
        let provider = tile.provider.as_bytes();
        let mut key = Vec::with_capacity(KEY_PREFIX_LEN + provider.len());
        key.push(tile.z);
        key.extend_from_slice(&tile.x.to_le_bytes());
        key.extend_from_slice(&tile.y.to_le_bytes());
        key.extend_from_slice(provider);
        Self(key)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Index value: which blob holds a tile and when it was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// SHA-256 of the blob content
    pub hash: [u8; 32],
    /// Unix time in milliseconds when the entry was written
    pub timestamp_ms: i64,
}

impl IndexEntry {
    /// Creates an entry stamped with the current time.
    pub fn now(hash: [u8; 32]) -> Self {
        Self {
            hash,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Lowercase hex form of the content hash.
    pub fn hex(&self) -> String {
        hex_digest(&self.hash)
    }

    /// Serializes the entry for storage.
    pub fn encode(&self) -> Result<Vec<u8>, CacheError> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserializes a stored entry.
    pub fn decode(bytes: &[u8]) -> Result<Self, CacheError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Renders a digest as lowercase hex.
pub fn hex_digest(hash: &[u8]) -> String {
    let mut out = String::with_capacity(hash.len() * 2);
    for byte in hash {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let key = IndexKey::for_tile(&Tile::new("osm", 3, 0x0102, 0x0304));
        assert_eq!(
            key.as_bytes(),
            &[3, 0x02, 0x01, 0, 0, 0x04, 0x03, 0, 0, b'o', b's', b'm']
        );
    }

    #[test]
    fn test_high_zoom_columns_do_not_collide() {
        let a = IndexKey::for_tile(&Tile::new("osm", 17, 65536, 5));
        let b = IndexKey::for_tile(&Tile::new("osm", 17, 0, 5));
        assert_ne!(a, b);
    }

    #[test]
    fn test_provider_is_part_of_key() {
        let a = IndexKey::for_tile(&Tile::new("a", 1, 0, 0));
        let b = IndexKey::for_tile(&Tile::new("b", 1, 0, 0));
        assert_ne!(a, b);
    }

    #[test]
    fn test_entry_survives_encoding() {
        let entry = IndexEntry {
            hash: [7u8; 32],
            timestamp_ms: 1_700_000_000_123,
        };
        let decoded = IndexEntry::decode(&entry.encode().unwrap()).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_decode_rejects_truncated_value() {
        assert!(matches!(
            IndexEntry::decode(&[1, 2, 3]),
            Err(CacheError::Encoding(_))
        ));
    }

    #[test]
    fn test_hex_digest() {
        let mut hash = [0u8; 32];
        hash[0] = 0xab;
        hash[31] = 0x01;
        let hex = IndexEntry {
            hash,
            timestamp_ms: 0,
        }
        .hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.starts_with("ab00"));
        assert!(hex.ends_with("0001"));
    }
}
