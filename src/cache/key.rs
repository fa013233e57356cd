//! Key Encoding Module
//!
//! Maps logical cache keys to namespaced, versioned, hashed storage keys.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};
use twox_hash::XxHash64;

use crate::config::HerdConfig;
use crate::error::CacheError;

/// Turns a logical key into the key actually sent to the store.
///
/// Implementations must be deterministic.
pub trait KeyEncoder: fmt::Debug + Send + Sync {
    fn encode(&self, key: &str) -> String;
}

// == Hash Strategy ==
/// Digest applied to the logical key before it is prefixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashStrategy {
    /// SHA-256, 64 hex characters
    #[default]
    Sha256,
    /// XXH64 with seed 0, 16 hex characters
    Xxh64,
}

impl HashStrategy {
    pub fn digest(&self, bytes: &[u8]) -> String {
        match self {
            HashStrategy::Sha256 => hex::encode(Sha256::digest(bytes)),
            HashStrategy::Xxh64 => format!("{:016x}", XxHash64::oneshot(0, bytes)),
        }
    }
}

impl fmt::Display for HashStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashStrategy::Sha256 => f.write_str("sha256"),
            HashStrategy::Xxh64 => f.write_str("xxh64"),
        }
    }
}

impl FromStr for HashStrategy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" => Ok(HashStrategy::Sha256),
            "xxh64" | "xxhash" => Ok(HashStrategy::Xxh64),
            other => Err(CacheError::InvalidRequest(format!(
                "unknown key hash strategy '{}'",
                other
            ))),
        }
    }
}

// == Key Codec ==
/// Default encoder: `flavor-version-hash(key)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCodec {
    flavor: String,
    version: u32,
    hash: HashStrategy,
}

impl KeyCodec {
    pub fn new(flavor: impl Into<String>, version: u32, hash: HashStrategy) -> Self {
        Self {
            flavor: flavor.into(),
            version,
            hash,
        }
    }

    pub fn from_config(config: &HerdConfig) -> Self {
        Self::new(config.flavor.clone(), config.cache_version, config.hash)
    }
}

impl KeyEncoder for KeyCodec {
    fn encode(&self, key: &str) -> String {
        format!(
            "{}-{}-{}",
            self.flavor,
            self.version,
            self.hash.digest(key.as_bytes())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let codec = KeyCodec::new("prod", 3, HashStrategy::Sha256);
        let encoded = codec.encode("user:42");

        assert!(encoded.starts_with("prod-3-"));
        assert_eq!(encoded.len(), "prod-3-".len() + 64);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let codec = KeyCodec::new("test", 1, HashStrategy::Xxh64);
        assert_eq!(codec.encode("a"), codec.encode("a"));
        assert_ne!(codec.encode("a"), codec.encode("b"));
    }

    #[test]
    fn test_version_bump_changes_key_space() {
        let v1 = KeyCodec::new("test", 1, HashStrategy::Sha256);
        let v2 = KeyCodec::new("test", 2, HashStrategy::Sha256);
        assert_ne!(v1.encode("same"), v2.encode("same"));
    }

    #[test]
    fn test_flavors_do_not_collide() {
        let prod = KeyCodec::new("prod", 1, HashStrategy::Sha256);
        let staging = KeyCodec::new("staging", 1, HashStrategy::Sha256);
        assert_ne!(prod.encode("k"), staging.encode("k"));
    }

    #[test]
    fn test_known_sha256_digest() {
        assert_eq!(
            HashStrategy::Sha256.digest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_xxh64_width() {
        let codec = KeyCodec::new("", 1, HashStrategy::Xxh64);
        let encoded = codec.encode("anything");
        assert!(encoded.starts_with("-1-"));
        assert_eq!(encoded.len(), 3 + 16);
    }

    #[test]
    fn test_hash_strategy_parse() {
        assert_eq!("SHA256".parse::<HashStrategy>().unwrap(), HashStrategy::Sha256);
        assert_eq!("xxh64".parse::<HashStrategy>().unwrap(), HashStrategy::Xxh64);
        assert!(matches!(
            "md5".parse::<HashStrategy>(),
            Err(CacheError::InvalidRequest(_))
        ));
    }
}
