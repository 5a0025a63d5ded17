//! Cache key construction.
//!
//! Keys are built from a logical namespace, positional arguments in call
//! order, and keyed parameters sorted by name. Two calls that differ only in
//! keyed-parameter order must produce the identical key, because the key
//! decides whether two requests share a cache entry.

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Joined key parts are separated by this character.
const KEY_DELIMITER: char = ':';

/// Keys longer than this collapse to `namespace:<content hash>` so that
/// backend key-length limits are never hit.
pub const DEFAULT_MAX_KEY_LENGTH: usize = 200;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheKeyError {
    #[error("cache key namespace must not be empty")]
    EmptyNamespace,
}

/// Derives deterministic, bounded-length cache keys.
#[derive(Debug, Clone)]
pub struct CacheKeyEngine {
    max_length: usize,
}

impl CacheKeyEngine {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    /// Build a key from a namespace, positional arguments, and keyed
    /// parameters. Keyed parameters are sorted by name before joining.
    pub fn build(
        &self,
        namespace: &str,
        positional: &[&str],
        keyed: &[(&str, &str)],
    ) -> Result<String, CacheKeyError> {
        if namespace.is_empty() {
            return Err(CacheKeyError::EmptyNamespace);
        }

        let mut parts = Vec::with_capacity(1 + positional.len() + keyed.len());
        parts.push(namespace.to_string());
        parts.extend(positional.iter().map(|arg| arg.to_string()));

        let mut pairs = keyed.to_vec();
        pairs.sort_unstable_by(|a, b| a.0.cmp(b.0));
        parts.extend(pairs.iter().map(|(name, value)| format!("{name}={value}")));

        let key = parts.join(&KEY_DELIMITER.to_string());
        if key.len() > self.max_length {
            let digest = Sha256::digest(key.as_bytes());
            return Ok(format!(
                "{namespace}{KEY_DELIMITER}{}",
                hex::encode(digest)
            ));
        }

        Ok(key)
    }
}

impl Default for CacheKeyEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_KEY_LENGTH)
    }
}
