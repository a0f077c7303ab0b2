use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Checksum-sealed cache entries for collaborator responses.
///
/// Wallet and place lookups are cached as JSON strings; a SHA-256 checksum
/// stored alongside the payload lets retrieval detect corrupted or tampered
/// entries. A failed check falls back to a fresh fetch from the source.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SealedEntry {
    /// Cached payload as a JSON string.
    payload: String,
    /// Hex-encoded SHA-256 checksum of the payload.
    checksum: String,
}

impl SealedEntry {
    fn checksum_of(payload: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(payload.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Serializes a value and seals it with its checksum, producing the
    /// string stored in the cache. Returns `None` if the value cannot be
    /// serialized (the caller then simply skips caching).
    pub fn seal<T: Serialize>(value: &T) -> Option<String> {
        let payload = serde_json::to_string(value).ok()?;
        let entry = Self {
            checksum: Self::checksum_of(&payload),
            payload,
        };
        serde_json::to_string(&entry).ok()
    }

    /// Validates a cached string and deserializes its payload.
    ///
    /// Returns `None` for invalid JSON, a checksum mismatch, or a payload
    /// that no longer matches the expected shape.
    pub fn open<T: DeserializeOwned>(sealed: &str) -> Option<T> {
        let entry: SealedEntry = serde_json::from_str(sealed).ok()?;

        if Self::checksum_of(&entry.payload) != entry.checksum {
            tracing::warn!(
                "Cache entry failed checksum validation (payload length {})",
                entry.payload.len()
            );
            return None;
        }

        serde_json::from_str(&entry.payload).ok()
    }
}
