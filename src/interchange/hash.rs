//! Content hashing for merge decisions.
//!
//! Hashing the serialized JSON of an entry gives a deterministic
//! fingerprint, so an import can skip entries that have not changed
//! without comparing every field.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Compute a SHA256 hash of a serializable value.
///
/// # Panics
///
/// Panics if the value cannot be serialized to JSON, which cannot happen
/// for the crate's data types.
#[must_use]
pub fn content_hash<T: Serialize>(value: &T) -> String {
    let json = serde_json::to_string(value).expect("serialization should not fail");
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LexEntry;

    #[test]
    fn hash_is_deterministic() {
        let entry = LexEntry::new("pintu");
        assert_eq!(content_hash(&entry), content_hash(&entry));
        assert_eq!(content_hash(&entry).len(), 64);
    }

    #[test]
    fn hash_tracks_content() {
        let a = LexEntry::new("pintu");
        let mut b = a.clone();
        b.lemma = "rumah".to_string();
        assert_ne!(content_hash(&a), content_hash(&b));
    }
}
