//! Hash helpers, kept behind small functions so the hashing algorithm can
//! change without touching call sites. BLAKE3 is used for fingerprinting
//! (fast, and already used elsewhere for content-addressing in this
//! workspace); artifact content hashes remain SHA-256 in `clipforge-artifacts`
//! to match §3's explicit requirement.

use crate::hashing::to_canonical_json;
use blake3::Hasher;
use serde_json::Value;

pub fn hash_str(input: &str) -> String {
    let mut h = Hasher::new();
    h.update(input.as_bytes());
    h.finalize().to_hex().to_string()
}

pub fn hash_value(v: &Value) -> String {
    let canonical = to_canonical_json(v);
    hash_str(&canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hash_value_is_deterministic() {
        let v = json!({"item_id": "I1", "stage": "scripting", "attempt": 0});
        assert_eq!(hash_value(&v), hash_value(&v));
    }
}
