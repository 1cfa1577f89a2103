//! Hashing and JSON canonicalization underlying stage fingerprints and
//! idempotency keys (§3, §4.A, §4.D).

pub mod canonical_json;
pub mod hash;

pub use canonical_json::to_canonical_json;
pub use hash::{hash_str, hash_value};
