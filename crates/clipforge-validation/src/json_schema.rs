//! Minimal schema-checked JSON deserialization (§4.J): reject objects
//! carrying keys outside an allow-list before the value is used, independent
//! of whatever `serde` does with unknown fields.

use crate::error::ValidationError;
use serde_json::Value;

pub fn check_allowed_keys(value: &Value, allowed: &[&str]) -> Result<(), ValidationError> {
    let Value::Object(map) = value else {
        return Ok(());
    };
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(ValidationError::UnknownKey(key.clone()));
        }
    }
    Ok(())
}
