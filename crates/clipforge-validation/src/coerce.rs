//! Safe typed coercers (§4.J, §9): the replacement for any generic
//! string-to-code evaluation in config/input paths.

use crate::error::ValidationError;
use crate::patterns::contains_dangerous_pattern;
use std::path::{Path, PathBuf};

pub fn safe_int(field: &str, s: &str, min: i64, max: i64, default: i64) -> Result<i64, ValidationError> {
    let v = s.trim().parse::<i64>().unwrap_or(default);
    if v < min || v > max {
        return Err(ValidationError::OutOfRange { field: field.to_string() });
    }
    Ok(v)
}

pub fn safe_float(field: &str, s: &str, min: f64, max: f64, default: f64) -> Result<f64, ValidationError> {
    let v = s.trim().parse::<f64>().unwrap_or(default);
    if !v.is_finite() || v < min || v > max {
        return Err(ValidationError::OutOfRange { field: field.to_string() });
    }
    Ok(v)
}

pub fn safe_bool(field: &str, s: &str, default: bool) -> Result<bool, ValidationError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        "" => Ok(default),
        _ => Err(ValidationError::TypeMismatch { field: field.to_string() }),
    }
}

pub fn safe_enum<'a>(field: &str, s: &str, allowed: &'a [&'a str]) -> Result<&'a str, ValidationError> {
    allowed
        .iter()
        .copied()
        .find(|a| a.eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| ValidationError::NotAllowed { field: field.to_string() })
}

/// Validates a free-text field against length and the dangerous-pattern
/// deny-list (§4.J, §8 property 9).
pub fn safe_text(field: &str, s: &str, max_len: usize) -> Result<String, ValidationError> {
    if s.len() > max_len {
        return Err(ValidationError::TooLong { field: field.to_string(), max: max_len });
    }
    if contains_dangerous_pattern(s) {
        return Err(ValidationError::DangerousPattern { field: field.to_string() });
    }
    Ok(s.to_string())
}

/// Ensures `candidate` resolves inside `root` after symlink resolution (§4.J:
/// "Path validation ensures all artifact paths resolve inside the
/// artifact-store root"). Both sides must already exist on disk for
/// `canonicalize` to succeed; callers validating a not-yet-created path
/// should canonicalize the parent directory instead.
pub fn safe_path_under(root: &Path, candidate: &Path) -> Result<PathBuf, ValidationError> {
    let root_canon = root.canonicalize().map_err(|_| ValidationError::PathEscapesRoot)?;
    let candidate_canon = candidate.canonicalize().map_err(|_| ValidationError::PathEscapesRoot)?;
    if candidate_canon.starts_with(&root_canon) {
        Ok(candidate_canon)
    } else {
        Err(ValidationError::PathEscapesRoot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_int_clamps_to_default_on_parse_failure_then_checks_range() {
        assert_eq!(safe_int("n", "not-a-number", 1, 10, 5).unwrap(), 5);
        assert!(safe_int("n", "99", 1, 10, 5).is_err());
        assert_eq!(safe_int("n", "7", 1, 10, 5).unwrap(), 7);
    }

    #[test]
    fn safe_enum_is_case_insensitive() {
        assert_eq!(safe_enum("status", "Approved", &["approved", "failed"]).unwrap(), "approved");
        assert!(safe_enum("status", "bogus", &["approved", "failed"]).is_err());
    }

    #[test]
    fn safe_path_under_rejects_escape() {
        let root = std::env::temp_dir();
        let outside = Path::new("/");
        assert!(safe_path_under(&root, outside).is_err() || outside.starts_with(&root));
    }
}
