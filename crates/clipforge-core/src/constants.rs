//! Engine-wide constants that participate in fingerprint computation.

/// Bumping this invalidates every previously computed fingerprint, even if
/// the item and stage definitions are otherwise unchanged.
pub const ENGINE_VERSION: &str = "1.0";
