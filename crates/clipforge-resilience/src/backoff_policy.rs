//! Exponential backoff with full jitter (§4.A): base 500ms, factor 2, cap 30s.

use rand::Rng;
use std::time::Duration;

const BASE_MS: u64 = 500;
const FACTOR: u32 = 2;
const CAP_MS: u64 = 30_000;

/// `attempt` is 1-based (the first retry is attempt 1).
pub fn backoff_for_attempt(attempt: u32) -> Duration {
    let exp = BASE_MS.saturating_mul(FACTOR.saturating_pow(attempt.saturating_sub(1)) as u64);
    let capped = exp.min(CAP_MS);
    let jittered = rand::thread_rng().gen_range(0..=capped.max(1));
    Duration::from_millis(jittered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_never_exceeds_cap() {
        for attempt in 1..20 {
            let d = backoff_for_attempt(attempt);
            assert!(d <= Duration::from_millis(CAP_MS));
        }
    }

    #[test]
    fn backoff_grows_with_attempt_bound() {
        // Upper bound (pre-jitter) should grow until the cap, so repeatedly
        // sampling the max over many draws should trend upward for low attempts.
        let mut max_seen = vec![];
        for attempt in 1..=6 {
            let mut m = Duration::from_millis(0);
            for _ in 0..200 {
                m = m.max(backoff_for_attempt(attempt));
            }
            max_seen.push(m);
        }
        assert!(max_seen[5] >= max_seen[0]);
    }
}
