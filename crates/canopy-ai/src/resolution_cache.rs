//! Fingerprinting for `ResolutionCache` entries: a stable content-addressed
//! key so Tier 3 can skip an LLM call for a target expression it has
//! already resolved in an identical context.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Hashes a target expression, its candidate set (order-independent), and
/// the enclosing file's language key into a single cache key. Two call
/// sites with the same expression, the same repo-local candidates, and the
/// same language share a cache entry even if they're in different files.
pub fn fingerprint(target_expression: &str, candidates: &[String], language_key: &str) -> String {
    let mut sorted_candidates = candidates.to_vec();
    sorted_candidates.sort();

    let mut hasher = DefaultHasher::new();
    target_expression.hash(&mut hasher);
    language_key.hash(&mut hasher);
    for candidate in &sorted_candidates {
        candidate.hash(&mut hasher);
    }
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_regardless_of_candidate_order() {
        let a = fingerprint("helper", &["a::helper()".into(), "b::helper()".into()], "rust");
        let b = fingerprint("helper", &["b::helper()".into(), "a::helper()".into()], "rust");
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_differs_by_language() {
        let a = fingerprint("helper", &[], "rust");
        let b = fingerprint("helper", &[], "python");
        assert_ne!(a, b);
    }
}
