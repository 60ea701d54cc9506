use std::sync::Arc;

/// The hash boundary the sketch delegates to: any deterministic,
/// well-distributed `bytes -> u64` function. Cryptographic strength is not
/// required. Wrapped in an `Arc` so a `Sketch` stays
/// cheaply `Clone`-able and `Send + Sync` for the concurrent wrapper.
pub type HashFn = Arc<dyn Fn(&[u8]) -> u64 + Send + Sync>;

/// Default hash: a 64-bit truncation of XXH3-128, a modern non-cryptographic
/// 128-bit hash. See DESIGN.md for why this was chosen over a Murmur3
/// variant.
pub fn default_hash() -> HashFn {
    Arc::new(|bytes: &[u8]| twox_hash::xxh3::hash128(bytes) as u64)
}

#[cfg(test)]
mod hash_test {
    use super::*;

    #[test]
    fn default_hash_is_deterministic() {
        let h = default_hash();
        assert_eq!(h(b"hello"), h(b"hello"));
    }

    #[test]
    fn default_hash_distinguishes_inputs() {
        let h = default_hash();
        assert_ne!(h(b"hello"), h(b"world"));
    }

    #[test]
    fn default_hash_accepts_empty_input() {
        let h = default_hash();
        // empty input must hash deterministically rather than panicking,
        // per the resolved NullInput open question.
        let _ = h(b"");
    }
}
