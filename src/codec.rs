//! Register codec: splits a 64-bit hash into a register index and a rank.
//!
//! This is the sole place the split between "which register" and "the
//! observed rank for that register" is defined; both the merge engine and
//! the cardinality estimator depend on it being deterministic and pure.

/// Splits `hash` into `(index, sigma)` for a sketch with rank-width `k`
/// (`k = 64 - b`). `index` is the top `b` bits of `hash`; `sigma` is
/// `1 + leading_zeros` of the low `k` bits, or `k + 1` if those bits are
/// all zero. `sigma` is always in `[1, k + 1]`, which is at most 65 and
/// therefore always fits in a `u8`.
#[inline]
pub(crate) fn split(hash: u64, k: u32) -> (u16, u8) {
    let index = (hash >> k) as u16;
    (index, sigma(hash, k))
}

#[inline]
pub(crate) fn sigma(hash: u64, k: u32) -> u8 {
    let mask = (1u64 << k) - 1;
    let low = hash & mask;

    if low == 0 {
        return (k + 1) as u8;
    }

    // leading_zeros() counts from bit 63; we want leading zeros within the
    // k-bit window, i.e. starting at bit (k - 1).
    let clz_in_window = low.leading_zeros() - (64 - k);
    (1 + clz_in_window) as u8
}

#[cfg(test)]
mod codec_test {
    use super::*;

    #[test]
    fn register_codec_leading_zeros() {
        let k = 50; // b = 14

        assert_eq!(sigma(0, k), 51);
        assert_eq!(sigma(1, k), 50);
        assert_eq!(sigma(8, k), 47);
        assert_eq!(sigma((1u64 << 50) - 1, k), 1);
        assert_eq!(sigma(1u64 << 51, k), 51);
    }

    #[test]
    fn sigma_bounds_hold_for_all_precisions() {
        for b in 4u32..=16 {
            let k = 64 - b;
            for hash in [0u64, 1, u64::MAX, 1 << (k - 1), 1 << k] {
                let s = sigma(hash, k);
                assert!(s >= 1 && s as u32 <= k + 1, "b={b} hash={hash} sigma={s}");
            }
        }
    }

    #[test]
    fn index_is_top_b_bits() {
        let k = 50; // b = 14
        let hash = 0b101u64 << 50;
        let (index, _) = split(hash, k);
        assert_eq!(index, 0b101);
    }
}
