//! Trivial typed encoders for callers who want to add non-byte-slice
//! values to a sketch. These do no hashing themselves; they
//! just produce the byte slice that `Sketch::add` expects.

/// UTF-8 bytes of `value`.
pub fn bytes_of_str(value: &str) -> &[u8] {
    value.as_bytes()
}

pub fn bytes_of_u64(value: u64) -> [u8; 8] {
    value.to_le_bytes()
}

pub fn bytes_of_i64(value: i64) -> [u8; 8] {
    value.to_le_bytes()
}

/// IEEE-754 bit pattern, little-endian. Note that `-0.0` and `0.0` encode
/// to different byte patterns, so callers hashing floats that may carry a
/// sign on zero should normalize first if that distinction is unwanted.
pub fn bytes_of_f64(value: f64) -> [u8; 8] {
    value.to_bits().to_le_bytes()
}
