//! A HyperLogLog cardinality sketch.
//!
//! Estimates the number of distinct elements added to it, in bounded
//! memory, switching between three internal representations as the
//! cardinality grows: an exact set for small cardinalities, then a sparse
//! register map, then a dense register array (the classic HyperLogLog
//! structure with small-range bias correction and a LinearCounting
//! fallback).
//!
//! ```
//! use hyperloglog_sketch::Sketch;
//!
//! let mut sketch = Sketch::new(14, true).unwrap();
//! sketch.add(b"alice");
//! sketch.add(b"bob");
//! sketch.add(b"alice");
//! assert_eq!(sketch.count(), 2);
//! ```
//!
//! For concurrent use, wrap in [`ConcurrentSketch`].

mod bias;
mod codec;
mod concurrent;
mod dense;
pub mod encode;
mod error;
mod estimator;
mod exact;
mod hash;
mod precision;
mod sketch;
mod sparse;
mod wire;

pub use concurrent::ConcurrentSketch;
pub use error::HllError;
pub use hash::{default_hash, HashFn};
pub use precision::{Precision, EXACT_THRESHOLD};
pub use sketch::Sketch;
