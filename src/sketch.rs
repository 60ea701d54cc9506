use crate::codec;
use crate::dense::DenseRegisters;
use crate::error::HllError;
use crate::estimator;
use crate::exact::ExactSet;
use crate::hash::{HashFn, default_hash};
use crate::precision::Precision;
use crate::sparse::SparseRegisters;

/// The active representation of a sketch's register store. Exactly one
/// variant is active at a time; transitions only ever
/// move down this list, never back up (representation
/// monotonicity).
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Store {
    Exact(ExactSet),
    Sparse(SparseRegisters),
    Dense(DenseRegisters),
}

/// A probabilistic cardinality sketch: exact below 100 distinct elements,
/// HyperLogLog-estimated above it.
///
/// Not thread-safe; see [`crate::concurrent::ConcurrentSketch`] for a
/// wrapper with a readers-writer discipline.
pub struct Sketch {
    pub(crate) precision: Precision,
    pub(crate) direct_counting: bool,
    pub(crate) hash: HashFn,
    pub(crate) store: Store,
    pub(crate) count_additions: u64,
}

impl Sketch {
    /// Creates an empty sketch with the given precision, using the default
    /// hash function. `direct_counting` enables the exact tier for
    /// cardinalities up to 100.
    pub fn new(b: u32, direct_counting: bool) -> Result<Self, HllError> {
        Self::with_hash(b, direct_counting, default_hash())
    }

    /// As [`Sketch::new`], but with a caller-supplied hash delegate.
    pub fn with_hash(b: u32, direct_counting: bool, hash: HashFn) -> Result<Self, HllError> {
        let precision = Precision::new(b)?;
        let store = if direct_counting {
            Store::Exact(ExactSet::new())
        } else {
            Store::Sparse(SparseRegisters::new())
        };

        Ok(Self {
            precision,
            direct_counting,
            hash,
            store,
            count_additions: 0,
        })
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn count_additions(&self) -> u64 {
        self.count_additions
    }

    /// Adds `bytes`, returning true iff the store changed (new register
    /// reached, new rank reached, or a representation transition
    /// occurred). `count_additions` is always incremented, regardless of
    /// the return value.
    pub fn add(&mut self, bytes: &[u8]) -> bool {
        let h = (self.hash)(bytes);
        self.count_additions += 1;
        self.mutate_store(h)
    }

    /// The store-mutation half of `add`, split out so the concurrent
    /// wrapper can increment its own atomic counter before acquiring the
    /// writer lock instead of going through this sketch's plain field
    /// twice. Hashing stays in `add` since this half is pure and
    /// side-effect free; only the counter bump and locking differ by
    /// caller.
    pub(crate) fn mutate_store(&mut self, h: u64) -> bool {
        let mut changed = false;

        if let Store::Exact(set) = &mut self.store {
            changed |= set.insert(h);

            if set.is_over_threshold() {
                tracing::debug!(b = self.precision.b(), "exact tier exceeded 100 distinct hashes, transitioning to sparse/dense");
                self.store = upgrade_exact(set, &self.precision);
                changed = true;
            }
        }

        let (index, sigma) = codec::split(h, self.precision.k());

        match &mut self.store {
            Store::Exact(_) => {}
            Store::Sparse(sparse) => {
                changed |= sparse.set_if_greater(index, sigma);
                if sparse.is_over_capacity(&self.precision) {
                    tracing::debug!(b = self.precision.b(), "sparse tier exceeded capacity, transitioning to dense");
                    self.store = Store::Dense(sparse.to_dense(&self.precision));
                    changed = true;
                }
            }
            Store::Dense(dense) => {
                changed |= dense.set_if_greater(index, sigma);
            }
        }

        changed
    }

    pub(crate) fn hash_bytes(&self, bytes: &[u8]) -> u64 {
        (self.hash)(bytes)
    }

    /// Returns the cardinality estimate. Pure read, idempotent.
    pub fn count(&self) -> u64 {
        match &self.store {
            Store::Exact(set) => set.len() as u64,
            Store::Sparse(sparse) => {
                let m = self.precision.m();
                let zero_count = m - sparse.len() as u32;
                let mut z_inv = zero_count as f64; // absences contribute 2^0 = 1 each
                for (_, rank) in sparse.iter() {
                    z_inv += 2f64.powi(-(rank as i32));
                }
                estimator::estimate(&self.precision, z_inv, zero_count)
            }
            Store::Dense(dense) => {
                let (z_inv, zero_count) = dense.indicator();
                estimator::estimate(&self.precision, z_inv, zero_count)
            }
        }
    }

    /// In-place union-merge of `other` into `self`. Both
    /// sketches must share the same `m`.
    pub fn merge(&mut self, other: &Self) -> Result<(), HllError> {
        if let Err(e) = self.precision.settings_check(&other.precision) {
            tracing::warn!(
                left_m = self.precision.m(),
                right_m = other.precision.m(),
                "attempted merge of incompatible precisions"
            );
            return Err(e);
        }

        self.count_additions += other.count_additions;
        self.merge_store(&other.store);

        Ok(())
    }

    /// The store-merge half of `merge`, split out so the concurrent
    /// wrapper can add `other`'s atomic counter into its own before taking
    /// both writer locks, rather than relying on this sketch's plain
    /// `count_additions` field. Assumes the precision check
    /// already passed.
    pub(crate) fn merge_store(&mut self, other: &Store) {
        if let (Store::Exact(a), Store::Exact(b)) = (&mut self.store, other) {
            a.union(b);
            if a.is_over_threshold() {
                self.store = upgrade_exact(a, &self.precision);
            }
            return;
        }

        // If other was not exact, self drops its exact set regardless.
        if let Store::Exact(set) = &self.store {
            self.store = upgrade_exact(set, &self.precision);
        }

        match (&mut self.store, other) {
            (Store::Sparse(a), Store::Sparse(b)) => {
                a.union(b);
                if a.is_over_capacity(&self.precision) {
                    self.store = Store::Dense(a.to_dense(&self.precision));
                }
            }
            (Store::Sparse(a), Store::Dense(b)) => {
                let mut dense = a.to_dense(&self.precision);
                dense.union_with(b.iter().enumerate().map(|(i, r)| (i as u16, r)));
                self.store = Store::Dense(dense);
            }
            (Store::Sparse(a), Store::Exact(b)) => {
                for h in b.iter() {
                    let (index, sigma) = codec::split(h, self.precision.k());
                    a.set_if_greater(index, sigma);
                }
                if a.is_over_capacity(&self.precision) {
                    self.store = Store::Dense(a.to_dense(&self.precision));
                }
            }
            (Store::Dense(a), Store::Sparse(b)) => {
                a.union_with(b.iter());
            }
            (Store::Dense(a), Store::Dense(b)) => {
                a.union_with(b.iter().enumerate().map(|(i, r)| (i as u16, r)));
            }
            (Store::Dense(a), Store::Exact(b)) => {
                for h in b.iter() {
                    let (index, sigma) = codec::split(h, self.precision.k());
                    a.set_if_greater(index, sigma);
                }
            }
            (Store::Exact(_), _) => unreachable!("self was upgraded out of exact above"),
        }
    }

    /// Builds a new sketch by cloning the first non-null sketch and
    /// merging each subsequent non-null sketch into it. Returns `None` if
    /// no input sketch is non-null.
    pub fn merge_all<'a, I>(sketches: I) -> Result<Option<Self>, HllError>
    where
        I: IntoIterator<Item = &'a Option<Sketch>>,
    {
        let mut iter = sketches.into_iter().filter_map(|s| s.as_ref());

        let Some(first) = iter.next() else {
            return Ok(None);
        };

        let mut result = first.clone();
        for sketch in iter {
            result.merge(sketch)?;
        }

        Ok(Some(result))
    }
}

impl Clone for Sketch {
    fn clone(&self) -> Self {
        Self {
            precision: self.precision,
            direct_counting: self.direct_counting,
            hash: self.hash.clone(),
            store: self.store.clone(),
            count_additions: self.count_additions,
        }
    }
}

impl std::fmt::Debug for Sketch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sketch")
            .field("precision", &self.precision)
            .field("direct_counting", &self.direct_counting)
            .field("store", &self.store)
            .field("count_additions", &self.count_additions)
            .finish()
    }
}

impl PartialEq for Sketch {
    fn eq(&self, other: &Self) -> bool {
        self.precision == other.precision
            && self.store == other.store
            && self.count_additions == other.count_additions
    }
}

/// Rebuilds a sparse (or, if already over capacity, dense) store from an
/// exact set's hashes, used both when the exact tier overflows 100
/// distinct hashes and when reconstructing a persisted exact-tier sketch
/// (exact-tier population on reconstruction).
pub(crate) fn upgrade_exact(set: &ExactSet, precision: &Precision) -> Store {
    let mut sparse = SparseRegisters::new();
    for hash in set.iter() {
        let (index, sigma) = codec::split(hash, precision.k());
        sparse.set_if_greater(index, sigma);
    }

    if sparse.is_over_capacity(precision) {
        Store::Dense(sparse.to_dense(precision))
    } else {
        Store::Sparse(sparse)
    }
}

#[cfg(test)]
mod sketch_test {
    use super::*;

    #[test]
    fn exact_below_threshold() {
        let mut sketch = Sketch::new(14, true).unwrap();
        for i in 0..50 {
            sketch.add(format!("item-{i}").as_bytes());
        }
        assert_eq!(sketch.count(), 50);
    }

    #[test]
    fn exact_is_exact_even_for_duplicates() {
        let mut sketch = Sketch::new(10, true).unwrap();
        for _ in 0..20 {
            sketch.add(b"same-item");
        }
        assert_eq!(sketch.count(), 1);
        assert_eq!(sketch.count_additions(), 20);
    }

    #[test]
    fn count_additions_counts_every_call() {
        let mut sketch = Sketch::new(10, false).unwrap();
        for i in 0..500 {
            sketch.add(format!("item-{i}").as_bytes());
        }
        assert_eq!(sketch.count_additions(), 500);
    }

    #[test]
    fn exact_transitions_past_100_distinct() {
        let mut sketch = Sketch::new(14, true).unwrap();
        for i in 0..150u64 {
            sketch.add(&i.to_le_bytes());
        }
        assert!(matches!(sketch.store, Store::Sparse(_) | Store::Dense(_)));
        // every hash added must still be reflected once out of exact tier.
        let count = sketch.count();
        assert!((count as i64 - 150).unsigned_abs() < 20);
    }

    #[test]
    fn merge_rejects_mismatched_precision() {
        let mut a = Sketch::new(10, false).unwrap();
        let b = Sketch::new(11, false).unwrap();
        assert!(matches!(
            a.merge(&b),
            Err(HllError::IncompatiblePrecision { .. })
        ));
    }

    #[test]
    fn merge_preserves_additions() {
        let mut a = Sketch::new(10, true).unwrap();
        a.add(b"x");
        a.add(b"y");
        let mut b = Sketch::new(10, true).unwrap();
        b.add(b"z");

        a.merge(&b).unwrap();
        assert_eq!(a.count_additions(), 3);
    }

    #[test]
    fn merge_result_at_least_max_of_inputs() {
        let mut a = Sketch::new(12, false).unwrap();
        let mut b = Sketch::new(12, false).unwrap();
        for i in 0..200u64 {
            a.add(&i.to_le_bytes());
        }
        for i in 100..400u64 {
            b.add(&i.to_le_bytes());
        }

        let count_a = a.count();
        let count_b = b.count();
        a.merge(&b).unwrap();

        assert!(a.count() >= count_a);
        assert!(a.count() >= count_b);
    }

    #[test]
    fn dense_union_is_elementwise_max() {
        let mut a = Sketch::new(10, false).unwrap();
        let mut b = Sketch::new(10, false).unwrap();
        for i in 0..2000u64 {
            a.add(&i.to_le_bytes());
        }
        for i in 0..2000u64 {
            b.add(&(i + 1).to_le_bytes());
        }

        let mut expected = a.clone();
        if let (Store::Dense(ea), Store::Dense(eb)) = (&mut expected.store, &b.store) {
            ea.union_with(eb.iter().enumerate().map(|(i, r)| (i as u16, r)));
        } else {
            panic!("expected both sketches to be dense at this cardinality");
        }

        a.merge(&b).unwrap();
        assert_eq!(a.store, expected.store);
    }

    #[test]
    fn dense_merge_at_max_precision_does_not_panic() {
        // b=16 -> m=65536, so register indices span the full u16 range;
        // a RangeFrom<u16> counter would overflow mid-merge here.
        let mut a = Sketch::new(16, false).unwrap();
        let mut b = Sketch::new(16, false).unwrap();
        for i in 0..200_000u64 {
            a.add(&i.to_le_bytes());
        }
        for i in 100_000..300_000u64 {
            b.add(&i.to_le_bytes());
        }

        assert!(matches!(a.store, Store::Dense(_)));
        assert!(matches!(b.store, Store::Dense(_)));

        a.merge(&b).unwrap();
        assert!((a.count() as i64 - 300_000).unsigned_abs() < 15_000);
    }

    #[test]
    fn merge_all_returns_none_for_no_sketches() {
        let sketches: Vec<Option<Sketch>> = vec![None, None];
        assert_eq!(Sketch::merge_all(&sketches).unwrap(), None);
    }

    #[test]
    fn merge_all_unions_every_non_null_sketch() {
        let mut a = Sketch::new(10, false).unwrap();
        a.add(b"a");
        let mut b = Sketch::new(10, false).unwrap();
        b.add(b"b");

        let sketches = vec![None, Some(a), None, Some(b)];
        let merged = Sketch::merge_all(&sketches).unwrap().unwrap();
        assert_eq!(merged.count_additions(), 2);
        assert_eq!(merged.count(), 2);
    }

    #[test]
    fn merge_with_random_inputs_never_loses_cardinality() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(0xC0FFEE);

        for _ in 0..20 {
            let mut a = Sketch::new(12, false).unwrap();
            let mut b = Sketch::new(12, false).unwrap();

            for _ in 0..rng.random_range(0..3000) {
                a.add(&rng.random::<u64>().to_le_bytes());
            }
            for _ in 0..rng.random_range(0..3000) {
                b.add(&rng.random::<u64>().to_le_bytes());
            }

            let count_a = a.count();
            let count_b = b.count();
            a.merge(&b).unwrap();

            assert!(a.count() >= count_a);
            assert!(a.count() >= count_b);
        }
    }
}
