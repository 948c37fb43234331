//! Hash-consed term monoid.
//!
//! A [`TermMonoid`] is the factory for all terms of one computation: every
//! distinct exponent vector is interned exactly once, so term identity is a
//! pointer comparison and the total degree and hash of a term are computed a
//! single time. Handles borrow from the monoid and cannot outlive it; handles
//! from different monoids must not be mixed.

use std::hash::{Hash, Hasher};
use std::ptr;

use ahash::{HashMap, HashMapExt};
use parking_lot::RwLock;
use smallvec::SmallVec;
use thiserror::Error;

use crate::parser;
use crate::parser::ParseError;
use crate::poly::{Degree, Exponent, INLINED_EXPONENTS};

pub type ExponentVec = SmallVec<[Exponent; INLINED_EXPONENTS]>;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MonoidError {
    #[error("expected {expected} exponents, got {got}")]
    WrongVariableCount { expected: usize, got: usize },
    #[error("exponent {exponent} of x[{index}] exceeds the monoid capacity {capacity}")]
    ExponentOverflow {
        index: usize,
        exponent: u32,
        capacity: u32,
    },
    #[error("terms belong to different monoids")]
    MonoidMismatch,
}

/// The interned payload of a term: its exponent vector and the attributes
/// derived from it once, at interning time.
pub struct TermData {
    exponents: ExponentVec,
    degree: Degree,
    hash: u64,
}

/// The factory and owner of all terms over `nvars` indeterminates.
///
/// `hash_bits` is the per-exponent bit budget of the degree-packed hash:
/// the hash of a term is `e[0]` shifted left by `hash_bits` and incremented
/// by `e[i]` for each subsequent exponent. With `nvars * hash_bits <= 64`
/// the hash is an exact packed encoding and collision-free; beyond that the
/// leading exponents shift out of the word and it degrades to an ordinary
/// hash, which the intern table tolerates. The per-variable capacity checked
/// at the boundaries is `2^hash_bits - 1`.
pub struct TermMonoid {
    nvars: usize,
    hash_bits: u32,
    capacity: u32,
    interned: RwLock<HashMap<u64, Vec<Box<TermData>>>>,
    one: *const TermData,
}

// The intern table is guarded by the lock and the boxed payloads are
// immutable once published, so sharing the monoid across threads is sound.
unsafe impl Send for TermMonoid {}
unsafe impl Sync for TermMonoid {}

impl TermMonoid {
    /// Create a monoid for `nvars >= 1` indeterminates with a per-exponent
    /// hash budget of `hash_bits` in `1..=16`.
    pub fn new(nvars: usize, hash_bits: u32) -> TermMonoid {
        assert!(nvars >= 1, "a term monoid needs at least one indeterminate");
        assert!(
            (1..=16).contains(&hash_bits),
            "the per-exponent bit budget must be in 1..=16"
        );

        let mut monoid = TermMonoid {
            nvars,
            hash_bits,
            capacity: (1u32 << hash_bits) - 1,
            interned: RwLock::new(HashMap::new()),
            one: ptr::null(),
        };

        let zeros = vec![0; nvars];
        let one: *const TermData = monoid.intern(&zeros);
        monoid.one = one;
        monoid
    }

    #[inline]
    pub fn nvars(&self) -> usize {
        self.nvars
    }

    #[inline]
    pub fn hash_bits(&self) -> u32 {
        self.hash_bits
    }

    /// The largest exponent a single indeterminate may carry.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// The term with all exponents zero.
    #[inline]
    pub fn one(&self) -> Term<'_> {
        Term {
            // set at construction and never touched again
            data: unsafe { &*self.one },
            monoid: self,
        }
    }

    /// Intern `exps` and return its unique handle. Two calls with equal
    /// exponent vectors return the same handle, also when racing from
    /// different threads.
    pub fn create(&self, exps: &[Exponent]) -> Result<Term<'_>, MonoidError> {
        if exps.len() != self.nvars {
            return Err(MonoidError::WrongVariableCount {
                expected: self.nvars,
                got: exps.len(),
            });
        }

        for (i, &e) in exps.iter().enumerate() {
            if e as u32 > self.capacity {
                return Err(MonoidError::ExponentOverflow {
                    index: i,
                    exponent: e as u32,
                    capacity: self.capacity,
                });
            }
        }

        Ok(Term {
            data: self.intern(exps),
            monoid: self,
        })
    }

    /// Parse a single term such as `x[1]^2*x[3]` and intern it. `min` is the
    /// smallest accepted indeterminate index; `x[k]` maps to position
    /// `k - min`.
    pub fn create_from_string(&self, s: &str, min: u16) -> Result<Term<'_>, ParseError> {
        parser::parse_term(self, s, min)
    }

    /// The number of terms interned so far.
    pub fn len(&self) -> usize {
        self.interned.read().values().map(|b| b.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        // the one is interned at construction
        false
    }

    /// Degree-weighted hash of an exponent vector: a packed radix-`2^D`
    /// encoding when every exponent fits the budget.
    #[inline]
    fn hash_exponents(&self, exps: &[Exponent]) -> u64 {
        let mut hash = exps[0] as u64;
        for &e in &exps[1..] {
            hash = (hash << self.hash_bits).wrapping_add(e as u64);
        }
        hash
    }

    /// Insert-or-return on the intern table. The fast path takes the read
    /// lock only; a miss re-probes under the write lock so that racing
    /// inserts of the same vector converge to one handle.
    pub(crate) fn intern(&self, exps: &[Exponent]) -> &TermData {
        debug_assert_eq!(exps.len(), self.nvars);
        let hash = self.hash_exponents(exps);

        {
            let map = self.interned.read();
            if let Some(bucket) = map.get(&hash) {
                if let Some(t) = bucket.iter().find(|t| t.exponents.as_slice() == exps) {
                    return unsafe { extend_term_lifetime(t.as_ref()) };
                }
            }
        }

        let mut map = self.interned.write();
        let bucket = map.entry(hash).or_default();
        if let Some(t) = bucket.iter().find(|t| t.exponents.as_slice() == exps) {
            return unsafe { extend_term_lifetime(t.as_ref()) };
        }

        let data = Box::new(TermData {
            exponents: ExponentVec::from_slice(exps),
            degree: exps.iter().map(|&e| e as Degree).sum(),
            hash,
        });
        let out = unsafe { extend_term_lifetime(data.as_ref()) };
        bucket.push(data);
        out
    }
}

/// Detach an interned payload from the lock guard's borrow.
///
/// Sound because the store is append-only: a published box is neither freed
/// nor moved before the monoid itself drops, and the returned lifetime is
/// capped by the borrow of the monoid.
#[inline]
unsafe fn extend_term_lifetime<'m>(t: &TermData) -> &'m TermData {
    &*(t as *const TermData)
}

impl std::fmt::Debug for TermMonoid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermMonoid")
            .field("nvars", &self.nvars)
            .field("hash_bits", &self.hash_bits)
            .field("terms", &self.len())
            .finish()
    }
}

/// A canonical term: an immutable handle to an interned exponent vector.
///
/// Handles are small `Copy` values. Two handles obtained from the same monoid
/// for the same exponent vector are identical; equality first compares the
/// interned pointers and only falls back to the exponent vectors for handles
/// of different monoids.
#[derive(Copy, Clone)]
pub struct Term<'m> {
    data: &'m TermData,
    monoid: &'m TermMonoid,
}

impl<'m> Term<'m> {
    /// The monoid that owns this term.
    #[inline]
    pub fn monoid(&self) -> &'m TermMonoid {
        self.monoid
    }

    #[inline]
    pub fn exponents(&self) -> &'m [Exponent] {
        &self.data.exponents
    }

    /// The exponent of the `i`-th indeterminate.
    #[inline]
    pub fn at(&self, i: usize) -> Exponent {
        self.data.exponents[i]
    }

    /// The total degree, precomputed at interning time.
    #[inline]
    pub fn deg(&self) -> Degree {
        self.data.degree
    }

    /// The degree-packed hash, precomputed at interning time.
    #[inline]
    pub fn hash_value(&self) -> u64 {
        self.data.hash
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.exponents.len()
    }

    #[inline]
    pub fn is_one(&self) -> bool {
        self.data.degree == 0
    }

    /// Identity comparison: true iff both handles point at the same interned
    /// payload.
    #[inline]
    pub fn same_handle(&self, other: &Term<'_>) -> bool {
        ptr::eq(self.data, other.data as *const TermData)
    }

    /// The product of two terms. Multiplying by the one returns the other
    /// operand unchanged.
    ///
    /// Exponent overflow and monoid mixing are debug-asserted only; callers
    /// that cannot guarantee the preconditions use [`Term::checked_mul`].
    pub fn mul(self, other: Term<'m>) -> Term<'m> {
        debug_assert!(ptr::eq(self.monoid, other.monoid));

        if other.data.degree == 0 {
            return self;
        }
        if self.data.degree == 0 {
            return other;
        }

        let mut sum = ExponentVec::with_capacity(self.len());
        for (a, b) in self.exponents().iter().zip(other.exponents()) {
            debug_assert!(*a as u32 + *b as u32 <= self.monoid.capacity);
            sum.push(a + b);
        }

        Term {
            data: self.monoid.intern(&sum),
            monoid: self.monoid,
        }
    }

    /// Checked variant of [`Term::mul`] for operation boundaries.
    pub fn checked_mul(self, other: Term<'m>) -> Result<Term<'m>, MonoidError> {
        if !ptr::eq(self.monoid, other.monoid) {
            return Err(MonoidError::MonoidMismatch);
        }

        for (i, (a, b)) in self.exponents().iter().zip(other.exponents()).enumerate() {
            let e = *a as u32 + *b as u32;
            if e > self.monoid.capacity {
                return Err(MonoidError::ExponentOverflow {
                    index: i,
                    exponent: e,
                    capacity: self.monoid.capacity,
                });
            }
        }

        Ok(self.mul(other))
    }

    /// The quotient `self / other`. The caller must ensure divisibility;
    /// underflow is debug-asserted only.
    pub fn div(self, other: Term<'m>) -> Term<'m> {
        debug_assert!(ptr::eq(self.monoid, other.monoid));
        debug_assert!(self.is_divisible_by(&other));

        if other.data.degree == 0 {
            return self;
        }

        let mut diff = ExponentVec::with_capacity(self.len());
        for (a, b) in self.exponents().iter().zip(other.exponents()) {
            diff.push(a - b);
        }

        Term {
            data: self.monoid.intern(&diff),
            monoid: self.monoid,
        }
    }

    /// The least common multiple: the componentwise maximum of the exponents.
    pub fn lcm(self, other: Term<'m>) -> Term<'m> {
        debug_assert!(ptr::eq(self.monoid, other.monoid));

        if self.same_handle(&other) || other.data.degree == 0 {
            return self;
        }
        if self.data.degree == 0 {
            return other;
        }

        let mut max = ExponentVec::with_capacity(self.len());
        for (a, b) in self.exponents().iter().zip(other.exponents()) {
            max.push(*a.max(b));
        }

        Term {
            data: self.monoid.intern(&max),
            monoid: self.monoid,
        }
    }

    /// True iff every exponent of `other` is bounded by the matching
    /// exponent of `self`.
    #[inline]
    pub fn is_divisible_by(&self, other: &Term<'_>) -> bool {
        if other.data.degree == 0 {
            return true;
        }
        if self.data.degree < other.data.degree {
            return false;
        }

        self.exponents()
            .iter()
            .zip(other.exponents())
            .all(|(a, b)| a >= b)
    }
}

impl PartialEq for Term<'_> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.same_handle(other) || self.data.exponents == other.data.exponents
    }
}

impl Eq for Term<'_> {}

impl Hash for Term<'_> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.data.hash);
    }
}

impl std::fmt::Debug for Term<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Term({})", self)
    }
}

impl std::fmt::Display for Term<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        crate::printer::fmt_term(f, self, 1)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let monoid = TermMonoid::new(3, 8);
        let a = monoid.create(&[1, 2, 3]).unwrap();
        let b = monoid.create(&[1, 2, 3]).unwrap();
        let c = monoid.create(&[1, 2, 4]).unwrap();

        assert!(a.same_handle(&b));
        assert!(!a.same_handle(&c));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.exponents(), &[1, 2, 3]);
        // one plus two distinct terms
        assert_eq!(monoid.len(), 3);
    }

    #[test]
    fn degree_packed_hash() {
        let monoid = TermMonoid::new(3, 8);
        let t = monoid.create(&[1, 2, 3]).unwrap();
        assert_eq!(t.hash_value(), (1 << 16) + (2 << 8) + 3);
        assert_eq!(t.deg(), 6);
    }

    #[test]
    fn hash_collisions_are_tolerated() {
        // nine exponents at eight bits overflow the 64-bit hash, so vectors
        // differing only in the first coordinate collide
        let monoid = TermMonoid::new(9, 8);
        let a = monoid.create(&[1, 2, 2, 2, 2, 2, 2, 2, 2]).unwrap();
        let b = monoid.create(&[5, 2, 2, 2, 2, 2, 2, 2, 2]).unwrap();

        assert_eq!(a.hash_value(), b.hash_value());
        assert!(!a.same_handle(&b));
        assert_ne!(a, b);
        assert!(a.same_handle(&monoid.create(&[1, 2, 2, 2, 2, 2, 2, 2, 2]).unwrap()));
    }

    #[test]
    fn one_is_cached() {
        let monoid = TermMonoid::new(2, 8);
        let one = monoid.one();
        assert!(one.is_one());
        assert_eq!(one.deg(), 0);
        assert!(one.same_handle(&monoid.create(&[0, 0]).unwrap()));
    }

    #[test]
    fn create_checks_the_boundary() {
        let monoid = TermMonoid::new(2, 8);
        assert_eq!(
            monoid.create(&[1, 2, 3]),
            Err(MonoidError::WrongVariableCount {
                expected: 2,
                got: 3
            })
        );
        assert_eq!(
            monoid.create(&[1, 256]),
            Err(MonoidError::ExponentOverflow {
                index: 1,
                exponent: 256,
                capacity: 255
            })
        );
    }

    #[test]
    fn term_algebra() {
        let monoid = TermMonoid::new(2, 8);
        let a = monoid.create(&[3, 1]).unwrap();
        let b = monoid.create(&[1, 2]).unwrap();

        let ab = a.mul(b);
        assert_eq!(ab.exponents(), &[4, 3]);
        assert_eq!(ab.deg(), a.deg() + b.deg());
        assert!(ab.same_handle(&b.mul(a)));

        assert!(ab.is_divisible_by(&a));
        assert!(ab.is_divisible_by(&b));
        assert!(ab.div(b).same_handle(&a));

        // mul by one returns the operand itself
        assert!(a.mul(monoid.one()).same_handle(&a));
        assert!(monoid.one().mul(a).same_handle(&a));
    }

    #[test]
    fn lcm_is_the_least_upper_bound() {
        let monoid = TermMonoid::new(2, 8);
        // a = x[1]^3*x[2], b = x[1]*x[2]^2
        let a = monoid.create(&[3, 1]).unwrap();
        let b = monoid.create(&[1, 2]).unwrap();

        let l = a.lcm(b);
        assert_eq!(l.exponents(), &[3, 2]);
        assert!(l.is_divisible_by(&a));
        assert!(l.is_divisible_by(&b));
        assert_eq!(l.div(a).exponents(), &[0, 1]);
        assert_eq!(l.div(b).exponents(), &[2, 0]);
    }

    #[test]
    fn checked_mul_reports_overflow() {
        let monoid = TermMonoid::new(2, 8);
        let a = monoid.create(&[200, 0]).unwrap();
        let b = monoid.create(&[100, 0]).unwrap();
        assert_eq!(
            a.checked_mul(b),
            Err(MonoidError::ExponentOverflow {
                index: 0,
                exponent: 300,
                capacity: 255
            })
        );

        let other = TermMonoid::new(2, 8);
        let c = other.create(&[1, 0]).unwrap();
        assert_eq!(a.checked_mul(c), Err(MonoidError::MonoidMismatch));
    }

    #[test]
    fn concurrent_interning_converges() {
        let monoid = TermMonoid::new(4, 8);

        let all: Vec<Vec<usize>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        (0..100u16)
                            .map(|i| {
                                let t =
                                    monoid.create(&[i % 10, i % 7, i % 5, i % 3]).unwrap();
                                t.exponents().as_ptr() as usize
                            })
                            .collect()
                    })
                })
                .collect();

            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        // every thread converged on the very same interned payloads; the
        // vector for i = 0 is the cached one
        for run in &all[1..] {
            assert_eq!(run, &all[0]);
        }
        assert_eq!(monoid.len(), 100);
    }
}
