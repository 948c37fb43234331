//! The polynomial data model.
//!
//! A polynomial is a pair of parallel rows: coefficients and interned term
//! handles, plus the sugar degree used by F4 selection strategies. The rows
//! carry no field and no ordering; [`Polynomial::bring_in`] and
//! [`Polynomial::order`] put a polynomial into canonical form with respect to
//! a field and an ordering, which may both be swapped at runtime.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use ahash::{HashMap, HashMapExt};
use rayon::prelude::*;
use thiserror::Error;

use crate::finite_field::{Coeff, PrimeField};
use crate::parser::{self, ParseError};
use crate::poly::monoid::{Term, TermMonoid};
use crate::poly::{MonomialOrder, TermOrder};
use crate::printer::PolynomialPrinter;

/// A coefficient together with a term, e.g. `3*x[1]^2*x[2]`.
pub type Monomial<'m> = (Coeff, Term<'m>);

/// Produced by [`Polynomial::assert_canonical`] when a polynomial is not in
/// canonical form. Hot paths never perform these checks.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("coefficient {value} at position {index} is outside [1, p)")]
    CoefficientOutOfRange { index: usize, value: Coeff },
    #[error("support is not strictly decreasing at position {index}")]
    UnsortedSupport { index: usize },
    #[error("duplicate term at position {index}")]
    DuplicateTerm { index: usize },
    #[error("leading coefficient is {value}, expected 1")]
    NotNormalized { value: Coeff },
}

/// A finite ordered sequence of monomials plus a sugar degree.
///
/// The canonical-form invariants (coefficients in `[0, p)`, support strictly
/// decreasing under the active ordering, leading coefficient 1 after
/// normalization) are established by `bring_in`/`order`/`normalize` and
/// assumed, not re-checked, by the algebraic operations.
#[derive(Clone)]
pub struct Polynomial<'m> {
    coefficients: Vec<Coeff>,
    terms: Vec<Term<'m>>,
    sugar: u32,
}

impl<'m> Polynomial<'m> {
    /// The zero polynomial: empty support, sugar zero.
    pub fn new() -> Polynomial<'m> {
        Polynomial {
            coefficients: vec![],
            terms: vec![],
            sugar: 0,
        }
    }

    /// An empty polynomial whose monomials are pushed afterwards.
    pub fn with_sugar(sugar: u32) -> Polynomial<'m> {
        Polynomial {
            coefficients: vec![],
            terms: vec![],
            sugar,
        }
    }

    /// The polynomial `1 * t`.
    pub fn from_term(t: Term<'m>) -> Polynomial<'m> {
        Polynomial {
            coefficients: vec![1],
            terms: vec![t],
            sugar: 0,
        }
    }

    /// Construct from parallel coefficient and term rows.
    pub fn from_parts(coefficients: Vec<Coeff>, terms: Vec<Term<'m>>) -> Polynomial<'m> {
        assert_eq!(coefficients.len(), terms.len());
        Polynomial {
            coefficients,
            terms,
            sugar: 0,
        }
    }

    /// Construct from a monomial list. With `purify`, duplicate terms are
    /// folded by summing their coefficients (keeping the first position) and
    /// monomials whose coefficient sums to zero are dropped.
    pub fn from_monomials(monomials: &[Monomial<'m>], purify: bool) -> Polynomial<'m> {
        if !purify {
            let (coefficients, terms): (Vec<_>, Vec<_>) =
                monomials.iter().copied().unzip();
            return Polynomial::from_parts(coefficients, terms);
        }

        let mut coefficients: Vec<Coeff> = Vec::with_capacity(monomials.len());
        let mut terms: Vec<Term<'m>> = Vec::with_capacity(monomials.len());
        let mut positions: HashMap<Term<'m>, usize> = HashMap::with_capacity(monomials.len());

        for &(c, t) in monomials {
            match positions.entry(t) {
                std::collections::hash_map::Entry::Occupied(o) => {
                    coefficients[*o.get()] += c;
                }
                std::collections::hash_map::Entry::Vacant(v) => {
                    v.insert(terms.len());
                    coefficients.push(c);
                    terms.push(t);
                }
            }
        }

        let mut poly = Polynomial {
            coefficients,
            terms,
            sugar: 0,
        };
        poly.drop_zeros();
        poly
    }

    /// Parse a polynomial such as `x[1]^2 + 2*x[1]*x[2] - 5` over the given
    /// monoid. `min` fixes the smallest accepted indeterminate index. The
    /// result is purified but neither ordered nor brought into a field.
    pub fn parse(
        s: &str,
        monoid: &'m TermMonoid,
        min: u16,
    ) -> Result<Polynomial<'m>, ParseError> {
        parser::parse_polynomial(monoid, s, min)
    }

    /// Parse a `, `-separated list of polynomials.
    pub fn parse_list(
        s: &str,
        monoid: &'m TermMonoid,
        min: u16,
    ) -> Result<Vec<Polynomial<'m>>, ParseError> {
        parser::parse_polynomial_list(monoid, s, min)
    }

    /// Append a monomial without reordering.
    #[inline]
    pub fn push(&mut self, c: Coeff, t: Term<'m>) {
        self.coefficients.push(c);
        self.terms.push(t);
    }

    /// The number of monomials.
    #[inline]
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    /// A polynomial is zero iff its support is empty. Canonicalization drops
    /// zero coefficients, so a non-empty support implies a non-zero leading
    /// coefficient.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.coefficients.is_empty()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    #[inline]
    pub fn coeff(&self, i: usize) -> Coeff {
        self.coefficients[i]
    }

    #[inline]
    pub fn term(&self, i: usize) -> Term<'m> {
        self.terms[i]
    }

    #[inline]
    pub fn monomial(&self, i: usize) -> Monomial<'m> {
        (self.coefficients[i], self.terms[i])
    }

    /// The term row.
    #[inline]
    pub fn support(&self) -> &[Term<'m>] {
        &self.terms
    }

    /// The coefficient row.
    #[inline]
    pub fn coefficients(&self) -> &[Coeff] {
        &self.coefficients
    }

    pub fn iter(&self) -> impl Iterator<Item = Monomial<'m>> + '_ {
        self.coefficients.iter().copied().zip(self.terms.iter().copied())
    }

    /// The leading term. Undefined on the zero polynomial.
    #[inline]
    pub fn lt(&self) -> Term<'m> {
        self.terms[0]
    }

    /// The leading coefficient. Undefined on the zero polynomial.
    #[inline]
    pub fn lc(&self) -> Coeff {
        self.coefficients[0]
    }

    /// The least common multiple of the leading terms of `self` and `other`.
    #[inline]
    pub fn lcm_lt(&self, other: &Polynomial<'m>) -> Term<'m> {
        self.lt().lcm(other.lt())
    }

    #[inline]
    pub fn sugar(&self) -> u32 {
        self.sugar
    }

    #[inline]
    pub fn set_sugar(&mut self, sugar: u32) {
        self.sugar = sugar;
    }

    /// The product `self * t` as a new polynomial. Term multiplication is
    /// order-preserving, so a canonical input stays canonical.
    pub fn mul(&self, t: Term<'m>) -> Polynomial<'m> {
        Polynomial {
            coefficients: self.coefficients.clone(),
            terms: self.terms.iter().map(|s| s.mul(t)).collect(),
            sugar: self.sugar,
        }
    }

    /// Multiply every term by `t` in place.
    pub fn mul_by(&mut self, t: Term<'m>) {
        for s in &mut self.terms {
            *s = s.mul(t);
        }
    }

    /// [`Polynomial::mul`] with the term products fanned out over the ambient
    /// rayon pool. Worth it for the long rows produced by F4 preprocessing.
    pub fn mul_all(&self, t: Term<'m>) -> Polynomial<'m> {
        Polynomial {
            coefficients: self.coefficients.clone(),
            terms: self.terms.par_iter().map(|s| s.mul(t)).collect(),
            sugar: self.sugar,
        }
    }

    /// [`Polynomial::mul_all`] on an explicit thread pool supplied by the
    /// driver.
    pub fn mul_all_in(&self, t: Term<'m>, pool: &rayon::ThreadPool) -> Polynomial<'m> {
        pool.install(|| self.mul_all(t))
    }

    /// Multiply every coefficient by `l` in `field`. Coefficients must be
    /// canonical.
    pub fn mul_by_scalar(&mut self, l: Coeff, field: &PrimeField) {
        for c in &mut self.coefficients {
            *c = field.mul(*c, l);
        }
    }

    /// Scale so the leading coefficient becomes 1. No-op on zero.
    pub fn normalize(&mut self, field: &PrimeField) {
        if self.is_zero() {
            return;
        }

        let lc = self.coefficients[0];
        if lc != 1 {
            // a non-empty canonical support has a non-zero leading coefficient
            let inv = field.inv_unchecked(lc);
            self.mul_by_scalar(inv, field);
        }
    }

    /// Reduce every coefficient to the canonical range of `field`, dropping
    /// monomials that reduce to zero, then optionally normalize.
    pub fn bring_in(&mut self, field: &PrimeField, normalize: bool) {
        for c in &mut self.coefficients {
            *c = field.bring_in(*c);
        }
        self.drop_zeros();

        if normalize {
            self.normalize(field);
        }
    }

    /// Reorder the support into strictly decreasing order under `ord`. The
    /// permutation is stable; duplicate terms are not expected here (parsing
    /// and `purify` fold them).
    pub fn order<O: MonomialOrder + ?Sized>(&mut self, ord: &O) {
        let mut index: Vec<usize> = (0..self.len()).collect();
        index.sort_by(|&i, &j| ord.cmp(self.terms[j].exponents(), self.terms[i].exponents()));

        self.coefficients = index.iter().map(|&i| self.coefficients[i]).collect();
        self.terms = index.iter().map(|&i| self.terms[i]).collect();
    }

    /// Order-independent content hash: the simplify table's outer key. Equal
    /// supports hash equally regardless of monomial order.
    pub fn content_hash(&self) -> u64 {
        let mut hash = 0u64;
        for (c, t) in self.coefficients.iter().zip(&self.terms) {
            hash ^= (*c as u64).wrapping_add(t.hash_value());
        }
        hash
    }

    /// Verify the canonical-form invariants with respect to `(field, ord)`;
    /// with `normalized`, additionally require a unit leading coefficient.
    /// Intended for tests and debugging, not for hot paths.
    pub fn assert_canonical(
        &self,
        field: &PrimeField,
        ord: &TermOrder,
        normalized: bool,
    ) -> Result<(), InvariantViolation> {
        for (i, &c) in self.coefficients.iter().enumerate() {
            if c <= 0 || c >= field.get_prime() {
                return Err(InvariantViolation::CoefficientOutOfRange { index: i, value: c });
            }
        }

        for i in 1..self.len() {
            match ord.cmp_terms(&self.terms[i - 1], &self.terms[i]) {
                Ordering::Greater => {}
                Ordering::Equal => return Err(InvariantViolation::DuplicateTerm { index: i }),
                Ordering::Less => return Err(InvariantViolation::UnsortedSupport { index: i }),
            }
        }

        if normalized && !self.is_zero() && self.coefficients[0] != 1 {
            return Err(InvariantViolation::NotNormalized {
                value: self.coefficients[0],
            });
        }

        Ok(())
    }

    fn drop_zeros(&mut self) {
        let mut w = 0;
        for i in 0..self.coefficients.len() {
            if self.coefficients[i] != 0 {
                self.coefficients[w] = self.coefficients[i];
                self.terms[w] = self.terms[i];
                w += 1;
            }
        }
        self.coefficients.truncate(w);
        self.terms.truncate(w);
    }
}

impl Default for Polynomial<'_> {
    fn default() -> Self {
        Polynomial::new()
    }
}

/// Positional support equality; the sugar degree does not participate.
impl PartialEq for Polynomial<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.coefficients == other.coefficients && self.terms == other.terms
    }
}

impl Eq for Polynomial<'_> {}

impl Hash for Polynomial<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.content_hash());
    }
}

impl std::fmt::Debug for Polynomial<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Polynomial({}; sugar={})", self, self.sugar)
    }
}

impl std::fmt::Display for Polynomial<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", PolynomialPrinter::new(self))
    }
}

/// Compares polynomials by their leading terms under a chosen ordering, for
/// driver-side pair queues and basis sorting. Not a total order on
/// polynomials: equal leading terms say nothing about the tails.
#[derive(Debug, Clone, Copy)]
pub struct LeadingTermCmp {
    pub order: TermOrder,
    pub descending: bool,
}

impl LeadingTermCmp {
    pub fn new(order: TermOrder, descending: bool) -> LeadingTermCmp {
        LeadingTermCmp { order, descending }
    }

    /// Compare two non-zero polynomials by leading term.
    pub fn compare(&self, a: &Polynomial<'_>, b: &Polynomial<'_>) -> Ordering {
        let c = self.order.cmp_terms(&a.lt(), &b.lt());
        if self.descending {
            c.reverse()
        } else {
            c
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::poly::monoid::TermMonoid;

    fn monoid() -> TermMonoid {
        TermMonoid::new(2, 8)
    }

    #[test]
    fn purify_folds_duplicates() {
        let m = monoid();
        let x = m.create(&[1, 0]).unwrap();
        let y = m.create(&[0, 1]).unwrap();

        let p = Polynomial::from_monomials(&[(2, x), (3, y), (4, x), (-3, y)], true);
        assert_eq!(p.len(), 1);
        assert_eq!(p.monomial(0), (6, x));
    }

    #[test]
    fn order_is_strictly_decreasing() {
        let m = monoid();
        let field = PrimeField::new(32003);

        // x[1]^2 + 2*x[1]*x[2] + x[2]^2
        let mut p = Polynomial::from_monomials(
            &[
                (1, m.create(&[0, 2]).unwrap()),
                (2, m.create(&[1, 1]).unwrap()),
                (1, m.create(&[2, 0]).unwrap()),
            ],
            true,
        );
        p.bring_in(&field, true);
        p.order(&TermOrder::DegRevLex);

        assert_eq!(p.len(), 3);
        assert_eq!(p.lt().exponents(), &[2, 0]);
        assert_eq!(p.lc(), 1);
        assert_eq!(p.lt().deg(), 2);
        p.assert_canonical(&field, &TermOrder::DegRevLex, true).unwrap();
    }

    #[test]
    fn bring_in_normalizes() {
        let m = monoid();
        let field = PrimeField::new(32003);

        // 3*x[1] + 2 becomes x[1] + 21336
        let mut p = Polynomial::from_monomials(
            &[(3, m.create(&[1, 0]).unwrap()), (2, m.one())],
            true,
        );
        p.order(&TermOrder::DegRevLex);
        p.bring_in(&field, true);

        assert_eq!(p.coefficients(), &[1, 21336]);
    }

    #[test]
    fn bring_in_drops_zero_coefficients() {
        let m = monoid();
        let field = PrimeField::new(7);

        let mut p = Polynomial::from_monomials(
            &[(14, m.create(&[1, 0]).unwrap()), (3, m.one())],
            true,
        );
        p.bring_in(&field, false);

        assert_eq!(p.len(), 1);
        assert_eq!(p.coeff(0), 3);
        assert!(p.term(0).is_one());
    }

    #[test]
    fn mul_shifts_every_term() {
        let m = monoid();
        let x = m.create(&[1, 0]).unwrap();

        let mut p = Polynomial::from_monomials(
            &[(1, m.create(&[2, 0]).unwrap()), (5, m.create(&[0, 1]).unwrap())],
            true,
        );
        let q = p.mul(x);
        assert_eq!(q.term(0).exponents(), &[3, 0]);
        assert_eq!(q.term(1).exponents(), &[1, 1]);
        assert_eq!(q.coefficients(), p.coefficients());

        p.mul_by(x);
        assert_eq!(p, q);
    }

    #[test]
    fn mul_all_matches_mul() {
        let m = TermMonoid::new(3, 8);
        let t = m.create(&[1, 0, 2]).unwrap();

        let mut p = Polynomial::new();
        for i in 0..200u16 {
            p.push(i as Coeff + 1, m.create(&[i % 5, i % 11, i % 3]).unwrap());
        }

        let serial = p.mul(t);
        let parallel = p.mul_all(t);
        assert_eq!(serial, parallel);
    }

    #[test]
    fn equality_ignores_sugar() {
        let m = monoid();
        let x = m.create(&[1, 0]).unwrap();

        let mut p = Polynomial::from_term(x);
        let mut q = Polynomial::from_term(x);
        p.set_sugar(5);
        q.set_sugar(9);
        assert_eq!(p, q);
    }

    #[test]
    fn content_hash_is_order_independent() {
        let m = monoid();
        let x = m.create(&[1, 0]).unwrap();
        let y = m.create(&[0, 1]).unwrap();

        let p = Polynomial::from_monomials(&[(2, x), (3, y)], true);
        let q = Polynomial::from_monomials(&[(3, y), (2, x)], true);
        assert_eq!(p.content_hash(), q.content_hash());
        assert_ne!(p, q);
    }

    #[test]
    fn leading_term_comparator() {
        let m = monoid();
        let p = Polynomial::from_term(m.create(&[2, 0]).unwrap());
        let q = Polynomial::from_term(m.create(&[1, 1]).unwrap());

        let asc = LeadingTermCmp::new(TermOrder::DegRevLex, false);
        let desc = LeadingTermCmp::new(TermOrder::DegRevLex, true);
        assert_eq!(asc.compare(&p, &q), Ordering::Greater);
        assert_eq!(desc.compare(&p, &q), Ordering::Less);
    }

    #[test]
    fn assert_canonical_flags_violations() {
        let m = monoid();
        let field = PrimeField::new(7);
        let x = m.create(&[1, 0]).unwrap();
        let y = m.create(&[0, 1]).unwrap();

        let mut p = Polynomial::new();
        p.push(3, y);
        p.push(4, x);
        assert_eq!(
            p.assert_canonical(&field, &TermOrder::Lex, false),
            Err(InvariantViolation::UnsortedSupport { index: 1 })
        );

        let mut q = Polynomial::new();
        q.push(3, x);
        q.push(4, x);
        assert_eq!(
            q.assert_canonical(&field, &TermOrder::Lex, false),
            Err(InvariantViolation::DuplicateTerm { index: 1 })
        );

        let mut r = Polynomial::new();
        r.push(9, x);
        assert_eq!(
            r.assert_canonical(&field, &TermOrder::Lex, false),
            Err(InvariantViolation::CoefficientOutOfRange { index: 0, value: 9 })
        );

        let mut s = Polynomial::new();
        s.push(3, x);
        assert_eq!(
            s.assert_canonical(&field, &TermOrder::Lex, true),
            Err(InvariantViolation::NotNormalized { value: 3 })
        );
        s.normalize(&field);
        s.assert_canonical(&field, &TermOrder::Lex, true).unwrap();
    }
}
