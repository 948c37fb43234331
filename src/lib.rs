//! Macaulay is the symbolic-algebra core of an F4 Gröbner basis engine for
//! multivariate polynomial ideals over finite prime fields.
//!
//! It provides
//! - Hash-consed terms: exponent vectors are interned once per monoid, so
//!   term identity is a pointer comparison and degree and hash are cached
//! - Fast term algebra: multiplication, division, lcm and divisibility at
//!   the rate demanded by F4's pair reduction inner loop
//! - Runtime-swappable term orderings (Lex, DegLex, DegRevLex) and prime
//!   coefficient fields: polynomials are reordered and re-canonicalized in
//!   place, never rebuilt
//! - A parser and printer for the `c*x[i]^e` surface syntax
//! - The concurrent simplify table that lets F4 symbolic preprocessing
//!   continue from previously reduced rows
//!
//! The surrounding F4 machinery (critical pair scheduling, the linear
//! algebra over the prime field, input handling) lives with the embedding
//! driver; interning and the simplify table are safe to share across its
//! worker threads.
//!
//! # Example
//! Canonicalize a polynomial over Z/32003Z under the degree reverse
//! lexicographic ordering:
//!
//! ```rust
//! # use macaulay::finite_field::PrimeField;
//! # use macaulay::poly::monoid::TermMonoid;
//! # use macaulay::poly::polynomial::Polynomial;
//! # use macaulay::poly::TermOrder;
//! let monoid = TermMonoid::new(2, 8);
//! let field = PrimeField::new(32003);
//!
//! let mut p = Polynomial::parse("3*x[1]^2 + 6*x[1]*x[2] + 2", &monoid, 1).unwrap();
//! p.order(&TermOrder::DegRevLex);
//! p.bring_in(&field, true);
//!
//! assert_eq!(p.lt(), monoid.create(&[2, 0]).unwrap());
//! assert_eq!(p.lc(), 1);
//! assert_eq!(p.to_string(), "x[1]^2+2*x[1]*x[2]+21336");
//! ```
pub mod finite_field;
pub mod parser;
pub mod poly;
pub mod printer;
