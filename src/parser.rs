//! Parsing of the ASCII polynomial syntax.
//!
//! The surface language is sums of monomials over bracketed indeterminates:
//!
//! ```text
//! poly     := signedTerm (('+' | '-') term)*
//! term     := coeff ('*' factor)* | factor ('*' factor)*
//! factor   := 'x[' index ']' ('^' exponent)?
//! coeff    := [0-9]+
//! ```
//!
//! Whitespace is permitted between tokens, a leading `-` negates the first
//! term, and lists of polynomials are separated by `, `. The `min` parameter
//! fixes the smallest accepted index: `x[k]` maps to exponent position
//! `k - min`.

use thiserror::Error;

use crate::finite_field::Coeff;
use crate::poly::monoid::{Term, TermMonoid};
use crate::poly::polynomial::{Monomial, Polynomial};
use crate::poly::Exponent;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("parse error at byte {position}: {message}")]
pub struct ParseError {
    pub position: usize,
    pub message: String,
}

/// Parse a single polynomial. The result is purified (duplicate terms
/// folded) but neither ordered nor brought into a field.
pub(crate) fn parse_polynomial<'m>(
    monoid: &'m TermMonoid,
    input: &str,
    min: u16,
) -> Result<Polynomial<'m>, ParseError> {
    let mut parser = PolyParser::new(monoid, input, min);
    let poly = parser.polynomial()?;
    parser.expect_end()?;
    Ok(poly)
}

/// Parse a `, `-separated list of polynomials.
pub(crate) fn parse_polynomial_list<'m>(
    monoid: &'m TermMonoid,
    input: &str,
    min: u16,
) -> Result<Vec<Polynomial<'m>>, ParseError> {
    let mut parser = PolyParser::new(monoid, input, min);
    let mut polys = vec![parser.polynomial()?];

    parser.skip_whitespace();
    while parser.eat(b',') {
        polys.push(parser.polynomial()?);
        parser.skip_whitespace();
    }
    parser.expect_end()?;

    Ok(polys)
}

/// Parse a single term (a product of factors, no coefficient).
pub(crate) fn parse_term<'m>(
    monoid: &'m TermMonoid,
    input: &str,
    min: u16,
) -> Result<Term<'m>, ParseError> {
    let mut parser = PolyParser::new(monoid, input, min);

    let mut exponents = vec![0u32; monoid.nvars()];
    parser.factor(&mut exponents)?;
    parser.skip_whitespace();
    while parser.eat(b'*') {
        parser.factor(&mut exponents)?;
        parser.skip_whitespace();
    }
    parser.expect_end()?;

    Ok(parser.intern(&exponents))
}

struct PolyParser<'s, 'm> {
    input: &'s [u8],
    pos: usize,
    monoid: &'m TermMonoid,
    min: u16,
}

impl<'s, 'm> PolyParser<'s, 'm> {
    fn new(monoid: &'m TermMonoid, input: &'s str, min: u16) -> PolyParser<'s, 'm> {
        PolyParser {
            input: input.as_bytes(),
            pos: 0,
            monoid,
            min,
        }
    }

    /// `signedTerm (('+'|'-') term)*`, stopping before `,` or the end.
    fn polynomial(&mut self) -> Result<Polynomial<'m>, ParseError> {
        let mut monomials: Vec<Monomial<'m>> = vec![];

        self.skip_whitespace();
        let mut sign: Coeff = if self.eat(b'-') { -1 } else { 1 };

        loop {
            let (c, t) = self.term()?;
            monomials.push((sign * c, t));

            self.skip_whitespace();
            match self.peek() {
                Some(b'+') => {
                    self.pos += 1;
                    sign = 1;
                }
                Some(b'-') => {
                    self.pos += 1;
                    sign = -1;
                }
                _ => break,
            }
        }

        Ok(Polynomial::from_monomials(&monomials, true))
    }

    /// `coeff ('*' factor)* | factor ('*' factor)*`
    fn term(&mut self) -> Result<(Coeff, Term<'m>), ParseError> {
        self.skip_whitespace();

        let mut exponents = vec![0u32; self.monoid.nvars()];
        let coeff = if matches!(self.peek(), Some(b'0'..=b'9')) {
            let position = self.pos;
            let c = self.number()?;
            Coeff::try_from(c)
                .map_err(|_| self.error_at(position, "coefficient too large".into()))?
        } else {
            self.factor(&mut exponents)?;
            1
        };

        self.skip_whitespace();
        while self.eat(b'*') {
            self.factor(&mut exponents)?;
            self.skip_whitespace();
        }

        Ok((coeff, self.intern(&exponents)))
    }

    /// `'x[' index ']' ('^' exponent)?`, accumulated into `exponents`.
    fn factor(&mut self, exponents: &mut [u32]) -> Result<(), ParseError> {
        self.skip_whitespace();
        self.expect(b'x')?;
        self.skip_whitespace();
        self.expect(b'[')?;
        self.skip_whitespace();

        let position = self.pos;
        let index = self.number()?;
        let min = self.min as u64;
        let nvars = self.monoid.nvars() as u64;
        if index < min || index >= min + nvars {
            return Err(self.error_at(
                position,
                format!(
                    "index x[{}] out of range [{}, {})",
                    index,
                    min,
                    min + nvars
                ),
            ));
        }

        self.skip_whitespace();
        self.expect(b']')?;

        self.skip_whitespace();
        let exponent = if self.eat(b'^') {
            self.skip_whitespace();
            self.number()?
        } else {
            1
        };

        let slot = &mut exponents[(index - min) as usize];
        let capacity = self.monoid.capacity() as u64;
        if exponent > capacity || *slot as u64 + exponent > capacity {
            return Err(self.error_at(
                position,
                format!("exponent of x[{}] exceeds the monoid capacity {}", index, capacity),
            ));
        }
        *slot += exponent as u32;

        Ok(())
    }

    fn intern(&self, exponents: &[u32]) -> Term<'m> {
        let exps: Vec<Exponent> = exponents.iter().map(|&e| e as Exponent).collect();
        // in range by the capacity checks in factor()
        self.monoid
            .create(&exps)
            .expect("parsed exponents are within the monoid capacity")
    }

    /// `[0-9]+`
    fn number(&mut self) -> Result<u64, ParseError> {
        let start = self.pos;
        let mut value: u64 = 0;
        while let Some(b @ b'0'..=b'9') = self.peek() {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add((b - b'0') as u64))
                .ok_or_else(|| self.error_at(start, "number too large".into()))?;
            self.pos += 1;
        }

        if self.pos == start {
            return Err(self.error("expected a number".into()));
        }
        Ok(value)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, b: u8) -> Result<(), ParseError> {
        if self.eat(b) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", b as char)))
        }
    }

    fn expect_end(&mut self) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            None => Ok(()),
            Some(b) => Err(self.error(format!("unexpected '{}'", b as char))),
        }
    }

    fn error(&self, message: String) -> ParseError {
        self.error_at(self.pos, message)
    }

    fn error_at(&self, position: usize, message: String) -> ParseError {
        ParseError { position, message }
    }
}
