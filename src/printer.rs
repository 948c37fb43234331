//! Printing of terms and polynomials in the canonical textual form.
//!
//! The output language is the parser's input language: monomials in storage
//! order joined by `+`/`-`, coefficient 1 omitted on non-constant monomials,
//! exponent 1 omitted, indeterminates printed as `x[i + min]`. Printing a
//! canonical polynomial and parsing it back yields the same polynomial.

use std::fmt;

use crate::poly::monoid::Term;
use crate::poly::polynomial::Polynomial;

/// Print a term as a `*`-joined product of `x[i]^e` factors, or `1` for the
/// unit term. `min` is the index offset the polynomial was parsed with.
pub(crate) fn fmt_term(f: &mut fmt::Formatter<'_>, t: &Term<'_>, min: u16) -> fmt::Result {
    if t.is_one() {
        return write!(f, "1");
    }

    let mut first = true;
    for (i, &e) in t.exponents().iter().enumerate() {
        if e == 0 {
            continue;
        }

        if !first {
            write!(f, "*")?;
        }
        first = false;

        write!(f, "x[{}]", i + min as usize)?;
        if e > 1 {
            write!(f, "^{}", e)?;
        }
    }

    Ok(())
}

/// Displays a polynomial in the canonical textual form.
pub struct PolynomialPrinter<'a, 'm> {
    pub poly: &'a Polynomial<'m>,
    pub min: u16,
}

impl<'a, 'm> PolynomialPrinter<'a, 'm> {
    /// Print with the default index offset 1.
    pub fn new(poly: &'a Polynomial<'m>) -> PolynomialPrinter<'a, 'm> {
        PolynomialPrinter { poly, min: 1 }
    }

    /// Print with an explicit index offset, matching the `min` the
    /// polynomial was parsed with.
    pub fn with_min(poly: &'a Polynomial<'m>, min: u16) -> PolynomialPrinter<'a, 'm> {
        PolynomialPrinter { poly, min }
    }
}

impl fmt::Display for PolynomialPrinter<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.poly.is_zero() {
            return write!(f, "0");
        }

        for (i, (c, t)) in self.poly.iter().enumerate() {
            if i == 0 {
                if c < 0 {
                    write!(f, "-")?;
                }
            } else if c < 0 {
                write!(f, "-")?;
            } else {
                write!(f, "+")?;
            }

            let magnitude = c.unsigned_abs();
            if t.is_one() {
                write!(f, "{}", magnitude)?;
            } else {
                if magnitude != 1 {
                    write!(f, "{}*", magnitude)?;
                }
                fmt_term(f, &t, self.min)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::finite_field::PrimeField;
    use crate::poly::monoid::TermMonoid;
    use crate::poly::TermOrder;

    #[test]
    fn term_formatting() {
        let m = TermMonoid::new(3, 8);
        assert_eq!(m.one().to_string(), "1");
        assert_eq!(m.create(&[1, 0, 0]).unwrap().to_string(), "x[1]");
        assert_eq!(m.create(&[2, 0, 1]).unwrap().to_string(), "x[1]^2*x[3]");
    }

    #[test]
    fn polynomial_formatting() {
        let m = TermMonoid::new(2, 8);

        assert_eq!(Polynomial::new().to_string(), "0");

        let p = Polynomial::parse("x[1]^2+2*x[1]*x[2]+x[2]^2", &m, 1).unwrap();
        assert_eq!(p.to_string(), "x[1]^2+2*x[1]*x[2]+x[2]^2");

        let p = Polynomial::parse("-x[1]+3", &m, 1).unwrap();
        assert_eq!(p.to_string(), "-x[1]+3");

        let p = Polynomial::parse("x[1]-x[2]-1", &m, 1).unwrap();
        assert_eq!(p.to_string(), "x[1]-x[2]-1");
    }

    #[test]
    fn min_offset() {
        let m = TermMonoid::new(2, 8);
        let p = Polynomial::parse("x[0]^2*x[1]+5", &m, 0).unwrap();
        assert_eq!(
            PolynomialPrinter::with_min(&p, 0).to_string(),
            "x[0]^2*x[1]+5"
        );
    }

    #[test]
    fn round_trip() {
        let m = TermMonoid::new(3, 8);
        let field = PrimeField::new(32003);

        for s in [
            "x[1]^2+2*x[1]*x[2]+x[3]^2",
            "3*x[1]+2",
            "x[1]*x[2]*x[3]",
            "31*x[2]^5+x[1]^4-x[3]",
            "1",
        ] {
            let mut p = Polynomial::parse(s, &m, 1).unwrap();
            p.bring_in(&field, false);
            p.order(&TermOrder::DegRevLex);

            let q = Polynomial::parse(&p.to_string(), &m, 1).unwrap();
            assert_eq!(p, q, "round trip of {:?}", s);
        }
    }
}
