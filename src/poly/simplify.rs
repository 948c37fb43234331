//! The F4 simplify cache.
//!
//! During symbolic preprocessing F4 repeatedly needs the product `t * f` of a
//! basis polynomial and a term, reduced against the current basis. The
//! reducer records every finished row here; before materializing a product,
//! preprocessing asks the table whether `(f, t)`, or `(f, t')` for a divisor
//! `t'` of `t`, was already reduced, and continues from the stored row
//! instead.
//!
//! The table is a two-level map: polynomial to term to reduced polynomial.
//! The outer level gains one entry per basis polynomial and is written
//! rarely; the inner tables accumulate throughout a run. Stored polynomials
//! are immutable and shared, so readers never observe partial rows.

use std::sync::Arc;

use ahash::{HashMap, HashMapExt};
use parking_lot::RwLock;
use tracing::debug;

use crate::poly::monoid::Term;
use crate::poly::polynomial::Polynomial;

struct InnerTable<'m> {
    entries: RwLock<HashMap<Term<'m>, Arc<Polynomial<'m>>>>,
}

impl Default for InnerTable<'_> {
    fn default() -> Self {
        InnerTable {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

/// A concurrent memo of prior row reductions, keyed by source polynomial and
/// multiplier term. Created empty per F4 run, grows monotonically, discarded
/// at run end.
pub struct SimplifyTable<'m> {
    tables: RwLock<HashMap<Polynomial<'m>, Arc<InnerTable<'m>>>>,
}

impl<'m> SimplifyTable<'m> {
    pub fn new() -> SimplifyTable<'m> {
        SimplifyTable {
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Record that multiplying `f` by `t` reduced to `p`. A repeated insert
    /// for the same `(f, t)` overwrites: the reducer only re-inserts stronger
    /// results.
    pub fn insert(&self, t: Term<'m>, f: &Polynomial<'m>, p: Polynomial<'m>) {
        let inner = {
            let tables = self.tables.read();
            tables.get(f).cloned()
        };

        // double-checked creation: racing writers converge on one inner table
        let inner = match inner {
            Some(inner) => inner,
            None => {
                debug!(terms = f.len(), "new simplify source");
                let mut tables = self.tables.write();
                tables
                    .entry(f.clone())
                    .or_insert_with(|| Arc::new(InnerTable::default()))
                    .clone()
            }
        };

        inner.entries.write().insert(t, Arc::new(p));
    }

    /// Rewrite `(t, f)` using the strongest stored reduction: among the
    /// entries `(t', p)` for `f` whose key divides `t`, pick the one
    /// maximizing `t / t'`, then replace `t` by `t / t'` and `f` by `p`.
    /// Leaves both untouched when no entry applies. The rewritten product
    /// equals the requested one up to a field scalar.
    pub fn search(&self, t: &mut Term<'m>, f: &mut Polynomial<'m>) {
        let inner = {
            let tables = self.tables.read();
            tables.get(f).cloned()
        };
        let Some(inner) = inner else {
            return;
        };

        let entries = inner.entries.read();
        let mut best: Option<(Term<'m>, Arc<Polynomial<'m>>)> = None;
        for (divisor, p) in entries.iter() {
            if t.is_divisible_by(divisor) {
                // the largest quotient comes from the divisor of least degree
                let better = match &best {
                    None => true,
                    Some((b, _)) => divisor.deg() < b.deg(),
                };
                if better {
                    best = Some((*divisor, p.clone()));
                }
            }
        }
        drop(entries);

        if let Some((divisor, p)) = best {
            debug!(quotient_degree = t.deg() - divisor.deg(), "simplify hit");
            *t = t.div(divisor);
            *f = (*p).clone();
        }
    }

    /// The number of source polynomials with at least one stored reduction.
    pub fn len(&self) -> usize {
        self.tables.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().is_empty()
    }
}

impl Default for SimplifyTable<'_> {
    fn default() -> Self {
        SimplifyTable::new()
    }
}
