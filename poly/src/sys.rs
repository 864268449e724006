//! Row systems with the singular / skeleton / non-skeleton partition.
//!
//! A system stores whatever rows it is given; minimization is the
//! conversion core's business. The `ns` sub-matrix holds support rows:
//! each names a subset of the `sk` rows whose conjunctive combination is
//! implicit in the system (see the crate documentation on NNC polyhedra).

use core::fmt;

use crate::{
    bits::{Bits, IndexSet},
    con::{Con, ConKind},
    gen::{Gen, GenKind},
    integer::Integer,
    linear_expr::LinearExpr,
};

/// A row of a system: either singular (equality / line) or skeleton.
pub trait SysRow: Clone {
    /// Does this row belong in the `sing` sub-matrix?
    fn is_sing(&self) -> bool;
    /// The space dimension of the row.
    fn space_dim(&self) -> usize;
    /// Grows the row to `dim` dimensions.
    fn set_space_dim(&mut self, dim: usize);
}

impl SysRow for Con {
    fn is_sing(&self) -> bool {
        self.is_equality()
    }
    fn space_dim(&self) -> usize {
        Con::space_dim(self)
    }
    fn set_space_dim(&mut self, dim: usize) {
        Con::set_space_dim(self, dim);
    }
}

impl SysRow for Gen {
    fn is_sing(&self) -> bool {
        self.is_line()
    }
    fn space_dim(&self) -> usize {
        Gen::space_dim(self)
    }
    fn set_space_dim(&mut self, dim: usize) {
        Gen::set_space_dim(self, dim);
    }
}

/// A matrix of rows partitioned into `sing`, `sk` and `ns` sub-matrices.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Sys<R> {
    /// Equalities (constraints) or lines (generators).
    pub sing_rows: Vec<R>,
    /// Skeleton rows.
    pub sk_rows: Vec<R>,
    /// Non-skeleton support rows over `sk_rows` indices; NNC only.
    pub ns_rows: Vec<IndexSet>,
}

/// A constraint system.
pub type ConSys = Sys<Con>;
/// A generator system.
pub type GenSys = Sys<Gen>;

impl<R> Default for Sys<R> {
    fn default() -> Self {
        Sys {
            sing_rows: Vec::new(),
            sk_rows: Vec::new(),
            ns_rows: Vec::new(),
        }
    }
}

impl<R: SysRow> Sys<R> {
    /// An empty system.
    pub fn new() -> Self {
        Default::default()
    }

    /// Has this system no rows at all?
    pub fn is_empty(&self) -> bool {
        self.sing_rows.is_empty() && self.sk_rows.is_empty() && self.ns_rows.is_empty()
    }

    /// The total number of rows, counting ns supports.
    pub fn num_rows(&self) -> usize {
        self.sing_rows.len() + self.sk_rows.len() + self.ns_rows.len()
    }

    /// Appends a row to the partition its kind selects.
    pub fn push(&mut self, row: R) {
        if row.is_sing() {
            self.sing_rows.push(row);
        } else {
            self.sk_rows.push(row);
        }
    }

    /// Appends a non-skeleton support row.
    pub fn push_ns(&mut self, ns: IndexSet) {
        self.ns_rows.push(ns);
    }

    /// Drops every row.
    pub fn clear(&mut self) {
        self.sing_rows.clear();
        self.sk_rows.clear();
        self.ns_rows.clear();
    }

    /// Moves all rows of `other` into `self`, reindexing the incoming ns
    /// supports past the current `sk` rows.
    pub fn concat(&mut self, other: Sys<R>) {
        let offset = self.sk_rows.len();
        self.sing_rows.extend(other.sing_rows);
        self.sk_rows.extend(other.sk_rows);
        self.ns_rows.extend(other.ns_rows.into_iter().map(|ns| {
            let mut shifted = Bits::new();
            for i in &ns {
                shifted.set(i + offset);
            }
            shifted
        }));
    }

    /// The greatest space dimension among the rows.
    pub fn space_dim(&self) -> usize {
        self.sing_rows
            .iter()
            .chain(self.sk_rows.iter())
            .map(SysRow::space_dim)
            .max()
            .unwrap_or(0)
    }

    /// Grows every row to `dim` dimensions.
    pub fn set_space_dim(&mut self, dim: usize) {
        for r in self.sing_rows.iter_mut().chain(self.sk_rows.iter_mut()) {
            r.set_space_dim(dim);
        }
    }

    /// Iterates over singular then skeleton rows.
    pub fn iter_rows(&self) -> impl Iterator<Item = &R> {
        self.sing_rows.iter().chain(self.sk_rows.iter())
    }

    /// Removes the skeleton rows named by `removed`, compacting indices
    /// and reindexing every ns support accordingly.
    pub fn remove_sk_rows(&mut self, removed: &Bits) {
        if removed.is_empty() {
            return;
        }
        let mut keep = 0;
        for i in 0..self.sk_rows.len() {
            if !removed.test(i) {
                self.sk_rows.swap(keep, i);
                keep += 1;
            }
        }
        self.sk_rows.truncate(keep);
        for ns in &mut self.ns_rows {
            ns.remove_all(removed);
        }
    }
}

// ---------------------------------------------------------------------------
// ASCII round-trip format.
//
// Rows print as `tag : dim k : c_0 … c_{k-1} : trailing`, where `k` counts
// coefficients up to the last nonzero one and `trailing` is the
// inhomogeneous term (constraints) or divisor (generators). Supports print
// as `n : { i, j, … }`.
// ---------------------------------------------------------------------------

/// A system row with a textual dump format.
pub trait AsciiRow: Sized {
    /// Writes the row in dump format.
    fn ascii_dump_row(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
    /// Parses a dumped row.
    fn ascii_load_row(line: &str) -> Option<Self>;
}

fn dump_row_parts(
    f: &mut fmt::Formatter<'_>,
    tag: &str,
    expr: &LinearExpr,
    trailing: &Integer,
) -> fmt::Result {
    let k = expr.last_nonzero().map_or(0, |i| i + 1);
    write!(f, "{tag} : dim {k} :")?;
    for i in 0..k {
        write!(f, " {}", expr.get(i))?;
    }
    write!(f, "  : {trailing}")
}

fn parse_int(tok: &str) -> Option<Integer> {
    use num_bigint::BigInt;
    tok.parse::<BigInt>().ok().map(|b| {
        let mut i = Integer::zero();
        i.0 = b;
        i
    })
}

fn load_row_parts(line: &str) -> Option<(String, LinearExpr, Integer)> {
    let mut parts = line.splitn(4, " : ");
    let tag = parts.next()?.trim().to_string();
    let dim_part = parts.next()?.trim();
    let k: usize = dim_part.strip_prefix("dim ")?.trim().parse().ok()?;
    let coeff_part = parts.next()?;
    let trailing_part = parts.next()?;
    let mut expr = LinearExpr::with_dim(k);
    let mut count = 0;
    for (i, tok) in coeff_part.split_whitespace().enumerate() {
        expr.set(i, parse_int(tok)?);
        count += 1;
    }
    if count != k {
        return None;
    }
    let trailing = parse_int(trailing_part.trim())?;
    Some((tag, expr, trailing))
}

impl AsciiRow for Con {
    fn ascii_dump_row(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind() {
            ConKind::Equality => "=",
            ConKind::NonStrict => ">=",
            ConKind::Strict => ">",
        };
        dump_row_parts(f, tag, self.linear_expr(), self.inhomo_term())
    }

    fn ascii_load_row(line: &str) -> Option<Con> {
        let (tag, expr, inhomo) = load_row_parts(line)?;
        let kind = match tag.as_str() {
            "=" => ConKind::Equality,
            ">=" => ConKind::NonStrict,
            ">" => ConKind::Strict,
            _ => return None,
        };
        Some(Con::from_parts_unchecked(expr, inhomo, kind))
    }
}

impl AsciiRow for Gen {
    fn ascii_dump_row(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind() {
            GenKind::Line => "L",
            GenKind::Ray => "R",
            GenKind::Point => "P",
            GenKind::ClosurePoint => "C",
        };
        dump_row_parts(f, tag, self.linear_expr(), self.divisor())
    }

    fn ascii_load_row(line: &str) -> Option<Gen> {
        let (tag, expr, div) = load_row_parts(line)?;
        let kind = match tag.as_str() {
            "L" => GenKind::Line,
            "R" => GenKind::Ray,
            "P" => GenKind::Point,
            "C" => GenKind::ClosurePoint,
            _ => return None,
        };
        Some(Gen::from_parts_unchecked(kind, expr, div))
    }
}

impl<R: SysRow + AsciiRow> Sys<R> {
    /// Writes the three sub-matrices in dump format.
    pub(crate) fn ascii_dump(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct RowDisplay<'a, R: AsciiRow>(&'a R);
        impl<R: AsciiRow> fmt::Display for RowDisplay<'_, R> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.ascii_dump_row(f)
            }
        }

        writeln!(f, "sing_rows {}", self.sing_rows.len())?;
        for r in &self.sing_rows {
            writeln!(f, "{}", RowDisplay(r))?;
        }
        writeln!(f, "sk_rows {}", self.sk_rows.len())?;
        for r in &self.sk_rows {
            writeln!(f, "{}", RowDisplay(r))?;
        }
        writeln!(f, "ns_rows {}", self.ns_rows.len())?;
        for ns in &self.ns_rows {
            write!(f, "{} : {{ ", ns.count())?;
            let mut first = true;
            for i in ns {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "{i}")?;
                first = false;
            }
            writeln!(f, " }}")?;
        }
        Ok(())
    }

    /// Parses the dump format back; `None` on malformed input.
    pub(crate) fn ascii_load<'a>(lines: &mut impl Iterator<Item = &'a str>) -> Option<Sys<R>> {
        fn counted<'a>(lines: &mut impl Iterator<Item = &'a str>, name: &str) -> Option<usize> {
            let line = lines.next()?;
            line.strip_prefix(name)?.trim().parse().ok()
        }

        let mut sys = Sys {
            sing_rows: Vec::new(),
            sk_rows: Vec::new(),
            ns_rows: Vec::new(),
        };
        let n_sing = counted(lines, "sing_rows")?;
        for _ in 0..n_sing {
            sys.sing_rows.push(R::ascii_load_row(lines.next()?)?);
        }
        let n_sk = counted(lines, "sk_rows")?;
        for _ in 0..n_sk {
            sys.sk_rows.push(R::ascii_load_row(lines.next()?)?);
        }
        let n_ns = counted(lines, "ns_rows")?;
        for _ in 0..n_ns {
            let line = lines.next()?;
            let (count_part, set_part) = line.split_once(" : ")?;
            let count: usize = count_part.trim().parse().ok()?;
            let inner = set_part.trim().strip_prefix('{')?.strip_suffix('}')?;
            let mut ns = Bits::new();
            let mut seen = 0;
            for tok in inner.split(',') {
                let tok = tok.trim();
                if tok.is_empty() {
                    continue;
                }
                ns.set(tok.parse().ok()?);
                seen += 1;
            }
            if seen != count {
                return None;
            }
            sys.ns_rows.push(ns);
        }
        Some(sys)
    }
}
