//! The incremental double description conversion core.
//!
//! Both systems of a polyhedron are polyhedral cones in homogeneous space:
//! a generator row is `[divisor, coeffs…]` and a constraint row is
//! `[inhomo, coeffs…]`, each the dual cone of the other. One symmetric
//! Chernikova step therefore serves both conversion directions: pending
//! rows of one side are absorbed by classifying the rows of the other side
//! on the sign of the scalar product, eliminating through singular rows,
//! dropping the negative part and combining adjacent positive/negative
//! pairs.
//!
//! Singular pending rows (equalities, lines) are processed first, as the
//! pair of opposite inequality steps; skeleton rows follow in input order.
//! Saturation rows are maintained only for skeleton-against-skeleton
//! products, with a set bit meaning "saturates".

use tracing::trace;

use crate::{
    bits::Bits,
    con::{Con, ConKind},
    gen::{Gen, GenKind},
    integer::Integer,
    linear_expr::LinearExpr,
    sat::Sat,
    sys::{ConSys, GenSys},
};

/// A homogeneous row: `v[0]` is the inhomogeneous term or divisor.
pub(crate) type Row = Vec<Integer>;

/// Signals that the polyhedron under construction has no points.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct EmptyPoly;

pub(crate) fn dot(a: &Row, b: &Row) -> Integer {
    let n = a.len().min(b.len());
    let mut acc = Integer::zero();
    for i in 0..n {
        if !a[i].is_zero() && !b[i].is_zero() {
            acc.add_mul_assign(&a[i], &b[i]);
        }
    }
    acc
}

pub(crate) fn negate_row(r: &mut Row) {
    for c in r.iter_mut() {
        c.neg_assign();
    }
}

/// Divides the row by the gcd of its entries.
pub(crate) fn normalize_row(r: &mut Row) {
    let mut g = Integer::zero();
    for c in r.iter() {
        if !c.is_zero() {
            g.gcd_assign(c);
            if g.is_one() {
                return;
            }
        }
    }
    if !g.is_zero() && !g.is_one() {
        for c in r.iter_mut() {
            if !c.is_zero() {
                c.exact_div_assign(&g);
            }
        }
    }
}

/// Makes the first nonzero entry positive; for singular rows only.
pub(crate) fn sign_normalize_row(r: &mut Row) {
    if let Some(c) = r.iter().find(|c| !c.is_zero()) {
        if c.is_negative() {
            negate_row(r);
        }
    }
}

pub(crate) fn is_zero_row(r: &Row) -> bool {
    r.iter().all(Integer::is_zero)
}

/// The combination of an adjacent positive/negative pair that saturates
/// the row being added: `s_p * n - s_n * p` with `s_p > 0 > s_n`.
fn combine(p: &Row, sp: &Integer, n: &Row, sn: &Integer) -> Row {
    debug_assert!(sp.is_positive() && sn.is_negative());
    let mut out = vec![Integer::zero(); p.len().max(n.len())];
    for (i, c) in out.iter_mut().enumerate() {
        if let Some(nc) = n.get(i) {
            c.add_mul_assign(sp, nc);
        }
        if let Some(pc) = p.get(i) {
            c.sub_mul_assign(sn, pc);
        }
    }
    normalize_row(&mut out);
    out
}

/// `s_l * r - s_r * l`: kills the product of `r` with the pending row,
/// using singular row `l` whose product is `s_l > 0`.
fn eliminate(r: &Row, sr: &Integer, l: &Row, sl: &Integer) -> Row {
    debug_assert!(sl.is_positive());
    let mut out = vec![Integer::zero(); r.len().max(l.len())];
    for (i, c) in out.iter_mut().enumerate() {
        if let Some(rc) = r.get(i) {
            c.add_mul_assign(sl, rc);
        }
        if let Some(lc) = l.get(i) {
            c.sub_mul_assign(sr, lc);
        }
    }
    normalize_row(&mut out);
    out
}

/// One side of a double description pair under construction.
pub(crate) struct Dd {
    /// Homogeneous row length (space dimension + 1, plus any slack).
    pub hom: usize,
    /// Lines (generator side) or equality directions (constraint side).
    pub sing: Vec<Row>,
    /// Skeleton rows.
    pub sk: Vec<Row>,
    /// Saturation rows parallel to `sk`; columns are the skeleton rows of
    /// the dual side processed so far.
    pub sat: Vec<Bits>,
    pub cols: usize,
    /// Whether this side holds generators (enables the emptiness check).
    pub gen_side: bool,
}

impl Dd {
    /// The generator side of the universe polyhedron: the origin point
    /// plus one line per axis.
    pub fn universe_gens(space_dim: usize) -> Dd {
        let hom = space_dim + 1;
        let mut sing = Vec::with_capacity(space_dim);
        for i in 1..hom {
            let mut axis = vec![Integer::zero(); hom];
            axis[i] = Integer::one();
            sing.push(axis);
        }
        let mut origin = vec![Integer::zero(); hom];
        origin[0] = Integer::one();
        Dd {
            hom,
            sing,
            sk: vec![origin],
            sat: vec![Bits::new()],
            cols: 0,
            gen_side: true,
        }
    }

    /// The constraint side dual to "no generators processed yet": the
    /// whole homogeneous space, one singular row per axis.
    pub fn full_space_cons(space_dim: usize) -> Dd {
        let hom = space_dim + 1;
        let mut sing = Vec::with_capacity(hom);
        for i in 0..hom {
            let mut axis = vec![Integer::zero(); hom];
            axis[i] = Integer::one();
            sing.push(axis);
        }
        Dd {
            hom,
            sing,
            sk: Vec::new(),
            sat: Vec::new(),
            cols: 0,
            gen_side: false,
        }
    }

    /// Absorbs a batch of pending rows: singular rows first, then the
    /// skeleton rows in input order.
    pub fn add_rows(&mut self, rows: &[(Row, bool)]) -> Result<(), EmptyPoly> {
        for (row, is_sing) in rows.iter().filter(|(_, s)| *s) {
            debug_assert!(*is_sing);
            let mut opposite = row.clone();
            negate_row(&mut opposite);
            self.step(row, false)?;
            self.step(&opposite, false)?;
        }
        for (row, _) in rows.iter().filter(|(_, s)| !*s) {
            self.step(row, true)?;
        }
        Ok(())
    }

    /// Is the pair `(p, n)` adjacent? Tested combinatorially: the set of
    /// dual rows they jointly saturate must not be included in the
    /// saturator set of any other skeleton row.
    fn adjacent(&self, p: usize, n: usize) -> bool {
        let mut inter = self.sat[p].clone();
        inter &= &self.sat[n];
        for (i, other) in self.sat.iter().enumerate() {
            if i != p && i != n && inter.is_subset_of(other) {
                return false;
            }
        }
        true
    }

    fn check_nonempty(&self) -> Result<(), EmptyPoly> {
        if self.gen_side && !self.sk.iter().any(|r| r[0].is_positive()) {
            return Err(EmptyPoly);
        }
        Ok(())
    }

    /// One Chernikova step for the inequality-like row `a`.
    fn step(&mut self, a: &Row, track_col: bool) -> Result<(), EmptyPoly> {
        trace!(hom = self.hom, sk = self.sk.len(), "conversion step");

        // A singular row with nonzero product absorbs the cut: every other
        // row is combined to saturate `a`, the chosen row becomes skeleton.
        if let Some(li) = self.sing.iter().position(|l| !dot(a, l).is_zero()) {
            let mut line = self.sing.remove(li);
            let mut sl = dot(a, &line);
            if sl.is_negative() {
                negate_row(&mut line);
                sl.neg_assign();
            }
            for r in self.sing.iter_mut() {
                let sr = dot(a, r);
                if !sr.is_zero() {
                    *r = eliminate(r, &sr, &line, &sl);
                    sign_normalize_row(r);
                }
            }
            for r in self.sk.iter_mut() {
                let sr = dot(a, r);
                if !sr.is_zero() {
                    *r = eliminate(r, &sr, &line, &sl);
                }
            }
            let mut satrow = Bits::new();
            satrow.set_until(self.cols);
            self.sk.push(line);
            self.sat.push(satrow);
            if track_col {
                let j = self.cols;
                self.cols += 1;
                for (i, r) in self.sk.iter().enumerate() {
                    if dot(a, r).is_zero() {
                        self.sat[i].set(j);
                    }
                }
            }
            return self.check_nonempty();
        }

        let prods: Vec<Integer> = self.sk.iter().map(|r| dot(a, r)).collect();
        let pos: Vec<usize> = (0..prods.len()).filter(|&i| prods[i].is_positive()).collect();
        let neg: Vec<usize> = (0..prods.len()).filter(|&i| prods[i].is_negative()).collect();

        if neg.is_empty() {
            // Nothing is cut; only the saturation column grows.
            if track_col {
                let j = self.cols;
                self.cols += 1;
                for (i, s) in prods.iter().enumerate() {
                    if s.is_zero() {
                        self.sat[i].set(j);
                    }
                }
            }
            return self.check_nonempty();
        }

        let mut combos: Vec<(Row, Bits)> = Vec::new();
        for &p in &pos {
            for &n in &neg {
                if self.adjacent(p, n) {
                    let mut inter = self.sat[p].clone();
                    inter &= &self.sat[n];
                    combos.push((combine(&self.sk[p], &prods[p], &self.sk[n], &prods[n]), inter));
                }
            }
        }

        let mut sk = Vec::with_capacity(self.sk.len() - neg.len() + combos.len());
        let mut sat = Vec::with_capacity(sk.capacity());
        let mut sat_col = Vec::new();
        for (i, row) in core::mem::take(&mut self.sk).into_iter().enumerate() {
            if prods[i].is_negative() {
                continue;
            }
            sat_col.push(prods[i].is_zero());
            sk.push(row);
            sat.push(core::mem::take(&mut self.sat[i]));
        }
        for (row, satrow) in combos {
            sat_col.push(true);
            sk.push(row);
            sat.push(satrow);
        }
        self.sk = sk;
        self.sat = sat;
        if track_col {
            let j = self.cols;
            self.cols += 1;
            for (i, saturated) in sat_col.into_iter().enumerate() {
                if saturated {
                    self.sat[i].set(j);
                }
            }
        }
        self.check_nonempty()
    }

    /// The rows of this side as conversion input for the dual direction.
    pub fn as_input_rows(&self) -> Vec<(Row, bool)> {
        let mut rows = Vec::with_capacity(self.sing.len() + self.sk.len());
        for r in &self.sing {
            rows.push((r.clone(), true));
        }
        for r in &self.sk {
            rows.push((r.clone(), false));
        }
        rows
    }
}

/// A freshly minimized double description pair, both sides minimal, in raw
/// homogeneous rows.
pub(crate) struct RawPair {
    pub hom: usize,
    pub cs_sing: Vec<Row>,
    pub cs_sk: Vec<Row>,
    pub gs_sing: Vec<Row>,
    pub gs_sk: Vec<Row>,
}

fn cmp_rows(a: &Row, b: &Row) -> core::cmp::Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = x.compare(y);
        if ord != core::cmp::Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

fn sort_dedup(rows: &mut Vec<Row>) {
    rows.sort_by(cmp_rows);
    rows.dedup();
}

impl RawPair {
    fn assemble(mut cs: Dd, mut gs: Dd) -> RawPair {
        for r in cs.sing.iter_mut().chain(gs.sing.iter_mut()) {
            sign_normalize_row(r);
        }
        let mut pair = RawPair {
            hom: cs.hom,
            cs_sing: core::mem::take(&mut cs.sing),
            cs_sk: core::mem::take(&mut cs.sk),
            gs_sing: core::mem::take(&mut gs.sing),
            gs_sk: core::mem::take(&mut gs.sk),
        };
        sort_dedup(&mut pair.cs_sing);
        sort_dedup(&mut pair.cs_sk);
        sort_dedup(&mut pair.gs_sing);
        sort_dedup(&mut pair.gs_sk);
        pair
    }
}

/// Minimizes the polyhedron described by homogeneous constraint rows over
/// `space_dim` plus `slack` extra trailing dimensions.
pub(crate) fn convert_cons(
    space_dim: usize,
    rows: &[(Row, bool)],
) -> Result<RawPair, EmptyPoly> {
    let mut gs = Dd::universe_gens(space_dim);
    gs.add_rows(rows)?;
    let mut cs = Dd::full_space_cons(space_dim);
    cs.add_rows(&gs.as_input_rows())
        .unwrap_or_else(|_| unreachable!("constraint side has no emptiness check"));
    // Re-derive the generator side from the minimal constraints so both
    // sides are minimal regardless of redundancy in the input.
    let mut gs2 = Dd::universe_gens(space_dim);
    gs2.add_rows(&cs.as_input_rows())?;
    Ok(RawPair::assemble(cs, gs2))
}

/// Minimizes the polyhedron generated by homogeneous generator rows.
/// Fails with `EmptyPoly` when the rows contain no point.
pub(crate) fn convert_gens(
    space_dim: usize,
    rows: &[(Row, bool)],
) -> Result<RawPair, EmptyPoly> {
    if !rows.iter().any(|(r, s)| !s && r[0].is_positive()) {
        return Err(EmptyPoly);
    }
    let mut cs = Dd::full_space_cons(space_dim);
    cs.add_rows(rows)
        .unwrap_or_else(|_| unreachable!("constraint side has no emptiness check"));
    let mut gs = Dd::universe_gens(space_dim);
    gs.add_rows(&cs.as_input_rows())?;
    Ok(RawPair::assemble(cs, gs))
}

// ---------------------------------------------------------------------------
// Typed row conversions (closed reading: strictness is the caller's
// business and handled by the NNC engine).
// ---------------------------------------------------------------------------

pub(crate) fn con_to_row(c: &Con, hom: usize) -> (Row, bool) {
    let mut row = vec![Integer::zero(); hom];
    row[0] = c.inhomo_term().clone();
    for i in 0..c.space_dim().min(hom - 1) {
        row[i + 1] = c.linear_expr().get(i);
    }
    (row, c.is_equality())
}

pub(crate) fn gen_to_row(g: &Gen, hom: usize) -> (Row, bool) {
    let mut row = vec![Integer::zero(); hom];
    row[0] = g.divisor().clone();
    for i in 0..g.space_dim().min(hom - 1) {
        row[i + 1] = g.linear_expr().get(i);
    }
    (row, g.is_line())
}

pub(crate) fn row_to_con(row: &Row, kind: ConKind) -> Con {
    let mut expr = LinearExpr::with_dim(row.len() - 1);
    for (i, c) in row.iter().skip(1).enumerate() {
        expr.set(i, c.clone());
    }
    Con::new(expr, row[0].clone(), kind)
}

pub(crate) fn row_to_gen(row: &Row, sing: bool) -> Gen {
    let mut expr = LinearExpr::with_dim(row.len() - 1);
    for (i, c) in row.iter().skip(1).enumerate() {
        expr.set(i, c.clone());
    }
    if sing {
        Gen::new(GenKind::Line, expr, Integer::zero())
    } else if row[0].is_positive() {
        Gen::new(GenKind::Point, expr, row[0].clone())
    } else {
        Gen::new(GenKind::Ray, expr, Integer::zero())
    }
}

/// Types a raw pair into closed-topology systems plus the two saturation
/// matrices, recomputed from scratch.
pub(crate) fn type_closed_pair(space_dim: usize, pair: &RawPair) -> (ConSys, GenSys, Sat, Sat) {
    let mut cs = ConSys::new();
    for r in &pair.cs_sing {
        let mut c = row_to_con(r, ConKind::Equality);
        c.set_space_dim(space_dim);
        cs.sing_rows.push(c);
    }
    for r in &pair.cs_sk {
        let kind = if r.iter().skip(1).all(Integer::is_zero) {
            ConKind::Strict // the positivity row
        } else {
            ConKind::NonStrict
        };
        let mut c = row_to_con(r, kind);
        c.set_space_dim(space_dim);
        cs.sk_rows.push(c);
    }
    let mut gs = GenSys::new();
    for r in &pair.gs_sing {
        let mut g = row_to_gen(r, true);
        g.set_space_dim(space_dim);
        gs.sing_rows.push(g);
    }
    for r in &pair.gs_sk {
        let mut g = row_to_gen(r, false);
        g.set_space_dim(space_dim);
        gs.sk_rows.push(g);
    }
    let (sat_c, sat_g) = saturation(&cs, &gs);
    (cs, gs, sat_c, sat_g)
}

/// Recomputes both saturation matrices by evaluating every skeleton
/// constraint on every skeleton generator.
pub(crate) fn saturation(cs: &ConSys, gs: &GenSys) -> (Sat, Sat) {
    let mut sat_c = Sat::new(cs.sk_rows.len(), gs.sk_rows.len());
    for (i, c) in cs.sk_rows.iter().enumerate() {
        for (j, g) in gs.sk_rows.iter().enumerate() {
            if sat_con_gen(c, g) {
                sat_c.set(i, j);
            }
        }
    }
    let sat_g = sat_c.transpose();
    (sat_c, sat_g)
}

/// Does generator `g` saturate constraint `c` (linear form evaluates to
/// zero)? Strict constraints follow the same rule on their underlying
/// form.
pub(crate) fn sat_con_gen(c: &Con, g: &Gen) -> bool {
    eval_con_gen(c, g).is_zero()
}

/// The homogeneous scalar product of a constraint and a generator.
pub(crate) fn eval_con_gen(c: &Con, g: &Gen) -> Integer {
    let mut acc = c.linear_expr().scalar_prod(g.linear_expr());
    if g.is_point_like() {
        acc.add_mul_assign(c.inhomo_term(), g.divisor());
    }
    acc
}
