//! Widening operators.
//!
//! `x.widening_assign(y)` extrapolates the ascending pair `y ⊆ x`. The
//! H79 operator keeps exactly the constraints of the previous iterate
//! `y` that still hold on `x`. BHRZ03 refines the result with two
//! evolution heuristics under a well-founded certificate, falling back
//! to H79 whenever the certificate does not strictly decrease.

use tracing::debug;

use crate::{
    con::{Con, ConKind, Cons},
    context::{self, WidenImpl, WidenSpec},
    gen::{Gen, Gens},
    integer::Integer,
    rel::PolyConRel,
};

use super::{ops::Bound, Poly, SpecElem};

/// The termination certificate: lexicographically decreasing along any
/// properly widening sequence. Components: affine codimension, number of
/// skeleton constraints, number of skeleton generators, number of
/// non-skeleton rows.
pub(crate) fn certificate(p: &Poly) -> (usize, usize, usize, usize) {
    let codim = p.space_dim() - p.affine_dim();
    let imp = p.minimized();
    (
        codim,
        imp.cs.sk_rows.len(),
        imp.gs.sk_rows.len(),
        imp.cs.ns_rows.len() + imp.gs.ns_rows.len(),
    )
}

fn h79(x: &Poly, y: &Poly) -> Poly {
    if y.is_empty() {
        return x.clone();
    }
    let mut out = Poly::from_spec(x.space_dim(), SpecElem::Universe, x.topol());
    let mut kept = Cons::new();
    for c in y.cons() {
        if x.relation_with_con(&c).implies(PolyConRel::is_included()) {
            kept.push(c);
        }
    }
    out.add_cons(kept);
    out
}

/// Relaxes a dropped constraint of `y` outward until it holds on `x`;
/// `None` when the slope is unbounded on `x`.
fn relax_towards(x: &Poly, c: &Con) -> Option<Con> {
    let (lo, _) = x.expr_bounds(c.linear_expr(), &Integer::zero());
    match lo {
        Bound::Unbounded => None,
        Bound::Value(v, _) => {
            // expr + k >= 0 for all of x iff k >= -inf(expr).
            let (num, den) = (v.numer().clone(), v.denom().clone());
            let mut expr = c.linear_expr().clone();
            let mut den_i = Integer::zero();
            den_i.0 = den;
            let mut num_i = Integer::zero();
            num_i.0 = num;
            for i in 0..expr.space_dim() {
                let scaled = expr.get(i) * &den_i;
                expr.set(i, scaled);
            }
            let relaxed = Con::new(expr, -num_i, ConKind::NonStrict);
            if relaxed.is_tautological() {
                None
            } else {
                Some(relaxed)
            }
        }
    }
}

/// Componentwise evolution of a new ray against an old one: directions
/// that changed sign are projected away.
fn evolve_ray(r_new: &Gen, r_old: &Gen) -> Option<Gen> {
    let dim = r_new.space_dim().max(r_old.space_dim());
    let mut evolved = crate::linear_expr::LinearExpr::with_dim(dim);
    let mut changed = false;
    for i in 0..dim {
        let a = r_new.linear_expr().get(i);
        let b = r_old.linear_expr().get(i);
        if a.signum() != 0 && a.signum() == b.signum() {
            evolved.set(i, a);
        } else if !a.is_zero() {
            changed = true;
        }
    }
    if !changed || evolved.is_zero() {
        return None;
    }
    Some(crate::gen::ray(evolved))
}

fn bhrz03(x: &Poly, y: &Poly) -> Poly {
    if y.is_empty() {
        return x.clone();
    }
    let base = h79(x, y);
    let mut candidate = base.clone();

    // Heuristic 1: bring back the dropped constraints of y, relaxed just
    // enough to hold on x.
    let mut relaxed = Cons::new();
    for c in y.cons() {
        if c.is_equality() {
            continue;
        }
        if !x.relation_with_con(&c).implies(PolyConRel::is_included()) {
            if let Some(r) = relax_towards(x, &c) {
                relaxed.push(r);
            }
        }
    }
    candidate.add_cons(relaxed);

    // Heuristic 2: widen along evolving rays.
    let y_gens = y.gens();
    let mut evolved = Gens::new();
    for r_new in x.gens().iter().filter(|g| g.is_ray()) {
        if y_gens.iter().any(|g| g == r_new) {
            continue;
        }
        for r_old in y_gens.iter().filter(|g| g.is_ray()) {
            if let Some(e) = evolve_ray(r_new, r_old) {
                evolved.push(e);
            }
        }
    }
    candidate.add_gens(evolved);

    debug_assert!(candidate.contains(x));
    if candidate.equals(x) {
        // Already stable; nothing to extrapolate.
        return candidate;
    }
    if certificate(&candidate) < certificate(x) {
        candidate
    } else {
        debug!("BHRZ03 certificate did not decrease, falling back to H79");
        base
    }
}

impl Poly {
    /// Widens `self` against the previous iterate `prev`, using the
    /// process-wide widening implementation and specification.
    pub fn widening_assign(&mut self, prev: &Poly) {
        self.widening_assign_with(
            prev,
            context::default_widen_impl(),
            context::default_widen_spec(),
        );
    }

    /// Widens `self` against `prev` with an explicit implementation and
    /// specification. Under `WidenSpec::Risky`, `prev` must be contained
    /// in `self`; under `WidenSpec::Safe` it is joined in first.
    pub fn widening_assign_with(&mut self, prev: &Poly, wimpl: WidenImpl, spec: WidenSpec) {
        assert_eq!(self.space_dim(), prev.space_dim());
        assert_eq!(self.topol(), prev.topol());
        if spec == WidenSpec::Safe {
            self.poly_hull_assign(prev);
        }
        let out = match wimpl {
            WidenImpl::H79 => h79(self, prev),
            WidenImpl::Bhrz03 => bhrz03(self, prev),
        };
        *self = out;
    }
}
