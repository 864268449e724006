//! Set-theoretic, affine and dimension operations on polyhedra.

use itertools::izip;

use crate::{
    bbox::{BBox, Itv},
    bits::Bits,
    con::{Con, ConKind, Cons},
    context::Topol,
    gen::{Gen, GenKind, Gens},
    integer::{rational, Integer, Rational},
    linear_expr::{AffineExpr, LinearExpr},
    rel::PolyConRel,
    var::Var,
};

use super::{Poly, PolyImpl, SpecElem, Status};

/// One side of the reachable values of a linear form over a polyhedron.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Bound {
    /// The form is unbounded in this direction.
    Unbounded,
    /// The best value, and whether some point attains it.
    Value(Rational, bool),
}

/// An exact optimum of an affine expression over a polyhedron.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extremum {
    /// The optimal value (the supremum/infimum when not included).
    pub value: Rational,
    /// Whether the optimum is attained by a point of the polyhedron.
    pub included: bool,
    /// A generator attaining the bound (a closure point when the optimum
    /// is not included).
    pub witness: Gen,
}

enum DirBound {
    Unbounded,
    Value(Rational, bool, Gen),
    Nowhere,
}

impl Poly {
    /// The reachable bound of `expr + inhomo` in one direction.
    fn bound_impl(&self, expr: &LinearExpr, inhomo: &Integer, maximize: bool) -> DirBound {
        let imp = self.minimized();
        if imp.is_empty_now() {
            return DirBound::Nowhere;
        }
        for l in &imp.gs.sing_rows {
            if !expr.scalar_prod(l.linear_expr()).is_zero() {
                return DirBound::Unbounded;
            }
        }
        let gens = PolyImpl::expanded_gens(&imp.gs);
        drop(imp);
        let mut best: Option<(Rational, bool, Gen)> = None;
        for g in gens {
            match g.kind() {
                GenKind::Line => {}
                GenKind::Ray => {
                    let s = expr.scalar_prod(g.linear_expr());
                    if (maximize && s.is_positive()) || (!maximize && s.is_negative()) {
                        return DirBound::Unbounded;
                    }
                }
                GenKind::Point | GenKind::ClosurePoint => {
                    let mut num = expr.scalar_prod(g.linear_expr());
                    num.add_mul_assign(inhomo, g.divisor());
                    let v = rational(&num, g.divisor());
                    let attained = g.is_point();
                    let replace = match &best {
                        None => true,
                        Some((bv, _, _)) => {
                            if maximize {
                                v > *bv
                            } else {
                                v < *bv
                            }
                        }
                    };
                    if replace {
                        best = Some((v, attained, g));
                    } else if attained {
                        if let Some((bv, batt, bw)) = &mut best {
                            if *bv == v && !*batt {
                                *batt = true;
                                *bw = g;
                            }
                        }
                    }
                }
            }
        }
        match best {
            None => DirBound::Nowhere,
            Some((v, att, g)) => DirBound::Value(v, att, g),
        }
    }

    /// The infimum and supremum of `expr + inhomo` over the polyhedron.
    /// Only meaningful on non-empty polyhedra.
    pub(crate) fn expr_bounds(&self, expr: &LinearExpr, inhomo: &Integer) -> (Bound, Bound) {
        let lo = match self.bound_impl(expr, inhomo, false) {
            DirBound::Unbounded | DirBound::Nowhere => Bound::Unbounded,
            DirBound::Value(v, a, _) => Bound::Value(v, a),
        };
        let hi = match self.bound_impl(expr, inhomo, true) {
            DirBound::Unbounded | DirBound::Nowhere => Bound::Unbounded,
            DirBound::Value(v, a, _) => Bound::Value(v, a),
        };
        (lo, hi)
    }

    /// The exact maximum of an affine expression, `None` when the
    /// polyhedron is empty or the expression is unbounded above.
    pub fn max(&self, ae: &AffineExpr) -> Option<Extremum> {
        match self.bound_impl(&ae.expr, &ae.inhomo, true) {
            DirBound::Value(value, included, witness) => Some(Extremum {
                value,
                included,
                witness,
            }),
            _ => None,
        }
    }

    /// The exact minimum of an affine expression.
    pub fn min(&self, ae: &AffineExpr) -> Option<Extremum> {
        match self.bound_impl(&ae.expr, &ae.inhomo, false) {
            DirBound::Value(value, included, witness) => Some(Extremum {
                value,
                included,
                witness,
            }),
            _ => None,
        }
    }

    /// Is the polyhedron bounded?
    pub fn is_bounded(&self) -> bool {
        let imp = self.minimized();
        imp.is_empty_now()
            || (imp.gs.sing_rows.is_empty() && imp.gs.sk_rows.iter().all(Gen::is_point_like))
    }

    /// Is `expr` bounded from above (`maximize`) or below over the
    /// polyhedron?
    pub fn is_bounded_expr(&self, maximize: bool, expr: &LinearExpr) -> bool {
        !matches!(
            self.bound_impl(expr, &Integer::zero(), maximize),
            DirBound::Unbounded
        )
    }

    /// The axis-aligned bounding box.
    pub fn get_bounding_box(&self) -> BBox {
        let dim = self.space_dim();
        if self.is_empty() {
            return BBox::empty(dim);
        }
        let mut itvs = Vec::with_capacity(dim);
        for i in 0..dim {
            let expr = LinearExpr::from(Var::new(i));
            let (lo, hi) = self.expr_bounds(&expr, &Integer::zero());
            let mut itv = Itv::universe();
            if let Bound::Value(v, att) = lo {
                itv.lb = Some(v);
                itv.lb_open = !att;
            }
            if let Bound::Value(v, att) = hi {
                itv.ub = Some(v);
                itv.ub_open = !att;
            }
            itvs.push(itv);
        }
        BBox::from_itvs(itvs)
    }

    /// The dimension of the affine hull.
    pub fn affine_dim(&self) -> usize {
        let imp = self.minimized();
        if imp.is_empty_now() {
            return 0;
        }
        imp.dim - imp.cs.sing_rows.len()
    }

    // -- set-theoretic operations --------------------------------------

    /// Intersection, in place.
    pub fn intersection_assign(&mut self, other: &Poly) {
        assert_eq!(self.space_dim(), other.space_dim());
        assert_eq!(self.topol(), other.topol());
        if self.imp().status == Status::Empty {
            return;
        }
        if other.is_empty() {
            self.imp_mut().set_empty();
            return;
        }
        if other.is_universe() {
            return;
        }
        self.add_cons(other.cons());
    }

    /// Convex polyhedral hull of the union, in place.
    pub fn poly_hull_assign(&mut self, other: &Poly) {
        assert_eq!(self.space_dim(), other.space_dim());
        assert_eq!(self.topol(), other.topol());
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = other.clone();
            return;
        }
        self.add_gens(other.gens());
    }

    /// Constraint hull: the intersection of the half-spaces valid for
    /// both operands. Equalities participate as pairs of inequalities.
    pub fn con_hull_assign(&mut self, other: &Poly) {
        assert_eq!(self.space_dim(), other.space_dim());
        assert_eq!(self.topol(), other.topol());
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = other.clone();
            return;
        }
        let mut kept = Cons::new();
        let keep_implied = |source: &Poly, target: &Poly, kept: &mut Cons| {
            for c in source.cons() {
                for side in split_equality(c) {
                    if target
                        .relation_with_con(&side)
                        .implies(PolyConRel::is_included())
                    {
                        kept.push(side);
                    }
                }
            }
        };
        keep_implied(self, other, &mut kept);
        keep_implied(other, self, &mut kept);
        let mut out = Poly::from_spec(self.space_dim(), SpecElem::Universe, self.topol());
        out.add_cons(kept);
        *self = out;
    }

    /// The poly-hull of the set difference `self \ other`, in place.
    pub fn poly_difference_assign(&mut self, other: &Poly) {
        assert_eq!(self.space_dim(), other.space_dim());
        assert_eq!(self.topol(), other.topol());
        if self.is_empty() || other.is_empty() {
            return;
        }
        if other.contains(self) {
            self.imp_mut().set_empty();
            return;
        }
        let strict = self.topol() == Topol::Nnc;
        let mut acc = Poly::from_spec(self.space_dim(), SpecElem::Empty, self.topol());
        for c in other.cons() {
            if c.is_tautological() {
                continue;
            }
            if self
                .relation_with_con(&c)
                .implies(PolyConRel::is_included())
            {
                continue;
            }
            for side in split_equality(c) {
                let mut piece = self.clone();
                piece.add_con(side.complement(strict));
                acc.poly_hull_assign(&piece);
            }
        }
        *self = acc;
    }

    /// Continuous time elapse: from every point of `self`, move along any
    /// direction present in `other`.
    pub fn time_elapse_assign(&mut self, other: &Poly) {
        assert_eq!(self.space_dim(), other.space_dim());
        assert_eq!(self.topol(), other.topol());
        if self.is_empty() || other.is_empty() {
            return;
        }
        let mut dirs = Gens::new();
        for g in other.gens() {
            match g.kind() {
                GenKind::Line | GenKind::Ray => dirs.push(g),
                GenKind::Point | GenKind::ClosurePoint => {
                    let (_, expr, _) = g.into_parts();
                    if !expr.is_zero() {
                        dirs.push(crate::gen::ray(expr));
                    }
                }
            }
        }
        self.add_gens(dirs);
    }

    /// Replaces the polyhedron with its topological closure.
    pub fn topological_closure_assign(&mut self) {
        if self.topol() == Topol::Closed || self.is_empty() {
            return;
        }
        if self.is_topologically_closed() {
            return;
        }
        let dim = self.space_dim();
        let cons: Cons = self
            .cons()
            .into_iter()
            .map(|c| c.closure())
            .filter(|c| !c.is_tautological())
            .collect();
        self.rebuild_from_cons(dim, Topol::Nnc, cons);
    }

    /// Reinterprets the topology. Closed to NNC is always exact; NNC to
    /// closed requires the polyhedron to be topologically closed already.
    pub fn set_topology(&mut self, topol: Topol) {
        if self.topol() == topol {
            return;
        }
        if topol == Topol::Nnc {
            self.minimize();
            self.imp_mut().topol = Topol::Nnc;
        } else {
            debug_assert!(self.is_topologically_closed());
            self.minimize();
            let imp = self.imp_mut();
            imp.topol = Topol::Closed;
            for c in imp.cs.sk_rows.iter_mut() {
                if c.is_strict_inequality() && !c.is_tautological() {
                    c.set_kind(ConKind::NonStrict);
                }
            }
        }
    }

    // -- affine transformations ----------------------------------------

    /// Assigns `v := (expr + inhomo) / denom`, transforming the
    /// generators. `denom` must be positive.
    pub fn affine_image(&mut self, v: Var, expr: &LinearExpr, inhomo: &Integer, denom: &Integer) {
        assert!(denom.is_positive(), "affine image with non-positive denominator");
        assert!(v.id() < self.space_dim());
        if self.is_empty() {
            return;
        }
        let dim = self.space_dim();
        let topol = self.topol();
        let mut gens = Gens::new();
        for g in self.gens() {
            let (kind, e, div) = g.into_parts();
            let mut num = expr.scalar_prod(&e);
            if !div.is_zero() {
                num.add_mul_assign(inhomo, &div);
            }
            let mut e2 = LinearExpr::with_dim(dim);
            for i in 0..dim {
                if i == v.id() {
                    e2.set(i, num.clone());
                } else {
                    e2.set(i, e.get(i) * denom);
                }
            }
            let div2 = &div * denom;
            match kind {
                GenKind::Line | GenKind::Ray => {
                    if !e2.is_zero() {
                        gens.push(Gen::new(kind, e2, Integer::zero()));
                    }
                }
                _ => gens.push(Gen::new(kind, e2, div2)),
            }
        }
        self.rebuild_from_gens(dim, topol, gens);
    }

    /// The inverse transformation of `affine_image`, transforming the
    /// constraints.
    pub fn affine_preimage(&mut self, v: Var, expr: &LinearExpr, inhomo: &Integer, denom: &Integer) {
        assert!(denom.is_positive(), "affine preimage with non-positive denominator");
        assert!(v.id() < self.space_dim());
        if self.is_empty() {
            return;
        }
        let dim = self.space_dim();
        let topol = self.topol();
        let mut cons = Cons::new();
        for c in self.cons() {
            let (e, k, kind) = c.into_parts();
            let av = e.get(v.id());
            let mut e2 = LinearExpr::with_dim(dim);
            for i in 0..dim {
                if i == v.id() {
                    e2.set(i, &av * &expr.get(i));
                } else {
                    let mut coeff = e.get(i) * denom;
                    coeff.add_mul_assign(&av, &expr.get(i));
                    e2.set(i, coeff);
                }
            }
            let mut k2 = &k * denom;
            k2.add_mul_assign(&av, inhomo);
            cons.push(Con::new(e2, k2, kind));
        }
        self.rebuild_from_cons(dim, topol, cons);
    }

    /// Simultaneous affine images, computed by renaming through a pool of
    /// fresh dimensions and substituting.
    pub fn parallel_affine_image(
        &mut self,
        vars: &[Var],
        exprs: &[LinearExpr],
        inhomos: &[Integer],
        denoms: &[Integer],
    ) {
        assert!(vars.len() == exprs.len() && vars.len() == inhomos.len() && vars.len() == denoms.len());
        if vars.is_empty() || self.is_empty() {
            return;
        }
        let dim = self.space_dim();
        let k = vars.len();
        self.add_space_dims(k, false);
        for (j, (expr, inhomo, denom)) in izip!(exprs, inhomos, denoms).enumerate() {
            self.affine_image(Var::new(dim + j), expr, inhomo, denom);
        }
        // Move each fresh dimension onto its target, dropping the old one.
        let mut pm: Vec<Option<usize>> = (0..dim).map(Some).collect();
        pm.extend(core::iter::repeat(None).take(k));
        for (j, v) in vars.iter().enumerate() {
            pm[v.id()] = None;
            pm[dim + j] = Some(v.id());
        }
        self.map_space_dims(&pm);
    }

    // -- dimension surgery ---------------------------------------------

    /// Adds `n` new dimensions; unconstrained when `project` is false,
    /// pinned to zero otherwise.
    pub fn add_space_dims(&mut self, n: usize, project: bool) {
        if n == 0 {
            return;
        }
        let dim = self.space_dim();
        let topol = self.topol();
        let new_dim = dim + n;
        if self.is_empty() {
            *self = Poly::from_spec(new_dim, SpecElem::Empty, topol);
            return;
        }
        if project {
            let mut cons = self.cons();
            for j in dim..new_dim {
                cons.push(LinearExpr::from(Var::new(j)).eq(0));
            }
            self.rebuild_from_cons(new_dim, topol, cons);
        } else {
            let mut gens = self.gens();
            for g in gens.iter_mut() {
                g.set_space_dim(new_dim);
            }
            for j in dim..new_dim {
                gens.push(crate::gen::line(LinearExpr::from(Var::new(j))));
            }
            self.rebuild_from_gens(new_dim, topol, gens);
        }
    }

    /// Projects away the dimensions named by `removed`.
    pub fn remove_space_dims(&mut self, removed: &Bits) {
        if removed.is_empty() {
            return;
        }
        let dim = self.space_dim();
        debug_assert!(removed.last().map_or(true, |l| l < dim));
        let dropped = removed.iter().filter(|i| *i < dim).count();
        let new_dim = dim - dropped;
        let topol = self.topol();
        if self.is_empty() {
            *self = Poly::from_spec(new_dim, SpecElem::Empty, topol);
            return;
        }
        let mut gens = Gens::new();
        for g in self.gens() {
            let (kind, mut e, div) = g.into_parts();
            e.remove_space_dims(removed);
            e.set_space_dim(new_dim);
            match kind {
                GenKind::Line | GenKind::Ray => {
                    if !e.is_zero() {
                        gens.push(Gen::new(kind, e, Integer::zero()));
                    }
                }
                _ => gens.push(Gen::new(kind, e, div)),
            }
        }
        self.rebuild_from_gens(new_dim, topol, gens);
    }

    /// Truncates the space to the first `new_dim` dimensions.
    pub fn remove_higher_space_dims(&mut self, new_dim: usize) {
        let dim = self.space_dim();
        assert!(new_dim <= dim);
        let mut removed = Bits::new();
        for i in new_dim..dim {
            removed.set(i);
        }
        self.remove_space_dims(&removed);
    }

    /// Renames the dimensions according to the partial map `pm`:
    /// `pm[i] = Some(j)` sends dimension `i` to `j`, `None` drops it.
    /// The defined entries must be injective onto `0..new_dim`.
    pub fn map_space_dims(&mut self, pm: &[Option<usize>]) {
        let dim = self.space_dim();
        assert_eq!(pm.len(), dim);
        let new_dim = pm.iter().filter(|e| e.is_some()).count();
        let topol = self.topol();
        if self.is_empty() {
            *self = Poly::from_spec(new_dim, SpecElem::Empty, topol);
            return;
        }
        let mut gens = Gens::new();
        for g in self.gens() {
            let (kind, e, div) = g.into_parts();
            let mut e2 = LinearExpr::with_dim(new_dim);
            for (i, target) in pm.iter().enumerate() {
                if let Some(j) = target {
                    debug_assert!(*j < new_dim);
                    e2.set(*j, e.get(i));
                }
            }
            match kind {
                GenKind::Line | GenKind::Ray => {
                    if !e2.is_zero() {
                        gens.push(Gen::new(kind, e2, Integer::zero()));
                    }
                }
                _ => gens.push(Gen::new(kind, e2, div)),
            }
        }
        self.rebuild_from_gens(new_dim, topol, gens);
    }

    /// Duplicates variable `v` into `n` fresh trailing dimensions that
    /// carry the same constraints.
    pub fn expand_space_dim(&mut self, v: Var, n: usize) {
        if n == 0 {
            return;
        }
        let dim = self.space_dim();
        assert!(v.id() < dim);
        let base_cons = self.cons();
        self.add_space_dims(n, false);
        if self.is_empty() {
            return;
        }
        let mut copies = Cons::new();
        for c in &base_cons {
            let av = c.coeff(v);
            if av.is_zero() {
                continue;
            }
            for j in 0..n {
                let mut e = c.linear_expr().clone();
                e.set(v.id(), Integer::zero());
                e.set(dim + j, av.clone());
                copies.push(Con::new(e, c.inhomo_term().clone(), c.kind()));
            }
        }
        self.add_cons(copies);
    }

    /// Folds the dimensions in `folded` into `v`: the result is the hull
    /// of the projections mapping each folded dimension onto `v`, with
    /// the folded dimensions removed.
    pub fn fold_space_dims(&mut self, folded: &Bits, v: Var) {
        assert!(!folded.test(v.id()));
        if folded.is_empty() {
            return;
        }
        let dim = self.space_dim();
        let mut base = self.clone();
        base.remove_space_dims(folded);
        for w in folded {
            assert!(w < dim);
            let mut copy = self.clone();
            let mut pm: Vec<Option<usize>> = (0..dim).map(Some).collect();
            pm.swap(v.id(), w);
            copy.map_space_dims(&pm);
            copy.remove_space_dims(folded);
            base.poly_hull_assign(&copy);
        }
        *self = base;
    }

    /// Cartesian concatenation: `self × other`.
    pub fn concatenate_assign(&mut self, other: &Poly) {
        assert_eq!(self.topol(), other.topol());
        let dim = self.space_dim();
        let other_dim = other.space_dim();
        self.add_space_dims(other_dim, false);
        if other.is_empty() {
            let topol = self.topol();
            *self = Poly::from_spec(dim + other_dim, SpecElem::Empty, topol);
            return;
        }
        let mut shifted = Cons::new();
        for c in other.cons() {
            let (mut e, k, kind) = c.into_parts();
            e.shift_space_dims(Var::new(0), dim);
            shifted.push(Con::new(e, k, kind));
        }
        self.add_cons(shifted);
    }

    /// Existentially quantifies the given variables in place, without
    /// removing the dimensions.
    pub fn unconstrain(&mut self, vars: &Bits) {
        if self.is_empty() {
            return;
        }
        let mut lines = Gens::new();
        for i in vars {
            assert!(i < self.space_dim());
            lines.push(crate::gen::line(LinearExpr::from(Var::new(i))));
        }
        self.add_gens(lines);
    }

    // -- splitting ------------------------------------------------------

    /// Refines `self` with `c` and returns the complementary part
    /// `self ∩ ¬c`. In the closed topology both sides share the
    /// boundary.
    pub fn split(&mut self, c: Con) -> Poly {
        assert!(c.is_inequality(), "split requires an inequality");
        let strict = self.topol() == Topol::Nnc;
        let mut other = self.clone();
        other.add_con(c.complement(strict));
        self.add_con(c);
        other
    }

    /// As `split`, but both sides are tightened to integer feasibility.
    /// Requires a non-strict or strict inequality with integer data.
    pub fn integral_split(&mut self, c: Con) -> Poly {
        assert!(c.is_inequality(), "integral split requires an inequality");
        let (e, k, kind) = c.into_parts();
        let g = e.gcd(0, e.space_dim());
        if g.is_zero() {
            // Constant constraint: one side is everything, the other
            // empty.
            let this_side = Con::new(e.clone(), k, kind);
            let mut other = self.clone();
            if this_side.is_tautological() {
                other.imp_mut().set_empty();
            } else {
                self.imp_mut().set_empty();
            }
            return other;
        }
        let mut e = e;
        e.exact_div_assign(&g);
        // e' >= t with t = ceil(-k / g); strict raises the bound by one.
        let mut neg_k = -&k;
        if kind == ConKind::Strict {
            neg_k += Integer::one();
        }
        let t = neg_k.div_ceil(&g);
        let keep = Con::new(e.clone(), -&t, ConKind::NonStrict);
        let mut flipped = e;
        flipped.negate();
        let other_con = Con::new(flipped, &t - Integer::one(), ConKind::NonStrict);
        let mut other = self.clone();
        other.add_con(other_con);
        self.add_con(keep);
        other
    }

    // -- rebuild helpers ------------------------------------------------

    pub(crate) fn rebuild_from_gens(&mut self, dim: usize, topol: Topol, gens: Gens) {
        let mut imp = PolyImpl::empty(dim, topol);
        if !gens.is_empty() {
            for g in gens {
                imp.gs_pending.push(g);
            }
            imp.status = Status::Pending;
        }
        *self.imp_mut() = imp;
    }

    pub(crate) fn rebuild_from_cons(&mut self, dim: usize, topol: Topol, cons: Cons) {
        let mut poly = Poly::from_spec(dim, SpecElem::Universe, topol);
        poly.add_cons(cons);
        *self = poly;
    }
}

/// Splits an equality into its two inequality sides; inequalities pass
/// through.
pub(crate) fn split_equality(c: Con) -> Vec<Con> {
    if !c.is_equality() {
        return vec![c];
    }
    let (e, k, _) = c.into_parts();
    let mut neg = e.clone();
    neg.negate();
    vec![
        Con::new(e, k.clone(), ConKind::NonStrict),
        Con::new(neg, -k, ConKind::NonStrict),
    ]
}
