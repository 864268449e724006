//! The user-facing polyhedron type.
//!
//! A `Poly` owns a constraint system, a generator system and their
//! saturation matrices, plus the pending systems holding rows added since
//! the last minimization. Queries minimize lazily through interior
//! mutability: `Poly` is `Send` but deliberately not `Sync` — share
//! across threads by cloning, or minimize explicitly first.

mod ascii;
mod ops;
mod widen;

#[cfg(test)]
mod tests;

use core::cell::{Ref, RefCell};
use core::fmt;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tracing::debug;

use crate::{
    bits::Bits,
    con::{Con, ConKind, Cons},
    context::Topol,
    conv,
    gen::{Gen, GenKind, Gens},
    integer::{Integer, Rational},
    linear_expr::LinearExpr,
    nnc,
    rel::{PolyConRel, PolyGenRel},
    sat::Sat,
    sys::{ConSys, GenSys},
    var::Var,
};

pub use ops::Extremum;

/// Degenerate element selector for polyhedron construction.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SpecElem {
    /// The whole space.
    Universe,
    /// The empty set.
    Empty,
}

/// The minimization status of a polyhedron.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Status {
    /// Known empty; the systems are cleared.
    Empty,
    /// Both systems minimized and mutually consistent.
    Minimized,
    /// Pending rows await the next minimization.
    Pending,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Empty => write!(f, "EMPTY"),
            Status::Minimized => write!(f, "MINIMIZED"),
            Status::Pending => write!(f, "PENDING"),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct PolyImpl {
    pub topol: Topol,
    pub dim: usize,
    pub status: Status,
    pub cs: ConSys,
    pub gs: GenSys,
    pub sat_c: Sat,
    pub sat_g: Sat,
    pub cs_pending: ConSys,
    pub gs_pending: GenSys,
}

/// A convex polyhedron over the rationals, kept in double description
/// form.
#[derive(Debug)]
pub struct Poly {
    inner: RefCell<PolyImpl>,
}

impl Clone for Poly {
    fn clone(&self) -> Self {
        Poly {
            inner: RefCell::new(self.inner.borrow().clone()),
        }
    }
}

impl PolyImpl {
    fn universe(dim: usize, topol: Topol) -> PolyImpl {
        let mut cs = ConSys::new();
        cs.push(Con::zero_dim_positivity());
        let mut gs = GenSys::new();
        for i in 0..dim {
            gs.push(crate::gen::line(LinearExpr::from(Var::new(i))));
        }
        gs.push(Gen::zero_dim_point());
        let (sat_c, sat_g) = conv::saturation(&cs, &gs);
        PolyImpl {
            topol,
            dim,
            status: Status::Minimized,
            cs,
            gs,
            sat_c,
            sat_g,
            cs_pending: ConSys::new(),
            gs_pending: GenSys::new(),
        }
    }

    fn empty(dim: usize, topol: Topol) -> PolyImpl {
        PolyImpl {
            topol,
            dim,
            status: Status::Empty,
            cs: ConSys::new(),
            gs: GenSys::new(),
            sat_c: Sat::default(),
            sat_g: Sat::default(),
            cs_pending: ConSys::new(),
            gs_pending: GenSys::new(),
        }
    }

    pub(crate) fn set_empty(&mut self) {
        *self = PolyImpl::empty(self.dim, self.topol);
    }

    /// Merges the pending rows into the primary systems.
    pub(crate) fn minimize(&mut self) {
        match self.status {
            Status::Empty => return,
            Status::Minimized => {
                debug_assert!(self.cs_pending.is_empty() && self.gs_pending.is_empty());
                return;
            }
            Status::Pending => {}
        }
        debug!(dim = self.dim, topol = %self.topol, "minimizing");
        let outcome = if !self.gs_pending.is_empty() {
            debug_assert!(self.cs_pending.is_empty());
            let systems: Vec<&GenSys> = if self.gs.is_empty() {
                vec![&self.gs_pending]
            } else {
                vec![&self.gs, &self.gs_pending]
            };
            match self.topol {
                Topol::Closed => {
                    let rows: Vec<(conv::Row, bool)> = systems
                        .iter()
                        .flat_map(|s| s.iter_rows())
                        .map(|g| conv::gen_to_row(g, self.dim + 1))
                        .collect();
                    conv::convert_gens(self.dim, &rows).map(|pair| {
                        conv::type_closed_pair(self.dim, &pair)
                    })
                }
                Topol::Nnc => nnc::min_from_gens(self.dim, &systems)
                    .map(|m| (m.cs, m.gs, m.sat_c, m.sat_g)),
            }
        } else {
            let systems: Vec<&ConSys> = if self.cs_pending.is_empty() {
                vec![&self.cs]
            } else {
                vec![&self.cs, &self.cs_pending]
            };
            match self.topol {
                Topol::Closed => {
                    let mut empty = false;
                    let mut rows: Vec<(conv::Row, bool)> = Vec::new();
                    for c in systems.iter().flat_map(|s| s.iter_rows()) {
                        if c.is_inconsistent() {
                            empty = true;
                            break;
                        }
                        if !c.is_tautological() {
                            rows.push(conv::con_to_row(c, self.dim + 1));
                        }
                    }
                    if empty {
                        Err(conv::EmptyPoly)
                    } else {
                        conv::convert_cons(self.dim, &rows)
                            .map(|pair| conv::type_closed_pair(self.dim, &pair))
                    }
                }
                Topol::Nnc => nnc::min_from_cons(self.dim, &systems)
                    .map(|m| (m.cs, m.gs, m.sat_c, m.sat_g)),
            }
        };
        match outcome {
            Ok((cs, gs, sat_c, sat_g)) => {
                self.cs = cs;
                self.gs = gs;
                self.sat_c = sat_c;
                self.sat_g = sat_g;
                self.cs_pending.clear();
                self.gs_pending.clear();
                self.status = Status::Minimized;
            }
            Err(conv::EmptyPoly) => self.set_empty(),
        }
    }

    /// Flushes pending generators so constraints can be appended.
    pub(crate) fn flush_gs_pending(&mut self) {
        if !self.gs_pending.is_empty() {
            self.minimize();
        }
    }

    /// Flushes pending constraints so generators can be appended.
    pub(crate) fn flush_cs_pending(&mut self) {
        if !self.cs_pending.is_empty() {
            self.minimize();
        }
    }

    /// All constraints, with non-skeleton supports materialized as the
    /// strict sum of their skeleton rows. Valid on minimized systems and
    /// on pending snapshots alike.
    pub(crate) fn expanded_cons(sys: &ConSys) -> Cons {
        let mut out: Cons = sys.iter_rows().cloned().collect();
        for ns in &sys.ns_rows {
            let mut expr = LinearExpr::new();
            let mut inhomo = Integer::zero();
            for i in ns {
                let c = &sys.sk_rows[i];
                expr.add_mul_assign(&Integer::one(), c.linear_expr());
                inhomo += c.inhomo_term();
            }
            out.push(Con::new(expr, inhomo, ConKind::Strict));
        }
        out
    }

    /// All generators, with non-skeleton supports materialized as their
    /// barycenter point.
    pub(crate) fn expanded_gens(sys: &GenSys) -> Gens {
        let mut out: Gens = sys.iter_rows().cloned().collect();
        for ns in &sys.ns_rows {
            let mut expr = LinearExpr::new();
            let mut div = Integer::zero();
            for i in ns {
                let g = &sys.sk_rows[i];
                expr.add_mul_assign(&Integer::one(), g.linear_expr());
                div += g.divisor();
            }
            debug_assert!(div.is_positive());
            out.push(Gen::new(GenKind::Point, expr, div));
        }
        out
    }

    /// Does generator `g` satisfy constraint `c`? The rules of §6.2:
    /// lines and (for equalities) rays must saturate; points must satisfy
    /// strict constraints strictly; closure points only non-strictly.
    pub(crate) fn con_satisfies_gen(c: &Con, g: &Gen) -> bool {
        let v = conv::eval_con_gen(c, g);
        match (c.kind(), g.kind()) {
            (ConKind::Equality, _) => v.is_zero(),
            (_, GenKind::Line) => v.is_zero(),
            (ConKind::NonStrict, _) => !v.is_negative(),
            (ConKind::Strict, GenKind::Point) => v.is_positive(),
            (ConKind::Strict, _) => !v.is_negative(),
        }
    }

    /// Is every expanded generator of `sys` admitted by every expanded
    /// constraint of `cons`?
    pub(crate) fn gens_satisfy_cons(gens: &Gens, cons: &Cons) -> bool {
        cons.iter()
            .all(|c| gens.iter().all(|g| PolyImpl::con_satisfies_gen(c, g)))
    }

    pub(crate) fn is_empty_now(&self) -> bool {
        debug_assert!(self.status != Status::Pending);
        self.status == Status::Empty
    }
}

impl Poly {
    /// The universe polyhedron of the given space dimension, closed
    /// topology.
    pub fn new(dim: usize) -> Poly {
        Poly::with_topol(dim, Topol::Closed)
    }

    /// The universe polyhedron of the given space dimension and topology.
    pub fn with_topol(dim: usize, topol: Topol) -> Poly {
        Poly::from_spec(dim, SpecElem::Universe, topol)
    }

    /// A universe or empty polyhedron.
    pub fn from_spec(dim: usize, spec: SpecElem, topol: Topol) -> Poly {
        let imp = match spec {
            SpecElem::Universe => PolyImpl::universe(dim, topol),
            SpecElem::Empty => PolyImpl::empty(dim, topol),
        };
        Poly {
            inner: RefCell::new(imp),
        }
    }

    pub(crate) fn imp(&self) -> Ref<'_, PolyImpl> {
        self.inner.borrow()
    }

    pub(crate) fn imp_mut(&mut self) -> &mut PolyImpl {
        self.inner.get_mut()
    }

    /// Borrows the minimized state, minimizing first if needed.
    pub(crate) fn minimized(&self) -> Ref<'_, PolyImpl> {
        if self.inner.borrow().status == Status::Pending {
            self.inner.borrow_mut().minimize();
        }
        self.inner.borrow()
    }

    /// The space dimension.
    pub fn space_dim(&self) -> usize {
        self.imp().dim
    }

    /// The topology.
    pub fn topol(&self) -> Topol {
        self.imp().topol
    }

    /// The current status.
    pub fn status(&self) -> Status {
        self.imp().status
    }

    /// Merges pending rows and brings both systems to minimized form.
    pub fn minimize(&self) {
        self.inner.borrow_mut().minimize();
    }

    /// Is this the empty polyhedron?
    pub fn is_empty(&self) -> bool {
        self.minimized().is_empty_now()
    }

    /// Is this the whole space?
    pub fn is_universe(&self) -> bool {
        let imp = self.minimized();
        if imp.is_empty_now() {
            return false;
        }
        imp.cs.sing_rows.is_empty()
            && imp.cs.ns_rows.is_empty()
            && imp.cs.sk_rows.iter().all(Con::is_tautological)
    }

    /// Is the polyhedron topologically closed?
    pub fn is_topologically_closed(&self) -> bool {
        let imp = self.minimized();
        if imp.is_empty_now() || imp.topol.is_closed() {
            return true;
        }
        // Only the positivity row may be strict.
        imp.cs.ns_rows.is_empty()
            && imp
                .cs
                .sk_rows
                .iter()
                .all(|c| !c.is_strict_inequality() || c.is_tautological())
    }

    /// Appends a constraint; lazy.
    pub fn add_con(&mut self, c: Con) {
        assert!(c.space_dim() <= self.space_dim(), "constraint dimension exceeds space");
        assert!(
            !c.is_strict_inequality() || self.topol() == Topol::Nnc || c.is_tautological(),
            "strict constraint on a closed polyhedron"
        );
        let imp = self.imp_mut();
        if imp.status == Status::Empty {
            return;
        }
        imp.flush_gs_pending();
        let mut c = c;
        c.set_space_dim(imp.dim);
        imp.cs_pending.push(c);
        imp.status = Status::Pending;
    }

    /// Appends a batch of constraints; lazy.
    pub fn add_cons(&mut self, cs: impl IntoIterator<Item = Con>) {
        for c in cs {
            self.add_con(c);
        }
    }

    /// Appends a generator; lazy.
    pub fn add_gen(&mut self, g: Gen) {
        assert!(g.space_dim() <= self.space_dim(), "generator dimension exceeds space");
        assert!(
            !g.is_closure_point() || self.topol() == Topol::Nnc,
            "closure point on a closed polyhedron"
        );
        let imp = self.imp_mut();
        imp.flush_cs_pending();
        let mut g = g;
        g.set_space_dim(imp.dim);
        imp.gs_pending.push(g);
        imp.status = Status::Pending;
    }

    /// Appends a batch of generators; lazy.
    pub fn add_gens(&mut self, gs: impl IntoIterator<Item = Gen>) {
        for g in gs {
            self.add_gen(g);
        }
    }

    /// A copy of the minimized constraints, non-skeleton rows
    /// materialized.
    pub fn cons(&self) -> Cons {
        let imp = self.minimized();
        if imp.is_empty_now() {
            return vec![Con::zero_dim_false()];
        }
        PolyImpl::expanded_cons(&imp.cs)
    }

    /// A copy of the minimized generators, non-skeleton rows
    /// materialized.
    pub fn gens(&self) -> Gens {
        let imp = self.minimized();
        if imp.is_empty_now() {
            return Gens::new();
        }
        PolyImpl::expanded_gens(&imp.gs)
    }

    /// The number of rows of the minimized constraint system.
    pub fn num_min_cons(&self) -> usize {
        let imp = self.minimized();
        if imp.is_empty_now() {
            return 0;
        }
        imp.cs.num_rows()
    }

    /// The number of rows of the minimized generator system.
    pub fn num_min_gens(&self) -> usize {
        let imp = self.minimized();
        if imp.is_empty_now() {
            return 0;
        }
        imp.gs.num_rows()
    }

    /// Set containment: does `self` contain `other`?
    pub fn contains(&self, other: &Poly) -> bool {
        assert_eq!(self.space_dim(), other.space_dim());
        if core::ptr::eq(self, other) {
            return true;
        }
        if other.is_empty() {
            return true;
        }
        if self.is_empty() {
            return false;
        }
        let cons = self.cons();
        let gens = other.gens();
        PolyImpl::gens_satisfy_cons(&gens, &cons)
    }

    /// Are the two polyhedra the same set?
    pub fn equals(&self, other: &Poly) -> bool {
        self.contains(other) && other.contains(self)
    }

    /// Do the two polyhedra have no common point?
    pub fn is_disjoint_from(&self, other: &Poly) -> bool {
        let mut meet = self.clone();
        meet.intersection_assign(other);
        meet.is_empty()
    }

    /// Box-filtered disjointness: the exact result, reached through the
    /// bounding-box pre-check when it already decides.
    pub fn boxed_is_disjoint_from(&self, other: &Poly) -> bool {
        if self.is_empty() || other.is_empty() {
            return true;
        }
        if self.get_bounding_box().is_disjoint_from(&other.get_bounding_box()) {
            return true;
        }
        self.is_disjoint_from(other)
    }

    /// Box-filtered containment.
    pub fn boxed_contains(&self, other: &Poly) -> bool {
        if other.is_empty() {
            return true;
        }
        if self.is_empty() {
            return false;
        }
        if !self.get_bounding_box().contains(&other.get_bounding_box()) {
            return false;
        }
        self.contains(other)
    }

    /// The relation between this polyhedron and a constraint.
    pub fn relation_with_con(&self, c: &Con) -> PolyConRel {
        let imp = self.minimized();
        if imp.is_empty_now() {
            return PolyConRel::saturates() | PolyConRel::is_included() | PolyConRel::is_disjoint();
        }
        drop(imp);
        let (inf, sup) = self.expr_bounds(c.linear_expr(), c.inhomo_term());
        use self::ops::Bound;
        let mut rel = PolyConRel::nothing();
        let zero = Rational::from(num_bigint::BigInt::from(0));
        let sign_or = |b: &Bound, unbounded: i32| match b {
            Bound::Unbounded => unbounded,
            Bound::Value(v, _) => match v.cmp(&zero) {
                core::cmp::Ordering::Less => -1,
                core::cmp::Ordering::Equal => 0,
                core::cmp::Ordering::Greater => 1,
            },
        };
        let inf_sign = sign_or(&inf, -1);
        let sup_sign = sign_or(&sup, 1);
        let inf_at = matches!(&inf, Bound::Value(_, true));
        let sup_at = matches!(&sup, Bound::Value(_, true));
        if inf_sign == 0 && sup_sign == 0 {
            rel = rel | PolyConRel::saturates();
        }
        match c.kind() {
            ConKind::Equality => {
                if inf_sign == 0 && sup_sign == 0 {
                    rel = rel | PolyConRel::is_included();
                } else if inf_sign > 0
                    || (inf_sign == 0 && !inf_at)
                    || sup_sign < 0
                    || (sup_sign == 0 && !sup_at)
                {
                    rel = rel | PolyConRel::is_disjoint();
                }
            }
            ConKind::NonStrict => {
                if inf_sign > 0 || inf_sign == 0 {
                    rel = rel | PolyConRel::is_included();
                }
                if sup_sign < 0 || (sup_sign == 0 && !sup_at) {
                    rel = rel | PolyConRel::is_disjoint();
                }
            }
            ConKind::Strict => {
                if inf_sign > 0 || (inf_sign == 0 && !inf_at) {
                    rel = rel | PolyConRel::is_included();
                }
                if sup_sign < 0 || sup_sign == 0 {
                    rel = rel | PolyConRel::is_disjoint();
                }
            }
        }
        if !rel.implies(PolyConRel::is_included()) && !rel.implies(PolyConRel::is_disjoint()) {
            rel = rel | PolyConRel::strictly_intersects();
        }
        rel
    }

    /// The relation between this polyhedron and a generator: `subsumes`
    /// iff adding `g` leaves the set unchanged.
    pub fn relation_with_gen(&self, g: &Gen) -> PolyGenRel {
        let imp = self.minimized();
        if imp.is_empty_now() {
            return PolyGenRel::nothing();
        }
        let cons = PolyImpl::expanded_cons(&imp.cs);
        let subsumed = cons.iter().all(|c| {
            let v = conv::eval_con_gen(c, g);
            match (c.kind(), g.kind()) {
                (ConKind::Equality, _) => v.is_zero(),
                (_, GenKind::Line) => v.is_zero(),
                (ConKind::Strict, GenKind::Point) => v.is_positive(),
                _ => !v.is_negative(),
            }
        });
        if subsumed {
            PolyGenRel::subsumes()
        } else {
            PolyGenRel::nothing()
        }
    }

    /// Does any constraint of the polyhedron mention variable `v`?
    pub fn constrains(&self, v: Var) -> bool {
        let imp = self.minimized();
        if imp.is_empty_now() {
            return true;
        }
        let result = imp.cs
            .iter_rows()
            .any(|c| !c.coeff(v).is_zero());
        result
    }

    /// A hash that depends only on the represented set.
    pub fn hash(&self) -> u64 {
        let imp = self.minimized();
        let mut h = DefaultHasher::new();
        imp.topol.hash(&mut h);
        imp.dim.hash(&mut h);
        if imp.is_empty_now() {
            "empty".hash(&mut h);
            return h.finish();
        }
        for c in imp.cs.iter_rows() {
            c.hash(&mut h);
        }
        for ns in &imp.cs.ns_rows {
            ns.hash(&mut h);
        }
        h.finish()
    }

    /// Checks the representation invariants; used by tests and debug
    /// builds.
    pub fn check_inv(&self) -> bool {
        let imp = self.imp();
        match imp.status {
            Status::Empty => {
                imp.cs.is_empty() && imp.gs.is_empty() && imp.cs_pending.is_empty()
                    && imp.gs_pending.is_empty()
            }
            Status::Pending => !(imp.cs_pending.is_empty() && imp.gs_pending.is_empty()),
            Status::Minimized => {
                if !(imp.cs_pending.is_empty() && imp.gs_pending.is_empty()) {
                    return false;
                }
                if imp.sat_c.num_rows() != imp.cs.sk_rows.len()
                    || imp.sat_c.num_cols() != imp.gs.sk_rows.len()
                    || imp.sat_g.num_rows() != imp.gs.sk_rows.len()
                {
                    return false;
                }
                // ns invariants: support size >= 2, no strict skeleton
                // member, saturation matrices transposed.
                let ns_ok = imp.cs.ns_rows.iter().all(|ns| {
                    ns.count() >= 2 && ns.iter().all(|i| !imp.cs.sk_rows[i].is_strict_inequality())
                }) && imp.gs.ns_rows.iter().all(|ns| {
                    ns.count() >= 2 && ns.iter().all(|i| !imp.gs.sk_rows[i].is_point())
                });
                if !ns_ok {
                    return false;
                }
                let (sat_c, sat_g) = conv::saturation(&imp.cs, &imp.gs);
                if sat_c != imp.sat_c || sat_g != imp.sat_g {
                    return false;
                }
                // Generators must satisfy constraints.
                let cons = PolyImpl::expanded_cons(&imp.cs);
                let gens = PolyImpl::expanded_gens(&imp.gs);
                if imp.topol.is_closed()
                    && (cons.iter().any(|c| c.is_strict_inequality() && !c.is_tautological())
                        || gens.iter().any(Gen::is_closure_point))
                {
                    return false;
                }
                PolyImpl::gens_satisfy_cons(&gens, &cons)
            }
        }
    }

    /// Rough heap usage of this polyhedron.
    pub fn total_memory_in_bytes(&self) -> usize {
        let imp = self.imp();
        let sys_c = |s: &ConSys| -> usize {
            s.iter_rows().map(Con::external_memory_in_bytes).sum::<usize>()
                + s.ns_rows.iter().map(Bits::external_memory_in_bytes).sum::<usize>()
        };
        let sys_g = |s: &GenSys| -> usize {
            s.iter_rows().map(Gen::external_memory_in_bytes).sum::<usize>()
                + s.ns_rows.iter().map(Bits::external_memory_in_bytes).sum::<usize>()
        };
        core::mem::size_of::<PolyImpl>()
            + sys_c(&imp.cs)
            + sys_c(&imp.cs_pending)
            + sys_g(&imp.gs)
            + sys_g(&imp.gs_pending)
            + imp.sat_c.external_memory_in_bytes()
            + imp.sat_g.external_memory_in_bytes()
    }
}

impl PartialEq for Poly {
    fn eq(&self, other: &Poly) -> bool {
        self.equals(other)
    }
}

impl Eq for Poly {}

// The raw minimized value (not the lazy cell) determines the hash; see
// `Poly::hash`.
impl fmt::Display for Poly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cons = self.cons();
        let mut first = true;
        for c in &cons {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{c}")?;
            first = false;
        }
        if first {
            write!(f, "true")?;
        }
        Ok(())
    }
}

