//! A tagged-variant facade over the concrete polyhedral domains.
//!
//! `DynPoly` dispatches a uniform operation surface over a monolithic
//! polyhedron (closed or NNC), a Cartesian-factored polyhedron or a
//! finite union. The kind used by the plain constructor is a
//! process-wide (thread-local) default, set once before building the
//! polyhedra that depend on it.

use core::cell::Cell;

use cvx_poly::{context, BBox, Con, Cons, Poly, SpecElem, Topol};

use crate::{f_poly::FPoly, p_set::PSet};

/// The concrete domain a `DynPoly` dispatches to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PolyKind {
    /// A single polyhedron in double description form.
    Poly,
    /// A Cartesian-factored polyhedron.
    FPoly,
    /// A finite union of polyhedra.
    PSet,
}

thread_local! {
    static DEFAULT_KIND: Cell<PolyKind> = const { Cell::new(PolyKind::Poly) };
}

/// The kind used by [`DynPoly::new`].
pub fn default_poly_kind() -> PolyKind {
    DEFAULT_KIND.with(Cell::get)
}

/// Sets the kind used by [`DynPoly::new`].
pub fn set_default_poly_kind(kind: PolyKind) {
    DEFAULT_KIND.with(|c| c.set(kind));
}

/// A polyhedron of dynamically chosen representation.
#[derive(Clone, Debug)]
pub enum DynPoly {
    /// Monolithic double description.
    Poly(Poly),
    /// Cartesian-factored.
    FPoly(FPoly),
    /// Finite union.
    PSet(PSet),
}

impl DynPoly {
    /// A universe or empty polyhedron of the process-default kind and
    /// topology.
    pub fn new(dim: usize, spec: SpecElem) -> DynPoly {
        DynPoly::with_kind(dim, spec, default_poly_kind(), context::default_topol())
    }

    /// A universe or empty polyhedron of an explicit kind and topology.
    pub fn with_kind(dim: usize, spec: SpecElem, kind: PolyKind, topol: Topol) -> DynPoly {
        match kind {
            PolyKind::Poly => DynPoly::Poly(Poly::from_spec(dim, spec, topol)),
            PolyKind::FPoly => DynPoly::FPoly(FPoly::from_spec(dim, spec, topol)),
            PolyKind::PSet => DynPoly::PSet(PSet::from_spec(dim, spec, topol)),
        }
    }

    /// The kind of the underlying representation.
    pub fn kind(&self) -> PolyKind {
        match self {
            DynPoly::Poly(_) => PolyKind::Poly,
            DynPoly::FPoly(_) => PolyKind::FPoly,
            DynPoly::PSet(_) => PolyKind::PSet,
        }
    }

    /// The space dimension.
    pub fn space_dim(&self) -> usize {
        match self {
            DynPoly::Poly(p) => p.space_dim(),
            DynPoly::FPoly(p) => p.space_dim(),
            DynPoly::PSet(p) => p.space_dim(),
        }
    }

    /// The topology.
    pub fn topol(&self) -> Topol {
        match self {
            DynPoly::Poly(p) => p.topol(),
            DynPoly::FPoly(p) => p.topol(),
            DynPoly::PSet(p) => p.topol(),
        }
    }

    /// Is the set empty?
    pub fn is_empty(&self) -> bool {
        match self {
            DynPoly::Poly(p) => p.is_empty(),
            DynPoly::FPoly(p) => p.is_empty(),
            DynPoly::PSet(p) => p.is_empty(),
        }
    }

    /// Is the set the whole space?
    pub fn is_universe(&self) -> bool {
        match self {
            DynPoly::Poly(p) => p.is_universe(),
            DynPoly::FPoly(p) => p.is_universe(),
            DynPoly::PSet(p) => p.is_universe(),
        }
    }

    /// Adds one constraint.
    pub fn add_con(&mut self, c: Con) {
        match self {
            DynPoly::Poly(p) => p.add_con(c),
            DynPoly::FPoly(p) => p.add_con(c),
            DynPoly::PSet(p) => p.add_con(c),
        }
    }

    /// Adds a batch of constraints.
    pub fn add_cons(&mut self, cs: Cons) {
        match self {
            DynPoly::Poly(p) => p.add_cons(cs),
            DynPoly::FPoly(p) => p.add_cons(cs),
            DynPoly::PSet(p) => p.add_cons(cs),
        }
    }

    /// Intersection.
    pub fn intersection_assign(&mut self, other: &DynPoly) {
        match (self, other) {
            (DynPoly::Poly(a), DynPoly::Poly(b)) => a.intersection_assign(b),
            (DynPoly::FPoly(a), DynPoly::FPoly(b)) => a.intersection_assign(b),
            (DynPoly::PSet(a), DynPoly::PSet(b)) => a.intersection_assign(b),
            _ => panic!("mismatched polyhedron kinds"),
        }
    }

    /// Upper bound: convex hull for the convex kinds, set union for the
    /// powerset.
    pub fn join_assign(&mut self, other: &DynPoly) {
        match (self, other) {
            (DynPoly::Poly(a), DynPoly::Poly(b)) => a.poly_hull_assign(b),
            (DynPoly::FPoly(a), DynPoly::FPoly(b)) => a.join_assign(b),
            (DynPoly::PSet(a), DynPoly::PSet(b)) => a.join_assign(b),
            _ => panic!("mismatched polyhedron kinds"),
        }
    }

    /// Widening against the previous iterate.
    pub fn widening_assign(&mut self, prev: &DynPoly) {
        let wimpl = context::default_widen_impl();
        match (self, prev) {
            (DynPoly::Poly(a), DynPoly::Poly(b)) => {
                a.widening_assign_with(b, wimpl, context::default_widen_spec());
            }
            (DynPoly::FPoly(a), DynPoly::FPoly(b)) => a.widening_assign(b, wimpl),
            (DynPoly::PSet(a), DynPoly::PSet(b)) => a.widening_assign(b, wimpl),
            _ => panic!("mismatched polyhedron kinds"),
        }
    }

    /// Entailment.
    pub fn contains(&self, other: &DynPoly) -> bool {
        match (self, other) {
            (DynPoly::Poly(a), DynPoly::Poly(b)) => a.contains(b),
            (DynPoly::FPoly(a), DynPoly::FPoly(b)) => a.contains(b),
            (DynPoly::PSet(a), DynPoly::PSet(b)) => a.contains(b),
            _ => panic!("mismatched polyhedron kinds"),
        }
    }

    /// Equality.
    pub fn equals(&self, other: &DynPoly) -> bool {
        self.contains(other) && other.contains(self)
    }

    /// The bounding box.
    pub fn get_bounding_box(&self) -> BBox {
        match self {
            DynPoly::Poly(p) => p.get_bounding_box(),
            DynPoly::FPoly(p) => p.get_bounding_box(),
            DynPoly::PSet(p) => p.get_bounding_box(),
        }
    }

    /// Appends `n` dimensions.
    pub fn add_space_dims(&mut self, n: usize, project: bool) {
        match self {
            DynPoly::Poly(p) => p.add_space_dims(n, project),
            DynPoly::FPoly(p) => p.add_space_dims(n, project),
            DynPoly::PSet(p) => p.add_space_dims(n, project),
        }
    }

    /// Truncates to the first `new_dim` dimensions.
    pub fn remove_higher_space_dims(&mut self, new_dim: usize) {
        match self {
            DynPoly::Poly(p) => p.remove_higher_space_dims(new_dim),
            DynPoly::FPoly(p) => p.remove_higher_space_dims(new_dim),
            DynPoly::PSet(p) => p.remove_higher_space_dims(new_dim),
        }
    }

    /// Rough heap usage.
    pub fn total_memory_in_bytes(&self) -> usize {
        match self {
            DynPoly::Poly(p) => p.total_memory_in_bytes(),
            DynPoly::FPoly(p) => p.total_memory_in_bytes(),
            DynPoly::PSet(p) => p.total_memory_in_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvx_poly::Var;

    fn a() -> Var {
        Var::new(0)
    }

    #[test]
    fn default_kind_drives_the_constructor() {
        assert_eq!(default_poly_kind(), PolyKind::Poly);
        let p = DynPoly::new(2, SpecElem::Universe);
        assert_eq!(p.kind(), PolyKind::Poly);
        set_default_poly_kind(PolyKind::PSet);
        let s = DynPoly::new(2, SpecElem::Universe);
        assert_eq!(s.kind(), PolyKind::PSet);
        set_default_poly_kind(PolyKind::Poly);
    }

    #[test]
    fn uniform_surface_agrees_across_kinds() {
        for kind in [PolyKind::Poly, PolyKind::FPoly, PolyKind::PSet] {
            let mut x = DynPoly::with_kind(1, SpecElem::Universe, kind, Topol::Closed);
            x.add_con(a().ge(0));
            x.add_con(a().le(2));
            assert!(!x.is_empty());
            assert!(!x.is_universe());
            let mut y = x.clone();
            y.add_con(a().ge(1));
            assert!(x.contains(&y));
            x.intersection_assign(&y);
            assert!(x.equals(&y));
            let bbox = x.get_bounding_box();
            assert_eq!(
                bbox.itv(0).lb,
                Some(cvx_poly::Rational::from(num_bigint::BigInt::from(1)))
            );
            x.add_space_dims(1, false);
            assert_eq!(x.space_dim(), 2);
            x.remove_higher_space_dims(1);
            assert_eq!(x.space_dim(), 1);
            assert!(x.total_memory_in_bytes() > 0);
        }
    }

    #[test]
    fn widening_dispatches() {
        let mut x = DynPoly::with_kind(1, SpecElem::Universe, PolyKind::Poly, Topol::Closed);
        x.add_con(a().ge(0));
        x.add_con(a().le(2));
        let mut y = DynPoly::with_kind(1, SpecElem::Universe, PolyKind::Poly, Topol::Closed);
        y.add_con(a().ge(0));
        y.add_con(a().le(1));
        x.widening_assign(&y);
        let mut expected = DynPoly::with_kind(1, SpecElem::Universe, PolyKind::Poly, Topol::Closed);
        expected.add_con(a().ge(0));
        assert!(x.equals(&expected));
    }
}
