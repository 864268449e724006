//! Cartesian-factored polyhedra.
//!
//! An `FPoly` represents a polyhedron as a product of independent
//! factors over disjoint dimension blocks: single dimensions are kept as
//! rational intervals, larger blocks as polyhedra over the block's
//! dimensions only. No constraint relates two blocks; adding one that
//! does merges the blocks involved (union-find over dimensions). Most
//! operations are factor-wise after aligning the two partitions to their
//! least upper bound.

use cvx_poly::{
    BBox, Bits, Con, Cons, Itv, LinearExpr, Poly, SpecElem, Topol, Var, WidenImpl, WidenSpec,
};
use itertools::Itertools;
use tracing::debug;

/// One factor of the product: the global dimensions it owns (ascending)
/// and its body.
#[derive(Clone, Debug)]
struct Factor {
    dims: Vec<usize>,
    body: Body,
}

#[derive(Clone, Debug)]
enum Body {
    /// A single-dimension factor.
    Itv(Itv),
    /// A block factor over `dims.len()` local dimensions.
    Poly(Poly),
}

/// A polyhedron kept in Cartesian-factored form.
#[derive(Clone, Debug)]
pub struct FPoly {
    dim: usize,
    topol: Topol,
    empty: bool,
    factors: Vec<Factor>,
}

fn itv_to_poly(itv: &Itv, topol: Topol) -> Poly {
    let mut p = Poly::with_topol(1, topol);
    let v = Var::new(0);
    if let Some(lb) = &itv.lb {
        let num = lb.numer().clone();
        let den = lb.denom().clone();
        let e = scale_var(v, den);
        let c = if itv.lb_open {
            e.gt(int(num))
        } else {
            e.ge(int(num))
        };
        p.add_con(c);
    }
    if let Some(ub) = &itv.ub {
        let num = ub.numer().clone();
        let den = ub.denom().clone();
        let e = scale_var(v, den);
        let c = if itv.ub_open {
            e.lt(int(num))
        } else {
            e.le(int(num))
        };
        p.add_con(c);
    }
    p
}

fn scale_var(v: Var, den: num_bigint::BigInt) -> LinearExpr {
    let mut e = LinearExpr::with_dim(v.space_dim());
    e.set(v.id(), int(den));
    e
}

fn int(b: num_bigint::BigInt) -> cvx_poly::Integer {
    cvx_poly::Integer::from(b)
}

fn poly_to_itv(p: &Poly) -> Itv {
    debug_assert_eq!(p.space_dim(), 1);
    p.get_bounding_box().itv(0).clone()
}

impl FPoly {
    /// The universe or empty factored polyhedron.
    pub fn from_spec(dim: usize, spec: SpecElem, topol: Topol) -> FPoly {
        let empty = spec == SpecElem::Empty;
        let factors = if empty {
            Vec::new()
        } else {
            (0..dim)
                .map(|i| Factor {
                    dims: vec![i],
                    body: Body::Itv(Itv::universe()),
                })
                .collect()
        };
        FPoly {
            dim,
            topol,
            empty,
            factors,
        }
    }

    /// Factors a monolithic polyhedron: dimensions related by some
    /// constraint land in the same block.
    pub fn from_poly(p: &Poly) -> FPoly {
        let dim = p.space_dim();
        let topol = p.topol();
        if p.is_empty() {
            return FPoly::from_spec(dim, SpecElem::Empty, topol);
        }
        let mut out = FPoly::from_spec(dim, SpecElem::Universe, topol);
        out.add_cons(p.cons());
        out
    }

    /// The space dimension.
    pub fn space_dim(&self) -> usize {
        self.dim
    }

    /// The topology.
    pub fn topol(&self) -> Topol {
        self.topol
    }

    /// Is the represented set empty?
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Is the represented set the whole space?
    pub fn is_universe(&self) -> bool {
        !self.empty
            && self.factors.iter().all(|f| match &f.body {
                Body::Itv(itv) => *itv == Itv::universe(),
                Body::Poly(p) => p.is_universe(),
            })
    }

    /// The dimension blocks, ascending within each block and over block
    /// leaders; single (interval) dimensions come as singleton blocks.
    pub fn blocks(&self) -> Vec<Vec<usize>> {
        self.factors.iter().map(|f| f.dims.clone()).collect()
    }

    /// The number of generator rows per factor; the product form keeps
    /// this sum small where the monolithic generator system would be the
    /// product of the factor counts.
    pub fn gens_info(&self) -> Vec<usize> {
        self.factors
            .iter()
            .map(|f| match &f.body {
                Body::Itv(itv) => itv_to_poly(itv, self.topol).num_min_gens(),
                Body::Poly(p) => p.num_min_gens(),
            })
            .collect()
    }

    fn set_empty(&mut self) {
        self.empty = true;
        self.factors.clear();
    }

    fn factor_of(&self, dim: usize) -> usize {
        self.factors
            .iter()
            .position(|f| f.dims.binary_search(&dim).is_ok())
            .expect("dimension outside every factor")
    }

    fn body_poly(&self, idx: usize) -> Poly {
        match &self.factors[idx].body {
            Body::Itv(itv) => itv_to_poly(itv, self.topol),
            Body::Poly(p) => p.clone(),
        }
    }

    /// Merges the given factors into one block; returns its index.
    fn merge_factors(&mut self, mut idxs: Vec<usize>) -> usize {
        idxs.sort_unstable();
        idxs.dedup();
        if idxs.len() == 1 {
            return idxs[0];
        }
        debug!(count = idxs.len(), "merging factors");
        let mut dims: Vec<usize> = Vec::new();
        for &i in &idxs {
            dims.extend(self.factors[i].dims.iter().copied());
        }
        dims.sort_unstable();
        let mut merged = Poly::with_topol(dims.len(), self.topol);
        for &i in &idxs {
            let part = self.body_poly(i);
            let part_dims = self.factors[i].dims.clone();
            let mut cons = Cons::new();
            for c in part.cons() {
                cons.push(remap_con(&c, &part_dims, &dims));
            }
            merged.add_cons(cons);
        }
        // Remove the old factors back to front, then insert the block.
        for &i in idxs.iter().rev() {
            self.factors.remove(i);
        }
        let leader = dims[0];
        let pos = self
            .factors
            .iter()
            .position(|f| f.dims[0] > leader)
            .unwrap_or(self.factors.len());
        self.factors.insert(
            pos,
            Factor {
                dims,
                body: Body::Poly(merged),
            },
        );
        pos
    }

    /// Adds one constraint, merging the blocks it relates.
    pub fn add_con(&mut self, c: Con) {
        if self.empty {
            return;
        }
        if c.is_tautological() {
            return;
        }
        if c.is_inconsistent() {
            self.set_empty();
            return;
        }
        let support: Vec<usize> = (0..c.space_dim())
            .filter(|i| !c.linear_expr().get(*i).is_zero())
            .collect();
        debug_assert!(!support.is_empty());
        let idxs: Vec<usize> = support.iter().map(|d| self.factor_of(*d)).collect();
        let idx = self.merge_factors(idxs);
        let topol = self.topol;
        let local = remap_con_to_local(&c, &self.factors[idx].dims);
        let mut became_empty = false;
        match &mut self.factors[idx].body {
            Body::Itv(itv) => {
                let mut p = itv_to_poly(itv, topol);
                p.add_con(local);
                if p.is_empty() {
                    became_empty = true;
                } else {
                    *itv = poly_to_itv(&p);
                }
            }
            Body::Poly(p) => {
                p.add_con(local);
                if p.is_empty() {
                    became_empty = true;
                }
            }
        }
        if became_empty {
            self.set_empty();
        }
    }

    /// Adds a batch of constraints.
    pub fn add_cons(&mut self, cs: Cons) {
        for c in cs {
            if self.empty {
                return;
            }
            self.add_con(c);
        }
    }

    /// Defactorizes into a monolithic polyhedron.
    pub fn get_poly(&self) -> Poly {
        if self.empty {
            return Poly::from_spec(self.dim, SpecElem::Empty, self.topol);
        }
        let mut out = Poly::with_topol(self.dim, self.topol);
        let mut cons = Cons::new();
        for (i, f) in self.factors.iter().enumerate() {
            let p = self.body_poly(i);
            for c in p.cons() {
                cons.push(remap_con_to_global(&c, &f.dims, self.dim));
            }
        }
        out.add_cons(cons);
        out
    }

    /// Aligns `self` and `other` to the least upper bound of their block
    /// partitions.
    fn align_with(&mut self, other: &mut FPoly) {
        assert_eq!(self.dim, other.dim);
        // Union-find over dimensions, joined across both partitions.
        let mut parent: Vec<usize> = (0..self.dim).collect();
        fn find(parent: &mut Vec<usize>, x: usize) -> usize {
            if parent[x] != x {
                let root = find(parent, parent[x]);
                parent[x] = root;
            }
            parent[x]
        }
        for fp in [&*self, &*other] {
            for f in &fp.factors {
                for w in f.dims.windows(2) {
                    let (a, b) = (find(&mut parent, w[0]), find(&mut parent, w[1]));
                    if a != b {
                        parent[a.max(b)] = a.min(b);
                    }
                }
            }
        }
        let roots: Vec<usize> = (0..self.dim)
            .map(|d| find(&mut parent, d))
            .sorted_unstable()
            .dedup()
            .collect();
        for side in [&mut *self, &mut *other] {
            if side.empty {
                continue;
            }
            for &root in &roots {
                let idxs: Vec<usize> = side
                    .factors
                    .iter()
                    .positions(|f| find(&mut parent, f.dims[0]) == root)
                    .collect();
                if idxs.len() > 1 {
                    side.merge_factors(idxs);
                }
            }
        }
    }

    /// Factor-wise intersection.
    pub fn intersection_assign(&mut self, other: &FPoly) {
        let mut rhs = other.clone();
        self.align_with(&mut rhs);
        if rhs.empty {
            self.set_empty();
        }
        if self.empty {
            return;
        }
        for (i, f) in rhs.factors.iter().enumerate() {
            debug_assert_eq!(self.factors[i].dims, f.dims);
            let both_itv = matches!(
                (&self.factors[i].body, &f.body),
                (Body::Itv(_), Body::Itv(_))
            );
            if both_itv {
                let emptied = {
                    let Body::Itv(b) = &f.body else { unreachable!() };
                    let Body::Itv(a) = &mut self.factors[i].body else {
                        unreachable!()
                    };
                    a.glb_assign(b);
                    a.is_empty()
                };
                if emptied {
                    self.set_empty();
                    return;
                }
            } else {
                let mut a = self.body_poly(i);
                a.intersection_assign(&rhs.body_poly(i));
                if a.is_empty() {
                    self.set_empty();
                    return;
                }
                self.factors[i].body = Body::Poly(a);
            }
        }
    }

    /// Factor-wise join (the factored upper bound of the two operands).
    pub fn join_assign(&mut self, other: &FPoly) {
        let mut rhs = other.clone();
        self.align_with(&mut rhs);
        if rhs.empty {
            return;
        }
        if self.empty {
            *self = rhs;
            return;
        }
        for (i, f) in rhs.factors.iter().enumerate() {
            let both_itv = matches!(
                (&self.factors[i].body, &f.body),
                (Body::Itv(_), Body::Itv(_))
            );
            if both_itv {
                let Body::Itv(b) = &f.body else { unreachable!() };
                let Body::Itv(a) = &mut self.factors[i].body else {
                    unreachable!()
                };
                a.lub_assign(b);
            } else {
                let mut a = self.body_poly(i);
                a.poly_hull_assign(&rhs.body_poly(i));
                self.factors[i].body = Body::Poly(a);
            }
        }
    }

    /// Constraint hull, then the mandatory global renormalization:
    /// after the factor-wise hull on the common partition the result is
    /// refactored from scratch, so independence that reappears splits
    /// the blocks again.
    pub fn con_hull_assign(&mut self, other: &FPoly) {
        let mut rhs = other.clone();
        self.align_with(&mut rhs);
        if rhs.empty {
            return;
        }
        if self.empty {
            *self = rhs;
            return;
        }
        for (i, f) in rhs.factors.iter().enumerate() {
            debug_assert_eq!(self.factors[i].dims, f.dims);
            let mut a = self.body_poly(i);
            a.con_hull_assign(&rhs.body_poly(i));
            self.factors[i].body = Body::Poly(a);
        }
        self.renormalize();
    }

    /// Refactors every block from its constraints; blocks whose
    /// dimensions became independent split apart.
    fn renormalize(&mut self) {
        if self.empty {
            return;
        }
        let snapshot = self.get_poly();
        *self = FPoly::from_poly(&snapshot);
    }

    /// Factor-wise widening against the previous iterate.
    pub fn widening_assign(&mut self, prev: &FPoly, wimpl: WidenImpl) {
        let mut rhs = prev.clone();
        self.align_with(&mut rhs);
        if rhs.empty || self.empty {
            return;
        }
        for (i, f) in rhs.factors.iter().enumerate() {
            debug_assert_eq!(self.factors[i].dims, f.dims);
            let mut a = self.body_poly(i);
            a.widening_assign_with(&rhs.body_poly(i), wimpl, WidenSpec::Risky);
            if a.space_dim() == 1 {
                self.factors[i].body = Body::Itv(poly_to_itv(&a));
            } else {
                self.factors[i].body = Body::Poly(a);
            }
        }
    }

    /// Containment, factor-wise on the aligned partition.
    pub fn contains(&self, other: &FPoly) -> bool {
        if other.empty {
            return true;
        }
        if self.empty {
            return false;
        }
        let mut lhs = self.clone();
        let mut rhs = other.clone();
        lhs.align_with(&mut rhs);
        lhs.factors
            .iter()
            .enumerate()
            .all(|(i, _)| lhs.body_poly(i).contains(&rhs.body_poly(i)))
    }

    /// Set equality.
    pub fn equals(&self, other: &FPoly) -> bool {
        self.contains(other) && other.contains(self)
    }

    /// The bounding box (factor-wise, exact).
    pub fn get_bounding_box(&self) -> BBox {
        if self.empty {
            return BBox::empty(self.dim);
        }
        let mut itvs = vec![Itv::universe(); self.dim];
        for (i, f) in self.factors.iter().enumerate() {
            match &f.body {
                Body::Itv(itv) => itvs[f.dims[0]] = itv.clone(),
                Body::Poly(_) => {
                    let bbox = self.body_poly(i).get_bounding_box();
                    for (local, global) in f.dims.iter().enumerate() {
                        itvs[*global] = bbox.itv(local).clone();
                    }
                }
            }
        }
        BBox::from_itvs(itvs)
    }

    /// Appends `n` unconstrained (or zero-pinned) dimensions.
    pub fn add_space_dims(&mut self, n: usize, project: bool) {
        let old = self.dim;
        self.dim += n;
        if self.empty {
            return;
        }
        for j in old..self.dim {
            let body = if project {
                Body::Itv(Itv::singleton(cvx_poly::Rational::from(num_bigint::BigInt::from(0))))
            } else {
                Body::Itv(Itv::universe())
            };
            self.factors.push(Factor {
                dims: vec![j],
                body,
            });
        }
    }

    /// Truncates to the first `new_dim` dimensions.
    pub fn remove_higher_space_dims(&mut self, new_dim: usize) {
        assert!(new_dim <= self.dim);
        if self.empty {
            self.dim = new_dim;
            return;
        }
        let mut kept: Vec<Factor> = Vec::new();
        for (i, f) in self.factors.iter().enumerate() {
            let inside: Vec<usize> = f.dims.iter().copied().filter(|d| *d < new_dim).collect();
            if inside.is_empty() {
                continue;
            }
            if inside.len() == f.dims.len() {
                kept.push(f.clone());
                continue;
            }
            // Project the factor onto its surviving dimensions.
            let mut p = self.body_poly(i);
            let mut removed = Bits::new();
            for (local, d) in f.dims.iter().enumerate() {
                if *d >= new_dim {
                    removed.set(local);
                }
            }
            p.remove_space_dims(&removed);
            let body = if inside.len() == 1 {
                Body::Itv(poly_to_itv(&p))
            } else {
                Body::Poly(p)
            };
            kept.push(Factor { dims: inside, body });
        }
        self.factors = kept;
        self.dim = new_dim;
    }

    /// Rough heap usage.
    pub fn total_memory_in_bytes(&self) -> usize {
        core::mem::size_of::<FPoly>()
            + self
                .factors
                .iter()
                .map(|f| match &f.body {
                    Body::Itv(_) => core::mem::size_of::<Factor>(),
                    Body::Poly(p) => core::mem::size_of::<Factor>() + p.total_memory_in_bytes(),
                })
                .sum::<usize>()
    }
}

/// Remaps a constraint over `from_dims` local coordinates into the local
/// coordinates of the enclosing `to_dims` block.
fn remap_con(c: &Con, from_dims: &[usize], to_dims: &[usize]) -> Con {
    let mut e = LinearExpr::with_dim(to_dims.len());
    for (local, global) in from_dims.iter().enumerate() {
        let coeff = c.linear_expr().get(local);
        if !coeff.is_zero() {
            let target = to_dims.binary_search(global).expect("dims must nest");
            e.set(target, coeff);
        }
    }
    Con::new(e, c.inhomo_term().clone(), c.kind())
}

/// Remaps a global-coordinates constraint into block-local coordinates.
fn remap_con_to_local(c: &Con, dims: &[usize]) -> Con {
    let mut e = LinearExpr::with_dim(dims.len());
    for (local, global) in dims.iter().enumerate() {
        let coeff = c.linear_expr().get(*global);
        if !coeff.is_zero() {
            e.set(local, coeff);
        }
    }
    Con::new(e, c.inhomo_term().clone(), c.kind())
}

/// Remaps a block-local constraint back to global coordinates.
fn remap_con_to_global(c: &Con, dims: &[usize], dim: usize) -> Con {
    let mut e = LinearExpr::with_dim(dim);
    for (local, global) in dims.iter().enumerate() {
        let coeff = c.linear_expr().get(local);
        if !coeff.is_zero() {
            e.set(*global, coeff);
        }
    }
    Con::new(e, c.inhomo_term().clone(), c.kind())
}
