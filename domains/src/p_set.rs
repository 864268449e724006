//! Finite unions of polyhedra.
//!
//! A `PSet` keeps a non-redundant list of non-empty disjuncts of equal
//! space dimension and topology. The empty list denotes the empty set.
//! Entailment is checked disjunct-wise (geometric covering), the usual
//! powerset-domain approximation.

use cvx_poly::{AffineExpr, BBox, Con, Cons, Extremum, Poly, SpecElem, Topol, Var, WidenImpl, WidenSpec};
use tracing::debug;

/// A finite, omega-reduced union of convex polyhedra.
#[derive(Clone, Debug)]
pub struct PSet {
    dim: usize,
    topol: Topol,
    disjuncts: Vec<Poly>,
}

impl PSet {
    /// The empty or universe set of the given dimension and topology.
    pub fn from_spec(dim: usize, spec: SpecElem, topol: Topol) -> PSet {
        let disjuncts = match spec {
            SpecElem::Empty => Vec::new(),
            SpecElem::Universe => vec![Poly::with_topol(dim, topol)],
        };
        PSet {
            dim,
            topol,
            disjuncts,
        }
    }

    /// The singleton union holding `p` (empty when `p` is).
    pub fn from_poly(p: Poly) -> PSet {
        let mut out = PSet::from_spec(p.space_dim(), SpecElem::Empty, p.topol());
        out.add_disjunct(p);
        out
    }

    /// The space dimension.
    pub fn space_dim(&self) -> usize {
        self.dim
    }

    /// The topology of the disjuncts.
    pub fn topol(&self) -> Topol {
        self.topol
    }

    /// The number of disjuncts.
    pub fn size(&self) -> usize {
        self.disjuncts.len()
    }

    /// The disjuncts, in order.
    pub fn iter(&self) -> impl Iterator<Item = &Poly> {
        self.disjuncts.iter()
    }

    /// Is the union empty?
    pub fn is_empty(&self) -> bool {
        self.disjuncts.is_empty()
    }

    /// Is the union the whole space?
    pub fn is_universe(&self) -> bool {
        self.disjuncts.iter().any(Poly::is_universe)
    }

    /// Drops disjuncts contained in another disjunct.
    fn omega_reduce(&mut self) {
        let mut kept: Vec<Poly> = Vec::new();
        'outer: for d in self.disjuncts.drain(..) {
            let mut i = 0;
            while i < kept.len() {
                if kept[i].contains(&d) {
                    continue 'outer;
                }
                if d.contains(&kept[i]) {
                    kept.remove(i);
                } else {
                    i += 1;
                }
            }
            kept.push(d);
        }
        self.disjuncts = kept;
    }

    /// Appends a disjunct, then omega-reduces.
    pub fn add_disjunct(&mut self, p: Poly) {
        assert_eq!(p.space_dim(), self.dim);
        assert_eq!(p.topol(), self.topol);
        if p.is_empty() {
            return;
        }
        self.disjuncts.push(p);
        self.omega_reduce();
    }

    /// Disjunct-wise entailment: every disjunct of `other` is contained
    /// in some disjunct of `self`.
    pub fn geom_covers(&self, other: &PSet) -> bool {
        other
            .disjuncts
            .iter()
            .all(|d| self.disjuncts.iter().any(|e| e.contains(d)))
    }

    /// Entailment (the disjunct-wise approximation).
    pub fn contains(&self, other: &PSet) -> bool {
        self.geom_covers(other)
    }

    /// Equality up to the disjunct-wise entailment.
    pub fn equals(&self, other: &PSet) -> bool {
        self.geom_covers(other) && other.geom_covers(self)
    }

    /// Intersection, pairwise across the two unions.
    pub fn intersection_assign(&mut self, other: &PSet) {
        assert_eq!(self.dim, other.dim);
        let mut out = Vec::new();
        for a in &self.disjuncts {
            for b in &other.disjuncts {
                let mut meet = a.clone();
                meet.intersection_assign(b);
                if !meet.is_empty() {
                    out.push(meet);
                }
            }
        }
        self.disjuncts = out;
        self.omega_reduce();
    }

    /// Set union: list concatenation plus omega-reduction (no convex
    /// hull).
    pub fn join_assign(&mut self, other: &PSet) {
        assert_eq!(self.dim, other.dim);
        self.disjuncts.extend(other.disjuncts.iter().cloned());
        self.omega_reduce();
    }

    /// Exact set difference, disjunct by disjunct.
    pub fn difference_assign(&mut self, other: &PSet) {
        assert_eq!(self.dim, other.dim);
        let strict = self.topol == Topol::Nnc;
        for b in &other.disjuncts {
            let b_cons = b.cons();
            let mut next: Vec<Poly> = Vec::new();
            for a in self.disjuncts.drain(..) {
                if b.contains(&a) {
                    continue;
                }
                if a.is_disjoint_from(b) {
                    next.push(a);
                    continue;
                }
                for c in &b_cons {
                    for side in split_eq(c.clone()) {
                        if side.is_tautological() {
                            continue;
                        }
                        let mut piece = a.clone();
                        piece.add_con(side.complement(strict));
                        if !piece.is_empty() {
                            next.push(piece);
                        }
                    }
                }
            }
            self.disjuncts = next;
        }
        self.omega_reduce();
    }

    /// Adds a constraint to every disjunct.
    pub fn add_con(&mut self, c: Con) {
        for d in &mut self.disjuncts {
            d.add_con(c.clone());
        }
        self.disjuncts.retain(|d| !d.is_empty());
    }

    /// Adds a batch of constraints to every disjunct.
    pub fn add_cons(&mut self, cs: Cons) {
        for d in &mut self.disjuncts {
            d.add_cons(cs.iter().cloned());
        }
        self.disjuncts.retain(|d| !d.is_empty());
    }

    /// Coalesces disjuncts pairwise by convex hull until at most `k`
    /// remain, greedily choosing the pair whose joined bounding box has
    /// the least pseudo-volume.
    pub fn collapse(&mut self, k: usize) {
        assert!(k > 0);
        while self.disjuncts.len() > k {
            let boxes: Vec<BBox> = self.disjuncts.iter().map(Poly::get_bounding_box).collect();
            let mut best: Option<(usize, usize)> = None;
            let mut best_vol = None;
            for i in 0..boxes.len() {
                for j in (i + 1)..boxes.len() {
                    let mut joined = boxes[i].clone();
                    joined.lub_assign(&boxes[j]);
                    let vol = joined.volume().clone();
                    if best_vol.as_ref().map_or(true, |bv| vol < *bv) {
                        best_vol = Some(vol);
                        best = Some((i, j));
                    }
                }
            }
            let (i, j) = best.expect("at least two disjuncts");
            debug!(i, j, "collapsing disjuncts");
            let other = self.disjuncts.remove(j);
            self.disjuncts[i].poly_hull_assign(&other);
            self.omega_reduce();
        }
    }

    /// The convex hull of all disjuncts as a single polyhedron.
    pub fn con_hull(&self) -> Poly {
        let mut hull = Poly::from_spec(self.dim, SpecElem::Empty, self.topol);
        for d in &self.disjuncts {
            hull.poly_hull_assign(d);
        }
        hull
    }

    /// Certificate-guided widening: widens disjunct-wise where a
    /// disjunct of `prev` is contained in the disjunct; when some
    /// disjunct has no matching previous iterate, falls back to widening
    /// the convex hulls of the two unions.
    pub fn widening_assign(&mut self, prev: &PSet, wimpl: WidenImpl) {
        assert_eq!(self.dim, prev.dim);
        if prev.is_empty() {
            return;
        }
        let all_matched = self
            .disjuncts
            .iter()
            .all(|d| prev.disjuncts.iter().any(|p| d.contains(p)));
        if all_matched {
            for d in &mut self.disjuncts {
                if let Some(p) = prev.disjuncts.iter().find(|p| d.contains(p)) {
                    d.widening_assign_with(p, wimpl, WidenSpec::Risky);
                }
            }
            self.omega_reduce();
            return;
        }
        let mut hull = self.con_hull();
        let prev_hull = prev.con_hull();
        hull.poly_hull_assign(&prev_hull);
        hull.widening_assign_with(&prev_hull, wimpl, WidenSpec::Risky);
        self.disjuncts = vec![hull];
    }

    /// The least bounding box covering every disjunct.
    pub fn get_bounding_box(&self) -> BBox {
        let mut bbox = BBox::empty(self.dim);
        for d in &self.disjuncts {
            bbox.lub_assign(&d.get_bounding_box());
        }
        bbox
    }

    /// Is every disjunct bounded?
    pub fn is_bounded(&self) -> bool {
        self.disjuncts.iter().all(Poly::is_bounded)
    }

    /// Does any disjunct constrain `v`? The union constrains `v` when it
    /// is not a cylinder along `v`.
    pub fn constrains(&self, v: Var) -> bool {
        self.disjuncts.iter().any(|d| d.constrains(v))
    }

    /// The maximum of `ae` across the union.
    pub fn max(&self, ae: &AffineExpr) -> Option<Extremum> {
        let mut best: Option<Extremum> = None;
        for d in &self.disjuncts {
            let m = d.max(ae)?;
            best = match best {
                None => Some(m),
                Some(b) if m.value > b.value || (m.value == b.value && m.included && !b.included) => {
                    Some(m)
                }
                Some(b) => Some(b),
            };
        }
        best
    }

    /// The minimum of `ae` across the union.
    pub fn min(&self, ae: &AffineExpr) -> Option<Extremum> {
        let mut best: Option<Extremum> = None;
        for d in &self.disjuncts {
            let m = d.min(ae)?;
            best = match best {
                None => Some(m),
                Some(b) if m.value < b.value || (m.value == b.value && m.included && !b.included) => {
                    Some(m)
                }
                Some(b) => Some(b),
            };
        }
        best
    }

    /// Adds dimensions to every disjunct.
    pub fn add_space_dims(&mut self, n: usize, project: bool) {
        self.dim += n;
        for d in &mut self.disjuncts {
            d.add_space_dims(n, project);
        }
    }

    /// Truncates every disjunct to `new_dim` dimensions.
    pub fn remove_higher_space_dims(&mut self, new_dim: usize) {
        assert!(new_dim <= self.dim);
        self.dim = new_dim;
        for d in &mut self.disjuncts {
            d.remove_higher_space_dims(new_dim);
        }
        self.omega_reduce();
    }

    /// Renames dimensions in every disjunct.
    pub fn map_space_dims(&mut self, pm: &[Option<usize>]) {
        self.dim = pm.iter().filter(|e| e.is_some()).count();
        for d in &mut self.disjuncts {
            d.map_space_dims(pm);
        }
        self.omega_reduce();
    }

    /// Folds dimensions into `v` in every disjunct.
    pub fn fold_space_dims(&mut self, folded: &cvx_poly::Bits, v: Var) {
        self.dim -= folded.count();
        for d in &mut self.disjuncts {
            d.fold_space_dims(folded, v);
        }
        self.omega_reduce();
    }

    /// Cartesian product with another union, pairwise.
    pub fn concatenate_assign(&mut self, other: &PSet) {
        let mut out = Vec::new();
        for a in &self.disjuncts {
            for b in &other.disjuncts {
                let mut ab = a.clone();
                ab.concatenate_assign(b);
                out.push(ab);
            }
        }
        self.dim += other.dim;
        self.disjuncts = out;
        self.omega_reduce();
    }

    /// Affine image on every disjunct.
    pub fn affine_image(&mut self, v: Var, expr: &cvx_poly::LinearExpr, inhomo: &cvx_poly::Integer, denom: &cvx_poly::Integer) {
        for d in &mut self.disjuncts {
            d.affine_image(v, expr, inhomo, denom);
        }
        self.omega_reduce();
    }

    /// Affine preimage on every disjunct.
    pub fn affine_preimage(&mut self, v: Var, expr: &cvx_poly::LinearExpr, inhomo: &cvx_poly::Integer, denom: &cvx_poly::Integer) {
        for d in &mut self.disjuncts {
            d.affine_preimage(v, expr, inhomo, denom);
        }
        self.omega_reduce();
    }

    /// Topological closure of every disjunct.
    pub fn topological_closure_assign(&mut self) {
        for d in &mut self.disjuncts {
            d.topological_closure_assign();
        }
        self.omega_reduce();
    }

    /// Rough heap usage.
    pub fn total_memory_in_bytes(&self) -> usize {
        core::mem::size_of::<PSet>()
            + self
                .disjuncts
                .iter()
                .map(Poly::total_memory_in_bytes)
                .sum::<usize>()
    }
}

fn split_eq(c: Con) -> Vec<Con> {
    if !c.is_equality() {
        return vec![c];
    }
    let (e, k, _) = c.into_parts();
    let mut neg = e.clone();
    neg.negate();
    vec![
        Con::new(e, k.clone(), cvx_poly::ConKind::NonStrict),
        Con::new(neg, -k, cvx_poly::ConKind::NonStrict),
    ]
}
