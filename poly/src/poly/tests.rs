use super::*;
use crate::{
    context::{WidenImpl, WidenSpec},
    gen::{closure_point, point, ray},
    linear_expr::AffineExpr,
    var::Var,
};

fn a() -> Var {
    Var::new(0)
}
fn b() -> Var {
    Var::new(1)
}

fn from_cons(dim: usize, topol: Topol, cons: Vec<Con>) -> Poly {
    let mut p = Poly::from_spec(dim, SpecElem::Universe, topol);
    p.add_cons(cons);
    p
}

fn from_gens(dim: usize, topol: Topol, gens: Vec<Gen>) -> Poly {
    let mut p = Poly::from_spec(dim, SpecElem::Empty, topol);
    p.add_gens(gens);
    p
}

fn q(n: i64) -> crate::integer::Rational {
    crate::integer::Rational::from(num_bigint::BigInt::from(n))
}

#[test]
fn universe_and_empty_basics() {
    let u = Poly::new(2);
    assert!(u.is_universe());
    assert!(!u.is_empty());
    assert!(u.check_inv());
    assert_eq!(u.affine_dim(), 2);

    let e = Poly::from_spec(2, SpecElem::Empty, Topol::Closed);
    assert!(e.is_empty());
    assert!(!e.is_universe());
    assert!(e.check_inv());
    assert_eq!(e.affine_dim(), 0);

    assert!(u.contains(&e));
    assert!(!e.contains(&u));
    assert!(u.contains(&u));
}

#[test]
fn empty_from_inconsistent_cons() {
    let p = from_cons(2, Topol::Closed, vec![a().ge(2), a().le(1)]);
    assert!(p.is_empty());
    assert!(p.check_inv());
}

#[test]
fn triangle_generators() {
    let ph = from_cons(
        2,
        Topol::Closed,
        vec![a().ge(0), b().ge(0), (a() + b()).le(2)],
    );
    let known = from_gens(
        2,
        Topol::Closed,
        vec![point(LinearExpr::new()), point(2 * a()), point(2 * b())],
    );
    assert!(ph.equals(&known));
    assert!(ph.check_inv());

    let mut strip = ph.clone();
    strip.add_gen(ray(LinearExpr::from(a())));
    let known_strip = from_cons(2, Topol::Closed, vec![a().ge(0), b().ge(0), b().le(2)]);
    assert!(strip.equals(&known_strip));
}

#[test]
fn nnc_triangle_closure() {
    let mut ph = from_cons(
        2,
        Topol::Nnc,
        vec![a().gt(0), b().gt(0), (a() + b()).lt(4)],
    );
    assert!(!ph.is_topologically_closed());
    ph.topological_closure_assign();
    let known = from_cons(
        2,
        Topol::Nnc,
        vec![a().ge(0), b().ge(0), (a() + b()).le(4)],
    );
    assert!(ph.equals(&known));
    assert!(ph.is_topologically_closed());
    // Closure is idempotent.
    let before = ph.clone();
    ph.topological_closure_assign();
    assert!(ph.equals(&before));
}

#[test]
fn square_minus_corner_has_one_support() {
    let mut ph = Poly::with_topol(2, Topol::Nnc);
    ph.add_cons(vec![a().ge(0), b().ge(0), a().le(2), b().le(2)]);
    let mut ns = Bits::new();
    ns.set(0);
    ns.set(1);
    ph.imp_mut().cs_pending.push_ns(ns);
    ph.minimize();

    let imp = ph.imp();
    assert_eq!(imp.cs.ns_rows.len(), 1);
    assert_eq!(imp.cs.ns_rows[0].count(), 2);
    assert!(imp
        .cs
        .ns_rows[0]
        .iter()
        .all(|i| imp.cs.sk_rows[i].is_nonstrict_inequality()));
    drop(imp);
    assert!(ph.check_inv());

    let known = from_gens(
        2,
        Topol::Nnc,
        vec![
            point(2 * b()),
            point(2 * a()),
            point(2 * a() + 2 * b()),
            closure_point(LinearExpr::new()),
        ],
    );
    assert!(ph.equals(&known));
}

#[test]
fn singleton_support_promotes_skeleton_row() {
    let mut ph = Poly::with_topol(2, Topol::Nnc);
    ph.add_cons(vec![a().ge(0), b().ge(0), a().le(2), b().le(2)]);
    ph.imp_mut().cs_pending.push_ns(Bits::single(0));
    let known = from_cons(
        2,
        Topol::Nnc,
        vec![a().gt(0), a().le(2), b().ge(0), b().le(2)],
    );
    assert!(ph.equals(&known));
}

#[test]
fn incremental_add_after_minimize() {
    let mut ph = Poly::with_topol(2, Topol::Nnc);
    ph.add_cons(vec![a().ge(0), a().le(4), b().ge(0), b().le(4)]);
    ph.minimize();

    ph.add_con(a().le(2));
    ph.add_con(b().le(2));
    let mut ns = Bits::new();
    ns.set(0);
    ns.set(1);
    ph.imp_mut().cs_pending.push_ns(ns);

    let known = from_gens(
        2,
        Topol::Nnc,
        vec![
            point(LinearExpr::new()),
            point(2 * a()),
            point(2 * b()),
            closure_point(2 * a() + 2 * b()),
        ],
    );
    assert!(ph.equals(&known));
}

#[test]
fn split_nnc_both_sides() {
    let cs = vec![a().ge(0), b().ge(0), a().le(4), b().le(4)];
    let mut ph1 = from_cons(2, Topol::Nnc, cs.clone());
    let ph2 = ph1.split(a().gt(2));

    let mut knr1 = from_cons(2, Topol::Nnc, cs.clone());
    knr1.add_con(a().gt(2));
    let mut knr2 = from_cons(2, Topol::Nnc, cs);
    knr2.add_con(a().le(2));
    assert!(ph1.equals(&knr1));
    assert!(ph2.equals(&knr2));

    // The two sides tile the original without overlap.
    assert!(ph1.is_disjoint_from(&ph2));
    let mut union = ph1.clone();
    union.poly_hull_assign(&ph2);
    let original = from_cons(
        2,
        Topol::Nnc,
        vec![a().ge(0), b().ge(0), a().le(4), b().le(4)],
    );
    assert!(union.equals(&original));
}

#[test]
fn split_closed_shares_boundary() {
    let cs = vec![a().ge(0), b().ge(0), a().le(4), b().le(4)];
    let mut ph1 = from_cons(2, Topol::Closed, cs.clone());
    let ph2 = ph1.split(a().le(2));

    let mut knr1 = from_cons(2, Topol::Closed, cs.clone());
    knr1.add_con(a().le(2));
    let mut knr2 = from_cons(2, Topol::Closed, cs);
    knr2.add_con(a().ge(2));
    assert!(ph1.equals(&knr1));
    assert!(ph2.equals(&knr2));
    assert!(!ph1.is_disjoint_from(&ph2));
}

#[test]
fn split_strict_on_nnc_box() {
    let cs = vec![a().gt(0), b().gt(0), a().lt(4), b().lt(4)];
    let mut ph1 = from_cons(2, Topol::Nnc, cs.clone());
    let ph2 = ph1.split(b().lt(2));
    let mut knr1 = from_cons(2, Topol::Nnc, cs.clone());
    knr1.add_con(b().lt(2));
    let mut knr2 = from_cons(2, Topol::Nnc, cs);
    knr2.add_con(b().ge(2));
    assert!(ph1.equals(&knr1));
    assert!(ph2.equals(&knr2));
}

#[test]
fn integral_split_tightens_both_sides() {
    let mut ph = from_cons(1, Topol::Closed, vec![a().ge(0), a().le(4)]);
    let other = ph.integral_split(a().le(2));
    assert!(ph.equals(&from_cons(1, Topol::Closed, vec![a().ge(0), a().le(2)])));
    assert!(other.equals(&from_cons(1, Topol::Closed, vec![a().ge(3), a().le(4)])));
}

#[test]
fn integral_split_clears_divisors() {
    // 2A <= 5 tightens to A <= 2 / A >= 3.
    let mut ph = from_cons(1, Topol::Closed, vec![a().ge(0), a().le(4)]);
    let other = ph.integral_split((2i32 * a()).le(5));
    assert!(ph.equals(&from_cons(1, Topol::Closed, vec![a().ge(0), a().le(2)])));
    assert!(other.equals(&from_cons(1, Topol::Closed, vec![a().ge(3), a().le(4)])));
}

#[test]
fn widening_first_step_drops_moving_bound() {
    // P_n : 0 <= A <= n; widening P_2 against P_1 yields 0 <= A.
    let mut x = from_cons(1, Topol::Closed, vec![a().ge(0), a().le(2)]);
    let y = from_cons(1, Topol::Closed, vec![a().ge(0), a().le(1)]);
    x.widening_assign(&y);
    assert!(x.equals(&from_cons(1, Topol::Closed, vec![a().ge(0)])));

    // And the sequence is stable afterwards.
    let mut x2 = x.clone();
    x2.add_con(a().le(5));
    let mut widened = from_cons(1, Topol::Closed, vec![a().ge(0)]);
    widened.poly_hull_assign(&x2);
    widened.widening_assign(&x);
    assert!(widened.equals(&x));
}

#[test]
fn widening_drops_redundancy_of_previous_iterate() {
    let mut ph1 = from_cons(2, Topol::Closed, vec![a().ge(2), b().ge(0)]);
    let ph2 = from_cons(
        2,
        Topol::Closed,
        vec![a().ge(0), b().ge(0), (a() - b()).ge(2)],
    );
    assert!(ph1.contains(&ph2));
    ph1.widening_assign(&ph2);
    assert!(ph1.equals(&from_cons(2, Topol::Closed, vec![b().ge(0)])));
}

#[test]
fn widening_with_empty_previous_is_identity() {
    let original = from_cons(2, Topol::Closed, vec![a().ge(0), b().ge(0), a().le(2), b().le(2)]);
    let mut ph = original.clone();
    let empty = Poly::from_spec(2, SpecElem::Empty, Topol::Closed);
    ph.widening_assign(&empty);
    assert!(ph.equals(&original));

    let mut e1 = Poly::from_spec(2, SpecElem::Empty, Topol::Closed);
    let e2 = Poly::from_spec(2, SpecElem::Empty, Topol::Closed);
    e1.widening_assign(&e2);
    assert!(e1.is_empty());
}

#[test]
fn bhrz03_is_extensive_and_stabilizes() {
    let y = from_cons(2, Topol::Closed, vec![a().ge(0), a().le(1), b().ge(0), b().le(1)]);
    let mut x = from_cons(2, Topol::Closed, vec![a().ge(0), a().le(2), b().ge(0), b().le(2)]);
    let x_copy = x.clone();
    x.widening_assign_with(&y, WidenImpl::Bhrz03, WidenSpec::Risky);
    assert!(x.contains(&x_copy));
    assert!(x.contains(&y));

    // Iterating against the previous result stabilizes.
    let mut next = x.clone();
    next.widening_assign_with(&x, WidenImpl::Bhrz03, WidenSpec::Risky);
    assert!(next.equals(&x));
}

#[test]
fn safe_widening_joins_first() {
    let mut x = from_cons(1, Topol::Closed, vec![a().ge(1), a().le(2)]);
    let y = from_cons(1, Topol::Closed, vec![a().ge(0), a().le(1)]);
    // Not an ascending pair; the safe spec joins before widening.
    x.widening_assign_with(&y, WidenImpl::H79, WidenSpec::Safe);
    assert!(x.contains(&y));
    assert!(x.contains(&from_cons(1, Topol::Closed, vec![a().ge(1), a().le(2)])));
}

#[test]
fn relations_with_constraints() {
    let ph = from_cons(2, Topol::Closed, vec![a().ge(0), b().ge(0), a().le(2), b().le(2)]);
    assert!(ph
        .relation_with_con(&a().ge(0))
        .implies(PolyConRel::is_included()));
    assert!(ph
        .relation_with_con(&a().ge(3))
        .implies(PolyConRel::is_disjoint()));
    assert!(ph
        .relation_with_con(&a().eq(2))
        .implies(PolyConRel::strictly_intersects()));
    assert!(ph
        .relation_with_con(&a().le(5))
        .implies(PolyConRel::is_included()));

    let lower_face = from_cons(2, Topol::Closed, vec![a().ge(0), a().le(2), b().eq(0)]);
    let rel = lower_face.relation_with_con(&b().ge(0));
    assert!(rel.implies(PolyConRel::saturates()));
    assert!(rel.implies(PolyConRel::is_included()));

    let empty = Poly::from_spec(2, SpecElem::Empty, Topol::Closed);
    let rel = empty.relation_with_con(&a().ge(0));
    assert!(rel.implies(PolyConRel::saturates() | PolyConRel::is_included() | PolyConRel::is_disjoint()));
}

#[test]
fn relations_with_generators() {
    let ph = from_cons(2, Topol::Closed, vec![a().ge(0), b().ge(0), a().le(2), b().le(2)]);
    assert!(ph
        .relation_with_gen(&point(a() + b()))
        .implies(PolyGenRel::subsumes()));
    assert_eq!(ph.relation_with_gen(&point(3 * a())), PolyGenRel::nothing());
    assert_eq!(
        ph.relation_with_gen(&ray(LinearExpr::from(a()))),
        PolyGenRel::nothing()
    );

    let strip = from_cons(2, Topol::Closed, vec![a().ge(0), b().ge(0), b().le(2)]);
    assert!(strip
        .relation_with_gen(&ray(LinearExpr::from(a())))
        .implies(PolyGenRel::subsumes()));
}

#[test]
fn strict_constraints_and_point_relations() {
    let open = from_cons(1, Topol::Nnc, vec![a().gt(0), a().lt(1)]);
    assert!(open
        .relation_with_con(&a().gt(0))
        .implies(PolyConRel::is_included()));
    assert_eq!(
        open.relation_with_gen(&point(LinearExpr::new())),
        PolyGenRel::nothing()
    );
    assert!(open
        .relation_with_gen(&closure_point(LinearExpr::new()))
        .implies(PolyGenRel::subsumes()));
}

#[test]
fn minmax_on_triangle() {
    let ph = from_cons(
        2,
        Topol::Closed,
        vec![a().ge(0), b().ge(0), (a() + b()).le(2)],
    );
    let ae = AffineExpr::new(LinearExpr::from(a()) + b(), 0);
    let max = ph.max(&ae).unwrap();
    assert_eq!(max.value, q(2));
    assert!(max.included);
    let min = ph.min(&ae).unwrap();
    assert_eq!(min.value, q(0));
    assert!(min.included);
    assert!(min.witness.is_point());

    // Unbounded direction.
    let strip = from_cons(2, Topol::Closed, vec![b().ge(0), b().le(2)]);
    assert!(strip.max(&AffineExpr::from(a())).is_none());
    assert!(strip.max(&AffineExpr::from(b())).is_some());

    // Empty polyhedron has no optimum.
    let empty = Poly::from_spec(2, SpecElem::Empty, Topol::Closed);
    assert!(empty.max(&AffineExpr::from(a())).is_none());
}

#[test]
fn strict_supremum_is_not_included() {
    let ph = from_cons(1, Topol::Nnc, vec![a().ge(0), a().lt(4)]);
    let max = ph.max(&AffineExpr::from(a())).unwrap();
    assert_eq!(max.value, q(4));
    assert!(!max.included);
    let min = ph.min(&AffineExpr::from(a())).unwrap();
    assert_eq!(min.value, q(0));
    assert!(min.included);
}

#[test]
fn bounding_box_openness() {
    let ph = from_cons(2, Topol::Nnc, vec![a().gt(0), a().le(2), b().ge(1)]);
    let bbox = ph.get_bounding_box();
    let itv0 = bbox.itv(0);
    assert_eq!(itv0.lb, Some(q(0)));
    assert!(itv0.lb_open);
    assert_eq!(itv0.ub, Some(q(2)));
    assert!(!itv0.ub_open);
    let itv1 = bbox.itv(1);
    assert_eq!(itv1.lb, Some(q(1)));
    assert!(itv1.ub.is_none());
}

#[test]
fn boxed_filters_agree_with_exact_tests() {
    let small = from_cons(2, Topol::Closed, vec![a().ge(0), a().le(1), b().ge(0), b().le(1)]);
    let big = from_cons(2, Topol::Closed, vec![a().ge(-1), a().le(3), b().ge(-1), b().le(3)]);
    let far = from_cons(2, Topol::Closed, vec![a().ge(9), a().le(10), b().ge(0), b().le(1)]);
    assert!(big.boxed_contains(&small));
    assert!(!small.boxed_contains(&big));
    assert!(small.boxed_is_disjoint_from(&far));
    assert!(!small.boxed_is_disjoint_from(&big));
}

#[test]
fn intersection_laws() {
    let p = from_cons(2, Topol::Closed, vec![a().ge(0), a().le(3)]);
    let r = from_cons(2, Topol::Closed, vec![b().ge(1), b().le(4)]);
    let mut pq = p.clone();
    pq.intersection_assign(&r);
    let mut qp = r.clone();
    qp.intersection_assign(&p);
    assert!(pq.equals(&qp));
    // Idempotence.
    let mut pp = p.clone();
    pp.intersection_assign(&p);
    assert!(pp.equals(&p));
    // Monotonicity: p ∩ r ⊆ p.
    assert!(p.contains(&pq));
}

#[test]
fn hull_laws() {
    let p = from_gens(2, Topol::Closed, vec![point(LinearExpr::new()), point(2 * a())]);
    let r = from_gens(2, Topol::Closed, vec![point(2 * b()), point(2 * a() + 2 * b())]);
    let mut pq = p.clone();
    pq.poly_hull_assign(&r);
    let mut qp = r.clone();
    qp.poly_hull_assign(&p);
    assert!(pq.equals(&qp));
    assert!(pq.contains(&p) && pq.contains(&r));
    let mut pp = p.clone();
    pp.poly_hull_assign(&p);
    assert!(pp.equals(&p));
    // The hull of the two opposite edges is the full square.
    let square = from_cons(2, Topol::Closed, vec![a().ge(0), a().le(2), b().ge(0), b().le(2)]);
    assert!(pq.equals(&square));
}

#[test]
fn con_hull_is_the_two_sided_constraint_envelope() {
    let p = from_cons(2, Topol::Closed, vec![a().ge(0), a().le(2), b().ge(0), b().le(2)]);
    let r = from_cons(2, Topol::Closed, vec![a().ge(4), a().le(6), b().ge(1), b().le(3)]);
    let mut hull = p.clone();
    hull.poly_hull_assign(&r);
    let mut chull = p.clone();
    chull.con_hull_assign(&r);
    let known = from_cons(
        2,
        Topol::Closed,
        vec![a().ge(0), a().le(6), b().ge(0), b().le(3)],
    );
    assert!(chull.equals(&known));
    assert!(chull.contains(&hull));
    assert!(!hull.contains(&chull));
}

#[test]
fn poly_difference_closed_and_nnc() {
    let mut p = from_cons(1, Topol::Closed, vec![a().ge(0), a().le(4)]);
    let r = from_cons(1, Topol::Closed, vec![a().ge(0), a().le(2)]);
    p.poly_difference_assign(&r);
    assert!(p.equals(&from_cons(1, Topol::Closed, vec![a().ge(2), a().le(4)])));

    let mut p = from_cons(1, Topol::Nnc, vec![a().ge(0), a().le(4)]);
    let r = from_cons(1, Topol::Nnc, vec![a().ge(0), a().le(2)]);
    p.poly_difference_assign(&r);
    assert!(p.equals(&from_cons(1, Topol::Nnc, vec![a().gt(2), a().le(4)])));

    // Difference with a superset is empty.
    let mut p = from_cons(1, Topol::Closed, vec![a().ge(1), a().le(2)]);
    let r = from_cons(1, Topol::Closed, vec![a().ge(0), a().le(4)]);
    p.poly_difference_assign(&r);
    assert!(p.is_empty());
}

#[test]
fn time_elapse_extends_along_directions() {
    let mut p = from_cons(2, Topol::Closed, vec![a().ge(0), a().le(1), b().ge(0), b().le(1)]);
    let dirs = from_gens(2, Topol::Closed, vec![point(LinearExpr::from(a()))]);
    p.time_elapse_assign(&dirs);
    let known = from_cons(2, Topol::Closed, vec![a().ge(0), b().ge(0), b().le(1)]);
    assert!(p.equals(&known));
}

#[test]
fn affine_image_translates_and_inverts() {
    let square = from_cons(2, Topol::Closed, vec![a().ge(0), a().le(1), b().ge(0), b().le(1)]);
    let mut p = square.clone();
    // A := A + B + 1 is invertible.
    let e = 1 * a() + 1 * b();
    p.affine_image(a(), &e, &Integer::from(1), &Integer::from(1));
    let mut back = p.clone();
    back.affine_preimage(a(), &e, &Integer::from(1), &Integer::from(1));
    assert!(back.equals(&square));

    // A := A + 1 on [0,1] gives [1,2].
    let mut seg = from_cons(1, Topol::Closed, vec![a().ge(0), a().le(1)]);
    seg.affine_image(a(), &LinearExpr::from(a()), &Integer::from(1), &Integer::from(1));
    assert!(seg.equals(&from_cons(1, Topol::Closed, vec![a().ge(1), a().le(2)])));

    // Halving via the denominator.
    let mut seg2 = from_cons(1, Topol::Closed, vec![a().ge(0), a().le(4)]);
    seg2.affine_image(a(), &LinearExpr::from(a()), &Integer::zero(), &Integer::from(2));
    assert!(seg2.equals(&from_cons(1, Topol::Closed, vec![a().ge(0), a().le(2)])));
}

#[test]
fn parallel_affine_image_is_simultaneous() {
    // (A, B) := (B, A) on a rectangle swaps the bounds.
    let mut p = from_cons(2, Topol::Closed, vec![a().ge(0), a().le(1), b().ge(2), b().le(3)]);
    p.parallel_affine_image(
        &[a(), b()],
        &[LinearExpr::from(b()), LinearExpr::from(a())],
        &[Integer::zero(), Integer::zero()],
        &[Integer::from(1), Integer::from(1)],
    );
    let known = from_cons(2, Topol::Closed, vec![a().ge(2), a().le(3), b().ge(0), b().le(1)]);
    assert!(p.equals(&known));
}

#[test]
fn space_dim_round_trip() {
    let square = from_cons(2, Topol::Closed, vec![a().ge(0), a().le(2), b().ge(0), b().le(2)]);
    let mut p = square.clone();
    p.add_space_dims(2, false);
    assert_eq!(p.space_dim(), 4);
    assert!(!p.constrains(Var::new(2)));
    p.remove_higher_space_dims(2);
    assert!(p.equals(&square));

    let mut pinned = square.clone();
    pinned.add_space_dims(1, true);
    let zero = pinned
        .relation_with_con(&LinearExpr::from(Var::new(2)).eq(0));
    assert!(zero.implies(PolyConRel::is_included()));
}

#[test]
fn remove_space_dims_projects() {
    let p = from_cons(
        3,
        Topol::Closed,
        vec![a().ge(0), a().le(2), b().ge(1), b().le(3), (a() + Var::new(2)).le(5)],
    );
    let mut projected = p.clone();
    let mut removed = Bits::new();
    removed.set(1);
    projected.remove_space_dims(&removed);
    // B disappears; A keeps its bounds, old C is now dimension 1.
    assert_eq!(projected.space_dim(), 2);
    let known = from_cons(2, Topol::Closed, vec![a().ge(0), a().le(2), (a() + b()).le(5)]);
    assert!(projected.equals(&known));
}

#[test]
fn map_space_dims_renames_and_drops() {
    let p = from_cons(2, Topol::Closed, vec![a().ge(0), a().le(1), b().ge(2), b().le(3)]);
    let mut swapped = p.clone();
    swapped.map_space_dims(&[Some(1), Some(0)]);
    let known = from_cons(2, Topol::Closed, vec![b().ge(0), b().le(1), a().ge(2), a().le(3)]);
    assert!(swapped.equals(&known));

    let mut dropped = p.clone();
    dropped.map_space_dims(&[None, Some(0)]);
    assert!(dropped.equals(&from_cons(1, Topol::Closed, vec![a().ge(2), a().le(3)])));
}

#[test]
fn expand_space_dim_copies_constraints() {
    let seg = from_cons(1, Topol::Closed, vec![a().ge(0), a().le(2)]);
    let mut p = seg.clone();
    p.expand_space_dim(a(), 1);
    let known = from_cons(2, Topol::Closed, vec![a().ge(0), a().le(2), b().ge(0), b().le(2)]);
    assert!(p.equals(&known));
}

#[test]
fn fold_space_dims_joins_coordinates() {
    let p = from_cons(2, Topol::Closed, vec![a().ge(0), a().le(2), b().ge(0), b().le(4)]);
    let mut folded = p.clone();
    folded.fold_space_dims(&Bits::single(1), a());
    assert!(folded.equals(&from_cons(1, Topol::Closed, vec![a().ge(0), a().le(4)])));
}

#[test]
fn concatenate_is_cartesian_product() {
    let mut p = from_cons(1, Topol::Closed, vec![a().ge(0), a().le(1)]);
    let r = from_cons(1, Topol::Closed, vec![a().ge(2), a().le(3)]);
    p.concatenate_assign(&r);
    let known = from_cons(2, Topol::Closed, vec![a().ge(0), a().le(1), b().ge(2), b().le(3)]);
    assert!(p.equals(&known));
}

#[test]
fn unconstrain_drops_a_variable() {
    let mut p = from_cons(2, Topol::Closed, vec![a().ge(0), a().le(2), b().ge(0), b().le(2)]);
    p.unconstrain(&Bits::single(0));
    assert!(!p.constrains(a()));
    assert!(p.constrains(b()));
    assert!(p.equals(&from_cons(2, Topol::Closed, vec![b().ge(0), b().le(2)])));
}

#[test]
fn is_bounded_checks_rays() {
    assert!(from_cons(2, Topol::Closed, vec![a().ge(0), a().le(1), b().ge(0), b().le(1)]).is_bounded());
    assert!(!from_cons(2, Topol::Closed, vec![a().ge(0)]).is_bounded());
    assert!(Poly::from_spec(2, SpecElem::Empty, Topol::Closed).is_bounded());
    let strip = from_cons(2, Topol::Closed, vec![b().ge(0), b().le(2)]);
    assert!(strip.is_bounded_expr(true, &LinearExpr::from(b())));
    assert!(!strip.is_bounded_expr(true, &LinearExpr::from(a())));
}

#[test]
fn hash_ignores_construction_order() {
    let p1 = from_cons(2, Topol::Closed, vec![a().ge(0), b().ge(0), a().le(2), b().le(2)]);
    let p2 = from_cons(2, Topol::Closed, vec![b().le(2), a().le(2), b().ge(0), a().ge(0)]);
    assert!(p1.equals(&p2));
    assert_eq!(p1.hash(), p2.hash());

    let g = from_gens(
        2,
        Topol::Closed,
        vec![
            point(LinearExpr::new()),
            point(2 * a()),
            point(2 * b()),
            point(2 * a() + 2 * b()),
        ],
    );
    assert_eq!(p1.hash(), g.hash());
}

#[test]
fn minimize_is_idempotent() {
    let p = from_cons(2, Topol::Closed, vec![a().ge(0), a().ge(-5), a().le(2), b().ge(0), b().le(2)]);
    p.minimize();
    let once = p.ascii_dump();
    p.minimize();
    assert_eq!(once, p.ascii_dump());
}

#[test]
fn ascii_dump_of_zero_dim_universe() {
    let ph = Poly::new(0);
    let expected = "topol C\n\
                    dim 0\n\
                    status MINIMIZED\n\
                    => cs sys\n\
                    sing_rows 0\n\
                    sk_rows 1\n\
                    > : dim 0 :  : 1\n\
                    ns_rows 0\n\
                    => gs sys\n\
                    sing_rows 0\n\
                    sk_rows 1\n\
                    P : dim 0 :  : 1\n\
                    ns_rows 0\n\
                    sat_c\n\
                    1 x 1\n\
                    0 \n\
                    sat_g\n\
                    1 x 1\n\
                    0 \n\
                    => cs_pending\n\
                    sing_rows 0\n\
                    sk_rows 0\n\
                    ns_rows 0\n\
                    => gs_pending\n\
                    sing_rows 0\n\
                    sk_rows 0\n\
                    ns_rows 0\n";
    assert_eq!(ph.ascii_dump(), expected);
}

#[test]
fn ascii_round_trip_minimized_and_pending() {
    let samples = vec![
        Poly::new(3),
        from_cons(2, Topol::Closed, vec![a().ge(0), b().ge(0), (a() + b()).le(2)]),
        from_cons(2, Topol::Nnc, vec![a().gt(0), b().gt(0), (a() + b()).lt(4)]),
        Poly::from_spec(2, SpecElem::Empty, Topol::Nnc),
    ];
    for p in samples {
        p.minimize();
        let dump = p.ascii_dump();
        let mut loaded = Poly::new(0);
        assert!(loaded.ascii_load(&dump));
        assert_eq!(loaded.ascii_dump(), dump);
        assert!(loaded.equals(&p));
        assert!(loaded.check_inv());
    }

    // Pending rows survive the round trip verbatim.
    let mut pending = from_cons(2, Topol::Closed, vec![a().ge(0)]);
    pending.minimize();
    pending.add_con(a().le(7));
    let dump = pending.ascii_dump();
    let mut loaded = Poly::new(0);
    assert!(loaded.ascii_load(&dump));
    assert_eq!(loaded.ascii_dump(), dump);
    assert!(loaded.equals(&pending));

    // Garbage input is rejected.
    let mut target = Poly::new(1);
    assert!(!target.ascii_load("topol Q\ndim 1\n"));
}

#[test]
fn nnc_strict_box_round_trips_supports() {
    let p = from_cons(2, Topol::Nnc, vec![a().gt(0), b().gt(0), a().lt(2), b().lt(2)]);
    p.minimize();
    assert!(p.check_inv());
    let imp = p.imp();
    assert_eq!(imp.gs.ns_rows.len(), 1);
    assert_eq!(imp.gs.ns_rows[0].count(), 4);
    drop(imp);
    let dump = p.ascii_dump();
    let mut loaded = Poly::new(0);
    assert!(loaded.ascii_load(&dump));
    assert!(loaded.check_inv());
    assert!(loaded.equals(&p));
}

#[test]
fn random_hull_contains_its_points() {
    use rand::{Rng, SeedableRng};
    let mut rng = rand::rngs::StdRng::seed_from_u64(17);
    for _ in 0..8 {
        let mut pts = Vec::new();
        for _ in 0..6 {
            let x: i64 = rng.gen_range(-10..10);
            let y: i64 = rng.gen_range(-10..10);
            let z: i64 = rng.gen_range(-10..10);
            pts.push(point(x as i32 * a() + y as i32 * b() + z as i32 * Var::new(2)));
        }
        let hull = from_gens(3, Topol::Closed, pts.clone());
        assert!(hull.check_inv());
        for p in &pts {
            assert!(hull.relation_with_gen(p).implies(PolyGenRel::subsumes()));
        }
        // Rebuilding from the minimized generators is a fixpoint.
        let rebuilt = from_gens(3, Topol::Closed, hull.gens());
        assert!(rebuilt.equals(&hull));
    }
}

#[test]
fn gen_to_con_round_trip() {
    let p = from_gens(
        2,
        Topol::Closed,
        vec![point(LinearExpr::new()), point(4 * a()), point(4 * b()), ray(LinearExpr::from(b()))],
    );
    let q = from_cons(2, Topol::Closed, p.cons());
    assert!(q.equals(&p));
    let r = from_gens(2, Topol::Closed, q.gens());
    assert!(r.equals(&p));
}

#[test]
fn set_topology_between_interpretations() {
    let mut p = from_cons(1, Topol::Closed, vec![a().ge(0), a().le(1)]);
    p.set_topology(Topol::Nnc);
    assert_eq!(p.topol(), Topol::Nnc);
    assert!(p.is_topologically_closed());
    assert!(p.equals(&from_cons(1, Topol::Nnc, vec![a().ge(0), a().le(1)])));
    p.set_topology(Topol::Closed);
    assert_eq!(p.topol(), Topol::Closed);
    assert!(p.equals(&from_cons(1, Topol::Closed, vec![a().ge(0), a().le(1)])));
}

#[test]
fn memory_introspection_is_nonzero() {
    let p = from_cons(2, Topol::Closed, vec![a().ge(0), b().le(7)]);
    p.minimize();
    assert!(p.total_memory_in_bytes() > 0);
}
