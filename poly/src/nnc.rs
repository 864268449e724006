//! The strict-inequality engine.
//!
//! NNC systems are minimized by materializing the auxiliary positivity
//! scalar as one extra space dimension: a strict row `expr > 0` becomes
//! the closed row `expr - eps >= 0`, a non-skeleton constraint support
//! becomes the strict sum of its skeleton rows, a point gains `eps = 1`
//! and a closure point sits at `eps = 0`. The closed conversion core then
//! produces the minimized pair over the extended space, and the result is
//! folded back into skeleton + non-skeleton form:
//!
//! * the closure of the polyhedron is re-minimized over the original
//!   space, giving the canonical skeleton;
//! * a facet is marked strict when no materialized point saturates it,
//!   and a vertex is demoted to closure point when the minimal face
//!   containing it has no materialized point;
//! * constraint supports are found by a saturation-closure search for the
//!   maximal faces containing no materialized point, generator supports
//!   dually for the minimal filled faces carrying no included point.
//!
//! Supports of size one are absorbed into the skeleton (a strict facet, a
//! promoted point); dominated and non-minimal supports are pruned.

use hashbrown::HashSet;
use indexmap::IndexSet;
use tracing::debug;

use crate::{
    bits::Bits,
    con::{Con, ConKind},
    conv::{
        self, con_to_row, convert_cons, convert_gens, dot, gen_to_row, normalize_row, row_to_con,
        row_to_gen, EmptyPoly, RawPair, Row,
    },
    gen::{Gen, GenKind},
    integer::Integer,
    sat::Sat,
    sys::{ConSys, GenSys},
};

/// A minimized NNC representation: both systems in skeleton/non-skeleton
/// form plus the saturation matrices over the skeleton rows.
pub(crate) struct NncMin {
    pub cs: ConSys,
    pub gs: GenSys,
    pub sat_c: Sat,
    pub sat_g: Sat,
}

/// Minimizes the NNC polyhedron described by the given constraint
/// systems (each ns row indexes the sk rows of its own system).
pub(crate) fn min_from_cons(
    space_dim: usize,
    systems: &[&ConSys],
) -> Result<NncMin, EmptyPoly> {
    let hom = space_dim + 2;
    let eps = hom - 1;
    let mut rows: Vec<(Row, bool)> = Vec::new();
    for sys in systems {
        for c in &sys.sing_rows {
            rows.push(materialize_con(c, hom));
        }
        for c in &sys.sk_rows {
            rows.push(materialize_con(c, hom));
        }
        for ns in &sys.ns_rows {
            let mut row = vec![Integer::zero(); hom];
            for i in ns {
                let (r, _) = con_to_row(&sys.sk_rows[i], hom - 1);
                for (k, c) in r.iter().enumerate() {
                    row[k] += c;
                }
            }
            row[eps] = Integer::from(-1);
            normalize_row(&mut row);
            rows.push((row, false));
        }
    }
    // 0 <= eps and the strict positivity 1 > 0 (eps <= 1).
    let mut eps_lb = vec![Integer::zero(); hom];
    eps_lb[eps] = Integer::one();
    rows.push((eps_lb, false));
    let mut eps_ub = vec![Integer::zero(); hom];
    eps_ub[0] = Integer::one();
    eps_ub[eps] = Integer::from(-1);
    rows.push((eps_ub, false));

    let pair = convert_cons(space_dim + 1, &rows)?;
    dematerialize(space_dim, &pair)
}

/// Minimizes the NNC polyhedron generated by the given generator systems.
pub(crate) fn min_from_gens(
    space_dim: usize,
    systems: &[&GenSys],
) -> Result<NncMin, EmptyPoly> {
    let hom = space_dim + 2;
    let eps = hom - 1;
    let has_point = systems
        .iter()
        .any(|s| s.sk_rows.iter().any(Gen::is_point) || !s.ns_rows.is_empty());
    if !has_point {
        return Err(EmptyPoly);
    }
    let mut rows: Vec<(Row, bool)> = Vec::new();
    for sys in systems {
        for g in &sys.sing_rows {
            rows.push(materialize_gen(g, hom));
        }
        for g in &sys.sk_rows {
            rows.push(materialize_gen(g, hom));
        }
        for ns in &sys.ns_rows {
            // The implicit point: barycenter of the support, at eps = 1.
            let mut row = vec![Integer::zero(); hom];
            for i in ns {
                let (r, _) = gen_to_row(&sys.sk_rows[i], hom - 1);
                for (k, c) in r.iter().enumerate() {
                    row[k] += c;
                }
            }
            row[eps] = row[0].clone();
            normalize_row(&mut row);
            rows.push((row, false));
        }
    }
    let pair = convert_gens(space_dim + 1, &rows)?;
    dematerialize(space_dim, &pair)
}

fn materialize_con(c: &Con, hom: usize) -> (Row, bool) {
    let (mut row, sing) = con_to_row(c, hom - 1);
    row.push(if c.is_strict_inequality() {
        Integer::from(-1)
    } else {
        Integer::zero()
    });
    (row, sing)
}

fn materialize_gen(g: &Gen, hom: usize) -> (Row, bool) {
    let (mut row, sing) = gen_to_row(g, hom - 1);
    row.push(if g.is_point() {
        g.divisor().clone()
    } else {
        Integer::zero()
    });
    (row, sing)
}

/// Folds a minimized pair over the extended space back into the
/// epsilon-less skeleton + non-skeleton form.
fn dematerialize(space_dim: usize, pair: &RawPair) -> Result<NncMin, EmptyPoly> {
    let eps = space_dim + 1;

    // Materialized witnesses: projections of the extended points, split on
    // whether they sit strictly above the eps = 0 face.
    let mut seen: HashSet<Row> = HashSet::new();
    for r in &pair.gs_sk {
        if r[0].is_positive() && r[eps].is_positive() {
            let mut p = r[..eps].to_vec();
            normalize_row(&mut p);
            seen.insert(p);
        }
    }
    if seen.is_empty() {
        return Err(EmptyPoly);
    }
    let mut filled_pts: Vec<Row> = seen.into_iter().collect();
    filled_pts.sort_by(|a, b| {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| x.compare(y))
            .find(|o| *o != core::cmp::Ordering::Equal)
            .unwrap_or(core::cmp::Ordering::Equal)
    });

    // Re-minimize the closure over the original space.
    let projected: Vec<(Row, bool)> = pair
        .gs_sing
        .iter()
        .map(|r| (r[..eps].to_vec(), true))
        .chain(pair.gs_sk.iter().map(|r| (r[..eps].to_vec(), false)))
        .filter(|(r, _)| !conv::is_zero_row(r))
        .collect();
    let cl = convert_gens(space_dim, &projected)?;

    debug!(
        facets = cl.cs_sk.len(),
        gens = cl.gs_sk.len(),
        witnesses = filled_pts.len(),
        "dematerializing NNC pair"
    );

    let n_facets = cl.cs_sk.len();
    let n_gens = cl.gs_sk.len();

    // Saturation of the closure pair, plus witness saturation per facet.
    let mut facet_sat: Vec<Bits> = vec![Bits::new(); n_facets]; // gens on facet
    let mut gen_sat: Vec<Bits> = vec![Bits::new(); n_gens]; // facets through gen
    for (i, f) in cl.cs_sk.iter().enumerate() {
        for (j, g) in cl.gs_sk.iter().enumerate() {
            if dot(f, g).is_zero() {
                facet_sat[i].set(j);
                gen_sat[j].set(i);
            }
        }
    }
    let mut witness_sat: Vec<Bits> = vec![Bits::new(); filled_pts.len()];
    for (w, p) in filled_pts.iter().enumerate() {
        for (i, f) in cl.cs_sk.iter().enumerate() {
            if dot(f, p).is_zero() {
                witness_sat[w].set(i);
            }
        }
    }

    // A face, given by its facet support, is filled when a witness lies on
    // every facet of the support.
    let filled = |support: &Bits| witness_sat.iter().any(|ws| support.is_subset_of(ws));

    // Facet strictness: a facet is strict when its own face is unfilled.
    let mut strict_facet = Bits::new();
    for i in 0..n_facets {
        if !filled(&Bits::single(i)) {
            strict_facet.set(i);
        }
    }

    // Vertex inclusion: a point row is included when its minimal face is
    // filled.
    let mut included_pt = Bits::new();
    for (j, g) in cl.gs_sk.iter().enumerate() {
        if g[0].is_positive() && filled(&gen_sat[j]) {
            included_pt.set(j);
        }
    }

    // Galois closures through the saturation tables.
    let gens_on = |support: &Bits| -> Bits {
        let mut gens = Bits::new();
        gens.set_until(n_gens);
        for i in support {
            gens &= &facet_sat[i];
        }
        gens
    };
    let facets_on = |gens: &Bits| -> Bits {
        let mut facets = Bits::new();
        facets.set_until(n_facets);
        for j in gens {
            facets &= &gen_sat[j];
        }
        facets
    };

    // Non-skeleton constraints: minimal non-strict facet supports whose
    // face is unfilled, not lying inside a strict facet.
    let close_con_support = |s: &Bits| -> (Bits, Bits) {
        let gens = gens_on(s);
        let mut closed = facets_on(&gens);
        closed -= &strict_facet;
        (closed, gens)
    };
    let mut cs_ns: Vec<Bits> = Vec::new();
    {
        let mut queue: IndexSet<Bits> = IndexSet::new();
        for i in 0..n_facets {
            if strict_facet.test(i) {
                continue;
            }
            let (s, _) = close_con_support(&Bits::single(i));
            queue.insert(s);
        }
        let mut at = 0;
        while at < queue.len() {
            let s = queue.get_index(at).expect("in bounds").clone();
            at += 1;
            if !filled(&s) {
                let gens = gens_on(&s);
                // The face must be a real face of the closure: it carries a
                // point-like row, not just saturating rays.
                if !gens.iter().any(|j| cl.gs_sk[j][0].is_positive()) {
                    continue;
                }
                let dominated = strict_facet.iter().any(|t| gens.is_subset_of(&facet_sat[t]));
                if !dominated {
                    cs_ns.push(s);
                }
                continue;
            }
            for j in 0..n_facets {
                if strict_facet.test(j) || s.test(j) {
                    continue;
                }
                let mut grown = s.clone();
                grown.set(j);
                let (closed, _) = close_con_support(&grown);
                queue.insert(closed);
            }
        }
    }
    keep_minimal(&mut cs_ns);

    // Non-skeleton generators: minimal gen supports spanning a filled face
    // that carries no included point.
    let close_gen_support = |t: &Bits| -> (Bits, Bits) {
        let facets = facets_on(t);
        (gens_on(&facets), facets)
    };
    let mut gs_ns: Vec<Bits> = Vec::new();
    {
        let mut queue: IndexSet<Bits> = IndexSet::new();
        for (j, g) in cl.gs_sk.iter().enumerate() {
            if g[0].is_positive() && !included_pt.test(j) {
                let (t, _) = close_gen_support(&Bits::single(j));
                queue.insert(t);
            }
        }
        let mut at = 0;
        while at < queue.len() {
            let t = queue.get_index(at).expect("in bounds").clone();
            at += 1;
            let (_, facets) = close_gen_support(&t);
            let face_filled = filled(&facets);
            if face_filled {
                let pointed = t.iter().any(|j| included_pt.test(j));
                if !pointed {
                    gs_ns.push(t);
                }
                continue;
            }
            for h in 0..n_gens {
                if t.test(h) {
                    continue;
                }
                let mut grown = t.clone();
                grown.set(h);
                let (closed, _) = close_gen_support(&grown);
                queue.insert(closed);
            }
        }
    }
    keep_minimal(&mut gs_ns);

    // Assemble the typed systems; row order follows the sorted closure
    // pair, so the supports index the final skeleton directly.
    let mut cs = ConSys::new();
    for r in &cl.cs_sing {
        let mut c = row_to_con(r, ConKind::Equality);
        c.set_space_dim(space_dim);
        cs.sing_rows.push(c);
    }
    for (i, r) in cl.cs_sk.iter().enumerate() {
        let kind = if strict_facet.test(i) {
            ConKind::Strict
        } else {
            ConKind::NonStrict
        };
        let mut c = row_to_con(r, kind);
        c.set_space_dim(space_dim);
        cs.sk_rows.push(c);
    }
    cs.ns_rows = cs_ns;

    let mut gs = GenSys::new();
    for r in &cl.gs_sing {
        let mut g = row_to_gen(r, true);
        g.set_space_dim(space_dim);
        gs.sing_rows.push(g);
    }
    for (j, r) in cl.gs_sk.iter().enumerate() {
        let mut g = row_to_gen(r, false);
        if g.is_point() && !included_pt.test(j) {
            g.set_kind(GenKind::ClosurePoint);
        }
        g.set_space_dim(space_dim);
        gs.sk_rows.push(g);
    }
    gs.ns_rows = gs_ns;

    let (sat_c, sat_g) = conv::saturation(&cs, &gs);
    Ok(NncMin { cs, gs, sat_c, sat_g })
}

/// Drops every support that strictly contains another one, then sorts.
fn keep_minimal(supports: &mut Vec<Bits>) {
    supports.sort();
    supports.dedup();
    let snapshot = supports.clone();
    supports.retain(|s| {
        !snapshot
            .iter()
            .any(|other| other != s && other.is_subset_of(s))
    });
    supports.sort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::var::Var;

    fn cs_of(cons: Vec<Con>) -> ConSys {
        let mut cs = ConSys::new();
        for c in cons {
            cs.push(c);
        }
        cs
    }

    fn a() -> Var {
        Var::new(0)
    }
    fn b() -> Var {
        Var::new(1)
    }

    #[test]
    fn strict_halfline_canonical_form() {
        let sys = cs_of(vec![a().gt(0)]);
        let min = min_from_cons(1, &[&sys]).unwrap();
        // x > 0 plus the strict positivity row.
        assert_eq!(min.cs.sk_rows.len(), 2);
        assert!(min.cs.sk_rows.iter().all(Con::is_strict_inequality));
        assert!(min.cs.ns_rows.is_empty());
        // Closure point at 0, the ray, and one support joining them.
        assert_eq!(min.gs.sk_rows.len(), 2);
        assert_eq!(
            min.gs.sk_rows.iter().filter(|g| g.is_closure_point()).count(),
            1
        );
        assert_eq!(min.gs.sk_rows.iter().filter(|g| g.is_ray()).count(), 1);
        assert_eq!(min.gs.ns_rows.len(), 1);
        assert_eq!(min.gs.ns_rows[0].count(), 2);
    }

    #[test]
    fn open_square_has_full_support() {
        let sys = cs_of(vec![a().gt(0), b().gt(0), a().lt(2), b().lt(2)]);
        let min = min_from_cons(2, &[&sys]).unwrap();
        assert_eq!(min.cs.sk_rows.len(), 4);
        assert!(min.cs.sk_rows.iter().all(Con::is_strict_inequality));
        assert!(min.cs.ns_rows.is_empty());
        // Four closure corners and the single all-corner support.
        assert_eq!(min.gs.sk_rows.len(), 4);
        assert!(min.gs.sk_rows.iter().all(Gen::is_closure_point));
        assert_eq!(min.gs.ns_rows.len(), 1);
        assert_eq!(min.gs.ns_rows[0].count(), 4);
    }

    #[test]
    fn square_minus_corner() {
        // ns support {0, 1} over A >= 0 and B >= 0 cuts only the origin.
        let mut sys = cs_of(vec![a().ge(0), b().ge(0), a().le(2), b().le(2)]);
        let mut ns = Bits::new();
        ns.set(0);
        ns.set(1);
        sys.push_ns(ns);
        let min = min_from_cons(2, &[&sys]).unwrap();
        assert_eq!(min.cs.sk_rows.len(), 4);
        assert!(min.cs.sk_rows.iter().all(Con::is_nonstrict_inequality));
        assert_eq!(min.cs.ns_rows.len(), 1);
        assert_eq!(min.cs.ns_rows[0].count(), 2);
        // Three proper vertices, one excluded corner, no implicit point.
        assert_eq!(
            min.gs.sk_rows.iter().filter(|g| g.is_point()).count(),
            3
        );
        assert_eq!(
            min.gs.sk_rows.iter().filter(|g| g.is_closure_point()).count(),
            1
        );
        assert!(min.gs.ns_rows.is_empty());
    }

    #[test]
    fn singleton_support_promotes_to_strict() {
        let mut sys = cs_of(vec![a().ge(0), b().ge(0), a().le(2), b().le(2)]);
        sys.push_ns(Bits::single(0));
        let min = min_from_cons(2, &[&sys]).unwrap();
        assert!(min.cs.ns_rows.is_empty());
        let strict: Vec<&Con> = min
            .cs
            .sk_rows
            .iter()
            .filter(|c| c.is_strict_inequality())
            .collect();
        assert_eq!(strict.len(), 1);
        assert_eq!(strict[0].coeff(a()), Integer::one());
    }

    #[test]
    fn strict_conflict_is_empty() {
        let sys = cs_of(vec![a().gt(0), a().lt(0)]);
        assert!(min_from_cons(1, &[&sys]).is_err());
        let sys = cs_of(vec![a().gt(0), a().le(0)]);
        assert!(min_from_cons(1, &[&sys]).is_err());
    }

    #[test]
    fn closed_systems_stay_closed() {
        let sys = cs_of(vec![a().ge(0), a().le(1)]);
        let min = min_from_cons(1, &[&sys]).unwrap();
        assert!(min.cs.ns_rows.is_empty());
        assert!(min.gs.ns_rows.is_empty());
        assert!(min.cs.sk_rows.iter().all(Con::is_nonstrict_inequality));
        assert!(min.gs.sk_rows.iter().all(Gen::is_point));
    }

    #[test]
    fn gens_with_closure_points_round_trip() {
        // Half-open segment [0, 1): point 0, closure point 1.
        let mut gsys = GenSys::new();
        gsys.push(crate::gen::point(crate::linear_expr::LinearExpr::new()));
        gsys.push(crate::gen::closure_point(crate::linear_expr::LinearExpr::from(a())));
        let min = min_from_gens(1, &[&gsys]).unwrap();
        let strict: Vec<&Con> = min
            .cs
            .sk_rows
            .iter()
            .filter(|c| c.is_strict_inequality())
            .collect();
        // 1 - A > 0 is the only strict facet.
        assert_eq!(strict.len(), 1);
        assert_eq!(strict[0].coeff(a()), Integer::from(-1));
        assert!(min
            .cs
            .sk_rows
            .iter()
            .any(|c| c.is_nonstrict_inequality() && c.coeff(a()).is_one()));
    }

    #[test]
    fn closure_points_alone_are_empty() {
        let mut gsys = GenSys::new();
        gsys.push(crate::gen::closure_point(crate::linear_expr::LinearExpr::new()));
        assert!(min_from_gens(1, &[&gsys]).is_err());
    }
}
