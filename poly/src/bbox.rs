//! Rational intervals and axis-aligned bounding boxes.
//!
//! A box stores one interval per dimension plus a precomputed
//! pseudo-volume indicator, and serves as a fast pre-filter for
//! containment and disjointness tests between polyhedra.

use core::cmp::Ordering;
use core::fmt;

use crate::integer::Rational;

/// A rational interval, possibly half-infinite, independently open or
/// closed at either end. `None` bounds are infinite.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Itv {
    /// Lower bound, `None` for unbounded.
    pub lb: Option<Rational>,
    /// Is the lower bound excluded?
    pub lb_open: bool,
    /// Upper bound, `None` for unbounded.
    pub ub: Option<Rational>,
    /// Is the upper bound excluded?
    pub ub_open: bool,
}

impl Itv {
    /// The whole line.
    pub fn universe() -> Itv {
        Itv::default()
    }

    /// The singleton `{q}`.
    pub fn singleton(q: Rational) -> Itv {
        Itv {
            lb: Some(q.clone()),
            lb_open: false,
            ub: Some(q),
            ub_open: false,
        }
    }

    /// Does the interval contain no rational?
    pub fn is_empty(&self) -> bool {
        match (&self.lb, &self.ub) {
            (Some(l), Some(u)) => match l.cmp(u) {
                Ordering::Greater => true,
                Ordering::Equal => self.lb_open || self.ub_open,
                Ordering::Less => false,
            },
            _ => false,
        }
    }

    /// Is the interval a single rational?
    pub fn is_singleton(&self) -> bool {
        matches!((&self.lb, &self.ub), (Some(l), Some(u)) if l == u)
            && !self.lb_open
            && !self.ub_open
    }

    /// Is the interval bounded on both sides?
    pub fn is_bounded(&self) -> bool {
        self.lb.is_some() && self.ub.is_some()
    }

    /// Interval containment, bound-for-bound.
    pub fn contains(&self, other: &Itv) -> bool {
        if other.is_empty() {
            return true;
        }
        if self.is_empty() {
            return false;
        }
        let lb_ok = match (&self.lb, &other.lb) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(a), Some(b)) => match a.cmp(b) {
                Ordering::Less => true,
                Ordering::Equal => !self.lb_open || other.lb_open,
                Ordering::Greater => false,
            },
        };
        let ub_ok = match (&self.ub, &other.ub) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(a), Some(b)) => match a.cmp(b) {
                Ordering::Greater => true,
                Ordering::Equal => !self.ub_open || other.ub_open,
                Ordering::Less => false,
            },
        };
        lb_ok && ub_ok
    }

    /// Do the two intervals share no rational?
    pub fn is_disjoint_from(&self, other: &Itv) -> bool {
        if self.is_empty() || other.is_empty() {
            return true;
        }
        let apart = |ub: &Option<Rational>, ub_open: bool, lb: &Option<Rational>, lb_open: bool| {
            match (ub, lb) {
                (Some(u), Some(l)) => match u.cmp(l) {
                    Ordering::Less => true,
                    Ordering::Equal => ub_open || lb_open,
                    Ordering::Greater => false,
                },
                _ => false,
            }
        };
        apart(&self.ub, self.ub_open, &other.lb, other.lb_open)
            || apart(&other.ub, other.ub_open, &self.lb, self.lb_open)
    }

    /// Meet: intersect with `other` in place.
    pub fn glb_assign(&mut self, other: &Itv) {
        match (&self.lb, &other.lb) {
            (_, None) => {}
            (None, Some(_)) => {
                self.lb = other.lb.clone();
                self.lb_open = other.lb_open;
            }
            (Some(a), Some(b)) => match a.cmp(b) {
                Ordering::Less => {
                    self.lb = other.lb.clone();
                    self.lb_open = other.lb_open;
                }
                Ordering::Equal => self.lb_open |= other.lb_open,
                Ordering::Greater => {}
            },
        }
        match (&self.ub, &other.ub) {
            (_, None) => {}
            (None, Some(_)) => {
                self.ub = other.ub.clone();
                self.ub_open = other.ub_open;
            }
            (Some(a), Some(b)) => match a.cmp(b) {
                Ordering::Greater => {
                    self.ub = other.ub.clone();
                    self.ub_open = other.ub_open;
                }
                Ordering::Equal => self.ub_open |= other.ub_open,
                Ordering::Less => {}
            },
        }
    }

    /// Join: the smallest interval containing both.
    pub fn lub_assign(&mut self, other: &Itv) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = other.clone();
            return;
        }
        match (&self.lb, &other.lb) {
            (None, _) => {}
            (Some(_), None) => {
                self.lb = None;
                self.lb_open = false;
            }
            (Some(a), Some(b)) => match a.cmp(b) {
                Ordering::Greater => {
                    self.lb = other.lb.clone();
                    self.lb_open = other.lb_open;
                }
                Ordering::Equal => self.lb_open &= other.lb_open,
                Ordering::Less => {}
            },
        }
        match (&self.ub, &other.ub) {
            (None, _) => {}
            (Some(_), None) => {
                self.ub = None;
                self.ub_open = false;
            }
            (Some(a), Some(b)) => match a.cmp(b) {
                Ordering::Less => {
                    self.ub = other.ub.clone();
                    self.ub_open = other.ub_open;
                }
                Ordering::Equal => self.ub_open &= other.ub_open,
                Ordering::Greater => {}
            },
        }
    }

    /// The width `ub - lb`, when bounded.
    pub fn width(&self) -> Option<Rational> {
        match (&self.lb, &self.ub) {
            (Some(l), Some(u)) => Some(u - l),
            _ => None,
        }
    }
}

impl fmt::Display for Itv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.lb {
            None => write!(f, "(-inf")?,
            Some(l) => write!(f, "{}{}", if self.lb_open { '(' } else { '[' }, l)?,
        }
        write!(f, ", ")?;
        match &self.ub {
            None => write!(f, "+inf)"),
            Some(u) => write!(f, "{}{}", u, if self.ub_open { ')' } else { ']' }),
        }
    }
}

/// The pseudo-volume indicator of a box: the number of unbounded
/// interval ends, then the product of the finite widths. Ordered
/// lexicographically; used only as a quick filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Volume {
    /// Count of infinite interval ends.
    pub num_unbounded: usize,
    /// Product of the widths of the bounded dimensions.
    pub pseudo: Rational,
}

impl PartialOrd for Volume {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Volume {
    fn cmp(&self, other: &Self) -> Ordering {
        self.num_unbounded
            .cmp(&other.num_unbounded)
            .then_with(|| self.pseudo.cmp(&other.pseudo))
    }
}

/// An axis-aligned box: one interval per dimension, an emptiness flag and
/// the precomputed volume indicator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BBox {
    itvs: Vec<Itv>,
    empty: bool,
    volume: Volume,
}

impl BBox {
    /// The universe box of the given dimension.
    pub fn universe(dim: usize) -> BBox {
        BBox::from_itvs(vec![Itv::universe(); dim])
    }

    /// The empty box of the given dimension.
    pub fn empty(dim: usize) -> BBox {
        let mut b = BBox::universe(dim);
        b.empty = true;
        b.volume = Volume {
            num_unbounded: 0,
            pseudo: Rational::from(num_bigint::BigInt::from(0)),
        };
        b
    }

    /// A box from its intervals; empty when any interval is.
    pub fn from_itvs(itvs: Vec<Itv>) -> BBox {
        let empty = itvs.iter().any(Itv::is_empty);
        let mut b = BBox {
            itvs,
            empty,
            volume: Volume {
                num_unbounded: 0,
                pseudo: Rational::from(num_bigint::BigInt::from(0)),
            },
        };
        b.recompute_volume();
        b
    }

    fn recompute_volume(&mut self) {
        if self.empty {
            self.volume = Volume {
                num_unbounded: 0,
                pseudo: Rational::from(num_bigint::BigInt::from(0)),
            };
            return;
        }
        let mut unbounded = 0;
        let one = Rational::from(num_bigint::BigInt::from(1));
        let mut pseudo = one;
        for itv in &self.itvs {
            if itv.lb.is_none() {
                unbounded += 1;
            }
            if itv.ub.is_none() {
                unbounded += 1;
            }
            if let Some(w) = itv.width() {
                pseudo *= w;
            }
        }
        self.volume = Volume {
            num_unbounded: unbounded,
            pseudo,
        };
    }

    /// The number of dimensions.
    pub fn space_dim(&self) -> usize {
        self.itvs.len()
    }

    /// Is the box empty?
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// The interval of dimension `i`.
    pub fn itv(&self, i: usize) -> &Itv {
        &self.itvs[i]
    }

    /// The volume indicator.
    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    /// Meet in place.
    pub fn glb_assign(&mut self, other: &BBox) {
        debug_assert_eq!(self.space_dim(), other.space_dim());
        if other.empty {
            self.empty = true;
        }
        if self.empty {
            self.recompute_volume();
            return;
        }
        for (a, b) in self.itvs.iter_mut().zip(other.itvs.iter()) {
            a.glb_assign(b);
        }
        self.empty = self.itvs.iter().any(Itv::is_empty);
        self.recompute_volume();
    }

    /// Join in place (smallest covering box).
    pub fn lub_assign(&mut self, other: &BBox) {
        debug_assert_eq!(self.space_dim(), other.space_dim());
        if other.empty {
            return;
        }
        if self.empty {
            *self = other.clone();
            return;
        }
        for (a, b) in self.itvs.iter_mut().zip(other.itvs.iter()) {
            a.lub_assign(b);
        }
        self.recompute_volume();
    }

    /// Box containment.
    pub fn contains(&self, other: &BBox) -> bool {
        debug_assert_eq!(self.space_dim(), other.space_dim());
        if other.empty {
            return true;
        }
        if self.empty {
            return false;
        }
        self.itvs
            .iter()
            .zip(other.itvs.iter())
            .all(|(a, b)| a.contains(b))
    }

    /// Box disjointness (exact on boxes).
    pub fn is_disjoint_from(&self, other: &BBox) -> bool {
        debug_assert_eq!(self.space_dim(), other.space_dim());
        if self.empty || other.empty {
            return true;
        }
        self.itvs
            .iter()
            .zip(other.itvs.iter())
            .any(|(a, b)| a.is_disjoint_from(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn q(n: i64) -> Rational {
        Rational::from(BigInt::from(n))
    }

    fn itv(lb: i64, ub: i64) -> Itv {
        Itv {
            lb: Some(q(lb)),
            lb_open: false,
            ub: Some(q(ub)),
            ub_open: false,
        }
    }

    #[test]
    fn emptiness_rules() {
        assert!(!itv(0, 1).is_empty());
        assert!(!itv(1, 1).is_empty());
        let mut open = itv(1, 1);
        open.ub_open = true;
        assert!(open.is_empty());
        assert!(itv(2, 1).is_empty());
        assert!(!Itv::universe().is_empty());
    }

    #[test]
    fn meet_and_join() {
        let mut a = itv(0, 5);
        a.glb_assign(&itv(3, 9));
        assert_eq!(a, itv(3, 5));
        a.lub_assign(&itv(-1, 4));
        assert_eq!(a, itv(-1, 5));
        let mut half = Itv {
            lb: Some(q(0)),
            lb_open: true,
            ub: None,
            ub_open: false,
        };
        half.glb_assign(&itv(0, 2));
        assert!(half.lb_open);
        assert_eq!(half.ub, Some(q(2)));
    }

    #[test]
    fn containment_respects_openness() {
        let closed = itv(0, 1);
        let mut open = itv(0, 1);
        open.lb_open = true;
        assert!(closed.contains(&open));
        assert!(!open.contains(&closed));
        assert!(Itv::universe().contains(&closed));
    }

    #[test]
    fn disjointness_at_touching_bounds() {
        let a = itv(0, 1);
        let b = itv(1, 2);
        assert!(!a.is_disjoint_from(&b));
        let mut b_open = b.clone();
        b_open.lb_open = true;
        assert!(a.is_disjoint_from(&b_open));
    }

    #[test]
    fn box_volume_orders() {
        let small = BBox::from_itvs(vec![itv(0, 1), itv(0, 1)]);
        let large = BBox::from_itvs(vec![itv(0, 10), itv(0, 10)]);
        let unbounded = BBox::from_itvs(vec![itv(0, 1), Itv::universe()]);
        assert!(small.volume() < large.volume());
        assert!(large.volume() < unbounded.volume());
    }

    #[test]
    fn box_ops() {
        let a = BBox::from_itvs(vec![itv(0, 4), itv(0, 4)]);
        let b = BBox::from_itvs(vec![itv(2, 6), itv(1, 3)]);
        let mut meet = a.clone();
        meet.glb_assign(&b);
        assert_eq!(meet.itv(0), &itv(2, 4));
        assert_eq!(meet.itv(1), &itv(1, 3));
        assert!(a.contains(&meet));
        let far = BBox::from_itvs(vec![itv(9, 10), itv(0, 4)]);
        assert!(a.is_disjoint_from(&far));
        let mut join = a.clone();
        join.lub_assign(&far);
        assert!(join.contains(&a) && join.contains(&far));
    }
}
