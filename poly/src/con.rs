//! Linear constraints: equalities, non-strict and strict inequalities.

use core::fmt;

use crate::{
    integer::Integer,
    linear_expr::{AffineExpr, LinearExpr},
    var::Var,
};

/// The kind of a constraint row.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum ConKind {
    /// `expr = 0`.
    Equality,
    /// `expr >= 0`.
    NonStrict,
    /// `expr > 0`; only satisfiable inside NNC polyhedra.
    Strict,
}

/// A linear constraint `expr + inhomo ⋈ 0`, stored in strongly normalized
/// form: coefficients and inhomogeneous term share no common factor, and
/// equalities have a positive leading coefficient.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Con {
    expr: LinearExpr,
    inhomo: Integer,
    kind: ConKind,
}

/// A sequence of constraints.
pub type Cons = Vec<Con>;

impl Con {
    /// Builds and normalizes a constraint.
    pub fn new(expr: LinearExpr, inhomo: impl Into<Integer>, kind: ConKind) -> Self {
        let mut c = Con {
            expr,
            inhomo: inhomo.into(),
            kind,
        };
        c.strong_normalize();
        c
    }

    /// The constraint `1 > 0`: the positivity row of every system in
    /// double description form.
    pub fn zero_dim_positivity() -> Self {
        Con {
            expr: LinearExpr::new(),
            inhomo: Integer::one(),
            kind: ConKind::Strict,
        }
    }

    /// The canonical inconsistent zero-dimensional constraint `1 = 0`.
    pub fn zero_dim_false() -> Self {
        Con {
            expr: LinearExpr::new(),
            inhomo: Integer::one(),
            kind: ConKind::Equality,
        }
    }

    fn strong_normalize(&mut self) {
        let mut g = self.expr.gcd(0, self.expr.space_dim());
        if !self.inhomo.is_zero() {
            g.gcd_assign(&self.inhomo);
        }
        if !g.is_zero() && !g.is_one() {
            self.expr.exact_div_assign(&g);
            self.inhomo.exact_div_assign(&g);
        }
        if self.kind == ConKind::Equality {
            let flipped = self.expr.sign_normalize();
            if flipped {
                self.inhomo.neg_assign();
            } else if self.expr.is_zero() && self.inhomo.is_negative() {
                self.inhomo.neg_assign();
            }
        }
    }

    /// The kind of this constraint.
    #[inline]
    pub fn kind(&self) -> ConKind {
        self.kind
    }

    /// The homogeneous linear part.
    #[inline]
    pub fn linear_expr(&self) -> &LinearExpr {
        &self.expr
    }

    /// The inhomogeneous term.
    #[inline]
    pub fn inhomo_term(&self) -> &Integer {
        &self.inhomo
    }

    /// The coefficient of variable `v`.
    #[inline]
    pub fn coeff(&self, v: Var) -> Integer {
        self.expr.get(v.id())
    }

    /// The space dimension of the underlying expression.
    #[inline]
    pub fn space_dim(&self) -> usize {
        self.expr.space_dim()
    }

    /// Grows the constraint to live in `dim` dimensions.
    pub fn set_space_dim(&mut self, dim: usize) {
        debug_assert!(dim >= self.expr.space_dim() || self.expr.all_zeroes(dim, self.expr.space_dim()));
        self.expr.set_space_dim(dim);
    }

    /// Is this an equality?
    #[inline]
    pub fn is_equality(&self) -> bool {
        self.kind == ConKind::Equality
    }

    /// Is this an inequality (strict or not)?
    #[inline]
    pub fn is_inequality(&self) -> bool {
        self.kind != ConKind::Equality
    }

    /// Is this a strict inequality?
    #[inline]
    pub fn is_strict_inequality(&self) -> bool {
        self.kind == ConKind::Strict
    }

    /// Is this a non-strict inequality?
    #[inline]
    pub fn is_nonstrict_inequality(&self) -> bool {
        self.kind == ConKind::NonStrict
    }

    /// Holds on every point of the whole space.
    pub fn is_tautological(&self) -> bool {
        self.expr.is_zero()
            && match self.kind {
                ConKind::Equality => self.inhomo.is_zero(),
                ConKind::NonStrict => !self.inhomo.is_negative(),
                ConKind::Strict => self.inhomo.is_positive(),
            }
    }

    /// Holds on no point at all.
    pub fn is_inconsistent(&self) -> bool {
        self.expr.is_zero()
            && match self.kind {
                ConKind::Equality => !self.inhomo.is_zero(),
                ConKind::NonStrict => self.inhomo.is_negative(),
                ConKind::Strict => !self.inhomo.is_positive(),
            }
    }

    /// The same hyperplane/halfspace boundary with a non-strict relation.
    pub fn closure(&self) -> Con {
        let mut c = self.clone();
        if c.kind == ConKind::Strict {
            c.kind = ConKind::NonStrict;
        }
        c
    }

    /// The complement constraint used by `split` and set difference:
    /// `¬(e ≥ 0)` is `-e > 0` (or `-e ≥ 0` when `strict` is false) and
    /// `¬(e > 0)` is `-e ≥ 0`. Not defined on equalities.
    pub fn complement(&self, strict: bool) -> Con {
        debug_assert!(self.is_inequality());
        let mut expr = self.expr.clone();
        expr.negate();
        let inhomo = -&self.inhomo;
        let kind = match self.kind {
            ConKind::NonStrict if strict => ConKind::Strict,
            _ => ConKind::NonStrict,
        };
        Con::new(expr, inhomo, kind)
    }

    /// Decomposes `self` into `(expr, inhomo, kind)`.
    pub fn into_parts(self) -> (LinearExpr, Integer, ConKind) {
        (self.expr, self.inhomo, self.kind)
    }

    pub(crate) fn from_parts_unchecked(expr: LinearExpr, inhomo: Integer, kind: ConKind) -> Con {
        Con { expr, inhomo, kind }
    }

    pub(crate) fn set_kind(&mut self, kind: ConKind) {
        self.kind = kind;
    }

    pub(crate) fn external_memory_in_bytes(&self) -> usize {
        self.expr.external_memory_in_bytes() + self.inhomo.external_memory_in_bytes()
    }
}

impl fmt::Display for Con {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.kind {
            ConKind::Equality => "=",
            ConKind::NonStrict => ">=",
            ConKind::Strict => ">",
        };
        if self.expr.is_zero() {
            return write!(f, "{} {op} 0", self.inhomo);
        }
        self.expr.fmt_with_vars(f)?;
        write!(f, " {op} {}", -&self.inhomo)
    }
}

macro_rules! impl_con_builders {
    ($($t:ty),*) => {$(
        impl $t {
            /// The constraint `self >= rhs`.
            pub fn ge(self, rhs: impl Into<AffineExpr>) -> Con {
                build_con(self.into(), rhs.into(), ConKind::NonStrict, false)
            }

            /// The constraint `self <= rhs`.
            pub fn le(self, rhs: impl Into<AffineExpr>) -> Con {
                build_con(self.into(), rhs.into(), ConKind::NonStrict, true)
            }

            /// The constraint `self > rhs`.
            pub fn gt(self, rhs: impl Into<AffineExpr>) -> Con {
                build_con(self.into(), rhs.into(), ConKind::Strict, false)
            }

            /// The constraint `self < rhs`.
            pub fn lt(self, rhs: impl Into<AffineExpr>) -> Con {
                build_con(self.into(), rhs.into(), ConKind::Strict, true)
            }

            /// The constraint `self = rhs`.
            pub fn eq(self, rhs: impl Into<AffineExpr>) -> Con {
                build_con(self.into(), rhs.into(), ConKind::Equality, false)
            }
        }
    )*};
}

impl_con_builders!(Var, LinearExpr, AffineExpr);

fn build_con(lhs: AffineExpr, rhs: AffineExpr, kind: ConKind, swapped: bool) -> Con {
    let (mut big, small) = if swapped { (rhs, lhs) } else { (lhs, rhs) };
    big.expr -= &small.expr;
    big.inhomo -= &small.inhomo;
    Con::new(big.expr, big.inhomo, kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a() -> Var {
        Var::new(0)
    }

    #[test]
    fn print_forms() {
        assert_eq!(a().ge(0).to_string(), "A >= 0");
        assert_eq!(a().gt(1).to_string(), "A > 1");
        assert_eq!(a().eq(-1).to_string(), "A = -1");
        assert_eq!((2i32 * a()).ge(4).to_string(), "A >= 2");
        assert_eq!((2i32 * a()).gt(1).to_string(), "2*A > 1");
        assert_eq!((-3i32 * a()).eq(1).to_string(), "3*A = -1");
    }

    #[test]
    fn swapped_builders_agree() {
        assert_eq!(a().ge(0), LinearExpr::from(a()).ge(0));
        assert_eq!(a().le(5), (-1i32 * a()).ge(-5));
        assert_eq!(a().lt(5), (-1i32 * a()).gt(-5));
    }

    #[test]
    fn tautology_and_inconsistency() {
        assert!(Con::zero_dim_positivity().is_tautological());
        assert!(Con::zero_dim_false().is_inconsistent());
        let c = LinearExpr::new().ge(0);
        assert!(c.is_tautological());
        let c = LinearExpr::new().gt(0);
        assert!(c.is_inconsistent());
        assert!(!a().ge(0).is_tautological());
    }

    #[test]
    fn complement_flips_halfspace() {
        let c = a().ge(2);
        assert_eq!(c.complement(true).to_string(), "-A > -2");
        assert_eq!(c.complement(false).to_string(), "-A >= -2");
        let s = a().gt(2);
        assert_eq!(s.complement(true).to_string(), "-A >= -2");
    }

    #[test]
    fn equalities_sign_normalize() {
        let c = (-2i32 * a()).eq(4);
        // -2A - 4 = 0 becomes A + 2 = 0.
        assert_eq!(c.to_string(), "A = -2");
    }
}
