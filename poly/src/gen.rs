//! Generators: lines, rays, points and closure points.

use core::fmt;

use crate::{
    integer::Integer,
    linear_expr::LinearExpr,
    var::Var,
};

/// The kind of a generator row.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum GenKind {
    /// A bidirectional direction of unboundedness.
    Line,
    /// A direction of unboundedness.
    Ray,
    /// An included point `expr / div`.
    Point,
    /// A limit point that does not belong to the polyhedron; meaningful
    /// only for NNC polyhedra.
    ClosurePoint,
}

/// A generator. Points and closure points carry a positive divisor; the
/// divisor of lines and rays is implicitly one and stored as zero.
/// Coefficients are kept in lowest proportional terms; lines are also
/// sign-normalized.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Gen {
    kind: GenKind,
    expr: LinearExpr,
    div: Integer,
}

/// A sequence of generators.
pub type Gens = Vec<Gen>;

/// The line along direction `e`. Precondition: `e` is not the zero vector.
pub fn line(e: LinearExpr) -> Gen {
    Gen::new(GenKind::Line, e, Integer::zero())
}

/// The ray along direction `e`. Precondition: `e` is not the zero vector.
pub fn ray(e: LinearExpr) -> Gen {
    Gen::new(GenKind::Ray, e, Integer::zero())
}

/// The point at `e`.
pub fn point(e: impl Into<LinearExpr>) -> Gen {
    Gen::new(GenKind::Point, e.into(), Integer::one())
}

/// The point at `e / div`. Precondition: `div` is nonzero.
pub fn point_div(e: LinearExpr, div: impl Into<Integer>) -> Gen {
    Gen::new(GenKind::Point, e, div.into())
}

/// The closure point at `e`.
pub fn closure_point(e: impl Into<LinearExpr>) -> Gen {
    Gen::new(GenKind::ClosurePoint, e.into(), Integer::one())
}

/// The closure point at `e / div`. Precondition: `div` is nonzero.
pub fn closure_point_div(e: LinearExpr, div: impl Into<Integer>) -> Gen {
    Gen::new(GenKind::ClosurePoint, e, div.into())
}

impl Gen {
    /// Builds and normalizes a generator.
    pub fn new(kind: GenKind, expr: LinearExpr, div: Integer) -> Self {
        let mut g = Gen { kind, expr, div };
        match g.kind {
            GenKind::Line => {
                debug_assert!(!g.expr.is_zero());
                g.div = Integer::zero();
                let gcd = g.expr.gcd(0, g.expr.space_dim());
                if !gcd.is_zero() {
                    g.expr.exact_div_assign(&gcd);
                }
                g.expr.sign_normalize();
            }
            GenKind::Ray => {
                debug_assert!(!g.expr.is_zero());
                g.div = Integer::zero();
                let gcd = g.expr.gcd(0, g.expr.space_dim());
                if !gcd.is_zero() {
                    g.expr.exact_div_assign(&gcd);
                }
            }
            GenKind::Point | GenKind::ClosurePoint => {
                debug_assert!(!g.div.is_zero());
                if g.div.is_negative() {
                    g.expr.negate();
                    g.div.neg_assign();
                }
                let mut gcd = g.expr.gcd(0, g.expr.space_dim());
                gcd.gcd_assign(&g.div);
                if !gcd.is_one() {
                    g.expr.exact_div_assign(&gcd);
                    g.div.exact_div_assign(&gcd);
                }
            }
        }
        g
    }

    /// The point at the origin of a zero-dimensional space.
    pub fn zero_dim_point() -> Self {
        point(LinearExpr::new())
    }

    /// The kind of this generator.
    #[inline]
    pub fn kind(&self) -> GenKind {
        self.kind
    }

    /// The coefficient row.
    #[inline]
    pub fn linear_expr(&self) -> &LinearExpr {
        &self.expr
    }

    /// The divisor; zero for lines and rays.
    #[inline]
    pub fn divisor(&self) -> &Integer {
        &self.div
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

    /// Grows the generator to live in `dim` dimensions.
    pub fn set_space_dim(&mut self, dim: usize) {
        debug_assert!(dim >= self.expr.space_dim() || self.expr.all_zeroes(dim, self.expr.space_dim()));
        self.expr.set_space_dim(dim);
    }

    /// Is this a line?
    #[inline]
    pub fn is_line(&self) -> bool {
        self.kind == GenKind::Line
    }

    /// Is this a ray?
    #[inline]
    pub fn is_ray(&self) -> bool {
        self.kind == GenKind::Ray
    }

    /// Is this a point?
    #[inline]
    pub fn is_point(&self) -> bool {
        self.kind == GenKind::Point
    }

    /// Is this a closure point?
    #[inline]
    pub fn is_closure_point(&self) -> bool {
        self.kind == GenKind::ClosurePoint
    }

    /// Is this a point or a closure point?
    #[inline]
    pub fn is_point_like(&self) -> bool {
        matches!(self.kind, GenKind::Point | GenKind::ClosurePoint)
    }

    /// Decomposes `self` into `(kind, expr, div)`.
    pub fn into_parts(self) -> (GenKind, LinearExpr, Integer) {
        (self.kind, self.expr, self.div)
    }

    pub(crate) fn from_parts_unchecked(kind: GenKind, expr: LinearExpr, div: Integer) -> Gen {
        Gen { kind, expr, div }
    }

    pub(crate) fn set_kind(&mut self, kind: GenKind) {
        self.kind = kind;
    }

    pub(crate) fn external_memory_in_bytes(&self) -> usize {
        self.expr.external_memory_in_bytes() + self.div.external_memory_in_bytes()
    }
}

impl fmt::Display for Gen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind {
            GenKind::Line => 'l',
            GenKind::Ray => 'r',
            GenKind::Point => 'p',
            GenKind::ClosurePoint => 'c',
        };
        write!(f, "{tag}(")?;
        if self.is_point_like() && !self.div.is_one() {
            write!(f, "(")?;
            self.expr.fmt_with_vars(f)?;
            write!(f, ")/{}", self.div)?;
        } else {
            self.expr.fmt_with_vars(f)?;
        }
        write!(f, ")")
    }
}
