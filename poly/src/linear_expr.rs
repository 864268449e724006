//! Dense integer linear expressions indexed by space dimension.

use core::{
    fmt,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use crate::{bits::Bits, integer::Integer, var::default_var_name, var::Var};

/// A homogeneous linear form `c_0 x_0 + … + c_{d-1} x_{d-1}` with exact
/// integer coefficients. The space dimension is the length of the
/// coefficient row; trailing zeroes are significant for dimension
/// bookkeeping but not for comparisons in a given range.
#[derive(Clone, Default, PartialEq, Eq, Hash, Debug)]
pub struct LinearExpr {
    row: Vec<Integer>,
}

impl LinearExpr {
    /// The zero expression of space dimension 0.
    #[inline]
    pub fn new() -> Self {
        Default::default()
    }

    /// The zero expression of space dimension `dim`.
    pub fn with_dim(dim: usize) -> Self {
        LinearExpr {
            row: vec![Integer::zero(); dim],
        }
    }

    /// The space dimension of the expression.
    #[inline]
    pub fn space_dim(&self) -> usize {
        self.row.len()
    }

    /// Grows or truncates the expression to `dim` coefficients.
    pub fn set_space_dim(&mut self, dim: usize) {
        self.row.resize(dim, Integer::zero());
    }

    /// The coefficient of dimension `i`, zero when past the dimension.
    #[inline]
    pub fn get(&self, i: usize) -> Integer {
        self.row.get(i).cloned().unwrap_or_else(Integer::zero)
    }

    /// Sets the coefficient of dimension `i`, growing the dimension as
    /// needed.
    pub fn set(&mut self, i: usize, c: impl Into<Integer>) {
        if i >= self.row.len() {
            self.set_space_dim(i + 1);
        }
        self.row[i] = c.into();
    }

    /// Exchanges the coefficients of dimensions `i` and `j`.
    pub fn swap_space_dims(&mut self, i: usize, j: usize) {
        let need = i.max(j) + 1;
        if need > self.row.len() {
            self.set_space_dim(need);
        }
        self.row.swap(i, j);
    }

    /// Shifts every dimension at or above `v` rightward by `n`, inserting
    /// `n` fresh zero dimensions at the pivot.
    pub fn shift_space_dims(&mut self, v: Var, n: usize) {
        let pivot = v.id().min(self.row.len());
        if pivot == self.row.len() {
            self.set_space_dim(self.row.len() + n);
            return;
        }
        self.row
            .splice(pivot..pivot, core::iter::repeat_with(Integer::zero).take(n));
    }

    /// Drops the dimensions named by `removed`, compacting the others.
    pub fn remove_space_dims(&mut self, removed: &Bits) {
        let mut keep = 0;
        for i in 0..self.row.len() {
            if !removed.test(i) {
                self.row.swap(keep, i);
                keep += 1;
            }
        }
        self.row.truncate(keep);
    }

    /// Applies the cyclic permutation sending `cycle[k]` to `cycle[k+1]`
    /// (and the last entry back to the first).
    pub fn permute_space_dims(&mut self, cycle: &[usize]) {
        if cycle.len() < 2 {
            return;
        }
        let need = cycle.iter().copied().max().unwrap_or(0) + 1;
        if need > self.row.len() {
            self.set_space_dim(need);
        }
        // Walk the cycle backwards so each move lands on a freed slot.
        let last = self.row[*cycle.last().unwrap()].clone();
        for k in (1..cycle.len()).rev() {
            self.row[cycle[k]] = self.row[cycle[k - 1]].clone();
        }
        self.row[cycle[0]] = last;
    }

    /// Is every coefficient zero?
    pub fn is_zero(&self) -> bool {
        self.row.iter().all(Integer::is_zero)
    }

    /// Are all coefficients in `start..end` zero?
    pub fn all_zeroes(&self, start: usize, end: usize) -> bool {
        let end = end.min(self.row.len());
        self.row[start.min(end)..end].iter().all(Integer::is_zero)
    }

    /// The least dimension with a nonzero coefficient.
    pub fn first_nonzero(&self) -> Option<usize> {
        self.row.iter().position(|c| !c.is_zero())
    }

    /// The greatest dimension with a nonzero coefficient.
    pub fn last_nonzero(&self) -> Option<usize> {
        self.row.iter().rposition(|c| !c.is_zero())
    }

    /// The gcd of the coefficients in `start..end` (zero if all vanish).
    pub fn gcd(&self, start: usize, end: usize) -> Integer {
        let end = end.min(self.row.len());
        let mut g = Integer::zero();
        for c in &self.row[start.min(end)..end] {
            if !c.is_zero() {
                g.gcd_assign(c);
                if g.is_one() {
                    break;
                }
            }
        }
        g
    }

    /// Negates every coefficient in place.
    pub fn negate(&mut self) {
        for c in &mut self.row {
            c.neg_assign();
        }
    }

    /// Makes the first nonzero coefficient positive, negating the whole
    /// row when needed. Returns `true` when a negation happened.
    pub fn sign_normalize(&mut self) -> bool {
        match self.first_nonzero() {
            Some(i) if self.row[i].is_negative() => {
                self.negate();
                true
            }
            _ => false,
        }
    }

    /// Componentwise equality over the range `start..end`.
    pub fn is_equal_to(&self, other: &Self, start: usize, end: usize) -> bool {
        (start..end).all(|i| self.get(i) == other.get(i))
    }

    /// Do the two expressions differ by a positive rational factor over
    /// `start..end`?
    pub fn is_proportional_to(&self, other: &Self, start: usize, end: usize) -> bool {
        let mut ratio: Option<(Integer, Integer)> = None;
        for i in start..end {
            let a = self.get(i);
            let b = other.get(i);
            match (&ratio, a.is_zero(), b.is_zero()) {
                (_, true, true) => {}
                (_, true, false) | (_, false, true) => return false,
                (None, false, false) => {
                    if a.signum() != b.signum() {
                        return false;
                    }
                    ratio = Some((a, b));
                }
                (Some((ra, rb)), false, false) => {
                    // a / b == ra / rb  <=>  a * rb == b * ra.
                    if &a * rb != &b * ra {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// `self += k * e`.
    pub fn add_mul_assign(&mut self, k: &Integer, e: &LinearExpr) {
        if e.row.len() > self.row.len() {
            self.set_space_dim(e.row.len());
        }
        for (i, c) in e.row.iter().enumerate() {
            if !c.is_zero() {
                self.row[i].add_mul_assign(k, c);
            }
        }
    }

    /// Divides every coefficient by `d`. Precondition: `d` divides each.
    pub fn exact_div_assign(&mut self, d: &Integer) {
        if d.is_one() {
            return;
        }
        for c in &mut self.row {
            if !c.is_zero() {
                c.exact_div_assign(d);
            }
        }
    }

    /// The scalar product with another expression.
    pub fn scalar_prod(&self, other: &Self) -> Integer {
        let n = self.row.len().min(other.row.len());
        let mut acc = Integer::zero();
        for i in 0..n {
            if !self.row[i].is_zero() && !other.row[i].is_zero() {
                acc.add_mul_assign(&self.row[i], &other.row[i]);
            }
        }
        acc
    }

    pub(crate) fn external_memory_in_bytes(&self) -> usize {
        self.row.len() * core::mem::size_of::<Integer>()
            + self
                .row
                .iter()
                .map(Integer::external_memory_in_bytes)
                .sum::<usize>()
    }

    /// Writes the expression with named variables; `0` when empty.
    pub(crate) fn fmt_with_vars(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (i, c) in self.row.iter().enumerate() {
            if c.is_zero() {
                continue;
            }
            if first {
                if c.is_negative() {
                    write!(f, "-")?;
                }
            } else if c.is_negative() {
                write!(f, " - ")?;
            } else {
                write!(f, " + ")?;
            }
            let a = c.abs();
            if !a.is_one() {
                write!(f, "{a}*")?;
            }
            default_var_name(f, i)?;
            first = false;
        }
        if first {
            write!(f, "0")?;
        }
        Ok(())
    }
}

impl fmt::Display for LinearExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with_vars(f)
    }
}

impl From<Var> for LinearExpr {
    fn from(v: Var) -> Self {
        let mut e = LinearExpr::with_dim(v.space_dim());
        e.set(v.id(), Integer::one());
        e
    }
}

/// A linear form plus an inhomogeneous term. This is the currency of
/// constraint construction and of the optimization queries.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct AffineExpr {
    /// Homogeneous part.
    pub expr: LinearExpr,
    /// Inhomogeneous term.
    pub inhomo: Integer,
}

impl AffineExpr {
    /// Builds an affine expression from its two parts.
    pub fn new(expr: LinearExpr, inhomo: impl Into<Integer>) -> Self {
        AffineExpr {
            expr,
            inhomo: inhomo.into(),
        }
    }

    /// The space dimension of the homogeneous part.
    #[inline]
    pub fn space_dim(&self) -> usize {
        self.expr.space_dim()
    }
}

impl From<LinearExpr> for AffineExpr {
    fn from(expr: LinearExpr) -> Self {
        AffineExpr {
            expr,
            inhomo: Integer::zero(),
        }
    }
}

impl From<Var> for AffineExpr {
    fn from(v: Var) -> Self {
        AffineExpr::from(LinearExpr::from(v))
    }
}

macro_rules! impl_affine_from_scalar {
    ($($t:ty),*) => {$(
        impl From<$t> for AffineExpr {
            fn from(k: $t) -> Self {
                AffineExpr {
                    expr: LinearExpr::new(),
                    inhomo: Integer::from(k),
                }
            }
        }
    )*};
}

impl_affine_from_scalar!(i32, i64);

impl From<Integer> for AffineExpr {
    fn from(k: Integer) -> Self {
        AffineExpr {
            expr: LinearExpr::new(),
            inhomo: k,
        }
    }
}

// Expression-building operators. These exist for readable construction of
// constraints and generators; the conversion kernels use the in-place
// methods above instead.

impl Add for LinearExpr {
    type Output = LinearExpr;
    fn add(mut self, rhs: LinearExpr) -> LinearExpr {
        self += &rhs;
        self
    }
}

impl AddAssign<&LinearExpr> for LinearExpr {
    fn add_assign(&mut self, rhs: &LinearExpr) {
        self.add_mul_assign(&Integer::one(), rhs);
    }
}

impl Sub for LinearExpr {
    type Output = LinearExpr;
    fn sub(mut self, rhs: LinearExpr) -> LinearExpr {
        self -= &rhs;
        self
    }
}

impl SubAssign<&LinearExpr> for LinearExpr {
    fn sub_assign(&mut self, rhs: &LinearExpr) {
        self.add_mul_assign(&Integer::from(-1), rhs);
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;
    fn neg(mut self) -> LinearExpr {
        self.negate();
        self
    }
}

impl Add<Var> for LinearExpr {
    type Output = LinearExpr;
    fn add(self, v: Var) -> LinearExpr {
        self + LinearExpr::from(v)
    }
}

impl Sub<Var> for LinearExpr {
    type Output = LinearExpr;
    fn sub(self, v: Var) -> LinearExpr {
        self - LinearExpr::from(v)
    }
}

impl Add<Var> for Var {
    type Output = LinearExpr;
    fn add(self, rhs: Var) -> LinearExpr {
        LinearExpr::from(self) + rhs
    }
}

impl Sub<Var> for Var {
    type Output = LinearExpr;
    fn sub(self, rhs: Var) -> LinearExpr {
        LinearExpr::from(self) - rhs
    }
}

impl Add<LinearExpr> for Var {
    type Output = LinearExpr;
    fn add(self, rhs: LinearExpr) -> LinearExpr {
        LinearExpr::from(self) + rhs
    }
}

impl Sub<LinearExpr> for Var {
    type Output = LinearExpr;
    fn sub(self, rhs: LinearExpr) -> LinearExpr {
        LinearExpr::from(self) - rhs
    }
}

impl Neg for Var {
    type Output = LinearExpr;
    fn neg(self) -> LinearExpr {
        -LinearExpr::from(self)
    }
}

macro_rules! impl_scalar_mul {
    ($($t:ty),*) => {$(
        impl Mul<Var> for $t {
            type Output = LinearExpr;
            fn mul(self, v: Var) -> LinearExpr {
                let mut e = LinearExpr::with_dim(v.space_dim());
                e.set(v.id(), Integer::from(self));
                e
            }
        }

        impl Mul<LinearExpr> for $t {
            type Output = LinearExpr;
            fn mul(self, mut e: LinearExpr) -> LinearExpr {
                let k = Integer::from(self);
                for i in 0..e.space_dim() {
                    let c = e.get(i) * &k;
                    e.set(i, c);
                }
                e
            }
        }
    )*};
}

impl_scalar_mul!(i32, i64);

#[cfg(test)]
mod tests {
    use super::*;

    fn v(i: usize) -> Var {
        Var::new(i)
    }

    #[test]
    fn print_forms() {
        assert_eq!(LinearExpr::new().to_string(), "0");
        assert_eq!(LinearExpr::with_dim(5).to_string(), "0");
        let mut e = LinearExpr::with_dim(5);
        e.set(0, 5);
        assert_eq!(e.to_string(), "5*A");
        e.set(0, -5);
        assert_eq!(e.to_string(), "-5*A");
        e.set(0, 5);
        e.set(2, -3);
        e.set(4, -7);
        assert_eq!(e.to_string(), "5*A - 3*C - 7*E");
        let wide = 5i32 * v(0) + 7i32 * v(25) + 8i32 * v(26) + 9i32 * v(27);
        assert_eq!(wide.to_string(), "5*A + 7*Z + 8*A1 + 9*B1");
    }

    #[test]
    fn dimension_surgery() {
        let mut e = LinearExpr::with_dim(5);
        e.set(0, 5);
        e.set(2, -3);
        e.set(4, -7);
        e.swap_space_dims(2, 4);
        assert_eq!(e.to_string(), "5*A - 7*C - 3*E");

        let mut e = LinearExpr::with_dim(5);
        e.set(0, 5);
        e.set(2, -3);
        e.set(4, -7);
        e.shift_space_dims(v(2), 5);
        assert_eq!(e.space_dim(), 10);
        assert_eq!(e.to_string(), "5*A - 3*H - 7*J");

        let mut removed = Bits::new();
        removed.set(0);
        removed.set(8);
        e.remove_space_dims(&removed);
        assert_eq!(e.space_dim(), 8);
        assert_eq!(e.to_string(), "-3*G - 7*H");
    }

    #[test]
    fn permutation_is_cyclic() {
        let mut e = 1i32 * v(0) + 2i32 * v(1) + 3i32 * v(2);
        e.permute_space_dims(&[0, 1, 2]);
        assert_eq!(e.to_string(), "3*A + B + 2*C");
    }

    #[test]
    fn normalization_helpers() {
        let mut e = -2i32 * v(0) + 6i32 * v(2);
        assert_eq!(e.first_nonzero(), Some(0));
        assert_eq!(e.last_nonzero(), Some(2));
        assert_eq!(e.gcd(0, 3), Integer::from(2));
        assert!(e.sign_normalize());
        assert_eq!(e.to_string(), "2*A - 6*C");
        e.exact_div_assign(&Integer::from(2));
        assert_eq!(e.to_string(), "A - 3*C");
    }

    #[test]
    fn proportionality() {
        let a = 2i32 * v(0) - 4i32 * v(1);
        let b = 3i32 * v(0) - 6i32 * v(1);
        let c = 3i32 * v(0) + 6i32 * v(1);
        assert!(a.is_proportional_to(&b, 0, 2));
        assert!(!a.is_proportional_to(&c, 0, 2));
        assert!(!a.is_proportional_to(&(-1i32 * b), 0, 2));
    }

    #[test]
    fn linear_combination() {
        let mut a = 2i32 * v(0) + 1i32 * v(1);
        let b = 1i32 * v(0) - 1i32 * v(2);
        a.add_mul_assign(&Integer::from(3), &b);
        assert_eq!(a.to_string(), "5*A + B - 3*C");
        assert_eq!(
            a.scalar_prod(&(1i32 * v(1) + 1i32 * v(2))),
            Integer::from(-2)
        );
    }
}
