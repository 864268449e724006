//! Process-wide defaults.
//!
//! The original design keeps the default topology and the widening choice
//! as global mutable state; here they are a thread-local context with
//! setter functions. Callers must fix the context before building the
//! polyhedra that depend on it.

use core::cell::Cell;
use core::fmt;

/// The topology of a polyhedron.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Topol {
    /// Topologically closed: only equalities and non-strict inequalities.
    Closed,
    /// Not necessarily closed: strict inequalities are admitted.
    Nnc,
}

impl Topol {
    /// Is this the closed topology?
    #[inline]
    pub fn is_closed(self) -> bool {
        self == Topol::Closed
    }
}

impl fmt::Display for Topol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topol::Closed => write!(f, "C"),
            Topol::Nnc => write!(f, "NNC"),
        }
    }
}

/// The widening operator implementation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum WidenImpl {
    /// The classic constraint-selection widening.
    H79,
    /// H79 refined by evolution heuristics under a termination
    /// certificate.
    Bhrz03,
}

/// The applicability contract of a widening call.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum WidenSpec {
    /// Requires the previous iterate to be contained in `self`.
    Risky,
    /// No precondition: the previous iterate is joined in first.
    Safe,
}

thread_local! {
    static DEFAULT_TOPOL: Cell<Topol> = const { Cell::new(Topol::Closed) };
    static WIDEN_IMPL: Cell<WidenImpl> = const { Cell::new(WidenImpl::H79) };
    static WIDEN_SPEC: Cell<WidenSpec> = const { Cell::new(WidenSpec::Risky) };
}

/// The topology used when none is requested explicitly.
pub fn default_topol() -> Topol {
    DEFAULT_TOPOL.with(Cell::get)
}

/// Sets the topology used when none is requested explicitly.
pub fn set_default_topol(topol: Topol) {
    DEFAULT_TOPOL.with(|c| c.set(topol));
}

/// The widening implementation used by `widening_assign` when none is
/// passed explicitly.
pub fn default_widen_impl() -> WidenImpl {
    WIDEN_IMPL.with(Cell::get)
}

/// Sets the default widening implementation.
pub fn set_default_widen_impl(w: WidenImpl) {
    WIDEN_IMPL.with(|c| c.set(w));
}

/// The widening specification in effect.
pub fn default_widen_spec() -> WidenSpec {
    WIDEN_SPEC.with(Cell::get)
}

/// Sets the widening specification in effect.
pub fn set_default_widen_spec(spec: WidenSpec) {
    WIDEN_SPEC.with(|c| c.set(spec));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip() {
        assert_eq!(default_topol(), Topol::Closed);
        set_default_topol(Topol::Nnc);
        assert_eq!(default_topol(), Topol::Nnc);
        set_default_topol(Topol::Closed);

        set_default_widen_impl(WidenImpl::Bhrz03);
        assert_eq!(default_widen_impl(), WidenImpl::Bhrz03);
        set_default_widen_impl(WidenImpl::H79);

        set_default_widen_spec(WidenSpec::Safe);
        assert_eq!(default_widen_spec(), WidenSpec::Safe);
        set_default_widen_spec(WidenSpec::Risky);
    }
}
