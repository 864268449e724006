//! Disjunctive and Cartesian-factored abstract domains layered on the
//! double description engine of `cvx-poly`: finite unions of polyhedra
//! (`PSet`), automatically factored polyhedra (`FPoly`) and a
//! tagged-variant facade (`DynPoly`) dispatching over the concrete
//! domains.

#![warn(
    unused,
    future_incompatible,
    nonstandard_style,
    rust_2018_idioms,
    missing_docs
)]
#![deny(unsafe_code)]

pub mod dyn_poly;
pub mod f_poly;
pub mod p_set;

pub use crate::{
    dyn_poly::{default_poly_kind, set_default_poly_kind, DynPoly, PolyKind},
    f_poly::FPoly,
    p_set::PSet,
};
