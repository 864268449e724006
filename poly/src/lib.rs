//! Core interface for computing with convex polyhedra over the rationals in
//! double description form. A polyhedron is kept simultaneously as a system
//! of linear constraints and a system of generators, related by an
//! incremental Chernikova-style conversion; both topologically closed and
//! not-necessarily-closed (NNC) polyhedra are supported.

#![warn(
    unused,
    future_incompatible,
    nonstandard_style,
    rust_2018_idioms,
    missing_docs
)]
#![deny(unsafe_code)]

pub mod bbox;
pub mod bits;
pub mod con;
pub mod context;
pub mod gen;
pub mod integer;
pub mod linear_expr;
pub mod poly;
pub mod rel;
pub mod var;

pub(crate) mod conv;
pub(crate) mod nnc;
pub(crate) mod sat;
pub mod sys;

pub use crate::{
    bbox::{BBox, Itv},
    bits::{Bits, IndexSet},
    con::{Con, ConKind, Cons},
    context::{Topol, WidenImpl, WidenSpec},
    gen::{closure_point, closure_point_div, line, point, point_div, ray, Gen, GenKind, Gens},
    integer::{Integer, Rational},
    linear_expr::{AffineExpr, LinearExpr},
    poly::{Extremum, Poly, SpecElem, Status},
    rel::{PolyConRel, PolyGenRel},
    sys::{ConSys, GenSys},
    var::Var,
};
