//! Line-oriented textual round-trip of the full polyhedron state.
//!
//! The dump records topology, dimension, status, the four systems and
//! both saturation matrices. `load ∘ dump` is the identity; the format
//! is internal and guaranteed only across matching library versions.

use core::fmt::{self, Write as _};

use crate::{
    context::Topol,
    sat::Sat,
    sys::{ConSys, GenSys},
};

use super::{Poly, PolyImpl, Status};

struct SysDump<'a, R: crate::sys::SysRow + crate::sys::AsciiRow>(&'a crate::sys::Sys<R>);

impl<R: crate::sys::SysRow + crate::sys::AsciiRow> fmt::Display for SysDump<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.ascii_dump(f)
    }
}

impl Poly {
    /// Dumps the complete internal state as text.
    pub fn ascii_dump(&self) -> String {
        let imp = self.imp();
        let mut out = String::new();
        let _ = writeln!(out, "topol {}", imp.topol);
        let _ = writeln!(out, "dim {}", imp.dim);
        let _ = writeln!(out, "status {}", imp.status);
        let _ = writeln!(out, "=> cs sys");
        let _ = write!(out, "{}", SysDump(&imp.cs));
        let _ = writeln!(out, "=> gs sys");
        let _ = write!(out, "{}", SysDump(&imp.gs));
        let _ = writeln!(out, "sat_c");
        let _ = write!(out, "{}", imp.sat_c);
        let _ = writeln!(out, "sat_g");
        let _ = write!(out, "{}", imp.sat_g);
        let _ = writeln!(out, "=> cs_pending");
        let _ = write!(out, "{}", SysDump(&imp.cs_pending));
        let _ = writeln!(out, "=> gs_pending");
        let _ = write!(out, "{}", SysDump(&imp.gs_pending));
        out
    }

    /// Parses a dump produced by `ascii_dump`, replacing `self` on
    /// success. On failure returns `false` and leaves `self` unchanged.
    pub fn ascii_load(&mut self, input: &str) -> bool {
        match parse_impl(input) {
            Some(imp) => {
                *self.imp_mut() = imp;
                true
            }
            None => false,
        }
    }
}

fn parse_impl(input: &str) -> Option<PolyImpl> {
    let mut lines = input.lines();

    let topol = match lines.next()?.strip_prefix("topol ")?.trim() {
        "C" => Topol::Closed,
        "NNC" => Topol::Nnc,
        _ => return None,
    };
    let dim: usize = lines.next()?.strip_prefix("dim ")?.trim().parse().ok()?;
    let status = match lines.next()?.strip_prefix("status ")?.trim() {
        "EMPTY" => Status::Empty,
        "MINIMIZED" => Status::Minimized,
        "PENDING" => Status::Pending,
        _ => return None,
    };

    expect(&mut lines, "=> cs sys")?;
    let cs = ConSys::ascii_load(&mut lines)?;
    expect(&mut lines, "=> gs sys")?;
    let gs = GenSys::ascii_load(&mut lines)?;
    expect(&mut lines, "sat_c")?;
    let sat_c = Sat::ascii_load(&mut lines)?;
    expect(&mut lines, "sat_g")?;
    let sat_g = Sat::ascii_load(&mut lines)?;
    expect(&mut lines, "=> cs_pending")?;
    let cs_pending = ConSys::ascii_load(&mut lines)?;
    expect(&mut lines, "=> gs_pending")?;
    let gs_pending = GenSys::ascii_load(&mut lines)?;

    if sat_c.num_rows() != cs.sk_rows.len() || sat_c.num_cols() != gs.sk_rows.len() {
        return None;
    }
    if sat_g.num_rows() != gs.sk_rows.len() || sat_g.num_cols() != cs.sk_rows.len() {
        return None;
    }
    if cs.space_dim() > dim || gs.space_dim() > dim {
        return None;
    }

    let mut imp = PolyImpl {
        topol,
        dim,
        status,
        cs,
        gs,
        sat_c,
        sat_g,
        cs_pending,
        gs_pending,
    };
    imp.cs.set_space_dim(dim);
    imp.gs.set_space_dim(dim);
    imp.cs_pending.set_space_dim(dim);
    imp.gs_pending.set_space_dim(dim);
    Some(imp)
}

fn expect<'a>(lines: &mut impl Iterator<Item = &'a str>, tag: &str) -> Option<()> {
    (lines.next()?.trim_end() == tag).then_some(())
}
