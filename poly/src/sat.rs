//! Saturation matrices.
//!
//! A saturation matrix records, for each skeleton constraint row and each
//! skeleton generator row, whether the generator saturates the constraint
//! (the constraint's linear form evaluates to zero on it). The polyhedron
//! keeps the matrix in both orientations; the two are transposes.

use core::fmt;

use crate::bits::Bits;

/// A bit matrix with `num_rows × num_cols` entries, kept row-wise.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub(crate) struct Sat {
    rows: Vec<Bits>,
    num_cols: usize,
}

impl Sat {
    /// An empty `rows × cols` matrix.
    pub fn new(num_rows: usize, num_cols: usize) -> Self {
        Sat {
            rows: vec![Bits::new(); num_rows],
            num_cols,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    pub fn row(&self, i: usize) -> &Bits {
        &self.rows[i]
    }

    pub fn set(&mut self, i: usize, j: usize) {
        debug_assert!(j < self.num_cols);
        self.rows[i].set(j);
    }

    pub fn test(&self, i: usize, j: usize) -> bool {
        self.rows[i].test(j)
    }

    /// The matrix with rows and columns exchanged.
    pub fn transpose(&self) -> Sat {
        let mut t = Sat::new(self.num_cols, self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            for j in row.iter() {
                t.rows[j].set(i);
            }
        }
        t
    }

    pub(crate) fn external_memory_in_bytes(&self) -> usize {
        self.rows.len() * core::mem::size_of::<Bits>()
            + self.rows.iter().map(Bits::external_memory_in_bytes).sum::<usize>()
    }
}

impl fmt::Display for Sat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} x {}", self.rows.len(), self.num_cols)?;
        for row in &self.rows {
            for j in 0..self.num_cols {
                write!(f, "{} ", u8::from(row.test(j)))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Sat {
    /// Parses the `Display` form back; `None` on malformed input.
    pub fn ascii_load<'a>(lines: &mut impl Iterator<Item = &'a str>) -> Option<Sat> {
        let header = lines.next()?;
        let mut parts = header.split(" x ");
        let num_rows: usize = parts.next()?.trim().parse().ok()?;
        let num_cols: usize = parts.next()?.trim().parse().ok()?;
        let mut sat = Sat::new(num_rows, num_cols);
        for i in 0..num_rows {
            let line = lines.next()?;
            let mut seen = 0;
            for (j, tok) in line.split_whitespace().enumerate() {
                match tok {
                    "0" => {}
                    "1" => sat.rows[i].set(j),
                    _ => return None,
                }
                seen += 1;
            }
            if seen != num_cols {
                return None;
            }
        }
        Some(sat)
    }
}
