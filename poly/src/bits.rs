//! Dense bitsets of unbounded length.
//!
//! `Bits` backs both the saturation rows and the non-skeleton supports;
//! `IndexSet` is the same type under its support-row name.

use core::{
    fmt,
    ops::{BitAndAssign, BitOrAssign, SubAssign},
};

use smallvec::SmallVec;

const BITS_PER_WORD: usize = u64::BITS as usize;

/// A set of small indices kept as a dense bit vector.
///
/// Equality and hashing are set-wise: trailing zero words are stripped
/// after every mutating operation.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bits {
    words: SmallVec<[u64; 2]>,
}

/// A non-skeleton support row: the set of skeleton row indices whose
/// combination the row denotes.
pub type IndexSet = Bits;

impl Bits {
    /// The empty set.
    #[inline]
    pub fn new() -> Self {
        Default::default()
    }

    /// The singleton `{i}`.
    pub fn single(i: usize) -> Self {
        let mut b = Bits::new();
        b.set(i);
        b
    }

    #[inline]
    fn shrink(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }

    /// Adds `i` to the set.
    pub fn set(&mut self, i: usize) {
        let w = i / BITS_PER_WORD;
        if w >= self.words.len() {
            self.words.resize(w + 1, 0);
        }
        self.words[w] |= 1u64 << (i % BITS_PER_WORD);
    }

    /// Removes `i` from the set.
    pub fn reset(&mut self, i: usize) {
        let w = i / BITS_PER_WORD;
        if w < self.words.len() {
            self.words[w] &= !(1u64 << (i % BITS_PER_WORD));
            self.shrink();
        }
    }

    /// Is `i` a member?
    #[inline]
    pub fn test(&self, i: usize) -> bool {
        let w = i / BITS_PER_WORD;
        w < self.words.len() && self.words[w] & (1u64 << (i % BITS_PER_WORD)) != 0
    }

    /// Toggles membership of `i`.
    pub fn flip(&mut self, i: usize) {
        if self.test(i) {
            self.reset(i);
        } else {
            self.set(i);
        }
    }

    /// Adds every index in `0..k`.
    pub fn set_until(&mut self, k: usize) {
        for i in 0..k {
            self.set(i);
        }
    }

    /// Removes every index in `k..`.
    pub fn clear_from(&mut self, k: usize) {
        let w = k / BITS_PER_WORD;
        if w < self.words.len() {
            let r = k % BITS_PER_WORD;
            if r == 0 {
                self.words.truncate(w);
            } else {
                self.words.truncate(w + 1);
                self.words[w] &= (1u64 << r) - 1;
            }
            self.shrink();
        }
    }

    /// Is the set empty?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The number of members.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// The least member.
    pub fn first(&self) -> Option<usize> {
        self.words
            .iter()
            .position(|w| *w != 0)
            .map(|i| i * BITS_PER_WORD + self.words[i].trailing_zeros() as usize)
    }

    /// The greatest member.
    pub fn last(&self) -> Option<usize> {
        self.words
            .iter()
            .rposition(|w| *w != 0)
            .map(|i| i * BITS_PER_WORD + BITS_PER_WORD - 1 - self.words[i].leading_zeros() as usize)
    }

    /// Is every member of `self` also in `other`?
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(other.words.iter().chain(core::iter::repeat(&0)))
            .all(|(a, b)| a & !b == 0)
    }

    /// Do the two sets share no member?
    pub fn is_disjoint_from(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(a, b)| a & b == 0)
    }

    /// Iterates over the members in ascending order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            bits: self,
            word_idx: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }

    /// Removes the indices in `removed` from the universe: members are
    /// dropped and every surviving index is shifted down by the number of
    /// removed indices below it.
    pub fn remove_all(&mut self, removed: &Bits) {
        if removed.is_empty() {
            return;
        }
        let mut out = Bits::new();
        let mut shift = 0;
        let mut rm = removed.iter().peekable();
        for i in self.iter() {
            while let Some(&r) = rm.peek() {
                if r <= i {
                    shift += 1;
                    rm.next();
                } else {
                    break;
                }
            }
            if !removed.test(i) {
                out.set(i - shift);
            }
        }
        *self = out;
    }

    pub(crate) fn external_memory_in_bytes(&self) -> usize {
        if self.words.spilled() {
            self.words.capacity() * core::mem::size_of::<u64>()
        } else {
            0
        }
    }
}

impl BitOrAssign<&Bits> for Bits {
    fn bitor_assign(&mut self, rhs: &Bits) {
        if rhs.words.len() > self.words.len() {
            self.words.resize(rhs.words.len(), 0);
        }
        for (a, b) in self.words.iter_mut().zip(rhs.words.iter()) {
            *a |= b;
        }
    }
}

impl BitAndAssign<&Bits> for Bits {
    fn bitand_assign(&mut self, rhs: &Bits) {
        self.words.truncate(rhs.words.len());
        for (a, b) in self.words.iter_mut().zip(rhs.words.iter()) {
            *a &= b;
        }
        self.shrink();
    }
}

impl SubAssign<&Bits> for Bits {
    fn sub_assign(&mut self, rhs: &Bits) {
        for (a, b) in self.words.iter_mut().zip(rhs.words.iter()) {
            *a &= !b;
        }
        self.shrink();
    }
}

impl FromIterator<usize> for Bits {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        let mut b = Bits::new();
        for i in iter {
            b.set(i);
        }
        b
    }
}

impl<'a> IntoIterator for &'a Bits {
    type Item = usize;
    type IntoIter = Iter<'a>;
    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// Ascending iterator over the members of a [`Bits`].
pub struct Iter<'a> {
    bits: &'a Bits,
    word_idx: usize,
    current: u64,
}

impl Iterator for Iter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.current == 0 {
            self.word_idx += 1;
            if self.word_idx >= self.bits.words.len() {
                return None;
            }
            self.current = self.bits.words[self.word_idx];
        }
        let tz = self.current.trailing_zeros() as usize;
        self.current &= self.current - 1;
        Some(self.word_idx * BITS_PER_WORD + tz)
    }
}

impl fmt::Debug for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(v: &[usize]) -> Bits {
        v.iter().copied().collect()
    }

    #[test]
    fn membership_and_iteration() {
        let mut b = Bits::new();
        b.set(4);
        b.set(18);
        b.set(130);
        assert!(b.test(4) && b.test(18) && b.test(130));
        assert!(!b.test(5));
        assert_eq!(b.iter().collect::<Vec<_>>(), vec![4, 18, 130]);
        assert_eq!(b.count(), 3);
        assert_eq!(b.first(), Some(4));
        assert_eq!(b.last(), Some(130));
        b.reset(130);
        assert_eq!(b.last(), Some(18));
    }

    #[test]
    fn equality_ignores_capacity() {
        let mut a = bits(&[1, 200]);
        a.reset(200);
        assert_eq!(a, bits(&[1]));
        use core::hash::{Hash, Hasher};
        let mut h1 = std::collections::hash_map::DefaultHasher::new();
        let mut h2 = h1.clone();
        a.hash(&mut h1);
        bits(&[1]).hash(&mut h2);
        assert_eq!(h1.finish(), h2.finish());
    }

    #[test]
    fn set_operations() {
        let mut a = bits(&[1, 3, 70]);
        a |= &bits(&[2, 70, 90]);
        assert_eq!(a, bits(&[1, 2, 3, 70, 90]));
        a &= &bits(&[2, 3, 90, 91]);
        assert_eq!(a, bits(&[2, 3, 90]));
        a -= &bits(&[3, 90]);
        assert_eq!(a, bits(&[2]));
    }

    #[test]
    fn subset_and_disjoint() {
        assert!(bits(&[1, 3]).is_subset_of(&bits(&[1, 2, 3])));
        assert!(!bits(&[1, 64]).is_subset_of(&bits(&[1])));
        assert!(bits(&[]).is_subset_of(&bits(&[7])));
        assert!(bits(&[1, 2]).is_disjoint_from(&bits(&[3, 64])));
        assert!(!bits(&[1, 64]).is_disjoint_from(&bits(&[64])));
    }

    #[test]
    fn bulk_ranges() {
        let mut b = Bits::new();
        b.set_until(5);
        assert_eq!(b, bits(&[0, 1, 2, 3, 4]));
        b.set(70);
        b.clear_from(3);
        assert_eq!(b, bits(&[0, 1, 2]));
    }

    #[test]
    fn remove_all_compacts_indices() {
        // Ported behavior: removed indices leave, survivors shift down.
        let mut a = bits(&[4, 18]);
        let neg = bits(&[24, 25, 131, 132, 138, 139, 140, 141, 142, 143, 144, 145]);
        a.remove_all(&neg);
        assert_eq!(a, bits(&[4, 18]));

        let mut b = bits(&[21, 39]);
        b.remove_all(&neg);
        assert_eq!(b, bits(&[21, 37]));

        let mut c = bits(&[20, 55]);
        c.remove_all(&neg);
        assert_eq!(c, bits(&[20, 53]));

        let mut d = bits(&[0, 3, 33, 66]);
        d.remove_all(&neg);
        assert_eq!(d, bits(&[0, 3, 31, 64]));

        let mut e = bits(&[10, 24, 30]);
        e.remove_all(&bits(&[24]));
        assert_eq!(e, bits(&[10, 29]));
    }
}
