use std::ops::Deref;

use smallvec::{smallvec, SmallVec};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::LV;

/// A frontier names a version of the document: the set of operations in the
/// oplog which have no descendants. Frontiers are always sorted in ascending
/// order, and almost always contain a single element - they only grow while
/// concurrent operations from different agents haven't been "joined" by a
/// subsequent operation.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Frontier(pub SmallVec<[LV; 2]>);

/// Frontiers should always be sorted smallest to largest.
pub(crate) fn frontier_is_sorted(f: &[LV]) -> bool {
    if f.len() >= 2 {
        let mut last = f[0];
        for t in &f[1..] {
            debug_assert!(*t != last);
            if last > *t { return false; }
            last = *t;
        }
    }
    true
}

pub(crate) fn debug_assert_frontier_sorted(f: &[LV]) {
    debug_assert!(frontier_is_sorted(f));
}

impl Frontier {
    /// The root version, before any operations have happened.
    pub fn root() -> Self {
        Self(smallvec![])
    }

    pub fn new_1(lv: LV) -> Self {
        Self(smallvec![lv])
    }

    pub fn from_sorted(lvs: &[LV]) -> Self {
        debug_assert_frontier_sorted(lvs);
        Self(lvs.into())
    }

    pub fn from_unsorted(lvs: &[LV]) -> Self {
        let mut f: SmallVec<[LV; 2]> = lvs.into();
        f.sort_unstable();
        Self(f)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_ref(&self) -> &[LV] {
        self.0.as_slice()
    }

    pub(crate) fn replace_with_1(&mut self, lv: LV) {
        self.0.truncate(1);
        if self.0.is_empty() {
            self.0.push(lv);
        } else {
            self.0[0] = lv;
        }
    }

    pub(crate) fn debug_check_sorted(&self) {
        debug_assert_frontier_sorted(self.as_ref());
    }

    /// Advance the frontier by a single operation with the named parents.
    /// Parents which were frontier members are now dominated and drop out.
    pub fn advance(&mut self, lv: LV, parents: &[LV]) {
        debug_assert_frontier_sorted(self.as_ref());
        self.0.retain(|v| !parents.contains(v));

        // Keep the set sorted. A linear scan would do just as well here; the
        // frontier rarely has more than 2 entries.
        let new_idx = self.0.binary_search(&lv).unwrap_err();
        self.0.insert(new_idx, lv);
    }
}

impl Deref for Frontier {
    type Target = [LV];

    fn deref(&self) -> &[LV] {
        self.0.as_slice()
    }
}

impl From<&[LV]> for Frontier {
    fn from(lvs: &[LV]) -> Self {
        Self::from_sorted(lvs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_replaces_dominated_parents() {
        let mut f = Frontier::root();
        f.advance(0, &[]);
        assert_eq!(f.as_ref(), &[0]);

        f.advance(1, &[0]);
        assert_eq!(f.as_ref(), &[1]);

        // A concurrent operation (parent of neither) merges in.
        f.advance(2, &[0]);
        assert_eq!(f.as_ref(), &[1, 2]);

        // An operation dominating both collapses the frontier again.
        f.advance(3, &[1, 2]);
        assert_eq!(f.as_ref(), &[3]);
    }

    #[test]
    fn advance_keeps_sorted_order() {
        let mut f = Frontier::from_sorted(&[4, 10]);
        f.advance(7, &[]);
        assert_eq!(f.as_ref(), &[4, 7, 10]);
        assert!(frontier_is_sorted(f.as_ref()));
    }

    #[test]
    fn replace_with_1() {
        let mut f = Frontier::root();
        f.replace_with_1(5);
        assert_eq!(f.as_ref(), &[5]);
        f.replace_with_1(9);
        assert_eq!(f.as_ref(), &[9]);
    }
}
