//! Tools for walking the causal graph backwards: the diff between two
//! versions, and the scan that finds which operations an incremental merge
//! has to revisit.

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use smallvec::{smallvec, SmallVec};

use crate::frontier::Frontier;
use crate::oplog::OpLog;
use crate::pheap::PairingHeap;
use crate::LV;

use self::DiffFlag::*;

// Each entry in the queue is tagged with whether it was reached from a's
// history, b's history or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DiffFlag {
    OnlyA,
    OnlyB,
    Shared,
}

/// (ops only in a's history, ops only in b's history), both in descending LV
/// order. Shared ancestors appear in neither.
pub(crate) type DiffResult = (SmallVec<[LV; 4]>, SmallVec<[LV; 4]>);

fn enqueue(
    queue: &mut PairingHeap<LV>,
    flags: &mut HashMap<LV, DiffFlag>,
    num_shared: &mut usize,
    lv: LV,
    flag: DiffFlag,
) {
    match flags.entry(lv) {
        Entry::Vacant(e) => {
            e.insert(flag);
            queue.push(lv);
            if flag == Shared {
                *num_shared += 1;
            }
        }
        Entry::Occupied(mut e) => {
            let old = *e.get();
            if flag != old && old != Shared {
                // Reached from both sides; promote. The entry is only in the
                // queue once, so the shared count grows by one.
                e.insert(Shared);
                *num_shared += 1;
            }
        }
    }
}

impl<T> OpLog<T> {
    /// Classify the ancestors of two versions. Works backwards from both
    /// frontiers at once, always expanding the largest remaining LV - since
    /// parents always have smaller LVs than their children, no op is visited
    /// twice. Once only shared entries remain in the queue, everything left
    /// is common history and we can stop.
    pub(crate) fn diff(&self, a: &[LV], b: &[LV]) -> DiffResult {
        // Almost every local op lands exactly on the current frontier.
        if a == b {
            return (smallvec![], smallvec![]);
        }

        let mut queue: PairingHeap<LV> = PairingHeap::new();
        let mut flags: HashMap<LV, DiffFlag> = HashMap::new();
        let mut num_shared = 0;

        for &lv in a {
            enqueue(&mut queue, &mut flags, &mut num_shared, lv, OnlyA);
        }
        for &lv in b {
            enqueue(&mut queue, &mut flags, &mut num_shared, lv, OnlyB);
        }

        let mut only_a: SmallVec<[LV; 4]> = smallvec![];
        let mut only_b: SmallVec<[LV; 4]> = smallvec![];

        while queue.len() > num_shared {
            let Some(lv) = queue.pop() else { break };
            let flag = flags[&lv];
            match flag {
                Shared => num_shared -= 1,
                OnlyA => only_a.push(lv),
                OnlyB => only_b.push(lv),
            }

            for &p in self.op(lv).parents.as_ref() {
                enqueue(&mut queue, &mut flags, &mut num_shared, p, flag);
            }
        }

        (only_a, only_b)
    }
}

/// The work list for an incremental merge: everything above the common
/// version, split into the ops the branch already has (shared - replayed for
/// walker state only) and the ops it's missing (replayed into the snapshot).
/// Both lists are in chronological (ascending LV) order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OpsToVisit {
    pub common_version: Frontier,
    pub shared_ops: Vec<LV>,
    pub b_only_ops: Vec<LV>,
}

/// A version (sorted descending) in the merge point queue, tagged with
/// whether it was reached from the a side.
#[derive(Debug, Clone)]
struct MergePoint {
    v: SmallVec<[LV; 2]>,
    is_in_a: bool,
}

impl PartialEq for MergePoint {
    fn eq(&self, other: &Self) -> bool {
        self.v == other.v
    }
}

impl Eq for MergePoint {}

impl PartialOrd for MergePoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergePoint {
    fn cmp(&self, other: &Self) -> Ordering {
        // Plain slice ordering does the right thing on descending-sorted
        // versions: the newest head dominates, and on a tie the longer
        // (merged) version comes out larger.
        self.v.cmp(&other.v)
    }
}

fn push_version(queue: &mut PairingHeap<MergePoint>, lvs: &[LV], is_in_a: bool) {
    let mut v: SmallVec<[LV; 2]> = lvs.into();
    v.sort_unstable_by(|a, b| b.cmp(a));
    queue.push(MergePoint { v, is_in_a });
}

impl<T> OpLog<T> {
    /// Walk backwards from both versions simultaneously, always expanding the
    /// newest entry, until the two walks meet at a single common version.
    pub(crate) fn find_ops_to_visit(&self, a: &[LV], b: &[LV]) -> OpsToVisit {
        let mut queue: PairingHeap<MergePoint> = PairingHeap::new();
        push_version(&mut queue, a, true);
        push_version(&mut queue, b, false);

        let mut shared_ops = vec![];
        let mut b_only_ops = vec![];

        let common_version = loop {
            let Some(MergePoint { v, mut is_in_a }) = queue.pop() else {
                break Frontier::root();
            };

            // Walked all the way down to the root on this side.
            if v.is_empty() {
                break Frontier::root();
            }

            // Coalesce duplicates. Reaching the same version from both sides
            // doesn't make it common yet - only the queue running dry does.
            while queue.peek().map_or(false, |peek| peek.v == v) {
                let dup = queue.pop().unwrap();
                is_in_a |= dup.is_in_a;
            }

            if queue.is_empty() {
                // Everything else descends from here: this is the common
                // version. Flip it back to ascending order.
                let mut cv = v;
                cv.reverse();
                break Frontier(cv);
            }

            if v.len() >= 2 {
                // A merged version; shatter it and revisit each head alone.
                for &lv in &v {
                    push_version(&mut queue, &[lv], is_in_a);
                }
            } else {
                let lv = v[0];
                if is_in_a {
                    shared_ops.push(lv);
                } else {
                    b_only_ops.push(lv);
                }
                push_version(&mut queue, self.op(lv).parents.as_ref(), is_in_a);
            }
        };

        shared_ops.reverse();
        b_only_ops.reverse();
        OpsToVisit { common_version, shared_ops, b_only_ops }
    }
}

#[cfg(test)]
mod tests {
    use crate::oplog::OpContents;

    use super::*;

    // Builds this graph (a diamond with an extra concurrent head):
    //
    //   0 - 1        4
    //   |\
    //   | 2
    //   |/
    //   3
    fn fancy_oplog() -> OpLog<char> {
        let mut oplog: OpLog<char> = OpLog::new();
        let c = |ch| OpContents::Ins(ch);
        oplog.push_remote_op(c('a'), 0, (1, 0), &[]).unwrap();
        oplog.push_remote_op(c('b'), 1, (1, 1), &[(1, 0)]).unwrap();
        oplog.push_remote_op(c('c'), 1, (2, 0), &[(1, 0)]).unwrap();
        oplog.push_remote_op(c('d'), 2, (1, 2), &[(1, 1), (2, 0)]).unwrap();
        oplog.push_remote_op(c('e'), 0, (3, 0), &[]).unwrap();
        oplog
    }

    fn assert_diff(oplog: &OpLog<char>, a: &[LV], b: &[LV], expect_a: &[LV], expect_b: &[LV]) {
        let (only_a, only_b) = oplog.diff(a, b);
        assert_eq!(only_a.as_slice(), expect_a);
        assert_eq!(only_b.as_slice(), expect_b);

        // Diff is antisymmetric.
        let (rev_b, rev_a) = oplog.diff(b, a);
        assert_eq!(rev_a.as_slice(), expect_a);
        assert_eq!(rev_b.as_slice(), expect_b);
    }

    #[test]
    fn diff_simple_cases() {
        let oplog = fancy_oplog();
        assert_diff(&oplog, &[], &[], &[], &[]);
        assert_diff(&oplog, &[1], &[1], &[], &[]);

        // Linear history: the newer side owns the difference.
        assert_diff(&oplog, &[1], &[0], &[1], &[]);
        assert_diff(&oplog, &[3], &[0], &[3, 2, 1], &[]);
        assert_diff(&oplog, &[], &[1], &[], &[1, 0]);
    }

    #[test]
    fn diff_concurrent_branches() {
        let oplog = fancy_oplog();
        // 1 and 2 are siblings; 0 is shared and excluded.
        assert_diff(&oplog, &[1], &[2], &[1], &[2]);
        // 4 shares nothing with the diamond.
        assert_diff(&oplog, &[3], &[4], &[3, 2, 1, 0], &[4]);
        // A merged frontier against one of its members.
        assert_diff(&oplog, &[1, 2], &[1], &[2], &[]);
    }

    #[test]
    fn find_ops_when_branch_is_behind() {
        let oplog = fancy_oplog();
        let visit = oplog.find_ops_to_visit(&[0], &[3]);
        assert_eq!(visit.common_version, Frontier::new_1(0));
        assert!(visit.shared_ops.is_empty());
        assert_eq!(visit.b_only_ops, &[1, 2, 3]);
    }

    #[test]
    fn find_ops_with_concurrent_branch() {
        let oplog = fancy_oplog();
        // The branch sits on 1; the merge target includes the sibling 2.
        let visit = oplog.find_ops_to_visit(&[1], &[1, 2]);
        assert_eq!(visit.common_version, Frontier::new_1(0));
        assert_eq!(visit.shared_ops, &[1]);
        assert_eq!(visit.b_only_ops, &[2]);
    }

    #[test]
    fn find_ops_from_root() {
        let oplog = fancy_oplog();
        let visit = oplog.find_ops_to_visit(&[], &[4]);
        assert_eq!(visit.common_version, Frontier::root());
        assert!(visit.shared_ops.is_empty());
        assert_eq!(visit.b_only_ops, &[4]);
    }

    #[test]
    fn find_ops_at_equal_versions() {
        let oplog = fancy_oplog();
        let visit = oplog.find_ops_to_visit(&[3], &[3]);
        assert_eq!(visit.common_version, Frontier::new_1(3));
        assert!(visit.shared_ops.is_empty());
        assert!(visit.b_only_ops.is_empty());
    }
}
