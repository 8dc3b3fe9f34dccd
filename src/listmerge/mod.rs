//! The merge engine. A [`Tracker`] is a transient "CRDT view" of the
//! document: one item per insert operation, held in Yjs / FugueMax document
//! order, each tagged with its visibility at the version the walker currently
//! sits at. Replaying operations one at a time - retreating and advancing
//! item states so each op is applied in its author's own causal context -
//! turns the positions recorded in the log back into positions in the
//! materialized snapshot.
//!
//! Trackers are built for a single checkout or merge and thrown away.

mod advance_retreat;
pub(crate) mod item;
mod merge;

use std::collections::HashMap;

use tracing::debug;

use crate::branch::Branch;
use crate::bxtree::BxTree;
use crate::frontier::Frontier;
use crate::listmerge::item::{CrdtItem, ItemKey};
use crate::oplog::OpLog;
use crate::LV;

pub(crate) struct Tracker<'a, T> {
    oplog: &'a OpLog<T>,

    /// Item storage. Items are never removed, so slots stay valid while
    /// `order` gets spliced.
    items: Vec<CrdtItem>,
    /// Slots into `items`, in document order.
    order: Vec<usize>,
    by_key: HashMap<ItemKey, usize>,
    /// Maps each delete op to the item it turned out to target.
    del_targets: HashMap<LV, ItemKey>,

    /// The version the item states currently describe.
    cur_version: Frontier,
}

impl<'a, T> Tracker<'a, T> {
    fn new(oplog: &'a OpLog<T>) -> Self {
        Self {
            oplog,
            items: vec![],
            order: vec![],
            by_key: HashMap::new(),
            del_targets: HashMap::new(),
            cur_version: Frontier::root(),
        }
    }

    /// A tracker for an incremental merge. The items of every operation at or
    /// below the branch's version aren't being re-walked; `placeholder_count`
    /// inserted placeholders stand in for them, so positions and origin
    /// anchors stay resolvable. (Placeholders are positional stand-ins - it
    /// never matters which op a given one corresponds to.)
    fn new_at(oplog: &'a OpLog<T>, common_version: Frontier, placeholder_count: usize) -> Self {
        let mut tracker = Self::new(oplog);
        tracker.cur_version = common_version;

        tracker.items.reserve(placeholder_count);
        tracker.order.reserve(placeholder_count);
        for i in 0..placeholder_count {
            let item = CrdtItem::placeholder(i);
            tracker.items.push(item);
            tracker.order.push(i);
            tracker.by_key.insert(item.key, i);
        }
        tracker
    }

    fn item_at(&self, idx: usize) -> &CrdtItem {
        &self.items[self.order[idx]]
    }

    /// Position of the item with this key in the document order list.
    fn index_of_key(&self, key: ItemKey) -> usize {
        self.order
            .iter()
            .position(|&slot| self.items[slot].key == key)
            .unwrap_or_else(|| panic!("item {:?} missing from tracker", key))
    }
}

impl<'a, T: Copy + Default> Tracker<'a, T> {
    /// Replay one operation: move the walker's version to the op's parents
    /// (rolling item states back and forward as needed), apply it, and adopt
    /// the op itself as the current version.
    pub(crate) fn apply_op_at(&mut self, lv: LV, snapshot: Option<&mut BxTree<T>>) {
        let (only_ours, only_theirs) = self
            .oplog
            .diff(self.cur_version.as_ref(), self.oplog.op(lv).parents.as_ref());

        for &r in &only_ours {
            self.retreat_op(r);
        }
        for &r in &only_theirs {
            self.advance_op(r);
        }

        self.apply(lv, snapshot);
        self.cur_version.replace_with_1(lv);
    }
}

/// Materialize a snapshot by replaying the whole oplog from scratch.
pub(crate) fn checkout<T: Copy + Default>(oplog: &OpLog<T>) -> BxTree<T> {
    let mut tracker = Tracker::new(oplog);
    let mut content = BxTree::new();
    for lv in 0..oplog.len() {
        tracker.apply_op_at(lv, Some(&mut content));
    }
    content
}

/// Incrementally advance `branch` to `merge_frontier`, only re-walking the
/// part of the graph that's concurrent with the operations the branch is
/// missing.
pub(crate) fn checkout_fancy<T: Copy + Default>(
    oplog: &OpLog<T>,
    branch: &mut Branch<T>,
    merge_frontier: &[LV],
) {
    let visit = oplog.find_ops_to_visit(branch.version.as_ref(), merge_frontier);
    debug!(
        shared = visit.shared_ops.len(),
        new = visit.b_only_ops.len(),
        "incremental checkout"
    );

    // The frontier is sorted, so its max is its last element.
    let placeholder_count = branch.version.last().map_or(0, |&max| max + 1);
    let mut tracker = Tracker::new_at(oplog, visit.common_version, placeholder_count);

    // Ops the branch has already applied: rebuild walker state only.
    for lv in visit.shared_ops {
        tracker.apply_op_at(lv, None);
    }

    // Ops the branch is missing: apply to the snapshot too.
    for lv in visit.b_only_ops {
        tracker.apply_op_at(lv, Some(&mut branch.content));
        branch.version.advance(lv, oplog.op(lv).parents.as_ref());
    }
}
