//! Applying operations to the tracker: position resolution and the
//! Yjs / FugueMax concurrent-insert ordering.

use crate::bxtree::BxTree;
use crate::listmerge::item::{CrdtItem, ItemKey, INSERTED};
use crate::listmerge::Tracker;
use crate::oplog::OpContents;
use crate::{AgentId, LV};

impl<'a, T: Copy + Default> Tracker<'a, T> {
    /// Resolve a position in the walker's current document into the item
    /// list. Two counters run side by side: `cur_pos` counts items visible at
    /// the walker's version (these are what the op's author was counting),
    /// and `end_pos` counts items present in the materialized snapshot
    /// (everything not tombstoned, whatever its visibility right now).
    ///
    /// Returns (index into the item order, snapshot position).
    fn find_by_current_pos(&self, target_pos: usize) -> (usize, usize) {
        let mut cur_pos = 0;
        let mut end_pos = 0;
        let mut idx = 0;

        while cur_pos < target_pos {
            assert!(idx < self.order.len(), "walked past the end of the item list");
            let item = self.item_at(idx);
            if item.state.is_inserted() {
                cur_pos += 1;
            }
            if !item.ever_deleted {
                end_pos += 1;
            }
            idx += 1;
        }
        (idx, end_pos)
    }

    fn agent_of(&self, key: ItemKey) -> AgentId {
        match key {
            ItemKey::Op(lv) => self.oplog.op(lv).id.0,
            // Placeholders stand for fully-merged history, so they can never
            // be concurrent with an insert we're ordering.
            ItemKey::Placeholder(_) => unreachable!("placeholder in concurrency scan"),
        }
    }

    pub(super) fn apply(&mut self, lv: LV, snapshot: Option<&mut BxTree<T>>) {
        let op = self.oplog.op(lv);
        let (contents, pos) = (op.contents, op.pos);
        match contents {
            OpContents::Del => {
                let (mut idx, mut end_pos) = self.find_by_current_pos(pos);

                // The counted position lands on the first visible item at or
                // after it. Anything invisible at the walker's version
                // (tombstoned, or concurrent and not inserted yet) is skipped
                // over, but still counts toward the snapshot position if it
                // hasn't been tombstoned.
                while !self.item_at(idx).state.is_inserted() {
                    if !self.item_at(idx).ever_deleted {
                        end_pos += 1;
                    }
                    idx += 1;
                }

                let slot = self.order[idx];
                let item = &mut self.items[slot];
                let newly_deleted = !item.ever_deleted;
                item.ever_deleted = true;
                item.state.advance();
                self.del_targets.insert(lv, item.key);

                // A concurrent delete already removed it from the snapshot.
                if newly_deleted {
                    if let Some(content) = snapshot {
                        content
                            .delete_at(end_pos)
                            .expect("snapshot diverged from tracker");
                    }
                }
            }
            OpContents::Ins(value) => {
                let (idx, end_pos) = self.find_by_current_pos(pos);
                debug_assert!(idx == 0 || self.item_at(idx - 1).state.is_inserted());

                let origin_left = if idx > 0 { Some(self.item_at(idx - 1).key) } else { None };
                // The author could see everything that isn't in the
                // not-inserted-yet state - including items they'd deleted.
                let origin_right = self.order[idx..]
                    .iter()
                    .map(|&slot| &self.items[slot])
                    .find(|item| !item.state.is_not_inserted_yet())
                    .map(|item| item.key);

                let item = CrdtItem {
                    key: ItemKey::Op(lv),
                    origin_left,
                    origin_right,
                    ever_deleted: false,
                    state: INSERTED,
                };
                let slot = self.items.len();
                self.items.push(item);
                self.by_key.insert(item.key, slot);

                self.integrate(slot, idx, end_pos, value, snapshot);
            }
        }
    }

    /// Slot the new item in amongst its concurrent siblings. Anything between
    /// the insert position and the item's right origin which is still
    /// not-inserted-yet was inserted concurrently; the FugueMax rules decide
    /// who goes first, comparing origins by their list positions and breaking
    /// exact ties by agent id.
    fn integrate(
        &mut self,
        new_slot: usize,
        mut idx: usize,
        mut end_pos: usize,
        value: T,
        snapshot: Option<&mut BxTree<T>>,
    ) {
        let new_item = self.items[new_slot];
        let left = idx as isize - 1;
        let right = match new_item.origin_right {
            Some(key) => self.index_of_key(key),
            None => self.order.len(),
        };

        let mut scanning = false;
        let mut scan_idx = idx;
        let mut scan_end_pos = end_pos;

        while scan_idx < right {
            let other = *self.item_at(scan_idx);
            if !other.state.is_not_inserted_yet() {
                break;
            }

            let o_left = match other.origin_left {
                Some(key) => self.index_of_key(key) as isize,
                None => -1,
            };
            let o_right = match other.origin_right {
                Some(key) => self.index_of_key(key),
                None => self.order.len(),
            };

            if o_left < left {
                // The other item anchors further left; we come first.
                break;
            }
            if o_left == left {
                if o_right == right {
                    // Identical origins: a true tie, broken by agent id.
                    if self.agent_of(new_item.key) < self.agent_of(other.key) {
                        break;
                    }
                    scanning = false;
                } else {
                    // Items with an earlier right origin sort before us, but
                    // we may still belong before whatever follows them.
                    scanning = o_right < right;
                }
            }

            if !other.ever_deleted {
                scan_end_pos += 1;
            }
            scan_idx += 1;

            if !scanning {
                idx = scan_idx;
                end_pos = scan_end_pos;
            }
        }

        self.order.insert(idx, new_slot);
        if let Some(content) = snapshot {
            content
                .insert_at(end_pos, value)
                .expect("snapshot diverged from tracker");
        }
    }
}
