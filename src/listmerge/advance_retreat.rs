//! Time travel for the walker's current version. Retreating an operation
//! rolls its effect on the target item's visibility state back out;
//! advancing re-applies it. Neither touches the snapshot - tombstoned items
//! stay tombstoned, only the "visible at the walker's version" counter moves.

use crate::listmerge::item::ItemKey;
use crate::listmerge::Tracker;
use crate::oplog::ListOpKind;
use crate::LV;

impl<'a, T> Tracker<'a, T> {
    /// Which item does this (already applied) operation affect?
    fn target_of(&self, lv: LV, kind: ListOpKind) -> ItemKey {
        match kind {
            ListOpKind::Ins => ItemKey::Op(lv),
            ListOpKind::Del => *self
                .del_targets
                .get(&lv)
                .unwrap_or_else(|| panic!("delete op {} was never applied", lv)),
        }
    }

    pub(super) fn retreat_op(&mut self, lv: LV) {
        let kind = self.oplog.op(lv).contents.kind();
        let key = self.target_of(lv, kind);
        let slot = self.by_key[&key];
        self.items[slot].state.retreat();
    }

    pub(super) fn advance_op(&mut self, lv: LV) {
        let kind = self.oplog.op(lv).contents.kind();
        let key = self.target_of(lv, kind);
        let slot = self.by_key[&key];
        self.items[slot].state.advance();
    }
}
