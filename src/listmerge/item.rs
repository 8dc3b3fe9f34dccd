use crate::LV;

/// Identifies an item in the tracker. Most items belong to an insert
/// operation in the oplog. Incremental merges also seed the tracker with
/// placeholder items standing in for document content whose history isn't
/// being re-walked; those get their own key space rather than borrowing
/// unused LVs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ItemKey {
    Op(LV),
    Placeholder(usize),
}

/// 0 = not inserted yet, 1 = inserted, n >= 2 = deleted (n - 1) times.
/// Deletes from concurrent branches stack, so undoing one of them doesn't
/// resurrect the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct ItemState(u32);

pub(crate) const NOT_INSERTED_YET: ItemState = ItemState(0);
pub(crate) const INSERTED: ItemState = ItemState(1);

impl ItemState {
    /// The advance/retreat lists arrive in descending LV order, so a delete
    /// can step through an item before the matching insert has been advanced.
    /// The counter is commutative and only the settled value is ever read, so
    /// these transitions stay unchecked.
    pub fn advance(&mut self) {
        self.0 += 1;
    }

    pub fn retreat(&mut self) {
        debug_assert!(self.0 > 0, "retreating an item with no applied operations");
        self.0 -= 1;
    }

    pub fn is_inserted(&self) -> bool {
        *self == INSERTED
    }

    pub fn is_not_inserted_yet(&self) -> bool {
        *self == NOT_INSERTED_YET
    }
}

/// One entry per insert operation (plus placeholders), kept in document
/// order. `ever_deleted` is the tombstone: it never clears, and tracks
/// membership in the materialized snapshot. `state` tracks visibility at the
/// walker's current version, which moves back and forward through time.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CrdtItem {
    pub key: ItemKey,
    /// The item immediately to the author's left at insert time. None at the
    /// start of the document.
    pub origin_left: Option<ItemKey>,
    /// The first item at or right of the insert position which the author
    /// could see. None at the end of the document.
    pub origin_right: Option<ItemKey>,
    pub ever_deleted: bool,
    pub state: ItemState,
}

impl CrdtItem {
    pub fn placeholder(i: usize) -> Self {
        CrdtItem {
            key: ItemKey::Placeholder(i),
            origin_left: None,
            origin_right: None,
            ever_deleted: false,
            state: INSERTED,
        }
    }
}
