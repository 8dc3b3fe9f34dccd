//! The document façade: an oplog, a live branch, and the agent id used for
//! local edits.

use tracing::debug;

use crate::branch::Branch;
use crate::oplog::{OpContents, OpLog, RemoteOpError};
use crate::AgentId;

#[derive(Debug, Clone)]
pub struct ListCRDT {
    pub oplog: OpLog<char>,
    pub branch: Branch<char>,
    pub agent: AgentId,
}

impl ListCRDT {
    /// Agent ids must be unique across every replica that will ever merge
    /// with this one.
    pub fn new(agent: AgentId) -> Self {
        Self {
            oplog: OpLog::new(),
            branch: Branch::new(),
            agent,
        }
    }

    pub fn len(&self) -> usize {
        self.branch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branch.is_empty()
    }

    /// Type `content` at `pos`. One op is logged per character; the snapshot
    /// is spliced directly since local edits always apply at the head.
    pub fn local_insert(&mut self, pos: usize, content: &str) {
        assert!(pos <= self.branch.len(), "insert position out of range");

        let mut pos = pos;
        for c in content.chars() {
            self.oplog.push_local_op(self.agent, OpContents::Ins(c), pos);
            self.branch
                .content
                .insert_at(pos, c)
                .expect("snapshot diverged from oplog");
            pos += 1;
        }
        self.branch.version = self.oplog.frontier.clone();
    }

    /// Delete `del_len` characters starting at `pos`. Each logged delete
    /// names the same position, because the deletes before it have already
    /// shifted the rest of the range down.
    pub fn local_delete(&mut self, pos: usize, del_len: usize) {
        assert!(pos + del_len <= self.branch.len(), "delete range out of range");

        for _ in 0..del_len {
            self.oplog.push_local_op(self.agent, OpContents::Del, pos);
            self.branch
                .content
                .delete_at(pos)
                .expect("snapshot diverged from oplog");
        }
        self.branch.version = self.oplog.frontier.clone();
    }

    /// Absorb everything `other` knows that we don't, then replay the new
    /// operations into our snapshot.
    pub fn merge_from(&mut self, other: &ListCRDT) -> Result<(), RemoteOpError> {
        let merged = other.oplog.replicate_into(&mut self.oplog)?;
        debug!(merged, from = other.agent, to = self.agent, "merged remote ops");
        self.oplog.merge_all(&mut self.branch);
        Ok(())
    }

    pub fn content_string(&self) -> String {
        self.branch.content.iter().collect()
    }

    /// Re-derive the document from scratch and compare it with the
    /// incrementally maintained snapshot. Panics on divergence - this is the
    /// big hammer the fuzzers swing after every merge.
    pub fn check(&self) {
        self.oplog.dbg_check();
        self.branch.content.dbg_check();

        let expected = self.oplog.checkout().to_vec();
        let actual = self.branch.content.to_vec();
        assert_eq!(expected, actual, "branch snapshot diverged from a full checkout");
    }

    /// Drop all state, keeping only the agent id.
    pub fn reset(&mut self) {
        self.oplog = OpLog::new();
        self.branch = Branch::new();
    }
}
