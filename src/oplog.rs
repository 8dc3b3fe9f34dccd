use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use smallvec::SmallVec;
use tracing::trace;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::branch::Branch;
use crate::bxtree::BxTree;
use crate::frontier::Frontier;
use crate::listmerge;
use crate::{AgentId, AgentVersion, LV};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ListOpKind {
    Ins,
    Del,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OpContents<T> {
    Ins(T),
    Del,
}

impl<T> OpContents<T> {
    pub fn kind(&self) -> ListOpKind {
        match self {
            OpContents::Ins(_) => ListOpKind::Ins,
            OpContents::Del => ListOpKind::Del,
        }
    }
}

/// A single operation in the log.
///
/// `pos` is the position in the author's visible document at the moment the
/// op was created. For remote operations it only becomes meaningful again
/// once the merge walker has rebuilt the author's context.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Op<T> {
    pub contents: OpContents<T>,
    pub pos: usize,
    pub id: AgentVersion,
    pub parents: Frontier,
}

/// Errors from ingesting operations authored on another replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOpError {
    /// A parent id named an operation we haven't seen. The peer sent its ops
    /// out of causal order.
    UnknownParent(AgentVersion),
    /// An agent's sequence numbers must arrive contiguously; a gap means
    /// messages were lost upstream.
    NonContiguousSeq {
        agent: AgentId,
        expected: usize,
        actual: usize,
    },
}

impl Display for RemoteOpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteOpError::UnknownParent((agent, seq)) => {
                write!(f, "unknown parent operation ({agent}, {seq})")
            }
            RemoteOpError::NonContiguousSeq { agent, expected, actual } => {
                write!(f, "non-contiguous seq for agent {agent}: expected {expected}, got {actual}")
            }
        }
    }
}

impl std::error::Error for RemoteOpError {}

#[derive(Debug, Clone, Default)]
struct ClientData {
    /// This agent's operations, indexed by seq. Since seqs are assigned
    /// contiguously this doubles as the version vector entry
    /// (`item_times.len()` is the next expected seq) and gives O(1)
    /// id -> LV resolution when ingesting remote ops.
    item_times: Vec<LV>,
}

#[derive(Debug, Clone)]
pub struct OpLog<T> {
    pub(crate) ops: Vec<Op<T>>,
    /// The current heads of the causal graph: every op we know about is an
    /// ancestor of (or member of) this set.
    pub frontier: Frontier,
    client_data: HashMap<AgentId, ClientData>,
}

impl<T> Default for OpLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OpLog<T> {
    pub fn new() -> Self {
        Self {
            ops: vec![],
            frontier: Frontier::root(),
            client_data: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub(crate) fn op(&self, lv: LV) -> &Op<T> {
        &self.ops[lv]
    }

    fn next_seq_for(&self, agent: AgentId) -> usize {
        self.client_data.get(&agent).map_or(0, |c| c.item_times.len())
    }

    pub fn agent_version_to_lv(&self, (agent, seq): AgentVersion) -> Option<LV> {
        self.client_data.get(&agent).and_then(|c| c.item_times.get(seq)).copied()
    }

    pub fn lv_to_agent_version(&self, lv: LV) -> AgentVersion {
        self.ops[lv].id
    }

    /// Append an operation authored on this replica. Its parents are the
    /// current frontier, and it becomes the sole new head.
    pub fn push_local_op(&mut self, agent: AgentId, contents: OpContents<T>, pos: usize) -> LV {
        let seq = self.next_seq_for(agent);
        let lv = self.ops.len();
        let parents = self.frontier.clone();

        self.ops.push(Op { contents, pos, id: (agent, seq), parents });
        self.client_data.entry(agent).or_default().item_times.push(lv);
        self.frontier.replace_with_1(lv);
        lv
    }

    /// Ingest an operation from another replica. Parents are named by
    /// (agent, seq) id, since LVs don't travel between replicas.
    ///
    /// Returns Ok(None) if we already have this operation - redelivery is
    /// simply dropped, which is what makes merging idempotent.
    pub fn push_remote_op(
        &mut self,
        contents: OpContents<T>,
        pos: usize,
        id: AgentVersion,
        parent_ids: &[AgentVersion],
    ) -> Result<Option<LV>, RemoteOpError> {
        let (agent, seq) = id;
        let next_seq = self.next_seq_for(agent);
        if seq < next_seq {
            trace!(agent, seq, "dropping remote op we already have");
            return Ok(None);
        }
        if seq != next_seq {
            return Err(RemoteOpError::NonContiguousSeq { agent, expected: next_seq, actual: seq });
        }

        let mut parents: SmallVec<[LV; 2]> = SmallVec::with_capacity(parent_ids.len());
        for &pid in parent_ids {
            let p = self
                .agent_version_to_lv(pid)
                .ok_or(RemoteOpError::UnknownParent(pid))?;
            parents.push(p);
        }
        parents.sort_unstable();
        let parents = Frontier(parents);

        let lv = self.ops.len();
        self.ops.push(Op { contents, pos, id, parents: parents.clone() });
        self.client_data.entry(agent).or_default().item_times.push(lv);
        self.frontier.advance(lv, parents.as_ref());
        Ok(Some(lv))
    }

    /// Deep consistency check, for tests and fuzzers.
    #[allow(unused)]
    pub fn dbg_check(&self) {
        let mut is_parent = vec![false; self.ops.len()];
        for (lv, op) in self.ops.iter().enumerate() {
            op.parents.debug_check_sorted();
            for &p in op.parents.as_ref() {
                assert!(p < lv, "parents must precede their children in the log");
                is_parent[p] = true;
            }

            let (agent, seq) = op.id;
            assert_eq!(self.client_data[&agent].item_times[seq], lv);
        }

        let heads: Vec<LV> = (0..self.ops.len()).filter(|&lv| !is_parent[lv]).collect();
        assert_eq!(self.frontier.as_ref(), heads.as_slice());

        for (agent, client) in &self.client_data {
            for (seq, &lv) in client.item_times.iter().enumerate() {
                assert_eq!(self.ops[lv].id, (*agent, seq));
            }
        }
    }
}

impl<T: Clone> OpLog<T> {
    /// Copy every operation this log knows into `dest`, translating parent
    /// ids on the way. Ops dest already has are dropped; iterating in log
    /// order guarantees parents land before their children.
    ///
    /// Returns the number of operations dest was actually missing.
    pub fn replicate_into(&self, dest: &mut OpLog<T>) -> Result<usize, RemoteOpError> {
        let mut merged = 0;
        for op in &self.ops {
            let parent_ids: SmallVec<[AgentVersion; 2]> =
                op.parents.iter().map(|&p| self.ops[p].id).collect();
            if dest
                .push_remote_op(op.contents.clone(), op.pos, op.id, &parent_ids)?
                .is_some()
            {
                merged += 1;
            }
        }
        Ok(merged)
    }
}

impl<T: Copy + Default> OpLog<T> {
    /// Materialize the document at the log's current frontier by replaying
    /// the whole graph from scratch. Slow; mostly useful for checking that
    /// the incremental path produced the right answer.
    pub fn checkout(&self) -> BxTree<T> {
        listmerge::checkout(self)
    }

    /// Bring a branch up to date with everything in the log.
    pub fn merge_all(&self, branch: &mut Branch<T>) {
        self.merge_to_version(branch, &self.frontier.clone());
    }

    /// Advance a branch to the named version, replaying only the operations
    /// the branch hasn't seen.
    pub fn merge_to_version(&self, branch: &mut Branch<T>, merge_frontier: &[LV]) {
        listmerge::checkout_fancy(self, branch, merge_frontier);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ins(c: char) -> OpContents<char> {
        OpContents::Ins(c)
    }

    #[test]
    fn local_ops_advance_linearly() {
        let mut oplog: OpLog<char> = OpLog::new();
        let a = oplog.push_local_op(1, ins('h'), 0);
        let b = oplog.push_local_op(1, ins('i'), 1);
        assert_eq!((a, b), (0, 1));

        assert_eq!(oplog.ops[0].id, (1, 0));
        assert_eq!(oplog.ops[1].id, (1, 1));
        assert_eq!(oplog.ops[1].parents.as_ref(), &[0]);
        assert_eq!(oplog.frontier.as_ref(), &[1]);
        oplog.dbg_check();
    }

    #[test]
    fn remote_ops_translate_parents() {
        let mut a: OpLog<char> = OpLog::new();
        a.push_local_op(1, ins('x'), 0);
        a.push_local_op(1, ins('y'), 1);

        let mut b: OpLog<char> = OpLog::new();
        b.push_local_op(2, ins('z'), 0);

        // Merging a into b: a's ops land at different LVs but keep their ids.
        assert_eq!(a.replicate_into(&mut b).unwrap(), 2);
        assert_eq!(b.len(), 3);
        assert_eq!(b.agent_version_to_lv((1, 0)), Some(1));
        assert_eq!(b.agent_version_to_lv((1, 1)), Some(2));
        assert_eq!(b.ops[2].parents.as_ref(), &[1]);
        // Concurrent heads from both agents.
        assert_eq!(b.frontier.as_ref(), &[0, 2]);
        b.dbg_check();
    }

    #[test]
    fn redelivered_ops_are_dropped() {
        let mut a: OpLog<char> = OpLog::new();
        a.push_local_op(1, ins('x'), 0);

        let mut b: OpLog<char> = OpLog::new();
        assert_eq!(a.replicate_into(&mut b).unwrap(), 1);
        assert_eq!(a.replicate_into(&mut b).unwrap(), 0);
        assert_eq!(b.len(), 1);
        b.dbg_check();
    }

    #[test]
    fn seq_gaps_are_fatal() {
        let mut oplog: OpLog<char> = OpLog::new();
        let err = oplog.push_remote_op(ins('x'), 0, (1, 5), &[]).unwrap_err();
        assert_eq!(err, RemoteOpError::NonContiguousSeq { agent: 1, expected: 0, actual: 5 });
    }

    #[test]
    fn unknown_parents_are_fatal() {
        let mut oplog: OpLog<char> = OpLog::new();
        let err = oplog.push_remote_op(ins('x'), 0, (1, 0), &[(7, 0)]).unwrap_err();
        assert_eq!(err, RemoteOpError::UnknownParent((7, 0)));
    }
}
