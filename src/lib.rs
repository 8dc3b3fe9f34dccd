//! An event graph walker ("eg-walker") list CRDT.
//!
//! The oplog stores an append-only causal DAG of insert / delete operations.
//! Replicas exchange operations in any order; a transient tracker re-walks the
//! affected span of the graph and replays concurrent edits using
//! Yjs / FugueMax origin based ordering, so every replica converges on an
//! identical document snapshot.
//!
//! Snapshots are stored in [`BxTree`], an order-statistics B+ tree indexed by
//! character position.

pub mod frontier;
pub mod pheap;
pub mod bxtree;
pub mod oplog;
pub mod branch;
pub mod list;
pub mod list_fuzzer_tools;

mod diff;
mod listmerge;

/// A local version: the index of an operation in this replica's oplog. Stable
/// for the lifetime of the log, but not meaningful on other replicas.
pub type LV = usize;

/// Agents are identified by plain integers. These must be unique across the
/// replica set - concurrent inserts with identical origins are ordered by
/// comparing agent ids.
pub type AgentId = u32;

/// The globally unique (agent, seq) pair naming an operation. Sequence
/// numbers count up contiguously from 0 for each agent.
pub type AgentVersion = (AgentId, usize);

pub use branch::Branch;
pub use bxtree::{BxTree, TreeError};
pub use frontier::Frontier;
pub use list::ListCRDT;
pub use oplog::{ListOpKind, Op, OpContents, OpLog, RemoteOpError};
pub use pheap::PairingHeap;
