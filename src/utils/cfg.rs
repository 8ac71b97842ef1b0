use std::hash::Hash;

use crate::collections::storage::ArenaPtr;

/// A node in a control flow graph.
///
/// Both basic blocks and register intervals are nodes: the interval-level
/// graph produced by one pass is the input graph of the next.
pub trait CfgNode: ArenaPtr + Hash {
    /// The dense index of the node inside its arena.
    fn index(self) -> usize;

    /// Get the predecessors of the node.
    fn preds(self, arena: &Self::A) -> &[Self];

    /// Get the successors of the node.
    fn succs(self, arena: &Self::A) -> &[Self];
}
