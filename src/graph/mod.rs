//! # Graph Node Model
//!
//! Basic blocks and register intervals live in a single [CfgContext], which
//! owns one arena per node kind. All edges, interval memberships and
//! controlling-block links are arena handles, so the graph may contain cycles
//! and nodes may be split without invalidating existing references.

mod block;
mod interval;

pub use block::{Block, BlockData};
pub use interval::{Interval, IntervalData};

use crate::collections::storage::BaseArena;

#[derive(Default)]
pub struct CfgContext {
    blocks: BaseArena<BlockData>,
    intervals: BaseArena<IntervalData>,
}

impl CfgContext {
    pub fn new() -> Self { Self::default() }

    /// The number of blocks ever created, controlling blocks and split
    /// fragments included.
    pub fn num_blocks(&self) -> usize { self.blocks.len() }

    /// Look up a block by name, in creation order.
    pub fn block_by_name(&self, name: &str) -> Option<Block> {
        self.blocks
            .iter()
            .map(|(ptr, _)| Block(ptr))
            .find(|block| block.name(self) == name)
    }
}
