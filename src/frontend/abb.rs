//! # Abstract Block Splitting
//!
//! An abstract block of `nvdisasm` may leave through several exits, one record
//! port each. Every port becomes a segment of instructions:
//!
//! - A segment made of a single predicated instruction only evaluates the
//!   condition of a branch. It becomes a *controlling block* linked from the
//!   basic block before it, and is not part of the control flow graph.
//! - Any other non-empty segment becomes a basic block, named after the
//!   abstract block (`.L_1`, `.L_1A`, ..., `.L_1Z`, then `.L_1_26`, ...).
//!   The basic blocks of one abstract block are chained in port order.
//!
//! Graphviz edges then connect the basic block owning the source port to the
//! first basic block of the target.

use log::{debug, trace};
use rustc_hash::FxHashMap;

use super::{
    dot::{DotGraph, DotNode},
    ParseError,
    ParseResult,
};
use crate::{
    graph::{Block, CfgContext},
    inst::{self, Inst},
};

/// The name prefix of controlling blocks.
pub const CONTROLLING_PREFIX: &str = "Controlling_basicBlock";

const ENTRY_PORT: &str = "entry";

/// The basic blocks carved out of one abstract block.
struct Carved {
    blocks: Vec<Block>,
    /// The block each port hands control from.
    owners: FxHashMap<String, Block>,
}

fn is_controlling_segment(insts: &[Inst]) -> bool {
    matches!(insts, [inst] if inst.is_predicated() && inst.opcode() != "EXIT")
}

fn is_exit_segment(insts: &[Inst]) -> bool { insts.iter().any(|inst| inst.opcode() == "EXIT") }

fn block_name(base: &str, nth: usize) -> String {
    match nth {
        0 => base.to_string(),
        // A..Z, then `_`-separated numbers
        1..=26 => format!("{}{}", base, (b'A' + (nth - 1) as u8) as char),
        _ => format!("{}_{}", base, nth - 1),
    }
}

struct Builder {
    num_controlling: usize,
}

impl Builder {
    fn carve(&mut self, ctx: &mut CfgContext, group: usize, node: &DotNode) -> ParseResult<Carved> {
        let mut blocks: Vec<Block> = Vec::new();
        let mut owners = FxHashMap::default();
        // ports of empty segments before the first block
        let mut pending = Vec::new();

        for port in node.ports.iter() {
            let insts = inst::parse_statements(&port.text).map_err(|source| ParseError::Inst {
                node: node.name.clone(),
                source,
            })?;

            let owner = if insts.is_empty() {
                blocks.last().copied()
            } else if let (true, Some(&controlled)) = (is_controlling_segment(&insts), blocks.last()) {
                let name = format!("{}{}", CONTROLLING_PREFIX, self.num_controlling);
                self.num_controlling += 1;
                let control = Block::new_controlling(ctx, name, insts);
                control.set_group(ctx, group);
                controlled.set_control(ctx, Some(control));

                trace!(
                    "{} guards the branch at the end of {}",
                    control.name(ctx),
                    controlled.name(ctx)
                );
                Some(controlled)
            } else {
                let exit = is_exit_segment(&insts);
                let block = Block::new(ctx, block_name(&node.name, blocks.len()), insts);
                block.set_group(ctx, group);
                block.set_exit(ctx, exit);
                if let Some(&prev) = blocks.last() {
                    prev.add_edge(ctx, block);
                }
                blocks.push(block);
                Some(block)
            };

            match (owner, &port.name) {
                (Some(owner), Some(name)) => {
                    for port_name in pending.drain(..) {
                        owners.insert(port_name, owner);
                    }
                    owners.insert(name.clone(), owner);
                }
                (Some(owner), None) => {
                    for port_name in pending.drain(..) {
                        owners.insert(port_name, owner);
                    }
                }
                (None, Some(name)) => pending.push(name.clone()),
                (None, None) => {}
            }
        }

        if blocks.is_empty() {
            // keep the node in the graph even without instructions
            let block = Block::new(ctx, block_name(&node.name, 0), Vec::new());
            block.set_group(ctx, group);
            blocks.push(block);
        }
        let first = blocks[0];
        for port_name in pending {
            owners.insert(port_name, first);
        }

        Ok(Carved { blocks, owners })
    }
}

/// Build the basic blocks of `graph` in `ctx`.
///
/// Returns the basic blocks in creation order, controlling blocks excluded.
pub fn build(ctx: &mut CfgContext, graph: &DotGraph) -> ParseResult<Vec<Block>> {
    let mut builder = Builder { num_controlling: 0 };
    let mut carved = Vec::with_capacity(graph.nodes.len());
    let mut index = FxHashMap::default();

    for (group, node) in graph.nodes.iter().enumerate() {
        carved.push(builder.carve(ctx, group, node)?);
        index.insert(node.name.as_str(), group);
    }

    for edge in graph.edges.iter() {
        let unknown = || ParseError::UnknownNode {
            from: edge.from.clone(),
            to: edge.to.clone(),
        };
        let from = *index.get(edge.from.as_str()).ok_or_else(unknown)?;
        let to = *index.get(edge.to.as_str()).ok_or_else(unknown)?;

        let source = &carved[from];
        let owner = match edge.port.as_deref() {
            None | Some(ENTRY_PORT) => source.blocks.last().copied(),
            Some(port) => source.owners.get(port).copied(),
        }
        .ok_or_else(|| ParseError::UnknownPort {
            node: edge.from.clone(),
            port: edge.port.clone().unwrap_or_default(),
        })?;

        let target = carved[to].blocks[0];
        owner.add_edge(ctx, target);
    }

    let blocks = carved
        .into_iter()
        .flat_map(|carved| carved.blocks)
        .collect::<Vec<_>>();

    debug!(
        "{} abstract blocks into {} basic blocks and {} controlling blocks",
        graph.nodes.len(),
        blocks.len(),
        builder.num_controlling
    );

    Ok(blocks)
}
