//! Well-formedness check of the block graph handed to interval construction.

use rustc_hash::FxHashSet;

use super::{IntervalError, IntervalResult};
use crate::{
    collections::storage::ArenaPtr,
    graph::{Block, CfgContext},
};

fn malformed(msg: String) -> IntervalError { IntervalError::MalformedGraph(msg) }

/// Check that every edge and controlling-block link of `blocks` resolves.
///
/// - Every block must live in `ctx`.
/// - Every predecessor and successor must be one of `blocks`, and each edge
///   must be recorded on both ends.
/// - A controlling-block link must point to a block flagged as controlling.
pub fn verify_blocks(ctx: &CfgContext, blocks: &[Block]) -> IntervalResult<()> {
    for &block in blocks {
        if block.try_deref(ctx).is_none() {
            return Err(malformed(format!("block #{} does not exist", block.id())));
        }
    }

    let members = blocks.iter().copied().collect::<FxHashSet<_>>();

    for &block in blocks {
        let name = block.name(ctx);

        for &succ in block.succs(ctx) {
            if !members.contains(&succ) {
                return Err(malformed(format!(
                    "successor #{} of {} is not part of the graph",
                    succ.id(),
                    name
                )));
            }
            if !succ.preds(ctx).contains(&block) {
                return Err(malformed(format!(
                    "edge {} -> {} is missing its predecessor entry",
                    name,
                    succ.name(ctx)
                )));
            }
        }

        for &pred in block.preds(ctx) {
            if !members.contains(&pred) {
                return Err(malformed(format!(
                    "predecessor #{} of {} is not part of the graph",
                    pred.id(),
                    name
                )));
            }
            if !pred.succs(ctx).contains(&block) {
                return Err(malformed(format!(
                    "edge {} -> {} is missing its successor entry",
                    pred.name(ctx),
                    name
                )));
            }
        }

        if let Some(control) = block.control(ctx) {
            match control.try_deref(ctx) {
                Some(_) if control.is_controlling(ctx) => {}
                Some(_) => {
                    return Err(malformed(format!(
                        "{} is guarded by {}, which is not a controlling block",
                        name,
                        control.name(ctx)
                    )))
                }
                None => {
                    return Err(malformed(format!(
                        "controlling block #{} of {} does not exist",
                        control.id(),
                        name
                    )))
                }
            }
        }
    }

    Ok(())
}
