//! Block splitting.
//!
//! A block is scanned statement by statement while a running register set is
//! accumulated. The first statement that would bring the set up to the budget
//! starts a new block, which takes over the successors of the original block.

use log::trace;

use crate::{
    graph::{Block, CfgContext},
    regs::RegSet,
};

/// Find the index of the first instruction that cannot join the running
/// register set, together with the set accumulated before it.
///
/// The first instruction is never a split point.
fn find_split_point(ctx: &CfgContext, block: Block, budget: usize) -> (Option<usize>, RegSet) {
    let mut running = RegSet::new();

    for (idx, inst) in block.insts(ctx).iter().enumerate() {
        let fresh = inst
            .regs()
            .filter(|reg| !running.contains(reg))
            .collect::<RegSet>();

        if idx > 0 && running.len() + fresh.len() >= budget {
            return (Some(idx), running);
        }
        running.extend(fresh);
    }

    (None, running)
}

/// Split `block` once if its register footprint reaches `budget`.
///
/// Without a split, the output set of the block is committed to the registers
/// of all its instructions and `None` is returned. Otherwise the block keeps
/// the instructions before the split point and the returned tail block holds
/// the rest, with:
///
/// - branch targets naming the original block renamed to the tail;
/// - the successors of the original block, whose predecessor entries are
///   redirected to the tail;
/// - the original block as its only predecessor;
/// - the controlling-block link and the exit flag of the original block.
///
/// The tail is not assigned to any interval and may itself need splitting.
pub fn split_block(ctx: &mut CfgContext, block: Block, budget: usize) -> Option<Block> {
    let (split_at, running) = find_split_point(ctx, block, budget);
    block.set_outputs(ctx, running);

    let at = split_at?;
    let moved = block.split_off_insts(ctx, at);
    let tail = Block::new_fragment(ctx, block, moved);

    let old_name = block.name(ctx).to_string();
    let new_name = tail.name(ctx).to_string();
    if tail.rename_label(ctx, &old_name, &new_name) > 0 {
        // the operands changed, but the register set did not
        trace!("renamed branch targets {} -> {}", old_name, new_name);
    }

    let succs = block.succs(ctx).to_vec();
    for &succ in succs.iter() {
        succ.replace_pred(ctx, block, tail);
    }
    tail.set_succs(ctx, succs);
    tail.set_preds(ctx, vec![block]);
    block.set_succs(ctx, vec![tail]);

    tail.set_control(ctx, block.control(ctx));
    block.set_control(ctx, None);
    tail.set_exit(ctx, block.is_exit(ctx));
    block.set_exit(ctx, false);

    trace!(
        "split {} at instruction {}: {} registers stay, {} takes {}",
        old_name,
        at,
        block.num_regs(ctx),
        new_name,
        tail.num_regs(ctx),
    );

    Some(tail)
}
