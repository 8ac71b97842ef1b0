//! # Pass One: Interval Construction
//!
//! Groups basic blocks into single-entry intervals whose register footprint
//! stays under the budget.
//!
//! Every block without predecessors opens an interval and is put on a FIFO
//! worklist. Popping a block:
//!
//! 1. splits the block if it alone reaches the budget, the tail opens a new
//!    interval;
//! 2. grows the interval of the block: a block joins when all its direct
//!    predecessors are members, and its registers together with those of its
//!    member ancestors (and of the whole interval) stay under the budget;
//! 3. opens a new interval for every unassigned successor of the members.
//!
//! Intervals are finalized once the worklist drains.

use std::collections::VecDeque;

use log::{debug, trace};

use super::{finalize, split::split_block, verify::verify_blocks, IntervalError, IntervalResult};
use crate::{
    graph::{Block, CfgContext, Interval},
    regs::{self, RegSet},
    utils::marks::AncestorMarks,
};

/// The result of interval construction.
pub struct IntervalGraph {
    /// The blocks of the program, split fragments appended in creation order.
    pub blocks: Vec<Block>,
    /// The intervals in creation order.
    pub intervals: Vec<Interval>,
}

pub struct IntervalConstruction {
    budget: usize,
    blocks: Vec<Block>,
    intervals: Vec<Interval>,
    worklist: VecDeque<Block>,
    marks: AncestorMarks<Block>,
}

impl IntervalConstruction {
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            blocks: Vec::new(),
            intervals: Vec::new(),
            worklist: VecDeque::new(),
            marks: AncestorMarks::default(),
        }
    }

    pub fn budget(&self) -> usize { self.budget }

    /// Partition `blocks` into intervals.
    ///
    /// Blocks may be split in place, the fragments are part of the returned
    /// block list. Blocks not reachable from a block without predecessors are
    /// left unassigned.
    pub fn run(&mut self, ctx: &mut CfgContext, blocks: &[Block]) -> IntervalResult<IntervalGraph> {
        if self.budget == 0 {
            return Err(IntervalError::ZeroBudget);
        }
        verify_blocks(ctx, blocks)?;

        self.blocks = blocks.to_vec();
        self.intervals.clear();
        self.worklist.clear();

        for &block in blocks {
            block.set_inputs(ctx, RegSet::new());
            block.set_interval(ctx, None);
        }

        for &block in blocks {
            if block.preds(ctx).is_empty() {
                self.open(ctx, block);
            }
        }

        while let Some(block) = self.worklist.pop_front() {
            let interval = block.interval(ctx).ok_or_else(|| {
                IntervalError::MalformedGraph(format!(
                    "{} is on the worklist without an interval",
                    block.name(ctx)
                ))
            })?;

            self.traverse(ctx, block);
            self.sync_regs(ctx, interval);

            if block.num_regs(ctx) < self.budget {
                self.grow(ctx, interval);
            }

            self.propagate(ctx, interval);
        }

        finalize(ctx, &self.blocks, &self.intervals, self.budget)?;

        debug!(
            "pass one: {} blocks ({} from splits) into {} intervals",
            self.blocks.len(),
            self.blocks.len() - blocks.len(),
            self.intervals.len()
        );

        Ok(IntervalGraph {
            blocks: std::mem::take(&mut self.blocks),
            intervals: std::mem::take(&mut self.intervals),
        })
    }

    /// Put `block` into a fresh interval of its own and enqueue it.
    fn open(&mut self, ctx: &mut CfgContext, block: Block) {
        let interval = Interval::new(ctx);
        self.intervals.push(interval);
        block.set_interval(ctx, Some(interval));
        block.set_inputs(ctx, RegSet::new());
        self.worklist.push_back(block);

        trace!("{} opens interval #{}", block.name(ctx), interval.id());
    }

    /// Split `block` if needed, the tail starts an interval of its own.
    fn traverse(&mut self, ctx: &mut CfgContext, block: Block) {
        if let Some(tail) = split_block(ctx, block, self.budget) {
            self.blocks.push(tail);
            self.open(ctx, tail);
        }
    }

    /// Recompute the register set of `interval` from its members.
    fn sync_regs(&self, ctx: &mut CfgContext, interval: Interval) {
        let mut regs = RegSet::new();
        for &block in self.blocks.iter() {
            if block.interval(ctx) == Some(interval) {
                regs.extend(block.outputs(ctx));
            }
        }
        interval.set_regs(ctx, regs);
    }

    fn grow(&mut self, ctx: &mut CfgContext, interval: Interval) {
        // blocks split off during this scan are left to the worklist
        let bound = self.blocks.len();

        for idx in 0..bound {
            let cand = self.blocks[idx];

            if cand.interval(ctx).is_some() {
                continue;
            }
            if !cand
                .preds(ctx)
                .iter()
                .all(|pred| pred.interval(ctx) == Some(interval))
            {
                continue;
            }

            self.marks.mark(ctx, cand);
            let mut union = cand.outputs(ctx).clone();
            for &block in self.blocks.iter() {
                if block.interval(ctx) == Some(interval) && self.marks.is_marked(block) {
                    union.extend(block.outputs(ctx));
                }
            }
            if union.len() >= self.budget {
                continue;
            }

            let footprint = regs::union(interval.regs(ctx), cand.outputs(ctx));
            if footprint.len() >= self.budget {
                continue;
            }

            trace!(
                "{} joins interval #{} with {} live-in registers",
                cand.name(ctx),
                interval.id(),
                union.len()
            );

            cand.set_interval(ctx, Some(interval));
            cand.set_inputs(ctx, union);
            self.traverse(ctx, cand);
            self.sync_regs(ctx, interval);
        }
    }

    /// Open an interval for every unassigned successor of the members of
    /// `interval`, in discovery order.
    fn propagate(&mut self, ctx: &mut CfgContext, interval: Interval) {
        let mut frontier = Vec::new();
        for &block in self.blocks.iter() {
            if block.interval(ctx) != Some(interval) {
                continue;
            }
            for &succ in block.succs(ctx) {
                if succ.interval(ctx) != Some(interval) && !frontier.contains(&succ) {
                    frontier.push(succ);
                }
            }
        }

        for succ in frontier {
            if succ.interval(ctx).is_none() {
                self.open(ctx, succ);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        inst::{Inst, Operand},
        regs::Reg,
    };

    fn uses(regs: &[u32]) -> Vec<Inst> {
        vec![Inst::new(
            "FADD",
            regs.iter().map(|&r| Operand::reg(Reg::new(r))).collect(),
        )]
    }

    #[test]
    fn test_zero_budget() {
        let mut ctx = CfgContext::new();
        let a = Block::new(&mut ctx, "a", uses(&[0]));

        assert!(matches!(
            IntervalConstruction::new(0).run(&mut ctx, &[a]),
            Err(IntervalError::ZeroBudget)
        ));
    }

    #[test]
    fn test_chain_merges() {
        let mut ctx = CfgContext::new();
        let a = Block::new(&mut ctx, "a", uses(&[0]));
        let b = Block::new(&mut ctx, "b", uses(&[1]));
        let c = Block::new(&mut ctx, "c", uses(&[0, 1]));
        a.add_edge(&mut ctx, b);
        b.add_edge(&mut ctx, c);

        let graph = IntervalConstruction::new(3)
            .run(&mut ctx, &[a, b, c])
            .unwrap();

        assert_eq!(graph.intervals.len(), 1);
        let interval = graph.intervals[0];
        assert_eq!(interval.num_regs(&ctx), 2);
        assert_eq!(interval.num_insts(&ctx), 3);
        assert_eq!(c.inputs(&ctx).len(), 2);
    }

    #[test]
    fn test_budget_closes_interval() {
        let mut ctx = CfgContext::new();
        let a = Block::new(&mut ctx, "a", uses(&[0]));
        let b = Block::new(&mut ctx, "b", uses(&[1]));
        let c = Block::new(&mut ctx, "c", uses(&[2]));
        a.add_edge(&mut ctx, b);
        b.add_edge(&mut ctx, c);

        let graph = IntervalConstruction::new(3)
            .run(&mut ctx, &[a, b, c])
            .unwrap();

        assert_eq!(graph.intervals.len(), 2);
        assert_eq!(a.interval(&ctx), b.interval(&ctx));
        assert_ne!(b.interval(&ctx), c.interval(&ctx));

        let (first, second) = (graph.intervals[0], graph.intervals[1]);
        assert_eq!(first.succs(&ctx), &[second]);
        assert_eq!(second.preds(&ctx), &[first]);
    }

    #[test]
    fn test_loop_header_is_not_absorbed() {
        let mut ctx = CfgContext::new();
        let entry = Block::new(&mut ctx, "entry", uses(&[0]));
        let header = Block::new(&mut ctx, "header", uses(&[1]));
        let body = Block::new(&mut ctx, "body", uses(&[2]));
        entry.add_edge(&mut ctx, header);
        header.add_edge(&mut ctx, body);
        body.add_edge(&mut ctx, header);

        let graph = IntervalConstruction::new(8)
            .run(&mut ctx, &[entry, header, body])
            .unwrap();

        // the back edge keeps the header out of the entry interval
        assert_eq!(graph.intervals.len(), 2);
        assert_ne!(entry.interval(&ctx), header.interval(&ctx));
        assert_eq!(header.interval(&ctx), body.interval(&ctx));
    }

    #[test]
    fn test_oversized_statement_is_reported() {
        let mut ctx = CfgContext::new();
        let a = Block::new(&mut ctx, "a", uses(&[0, 1, 2]));

        assert!(matches!(
            IntervalConstruction::new(2).run(&mut ctx, &[a]),
            Err(IntervalError::BudgetViolation { regs: 3, budget: 2, .. })
        ));
    }
}
