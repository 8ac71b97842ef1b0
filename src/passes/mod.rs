//! # Register-Interval Passes
//!
//! - [split]: splits a block whose register footprint reaches the budget.
//! - [construct]: pass one, groups basic blocks into intervals.
//! - [coarsen]: pass two, groups intervals into coarser intervals.
//! - [converge]: repeats pass two until the interval count stops shrinking.
//!
//! Both grouping passes end with the same finalization step, implemented
//! once here over [IntervalMember]s.

pub mod coarsen;
pub mod construct;
pub mod converge;
pub mod split;
pub mod verify;

pub use coarsen::{IntervalCoarsening, UnionScope};
pub use construct::{IntervalConstruction, IntervalGraph};
pub use converge::{Convergence, ConvergenceResult};
use thiserror::Error;

use crate::{
    graph::{Block, CfgContext, Interval},
    inst::Inst,
    regs::{RegIndexOutOfRange, RegSet, RegVector},
    utils::cfg::CfgNode,
};

#[derive(Debug, Error)]
pub enum IntervalError {
    #[error("malformed graph: {0}")]
    MalformedGraph(String),

    #[error("interval #{interval}: {source}")]
    RegisterIndexOutOfRange {
        interval: usize,
        #[source]
        source: RegIndexOutOfRange,
    },

    #[error("interval #{interval} holds {regs} registers, which is not under the budget of {budget}")]
    BudgetViolation {
        interval: usize,
        regs: usize,
        budget: usize,
    },

    #[error("the register budget must be at least 1")]
    ZeroBudget,
}

pub type IntervalResult<T> = Result<T, IntervalError>;

/// A node that is grouped into an interval by one of the passes.
///
/// For pass one the members are basic blocks and the owner is the block's
/// interval; for pass two the members are intervals and the owner is the
/// next-level interval.
pub(crate) trait IntervalMember: CfgNode<A = CfgContext> {
    fn owner(self, ctx: &CfgContext) -> Option<Interval>;

    fn member_regs(self, ctx: &CfgContext) -> &RegSet;

    fn member_insts(self, ctx: &CfgContext) -> &[Inst];
}

impl IntervalMember for Block {
    fn owner(self, ctx: &CfgContext) -> Option<Interval> { self.interval(ctx) }

    fn member_regs(self, ctx: &CfgContext) -> &RegSet { self.outputs(ctx) }

    fn member_insts(self, ctx: &CfgContext) -> &[Inst] { self.insts(ctx) }
}

impl IntervalMember for Interval {
    fn owner(self, ctx: &CfgContext) -> Option<Interval> { self.next_level(ctx) }

    fn member_regs(self, ctx: &CfgContext) -> &RegSet { self.regs(ctx) }

    fn member_insts(self, ctx: &CfgContext) -> &[Inst] { self.insts(ctx) }
}

/// Fill in the register set, instructions and edges of every interval from
/// its members, then check the budget.
///
/// Members are visited in the order of `members`. An edge is recorded between
/// two intervals when a member edge crosses them; edges to unassigned members
/// (unreachable code) are dropped.
pub(crate) fn finalize<M>(
    ctx: &mut CfgContext,
    members: &[M],
    intervals: &[Interval],
    budget: usize,
) -> IntervalResult<()>
where
    M: IntervalMember,
{
    for &interval in intervals {
        let mut regs = RegSet::new();
        let mut insts = Vec::new();
        let mut preds = Vec::new();
        let mut succs = Vec::new();

        for &member in members {
            if member.owner(ctx) != Some(interval) {
                continue;
            }
            regs.extend(member.member_regs(ctx));
            insts.extend_from_slice(member.member_insts(ctx));

            for &pred in member.preds(ctx) {
                if let Some(owner) = pred.owner(ctx) {
                    if owner != interval && !preds.contains(&owner) {
                        preds.push(owner);
                    }
                }
            }
            for &succ in member.succs(ctx) {
                if let Some(owner) = succ.owner(ctx) {
                    if owner != interval && !succs.contains(&owner) {
                        succs.push(owner);
                    }
                }
            }
        }

        let vector = RegVector::from_set(&regs).map_err(|source| {
            IntervalError::RegisterIndexOutOfRange {
                interval: interval.id(),
                source,
            }
        })?;

        if regs.len() >= budget {
            return Err(IntervalError::BudgetViolation {
                interval: interval.id(),
                regs: regs.len(),
                budget,
            });
        }

        interval.set_regs(ctx, regs);
        interval.set_vector(ctx, vector);
        interval.set_insts(ctx, insts);
        for pred in preds {
            interval.add_pred(ctx, pred);
        }
        for succ in succs {
            interval.add_succ(ctx, succ);
        }
    }

    Ok(())
}
