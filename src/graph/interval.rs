use super::CfgContext;
use crate::{
    collections::storage::{ArenaAlloc, ArenaPtr, BaseArenaPtr},
    impl_arena,
    inst::{self, Inst},
    regs::{RegSet, RegVector},
    utils::cfg::CfgNode,
};

/// A single-entry region whose register footprint stays under the budget.
#[derive(Default)]
pub struct IntervalData {
    /// The instructions of all members, in member order.
    insts: Vec<Inst>,
    regs: RegSet,
    vector: RegVector,

    preds: Vec<Interval>,
    succs: Vec<Interval>,

    /// The coarser interval this one has been folded into by the running
    /// coarsening pass.
    next_level: Option<Interval>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval(BaseArenaPtr<IntervalData>);

impl_arena!(CfgContext, IntervalData, Interval, intervals);

impl Interval {
    pub fn new(ctx: &mut CfgContext) -> Self { ctx.alloc(IntervalData::default()) }

    pub fn id(self) -> usize { self.0.id() }

    pub fn insts(self, ctx: &CfgContext) -> &[Inst] { &self.deref(ctx).insts }

    pub(crate) fn set_insts(self, ctx: &mut CfgContext, insts: Vec<Inst>) {
        self.deref_mut(ctx).insts = insts;
    }

    pub fn num_insts(self, ctx: &CfgContext) -> usize { self.deref(ctx).insts.len() }

    pub fn text(self, ctx: &CfgContext) -> String { inst::render(self.insts(ctx)) }

    pub fn regs(self, ctx: &CfgContext) -> &RegSet { &self.deref(ctx).regs }

    pub fn set_regs(self, ctx: &mut CfgContext, regs: RegSet) { self.deref_mut(ctx).regs = regs; }

    pub fn num_regs(self, ctx: &CfgContext) -> usize { self.deref(ctx).regs.len() }

    /// The membership vector of the register set, valid once the interval
    /// has been finalized.
    pub fn vector(self, ctx: &CfgContext) -> RegVector { self.deref(ctx).vector }

    pub(crate) fn set_vector(self, ctx: &mut CfgContext, vector: RegVector) {
        self.deref_mut(ctx).vector = vector;
    }

    pub fn preds(self, ctx: &CfgContext) -> &[Interval] { &self.deref(ctx).preds }

    pub fn succs(self, ctx: &CfgContext) -> &[Interval] { &self.deref(ctx).succs }

    pub fn add_pred(self, ctx: &mut CfgContext, pred: Interval) {
        let preds = &mut self.deref_mut(ctx).preds;
        if !preds.contains(&pred) {
            preds.push(pred);
        }
    }

    pub fn add_succ(self, ctx: &mut CfgContext, succ: Interval) {
        let succs = &mut self.deref_mut(ctx).succs;
        if !succs.contains(&succ) {
            succs.push(succ);
        }
    }

    /// Add an interval-level edge `self -> succ` on both ends.
    pub fn add_edge(self, ctx: &mut CfgContext, succ: Interval) {
        self.add_succ(ctx, succ);
        succ.add_pred(ctx, self);
    }

    pub fn next_level(self, ctx: &CfgContext) -> Option<Interval> { self.deref(ctx).next_level }

    pub fn set_next_level(self, ctx: &mut CfgContext, next_level: Option<Interval>) {
        self.deref_mut(ctx).next_level = next_level;
    }
}

impl CfgNode for Interval {
    fn index(self) -> usize { self.id() }

    fn preds(self, arena: &Self::A) -> &[Self] { Interval::preds(self, arena) }

    fn succs(self, arena: &Self::A) -> &[Self] { Interval::succs(self, arena) }
}
