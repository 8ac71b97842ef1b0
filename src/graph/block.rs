use super::{CfgContext, Interval};
use crate::{
    collections::storage::{ArenaAlloc, ArenaPtr, BaseArenaPtr},
    impl_arena,
    inst::{self, Inst},
    regs::RegSet,
    utils::cfg::CfgNode,
};

pub struct BlockData {
    name: String,
    /// The index of the abstract block this block was carved out of.
    group: Option<usize>,
    insts: Vec<Inst>,

    /// Every register referenced by the instructions.
    outputs: RegSet,
    /// Registers live on entry, filled in when the block joins an interval.
    inputs: RegSet,

    preds: Vec<Block>,
    succs: Vec<Block>,

    interval: Option<Interval>,

    /// Whether this is a synthesized block holding only a predicated branch.
    controlling: bool,
    /// The controlling block guarding the branch at the end of this block.
    control: Option<Block>,
    /// Whether the block terminates the kernel.
    exit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Block(pub(super) BaseArenaPtr<BlockData>);

impl_arena!(CfgContext, BlockData, Block, blocks);

fn collect_regs(insts: &[Inst]) -> RegSet { insts.iter().flat_map(Inst::regs).collect() }

impl Block {
    /// Create a block, its output registers are derived from `insts`.
    pub fn new(ctx: &mut CfgContext, name: impl Into<String>, insts: Vec<Inst>) -> Self {
        ctx.alloc(BlockData {
            name: name.into(),
            group: None,
            outputs: collect_regs(&insts),
            insts,
            inputs: RegSet::new(),
            preds: Vec::new(),
            succs: Vec::new(),
            interval: None,
            controlling: false,
            control: None,
            exit: false,
        })
    }

    /// Create a controlling block, i.e., a block that only evaluates the
    /// predicate of a branch.
    pub fn new_controlling(ctx: &mut CfgContext, name: impl Into<String>, insts: Vec<Inst>) -> Self {
        let block = Self::new(ctx, name, insts);
        block.deref_mut(ctx).controlling = true;
        block
    }

    /// Create the tail fragment of `head`.
    ///
    /// The tail is named `<head>_<n>`, where `n` starts at the id of the new
    /// block and is bumped until no other block has that name.
    pub(crate) fn new_fragment(ctx: &mut CfgContext, head: Block, insts: Vec<Inst>) -> Self {
        let mut suffix = ctx.num_blocks();
        let mut name = format!("{}_{}", head.name(ctx), suffix);
        while ctx.block_by_name(&name).is_some() {
            suffix += 1;
            name = format!("{}_{}", head.name(ctx), suffix);
        }

        let group = head.group(ctx);
        ctx.alloc(BlockData {
            name,
            group,
            outputs: collect_regs(&insts),
            insts,
            inputs: RegSet::new(),
            preds: Vec::new(),
            succs: Vec::new(),
            interval: None,
            controlling: false,
            control: None,
            exit: false,
        })
    }

    pub fn id(self) -> usize { self.0.id() }

    pub fn name(self, ctx: &CfgContext) -> &str { &self.deref(ctx).name }

    pub fn group(self, ctx: &CfgContext) -> Option<usize> { self.deref(ctx).group }

    pub fn set_group(self, ctx: &mut CfgContext, group: usize) {
        self.deref_mut(ctx).group = Some(group);
    }

    pub fn insts(self, ctx: &CfgContext) -> &[Inst] { &self.deref(ctx).insts }

    pub fn num_insts(self, ctx: &CfgContext) -> usize { self.deref(ctx).insts.len() }

    /// The instructions rendered as terminated statements.
    pub fn text(self, ctx: &CfgContext) -> String { inst::render(self.insts(ctx)) }

    /// Detach and return the instructions from `at` onward.
    pub(crate) fn split_off_insts(self, ctx: &mut CfgContext, at: usize) -> Vec<Inst> {
        self.deref_mut(ctx).insts.split_off(at)
    }

    /// Redirect branch targets named `old` to `new` in every instruction.
    ///
    /// Returns the number of rewritten instructions.
    pub(crate) fn rename_label(self, ctx: &mut CfgContext, old: &str, new: &str) -> usize {
        self.deref_mut(ctx)
            .insts
            .iter_mut()
            .filter_map(|inst| inst.rename_label(old, new).then_some(()))
            .count()
    }

    pub fn outputs(self, ctx: &CfgContext) -> &RegSet { &self.deref(ctx).outputs }

    pub fn set_outputs(self, ctx: &mut CfgContext, outputs: RegSet) {
        self.deref_mut(ctx).outputs = outputs;
    }

    pub fn num_regs(self, ctx: &CfgContext) -> usize { self.deref(ctx).outputs.len() }

    pub fn inputs(self, ctx: &CfgContext) -> &RegSet { &self.deref(ctx).inputs }

    pub fn set_inputs(self, ctx: &mut CfgContext, inputs: RegSet) {
        self.deref_mut(ctx).inputs = inputs;
    }

    pub fn preds(self, ctx: &CfgContext) -> &[Block] { &self.deref(ctx).preds }

    pub fn succs(self, ctx: &CfgContext) -> &[Block] { &self.deref(ctx).succs }

    /// Add a control edge `self -> succ`, keeping both adjacency lists free of
    /// duplicates.
    pub fn add_edge(self, ctx: &mut CfgContext, succ: Block) {
        let data = self.deref_mut(ctx);
        if !data.succs.contains(&succ) {
            data.succs.push(succ);
        }
        let data = succ.deref_mut(ctx);
        if !data.preds.contains(&self) {
            data.preds.push(self);
        }
    }

    pub(crate) fn set_succs(self, ctx: &mut CfgContext, succs: Vec<Block>) {
        self.deref_mut(ctx).succs = succs;
    }

    pub(crate) fn set_preds(self, ctx: &mut CfgContext, preds: Vec<Block>) {
        self.deref_mut(ctx).preds = preds;
    }

    /// Replace `old` with `new` in the predecessor list.
    pub(crate) fn replace_pred(self, ctx: &mut CfgContext, old: Block, new: Block) {
        let preds = &mut self.deref_mut(ctx).preds;
        if preds.contains(&new) {
            preds.retain(|p| *p != old);
        } else {
            preds.iter_mut().filter(|p| **p == old).for_each(|p| *p = new);
        }
    }

    pub fn interval(self, ctx: &CfgContext) -> Option<Interval> { self.deref(ctx).interval }

    pub fn set_interval(self, ctx: &mut CfgContext, interval: Option<Interval>) {
        self.deref_mut(ctx).interval = interval;
    }

    pub fn is_controlling(self, ctx: &CfgContext) -> bool { self.deref(ctx).controlling }

    pub fn control(self, ctx: &CfgContext) -> Option<Block> { self.deref(ctx).control }

    pub fn set_control(self, ctx: &mut CfgContext, control: Option<Block>) {
        self.deref_mut(ctx).control = control;
    }

    pub fn is_exit(self, ctx: &CfgContext) -> bool { self.deref(ctx).exit }

    pub fn set_exit(self, ctx: &mut CfgContext, exit: bool) { self.deref_mut(ctx).exit = exit; }
}

impl CfgNode for Block {
    fn index(self) -> usize { self.id() }

    fn preds(self, arena: &Self::A) -> &[Self] { Block::preds(self, arena) }

    fn succs(self, arena: &Self::A) -> &[Self] { Block::succs(self, arena) }
}
