#![allow(dead_code)]

use reginterval::{
    graph::{Block, CfgContext, Interval},
    inst::{Inst, Operand},
    regs::Reg,
};

/// An instruction reading every register in `regs`.
pub fn uses(regs: &[u32]) -> Inst {
    Inst::new(
        "FFMA",
        regs.iter().map(|&r| Operand::reg(Reg::new(r))).collect(),
    )
}

pub fn branch(target: &str) -> Inst { Inst::new("BRA", vec![Operand::label(target)]) }

/// A block with a single instruction using `regs`.
pub fn block(ctx: &mut CfgContext, name: &str, regs: &[u32]) -> Block {
    let insts = if regs.is_empty() {
        vec![Inst::new("NOP", vec![])]
    } else {
        vec![uses(regs)]
    };
    Block::new(ctx, name, insts)
}

/// A block with one instruction per entry of `stmts`.
pub fn straight(ctx: &mut CfgContext, name: &str, stmts: &[&[u32]]) -> Block {
    Block::new(ctx, name, stmts.iter().map(|regs| uses(regs)).collect())
}

pub fn connect(ctx: &mut CfgContext, edges: &[(Block, Block)]) {
    for &(from, to) in edges {
        from.add_edge(ctx, to);
    }
}

/// The diamond `a -> {b, c} -> d` with `a = {R0 R1}`, `b = {R2}`, `c = {R3}`
/// and `d = {R4}`.
pub fn diamond(ctx: &mut CfgContext) -> [Block; 4] {
    let a = block(ctx, "a", &[0, 1]);
    let b = block(ctx, "b", &[2]);
    let c = block(ctx, "c", &[3]);
    let d = block(ctx, "d", &[4]);
    connect(ctx, &[(a, b), (a, c), (b, d), (c, d)]);
    [a, b, c, d]
}

/// `entry -> header <-> body`, `header -> exit`, one register each.
pub fn simple_loop(ctx: &mut CfgContext) -> [Block; 4] {
    let entry = block(ctx, "entry", &[0]);
    let header = block(ctx, "header", &[1]);
    let body = block(ctx, "body", &[2]);
    let exit = block(ctx, "exit", &[3]);
    connect(
        ctx,
        &[(entry, header), (header, body), (body, header), (header, exit)],
    );
    [entry, header, body, exit]
}

/// Check if `a` reaches `b` through interval successor edges.
pub fn reaches(ctx: &CfgContext, a: Interval, b: Interval) -> bool {
    let mut stack = vec![a];
    let mut visited = Vec::new();
    while let Some(i) = stack.pop() {
        if i == b {
            return true;
        }
        if visited.contains(&i) {
            continue;
        }
        visited.push(i);
        stack.extend(i.succs(ctx).iter().copied());
    }
    false
}
