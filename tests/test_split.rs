use common::{block, branch, straight, uses};
use reginterval::{
    graph::{Block, CfgContext},
    passes::{split::split_block, IntervalConstruction},
};

mod common;

#[test]
fn test_split_into_fragments() {
    let mut ctx = CfgContext::new();
    let entry = block(&mut ctx, "entry", &[]);
    let mut insts = (0..5).map(|r| uses(&[r])).collect::<Vec<_>>();
    insts.push(branch("body"));
    let body = Block::new(&mut ctx, "body", insts);
    let exit = block(&mut ctx, "exit", &[]);
    entry.add_edge(&mut ctx, body);
    body.add_edge(&mut ctx, exit);

    let graph = IntervalConstruction::new(2)
        .run(&mut ctx, &[entry, body, exit])
        .unwrap();

    let fragments = graph
        .blocks
        .iter()
        .copied()
        .filter(|&b| b != entry && b != exit)
        .collect::<Vec<_>>();
    assert!(fragments.len() >= 3);
    assert_eq!(fragments[0], body);
    for &fragment in fragments.iter() {
        assert!(fragment.num_regs(&ctx) < 2);
    }

    // the chain keeps the original ends
    assert_eq!(entry.succs(&ctx), &[body]);
    assert_eq!(body.preds(&ctx), &[entry]);
    for pair in fragments.windows(2) {
        assert_eq!(pair[0].succs(&ctx), &[pair[1]]);
        assert_eq!(pair[1].preds(&ctx), &[pair[0]]);
    }
    let last = *fragments.last().unwrap();
    assert_eq!(last.succs(&ctx), &[exit]);
    assert_eq!(exit.preds(&ctx), &[last]);

    // the branch moved with the code and follows the renames
    let text = last.text(&ctx);
    assert!(text.contains(&format!("`({})", last.name(&ctx))));
    assert!(!text.contains("`(body)"));

    let total_insts = fragments.iter().map(|b| b.num_insts(&ctx)).sum::<usize>();
    assert_eq!(total_insts, 6);
    for interval in graph.intervals {
        assert!(interval.num_regs(&ctx) < 2);
    }
}

#[test]
fn test_split_keeps_other_edges() {
    let mut ctx = CfgContext::new();
    let p0 = block(&mut ctx, "p0", &[]);
    let p1 = block(&mut ctx, "p1", &[]);
    let b = straight(&mut ctx, "b", &[&[0, 1], &[2, 3], &[4]]);
    let s0 = block(&mut ctx, "s0", &[]);
    let s1 = block(&mut ctx, "s1", &[]);
    common::connect(&mut ctx, &[(p0, b), (p1, b), (b, s0), (b, s1)]);

    let tail = split_block(&mut ctx, b, 4).unwrap();

    assert_eq!(p0.succs(&ctx), &[b]);
    assert_eq!(p1.succs(&ctx), &[b]);
    assert_eq!(b.preds(&ctx), &[p0, p1]);
    assert_eq!(b.succs(&ctx), &[tail]);
    assert_eq!(tail.preds(&ctx), &[b]);
    assert_eq!(tail.succs(&ctx), &[s0, s1]);
    assert_eq!(s0.preds(&ctx), &[tail]);
    assert_eq!(s1.preds(&ctx), &[tail]);

    assert_eq!(b.num_regs(&ctx), 2);
    assert_eq!(tail.num_regs(&ctx), 3);
    assert_eq!(tail.name(&ctx), format!("b_{}", tail.id()));

    // the tail fits now
    assert_eq!(split_block(&mut ctx, tail, 4), None);
}

#[test]
fn test_split_name_is_unique() {
    let mut ctx = CfgContext::new();
    let x = Block::new(&mut ctx, "x", vec![uses(&[0]), uses(&[1]), branch("x")]);
    // the name the tail would get from its id alone
    let other = block(&mut ctx, "x_2", &[]);
    x.add_edge(&mut ctx, x);

    let tail = split_block(&mut ctx, x, 2).unwrap();

    assert_ne!(tail.name(&ctx), "x_2");
    assert_eq!(ctx.block_by_name("x_2"), Some(other));
    assert_eq!(ctx.block_by_name(tail.name(&ctx)), Some(tail));

    // the moved branch resolves to the tail, not to the other block
    let target = format!("`({})", tail.name(&ctx));
    assert!(tail.text(&ctx).contains(&target));
    assert_eq!(tail.succs(&ctx), &[x]);
    assert_eq!(x.preds(&ctx), &[tail]);
}
