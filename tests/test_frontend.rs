use std::{fs, path::Path};

use reginterval::{
    error::{Error, Result},
    frontend::{abb, dot},
    graph::CfgContext,
    passes::{Convergence, IntervalConstruction},
    report::{self, SnapshotKind},
};
use tempfile::TempDir;

const LOOP_KERNEL: &str = r#"digraph f {
    node [fontname="Courier",fontsize=10,shape=Mrecord];
    "f" [label="{<entry>f:\l/*0000*/ MOV R1, c[0x0][0x28] ;\l/*0010*/ MOV R2, RZ ;\l}"]
    "f":entry:s -> ".L_1":entry:n [style=solid];
    ".L_1" [label="{<entry>.L_1:\l/*0020*/ IADD3 R2, R2, 0x1, RZ ;\l/*0030*/ ISETP.GE.AND P0, PT, R2, R0, PT ;\l|<exit0>/*0040*/ @!P0 BRA `(.L_1) ;\l}"]
    ".L_1":exit0:e -> ".L_1":entry:n [style=solid];
    ".L_1":exit0:s -> ".L_2":entry:n [style=solid];
    ".L_2" [label="{<entry>.L_2:\l/*0050*/ STG.E [R4], R2 ;\l/*0060*/ EXIT ;\l}"]
}
"#;

/// Run the whole pipeline on `src`, writing snapshots under `dir`.
fn pipeline(src: &str, budget: usize, dir: &Path) -> Result<(usize, usize)> {
    let input = Path::new("loop.sm_70.dot");
    let graph = dot::parse(src)?;
    let mut ctx = CfgContext::new();
    let blocks = abb::build(&mut ctx, &graph)?;

    let blocks_path = report::snapshot_path(dir, input, SnapshotKind::BasicBlocks)?;
    report::save(&blocks_path, |out| report::write_blocks(out, &ctx, &blocks))?;

    let interval_graph = IntervalConstruction::new(budget).run(&mut ctx, &blocks)?;

    let intervals_path = report::snapshot_path(dir, input, SnapshotKind::RegisterIntervals)?;
    let result = Convergence::new(budget).run(
        &mut ctx,
        interval_graph.intervals,
        |ctx, _, intervals| -> Result<()> {
            report::save(&intervals_path, |out| report::write_intervals(out, ctx, intervals))?;
            Ok(())
        },
    )?;

    Ok((result.intervals.len(), result.iterations))
}

#[test]
fn test_loop_kernel_blocks() {
    let graph = dot::parse(LOOP_KERNEL).unwrap();
    let mut ctx = CfgContext::new();
    let blocks = abb::build(&mut ctx, &graph).unwrap();

    assert_eq!(blocks.len(), 3);
    let (f, body, exit) = (blocks[0], blocks[1], blocks[2]);
    assert_eq!(body.name(&ctx), ".L_1");
    assert_eq!(body.succs(&ctx), &[body, exit]);
    assert_eq!(body.preds(&ctx), &[f, body]);
    assert!(exit.is_exit(&ctx));

    let control = body.control(&ctx).unwrap();
    assert!(control.name(&ctx).starts_with(abb::CONTROLLING_PREFIX));
    assert_eq!(control.num_insts(&ctx), 1);

    let graph = IntervalConstruction::new(4).run(&mut ctx, &blocks).unwrap();
    // the self loop keeps the body out of the entry interval
    assert_eq!(graph.intervals.len(), 2);
    assert_ne!(f.interval(&ctx), body.interval(&ctx));
    assert_eq!(body.interval(&ctx), exit.interval(&ctx));
}

#[test]
fn test_pipeline_writes_snapshots() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("output");

    // {R1 R2} and {R0 R2 R4} fold once the budget exceeds 4 registers
    let (intervals, iterations) = pipeline(LOOP_KERNEL, 5, &dir).unwrap();
    assert_eq!(intervals, 1);
    assert_eq!(iterations, 2);

    let blocks = fs::read_to_string(dir.join("BasicBlocks_loop.txt")).unwrap();
    assert!(blocks.starts_with("The number of basic_blocks = 3\n"));
    assert!(blocks.contains("#Register_list = {R0 R2 }; #Number of Registers = 2;"));

    let snapshot = fs::read_to_string(dir.join("registerIntervals_loop.txt")).unwrap();
    assert!(snapshot.starts_with("The number of Intervals = 1\n"));
    assert!(snapshot.contains("#Register_list = {R0 R1 R2 R4 }; #Number of Registers = 4;"));
}

#[test]
fn test_pipeline_at_fixed_point() {
    let tmp = TempDir::new().unwrap();

    let (intervals, iterations) = pipeline(LOOP_KERNEL, 4, tmp.path()).unwrap();
    assert_eq!(intervals, 2);
    assert_eq!(iterations, 1);
}

#[test]
fn test_pipeline_errors() {
    let tmp = TempDir::new().unwrap();

    assert!(matches!(
        pipeline("digraph f {", 4, tmp.path()),
        Err(Error::Parse(_))
    ));
    assert!(matches!(
        pipeline(LOOP_KERNEL, 2, tmp.path()),
        Err(Error::Interval(_))
    ));
    // the block snapshot is written before the passes fail
    assert!(tmp.path().join("BasicBlocks_loop.txt").is_file());
}
