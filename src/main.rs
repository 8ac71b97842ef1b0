//! The register-interval executable.
//!
//! ```text
//! reginterval <BUDGET> <INPUT> [--output-dir DIR] [--union-scope global|ancestors]
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::info;
use reginterval::{
    error::Result,
    frontend::{abb, dot},
    graph::CfgContext,
    passes::{Convergence, IntervalConstruction, UnionScope},
    report::{self, SnapshotKind},
};

fn cli() -> clap::Command {
    clap::Command::new("reginterval")
        .about("Partition a kernel control flow graph into register-intervals")
        .arg(
            clap::Arg::new("budget")
                .required(true)
                .value_parser(clap::value_parser!(u64).range(1..))
                .help("The number of registers an interval must stay under"),
        )
        .arg(
            clap::Arg::new("input")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("The Graphviz control flow graph printed by `nvdisasm -cfg`"),
        )
        .arg(
            clap::Arg::new("output-dir")
                .long("output-dir")
                .value_parser(clap::value_parser!(PathBuf))
                .default_value("output")
                .help("The directory the snapshots are written to"),
        )
        .arg(
            clap::Arg::new("union-scope")
                .long("union-scope")
                .value_parser(["global", "ancestors"])
                .default_value("global")
                .help("The register union checked when coarsening intervals"),
        )
}

fn run(budget: usize, input: &Path, output_dir: &Path, scope: UnionScope) -> Result<()> {
    let src = fs::read_to_string(input)?;
    let graph = dot::parse(&src)?;

    let mut ctx = CfgContext::new();
    let blocks = abb::build(&mut ctx, &graph)?;

    let blocks_path = report::snapshot_path(output_dir, input, SnapshotKind::BasicBlocks)?;
    report::save(&blocks_path, |out| report::write_blocks(out, &ctx, &blocks))?;
    info!("{} basic blocks, written to {}", blocks.len(), blocks_path.display());

    let interval_graph = IntervalConstruction::new(budget).run(&mut ctx, &blocks)?;
    info!(
        "pass one: {} intervals from {} blocks",
        interval_graph.intervals.len(),
        interval_graph.blocks.len()
    );

    let intervals_path =
        report::snapshot_path(output_dir, input, SnapshotKind::RegisterIntervals)?;
    report::save(&intervals_path, |out| {
        report::write_intervals(out, &ctx, &interval_graph.intervals)
    })?;

    let result = Convergence::new(budget).with_union_scope(scope).run(
        &mut ctx,
        interval_graph.intervals,
        |ctx, _, intervals| -> Result<()> {
            report::save(&intervals_path, |out| report::write_intervals(out, ctx, intervals))?;
            Ok(())
        },
    )?;

    info!(
        "{} intervals after {} coarsening passes, written to {}",
        result.intervals.len(),
        result.iterations,
        intervals_path.display()
    );

    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let matches = cli().get_matches();

    let budget = matches.get_one::<u64>("budget").copied().unwrap_or(1) as usize;
    let input = matches
        .get_one::<PathBuf>("input")
        .cloned()
        .unwrap_or_default();
    let output_dir = matches
        .get_one::<PathBuf>("output-dir")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("output"));
    let scope = matches
        .get_one::<String>("union-scope")
        .and_then(|s| s.parse::<UnionScope>().ok())
        .unwrap_or_default();

    run(budget, &input, &output_dir, scope)
}
