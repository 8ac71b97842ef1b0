//! # Snapshots
//!
//! Plain-text dumps of the block graph and of the interval graph. The block
//! snapshot is written once after parsing, the interval snapshot after every
//! coarsening pass, each overwriting the previous one.

use std::{
    fmt,
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::{
    graph::{Block, CfgContext, Interval},
    regs,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    BasicBlocks,
    RegisterIntervals,
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotKind::BasicBlocks => write!(f, "BasicBlocks"),
            SnapshotKind::RegisterIntervals => write!(f, "registerIntervals"),
        }
    }
}

/// The snapshot file for `input`: `<dir>/<kind>_<stem>.txt`, where the stem is
/// the file name of `input` up to its first `.`.
///
/// `dir` is created if it does not exist.
pub fn snapshot_path(dir: &Path, input: &Path, kind: SnapshotKind) -> io::Result<PathBuf> {
    let file_name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file_name.split('.').next().unwrap_or_default();

    fs::create_dir_all(dir)?;
    Ok(dir.join(format!("{}_{}.txt", kind, stem)))
}

fn write_ids<W: Write>(out: &mut W, ids: impl Iterator<Item = usize>) -> io::Result<()> {
    for id in ids {
        write!(out, "{} ", id)?;
    }
    Ok(())
}

pub fn write_blocks<W: Write>(out: &mut W, ctx: &CfgContext, blocks: &[Block]) -> io::Result<()> {
    writeln!(out, "The number of basic_blocks = {}", blocks.len())?;
    for &block in blocks {
        writeln!(out, " #The basic_block ID : {}", block.id())?;
        writeln!(out, "\t\t#Number of Instructions = {}", block.num_insts(ctx))?;
        writeln!(
            out,
            "\t\t#Register_list = {}; #Number of Registers = {};",
            regs::display_set(block.outputs(ctx)),
            block.num_regs(ctx)
        )?;
        write!(out, "\t\t#predecessors = {{")?;
        write_ids(out, block.preds(ctx).iter().map(|b| b.id()))?;
        write!(out, "}};\t\t#successors = {{")?;
        write_ids(out, block.succs(ctx).iter().map(|b| b.id()))?;
        writeln!(out, "}};")?;
    }
    Ok(())
}

pub fn write_intervals<W: Write>(
    out: &mut W,
    ctx: &CfgContext,
    intervals: &[Interval],
) -> io::Result<()> {
    writeln!(out, "The number of Intervals = {}", intervals.len())?;
    for &interval in intervals {
        writeln!(
            out,
            " #Interval ID = {} #Number of Instructions = {}",
            interval.id(),
            interval.num_insts(ctx)
        )?;
        writeln!(
            out,
            "\t\t #Register_list = {}; #Number of Registers = {};",
            regs::display_set(interval.regs(ctx)),
            interval.num_regs(ctx)
        )?;
        write!(out, "\t\tPredecessors = {{ ")?;
        write_ids(out, interval.preds(ctx).iter().map(|i| i.id()))?;
        write!(out, "}}\t\tSuccessors = {{ ")?;
        write_ids(out, interval.succs(ctx).iter().map(|i| i.id()))?;
        writeln!(out, "}};")?;
    }
    Ok(())
}

/// Create (or truncate) `path` and fill it with `write`.
pub fn save<F>(path: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let mut out = BufWriter::new(File::create(path)?);
    write(&mut out)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        inst::{Inst, Operand},
        regs::Reg,
    };

    #[test]
    fn test_snapshot_path() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("output");
        let path = snapshot_path(
            &dir,
            Path::new("cfgs/vectorAdd.sm_70.dot"),
            SnapshotKind::RegisterIntervals,
        )
        .unwrap();
        assert_eq!(path, dir.join("registerIntervals_vectorAdd.txt"));
        assert!(dir.is_dir());
    }

    #[test]
    fn test_write_blocks() {
        let mut ctx = CfgContext::new();
        let a = Block::new(
            &mut ctx,
            "a",
            vec![Inst::new(
                "MOV",
                vec![Operand::reg(Reg::new(1)), Operand::reg(Reg::new(0))],
            )],
        );
        let b = Block::new(&mut ctx, "b", vec![]);
        a.add_edge(&mut ctx, b);

        let mut out = Vec::new();
        write_blocks(&mut out, &ctx, &[a, b]).unwrap();
        let text = String::from_utf8(out).unwrap();

        let expected = "The number of basic_blocks = 2\n \
                        #The basic_block ID : 0\n\
                        \t\t#Number of Instructions = 1\n\
                        \t\t#Register_list = {R0 R1 }; #Number of Registers = 2;\n\
                        \t\t#predecessors = {};\t\t#successors = {1 };\n";
        assert!(text.starts_with(expected));
    }

    #[test]
    fn test_write_intervals() {
        let mut ctx = CfgContext::new();
        let a = Interval::new(&mut ctx);
        let b = Interval::new(&mut ctx);
        a.add_edge(&mut ctx, b);

        let mut out = Vec::new();
        write_intervals(&mut out, &ctx, &[a, b]).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("The number of Intervals = 2\n"));
        assert!(text.contains("\t\tPredecessors = { }\t\tSuccessors = { 1 };\n"));
        assert!(text.contains("\t\tPredecessors = { 0 }\t\tSuccessors = { };\n"));
    }
}
