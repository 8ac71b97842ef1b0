//! # Pass Two: Interval Coarsening
//!
//! Groups the intervals of the previous level into coarser intervals, the
//! same way pass one groups blocks. Intervals are never split here. An
//! interval is folded into a coarse interval by setting its next-level link.

use std::{collections::VecDeque, fmt, str::FromStr};

use log::{debug, trace};

use super::{finalize, IntervalError, IntervalResult};
use crate::{
    graph::{CfgContext, Interval},
    regs::{self, RegSet},
    utils::marks::AncestorMarks,
};

/// The register union checked against the budget before a candidate joins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnionScope {
    /// The registers of every input interval, regardless of reachability.
    #[default]
    Global,
    /// The registers of the candidate and of its ancestors already folded
    /// into the coarse interval.
    Ancestors,
}

impl fmt::Display for UnionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnionScope::Global => write!(f, "global"),
            UnionScope::Ancestors => write!(f, "ancestors"),
        }
    }
}

impl FromStr for UnionScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(UnionScope::Global),
            "ancestors" => Ok(UnionScope::Ancestors),
            _ => Err(format!("unknown union scope `{}`", s)),
        }
    }
}

pub struct IntervalCoarsening {
    budget: usize,
    scope: UnionScope,
    intervals: Vec<Interval>,
    worklist: VecDeque<Interval>,
    marks: AncestorMarks<Interval>,
}

impl IntervalCoarsening {
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            scope: UnionScope::default(),
            intervals: Vec::new(),
            worklist: VecDeque::new(),
            marks: AncestorMarks::default(),
        }
    }

    pub fn with_union_scope(mut self, scope: UnionScope) -> Self {
        self.scope = scope;
        self
    }

    /// Fold `input` into coarser intervals and return them in creation order.
    pub fn run(&mut self, ctx: &mut CfgContext, input: &[Interval]) -> IntervalResult<Vec<Interval>> {
        if self.budget == 0 {
            return Err(IntervalError::ZeroBudget);
        }

        self.intervals.clear();
        self.worklist.clear();

        for &interval in input {
            interval.set_next_level(ctx, None);
        }

        for &interval in input {
            if interval.preds(ctx).is_empty() {
                self.open(ctx, interval);
            }
        }

        let global = match self.scope {
            UnionScope::Global => input
                .iter()
                .fold(RegSet::new(), |acc, i| regs::union(&acc, i.regs(ctx))),
            UnionScope::Ancestors => RegSet::new(),
        };

        while let Some(interval) = self.worklist.pop_front() {
            let coarse = interval.next_level(ctx).ok_or_else(|| {
                IntervalError::MalformedGraph(format!(
                    "interval #{} is on the worklist without a next-level interval",
                    interval.id()
                ))
            })?;

            if interval.num_regs(ctx) < self.budget {
                let regs = interval.regs(ctx).clone();
                coarse.set_regs(ctx, regs);
                self.grow(ctx, input, coarse, &global);
            }

            self.propagate(ctx, input, coarse);
        }

        finalize(ctx, input, &self.intervals, self.budget)?;

        debug!(
            "pass two: {} intervals into {} ({} union)",
            input.len(),
            self.intervals.len(),
            self.scope
        );

        Ok(std::mem::take(&mut self.intervals))
    }

    fn open(&mut self, ctx: &mut CfgContext, interval: Interval) {
        let coarse = Interval::new(ctx);
        self.intervals.push(coarse);
        interval.set_next_level(ctx, Some(coarse));
        self.worklist.push_back(interval);
    }

    fn grow(&mut self, ctx: &mut CfgContext, input: &[Interval], coarse: Interval, global: &RegSet) {
        for &cand in input {
            if cand.next_level(ctx).is_some() {
                continue;
            }
            if !cand
                .preds(ctx)
                .iter()
                .all(|&pred| pred == cand || pred.next_level(ctx) == Some(coarse))
            {
                continue;
            }

            let union_len = match self.scope {
                UnionScope::Global => global.len(),
                UnionScope::Ancestors => {
                    self.marks.mark(ctx, cand);
                    let mut union = cand.regs(ctx).clone();
                    for &interval in input {
                        if interval.next_level(ctx) == Some(coarse) && self.marks.is_marked(interval) {
                            union.extend(interval.regs(ctx));
                        }
                    }
                    union.len()
                }
            };
            if union_len >= self.budget {
                continue;
            }

            let footprint = regs::union(coarse.regs(ctx), cand.regs(ctx));
            if footprint.len() >= self.budget {
                continue;
            }

            trace!(
                "interval #{} folds into #{} ({} registers)",
                cand.id(),
                coarse.id(),
                footprint.len()
            );

            cand.set_next_level(ctx, Some(coarse));
            coarse.set_regs(ctx, footprint);
        }
    }

    fn propagate(&mut self, ctx: &mut CfgContext, input: &[Interval], coarse: Interval) {
        let mut frontier = Vec::new();
        for &interval in input {
            if interval.next_level(ctx) != Some(coarse) {
                continue;
            }
            for &succ in interval.succs(ctx) {
                if succ.next_level(ctx).is_none() && !frontier.contains(&succ) {
                    frontier.push(succ);
                }
            }
        }

        for succ in frontier {
            if succ.next_level(ctx).is_none() {
                self.open(ctx, succ);
            }
        }
    }
}
