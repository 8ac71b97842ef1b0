//! Repeated coarsening until the interval count stops shrinking.

use log::info;

use super::{IntervalCoarsening, IntervalError, IntervalResult, UnionScope};
use crate::graph::{CfgContext, Interval};

pub struct ConvergenceResult {
    /// The intervals produced by the last coarsening pass.
    pub intervals: Vec<Interval>,
    /// The number of coarsening passes run, at least 1.
    pub iterations: usize,
}

pub struct Convergence {
    budget: usize,
    scope: UnionScope,
}

impl Convergence {
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            scope: UnionScope::default(),
        }
    }

    pub fn with_union_scope(mut self, scope: UnionScope) -> Self {
        self.scope = scope;
        self
    }

    /// Coarsen `intervals` until a pass does not reduce their number.
    ///
    /// The first pass always runs. `observer` is called with the context, the
    /// 1-based iteration number and the intervals after every pass, an error
    /// from it stops the loop.
    pub fn run<F, E>(
        &self,
        ctx: &mut CfgContext,
        intervals: Vec<Interval>,
        mut observer: F,
    ) -> Result<ConvergenceResult, E>
    where
        F: FnMut(&CfgContext, usize, &[Interval]) -> Result<(), E>,
        E: From<IntervalError>,
    {
        let mut pass = IntervalCoarsening::new(self.budget).with_union_scope(self.scope);
        let mut intervals = intervals;
        let mut iterations = 0;

        loop {
            let before = intervals.len();
            intervals = pass.run(ctx, &intervals)?;
            iterations += 1;

            info!(
                "iteration {}: {} -> {} intervals",
                iterations,
                before,
                intervals.len()
            );
            observer(&*ctx, iterations, &intervals)?;

            if intervals.len() >= before {
                break;
            }
        }

        Ok(ConvergenceResult {
            intervals,
            iterations,
        })
    }

    pub fn run_to_fixpoint(
        &self,
        ctx: &mut CfgContext,
        intervals: Vec<Interval>,
    ) -> IntervalResult<ConvergenceResult> {
        self.run(ctx, intervals, |_, _, _| Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regs::Reg;

    fn interval(ctx: &mut CfgContext, reg: u32) -> Interval {
        let interval = Interval::new(ctx);
        interval.set_regs(ctx, [Reg::new(reg)].into_iter().collect());
        interval
    }

    #[test]
    fn test_runs_at_least_once() {
        let mut ctx = CfgContext::new();
        let a = interval(&mut ctx, 0);

        let result = Convergence::new(4)
            .run_to_fixpoint(&mut ctx, vec![a])
            .unwrap();
        assert_eq!(result.iterations, 1);
        assert_eq!(result.intervals.len(), 1);
    }

    #[test]
    fn test_observer_sees_every_pass() {
        let mut ctx = CfgContext::new();
        let a = interval(&mut ctx, 0);
        let b = interval(&mut ctx, 1);
        a.add_edge(&mut ctx, b);

        let mut seen = Vec::new();
        let result = Convergence::new(4)
            .run(&mut ctx, vec![a, b], |ctx, iteration, intervals| {
                seen.push((iteration, intervals.len(), intervals[0].num_regs(ctx)));
                Ok::<_, IntervalError>(())
            })
            .unwrap();

        assert_eq!(result.iterations, 2);
        assert_eq!(seen, vec![(1, 1, 2), (2, 1, 2)]);
    }

    #[test]
    fn test_observer_error_stops() {
        let mut ctx = CfgContext::new();
        let a = interval(&mut ctx, 0);

        let result = Convergence::new(4).run(&mut ctx, vec![a], |_, _, _| {
            Err(IntervalError::MalformedGraph("stop".to_string()))
        });
        assert!(result.is_err());
    }
}
