use std::collections::{BTreeMap, VecDeque};

use super::{BoxedStep, Runtime};

/// Steps ready to run, and suspended ones bucketed by depth.
#[derive(Default)]
pub(crate) struct RunQueue<'a> {
    ready: VecDeque<BoxedStep<'a>>,
    pending: BTreeMap<usize, Vec<BoxedStep<'a>>>,
}

impl<'a> RunQueue<'a> {
    pub fn push(&mut self, step: BoxedStep<'a>) {
        self.ready.push_back(step);
    }

    pub fn suspend(&mut self, step: BoxedStep<'a>) {
        self.pending.entry(step.depth()).or_default().push(step);
    }

    pub fn pop_ready(&mut self) -> Option<BoxedStep<'a>> {
        self.ready.pop_front()
    }

    /// Makes every step of the shallowest pending depth ready again. Returns that depth and the
    /// number of resumed steps.
    pub fn resume_shallowest(&mut self) -> Option<(usize, usize)> {
        let (depth, steps) = self.pending.pop_first()?;
        let count = steps.len();
        self.ready.extend(steps);
        Some((depth, count))
    }

    pub fn is_empty(&self) -> bool {
        self.ready.is_empty() && self.pending.is_empty()
    }
}

impl<'a> Runtime<'a> {
    /// Runs everything enqueued, including what gets enqueued meanwhile, until no step is left.
    pub(super) fn complete(&mut self) {
        loop {
            while let Some(step) = self.queue.pop_ready() {
                self.call_step(step);
            }
            if self.queue.is_empty() {
                return;
            }

            let batched = self.ctx.dataloader().run_pending();
            if let Some((depth, steps)) = self.queue.resume_shallowest() {
                tracing::debug!(depth, steps, batched, "resuming pending steps");
            }
        }
    }

    /// Runs `step` and everything it enqueues before returning, apart from steps enqueued
    /// earlier.
    pub(super) fn run_isolated(&mut self, step: BoxedStep<'a>) {
        if self.config.dataloader.clear_between_mutation_fields {
            self.ctx.dataloader().clear_cache();
        }
        let outer = std::mem::take(&mut self.queue);
        self.queue.push(step);
        self.complete();
        self.queue = outer;
    }
}
