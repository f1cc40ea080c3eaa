use super::Runtime;
use crate::{Lazy, Resolved};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepState {
    /// Run the next phase right away.
    Continue,
    /// Waiting on a lazy value, resumed with the other steps pending at the same depth.
    Suspended,
    Finished,
}

/// A resumable unit of work, run phase by phase until it finishes.
pub(crate) trait Step<'a> {
    fn depth(&self) -> usize;

    fn run_step(&mut self, runtime: &mut Runtime<'a>) -> StepState;
}

pub(crate) type BoxedStep<'a> = Box<dyn Step<'a> + 'a>;

impl<'a> Runtime<'a> {
    pub(super) fn call_step(&mut self, mut step: BoxedStep<'a>) {
        loop {
            match step.run_step(self) {
                StepState::Continue => continue,
                StepState::Suspended => {
                    self.queue.suspend(step);
                    return;
                }
                StepState::Finished => return,
            }
        }
    }
}

/// Unwraps lazy values which are already available. A pending one is handed back to suspend on.
pub(super) fn settle(mut value: Resolved) -> Result<Resolved, Lazy> {
    loop {
        value = match value {
            Resolved::Lazy(lazy) if lazy.is_ready() => lazy.sync(),
            Resolved::Lazy(lazy) => return Err(lazy),
            other => return Ok(other),
        };
    }
}
