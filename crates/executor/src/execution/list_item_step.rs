use std::rc::Rc;

use error::ErrorPathSegment;

use super::{FieldPosition, Runtime, Slot, Step, StepState, step::settle};
use crate::{Lazy, Resolved, TypeRef, response::ResultId};

/// Completes one item of a list field and writes it at its index.
pub(crate) struct ListItemStep<'a> {
    position: Rc<FieldPosition<'a>>,
    list: ResultId,
    index: usize,
    item: Option<Resolved>,
    item_type: &'a TypeRef,
    depth: usize,
    pending: Option<Lazy>,
}

impl<'a> ListItemStep<'a> {
    pub fn new(
        position: Rc<FieldPosition<'a>>,
        list: ResultId,
        index: usize,
        item: Resolved,
        item_type: &'a TypeRef,
        depth: usize,
    ) -> Self {
        ListItemStep {
            position,
            list,
            index,
            item: Some(item),
            item_type,
            depth,
            pending: None,
        }
    }
}

impl<'a> Step<'a> for ListItemStep<'a> {
    fn depth(&self) -> usize {
        self.depth
    }

    fn run_step(&mut self, runtime: &mut Runtime<'a>) -> StepState {
        if runtime.tree.is_dead(self.list) {
            return StepState::Finished;
        }
        tracing::trace!(
            field = self.position.response_key,
            index = self.index,
            position = runtime.tree.corrected_index(self.list, self.index),
            "list item step"
        );

        let item = match self.pending.take() {
            Some(lazy) => lazy.sync(),
            None => self.item.take().unwrap_or_else(Resolved::null),
        };
        let item = match settle(item) {
            Ok(item) => item,
            Err(lazy) => {
                self.pending = Some(lazy);
                return StepState::Suspended;
            }
        };

        let slot = Slot {
            result: self.list,
            key: ErrorPathSegment::Index(self.index),
            ty: self.item_type,
        };
        if let Some(completed) = runtime.continue_value(&slot, &self.position, item) {
            runtime.continue_field(&slot, &self.position, completed);
        }
        StepState::Finished
    }
}
