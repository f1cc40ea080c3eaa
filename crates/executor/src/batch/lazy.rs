use std::{cell::RefCell, fmt, rc::Rc};

use error::ErrorCode;

use crate::{FieldError, Resolved};

/// A value that will be available later, shared by every clone.
///
/// Syncing runs the deferred computation once and caches its outcome. The outcome may itself be
/// another lazy value.
#[derive(Clone)]
pub struct Lazy(Rc<RefCell<LazyState>>);

enum LazyState {
    Pending(Box<dyn FnOnce() -> Resolved>),
    Syncing,
    Done(Resolved),
}

impl Lazy {
    pub fn new(f: impl FnOnce() -> Resolved + 'static) -> Self {
        Lazy(Rc::new(RefCell::new(LazyState::Pending(Box::new(f)))))
    }

    pub fn ready(value: impl Into<Resolved>) -> Self {
        Lazy(Rc::new(RefCell::new(LazyState::Done(value.into()))))
    }

    pub fn is_ready(&self) -> bool {
        matches!(&*self.0.borrow(), LazyState::Done(_))
    }

    pub fn sync(&self) -> Resolved {
        let state = std::mem::replace(&mut *self.0.borrow_mut(), LazyState::Syncing);
        let value = match state {
            LazyState::Done(value) => value,
            LazyState::Pending(f) => f(),
            LazyState::Syncing => {
                return Resolved::Error(
                    FieldError::new("Lazy value depends on itself").with_code(ErrorCode::InternalServerError),
                );
            }
        };
        *self.0.borrow_mut() = LazyState::Done(value.clone());
        value
    }

    /// Syncs this value and every lazy value it resolves to.
    pub fn sync_all(&self) -> Resolved {
        let mut value = self.sync();
        while let Resolved::Lazy(lazy) = value {
            value = lazy.sync();
        }
        value
    }

    pub fn then(&self, f: impl FnOnce(Resolved) -> Resolved + 'static) -> Lazy {
        let this = self.clone();
        Lazy::new(move || f(this.sync_all()))
    }
}

impl fmt::Debug for Lazy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0.borrow() {
            LazyState::Pending(_) => f.write_str("Lazy(Pending)"),
            LazyState::Syncing => f.write_str("Lazy(Syncing)"),
            LazyState::Done(value) => f.debug_tuple("Lazy").field(value).finish(),
        }
    }
}
