//! Deferred values and request-scoped batch loading.
//!
//! A resolver returning a [`Lazy`] suspends its field; the runtime resumes every field pending at
//! the same depth together, after [`Dataloader::run_pending`] has issued one `load` call per
//! [`Source`] for all the keys registered in the meantime.

mod dataloader;
mod lazy;

pub use dataloader::{Dataloader, Loader, Source};
pub use lazy::Lazy;
