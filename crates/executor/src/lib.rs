#![deny(unused_crate_dependencies)]

mod batch;
mod config;
mod engine;
mod execution;
mod resolver;
mod response;
mod schema;

#[cfg(test)]
mod tests;

pub use batch::{Dataloader, Lazy, Loader, Source};
pub use config::{ConfigError, DataloaderConfig, ErrorsConfig, ExecutorConfig, TracingConfig};
pub use engine::{Executor, Request};
pub use error::{ErrorCode, ErrorPath, ErrorPathSegment, GraphqlError, Location};
pub use execution::{
    DirectiveContext, DirectiveOutcome, FieldSpanTracer, Lookahead, RuntimeDirective, TraceField, Tracer,
};
pub use resolver::{
    BoxError, Context, ErrorHandler, ExecutionErrors, FieldError, FieldInfo, Handled, Resolved, ResolverContext,
};
pub use response::Response;
pub use schema::*;
