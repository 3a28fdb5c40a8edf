//! # Pewter Framework
//!
//! Routing layer for the Pewter bot framework.
//!
//! This layer provides:
//! - Filters and routes that select handler chains for an update
//! - A router tree with state-scoped views and middleware groups
//! - A pooled per-update [`Context`] with cooperative `next()` chaining
//! - Built-in middleware (panic recovery, cancellation)
//! - A tower [`Service`](tower::Service) adapter for the root router
//!
//! The dispatcher and transports live in separate crates and only see the
//! router through [`pewter_core::UpdateHandler`].

pub mod context;
pub mod error;
pub mod filter;
pub mod handler;
pub mod middleware;
pub mod route;
pub mod router;
pub mod service;

pub use filter as filters;

pub use context::{Context, ContextPool, DEFAULT_MAX_IDLE};
pub use error::{HandlerResult, RouterError};
pub use filter::Filter;
pub use handler::{
    BoxFuture, BoxedErrorHandler, BoxedHandler, ErrorHandler, Handler, boxed, error_handler,
    handler,
};
pub use route::{Route, RouteHandle};
pub use router::{Router, RouterBuilder};
pub use service::{Dispatch, RouterService, ServiceHandler};
