//! Action Dispatcher
//!
//! Validates request payloads against the action's declared input schema,
//! enforces access requirements, invokes the bound handler, and maps
//! handler outcomes to HTTP responses through a fixed table.

mod dispatcher;
mod handler;
mod schema;

pub use dispatcher::Dispatcher;
pub use handler::{
    Access, ActionContext, ActionRegistry, HandlerFailure, HandlerResult, RegisteredAction,
};
pub use schema::{FieldKind, InputSchema};
