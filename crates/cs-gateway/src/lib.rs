//! CampusSport API Gateway
//!
//! The request-routing and resource-action mapping core for the
//! sports-enrollment REST API migration (v1 legacy paths -> v2 canonical
//! paths):
//! - Typed, pattern-based route resolution with startup conflict detection
//! - Action dispatch with declarative payload validation and a fixed
//!   failure-to-status mapping
//! - Deprecation/compatibility shim rewriting legacy paths onto canonical
//!   routes and stamping sunset metadata on responses
//! - Fire-and-forget usage telemetry for migration-progress tracking
//!
//! Route, action, and legacy tables are assembled once at startup and are
//! immutable afterwards; requests share them without locking.

pub mod dispatch;
pub mod error;
pub mod legacy;
pub mod metrics;
pub mod observe;
pub mod route;
pub mod service;
pub mod telemetry;

pub use error::{ApiResponse, GatewayError};
pub use dispatch::{
    Access, ActionContext, ActionRegistry, Dispatcher, FieldKind, HandlerFailure, HandlerResult,
    InputSchema,
};
pub use legacy::{DeprecationPolicy, LegacyTable, LegacyTableBuilder};
pub use route::{PathParams, PathPattern, Route, RouteTable, RouteTableBuilder};
pub use service::{gateway_router, ApiGateway};
pub use telemetry::{MemorySink, TracingSink, UsageRecorder, UsageSink};
