//! Resource Router
//!
//! Pattern-based (method, path) -> (resource, action) resolution with typed
//! segment capture. Tables are built once at startup; conflicting or
//! ambiguous registrations fail construction rather than surfacing at
//! request time.

mod pattern;
mod table;

pub use pattern::{ParamKind, ParamValue, PathParams, PathPattern, Segment};
pub use table::{Route, RouteMatch, RouteTable, RouteTableBuilder};
