//! The immutable route table.

use std::sync::Arc;

use axum::http::Method;

use super::pattern::{PathParams, PathPattern};
use crate::error::GatewayError;

/// A registered route: one (method, pattern) bound to a resource action.
#[derive(Debug, Clone)]
pub struct Route {
    pub method: Method,
    pub pattern: PathPattern,
    pub resource: String,
    pub action: String,
}

impl Route {
    /// Route identity, e.g. `GET /api/v2/profile/student/`.
    pub fn id(&self) -> String {
        format!("{} {}", self.method, self.pattern.as_str())
    }
}

/// A successful resolution: the route plus captured path values.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<Route>,
    pub params: PathParams,
}

/// Collects routes, then freezes them into a [`RouteTable`].
///
/// All conflict checking happens in [`RouteTableBuilder::build`]; a table
/// that constructs successfully cannot produce a resolution tie.
#[derive(Default)]
pub struct RouteTableBuilder {
    routes: Vec<(Method, String, String, String)>,
}

impl RouteTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(
        mut self,
        method: Method,
        pattern: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        self.routes
            .push((method, pattern.into(), resource.into(), action.into()));
        self
    }

    pub fn build(self) -> Result<RouteTable, GatewayError> {
        let mut routes: Vec<Arc<Route>> = Vec::with_capacity(self.routes.len());

        for (method, raw, resource, action) in self.routes {
            let pattern = PathPattern::parse(&raw)?;
            let route = Route {
                method,
                pattern,
                resource,
                action,
            };

            for existing in &routes {
                if existing.method != route.method {
                    continue;
                }
                if existing.pattern.segments() == route.pattern.segments() {
                    return Err(GatewayError::DuplicateRoute { route: route.id() });
                }
                // Same specificity + overlapping shape would make resolution
                // order-dependent; reject at startup
                if existing.pattern.param_count() == route.pattern.param_count()
                    && existing.pattern.overlaps(&route.pattern)
                {
                    return Err(GatewayError::AmbiguousRoutes {
                        first: existing.id(),
                        second: route.id(),
                    });
                }
            }

            routes.push(Arc::new(route));
        }

        Ok(RouteTable { routes })
    }
}

/// Read-only lookup structure shared across all request handlers.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.routes.iter()
    }

    /// Resolve a request. Pure lookup: exact method, pattern match, most
    /// specific (fewest placeholders) candidate wins.
    pub fn resolve(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let mut best: Option<RouteMatch> = None;
        for route in &self.routes {
            if route.method != *method {
                continue;
            }
            if let Some(params) = route.pattern.match_path(path) {
                let better = match &best {
                    Some(current) => {
                        route.pattern.param_count() < current.route.pattern.param_count()
                    }
                    None => true,
                };
                if better {
                    best = Some(RouteMatch {
                        route: route.clone(),
                        params,
                    });
                }
            }
        }
        best
    }

    /// Find the route registered under exactly this (method, pattern) shape.
    /// Used to verify legacy mapping targets at startup.
    pub fn route_for_pattern(&self, method: &Method, pattern: &PathPattern) -> Option<Arc<Route>> {
        self.routes
            .iter()
            .find(|r| r.method == *method && r.pattern.segments() == pattern.segments())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::builder()
            .route(Method::GET, "/api/v2/group/sports/", "group", "sports")
            .route(Method::GET, "/api/v2/group/{id:int}/", "group", "retrieve")
            .route(Method::POST, "/api/v2/enrollment/enroll/", "enrollment", "enroll")
            .build()
            .unwrap()
    }

    #[test]
    fn test_resolve_exact_method() {
        let t = table();
        assert!(t.resolve(&Method::GET, "/api/v2/group/sports/").is_some());
        assert!(t.resolve(&Method::POST, "/api/v2/group/sports/").is_none());
    }

    #[test]
    fn test_most_specific_wins() {
        let t = table();
        // "sports" is non-numeric so only the literal route matches, but a
        // numeric segment must hit the capture route
        let m = t.resolve(&Method::GET, "/api/v2/group/7/").unwrap();
        assert_eq!(m.route.action, "retrieve");
        assert_eq!(m.params.int("id"), Some(7));

        let m = t.resolve(&Method::GET, "/api/v2/group/sports").unwrap();
        assert_eq!(m.route.action, "sports");
    }

    #[test]
    fn test_literal_beats_capture_on_overlap() {
        let t = RouteTable::builder()
            .route(Method::GET, "/api/v2/fitnesstest/sessions/", "fitnesstest", "sessions")
            .route(
                Method::GET,
                "/api/v2/fitnesstest/{kind}/",
                "fitnesstest",
                "by-kind",
            )
            .build()
            .unwrap();
        let m = t.resolve(&Method::GET, "/api/v2/fitnesstest/sessions/").unwrap();
        assert_eq!(m.route.action, "sessions");
        let m = t.resolve(&Method::GET, "/api/v2/fitnesstest/result/").unwrap();
        assert_eq!(m.route.action, "by-kind");
    }

    #[test]
    fn test_duplicate_rejected() {
        let err = RouteTable::builder()
            .route(Method::GET, "/api/v2/semester/", "semester", "list")
            .route(Method::GET, "/api/v2/semester/", "semester", "other")
            .build()
            .unwrap_err();
        assert!(matches!(err, GatewayError::DuplicateRoute { .. }));
    }

    #[test]
    fn test_ambiguous_rejected() {
        let err = RouteTable::builder()
            .route(Method::GET, "/api/v2/group/{id:int}/", "group", "retrieve")
            .route(Method::GET, "/api/v2/group/{code}/", "group", "by-code")
            .build()
            .unwrap_err();
        assert!(matches!(err, GatewayError::AmbiguousRoutes { .. }));
    }

    #[test]
    fn test_not_found() {
        let t = table();
        assert!(t.resolve(&Method::GET, "/api/nonexistent").is_none());
    }
}
