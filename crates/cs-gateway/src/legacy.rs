//! Deprecation/Compatibility Shim
//!
//! A static table mapping each deprecated (method, path pattern) to its
//! canonical replacement route. The table is verified against the route
//! table when it is built: a legacy entry whose target is not a registered
//! canonical route is a fatal startup error, as is a target placeholder the
//! legacy pattern does not capture.
//!
//! At request time the shim only rewrites and annotates; the rewritten
//! request flows through the exact same dispatch path as a canonical one.

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderValue, Method};

use crate::error::GatewayError;
use crate::route::{PathParams, PathPattern, Route, RouteTable};

/// Verbatim `Warning` header payload for every legacy response.
pub const DEPRECATION_WARNING: &str =
    "299 - \"This API version is deprecated. Please migrate to v2.\"";

/// Values stamped onto legacy responses alongside the fixed header set.
#[derive(Debug, Clone)]
pub struct DeprecationPolicy {
    /// Planned removal date (`Sunset` header)
    pub sunset_date: String,
    /// Migration guide URL (`X-API-Migration-Guide` header)
    pub migration_guide_url: String,
}

impl Default for DeprecationPolicy {
    fn default() -> Self {
        Self {
            sunset_date: "2025-12-31".to_string(),
            migration_guide_url: "https://docs.example.com/api-migration".to_string(),
        }
    }
}

impl DeprecationPolicy {
    /// Add the full deprecation header set to a response, `successor` being
    /// the concrete canonical path for this request.
    pub fn apply(&self, headers: &mut HeaderMap, successor: &str) {
        let set = |headers: &mut HeaderMap, name: &'static str, value: String| {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(name, value);
            }
        };

        set(headers, "deprecation", "true".to_string());
        set(headers, "sunset", self.sunset_date.clone());
        set(
            headers,
            "link",
            format!("<{}>; rel=\"successor-version\"", successor),
        );
        set(headers, "warning", DEPRECATION_WARNING.to_string());
        set(
            headers,
            "x-api-deprecated",
            "This endpoint is deprecated".to_string(),
        );
        set(
            headers,
            "x-api-migration-guide",
            self.migration_guide_url.clone(),
        );
        set(headers, "x-api-new-endpoint", successor.to_string());
    }
}

/// One legacy mapping, with its canonical target resolved at build time.
#[derive(Debug, Clone)]
pub struct LegacyMapping {
    pub method: Method,
    pub pattern: PathPattern,
    pub target: PathPattern,
    /// Human-readable migration note, logged on every hit
    pub note: String,
    /// The canonical route this mapping forwards to
    pub route: Arc<Route>,
}

impl LegacyMapping {
    pub fn id(&self) -> String {
        format!("{} {}", self.method, self.pattern.as_str())
    }
}

/// A matched legacy request.
#[derive(Debug, Clone)]
pub struct LegacyMatch {
    pub mapping: Arc<LegacyMapping>,
    pub params: PathParams,
}

impl LegacyMatch {
    /// The concrete canonical path this request rewrites to.
    pub fn successor_path(&self) -> String {
        // Build-time checks guarantee every target placeholder is captured
        self.mapping
            .target
            .render(&self.params)
            .unwrap_or_else(|| self.mapping.target.as_str().to_string())
    }
}

#[derive(Default)]
pub struct LegacyTableBuilder {
    entries: Vec<(Method, String, String, String)>,
}

impl LegacyTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(
        mut self,
        method: Method,
        legacy: impl Into<String>,
        target: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        self.entries
            .push((method, legacy.into(), target.into(), note.into()));
        self
    }

    /// Freeze the table, verifying every entry against the route table.
    pub fn build(self, routes: &RouteTable) -> Result<LegacyTable, GatewayError> {
        let mut mappings: Vec<Arc<LegacyMapping>> = Vec::with_capacity(self.entries.len());

        for (method, legacy_raw, target_raw, note) in self.entries {
            let pattern = PathPattern::parse(&legacy_raw)?;
            let target = PathPattern::parse(&target_raw)?;
            let id = format!("{} {}", method, pattern.as_str());

            let route = routes
                .route_for_pattern(&method, &target)
                .ok_or_else(|| GatewayError::DanglingLegacyTarget {
                    legacy: id.clone(),
                    target: format!("{} {}", method, target.as_str()),
                })?;

            let legacy_params = pattern.param_names();
            for param in target.param_names() {
                if !legacy_params.contains(&param) {
                    return Err(GatewayError::MissingRewriteParam {
                        legacy: id.clone(),
                        param: param.to_string(),
                    });
                }
            }

            for existing in &mappings {
                if existing.method != method {
                    continue;
                }
                if existing.pattern.segments() == pattern.segments() {
                    return Err(GatewayError::DuplicateLegacyMapping { mapping: id });
                }
                if existing.pattern.param_count() == pattern.param_count()
                    && existing.pattern.overlaps(&pattern)
                {
                    return Err(GatewayError::AmbiguousRoutes {
                        first: existing.id(),
                        second: id,
                    });
                }
            }

            mappings.push(Arc::new(LegacyMapping {
                method,
                pattern,
                target,
                note,
                route,
            }));
        }

        Ok(LegacyTable { mappings })
    }
}

/// Read-only legacy lookup, shared across request handlers.
#[derive(Debug, Clone, Default)]
pub struct LegacyTable {
    mappings: Vec<Arc<LegacyMapping>>,
}

impl LegacyTable {
    pub fn builder() -> LegacyTableBuilder {
        LegacyTableBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<LegacyMapping>> {
        self.mappings.iter()
    }

    /// Match a request against the legacy table; same precedence rules as
    /// the route table. Canonical and documentation paths are never legacy.
    pub fn resolve(&self, method: &Method, path: &str) -> Option<LegacyMatch> {
        if path.starts_with("/api/v2/")
            || path.starts_with("/api/docs")
            || path.starts_with("/api/openapi")
        {
            return None;
        }

        let mut best: Option<LegacyMatch> = None;
        for mapping in &self.mappings {
            if mapping.method != *method {
                continue;
            }
            if let Some(params) = mapping.pattern.match_path(path) {
                let better = match &best {
                    Some(current) => {
                        mapping.pattern.param_count() < current.mapping.pattern.param_count()
                    }
                    None => true,
                };
                if better {
                    best = Some(LegacyMatch {
                        mapping: mapping.clone(),
                        params,
                    });
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::RouteTableBuilder;

    fn routes() -> RouteTable {
        RouteTableBuilder::new()
            .route(Method::GET, "/api/v2/profile/student/", "profile", "student")
            .route(
                Method::POST,
                "/api/v2/training/{id:int}/check-in/",
                "training",
                "check-in",
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_dangling_target_is_fatal() {
        let err = LegacyTable::builder()
            .map(
                Method::GET,
                "/api/semester",
                "/api/v2/semester/",
                "moved under /api/v2",
            )
            .build(&routes())
            .unwrap_err();
        assert!(matches!(err, GatewayError::DanglingLegacyTarget { .. }));
    }

    #[test]
    fn test_missing_rewrite_param_is_fatal() {
        let err = LegacyTable::builder()
            .map(
                Method::POST,
                "/api/training/check_in",
                "/api/v2/training/{id:int}/check-in/",
                "check-in now takes the training id in the path",
            )
            .build(&routes())
            .unwrap_err();
        assert!(matches!(err, GatewayError::MissingRewriteParam { .. }));
    }

    #[test]
    fn test_rewrite_with_params() {
        let table = LegacyTable::builder()
            .map(
                Method::POST,
                "/api/training/{id:int}/check_in",
                "/api/v2/training/{id:int}/check-in/",
                "underscore path renamed",
            )
            .build(&routes())
            .unwrap();

        let m = table.resolve(&Method::POST, "/api/training/7/check_in").unwrap();
        assert_eq!(m.successor_path(), "/api/v2/training/7/check-in/");
        assert_eq!(m.mapping.route.action, "check-in");
    }

    #[test]
    fn test_canonical_paths_never_match() {
        let table = LegacyTable::builder()
            .map(
                Method::GET,
                "/api/profile/student",
                "/api/v2/profile/student/",
                "trailing-slash form",
            )
            .build(&routes())
            .unwrap();
        assert!(table.resolve(&Method::GET, "/api/v2/profile/student/").is_none());
        assert!(table.resolve(&Method::GET, "/api/docs").is_none());
        assert!(table.resolve(&Method::GET, "/api/profile/student").is_some());
    }

    #[test]
    fn test_deprecation_headers_verbatim() {
        let mut headers = HeaderMap::new();
        DeprecationPolicy::default().apply(&mut headers, "/api/v2/profile/student/");

        assert_eq!(headers.get("deprecation").unwrap(), "true");
        assert_eq!(headers.get("sunset").unwrap(), "2025-12-31");
        assert_eq!(
            headers.get("link").unwrap(),
            "</api/v2/profile/student/>; rel=\"successor-version\""
        );
        assert_eq!(
            headers.get("warning").unwrap(),
            "299 - \"This API version is deprecated. Please migrate to v2.\""
        );
        assert_eq!(
            headers.get("x-api-deprecated").unwrap(),
            "This endpoint is deprecated"
        );
        assert_eq!(
            headers.get("x-api-new-endpoint").unwrap(),
            "/api/v2/profile/student/"
        );
        assert!(headers.contains_key("x-api-migration-guide"));
    }
}
