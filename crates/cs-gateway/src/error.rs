//! Gateway Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

/// Startup/configuration errors.
///
/// Every variant is fatal: the tables are validated while they are built,
/// so a misconfigured route set never reaches request handling.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Duplicate route registration: {route}")]
    DuplicateRoute { route: String },

    #[error("Ambiguous route patterns: '{first}' and '{second}' overlap with equal specificity")]
    AmbiguousRoutes { first: String, second: String },

    #[error("Duplicate legacy mapping: {mapping}")]
    DuplicateLegacyMapping { mapping: String },

    #[error("Legacy mapping '{legacy}' targets unregistered route '{target}'")]
    DanglingLegacyTarget { legacy: String, target: String },

    #[error("Legacy mapping '{legacy}' captures no '{param}' required by its target")]
    MissingRewriteParam { legacy: String, param: String },

    #[error("Route '{route}' references unknown action {resource}/{action}")]
    UnknownAction {
        route: String,
        resource: String,
        action: String,
    },

    #[error("Duplicate action registration: {resource}/{action}")]
    DuplicateAction { resource: String, action: String },
}

impl GatewayError {
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }
}

/// A fully-formed API response: status plus a JSON body.
///
/// Deprecation headers are not part of this type; the shim stamps them onto
/// the outgoing response without touching the business body.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: serde_json::Value,
}

impl ApiResponse {
    pub fn ok(body: serde_json::Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: serde_json::json!({ "detail": detail.into() }),
        }
    }

    pub fn validation_error(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: serde_json::json!({ "detail": detail.into() }),
        }
    }

    /// Business-rule failure with the numbered error code scheme the
    /// frontend already understands.
    pub fn business(code: u32, detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: serde_json::json!({ "error_code": code, "detail": detail.into() }),
        }
    }

    /// Business failure with report fields merged into the body, e.g. the
    /// bad-grade report on attendance marking.
    pub fn business_with(code: u32, detail: impl Into<String>, data: serde_json::Value) -> Self {
        let mut body = serde_json::Map::new();
        body.insert("error_code".to_string(), serde_json::json!(code));
        body.insert("detail".to_string(), serde_json::json!(detail.into()));
        if let serde_json::Value::Object(extra) = data {
            for (key, value) in extra {
                body.entry(key).or_insert(value);
            }
        }
        Self {
            status: StatusCode::BAD_REQUEST,
            body: serde_json::Value::Object(body),
        }
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            body: serde_json::json!({ "detail": detail.into() }),
        }
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            body: serde_json::json!({ "detail": detail.into() }),
        }
    }

    pub fn conflict(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            body: serde_json::json!({ "detail": detail.into() }),
        }
    }

    pub fn unprocessable(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            body: serde_json::json!({ "detail": detail.into() }),
        }
    }

    /// Opaque server error; internal details stay in the logs.
    pub fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: serde_json::json!({ "detail": "Internal server error" }),
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
