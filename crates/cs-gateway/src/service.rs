//! The assembled gateway and its axum integration.
//!
//! Routing semantics (typed captures, specificity, legacy rewriting) live in
//! the gateway's own tables, so the axum side is a single catch-all service
//! plus a small documentation endpoint.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{HeaderMap, Method, Uri},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::Value;
use tracing::warn;

use cs_common::{Caller, Role, RouteVariant, TelemetryStats, UsageRecord};

use crate::dispatch::{ActionContext, Dispatcher};
use crate::error::ApiResponse;
use crate::legacy::{DeprecationPolicy, LegacyTable};
use crate::metrics;
use crate::route::{Route, RouteTable};
use crate::telemetry::UsageRecorder;

/// Request bodies beyond this are rejected before parsing.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Immutable request-processing core: route table, legacy table, dispatch
/// table, deprecation policy, and the usage recorder. Shared via `Arc`
/// across all in-flight requests.
pub struct ApiGateway {
    routes: RouteTable,
    legacy: LegacyTable,
    dispatcher: Dispatcher,
    recorder: Arc<UsageRecorder>,
    policy: DeprecationPolicy,
}

impl ApiGateway {
    pub fn new(
        routes: RouteTable,
        legacy: LegacyTable,
        dispatcher: Dispatcher,
        recorder: Arc<UsageRecorder>,
        policy: DeprecationPolicy,
    ) -> Self {
        Self {
            routes,
            legacy,
            dispatcher,
            recorder,
            policy,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn legacy(&self) -> &LegacyTable {
        &self.legacy
    }

    pub fn telemetry_stats(&self) -> TelemetryStats {
        self.recorder.stats()
    }

    /// Process one request end to end.
    pub async fn handle(
        &self,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> Response {
        let path = uri.path().to_string();
        let caller = caller_from_headers(&headers);

        let payload = match build_payload(uri.query(), &body) {
            Ok(payload) => payload,
            Err(detail) => return ApiResponse::validation_error(detail).into_response(),
        };

        // Legacy shim first: rewrite onto the canonical route, dispatch
        // through the same path, then annotate the response
        if let Some(legacy) = self.legacy.resolve(&method, &path) {
            let route = legacy.mapping.route.clone();
            let ctx = ActionContext::new(caller.clone(), legacy.params.clone(), payload);
            let api_response = self.dispatcher.dispatch(&route, ctx).await;
            let status = api_response.status.as_u16();
            let successor = legacy.successor_path();

            warn!(
                legacy = %legacy.mapping.id(),
                suggested = %successor,
                caller = %caller.label(),
                note = %legacy.mapping.note,
                "Deprecated API usage"
            );

            let mut response = api_response.into_response();
            self.policy.apply(response.headers_mut(), &successor);

            self.record(legacy.mapping.id(), &route, RouteVariant::Legacy, status, &caller);
            return response;
        }

        match self.routes.resolve(&method, &path) {
            Some(resolved) => {
                let ctx = ActionContext::new(caller.clone(), resolved.params, payload);
                let api_response = self.dispatcher.dispatch(&resolved.route, ctx).await;
                let status = api_response.status.as_u16();
                self.record(
                    resolved.route.id(),
                    &resolved.route,
                    RouteVariant::Canonical,
                    status,
                    &caller,
                );
                api_response.into_response()
            }
            None => {
                metrics::record_route_not_found(method.as_str());
                self.recorder.record(UsageRecord::new(
                    format!("{} {}", method, path),
                    "unknown",
                    "unknown",
                    RouteVariant::Canonical,
                    404,
                    caller.label(),
                ));
                ApiResponse::not_found("Not found.").into_response()
            }
        }
    }

    fn record(
        &self,
        route_id: String,
        route: &Route,
        variant: RouteVariant,
        status: u16,
        caller: &Caller,
    ) {
        metrics::record_request(&route.resource, &route.action, variant, status);
        self.recorder.record(UsageRecord::new(
            route_id,
            route.resource.clone(),
            route.action.clone(),
            variant,
            status,
            caller.label(),
        ));
    }
}

/// Build the axum router for the gateway: the catch-all dispatch service
/// plus the route-listing documentation endpoint.
pub fn gateway_router(gateway: Arc<ApiGateway>) -> Router {
    Router::new()
        .route("/api/docs", get(docs))
        .fallback(dispatch_request)
        .with_state(gateway)
}

async fn dispatch_request(State(gateway): State<Arc<ApiGateway>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return ApiResponse::validation_error("Request body too large or unreadable.")
                .into_response()
        }
    };
    gateway
        .handle(parts.method, parts.uri, parts.headers, bytes)
        .await
}

/// Machine-readable listing of the registered surface, generated from the
/// live tables rather than annotations.
async fn docs(State(gateway): State<Arc<ApiGateway>>) -> Json<Value> {
    let routes: Vec<Value> = gateway
        .routes()
        .iter()
        .map(|r| {
            serde_json::json!({
                "method": r.method.as_str(),
                "path": r.pattern.as_str(),
                "resource": r.resource,
                "action": r.action,
            })
        })
        .collect();

    let deprecated: Vec<Value> = gateway
        .legacy()
        .iter()
        .map(|m| {
            serde_json::json!({
                "method": m.method.as_str(),
                "path": m.pattern.as_str(),
                "successor": m.target.as_str(),
                "note": m.note,
            })
        })
        .collect();

    Json(serde_json::json!({
        "routes": routes,
        "deprecated": deprecated,
    }))
}

/// Identity as forwarded by the authenticating reverse proxy.
fn caller_from_headers(headers: &HeaderMap) -> Caller {
    let user_id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok());

    let Some(user_id) = user_id else {
        return Caller::anonymous();
    };

    let roles: Vec<Role> = headers
        .get("x-user-roles")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').filter_map(Role::parse).collect())
        .unwrap_or_default();

    Caller::new(user_id, roles)
}

/// Merge query parameters and JSON body into the payload the dispatcher
/// validates. Body fields win on collision; query values are coerced to
/// integers/booleans where they parse as such.
fn build_payload(query: Option<&str>, body: &[u8]) -> Result<Value, String> {
    let mut map = serde_json::Map::new();

    if let Some(query) = query {
        for (key, value) in parse_query(query) {
            map.insert(key, coerce_query_value(value));
        }
    }

    if !body.is_empty() {
        let parsed: Value = serde_json::from_slice(body)
            .map_err(|_| "Request body is not valid JSON.".to_string())?;
        match parsed {
            Value::Object(fields) => {
                for (key, value) in fields {
                    map.insert(key, value);
                }
            }
            Value::Null => {}
            other => {
                if map.is_empty() {
                    return Ok(other);
                }
                return Err("Request body must be a JSON object.".to_string());
            }
        }
    }

    Ok(Value::Object(map))
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (key, value) = part.split_once('=').unwrap_or((part, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

fn coerce_query_value(value: String) -> Value {
    if let Ok(int) = value.parse::<i64>() {
        return Value::from(int);
    }
    match value.as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(value),
    }
}
