//! Dispatch pipeline: access check, payload validation, handler invocation,
//! outcome mapping.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::error;

use crate::error::{ApiResponse, GatewayError};
use crate::route::{Route, RouteTable};

use super::handler::{ActionContext, ActionRegistry, HandlerFailure, RegisteredAction};

/// The frozen (resource, action) -> handler table.
pub struct Dispatcher {
    actions: HashMap<(String, String), Arc<RegisteredAction>>,
}

impl Dispatcher {
    /// Freeze a registry against the route table. Fails if any route lacks
    /// a handler binding or an action was registered twice.
    pub fn new(registry: ActionRegistry, routes: &RouteTable) -> Result<Self, GatewayError> {
        Ok(Self {
            actions: registry.build(routes)?,
        })
    }

    /// Run one request through the action bound to `route`.
    ///
    /// Validation failures short-circuit before the handler runs. Handler
    /// failures are translated by the fixed mapping table; anything
    /// unexpected becomes an opaque server error and is logged with full
    /// request context.
    pub async fn dispatch(&self, route: &Route, ctx: ActionContext) -> ApiResponse {
        let key = (route.resource.clone(), route.action.clone());
        let Some(action) = self.actions.get(&key) else {
            // Construction guarantees a binding; reaching this is a bug
            error!(route = %route.id(), "No handler bound to resolved route");
            return ApiResponse::internal();
        };

        if action.access.requires_authentication() && !ctx.caller.is_authenticated() {
            return ApiResponse::unauthorized("Authentication credentials were not provided.");
        }
        if !action.access.permits(&ctx.caller) {
            return ApiResponse::forbidden(
                "You do not have permission to perform this action.",
            );
        }

        if let Err(violation) = action.schema.validate(&ctx.payload) {
            return ApiResponse::validation_error(violation);
        }

        let caller_label = ctx.caller.label();
        let payload_snapshot = ctx.payload.clone();
        match action.invoke(ctx).await {
            Ok(body) => ApiResponse::ok(body),
            Err(failure) => {
                Self::failure_response(route, &caller_label, &payload_snapshot, failure)
            }
        }
    }

    /// The fixed failure-kind -> status table.
    fn failure_response(
        route: &Route,
        caller: &str,
        payload: &serde_json::Value,
        failure: HandlerFailure,
    ) -> ApiResponse {
        match failure {
            HandlerFailure::NotFound { .. } => ApiResponse::not_found(failure.to_string()),
            HandlerFailure::Conflict { .. } => ApiResponse::conflict(failure.to_string()),
            HandlerFailure::Forbidden { .. } => ApiResponse::forbidden(failure.to_string()),
            HandlerFailure::Unprocessable { .. } => {
                ApiResponse::unprocessable(failure.to_string())
            }
            HandlerFailure::Rule { code, detail, data } => match data {
                Some(data) => ApiResponse::business_with(code, detail, data),
                None => ApiResponse::business(code, detail),
            },
            HandlerFailure::Internal { detail } => {
                error!(
                    route = %route.id(),
                    caller = %caller,
                    payload = %payload,
                    detail = %detail,
                    "Unhandled failure in action handler"
                );
                ApiResponse::internal()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{Access, FieldKind, InputSchema};
    use crate::route::RouteTableBuilder;
    use axum::http::{Method, StatusCode};
    use cs_common::{Caller, Role};
    use serde_json::json;

    fn routes() -> RouteTable {
        RouteTableBuilder::new()
            .route(Method::POST, "/api/v2/enrollment/enroll/", "enrollment", "enroll")
            .build()
            .unwrap()
    }

    fn dispatcher() -> Dispatcher {
        let registry = ActionRegistry::new().register(
            "enrollment",
            "enroll",
            Access::student(),
            InputSchema::new().field("group_id", FieldKind::Int),
            |ctx: ActionContext| async move {
                match ctx.int_field("group_id") {
                    Some(404) => Err(HandlerFailure::not_found("Group", 404)),
                    Some(4) => Err(HandlerFailure::rule(4, "double enroll")),
                    Some(_) => Ok(json!({})),
                    None => Err(HandlerFailure::internal("unreachable")),
                }
            },
        );
        Dispatcher::new(registry, &routes()).unwrap()
    }

    fn ctx(caller: Caller, payload: serde_json::Value) -> ActionContext {
        ActionContext::new(caller, Default::default(), payload)
    }

    fn route() -> Route {
        routes().iter().next().unwrap().as_ref().clone()
    }

    #[tokio::test]
    async fn test_validation_short_circuits() {
        let d = dispatcher();
        let resp = d
            .dispatch(&route(), ctx(Caller::new(1, vec![Role::Student]), json!({})))
            .await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.body["detail"], "group_id: This field is required.");
    }

    #[tokio::test]
    async fn test_access_enforced_before_validation() {
        let d = dispatcher();
        let resp = d.dispatch(&route(), ctx(Caller::anonymous(), json!({}))).await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

        let trainer = Caller::new(9, vec![Role::Trainer]);
        let resp = d.dispatch(&route(), ctx(trainer, json!({"group_id": 1}))).await;
        assert_eq!(resp.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_failure_mapping_table() {
        let d = dispatcher();
        let student = Caller::new(1, vec![Role::Student]);

        let resp = d
            .dispatch(&route(), ctx(student.clone(), json!({"group_id": 404})))
            .await;
        assert_eq!(resp.status, StatusCode::NOT_FOUND);

        let resp = d
            .dispatch(&route(), ctx(student.clone(), json!({"group_id": 4})))
            .await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.body["error_code"], 4);

        let resp = d
            .dispatch(&route(), ctx(student, json!({"group_id": 1})))
            .await;
        assert_eq!(resp.status, StatusCode::OK);
    }

    #[test]
    fn test_unbound_route_rejected_at_startup() {
        let registry = ActionRegistry::new();
        assert!(matches!(
            Dispatcher::new(registry, &routes()),
            Err(GatewayError::UnknownAction { .. })
        ));
    }
}
