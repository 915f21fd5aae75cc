//! Handler contracts and the static action registry.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use thiserror::Error;

use cs_common::{Caller, Role};

use crate::error::GatewayError;
use crate::route::PathParams;
use crate::route::RouteTable;

use super::schema::InputSchema;

/// Access requirement of an action.
///
/// Staff satisfies every role requirement (admin override, as in the
/// original permission classes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Public,
    /// Any authenticated caller
    Authenticated,
    /// Any of the listed roles
    Roles(Vec<Role>),
}

impl Access {
    pub fn student() -> Self {
        Access::Roles(vec![Role::Student])
    }

    pub fn trainer() -> Self {
        Access::Roles(vec![Role::Trainer])
    }

    pub fn staff() -> Self {
        Access::Roles(vec![Role::Staff])
    }

    pub fn student_or_trainer() -> Self {
        Access::Roles(vec![Role::Student, Role::Trainer])
    }

    pub fn permits(&self, caller: &Caller) -> bool {
        match self {
            Access::Public => true,
            Access::Authenticated => caller.is_authenticated(),
            Access::Roles(roles) => {
                caller.has_role(Role::Staff) || roles.iter().any(|r| caller.has_role(*r))
            }
        }
    }

    pub fn requires_authentication(&self) -> bool {
        !matches!(self, Access::Public)
    }
}

/// Failure kinds a handler may report.
///
/// The dispatcher maps these to HTTP statuses through a fixed table;
/// handlers never deal in status codes themselves.
#[derive(Debug, Error)]
pub enum HandlerFailure {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("{detail}")]
    Conflict { detail: String },

    #[error("{detail}")]
    Forbidden { detail: String },

    #[error("{detail}")]
    Unprocessable { detail: String },

    /// Numbered business-rule violation (legacy error-code scheme);
    /// `data` fields are merged into the response body when present
    #[error("{detail}")]
    Rule {
        code: u32,
        detail: String,
        data: Option<serde_json::Value>,
    },

    #[error("{detail}")]
    Internal { detail: String },
}

impl HandlerFailure {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::Conflict {
            detail: detail.into(),
        }
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::Forbidden {
            detail: detail.into(),
        }
    }

    pub fn unprocessable(detail: impl Into<String>) -> Self {
        Self::Unprocessable {
            detail: detail.into(),
        }
    }

    pub fn rule(code: u32, detail: impl Into<String>) -> Self {
        Self::Rule {
            code,
            detail: detail.into(),
            data: None,
        }
    }

    pub fn rule_with(code: u32, detail: impl Into<String>, data: serde_json::Value) -> Self {
        Self::Rule {
            code,
            detail: detail.into(),
            data: Some(data),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal {
            detail: detail.into(),
        }
    }
}

pub type HandlerResult = Result<serde_json::Value, HandlerFailure>;

type BoxedHandlerFn =
    Box<dyn Fn(ActionContext) -> Pin<Box<dyn Future<Output = HandlerResult> + Send>> + Send + Sync>;

/// Everything a handler receives for one request.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub caller: Caller,
    pub params: PathParams,
    /// Merged query/body payload; already schema-validated
    pub payload: serde_json::Value,
}

impl ActionContext {
    pub fn new(caller: Caller, params: PathParams, payload: serde_json::Value) -> Self {
        Self {
            caller,
            params,
            payload,
        }
    }

    /// Path placeholder that the pattern guarantees to be present.
    pub fn path_int(&self, name: &str) -> Result<i64, HandlerFailure> {
        self.params
            .int(name)
            .ok_or_else(|| HandlerFailure::internal(format!("missing path parameter '{}'", name)))
    }

    /// The caller's user id; actions behind an access requirement always
    /// have one.
    pub fn user_id(&self) -> Result<i64, HandlerFailure> {
        self.caller
            .user_id
            .ok_or_else(|| HandlerFailure::internal("caller identity missing"))
    }

    /// Deserialize the payload into a typed request.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, HandlerFailure> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| HandlerFailure::unprocessable(e.to_string()))
    }

    /// Optional boolean payload field, tolerant of string spellings coming
    /// from query parameters.
    pub fn flag(&self, name: &str) -> bool {
        match self.payload.get(name) {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    /// Optional string payload field.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.payload.get(name).and_then(|v| v.as_str())
    }

    /// Optional integer payload field.
    pub fn int_field(&self, name: &str) -> Option<i64> {
        self.payload.get(name).and_then(|v| v.as_i64())
    }
}

/// One resolved (resource, action) entry of the static dispatch table.
pub struct RegisteredAction {
    pub resource: String,
    pub action: String,
    pub access: Access,
    pub schema: InputSchema,
    handler: BoxedHandlerFn,
}

impl RegisteredAction {
    pub async fn invoke(&self, ctx: ActionContext) -> HandlerResult {
        (self.handler)(ctx).await
    }
}

/// Collects (resource, action) -> handler bindings, then freezes into the
/// dispatcher. Built once at startup; there is no runtime registration.
#[derive(Default)]
pub struct ActionRegistry {
    actions: HashMap<(String, String), Arc<RegisteredAction>>,
    error: Option<GatewayError>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, Fut>(
        mut self,
        resource: impl Into<String>,
        action: impl Into<String>,
        access: Access,
        schema: InputSchema,
        handler: F,
    ) -> Self
    where
        F: Fn(ActionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        if self.error.is_some() {
            return self;
        }
        let resource = resource.into();
        let action = action.into();
        let key = (resource.clone(), action.clone());
        if self.actions.contains_key(&key) {
            self.error = Some(GatewayError::DuplicateAction { resource, action });
            return self;
        }
        let entry = RegisteredAction {
            resource,
            action,
            access,
            schema,
            handler: Box::new(move |ctx| Box::pin(handler(ctx))),
        };
        self.actions.insert(key, Arc::new(entry));
        self
    }

    /// Freeze the registry, checking that every registered route resolves
    /// to an action.
    pub fn build(
        self,
        routes: &RouteTable,
    ) -> Result<HashMap<(String, String), Arc<RegisteredAction>>, GatewayError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        for route in routes.iter() {
            let key = (route.resource.clone(), route.action.clone());
            if !self.actions.contains_key(&key) {
                return Err(GatewayError::UnknownAction {
                    route: route.id(),
                    resource: route.resource.clone(),
                    action: route.action.clone(),
                });
            }
        }
        Ok(self.actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_checks() {
        let student = Caller::new(1, vec![Role::Student]);
        let staff = Caller::new(2, vec![Role::Staff]);
        let anon = Caller::anonymous();

        assert!(Access::Public.permits(&anon));
        assert!(!Access::Authenticated.permits(&anon));
        assert!(Access::student().permits(&student));
        assert!(!Access::trainer().permits(&student));
        // Staff passes any role requirement
        assert!(Access::trainer().permits(&staff));
    }

    #[test]
    fn test_flag_accepts_query_strings() {
        let ctx = ActionContext::new(
            Caller::anonymous(),
            PathParams::default(),
            serde_json::json!({"current": "true", "other": false}),
        );
        assert!(ctx.flag("current"));
        assert!(!ctx.flag("other"));
        assert!(!ctx.flag("missing"));
    }
}
