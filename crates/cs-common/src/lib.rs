use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod logging;

// ============================================================================
// Caller Identity
// ============================================================================

/// Roles forwarded by the authenticating reverse proxy.
///
/// The proxy terminates authentication and passes the resolved identity in
/// `X-User-Id` / `X-User-Roles` headers; this service only interprets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Trainer,
    Staff,
}

impl Role {
    /// Parse a single role token, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Role::Student),
            "trainer" => Some(Role::Trainer),
            "staff" | "admin" => Some(Role::Staff),
            _ => None,
        }
    }
}

/// The identity a request is made on behalf of.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Option<i64>,
    pub roles: Vec<Role>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn new(user_id: i64, roles: Vec<Role>) -> Self {
        Self {
            user_id: Some(user_id),
            roles,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Stable label for logs and usage records ("anonymous" when unknown).
    pub fn label(&self) -> String {
        match self.user_id {
            Some(id) => id.to_string(),
            None => "anonymous".to_string(),
        }
    }
}

// ============================================================================
// Route Variants & Usage Records
// ============================================================================

/// Which spelling of a route served a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteVariant {
    Canonical,
    Legacy,
}

impl RouteVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteVariant::Canonical => "canonical",
            RouteVariant::Legacy => "legacy",
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, RouteVariant::Legacy)
    }
}

/// One completed request, as seen by migration-progress reporting.
///
/// Records are append-only and consumed asynchronously; nothing on the
/// request path ever waits for one to be persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: String,
    /// Route identity, e.g. `GET /api/v2/profile/student/`.
    pub route: String,
    pub resource: String,
    pub action: String,
    pub variant: RouteVariant,
    pub status: u16,
    /// User id or `anonymous`.
    pub caller: String,
    pub recorded_at: DateTime<Utc>,
}

impl UsageRecord {
    pub fn new(
        route: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
        variant: RouteVariant,
        status: u16,
        caller: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            route: route.into(),
            resource: resource.into(),
            action: action.into(),
            variant,
            status,
            caller: caller.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// Counters kept by the usage recorder.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TelemetryStats {
    pub recorded: u64,
    pub dropped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!(Role::parse("student"), Some(Role::Student));
        assert_eq!(Role::parse(" TRAINER "), Some(Role::Trainer));
        assert_eq!(Role::parse("admin"), Some(Role::Staff));
        assert_eq!(Role::parse("wizard"), None);
    }

    #[test]
    fn test_caller_label() {
        assert_eq!(Caller::anonymous().label(), "anonymous");
        assert_eq!(Caller::new(42, vec![Role::Student]).label(), "42");
    }

    #[test]
    fn test_usage_record_roundtrip() {
        let record = UsageRecord::new(
            "GET /api/v2/semester/",
            "semester",
            "list",
            RouteVariant::Legacy,
            200,
            "anonymous",
        );
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"variant\":\"legacy\""));
        assert!(json.contains("semester"));
    }
}
