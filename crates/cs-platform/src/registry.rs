//! Table assembly.
//!
//! Builds the canonical route table, the legacy mapping table, and the
//! (resource, action) handler table, then freezes them into an
//! [`ApiGateway`]. Everything here runs once at startup; any conflict,
//! dangling legacy target, or unbound route aborts with a
//! [`GatewayError`].

use std::sync::Arc;

use axum::http::Method;

use cs_gateway::{
    Access, ActionRegistry, ApiGateway, DeprecationPolicy, Dispatcher, FieldKind, GatewayError,
    InputSchema, LegacyTable, RouteTable, UsageRecorder, UsageSink,
};

use cs_common::Role;

use crate::shared::qr::QrTokenSigner;
use crate::shared::store::SportStore;
use crate::{
    analytics, attendance, calendar, enrollment, fitnesstest, group, measurement, medical_group,
    profile, reference, selfsport, semester, training,
};

/// Startup options for the platform gateway.
pub struct PlatformOptions {
    pub deprecation: DeprecationPolicy,
    pub telemetry_buffer: usize,
    pub qr_secret: String,
}

impl Default for PlatformOptions {
    fn default() -> Self {
        Self {
            deprecation: DeprecationPolicy::default(),
            telemetry_buffer: 4096,
            qr_secret: "dev-qr-secret".to_string(),
        }
    }
}

/// The canonical `/api/v2` surface.
fn routes() -> Result<RouteTable, GatewayError> {
    RouteTable::builder()
        // Profile
        .route(Method::GET, "/api/v2/profile/student/", "profile", "student")
        .route(Method::POST, "/api/v2/profile/change-gender/", "profile", "change-gender")
        .route(Method::POST, "/api/v2/profile/toggle-qr/", "profile", "toggle-qr")
        .route(Method::GET, "/api/v2/profile/history/{semester_id:int}/", "profile", "history")
        .route(
            Method::GET,
            "/api/v2/profile/history-with-self/{semester_id:int}/",
            "profile",
            "history-with-self",
        )
        // Enrollment
        .route(Method::POST, "/api/v2/enrollment/enroll/", "enrollment", "enroll")
        .route(Method::POST, "/api/v2/enrollment/unenroll/", "enrollment", "unenroll")
        .route(
            Method::POST,
            "/api/v2/enrollment/unenroll-by-trainer/",
            "enrollment",
            "unenroll-by-trainer",
        )
        // Groups
        .route(Method::GET, "/api/v2/group/{id:int}/", "group", "retrieve")
        .route(Method::GET, "/api/v2/group/sports/", "group", "sports")
        .route(Method::POST, "/api/v2/group/select-sport/", "group", "select-sport")
        // Trainings
        .route(Method::GET, "/api/v2/training/{id:int}/", "training", "retrieve")
        .route(Method::POST, "/api/v2/training/{id:int}/check-in/", "training", "check-in")
        .route(
            Method::POST,
            "/api/v2/training/{id:int}/cancel-check-in/",
            "training",
            "cancel-check-in",
        )
        // Attendance
        .route(Method::POST, "/api/v2/attendance/mark/", "attendance", "mark")
        .route(Method::GET, "/api/v2/attendance/suggest-student/", "attendance", "suggest-student")
        .route(
            Method::GET,
            "/api/v2/attendance/training/{training_id:int}/grades/",
            "attendance",
            "grades",
        )
        .route(
            Method::GET,
            "/api/v2/attendance/student/{student_id:int}/hours/",
            "attendance",
            "student-hours",
        )
        .route(
            Method::GET,
            "/api/v2/attendance/student/{student_id:int}/negative-hours/",
            "attendance",
            "negative-hours",
        )
        .route(
            Method::GET,
            "/api/v2/attendance/student/{student_id:int}/better-than/",
            "attendance",
            "better-than",
        )
        // Calendar
        .route(
            Method::GET,
            "/api/v2/calendar/sport/{sport_id:int}/schedule/",
            "calendar",
            "sport-schedule",
        )
        .route(Method::GET, "/api/v2/calendar/trainings/", "calendar", "trainings")
        // References
        .route(Method::POST, "/api/v2/reference/upload/", "reference", "upload")
        // Self sport
        .route(Method::POST, "/api/v2/selfsport/upload/", "selfsport", "upload")
        .route(Method::GET, "/api/v2/selfsport/types/", "selfsport", "types")
        .route(Method::GET, "/api/v2/selfsport/strava-parsing/", "selfsport", "strava-parsing")
        // Fitness tests
        .route(Method::GET, "/api/v2/fitnesstest/result/", "fitnesstest", "result")
        .route(Method::POST, "/api/v2/fitnesstest/upload/", "fitnesstest", "upload")
        .route(Method::GET, "/api/v2/fitnesstest/exercises/", "fitnesstest", "exercises")
        .route(Method::GET, "/api/v2/fitnesstest/sessions/", "fitnesstest", "sessions")
        .route(
            Method::GET,
            "/api/v2/fitnesstest/sessions/{id:int}/",
            "fitnesstest",
            "session-detail",
        )
        // Measurements
        .route(
            Method::POST,
            "/api/v2/measurement/student-measurement/",
            "measurement",
            "student-measurement",
        )
        .route(Method::GET, "/api/v2/measurement/results/", "measurement", "results")
        .route(Method::GET, "/api/v2/measurement/measurements/", "measurement", "measurements")
        // Semesters, analytics, medical groups
        .route(Method::GET, "/api/v2/semester/", "semester", "list")
        .route(Method::GET, "/api/v2/analytics/attendance/", "analytics", "attendance")
        .route(Method::GET, "/api/v2/medical_groups/", "medical-group", "list")
        .build()
}

/// The deprecated v1 surface, entry for entry from the migration table.
fn legacy_mappings(routes: &RouteTable) -> Result<LegacyTable, GatewayError> {
    const RENAMED: &str = "moved under /api/v2";
    const SNAKE: &str = "snake_case segment renamed";

    LegacyTable::builder()
        .map(Method::GET, "/api/profile/student", "/api/v2/profile/student/", RENAMED)
        .map(Method::POST, "/api/profile/change_gender", "/api/v2/profile/change-gender/", SNAKE)
        .map(Method::POST, "/api/profile/QR/toggle", "/api/v2/profile/toggle-qr/", SNAKE)
        .map(
            Method::GET,
            "/api/profile/history/{semester_id:int}",
            "/api/v2/profile/history/{semester_id:int}/",
            RENAMED,
        )
        .map(
            Method::GET,
            "/api/profile/history_with_self/{semester_id:int}",
            "/api/v2/profile/history-with-self/{semester_id:int}/",
            SNAKE,
        )
        .map(Method::POST, "/api/enrollment/enroll", "/api/v2/enrollment/enroll/", RENAMED)
        .map(Method::POST, "/api/enrollment/unenroll", "/api/v2/enrollment/unenroll/", RENAMED)
        .map(
            Method::POST,
            "/api/enrollment/unenroll_by_trainer",
            "/api/v2/enrollment/unenroll-by-trainer/",
            SNAKE,
        )
        .map(Method::GET, "/api/group/{id:int}", "/api/v2/group/{id:int}/", RENAMED)
        .map(Method::POST, "/api/select_sport", "/api/v2/group/select-sport/", "moved under the group resource")
        .map(Method::GET, "/api/sports", "/api/v2/group/sports/", "moved under the group resource")
        .map(Method::GET, "/api/training/{id:int}", "/api/v2/training/{id:int}/", RENAMED)
        .map(
            Method::POST,
            "/api/training/{id:int}/check_in",
            "/api/v2/training/{id:int}/check-in/",
            SNAKE,
        )
        .map(
            Method::POST,
            "/api/training/{id:int}/cancel_check_in",
            "/api/v2/training/{id:int}/cancel-check-in/",
            SNAKE,
        )
        .map(
            Method::GET,
            "/api/attendance/suggest_student",
            "/api/v2/attendance/suggest-student/",
            SNAKE,
        )
        .map(
            Method::GET,
            "/api/attendance/{training_id:int}/grades",
            "/api/v2/attendance/training/{training_id:int}/grades/",
            "training id now namespaced",
        )
        .map(Method::POST, "/api/attendance/mark", "/api/v2/attendance/mark/", RENAMED)
        .map(
            Method::GET,
            "/api/attendance/{student_id:int}/hours",
            "/api/v2/attendance/student/{student_id:int}/hours/",
            "student id now namespaced",
        )
        .map(
            Method::GET,
            "/api/attendance/{student_id:int}/negative_hours",
            "/api/v2/attendance/student/{student_id:int}/negative-hours/",
            "student id now namespaced",
        )
        .map(
            Method::GET,
            "/api/attendance/{student_id:int}/better_than",
            "/api/v2/attendance/student/{student_id:int}/better-than/",
            "student id now namespaced",
        )
        .map(
            Method::GET,
            "/api/calendar/{sport_id:int}/schedule",
            "/api/v2/calendar/sport/{sport_id:int}/schedule/",
            "sport id now namespaced",
        )
        .map(Method::GET, "/api/calendar/trainings", "/api/v2/calendar/trainings/", RENAMED)
        .map(Method::POST, "/api/reference/upload", "/api/v2/reference/upload/", RENAMED)
        .map(Method::POST, "/api/selfsport/upload", "/api/v2/selfsport/upload/", RENAMED)
        .map(Method::GET, "/api/selfsport/types", "/api/v2/selfsport/types/", RENAMED)
        .map(
            Method::GET,
            "/api/selfsport/strava_parsing",
            "/api/v2/selfsport/strava-parsing/",
            SNAKE,
        )
        .map(Method::GET, "/api/fitnesstest/result", "/api/v2/fitnesstest/result/", RENAMED)
        .map(Method::POST, "/api/fitnesstest/upload", "/api/v2/fitnesstest/upload/", RENAMED)
        .map(Method::GET, "/api/fitnesstest/exercises", "/api/v2/fitnesstest/exercises/", RENAMED)
        .map(Method::GET, "/api/fitnesstest/sessions", "/api/v2/fitnesstest/sessions/", RENAMED)
        .map(
            Method::GET,
            "/api/fitnesstest/sessions/{id:int}",
            "/api/v2/fitnesstest/sessions/{id:int}/",
            RENAMED,
        )
        .map(
            Method::POST,
            "/api/measurement/student_measurement",
            "/api/v2/measurement/student-measurement/",
            SNAKE,
        )
        .map(
            Method::GET,
            "/api/measurement/get_results",
            "/api/v2/measurement/results/",
            "get_ prefix dropped",
        )
        .map(
            Method::GET,
            "/api/measurement/get_measurements",
            "/api/v2/measurement/measurements/",
            "get_ prefix dropped",
        )
        .map(Method::GET, "/api/semester", "/api/v2/semester/", RENAMED)
        .map(Method::GET, "/api/analytics/attendance", "/api/v2/analytics/attendance/", RENAMED)
        .map(Method::GET, "/api/medical_groups/", "/api/v2/medical_groups/", RENAMED)
        .build(routes)
}

/// Bind every (resource, action) pair to its handler.
fn actions(store: Arc<SportStore>, signer: Arc<QrTokenSigner>) -> ActionRegistry {
    let mut registry = ActionRegistry::new();

    // Profile
    let s = store.clone();
    registry = registry.register("profile", "student", Access::student(), InputSchema::empty(), move |ctx| {
        let s = s.clone();
        async move { profile::handlers::student_info(&s, &ctx).await }
    });
    let s = store.clone();
    registry = registry.register(
        "profile",
        "change-gender",
        Access::staff(),
        InputSchema::new()
            .field("student_id", FieldKind::Int)
            .field("gender", FieldKind::Str),
        move |ctx| {
            let s = s.clone();
            async move { profile::handlers::change_gender(&s, &ctx).await }
        },
    );
    let s = store.clone();
    registry = registry.register("profile", "toggle-qr", Access::student(), InputSchema::empty(), move |ctx| {
        let s = s.clone();
        async move { profile::handlers::toggle_qr(&s, &ctx).await }
    });
    let s = store.clone();
    registry = registry.register("profile", "history", Access::student(), InputSchema::empty(), move |ctx| {
        let s = s.clone();
        async move { profile::handlers::history(&s, &ctx).await }
    });
    let s = store.clone();
    registry = registry.register(
        "profile",
        "history-with-self",
        Access::student(),
        InputSchema::empty(),
        move |ctx| {
            let s = s.clone();
            async move { profile::handlers::history_with_self(&s, &ctx).await }
        },
    );

    // Enrollment
    let s = store.clone();
    registry = registry.register(
        "enrollment",
        "enroll",
        Access::student(),
        InputSchema::new().field("group_id", FieldKind::Int),
        move |ctx| {
            let s = s.clone();
            async move { enrollment::handlers::enroll(&s, &ctx).await }
        },
    );
    let s = store.clone();
    registry = registry.register(
        "enrollment",
        "unenroll",
        Access::student(),
        InputSchema::new().field("group_id", FieldKind::Int),
        move |ctx| {
            let s = s.clone();
            async move { enrollment::handlers::unenroll(&s, &ctx).await }
        },
    );
    let s = store.clone();
    registry = registry.register(
        "enrollment",
        "unenroll-by-trainer",
        Access::trainer(),
        InputSchema::new()
            .field("group_id", FieldKind::Int)
            .field("student_id", FieldKind::Int),
        move |ctx| {
            let s = s.clone();
            async move { enrollment::handlers::unenroll_by_trainer(&s, &ctx).await }
        },
    );

    // Groups
    let s = store.clone();
    registry = registry.register("group", "retrieve", Access::Public, InputSchema::empty(), move |ctx| {
        let s = s.clone();
        async move { group::handlers::retrieve(&s, &ctx).await }
    });
    let s = store.clone();
    registry = registry.register("group", "sports", Access::Public, InputSchema::empty(), move |ctx| {
        let s = s.clone();
        async move { group::handlers::sports(&s, &ctx).await }
    });
    let s = store.clone();
    registry = registry.register(
        "group",
        "select-sport",
        Access::student(),
        InputSchema::new().field("sport_id", FieldKind::Int),
        move |ctx| {
            let s = s.clone();
            async move { group::handlers::select_sport(&s, &ctx).await }
        },
    );

    // Trainings
    let s = store.clone();
    registry = registry.register(
        "training",
        "retrieve",
        Access::Authenticated,
        InputSchema::empty(),
        move |ctx| {
            let s = s.clone();
            async move { training::handlers::retrieve(&s, &ctx).await }
        },
    );
    let s = store.clone();
    let qr = signer.clone();
    registry = registry.register(
        "training",
        "check-in",
        Access::student(),
        InputSchema::new().optional("qr_token", FieldKind::Str),
        move |ctx| {
            let s = s.clone();
            let qr = qr.clone();
            async move { training::handlers::check_in(&s, &qr, &ctx).await }
        },
    );
    let s = store.clone();
    registry = registry.register(
        "training",
        "cancel-check-in",
        Access::student(),
        InputSchema::empty(),
        move |ctx| {
            let s = s.clone();
            async move { training::handlers::cancel_check_in(&s, &ctx).await }
        },
    );

    // Attendance
    let s = store.clone();
    registry = registry.register(
        "attendance",
        "mark",
        Access::trainer(),
        InputSchema::new()
            .field("training_id", FieldKind::Int)
            .field("students_hours", FieldKind::Array),
        move |ctx| {
            let s = s.clone();
            async move { attendance::handlers::mark(&s, &ctx).await }
        },
    );
    let s = store.clone();
    registry = registry.register(
        "attendance",
        "suggest-student",
        Access::trainer(),
        InputSchema::new()
            .field("group_id", FieldKind::Int)
            .optional("term", FieldKind::Str),
        move |ctx| {
            let s = s.clone();
            async move { attendance::handlers::suggest_student(&s, &ctx).await }
        },
    );
    let s = store.clone();
    registry = registry.register("attendance", "grades", Access::trainer(), InputSchema::empty(), move |ctx| {
        let s = s.clone();
        async move { attendance::handlers::grades(&s, &ctx).await }
    });
    let s = store.clone();
    registry = registry.register(
        "attendance",
        "student-hours",
        Access::Roles(vec![Role::Student, Role::Staff]),
        InputSchema::new().optional("current_semester_only", FieldKind::Bool),
        move |ctx| {
            let s = s.clone();
            async move { attendance::handlers::student_hours(&s, &ctx).await }
        },
    );
    let s = store.clone();
    registry = registry.register(
        "attendance",
        "negative-hours",
        Access::Roles(vec![Role::Student, Role::Staff]),
        InputSchema::empty(),
        move |ctx| {
            let s = s.clone();
            async move { attendance::handlers::negative_hours(&s, &ctx).await }
        },
    );
    let s = store.clone();
    registry = registry.register(
        "attendance",
        "better-than",
        Access::Roles(vec![Role::Student, Role::Staff]),
        InputSchema::empty(),
        move |ctx| {
            let s = s.clone();
            async move { attendance::handlers::better_than(&s, &ctx).await }
        },
    );

    // Calendar
    let s = store.clone();
    registry = registry.register(
        "calendar",
        "sport-schedule",
        Access::Public,
        InputSchema::empty(),
        move |ctx| {
            let s = s.clone();
            async move { calendar::sport_schedule(&s, &ctx).await }
        },
    );
    let s = store.clone();
    registry = registry.register(
        "calendar",
        "trainings",
        Access::student_or_trainer(),
        InputSchema::new()
            .optional("start", FieldKind::Str)
            .optional("end", FieldKind::Str),
        move |ctx| {
            let s = s.clone();
            async move { calendar::personal_trainings(&s, &ctx).await }
        },
    );

    // References
    let s = store.clone();
    registry = registry.register(
        "reference",
        "upload",
        Access::student(),
        InputSchema::new()
            .field("link", FieldKind::Str)
            .optional("student_comment", FieldKind::Str),
        move |ctx| {
            let s = s.clone();
            async move { reference::upload(&s, &ctx).await }
        },
    );

    // Self sport
    let s = store.clone();
    registry = registry.register(
        "selfsport",
        "upload",
        Access::student(),
        InputSchema::new()
            .field("training_type_id", FieldKind::Int)
            .field("link", FieldKind::Str)
            .optional("hours", FieldKind::Number),
        move |ctx| {
            let s = s.clone();
            async move { selfsport::upload(&s, &ctx).await }
        },
    );
    let s = store.clone();
    registry = registry.register("selfsport", "types", Access::Public, InputSchema::empty(), move |ctx| {
        let s = s.clone();
        async move { selfsport::types(&s, &ctx).await }
    });
    let s = store.clone();
    registry = registry.register(
        "selfsport",
        "strava-parsing",
        Access::student(),
        InputSchema::new().field("link", FieldKind::Str),
        move |ctx| {
            let s = s.clone();
            async move { selfsport::strava_parsing(&s, &ctx).await }
        },
    );

    // Fitness tests
    let s = store.clone();
    registry = registry.register("fitnesstest", "result", Access::student(), InputSchema::empty(), move |ctx| {
        let s = s.clone();
        async move { fitnesstest::handlers::result(&s, &ctx).await }
    });
    let s = store.clone();
    registry = registry.register(
        "fitnesstest",
        "upload",
        Access::trainer(),
        InputSchema::new()
            .field("semester_id", FieldKind::Int)
            .field("results", FieldKind::Array)
            .optional("retake", FieldKind::Bool),
        move |ctx| {
            let s = s.clone();
            async move { fitnesstest::handlers::upload(&s, &ctx).await }
        },
    );
    let s = store.clone();
    registry = registry.register(
        "fitnesstest",
        "exercises",
        Access::Public,
        InputSchema::empty(),
        move |ctx| {
            let s = s.clone();
            async move { fitnesstest::handlers::exercises(&s, &ctx).await }
        },
    );
    let s = store.clone();
    registry = registry.register(
        "fitnesstest",
        "sessions",
        Access::trainer(),
        InputSchema::empty(),
        move |ctx| {
            let s = s.clone();
            async move { fitnesstest::handlers::sessions(&s, &ctx).await }
        },
    );
    let s = store.clone();
    registry = registry.register(
        "fitnesstest",
        "session-detail",
        Access::trainer(),
        InputSchema::empty(),
        move |ctx| {
            let s = s.clone();
            async move { fitnesstest::handlers::session_detail(&s, &ctx).await }
        },
    );

    // Measurements
    let s = store.clone();
    registry = registry.register(
        "measurement",
        "student-measurement",
        Access::student(),
        InputSchema::new()
            .field("measurement_id", FieldKind::Int)
            .field("value", FieldKind::Number),
        move |ctx| {
            let s = s.clone();
            async move { measurement::student_measurement(&s, &ctx).await }
        },
    );
    let s = store.clone();
    registry = registry.register(
        "measurement",
        "results",
        Access::student(),
        InputSchema::empty(),
        move |ctx| {
            let s = s.clone();
            async move { measurement::results(&s, &ctx).await }
        },
    );
    let s = store.clone();
    registry = registry.register(
        "measurement",
        "measurements",
        Access::Public,
        InputSchema::empty(),
        move |ctx| {
            let s = s.clone();
            async move { measurement::measurements(&s, &ctx).await }
        },
    );

    // Semesters, analytics, medical groups
    let s = store.clone();
    registry = registry.register(
        "semester",
        "list",
        Access::Public,
        InputSchema::new().optional("current", FieldKind::Bool),
        move |ctx| {
            let s = s.clone();
            async move { semester::list(&s, &ctx).await }
        },
    );
    let s = store.clone();
    registry = registry.register(
        "analytics",
        "attendance",
        Access::staff(),
        InputSchema::empty(),
        move |ctx| {
            let s = s.clone();
            async move { analytics::attendance(&s, &ctx).await }
        },
    );
    let s = store;
    registry = registry.register(
        "medical-group",
        "list",
        Access::Public,
        InputSchema::empty(),
        move |ctx| {
            let s = s.clone();
            async move { medical_group::list(&s, &ctx).await }
        },
    );

    registry
}

/// Assemble a ready gateway over the given store and telemetry sink.
///
/// Must run inside a tokio runtime (the usage recorder spawns its drain
/// task).
pub fn build_gateway(
    store: Arc<SportStore>,
    sink: Arc<dyn UsageSink>,
    options: PlatformOptions,
) -> Result<Arc<ApiGateway>, GatewayError> {
    let routes = routes()?;
    let legacy = legacy_mappings(&routes)?;
    let signer = Arc::new(QrTokenSigner::new(&options.qr_secret));
    let dispatcher = Dispatcher::new(actions(store, signer), &routes)?;
    let recorder = UsageRecorder::spawn(options.telemetry_buffer, sink);

    Ok(Arc::new(ApiGateway::new(
        routes,
        legacy,
        dispatcher,
        recorder,
        options.deprecation,
    )))
}
