//! Platform API Integration Tests
//!
//! Drives the assembled gateway end to end over a known store: legacy and
//! canonical equivalence, deprecation headers, the numbered enrollment
//! error scheme, QR check-in, attendance marking, and telemetry.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

use cs_common::RouteVariant;
use cs_gateway::{gateway_router, MemorySink};
use cs_platform::{
    build_gateway, Enroll, Group, PlatformOptions, QrTokenSigner, Semester, Sport, SportStore,
    Student, Trainer,
};
use cs_platform::medical_group::MedicalGroup;
use cs_platform::training::entity::Training;

const QR_SECRET: &str = "test-qr-secret";

struct TestEnv {
    app: Router,
    store: Arc<SportStore>,
    sink: Arc<MemorySink>,
    semester_id: i64,
    football_group: i64,
    basketball_group: i64,
    full_group: i64,
    qr_group: i64,
    training_id: i64,
    qr_training_id: i64,
    student_id: i64,
    other_student_id: i64,
    trainer_id: i64,
}

async fn env() -> TestEnv {
    let store = Arc::new(SportStore::new());

    let medical = store.next_id();
    store
        .medical_groups
        .insert(medical, MedicalGroup::new(medical, "Main", "No restrictions"));

    let football = store.next_id();
    store.sports.insert(football, Sport { id: football, name: "Football".to_string() });
    let basketball = store.next_id();
    store.sports.insert(basketball, Sport { id: basketball, name: "Basketball".to_string() });

    let today = Utc::now().date_naive();
    let semester_id = store.next_id();
    store.semesters.insert(
        semester_id,
        Semester::new(
            semester_id,
            "F25",
            today - chrono::Duration::days(30),
            today + chrono::Duration::days(90),
            true,
        ),
    );

    let trainer_id = store.next_id();
    store
        .trainers
        .insert(trainer_id, Trainer::new(trainer_id, "Anna Kim", "a.kim@example.edu"));

    let football_group = store.next_id();
    store.groups.insert(
        football_group,
        Group::new(football_group, "Football-1", football, semester_id, 20)
            .with_trainers(vec![trainer_id])
            .with_allowed_medical_groups(vec![medical]),
    );
    let basketball_group = store.next_id();
    store.groups.insert(
        basketball_group,
        Group::new(basketball_group, "Basketball-1", basketball, semester_id, 20)
            .with_allowed_medical_groups(vec![medical]),
    );
    let full_group = store.next_id();
    store.groups.insert(
        full_group,
        Group::new(full_group, "Football-tiny", football, semester_id, 1)
            .with_allowed_medical_groups(vec![medical]),
    );
    let qr_group = store.next_id();
    store.groups.insert(
        qr_group,
        Group::new(qr_group, "Football-qr", football, semester_id, 20)
            .with_allowed_medical_groups(vec![medical])
            .with_require_qr(true),
    );

    let student_id = store.next_id();
    store.students.insert(
        student_id,
        Student::new(student_id, "Ivan Petrov", "i.petrov@example.edu", medical)
            .with_sport(football)
            .with_gender("M"),
    );
    let other_student_id = store.next_id();
    store.students.insert(
        other_student_id,
        Student::new(other_student_id, "Maria Sidorova", "m.sidorova@example.edu", medical)
            .with_sport(football),
    );

    // The tiny group is already at capacity
    let enroll_id = store.next_id();
    store
        .enrolls
        .insert(enroll_id, Enroll::new(enroll_id, other_student_id, full_group));

    let now = Utc::now();
    let training_id = store.next_id();
    store.trainings.insert(
        training_id,
        Training::new(
            training_id,
            football_group,
            now - chrono::Duration::minutes(30),
            now + chrono::Duration::minutes(60),
        ),
    );
    let qr_training_id = store.next_id();
    store.trainings.insert(
        qr_training_id,
        Training::new(
            qr_training_id,
            qr_group,
            now - chrono::Duration::minutes(10),
            now + chrono::Duration::minutes(80),
        ),
    );

    let sink = Arc::new(MemorySink::new());
    let gateway = build_gateway(
        store.clone(),
        sink.clone(),
        PlatformOptions {
            qr_secret: QR_SECRET.to_string(),
            ..PlatformOptions::default()
        },
    )
    .expect("gateway must assemble");

    TestEnv {
        app: gateway_router(gateway),
        store,
        sink,
        semester_id,
        football_group,
        basketball_group,
        full_group,
        qr_group,
        training_id,
        qr_training_id,
        student_id,
        other_student_id,
        trainer_id,
    }
}

async fn send(
    app: &Router,
    method: Method,
    path: &str,
    user: Option<(i64, &str)>,
    body: Option<Value>,
) -> (StatusCode, HeaderMap, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some((user_id, roles)) = user {
        builder = builder
            .header("x-user-id", user_id.to_string())
            .header("x-user-roles", roles);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, value)
}

mod equivalence {
    use super::*;

    #[tokio::test]
    async fn test_enroll_same_payload_on_both_variants() {
        let env = env().await;
        let student = Some((env.student_id, "student"));
        let body = json!({"group_id": env.football_group});

        let (legacy_status, legacy_headers, legacy_body) = send(
            &env.app,
            Method::POST,
            "/api/enrollment/enroll",
            student,
            Some(body.clone()),
        )
        .await;
        assert_eq!(legacy_status, StatusCode::OK);
        assert_eq!(legacy_body, json!({}));
        assert_eq!(legacy_headers.get("deprecation").unwrap(), "true");

        // Roll back, then take the canonical path with equivalent input
        send(
            &env.app,
            Method::POST,
            "/api/enrollment/unenroll",
            student,
            Some(body.clone()),
        )
        .await;

        let (canon_status, canon_headers, canon_body) = send(
            &env.app,
            Method::POST,
            "/api/v2/enrollment/enroll/",
            student,
            Some(body),
        )
        .await;
        assert_eq!(canon_status, legacy_status);
        assert_eq!(canon_body, legacy_body);
        assert!(canon_headers.get("deprecation").is_none());
    }

    #[tokio::test]
    async fn test_profile_student_legacy_headers() {
        let env = env().await;

        let (status, headers, body) = send(
            &env.app,
            Method::GET,
            "/api/profile/student",
            Some((env.student_id, "student")),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["name"], "Ivan Petrov");
        assert_eq!(body["gender"], "M");
        assert_eq!(body["has_QR"], false);

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
        assert!(headers.contains_key("x-api-migration-guide"));
        assert_eq!(
            headers.get("x-api-new-endpoint").unwrap(),
            "/api/v2/profile/student/"
        );
    }

    #[tokio::test]
    async fn test_unknown_path_is_404_without_deprecation() {
        let env = env().await;
        let (status, headers, _body) =
            send(&env.app, Method::GET, "/api/nonexistent", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(headers.get("deprecation").is_none());
        assert!(headers.get("sunset").is_none());
    }

    #[tokio::test]
    async fn test_parameterized_legacy_rewrite() {
        let env = env().await;
        let path = format!("/api/training/{}", env.training_id);

        let (status, headers, body) = send(
            &env.app,
            Method::GET,
            &path,
            Some((env.student_id, "student")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["group_name"], "Football-1");
        assert_eq!(
            headers.get("x-api-new-endpoint").unwrap().to_str().unwrap(),
            format!("/api/v2/training/{}/", env.training_id)
        );
    }
}

mod enrollment_rules {
    use super::*;

    #[tokio::test]
    async fn test_double_enroll_is_code_4() {
        let env = env().await;
        let student = Some((env.student_id, "student"));
        let body = json!({"group_id": env.football_group});

        let (status, _, _) = send(
            &env.app,
            Method::POST,
            "/api/v2/enrollment/enroll/",
            student,
            Some(body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, body) = send(
            &env.app,
            Method::POST,
            "/api/v2/enrollment/enroll/",
            student,
            Some(body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], 4);
    }

    #[tokio::test]
    async fn test_sport_mismatch_is_code_8() {
        let env = env().await;
        let (status, _, body) = send(
            &env.app,
            Method::POST,
            "/api/v2/enrollment/enroll/",
            Some((env.student_id, "student")),
            Some(json!({"group_id": env.basketball_group})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], 8);
    }

    #[tokio::test]
    async fn test_full_group_is_code_2() {
        let env = env().await;
        let (status, _, body) = send(
            &env.app,
            Method::POST,
            "/api/v2/enrollment/enroll/",
            Some((env.student_id, "student")),
            Some(json!({"group_id": env.full_group})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], 2);
    }

    #[tokio::test]
    async fn test_unknown_group_is_404() {
        let env = env().await;
        let (status, _, _) = send(
            &env.app,
            Method::POST,
            "/api/v2/enrollment/enroll/",
            Some((env.student_id, "student")),
            Some(json!({"group_id": 999_999})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_group_id_is_validation_error() {
        let env = env().await;
        let (status, _, body) = send(
            &env.app,
            Method::POST,
            "/api/v2/enrollment/enroll/",
            Some((env.student_id, "student")),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "group_id: This field is required.");
    }
}

mod access {
    use super::*;

    #[tokio::test]
    async fn test_anonymous_enroll_is_401() {
        let env = env().await;
        let (status, _, _) = send(
            &env.app,
            Method::POST,
            "/api/v2/enrollment/enroll/",
            None,
            Some(json!({"group_id": env.football_group})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_student_cannot_read_analytics() {
        let env = env().await;
        let (status, _, _) = send(
            &env.app,
            Method::GET,
            "/api/v2/analytics/attendance/",
            Some((env.student_id, "student")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _, _) = send(
            &env.app,
            Method::GET,
            "/api/v2/analytics/attendance/",
            Some((env.trainer_id, "staff")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}

mod checkin {
    use super::*;

    #[tokio::test]
    async fn test_qr_required_group() {
        let env = env().await;
        // Enroll directly so the one-group rule does not interfere
        let enroll_id = env.store.next_id();
        env.store
            .enrolls
            .insert(enroll_id, Enroll::new(enroll_id, env.student_id, env.qr_group));

        let path = format!("/api/v2/training/{}/check-in/", env.qr_training_id);
        let student = Some((env.student_id, "student"));

        let (status, _, body) =
            send(&env.app, Method::POST, &path, student, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], 10);

        let token = QrTokenSigner::new(QR_SECRET).token(env.student_id, env.qr_training_id);
        let (status, _, _) = send(
            &env.app,
            Method::POST,
            &path,
            student,
            Some(json!({"qr_token": token})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(env
            .store
            .checkin(env.student_id, env.qr_training_id)
            .is_some());
    }

    #[tokio::test]
    async fn test_checkin_requires_enrollment_and_rejects_double() {
        let env = env().await;
        let student = Some((env.student_id, "student"));
        let path = format!("/api/v2/training/{}/check-in/", env.training_id);

        // Not enrolled yet
        let (status, _, body) =
            send(&env.app, Method::POST, &path, student, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], 7);

        send(
            &env.app,
            Method::POST,
            "/api/v2/enrollment/enroll/",
            student,
            Some(json!({"group_id": env.football_group})),
        )
        .await;

        let (status, _, _) =
            send(&env.app, Method::POST, &path, student, Some(json!({}))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, _) =
            send(&env.app, Method::POST, &path, student, Some(json!({}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}

mod attendance_marking {
    use super::*;

    #[tokio::test]
    async fn test_outbound_grades_are_reported() {
        let env = env().await;
        let trainer = Some((env.trainer_id, "trainer"));

        let (status, _, body) = send(
            &env.app,
            Method::POST,
            "/api/v2/attendance/mark/",
            trainer,
            Some(json!({
                "training_id": env.training_id,
                "students_hours": [
                    {"student_id": env.student_id, "hours": 99.0},
                    {"student_id": env.other_student_id, "hours": -1.0},
                ],
            })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], 3);
        assert_eq!(body["overflow_marks"].as_array().unwrap().len(), 1);
        assert_eq!(body["negative_marks"].as_array().unwrap().len(), 1);
        // Nothing was stored
        assert!(env
            .store
            .attendance_for(env.student_id, env.training_id)
            .is_none());
    }

    #[tokio::test]
    async fn test_mark_and_read_grades() {
        let env = env().await;
        let trainer = Some((env.trainer_id, "trainer"));

        send(
            &env.app,
            Method::POST,
            "/api/v2/enrollment/enroll/",
            Some((env.student_id, "student")),
            Some(json!({"group_id": env.football_group})),
        )
        .await;

        let (status, _, body) = send(
            &env.app,
            Method::POST,
            "/api/v2/attendance/mark/",
            trainer,
            Some(json!({
                "training_id": env.training_id,
                "students_hours": [{"student_id": env.student_id, "hours": 2.0}],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, _, body) = send(
            &env.app,
            Method::GET,
            &format!("/api/v2/attendance/training/{}/grades/", env.training_id),
            trainer,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let students = body["students"].as_array().unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0]["hours"], 2.0);

        // The marked hours show up in the student's history
        let (status, _, body) = send(
            &env.app,
            Method::GET,
            &format!("/api/v2/profile/history/{}/", env.semester_id),
            Some((env.student_id, "student")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["hours"], 2.0);
    }

    #[tokio::test]
    async fn test_foreign_trainer_cannot_mark() {
        let env = env().await;
        let outsider = env.store.next_id();
        env.store
            .trainers
            .insert(outsider, Trainer::new(outsider, "Someone Else", "x@example.edu"));

        let (status, _, _) = send(
            &env.app,
            Method::POST,
            "/api/v2/attendance/mark/",
            Some((outsider, "trainer")),
            Some(json!({
                "training_id": env.training_id,
                "students_hours": [],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}

mod catalogue {
    use super::*;

    #[tokio::test]
    async fn test_current_semester_query() {
        let env = env().await;
        let (status, _, body) = send(
            &env.app,
            Method::GET,
            "/api/v2/semester/?current=true",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let list = body.as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["name"], "F25");
        assert_eq!(list[0]["is_active"], true);
    }

    #[tokio::test]
    async fn test_sports_via_legacy_shortcut() {
        let env = env().await;
        // /api/sports mapped onto the group resource
        let (status, headers, body) = send(&env.app, Method::GET, "/api/sports", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert_eq!(
            headers.get("x-api-new-endpoint").unwrap(),
            "/api/v2/group/sports/"
        );
    }

    #[tokio::test]
    async fn test_negative_sport_id_means_all() {
        let env = env().await;
        let (status, _, body) = send(
            &env.app,
            Method::GET,
            "/api/v2/calendar/sport/-1/schedule/",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        // Both seeded trainings appear (football + qr group)
        assert_eq!(body.as_array().unwrap().len(), 2);
    }
}

mod telemetry {
    use super::*;

    #[tokio::test]
    async fn test_usage_records_distinguish_variants() {
        let env = env().await;

        send(&env.app, Method::GET, "/api/sports", None, None).await;
        send(&env.app, Method::GET, "/api/v2/group/sports/", None, None).await;

        tokio::time::sleep(Duration::from_millis(50)).await;

        let records = env.sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].variant, RouteVariant::Legacy);
        assert_eq!(records[0].route, "GET /api/sports");
        assert_eq!(records[1].variant, RouteVariant::Canonical);
        assert_eq!(records[1].resource, "group");
        assert_eq!(records[1].action, "sports");
    }

    #[tokio::test]
    async fn test_caller_identity_recorded() {
        let env = env().await;
        send(
            &env.app,
            Method::GET,
            "/api/v2/profile/student/",
            Some((env.student_id, "student")),
            None,
        )
        .await;

        tokio::time::sleep(Duration::from_millis(50)).await;

        let records = env.sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].caller, env.student_id.to_string());
        assert_eq!(records[0].status, 200);
    }
}
