//! Profile actions.

use serde::Deserialize;
use serde_json::json;

use cs_gateway::{ActionContext, HandlerFailure, HandlerResult};

use crate::shared::store::SportStore;

fn history_rows(store: &SportStore, student_id: i64, semester_id: i64) -> Vec<serde_json::Value> {
    store
        .student_attendance_in_semester(student_id, semester_id)
        .into_iter()
        .map(|(attendance, training, group)| {
            json!({
                "training_id": training.id,
                "group_id": group.id,
                "group_name": group.name,
                "custom_name": training.custom_name,
                "date": training.start.date_naive(),
                "hours": attendance.hours,
            })
        })
        .collect()
}

/// `GET /profile/student` — the caller's own profile.
pub async fn student_info(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let user_id = ctx.user_id()?;
    let student = store
        .student(user_id)
        .ok_or_else(|| HandlerFailure::not_found("Student", user_id))?;

    let medical_group = store.medical_group(student.medical_group_id);
    let sport = student.sport_id.and_then(|id| store.sport(id));

    Ok(json!({
        "user": {
            "id": student.user_id,
            "name": student.full_name,
            "email": student.email,
        },
        "gender": student.gender,
        "medical_group": medical_group.map(|m| m.name),
        "sport": sport.map(|s| s.name),
        "has_QR": student.has_qr,
    }))
}

/// `POST /profile/toggle-qr` — flips the caller's QR preference.
pub async fn toggle_qr(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let user_id = ctx.user_id()?;
    let mut student = store
        .students
        .get_mut(&user_id)
        .ok_or_else(|| HandlerFailure::not_found("Student", user_id))?;

    student.has_qr = !student.has_qr;
    Ok(json!({"has_QR": student.has_qr}))
}

#[derive(Debug, Deserialize)]
struct ChangeGenderRequest {
    student_id: i64,
    gender: String,
}

/// `POST /profile/change-gender` (staff only).
pub async fn change_gender(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let req: ChangeGenderRequest = ctx.parse()?;

    if req.gender != "M" && req.gender != "F" {
        return Err(HandlerFailure::unprocessable("gender must be 'M' or 'F'"));
    }
    let mut student = store
        .students
        .get_mut(&req.student_id)
        .ok_or_else(|| HandlerFailure::not_found("Student", req.student_id))?;

    student.gender = Some(req.gender);
    Ok(json!({}))
}

/// `GET /profile/history/{semester_id}` — attendance hours per training.
pub async fn history(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let semester_id = ctx.path_int("semester_id")?;
    let user_id = ctx.user_id()?;

    if store.semester(semester_id).is_none() {
        return Err(HandlerFailure::not_found("Semester", semester_id));
    }
    Ok(json!(history_rows(store, user_id, semester_id)))
}

/// `GET /profile/history-with-self/{semester_id}` — attendance plus
/// approved self-sport reports.
pub async fn history_with_self(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let semester_id = ctx.path_int("semester_id")?;
    let user_id = ctx.user_id()?;

    let semester = store
        .semester(semester_id)
        .ok_or_else(|| HandlerFailure::not_found("Semester", semester_id))?;

    let mut rows = history_rows(store, user_id, semester_id);
    for report in store.selfsport_reports.iter() {
        if report.student_id != user_id || report.approved != Some(true) {
            continue;
        }
        let date = report.uploaded_at.date_naive();
        if date < semester.start || date > semester.end {
            continue;
        }
        let type_name = store
            .selfsport_types
            .get(&report.training_type_id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| "Self training".to_string());
        rows.push(json!({
            "training_id": null,
            "group_id": null,
            "group_name": format!("Self sport: {}", type_name),
            "custom_name": null,
            "date": date,
            "hours": report.hours,
        }));
    }
    Ok(json!(rows))
}
