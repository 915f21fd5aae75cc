//! Attendance actions.

use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;

use cs_common::Role;
use cs_gateway::{ActionContext, HandlerFailure, HandlerResult};

use crate::attendance::entity::Attendance;
use crate::shared::store::SportStore;

/// Days after the start of a training during which marks can be edited.
pub const TRAINING_EDITABLE_DAYS: i64 = 7;

const TRAINING_NOT_EDITABLE: (u32, &str) = (
    2,
    "Training not editable before it or after 7 days",
);
const OUTBOUND_GRADES: (u32, &str) =
    (3, "Some students received negative marks or more than maximum");

fn require_group_trainer(
    store: &SportStore,
    ctx: &ActionContext,
    group_id: i64,
) -> Result<(), HandlerFailure> {
    if ctx.caller.has_role(Role::Staff) {
        return Ok(());
    }
    let trainer_id = ctx.user_id()?;
    let group = store
        .group(group_id)
        .ok_or_else(|| HandlerFailure::not_found("Group", group_id))?;
    if !group.has_trainer(trainer_id) {
        return Err(HandlerFailure::forbidden(
            "You are not a teacher of this group",
        ));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct StudentHours {
    student_id: i64,
    hours: f64,
}

#[derive(Debug, Deserialize)]
struct MarkRequest {
    training_id: i64,
    students_hours: Vec<StudentHours>,
}

fn bad_grade(email: &str, hours: f64) -> serde_json::Value {
    json!({"email": email, "hours": hours})
}

/// `POST /attendance/mark` (trainer of the group).
///
/// Rejects the whole batch when any mark is negative or above the
/// training's academic duration, reporting the offending entries.
pub async fn mark(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let req: MarkRequest = ctx.parse()?;

    let training = store
        .training(req.training_id)
        .ok_or_else(|| HandlerFailure::not_found("Training", req.training_id))?;
    require_group_trainer(store, ctx, training.group_id)?;

    let group = store
        .group(training.group_id)
        .ok_or_else(|| HandlerFailure::internal("training without group"))?;

    let now = Utc::now();
    if now < training.start || now > training.start + Duration::days(TRAINING_EDITABLE_DAYS) {
        let (code, detail) = TRAINING_NOT_EDITABLE;
        return Err(HandlerFailure::rule(code, detail));
    }

    let max_hours = training.academic_duration(group.accredited);
    let mut to_mark = Vec::new();
    let mut negative_marks = Vec::new();
    let mut overflow_marks = Vec::new();

    for entry in &req.students_hours {
        let Some(student) = store.student(entry.student_id) else {
            return Err(HandlerFailure::not_found("Student", entry.student_id));
        };
        if entry.hours < 0.0 {
            negative_marks.push(bad_grade(&student.email, entry.hours));
        } else if entry.hours > max_hours {
            overflow_marks.push(bad_grade(&student.email, entry.hours));
        } else if student.status.is_normal() {
            to_mark.push((student, entry.hours));
        }
        // Students on leave or expelled are silently skipped
    }

    if !negative_marks.is_empty() || !overflow_marks.is_empty() {
        let (code, detail) = OUTBOUND_GRADES;
        return Err(HandlerFailure::rule_with(
            code,
            detail,
            json!({
                "negative_marks": negative_marks,
                "overflow_marks": overflow_marks,
            }),
        ));
    }

    let mut marked = Vec::new();
    for (student, hours) in to_mark {
        match store.attendance_for(student.user_id, training.id) {
            Some(existing) => {
                if let Some(mut entry) = store.attendance.get_mut(&existing.id) {
                    entry.hours = hours;
                    entry.marked_at = now;
                }
            }
            None => {
                let id = store.next_id();
                store
                    .attendance
                    .insert(id, Attendance::new(id, student.user_id, training.id, hours));
            }
        }
        marked.push(bad_grade(&student.email, hours));
    }
    Ok(json!(marked))
}

/// `GET /attendance/suggest-student?term=...&group_id=...` (trainer).
pub async fn suggest_student(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let term = ctx.str_field("term").unwrap_or("").to_lowercase();
    let group_id = ctx
        .int_field("group_id")
        .ok_or_else(|| HandlerFailure::unprocessable("group_id query parameter is required"))?;

    require_group_trainer(store, ctx, group_id)?;

    let mut suggestions = Vec::new();
    for student in store.enrolled_students(group_id) {
        if !term.is_empty()
            && !student.full_name.to_lowercase().contains(&term)
            && !student.email.to_lowercase().contains(&term)
        {
            continue;
        }
        let med_group = store
            .medical_group(student.medical_group_id)
            .map(|m| m.name)
            .unwrap_or_default();
        suggestions.push(json!({
            "value": format!(
                "{}_{}_{}_{}",
                student.user_id, student.full_name, student.email, med_group
            ),
            "label": format!("{} ({})", student.full_name, student.email),
        }));
    }
    Ok(json!(suggestions))
}

/// `GET /attendance/training/{training_id}/grades` (trainer of the group).
pub async fn grades(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let training_id = ctx.path_int("training_id")?;
    let training = store
        .training(training_id)
        .ok_or_else(|| HandlerFailure::not_found("Training", training_id))?;
    require_group_trainer(store, ctx, training.group_id)?;

    let students: Vec<serde_json::Value> = store
        .enrolled_students(training.group_id)
        .into_iter()
        .map(|student| {
            let hours = store
                .attendance_for(student.user_id, training.id)
                .map(|a| a.hours)
                .unwrap_or(0.0);
            let med_group = store
                .medical_group(student.medical_group_id)
                .map(|m| m.name)
                .unwrap_or_default();
            json!({
                "student_id": student.user_id,
                "full_name": student.full_name,
                "email": student.email,
                "med_group": med_group,
                "hours": hours,
            })
        })
        .collect();

    Ok(json!({"students": students}))
}

fn hours_summary(store: &SportStore, student_id: i64, semester: &crate::semester::Semester) -> serde_json::Value {
    let group_hours = store.student_group_hours(student_id, semester.id);
    let self_sport_hours = store.student_selfsport_hours(student_id, semester);
    json!({
        "semester": semester.name,
        "group_hours": group_hours,
        "self_sport_hours": self_sport_hours,
        "required_hours": semester.required_hours,
        "debt": (semester.required_hours - group_hours - self_sport_hours).max(0.0),
    })
}

/// `GET /attendance/student/{student_id}/hours` — hour summary; with
/// `current_semester_only=false` covers all semesters.
pub async fn student_hours(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let student_id = ctx.path_int("student_id")?;
    if store.student(student_id).is_none() {
        return Err(HandlerFailure::not_found("Student", student_id));
    }

    let current_only = match ctx.payload.get("current_semester_only") {
        None => true,
        Some(_) => ctx.flag("current_semester_only"),
    };

    let semesters: Vec<crate::semester::Semester> = if current_only {
        store.ongoing_semester().into_iter().collect()
    } else {
        let mut all: Vec<_> = store.semesters.iter().map(|s| s.clone()).collect();
        all.sort_by_key(|s| s.start);
        all
    };

    Ok(json!({
        "student_id": student_id,
        "semesters": semesters
            .iter()
            .map(|s| hours_summary(store, student_id, s))
            .collect::<Vec<_>>(),
    }))
}

/// `GET /attendance/student/{student_id}/negative-hours` — the hour debt in
/// the ongoing semester.
pub async fn negative_hours(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let student_id = ctx.path_int("student_id")?;
    if store.student(student_id).is_none() {
        return Err(HandlerFailure::not_found("Student", student_id));
    }
    let semester = store
        .ongoing_semester()
        .ok_or_else(|| HandlerFailure::not_found("Semester", "current"))?;

    let earned = store.student_group_hours(student_id, semester.id)
        + store.student_selfsport_hours(student_id, &semester);
    Ok(json!({
        "student_id": student_id,
        "semester": semester.name,
        "final_hours": earned - semester.required_hours,
    }))
}

/// `GET /attendance/student/{student_id}/better-than` — share of students
/// with fewer hours in the ongoing semester.
pub async fn better_than(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let student_id = ctx.path_int("student_id")?;
    if store.student(student_id).is_none() {
        return Err(HandlerFailure::not_found("Student", student_id));
    }
    let semester = store
        .ongoing_semester()
        .ok_or_else(|| HandlerFailure::not_found("Semester", "current"))?;

    let own = store.student_group_hours(student_id, semester.id);
    let others: Vec<f64> = store
        .students
        .iter()
        .filter(|s| s.user_id != student_id)
        .map(|s| store.student_group_hours(s.user_id, semester.id))
        .collect();

    let better_than = if others.is_empty() {
        0.0
    } else {
        let worse = others.iter().filter(|h| **h < own).count();
        100.0 * worse as f64 / others.len() as f64
    };
    Ok(json!({"better_than": better_than}))
}
