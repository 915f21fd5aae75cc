//! Fitness test actions.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use cs_gateway::{ActionContext, HandlerFailure, HandlerResult};

use crate::fitnesstest::entity::{FitnessResult, FitnessSession};
use crate::shared::store::SportStore;

fn exercise_body(exercise: &crate::fitnesstest::entity::FitnessExercise) -> serde_json::Value {
    json!({
        "id": exercise.id,
        "name": exercise.name,
        "unit": exercise.unit,
        "select": exercise.select,
    })
}

fn session_body(store: &SportStore, session: &FitnessSession) -> serde_json::Value {
    let semester = store.semester(session.semester_id).map(|s| s.name);
    let teacher = store.trainer(session.teacher_id).map(|t| t.full_name);
    json!({
        "id": session.id,
        "semester": semester,
        "retake": session.retake,
        "date": session.date,
        "teacher": teacher,
    })
}

/// `GET /fitnesstest/result` — the caller's results, grouped by session.
pub async fn result(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let student_id = ctx.user_id()?;

    let mut by_session: BTreeMap<i64, Vec<FitnessResult>> = BTreeMap::new();
    for result in store.fitness_results.iter() {
        if result.student_id == student_id {
            by_session
                .entry(result.session_id)
                .or_default()
                .push(result.clone());
        }
    }

    let mut out = Vec::new();
    for (session_id, results) in by_session {
        let Some(session) = store.fitness_sessions.get(&session_id).map(|s| s.clone()) else {
            continue;
        };
        let semester = store.semester(session.semester_id).map(|s| s.name);
        let details: Vec<serde_json::Value> = results
            .iter()
            .filter_map(|r| {
                let exercise = store.fitness_exercises.get(&r.exercise_id)?;
                Some(json!({
                    "exercise": exercise.name,
                    "unit": exercise.unit,
                    "value": r.value,
                }))
            })
            .collect();
        out.push(json!({
            "semester": semester,
            "retake": session.retake,
            "details": details,
        }));
    }
    Ok(json!(out))
}

#[derive(Debug, Deserialize)]
struct UploadEntry {
    student_id: i64,
    exercise_id: i64,
    value: String,
}

#[derive(Debug, Deserialize)]
struct UploadRequest {
    semester_id: i64,
    #[serde(default)]
    retake: bool,
    results: Vec<UploadEntry>,
}

/// `POST /fitnesstest/upload` (trainer) — record a batch of results,
/// creating the session on first upload.
pub async fn upload(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let req: UploadRequest = ctx.parse()?;
    let teacher_id = ctx.user_id()?;

    if store.semester(req.semester_id).is_none() {
        return Err(HandlerFailure::not_found("Semester", req.semester_id));
    }
    for entry in &req.results {
        if store.student(entry.student_id).is_none() {
            return Err(HandlerFailure::not_found("Student", entry.student_id));
        }
        let Some(exercise) = store.fitness_exercises.get(&entry.exercise_id).map(|e| e.clone())
        else {
            return Err(HandlerFailure::not_found("Exercise", entry.exercise_id));
        };
        if !exercise.select.is_empty() && !exercise.select.contains(&entry.value) {
            return Err(HandlerFailure::unprocessable(format!(
                "'{}' is not a valid value for {}",
                entry.value, exercise.name
            )));
        }
    }

    let session_id = store
        .fitness_sessions
        .iter()
        .find(|s| {
            s.semester_id == req.semester_id && s.teacher_id == teacher_id && s.retake == req.retake
        })
        .map(|s| s.id)
        .unwrap_or_else(|| {
            let id = store.next_id();
            store.fitness_sessions.insert(
                id,
                FitnessSession {
                    id,
                    semester_id: req.semester_id,
                    teacher_id,
                    date: Utc::now().date_naive(),
                    retake: req.retake,
                },
            );
            id
        });

    for entry in req.results {
        // Re-submitting a (student, exercise) pair overwrites the value
        let existing = store
            .fitness_results
            .iter()
            .find(|r| {
                r.session_id == session_id
                    && r.student_id == entry.student_id
                    && r.exercise_id == entry.exercise_id
            })
            .map(|r| r.id);
        match existing {
            Some(id) => {
                if let Some(mut result) = store.fitness_results.get_mut(&id) {
                    result.value = entry.value;
                }
            }
            None => {
                let id = store.next_id();
                store.fitness_results.insert(
                    id,
                    FitnessResult {
                        id,
                        session_id,
                        student_id: entry.student_id,
                        exercise_id: entry.exercise_id,
                        value: entry.value,
                    },
                );
            }
        }
    }
    Ok(json!({"session_id": session_id}))
}

/// `GET /fitnesstest/exercises`
pub async fn exercises(store: &SportStore, _ctx: &ActionContext) -> HandlerResult {
    let mut rows: Vec<_> = store.fitness_exercises.iter().map(|e| e.clone()).collect();
    rows.sort_by_key(|e| e.id);
    Ok(json!(rows.iter().map(exercise_body).collect::<Vec<_>>()))
}

/// `GET /fitnesstest/sessions` (trainer)
pub async fn sessions(store: &SportStore, _ctx: &ActionContext) -> HandlerResult {
    let mut rows: Vec<FitnessSession> =
        store.fitness_sessions.iter().map(|s| s.clone()).collect();
    rows.sort_by_key(|s| s.id);
    Ok(json!(rows
        .iter()
        .map(|s| session_body(store, s))
        .collect::<Vec<_>>()))
}

/// `GET /fitnesstest/sessions/{id}` (trainer) — session with grouped results.
pub async fn session_detail(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let session_id = ctx.path_int("id")?;
    let session = store
        .fitness_sessions
        .get(&session_id)
        .map(|s| s.clone())
        .ok_or_else(|| HandlerFailure::not_found("Fitness test session", session_id))?;

    let mut results: BTreeMap<String, Vec<serde_json::Value>> = BTreeMap::new();
    for result in store.fitness_results.iter() {
        if result.session_id != session_id {
            continue;
        }
        results
            .entry(result.student_id.to_string())
            .or_default()
            .push(json!({
                "exercise_id": result.exercise_id,
                "value": result.value,
            }));
    }

    let mut exercises: Vec<_> = store.fitness_exercises.iter().map(|e| e.clone()).collect();
    exercises.sort_by_key(|e| e.id);

    Ok(json!({
        "session": session_body(store, &session),
        "exercises": exercises.iter().map(exercise_body).collect::<Vec<_>>(),
        "results": results,
    }))
}
