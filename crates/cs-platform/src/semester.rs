//! Semesters.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use cs_gateway::{ActionContext, HandlerFailure, HandlerResult};

use crate::shared::store::SportStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Semester {
    pub id: i64,
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub is_active: bool,
    /// Attendance hours a student must collect to pass the semester
    pub required_hours: f64,
}

impl Semester {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
        is_active: bool,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            start,
            end,
            is_active,
            required_hours: 30.0,
        }
    }
}

fn semester_body(semester: &Semester) -> serde_json::Value {
    json!({
        "id": semester.id,
        "name": semester.name,
        "start": semester.start,
        "end": semester.end,
        "is_active": semester.is_active,
        "required_hours": semester.required_hours,
    })
}

/// `GET /semester`; `?current=true` narrows to the ongoing semester.
pub async fn list(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    if ctx.flag("current") {
        let current = store
            .ongoing_semester()
            .ok_or_else(|| HandlerFailure::not_found("Semester", "current"))?;
        return Ok(json!([semester_body(&current)]));
    }

    let mut semesters: Vec<Semester> = store.semesters.iter().map(|s| s.clone()).collect();
    if semesters.is_empty() {
        return Err(HandlerFailure::not_found("Semester", "any"));
    }
    semesters.sort_by_key(|s| s.start);
    Ok(json!(semesters.iter().map(semester_body).collect::<Vec<_>>()))
}
