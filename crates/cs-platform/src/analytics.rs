//! Attendance analytics for staff.

use serde_json::json;

use cs_gateway::{ActionContext, HandlerFailure, HandlerResult};

use crate::shared::store::SportStore;

/// `GET /analytics/attendance` — per-group attendance rates for the ongoing
/// semester.
pub async fn attendance(store: &SportStore, _ctx: &ActionContext) -> HandlerResult {
    let semester = store
        .ongoing_semester()
        .ok_or_else(|| HandlerFailure::not_found("Semester", "current"))?;

    let mut rows = Vec::new();
    for group in store.groups.iter() {
        if group.semester_id != semester.id {
            continue;
        }

        let trainings = store.trainings_for_group(group.id);
        let training_ids: Vec<i64> = trainings.iter().map(|t| t.id).collect();
        let marks: Vec<f64> = store
            .attendance
            .iter()
            .filter(|a| training_ids.contains(&a.training_id))
            .map(|a| a.hours)
            .collect();

        let enrolled = store.group_load(group.id);
        let average_hours = if marks.is_empty() {
            0.0
        } else {
            marks.iter().sum::<f64>() / marks.len() as f64
        };

        rows.push(json!({
            "group_id": group.id,
            "group_name": group.name,
            "enrolled": enrolled,
            "trainings": trainings.len(),
            "marks": marks.len(),
            "average_hours": average_hours,
        }));
    }

    rows.sort_by_key(|r| r["group_id"].as_i64());
    Ok(json!({"semester": semester.name, "groups": rows}))
}
