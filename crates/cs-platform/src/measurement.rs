//! Anthropometric measurements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use cs_gateway::{ActionContext, HandlerFailure, HandlerResult};

use crate::shared::store::SportStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    pub id: i64,
    pub name: String,
    pub unit: String,
}

impl Measurement {
    pub fn new(id: i64, name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            unit: unit.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementResult {
    pub id: i64,
    pub student_id: i64,
    pub measurement_id: i64,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct StudentMeasurementRequest {
    measurement_id: i64,
    value: f64,
}

/// `POST /measurement/student-measurement`
pub async fn student_measurement(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let req: StudentMeasurementRequest = ctx.parse()?;
    let student_id = ctx.user_id()?;

    if store.measurements.get(&req.measurement_id).is_none() {
        return Err(HandlerFailure::not_found("Measurement", req.measurement_id));
    }
    if req.value <= 0.0 {
        return Err(HandlerFailure::unprocessable("value must be positive"));
    }

    let id = store.next_id();
    store.measurement_results.insert(
        id,
        MeasurementResult {
            id,
            student_id,
            measurement_id: req.measurement_id,
            value: req.value,
            recorded_at: Utc::now(),
        },
    );
    Ok(json!({"id": id}))
}

/// `GET /measurement/results` — the caller's own history.
pub async fn results(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let student_id = ctx.user_id()?;

    let mut rows: Vec<MeasurementResult> = store
        .measurement_results
        .iter()
        .filter(|r| r.student_id == student_id)
        .map(|r| r.clone())
        .collect();
    rows.sort_by_key(|r| r.recorded_at);

    Ok(json!(rows
        .into_iter()
        .filter_map(|r| {
            let measurement = store.measurements.get(&r.measurement_id)?;
            Some(json!({
                "measurement": measurement.name,
                "unit": measurement.unit,
                "value": r.value,
                "date": r.recorded_at.date_naive(),
            }))
        })
        .collect::<Vec<_>>()))
}

/// `GET /measurement/measurements` — the catalogue.
pub async fn measurements(store: &SportStore, _ctx: &ActionContext) -> HandlerResult {
    let mut rows: Vec<Measurement> = store.measurements.iter().map(|m| m.clone()).collect();
    rows.sort_by_key(|m| m.id);
    Ok(json!(rows
        .iter()
        .map(|m| json!({"id": m.id, "name": m.name, "unit": m.unit}))
        .collect::<Vec<_>>()))
}
