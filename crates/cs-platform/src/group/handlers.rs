//! Group actions.

use serde::Deserialize;
use serde_json::json;

use cs_gateway::{ActionContext, HandlerFailure, HandlerResult};

use crate::shared::store::SportStore;

/// `GET /group/{id}`
pub async fn retrieve(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let group_id = ctx.path_int("id")?;
    let group = store
        .group(group_id)
        .ok_or_else(|| HandlerFailure::not_found("Group", group_id))?;

    let sport = store.sport(group.sport_id);
    let semester = store.semester(group.semester_id);
    let trainers: Vec<serde_json::Value> = group
        .trainer_ids
        .iter()
        .filter_map(|id| store.trainer(*id))
        .map(|t| json!({"id": t.user_id, "name": t.full_name, "email": t.email}))
        .collect();
    let allowed_medical_groups: Vec<String> = group
        .allowed_medical_group_ids
        .iter()
        .filter_map(|id| store.medical_group(*id))
        .map(|m| m.name)
        .collect();

    let is_enrolled = ctx
        .caller
        .user_id
        .map(|user_id| store.enrollment(user_id, group.id).is_some())
        .unwrap_or(false);

    Ok(json!({
        "id": group.id,
        "name": group.name,
        "sport": sport.map(|s| s.name),
        "semester": semester.map(|s| s.name),
        "capacity": group.capacity,
        "current_load": store.group_load(group.id),
        "trainers": trainers,
        "allowed_medical_groups": allowed_medical_groups,
        "accredited": group.accredited,
        "require_qr": group.require_qr,
        "is_enrolled": is_enrolled,
    }))
}

/// `GET /group/sports` — the sports catalogue.
pub async fn sports(store: &SportStore, _ctx: &ActionContext) -> HandlerResult {
    let mut sports: Vec<(i64, String)> = store
        .sports
        .iter()
        .map(|s| (s.id, s.name.clone()))
        .collect();
    sports.sort_by_key(|(id, _)| *id);
    Ok(json!(sports
        .into_iter()
        .map(|(id, name)| json!({"id": id, "name": name}))
        .collect::<Vec<_>>()))
}

#[derive(Debug, Deserialize)]
struct SelectSportRequest {
    sport_id: i64,
}

/// `POST /group/select-sport`
pub async fn select_sport(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let req: SelectSportRequest = ctx.parse()?;
    let user_id = ctx.user_id()?;

    if store.sport(req.sport_id).is_none() {
        return Err(HandlerFailure::not_found("Sport", req.sport_id));
    }
    let mut student = store
        .students
        .get_mut(&user_id)
        .ok_or_else(|| HandlerFailure::not_found("Student", user_id))?;

    student.sport_id = Some(req.sport_id);
    Ok(json!({}))
}
