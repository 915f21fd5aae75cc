//! Enrollment actions.
//!
//! Business failures use the numbered error scheme the frontend has relied
//! on since v1; codes must stay stable across the API migration.

use serde::Deserialize;
use serde_json::json;

use cs_gateway::{ActionContext, HandlerFailure, HandlerResult};

use crate::enrollment::entity::Enroll;
use crate::shared::store::SportStore;

pub struct EnrollErrors;

impl EnrollErrors {
    pub const GROUP_IS_FULL: (u32, &'static str) = (2, "Group you chosen is full");
    pub const TOO_MUCH_GROUPS: (u32, &'static str) = (3, "You have enrolled to too much groups");
    pub const DOUBLE_ENROLL: (u32, &'static str) =
        (4, "You can't enroll to a group you have already enrolled to");
    pub const INCONSISTENT_UNENROLL: (u32, &'static str) =
        (5, "You are not enrolled to the group");
    pub const MEDICAL_DISALLOWANCE: (u32, &'static str) =
        (6, "You can't enroll to the group due to your medical group");
    pub const NOT_ENROLLED: (u32, &'static str) =
        (7, "Requested student is not enrolled into this group");
    pub const SPORT_ERROR: (u32, &'static str) =
        (8, "Requested group doesn't belong to requested student's sport");
    pub const SEMESTER_ERROR: (u32, &'static str) =
        (9, "Requested group does't belong to current semester");
    pub const QR_ERROR: (u32, &'static str) = (10, "Requested group has QR requirement");
}

fn rule((code, detail): (u32, &'static str)) -> HandlerFailure {
    HandlerFailure::rule(code, detail)
}

#[derive(Debug, Deserialize)]
struct GroupRequest {
    group_id: i64,
}

/// `POST /enrollment/enroll`
pub async fn enroll(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let req: GroupRequest = ctx.parse()?;
    let user_id = ctx.user_id()?;

    let student = store
        .student(user_id)
        .ok_or_else(|| HandlerFailure::not_found("Student", user_id))?;
    let group = store
        .group(req.group_id)
        .ok_or_else(|| HandlerFailure::not_found("Group", req.group_id))?;

    if student.sport_id != Some(group.sport_id) {
        return Err(rule(EnrollErrors::SPORT_ERROR));
    }
    if store.enrollment(student.user_id, group.id).is_some() {
        return Err(rule(EnrollErrors::DOUBLE_ENROLL));
    }

    let ongoing = store
        .ongoing_semester()
        .ok_or_else(|| rule(EnrollErrors::SEMESTER_ERROR))?;
    if !store
        .student_groups_in_semester(student.user_id, ongoing.id)
        .is_empty()
    {
        return Err(rule(EnrollErrors::TOO_MUCH_GROUPS));
    }
    if group.semester_id != ongoing.id {
        return Err(rule(EnrollErrors::SEMESTER_ERROR));
    }
    if !group.allows_medical_group(student.medical_group_id) {
        return Err(rule(EnrollErrors::MEDICAL_DISALLOWANCE));
    }
    if store.group_load(group.id) >= group.capacity as usize {
        return Err(rule(EnrollErrors::GROUP_IS_FULL));
    }

    let id = store.next_id();
    store
        .enrolls
        .insert(id, Enroll::new(id, student.user_id, group.id));
    Ok(json!({}))
}

/// `POST /enrollment/unenroll`
pub async fn unenroll(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let req: GroupRequest = ctx.parse()?;
    let user_id = ctx.user_id()?;

    let enroll = store
        .enrollment(user_id, req.group_id)
        .ok_or_else(|| rule(EnrollErrors::INCONSISTENT_UNENROLL))?;

    store.enrolls.remove(&enroll.id);
    Ok(json!({}))
}

#[derive(Debug, Deserialize)]
struct TrainerUnenrollRequest {
    group_id: i64,
    student_id: i64,
}

/// `POST /enrollment/unenroll-by-trainer` (trainer only).
pub async fn unenroll_by_trainer(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let req: TrainerUnenrollRequest = ctx.parse()?;
    let trainer_id = ctx.user_id()?;

    let group = store
        .group(req.group_id)
        .ok_or_else(|| HandlerFailure::not_found("Group", req.group_id))?;
    if !group.has_trainer(trainer_id) && !ctx.caller.has_role(cs_common::Role::Staff) {
        return Err(HandlerFailure::forbidden(
            "You are not a teacher of this group",
        ));
    }

    let enroll = store
        .enrollment(req.student_id, group.id)
        .ok_or_else(|| rule(EnrollErrors::NOT_ENROLLED))?;

    store.enrolls.remove(&enroll.id);
    Ok(json!({}))
}
