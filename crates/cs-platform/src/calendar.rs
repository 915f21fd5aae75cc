//! Schedule calendars.
//!
//! Produces entries in the shape the frontend calendar widget consumes:
//! recurring weekly slots for a sport, and concrete events for a user's
//! personal schedule.

use chrono::{Datelike, NaiveDate};
use serde_json::json;

use cs_gateway::{ActionContext, HandlerFailure, HandlerResult};

use crate::attendance::handlers::TRAINING_EDITABLE_DAYS;
use crate::shared::store::SportStore;

// Date validation error codes shared with the legacy frontend
const DATE_INCORRECT_FORMAT: u32 = 2;
const DATE_BOTH_REQUIRED: u32 = 3;
const DATE_START_BEFORE_END: u32 = 4;

/// `GET /calendar/sport/{sport_id}/schedule` — weekly slots of a sport's
/// groups in the ongoing semester. `sport_id = -1` means all sports.
pub async fn sport_schedule(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let sport_id = ctx.path_int("sport_id")?;
    if sport_id != -1 && store.sport(sport_id).is_none() {
        return Err(HandlerFailure::not_found("Sport", sport_id));
    }

    let Some(semester) = store.ongoing_semester() else {
        return Ok(json!([]));
    };

    let mut entries = Vec::new();
    for group in store.groups.iter() {
        if group.semester_id != semester.id {
            continue;
        }
        if sport_id != -1 && group.sport_id != sport_id {
            continue;
        }
        let current_load = store.group_load(group.id);
        for training in store.trainings_for_group(group.id) {
            entries.push(json!({
                "title": group.name,
                "daysOfWeek": [training.start.weekday().num_days_from_sunday()],
                "startTime": training.start.format("%H:%M").to_string(),
                "endTime": training.end.format("%H:%M").to_string(),
                "extendedProps": {
                    "group_id": group.id,
                    "training_class": training.training_class,
                    "current_load": current_load,
                    "capacity": group.capacity,
                },
            }));
        }
    }
    Ok(json!(entries))
}

fn parse_range(ctx: &ActionContext) -> Result<(NaiveDate, NaiveDate), HandlerFailure> {
    let (Some(start), Some(end)) = (ctx.str_field("start"), ctx.str_field("end")) else {
        return Err(HandlerFailure::rule(
            DATE_BOTH_REQUIRED,
            "Both start and end are required",
        ));
    };
    let parse = |raw: &str| {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            HandlerFailure::rule(DATE_INCORRECT_FORMAT, "Invalid date format. Use YYYY-MM-DD")
        })
    };
    let start = parse(start)?;
    let end = parse(end)?;
    if start > end {
        return Err(HandlerFailure::rule(
            DATE_START_BEFORE_END,
            "end should be greater than start",
        ));
    }
    Ok((start, end))
}

/// `GET /calendar/trainings?start=...&end=...` — the caller's personal
/// schedule: trainings of groups they are enrolled into or train.
pub async fn personal_trainings(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let (start, end) = parse_range(ctx)?;
    let user_id = ctx.user_id()?;
    let now = chrono::Utc::now();

    let mut entries = Vec::new();
    for training in store.trainings.iter() {
        let date = training.start.date_naive();
        if date < start || date > end {
            continue;
        }
        let Some(group) = store.group(training.group_id) else {
            continue;
        };

        let enrolled = store.enrollment(user_id, group.id).is_some();
        let trains = group.has_trainer(user_id);
        if !enrolled && !trains {
            continue;
        }

        let editable_until = training.start + chrono::Duration::days(TRAINING_EDITABLE_DAYS);
        let mut props = json!({
            "id": training.id,
            "group_id": group.id,
            "training_class": training.training_class,
            "group_accredited": group.accredited,
            "can_edit": trains && training.start <= now && now <= editable_until,
            "can_grade": trains,
        });
        if enrolled {
            props["can_check_in"] = json!(now < training.end);
            props["checked_in"] = json!(store.checkin(user_id, training.id).is_some());
        }

        entries.push(json!({
            "title": training.custom_name.clone().unwrap_or_else(|| group.name.clone()),
            "start": training.start,
            "end": training.end,
            "allDay": false,
            "extendedProps": props,
        }));
    }

    entries.sort_by(|a, b| a["start"].to_string().cmp(&b["start"].to_string()));
    Ok(json!(entries))
}
