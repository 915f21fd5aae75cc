//! Self-sport reports.
//!
//! Students earn hours for training outside university groups by submitting
//! an activity link (Strava or similar) for review.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use cs_gateway::{ActionContext, HandlerFailure, HandlerResult};

use crate::shared::store::SportStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfSportType {
    pub id: i64,
    pub name: String,
    /// Shown to the student next to the upload form
    pub application_rule: String,
}

impl SelfSportType {
    pub fn new(id: i64, name: impl Into<String>, application_rule: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            application_rule: application_rule.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfSportReport {
    pub id: i64,
    pub student_id: i64,
    pub training_type_id: i64,
    pub link: String,
    pub hours: f64,
    pub uploaded_at: DateTime<Utc>,
    /// None until a trainer reviews the report
    pub approved: Option<bool>,
}

fn link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https?://\S+$").expect("static regex"))
}

fn strava_activity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https?://(?:www\.)?strava\.com/activities/(\d+)").expect("static regex")
    })
}

#[derive(Debug, Deserialize)]
struct UploadRequest {
    training_type_id: i64,
    link: String,
    #[serde(default)]
    hours: Option<f64>,
}

/// `POST /selfsport/upload`
pub async fn upload(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let req: UploadRequest = ctx.parse()?;
    let student_id = ctx.user_id()?;

    if store.selfsport_types.get(&req.training_type_id).is_none() {
        return Err(HandlerFailure::not_found(
            "Self sport type",
            req.training_type_id,
        ));
    }
    if !link_regex().is_match(&req.link) {
        return Err(HandlerFailure::unprocessable(
            "link must be a valid http(s) URL",
        ));
    }
    let duplicate = store
        .selfsport_reports
        .iter()
        .any(|r| r.student_id == student_id && r.link == req.link);
    if duplicate {
        return Err(HandlerFailure::conflict(
            "This activity link was already submitted",
        ));
    }

    let hours = req.hours.unwrap_or(1.0);
    if !(0.0..=10.0).contains(&hours) {
        return Err(HandlerFailure::unprocessable("hours must be within 0..=10"));
    }

    let id = store.next_id();
    store.selfsport_reports.insert(
        id,
        SelfSportReport {
            id,
            student_id,
            training_type_id: req.training_type_id,
            link: req.link,
            hours,
            uploaded_at: Utc::now(),
            approved: None,
        },
    );
    Ok(json!({"id": id}))
}

/// `GET /selfsport/types`
pub async fn types(store: &SportStore, _ctx: &ActionContext) -> HandlerResult {
    let mut rows: Vec<SelfSportType> = store.selfsport_types.iter().map(|t| t.clone()).collect();
    rows.sort_by_key(|t| t.id);
    Ok(json!(rows
        .iter()
        .map(|t| json!({
            "id": t.id,
            "name": t.name,
            "application_rule": t.application_rule,
        }))
        .collect::<Vec<_>>()))
}

/// `GET /selfsport/strava-parsing?link=...`
pub async fn strava_parsing(_store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let link = ctx
        .str_field("link")
        .ok_or_else(|| HandlerFailure::unprocessable("link query parameter is required"))?;

    let captures = strava_activity_regex()
        .captures(link)
        .ok_or_else(|| HandlerFailure::unprocessable("Unsupported activity link"))?;

    let activity_id: i64 = captures[1]
        .parse()
        .map_err(|_| HandlerFailure::unprocessable("Activity id out of range"))?;

    Ok(json!({"provider": "strava", "activity_id": activity_id}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strava_regex_extracts_id() {
        let caps = strava_activity_regex()
            .captures("https://www.strava.com/activities/123456789")
            .unwrap();
        assert_eq!(&caps[1], "123456789");
        assert!(strava_activity_regex()
            .captures("https://example.com/activities/1")
            .is_none());
    }

    #[test]
    fn test_link_regex() {
        assert!(link_regex().is_match("https://strava.com/a/1"));
        assert!(!link_regex().is_match("ftp://nope"));
        assert!(!link_regex().is_match("https://with space"));
    }
}
