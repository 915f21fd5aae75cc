//! Medical references.
//!
//! Students excused from trainings submit a reference for the ongoing
//! semester; staff review them offline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use cs_gateway::{ActionContext, HandlerFailure, HandlerResult};

use crate::shared::store::SportStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalReference {
    pub id: i64,
    pub student_id: i64,
    pub semester_id: i64,
    pub link: String,
    pub student_comment: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct UploadRequest {
    link: String,
    #[serde(default)]
    student_comment: Option<String>,
}

/// `POST /reference/upload`
pub async fn upload(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let req: UploadRequest = ctx.parse()?;
    let student_id = ctx.user_id()?;

    let semester = store
        .ongoing_semester()
        .ok_or_else(|| HandlerFailure::unprocessable("No ongoing semester"))?;

    let duplicate = store.references.iter().any(|r| {
        r.student_id == student_id
            && r.semester_id == semester.id
            && r.uploaded_at.date_naive() == Utc::now().date_naive()
    });
    if duplicate {
        return Err(HandlerFailure::conflict(
            "A reference was already uploaded today",
        ));
    }

    let id = store.next_id();
    store.references.insert(
        id,
        MedicalReference {
            id,
            student_id,
            semester_id: semester.id,
            link: req.link,
            student_comment: req.student_comment,
            uploaded_at: Utc::now(),
        },
    );
    Ok(json!({"id": id}))
}
