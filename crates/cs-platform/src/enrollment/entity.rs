//! Group enrollments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enroll {
    pub id: i64,
    pub student_id: i64,
    pub group_id: i64,
    pub enrolled_at: DateTime<Utc>,
}

impl Enroll {
    pub fn new(id: i64, student_id: i64, group_id: i64) -> Self {
        Self {
            id,
            student_id,
            group_id,
            enrolled_at: Utc::now(),
        }
    }
}
