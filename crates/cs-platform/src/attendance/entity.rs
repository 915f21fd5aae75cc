//! Marked attendance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attendance {
    pub id: i64,
    pub student_id: i64,
    pub training_id: i64,
    pub hours: f64,
    pub marked_at: DateTime<Utc>,
}

impl Attendance {
    pub fn new(id: i64, student_id: i64, training_id: i64, hours: f64) -> Self {
        Self {
            id,
            student_id,
            training_id,
            hours,
            marked_at: Utc::now(),
        }
    }
}
