//! Training sessions and check-ins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Share of an academic hour granted on top of the raw duration when
/// rounding attendance hours down.
pub const ACADEMIC_DURATION_PERCENTAGE: f64 = 0.5;

/// Upper bound of academic hours a single training can award.
pub const ACADEMIC_DURATION_MAX: f64 = 4.0;

/// One academic hour, in seconds.
const ACADEMIC_HOUR_SECS: f64 = 2700.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Training {
    pub id: i64,
    pub group_id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub training_class: Option<String>,
    pub custom_name: Option<String>,
}

impl Training {
    pub fn new(id: i64, group_id: i64, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            id,
            group_id,
            start,
            end,
            training_class: None,
            custom_name: None,
        }
    }

    pub fn with_class(mut self, training_class: impl Into<String>) -> Self {
        self.training_class = Some(training_class.into());
        self
    }

    /// Maximum academic hours this training awards.
    ///
    /// Unaccredited groups award nothing. Otherwise the duration is rounded
    /// down to whole academic hours with a grace share, capped at the
    /// per-training maximum.
    pub fn academic_duration(&self, accredited: bool) -> f64 {
        if !accredited {
            return 0.0;
        }
        let secs = (self.end - self.start).num_seconds() as f64;
        let grace = ACADEMIC_HOUR_SECS * ACADEMIC_DURATION_PERCENTAGE;
        (((secs + grace) / ACADEMIC_HOUR_SECS).floor()).min(ACADEMIC_DURATION_MAX)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckIn {
    pub id: i64,
    pub student_id: i64,
    pub training_id: i64,
    pub checked_at: DateTime<Utc>,
}

impl CheckIn {
    pub fn new(id: i64, student_id: i64, training_id: i64) -> Self {
        Self {
            id,
            student_id,
            training_id,
            checked_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn training_of_minutes(minutes: i64) -> Training {
        let start = Utc::now();
        Training::new(1, 1, start, start + Duration::minutes(minutes))
    }

    #[test]
    fn test_academic_duration_rounding() {
        // 90 minutes = exactly 2 academic hours; the grace share is not
        // enough to reach a third
        assert_eq!(training_of_minutes(90).academic_duration(true), 2.0);
        // 135 minutes = 3 academic hours + half a grace hour -> still 3
        assert_eq!(training_of_minutes(135).academic_duration(true), 3.0);
    }

    #[test]
    fn test_academic_duration_capped() {
        assert_eq!(training_of_minutes(600).academic_duration(true), ACADEMIC_DURATION_MAX);
    }

    #[test]
    fn test_unaccredited_awards_nothing() {
        assert_eq!(training_of_minutes(90).academic_duration(false), 0.0);
    }
}
