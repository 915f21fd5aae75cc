//! Fitness test exercises, sessions, and results.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitnessExercise {
    pub id: i64,
    pub name: String,
    /// Measurement unit ("reps", "seconds"); absent for select-valued exercises
    pub unit: Option<String>,
    /// Allowed values for select-valued exercises
    pub select: Vec<String>,
}

impl FitnessExercise {
    pub fn new(id: i64, name: impl Into<String>, unit: Option<&str>) -> Self {
        Self {
            id,
            name: name.into(),
            unit: unit.map(str::to_string),
            select: Vec::new(),
        }
    }

    pub fn with_select(mut self, options: Vec<String>) -> Self {
        self.select = options;
        self
    }
}

/// One sitting of fitness tests: a semester, a date, a conducting teacher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitnessSession {
    pub id: i64,
    pub semester_id: i64,
    pub teacher_id: i64,
    pub date: NaiveDate,
    pub retake: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitnessResult {
    pub id: i64,
    pub session_id: i64,
    pub student_id: i64,
    pub exercise_id: i64,
    /// Raw value as submitted; select exercises store the chosen option
    pub value: String,
}
