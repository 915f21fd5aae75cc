//! Students and trainers.

use serde::{Deserialize, Serialize};

/// Enrollment eligibility status of a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudentStatus {
    Normal,
    AcademicLeave,
    Expelled,
}

impl StudentStatus {
    pub fn is_normal(&self) -> bool {
        matches!(self, StudentStatus::Normal)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub user_id: i64,
    pub full_name: String,
    pub email: String,
    /// "M" / "F", unset until the student fills the profile
    pub gender: Option<String>,
    pub medical_group_id: i64,
    /// Chosen sport; enrollment requires one
    pub sport_id: Option<i64>,
    pub has_qr: bool,
    pub status: StudentStatus,
}

impl Student {
    pub fn new(user_id: i64, full_name: impl Into<String>, email: impl Into<String>, medical_group_id: i64) -> Self {
        Self {
            user_id,
            full_name: full_name.into(),
            email: email.into(),
            gender: None,
            medical_group_id,
            sport_id: None,
            has_qr: false,
            status: StudentStatus::Normal,
        }
    }

    pub fn with_sport(mut self, sport_id: i64) -> Self {
        self.sport_id = Some(sport_id);
        self
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trainer {
    pub user_id: i64,
    pub full_name: String,
    pub email: String,
}

impl Trainer {
    pub fn new(user_id: i64, full_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id,
            full_name: full_name.into(),
            email: email.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_builder() {
        let student = Student::new(1, "Ivan Petrov", "i.petrov@example.edu", 10)
            .with_sport(3)
            .with_gender("M");
        assert_eq!(student.sport_id, Some(3));
        assert_eq!(student.gender.as_deref(), Some("M"));
        assert!(student.status.is_normal());
        assert!(!student.has_qr);
    }
}
