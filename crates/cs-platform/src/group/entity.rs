//! Sports and training groups.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sport {
    pub id: i64,
    pub name: String,
}

/// A training group within one semester of one sport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub sport_id: i64,
    pub semester_id: i64,
    pub capacity: u32,
    pub trainer_ids: Vec<i64>,
    pub allowed_medical_group_ids: Vec<i64>,
    /// Accredited groups award academic hours for attendance
    pub accredited: bool,
    /// Check-in requires a signed QR token
    pub require_qr: bool,
}

impl Group {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        sport_id: i64,
        semester_id: i64,
        capacity: u32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            sport_id,
            semester_id,
            capacity,
            trainer_ids: Vec::new(),
            allowed_medical_group_ids: Vec::new(),
            accredited: true,
            require_qr: false,
        }
    }

    pub fn with_trainers(mut self, trainer_ids: Vec<i64>) -> Self {
        self.trainer_ids = trainer_ids;
        self
    }

    pub fn with_allowed_medical_groups(mut self, ids: Vec<i64>) -> Self {
        self.allowed_medical_group_ids = ids;
        self
    }

    pub fn with_require_qr(mut self, require_qr: bool) -> Self {
        self.require_qr = require_qr;
        self
    }

    pub fn has_trainer(&self, user_id: i64) -> bool {
        self.trainer_ids.contains(&user_id)
    }

    pub fn allows_medical_group(&self, medical_group_id: i64) -> bool {
        self.allowed_medical_group_ids.contains(&medical_group_id)
    }
}
