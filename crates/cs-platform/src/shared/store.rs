//! In-memory data store.
//!
//! The persistence technology behind the resource handlers is out of scope
//! for this service; state lives in concurrent maps behind repository-style
//! accessors. Collections are public so handlers can run their own scans;
//! the methods below cover the cross-aggregate joins used in more than one
//! place.

use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;

use crate::attendance::entity::Attendance;
use crate::enrollment::entity::Enroll;
use crate::fitnesstest::entity::{FitnessExercise, FitnessResult, FitnessSession};
use crate::group::entity::{Group, Sport};
use crate::measurement::{Measurement, MeasurementResult};
use crate::medical_group::MedicalGroup;
use crate::profile::entity::{Student, Trainer};
use crate::reference::MedicalReference;
use crate::selfsport::{SelfSportReport, SelfSportType};
use crate::semester::Semester;
use crate::training::entity::{CheckIn, Training};

#[derive(Default)]
pub struct SportStore {
    next_id: AtomicI64,
    pub students: DashMap<i64, Student>,
    pub trainers: DashMap<i64, Trainer>,
    pub sports: DashMap<i64, Sport>,
    pub medical_groups: DashMap<i64, MedicalGroup>,
    pub semesters: DashMap<i64, Semester>,
    pub groups: DashMap<i64, Group>,
    pub enrolls: DashMap<i64, Enroll>,
    pub trainings: DashMap<i64, Training>,
    pub checkins: DashMap<i64, CheckIn>,
    pub attendance: DashMap<i64, Attendance>,
    pub references: DashMap<i64, MedicalReference>,
    pub selfsport_types: DashMap<i64, SelfSportType>,
    pub selfsport_reports: DashMap<i64, SelfSportReport>,
    pub fitness_exercises: DashMap<i64, FitnessExercise>,
    pub fitness_sessions: DashMap<i64, FitnessSession>,
    pub fitness_results: DashMap<i64, FitnessResult>,
    pub measurements: DashMap<i64, Measurement>,
    pub measurement_results: DashMap<i64, MeasurementResult>,
}

impl SportStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Default::default()
        }
    }

    /// Allocate the next entity id.
    pub fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    // ------------------------------------------------------------------
    // Single-entity lookups
    // ------------------------------------------------------------------

    pub fn student(&self, user_id: i64) -> Option<Student> {
        self.students.get(&user_id).map(|s| s.clone())
    }

    pub fn trainer(&self, user_id: i64) -> Option<Trainer> {
        self.trainers.get(&user_id).map(|t| t.clone())
    }

    pub fn sport(&self, id: i64) -> Option<Sport> {
        self.sports.get(&id).map(|s| s.clone())
    }

    pub fn medical_group(&self, id: i64) -> Option<MedicalGroup> {
        self.medical_groups.get(&id).map(|m| m.clone())
    }

    pub fn semester(&self, id: i64) -> Option<Semester> {
        self.semesters.get(&id).map(|s| s.clone())
    }

    pub fn group(&self, id: i64) -> Option<Group> {
        self.groups.get(&id).map(|g| g.clone())
    }

    pub fn training(&self, id: i64) -> Option<Training> {
        self.trainings.get(&id).map(|t| t.clone())
    }

    /// The semester currently marked active, if any.
    pub fn ongoing_semester(&self) -> Option<Semester> {
        self.semesters
            .iter()
            .find(|s| s.is_active)
            .map(|s| s.clone())
    }

    // ------------------------------------------------------------------
    // Enrollment joins
    // ------------------------------------------------------------------

    pub fn enrollment(&self, student_id: i64, group_id: i64) -> Option<Enroll> {
        self.enrolls
            .iter()
            .find(|e| e.student_id == student_id && e.group_id == group_id)
            .map(|e| e.clone())
    }

    /// Number of students enrolled into a group.
    pub fn group_load(&self, group_id: i64) -> usize {
        self.enrolls.iter().filter(|e| e.group_id == group_id).count()
    }

    /// Groups the student is enrolled into within one semester.
    pub fn student_groups_in_semester(&self, student_id: i64, semester_id: i64) -> Vec<Group> {
        self.enrolls
            .iter()
            .filter(|e| e.student_id == student_id)
            .filter_map(|e| self.group(e.group_id))
            .filter(|g| g.semester_id == semester_id)
            .collect()
    }

    pub fn enrolled_students(&self, group_id: i64) -> Vec<Student> {
        self.enrolls
            .iter()
            .filter(|e| e.group_id == group_id)
            .filter_map(|e| self.student(e.student_id))
            .collect()
    }

    // ------------------------------------------------------------------
    // Trainings, check-ins, attendance
    // ------------------------------------------------------------------

    pub fn trainings_for_group(&self, group_id: i64) -> Vec<Training> {
        let mut trainings: Vec<Training> = self
            .trainings
            .iter()
            .filter(|t| t.group_id == group_id)
            .map(|t| t.clone())
            .collect();
        trainings.sort_by_key(|t| t.start);
        trainings
    }

    pub fn checkin(&self, student_id: i64, training_id: i64) -> Option<CheckIn> {
        self.checkins
            .iter()
            .find(|c| c.student_id == student_id && c.training_id == training_id)
            .map(|c| c.clone())
    }

    pub fn checkin_count(&self, training_id: i64) -> usize {
        self.checkins
            .iter()
            .filter(|c| c.training_id == training_id)
            .count()
    }

    pub fn attendance_for(&self, student_id: i64, training_id: i64) -> Option<Attendance> {
        self.attendance
            .iter()
            .find(|a| a.student_id == student_id && a.training_id == training_id)
            .map(|a| a.clone())
    }

    /// Attendance entries of one student within one semester, joined with
    /// the training and its group. Sorted by training start.
    pub fn student_attendance_in_semester(
        &self,
        student_id: i64,
        semester_id: i64,
    ) -> Vec<(Attendance, Training, Group)> {
        let mut rows: Vec<(Attendance, Training, Group)> = self
            .attendance
            .iter()
            .filter(|a| a.student_id == student_id)
            .filter_map(|a| {
                let training = self.training(a.training_id)?;
                let group = self.group(training.group_id)?;
                (group.semester_id == semester_id).then(|| (a.clone(), training, group))
            })
            .collect();
        rows.sort_by_key(|(_, training, _)| training.start);
        rows
    }

    /// Total attendance hours a student earned from groups in a semester.
    pub fn student_group_hours(&self, student_id: i64, semester_id: i64) -> f64 {
        self.student_attendance_in_semester(student_id, semester_id)
            .iter()
            .map(|(attendance, _, _)| attendance.hours)
            .sum()
    }

    /// Total approved self-sport hours a student earned within a semester's
    /// date range.
    pub fn student_selfsport_hours(&self, student_id: i64, semester: &Semester) -> f64 {
        self.selfsport_reports
            .iter()
            .filter(|r| r.student_id == student_id && r.approved == Some(true))
            .filter(|r| {
                let date = r.uploaded_at.date_naive();
                semester.start <= date && date <= semester.end
            })
            .map(|r| r.hours)
            .sum()
    }
}
