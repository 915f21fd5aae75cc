//! Development data seeding.

use chrono::{Duration, NaiveDate, Utc};
use tracing::info;

use crate::fitnesstest::entity::FitnessExercise;
use crate::group::entity::{Group, Sport};
use crate::measurement::Measurement;
use crate::medical_group::MedicalGroup;
use crate::profile::entity::{Student, Trainer};
use crate::selfsport::SelfSportType;
use crate::semester::Semester;
use crate::shared::store::SportStore;
use crate::training::entity::Training;

/// Seeds an empty store with a small demo dataset for local development.
pub struct DevSeeder<'a> {
    store: &'a SportStore,
}

impl<'a> DevSeeder<'a> {
    pub fn new(store: &'a SportStore) -> Self {
        Self { store }
    }

    /// Populate the store. Does nothing when data is already present.
    pub fn seed(&self) {
        let store = self.store;
        if !store.students.is_empty() {
            info!("Dev data seeding skipped (store is not empty)");
            return;
        }

        let main_mg = store.next_id();
        store
            .medical_groups
            .insert(main_mg, MedicalGroup::new(main_mg, "Main", "No load restrictions"));
        let prep_mg = store.next_id();
        store.medical_groups.insert(
            prep_mg,
            MedicalGroup::new(prep_mg, "Preparatory", "Reduced load"),
        );
        let special_mg = store.next_id();
        store.medical_groups.insert(
            special_mg,
            MedicalGroup::new(special_mg, "Special", "Medical supervision required"),
        );

        let football = store.next_id();
        store.sports.insert(football, Sport { id: football, name: "Football".to_string() });
        let swimming = store.next_id();
        store.sports.insert(swimming, Sport { id: swimming, name: "Swimming".to_string() });
        let yoga = store.next_id();
        store.sports.insert(yoga, Sport { id: yoga, name: "Yoga".to_string() });

        let today = Utc::now().date_naive();
        let past = store.next_id();
        store.semesters.insert(
            past,
            Semester::new(
                past,
                "S25",
                NaiveDate::from_ymd_opt(2025, 1, 20).unwrap_or(today),
                NaiveDate::from_ymd_opt(2025, 5, 31).unwrap_or(today),
                false,
            ),
        );
        let current = store.next_id();
        store.semesters.insert(
            current,
            Semester::new(current, "F25", today - Duration::days(30), today + Duration::days(90), true),
        );

        let trainer = store.next_id();
        store
            .trainers
            .insert(trainer, Trainer::new(trainer, "Anna Kim", "a.kim@example.edu"));

        let football_group = store.next_id();
        store.groups.insert(
            football_group,
            Group::new(football_group, "Football-1", football, current, 20)
                .with_trainers(vec![trainer])
                .with_allowed_medical_groups(vec![main_mg, prep_mg]),
        );
        let swimming_group = store.next_id();
        store.groups.insert(
            swimming_group,
            Group::new(swimming_group, "Swimming-1", swimming, current, 15)
                .with_trainers(vec![trainer])
                .with_allowed_medical_groups(vec![main_mg])
                .with_require_qr(true),
        );

        for (name, email) in [
            ("Ivan Petrov", "i.petrov@example.edu"),
            ("Maria Sidorova", "m.sidorova@example.edu"),
            ("Alex Volkov", "a.volkov@example.edu"),
        ] {
            let id = store.next_id();
            store
                .students
                .insert(id, Student::new(id, name, email, main_mg).with_sport(football));
        }

        // A week of trainings around now, so check-in works out of the box
        let now = Utc::now();
        for day in -2i64..5 {
            let start = now + Duration::days(day);
            let id = store.next_id();
            store.trainings.insert(
                id,
                Training::new(id, football_group, start, start + Duration::minutes(90))
                    .with_class("Main field"),
            );
        }

        for (name, rule) in [
            ("Running", "Attach a link to the tracked activity"),
            ("Gym workout", "Attach a link or a signed gym report"),
        ] {
            let id = store.next_id();
            store
                .selfsport_types
                .insert(id, SelfSportType::new(id, name, rule));
        }

        for (name, unit) in [("Push-ups", Some("reps")), ("Tilt", Some("cm"))] {
            let id = store.next_id();
            store
                .fitness_exercises
                .insert(id, FitnessExercise::new(id, name, unit));
        }
        let id = store.next_id();
        store.fitness_exercises.insert(
            id,
            FitnessExercise::new(id, "Swimming technique", None).with_select(vec![
                "poor".to_string(),
                "good".to_string(),
                "excellent".to_string(),
            ]),
        );

        for (name, unit) in [("Height", "cm"), ("Weight", "kg")] {
            let id = store.next_id();
            store
                .measurements
                .insert(id, Measurement::new(id, name, unit));
        }

        info!(
            students = store.students.len(),
            groups = store.groups.len(),
            trainings = store.trainings.len(),
            "Dev data seeded"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_idempotent() {
        let store = SportStore::new();
        DevSeeder::new(&store).seed();
        let students = store.students.len();
        assert!(students > 0);
        assert!(store.ongoing_semester().is_some());

        DevSeeder::new(&store).seed();
        assert_eq!(store.students.len(), students);
    }
}
