use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Exercises every new account starts tracking records for.
pub const DEFAULT_EXERCISES: [&str; 3] = ["Bench Press", "Deadlift", "Squats"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSet {
    pub number: u32,
    pub reps: u32,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedExercise {
    pub name: String,
    #[serde(default)]
    pub sets: Vec<ExerciseSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutDay {
    pub day_name: Weekday,
    #[serde(default)]
    pub exercises: Vec<PlannedExercise>,
}

impl WorkoutDay {
    pub fn rest(day_name: Weekday) -> Self {
        Self {
            day_name,
            exercises: Vec::new(),
        }
    }
}

/// A week of training. Always holds exactly seven slots, Monday first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<WorkoutDay>", into = "Vec<WorkoutDay>")]
pub struct WorkoutPlan {
    days: Vec<WorkoutDay>,
}

impl WorkoutPlan {
    pub fn empty_week() -> Self {
        Self {
            days: Weekday::ALL.into_iter().map(WorkoutDay::rest).collect(),
        }
    }

    /// Places each supplied day in its slot; days that were not supplied are
    /// left empty. A day may only be supplied once.
    pub fn from_days(supplied: Vec<WorkoutDay>) -> Result<Self, AppError> {
        let mut plan = Self::empty_week();
        let mut seen = [false; 7];

        for day in supplied {
            let slot = day.day_name.index();
            if seen[slot] {
                return Err(AppError::Validation(format!(
                    "{} appears more than once in the workout plan",
                    day.day_name
                )));
            }
            seen[slot] = true;
            plan.days[slot] = day;
        }

        Ok(plan)
    }

    #[cfg(test)]
    pub fn days(&self) -> &[WorkoutDay] {
        &self.days
    }

    #[cfg(test)]
    pub fn day(&self, day: Weekday) -> &WorkoutDay {
        &self.days[day.index()]
    }
}

impl TryFrom<Vec<WorkoutDay>> for WorkoutPlan {
    type Error = AppError;

    fn try_from(days: Vec<WorkoutDay>) -> Result<Self, Self::Error> {
        Self::from_days(days)
    }
}

impl From<WorkoutPlan> for Vec<WorkoutDay> {
    fn from(plan: WorkoutPlan) -> Self {
        plan.days
    }
}

/// Stored under `user_data/`: the profile plus the assigned plan, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDocument {
    pub user_sub: String,
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub trainer: Option<String>,
    #[serde(default)]
    pub workout_plan: Option<WorkoutPlan>,
}

impl UserDocument {
    pub fn new(user_sub: &str) -> Self {
        Self {
            user_sub: user_sub.to_string(),
            last_modified: Utc::now(),
            trainer: None,
            workout_plan: None,
        }
    }

    /// Replaces the whole plan; nothing of the previous week survives.
    pub fn assign_plan(&mut self, trainer_sub: &str, plan: WorkoutPlan) {
        self.trainer = Some(trainer_sub.to_string());
        self.workout_plan = Some(plan);
        self.last_modified = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseRecord {
    pub exercise_name: String,
    #[serde(default)]
    pub records: Vec<f64>,
}

/// Stored under `user_records/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseRecords {
    pub user_sub: String,
    pub exercises: Vec<ExerciseRecord>,
}

impl ExerciseRecords {
    pub fn seeded(user_sub: &str) -> Self {
        Self {
            user_sub: user_sub.to_string(),
            exercises: DEFAULT_EXERCISES
                .iter()
                .map(|name| ExerciseRecord {
                    exercise_name: name.to_string(),
                    records: Vec::new(),
                })
                .collect(),
        }
    }

    /// Appends a weight observation to the named exercise. Returns false when
    /// no exercise of that name is tracked.
    pub fn record(&mut self, exercise_name: &str, weight: f64) -> bool {
        match self
            .exercises
            .iter_mut()
            .find(|e| e.exercise_name == exercise_name)
        {
            Some(exercise) => {
                exercise.records.push(weight);
                true
            }
            None => false,
        }
    }
}

/// Stored under `trainer_data/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerRoster {
    pub trainer_sub: String,
    #[serde(default)]
    pub students: Vec<String>,
}

impl TrainerRoster {
    pub fn new(trainer_sub: &str) -> Self {
        Self {
            trainer_sub: trainer_sub.to_string(),
            students: Vec::new(),
        }
    }

    pub fn contains(&self, email: &str) -> bool {
        self.students.iter().any(|s| s == email)
    }

    /// Appends the student unless already present. Returns whether the roster changed.
    pub fn add_student(&mut self, email: &str) -> bool {
        if self.contains(email) {
            return false;
        }
        self.students.push(email.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn squat_day(day: Weekday) -> WorkoutDay {
        WorkoutDay {
            day_name: day,
            exercises: vec![PlannedExercise {
                name: "Squats".to_string(),
                sets: vec![ExerciseSet {
                    number: 1,
                    reps: 5,
                    weight: 100.0,
                }],
            }],
        }
    }

    #[test]
    fn empty_week_has_seven_ordered_slots() {
        let plan = WorkoutPlan::empty_week();
        let names: Vec<Weekday> = plan.days().iter().map(|d| d.day_name).collect();
        assert_eq!(names, Weekday::ALL.to_vec());
        assert!(plan.days().iter().all(|d| d.exercises.is_empty()));
    }

    #[test]
    fn partial_plan_is_padded_to_full_week() {
        let plan = WorkoutPlan::from_days(vec![squat_day(Weekday::Friday), squat_day(Weekday::Monday)])
            .expect("valid plan");

        assert_eq!(plan.days().len(), 7);
        assert_eq!(plan.day(Weekday::Monday).exercises.len(), 1);
        assert_eq!(plan.day(Weekday::Friday).exercises.len(), 1);
        assert!(plan.day(Weekday::Wednesday).exercises.is_empty());
    }

    #[test]
    fn duplicate_day_is_rejected() {
        let result =
            WorkoutPlan::from_days(vec![squat_day(Weekday::Monday), squat_day(Weekday::Monday)]);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn plan_deserializes_from_client_payload() {
        let payload = json!([
            {"day_name": "Tuesday", "exercises": [
                {"name": "Deadlift", "sets": [{"number": 1, "reps": 3, "weight": 140.5}]}
            ]}
        ]);

        let plan: WorkoutPlan = serde_json::from_value(payload).expect("plan parses");
        assert_eq!(plan.day(Weekday::Tuesday).exercises[0].sets[0].weight, 140.5);

        let serialized = serde_json::to_value(&plan).unwrap();
        assert_eq!(serialized.as_array().unwrap().len(), 7);
    }

    #[test]
    fn factories_return_independent_values() {
        let mut first = WorkoutPlan::empty_week();
        let second = WorkoutPlan::empty_week();
        first.days[0] = squat_day(Weekday::Monday);
        assert!(second.day(Weekday::Monday).exercises.is_empty());
    }

    #[test]
    fn record_appends_only_to_named_exercise() {
        let mut records = ExerciseRecords::seeded("sub-1");
        assert!(records.record("Deadlift", 180.0));
        assert!(records.record("Deadlift", 185.0));

        let deadlift = &records.exercises[1];
        assert_eq!(deadlift.records, vec![180.0, 185.0]);
        assert!(records.exercises[0].records.is_empty());
        assert!(records.exercises[2].records.is_empty());
    }

    #[test]
    fn record_for_unknown_exercise_changes_nothing() {
        let mut records = ExerciseRecords::seeded("sub-1");
        let before = records.clone();
        assert!(!records.record("Overhead Press", 60.0));
        assert_eq!(records, before);
    }

    #[test]
    fn roster_keeps_insertion_order_without_duplicates() {
        let mut roster = TrainerRoster::new("trainer-1");
        assert!(roster.add_student("b@x.com"));
        assert!(roster.add_student("a@x.com"));
        assert!(!roster.add_student("b@x.com"));
        assert_eq!(roster.students, vec!["b@x.com", "a@x.com"]);
    }

    #[test]
    fn assigning_plan_replaces_previous_week() {
        let mut doc = UserDocument::new("student-1");
        doc.assign_plan(
            "trainer-1",
            WorkoutPlan::from_days(vec![squat_day(Weekday::Monday)]).unwrap(),
        );
        doc.assign_plan(
            "trainer-2",
            WorkoutPlan::from_days(vec![squat_day(Weekday::Sunday)]).unwrap(),
        );

        let plan = doc.workout_plan.as_ref().unwrap();
        assert!(plan.day(Weekday::Monday).exercises.is_empty());
        assert_eq!(plan.day(Weekday::Sunday).exercises.len(), 1);
        assert_eq!(doc.trainer.as_deref(), Some("trainer-2"));
    }
}
