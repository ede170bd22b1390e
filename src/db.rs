use tracing::{info, instrument, warn};

use crate::error::AppError;
use crate::models::{ExerciseRecords, TrainerRoster, UserDocument, WorkoutPlan};
use crate::store::{DocumentKind, DocumentStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentOutcome {
    pub added_to_roster: bool,
}

/// Writes the profile and the seeded record set of a freshly registered account.
#[instrument(skip(store))]
pub async fn init_user_documents(store: &DocumentStore, subject: &str) -> Result<(), AppError> {
    info!("Creating user documents");
    store
        .write(DocumentKind::UserData, subject, &UserDocument::new(subject))
        .await?;
    store
        .write(
            DocumentKind::UserRecords,
            subject,
            &ExerciseRecords::seeded(subject),
        )
        .await?;

    Ok(())
}

#[instrument(skip(store))]
pub async fn get_user_document(
    store: &DocumentStore,
    subject: &str,
) -> Result<UserDocument, AppError> {
    info!("Fetching user document");
    store.read(DocumentKind::UserData, subject).await
}

/// Replaces the student's plan, then makes sure the student is on the
/// trainer's roster.
///
/// The two documents are written independently. The plan goes first: if it
/// fails nothing has changed, and if the roster write fails afterwards the
/// whole call can simply be repeated since adding to a roster is idempotent.
#[instrument(skip(store, plan))]
pub async fn assign_workout_plan(
    store: &DocumentStore,
    trainer_sub: &str,
    student_sub: &str,
    student_email: &str,
    plan: WorkoutPlan,
) -> Result<AssignmentOutcome, AppError> {
    info!("Assigning workout plan");
    let mut student = store
        .read_or_else(DocumentKind::UserData, student_sub, || {
            warn!("Student has no profile document, creating one");
            UserDocument::new(student_sub)
        })
        .await?;
    student.assign_plan(trainer_sub, plan);
    store
        .write(DocumentKind::UserData, student_sub, &student)
        .await?;

    let mut roster = get_roster(store, trainer_sub).await?;
    let added_to_roster = roster.add_student(student_email);
    if added_to_roster {
        store
            .write(DocumentKind::TrainerData, trainer_sub, &roster)
            .await?;
    }

    Ok(AssignmentOutcome { added_to_roster })
}

#[instrument(skip(store))]
pub async fn get_roster(store: &DocumentStore, trainer_sub: &str) -> Result<TrainerRoster, AppError> {
    info!("Fetching trainer roster");
    store
        .read_or_else(DocumentKind::TrainerData, trainer_sub, || {
            TrainerRoster::new(trainer_sub)
        })
        .await
}

#[instrument(skip(store))]
pub async fn get_exercise_records(
    store: &DocumentStore,
    subject: &str,
) -> Result<ExerciseRecords, AppError> {
    info!("Fetching exercise records");
    store.read(DocumentKind::UserRecords, subject).await
}

/// Appends one observation. Returns false, without writing, when the
/// exercise is not tracked for this user.
#[instrument(skip(store))]
pub async fn add_exercise_record(
    store: &DocumentStore,
    subject: &str,
    exercise_name: &str,
    weight: f64,
) -> Result<bool, AppError> {
    info!("Recording exercise weight");
    let mut records = get_exercise_records(store, subject).await?;

    if !records.record(exercise_name, weight) {
        warn!("Exercise is not tracked, nothing recorded");
        return Ok(false);
    }

    store
        .write(DocumentKind::UserRecords, subject, &records)
        .await?;
    Ok(true)
}
