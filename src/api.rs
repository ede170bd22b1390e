use chrono::{DateTime, Utc};
use rocket::{Request, State};
use rocket::http::{CookieJar, Status};
use rocket::response::Redirect;
use rocket::response::status::Custom;
use rocket::serde::{Deserialize, Serialize, json::Json};
use tracing::{info, warn};
use validator::Validate;

use crate::auth::{Access, AccessDecision, Permission, Role, Session, authorize};
use crate::db::{
    add_exercise_record, assign_workout_plan, get_exercise_records, get_roster, get_user_document,
    init_user_documents,
};
use crate::error::AppError;
use crate::identity::EMAIL_ATTRIBUTE;
use crate::models::{ExerciseRecords, WorkoutDay, WorkoutPlan};
use crate::services::Services;
use crate::validation::{JsonValidateExt, checkbox, number_or_string};

pub const NOT_ALLOWED: &str = "You are not allowed to perform this action";
pub const MALFORMED_REQUEST: &str = "A field is missing or has a value of the wrong type";

#[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

impl ActionResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn redirect(url: &str) -> Self {
        Self {
            success: true,
            redirect_url: Some(url.to_string()),
            ..Self::default()
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn not_allowed() -> Self {
        Self::failure(NOT_ALLOWED)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserData {
    pub subject: String,
    pub email: String,
    pub role: String,
}

impl From<Session> for UserData {
    fn from(session: Session) -> Self {
        Self {
            subject: session.subject,
            email: session.email,
            role: session.role.to_string(),
        }
    }
}

/// What a page would render. Markup is left to the client.
#[derive(Serialize, Deserialize, Debug)]
pub struct PageView {
    pub page: String,
    pub title: String,
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserData>,
    pub links: Vec<String>,
}

impl PageView {
    fn new(page: &str, title: &str, session: Option<Session>, access: Access) -> Self {
        let allowed = authorize(session.as_ref(), access) == AccessDecision::Allow;

        let links = match &session {
            Some(session) => {
                let mut links = Vec::new();
                if session.can(Permission::ViewOwnWorkouts) {
                    links.push("/my-workouts");
                }
                if session.can(Permission::ManageOwnRecords) {
                    links.push("/my-records");
                }
                if session.can(Permission::AssignWorkouts) {
                    links.push("/add-workout");
                }
                if session.can(Permission::ViewRoster) {
                    links.push("/my-students");
                }
                links.push("/logout");
                links
            }
            None => vec!["/login", "/register"],
        };

        Self {
            page: page.to_string(),
            title: format!("{} - Strength Coach", title),
            allowed,
            user: session.map(UserData::from),
            links: links.into_iter().map(String::from).collect(),
        }
    }
}

#[get("/")]
pub fn dashboard(session: Session) -> Json<PageView> {
    Json(PageView::new(
        "dashboard",
        "Dashboard",
        Some(session),
        Access::Authenticated,
    ))
}

#[get("/", rank = 2)]
pub fn landing() -> Json<PageView> {
    Json(PageView::new("index", "Welcome", None, Access::Public))
}

#[get("/login")]
pub fn login_page() -> Json<PageView> {
    Json(PageView::new("login", "Login", None, Access::Public))
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please enter a valid email address"))]
    email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    password: String,
}

#[post("/login", data = "<login>")]
pub async fn login(
    login: Json<LoginRequest>,
    cookies: &CookieJar<'_>,
    services: &State<Services>,
) -> Result<Json<ActionResponse>, AppError> {
    let validated = login.validate_custom()?;
    let email = validated.email.trim().to_string();
    info!(email = %email, "Login attempt");

    let tokens = services
        .identity
        .authenticate(&email, &validated.password)
        .await?;
    info!(expires_in = tokens.expires_in, "Identity provider issued tokens");

    let account = services.identity.account(&email).await?;

    Session {
        subject: account.subject,
        role: account.role,
        email: email.clone(),
    }
    .store(cookies);

    info!(email = %email, role = %account.role, "Authentication successful");
    Ok(Json(ActionResponse::redirect("/")))
}

#[get("/register")]
pub fn register_page() -> Json<PageView> {
    Json(PageView::new("register", "Register", None, Access::Public))
}

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Please enter a valid email address"))]
    email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    password1: String,
    password2: String,
    #[serde(rename = "isTrainer", default, deserialize_with = "checkbox")]
    is_trainer: bool,
    #[serde(rename = "userRole", default)]
    user_role: Option<String>,
}

impl RegisterRequest {
    fn role(&self) -> Result<Role, AppError> {
        match &self.user_role {
            Some(name) => Role::from_str(name).map_err(|e| AppError::Validation(e.to_string())),
            None => Ok(Role::from_trainer_flag(self.is_trainer)),
        }
    }
}

#[post("/register", data = "<registration>")]
pub async fn register(
    registration: Json<RegisterRequest>,
    services: &State<Services>,
) -> Result<Custom<Json<ActionResponse>>, AppError> {
    if registration.password1 != registration.password2 {
        return Err(AppError::Validation("Passwords do not match".to_string()));
    }

    let validated = registration.validate_custom()?;
    let role = validated.role()?;
    let email = validated.email.trim().to_string();
    info!(email = %email, role = %role, "Registration attempt");

    let subject = services
        .identity
        .register(&email, &validated.password1, role)
        .await?;

    init_user_documents(&services.documents, &subject).await?;

    info!(subject = %subject, "Registration complete");
    Ok(Custom(Status::Created, Json(ActionResponse::redirect("/login"))))
}

#[get("/add-workout")]
pub fn add_workout_page(session: Session) -> Json<PageView> {
    Json(PageView::new(
        "add_workout",
        "Add Workout",
        Some(session),
        Access::Requires(Permission::AssignWorkouts),
    ))
}

#[derive(Deserialize, Validate)]
pub struct AddWorkoutRequest {
    #[validate(email(message = "Please enter the student's email address"))]
    email: String,
    #[serde(default)]
    workout_plan: Vec<WorkoutDay>,
}

#[post("/add-workout", data = "<request>")]
pub async fn add_workout(
    request: Json<AddWorkoutRequest>,
    session: Session,
    services: &State<Services>,
) -> Result<Json<ActionResponse>, AppError> {
    if !session.can(Permission::AssignWorkouts) {
        warn!(subject = %session.subject, "Non-trainer tried to assign a workout");
        return Ok(Json(ActionResponse::not_allowed()));
    }

    let validated = request.validate_custom()?;
    let student_email = validated.email.trim().to_string();
    let plan = WorkoutPlan::from_days(validated.workout_plan)?;

    let student_sub = match services.identity.subject_for_email(&student_email).await {
        Ok(subject) => subject,
        Err(AppError::NotFound(_)) => {
            return Err(AppError::NotFound(format!(
                "No account found for {}",
                student_email
            )));
        }
        Err(err) => return Err(err),
    };

    let outcome = assign_workout_plan(
        &services.documents,
        &session.subject,
        &student_sub,
        &student_email,
        plan,
    )
    .await?;

    info!(
        trainer = %session.subject,
        student = %student_sub,
        added_to_roster = outcome.added_to_roster,
        "Workout assigned"
    );
    Ok(Json(ActionResponse::ok()))
}

#[derive(Serialize, Deserialize, Debug)]
pub struct WorkoutsResponse {
    pub trainer_email: Option<String>,
    pub last_modified: DateTime<Utc>,
    pub workout_plan: WorkoutPlan,
}

#[get("/my-workouts")]
pub async fn my_workouts(
    session: Session,
    services: &State<Services>,
) -> Result<Json<WorkoutsResponse>, AppError> {
    let document = get_user_document(&services.documents, &session.subject).await?;

    // The trainer reference may outlive the trainer's account.
    let trainer_email = match &document.trainer {
        Some(trainer) => {
            if services.identity.exists(trainer).await? {
                Some(services.identity.attribute(trainer, EMAIL_ATTRIBUTE).await?)
            } else {
                None
            }
        }
        None => None,
    };

    let response = WorkoutsResponse {
        trainer_email,
        last_modified: document.last_modified,
        workout_plan: document.workout_plan.unwrap_or_else(WorkoutPlan::empty_week),
    };

    Ok(Json(response))
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct StudentsResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub students: Vec<String>,
}

#[get("/my-students")]
pub async fn my_students(
    session: Session,
    services: &State<Services>,
) -> Result<Json<StudentsResponse>, AppError> {
    if !session.can(Permission::ViewRoster) {
        return Ok(Json(StudentsResponse {
            success: false,
            message: Some(NOT_ALLOWED.to_string()),
            students: Vec::new(),
        }));
    }

    let roster = get_roster(&services.documents, &session.subject).await?;

    Ok(Json(StudentsResponse {
        success: true,
        message: None,
        students: roster.students,
    }))
}

#[get("/my-records")]
pub async fn my_records(
    session: Session,
    services: &State<Services>,
) -> Result<Json<ExerciseRecords>, AppError> {
    let records = get_exercise_records(&services.documents, &session.subject).await?;
    Ok(Json(records))
}

#[derive(Deserialize, Validate)]
pub struct RecordRequest {
    #[validate(length(min = 1, message = "Exercise name is required"))]
    exercise_name: String,
    #[serde(deserialize_with = "number_or_string")]
    #[validate(range(min = 0.0, message = "Weight must be a non-negative number"))]
    new_record: f64,
}

#[post("/my-records", data = "<record>")]
pub async fn add_record(
    record: Json<RecordRequest>,
    session: Session,
    services: &State<Services>,
) -> Result<Json<ActionResponse>, AppError> {
    let validated = record.validate_custom()?;

    add_exercise_record(
        &services.documents,
        &session.subject,
        validated.exercise_name.trim(),
        validated.new_record,
    )
    .await?;

    Ok(Json(ActionResponse::ok()))
}

#[get("/logout")]
pub fn logout(cookies: &CookieJar<'_>) -> Redirect {
    Session::clear(cookies);
    Redirect::to("/login")
}

fn malformed_request(req: &Request) -> Custom<Json<ActionResponse>> {
    warn!(uri = %req.uri(), "Request body could not be read");
    Custom(
        Status::BadRequest,
        Json(ActionResponse::failure(MALFORMED_REQUEST)),
    )
}

#[catch(400)]
pub fn bad_request(req: &Request) -> Custom<Json<ActionResponse>> {
    malformed_request(req)
}

#[catch(422)]
pub fn unprocessable_entity(req: &Request) -> Custom<Json<ActionResponse>> {
    malformed_request(req)
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}
