#[cfg(test)]
pub mod test_utils {
    use crate::auth::Role;
    use crate::db::{assign_workout_plan, init_user_documents};
    use crate::env::AppConfig;
    use crate::error::AppError;
    use crate::identity::{IdentityProvider, MemoryIdentityProvider};
    use crate::init_rocket;
    use crate::models::{ExerciseSet, PlannedExercise, Weekday, WorkoutDay, WorkoutPlan};
    use crate::services::Services;
    use crate::store::MemoryObjectStore;
    use rocket::http::{ContentType, Cookie, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Once};

    static INIT: Once = Once::new();
    pub static STANDARD_PASSWORD: &str = "password123";
    pub static TEST_SESSION_SECRET: &str = "test-session-secret";

    pub const STUDENT_EMAIL: &str = "student@example.com";
    pub const OTHER_STUDENT_EMAIL: &str = "other.student@example.com";
    pub const TRAINER_EMAIL: &str = "trainer@example.com";

    #[derive(Default)]
    pub struct TestEnvBuilder {
        users: Vec<TestUser>,
        assignments: Vec<TestAssignment>,
    }

    pub struct TestUser {
        pub email: String,
        pub role: Role,
        pub password: String,
    }

    pub struct TestAssignment {
        pub trainer_email: String,
        pub student_email: String,
        pub plan: WorkoutPlan,
    }

    impl TestEnvBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn student(mut self, email: &str) -> Self {
            self.users.push(TestUser {
                email: email.to_string(),
                role: Role::Student,
                password: STANDARD_PASSWORD.to_string(),
            });
            self
        }

        pub fn trainer(mut self, email: &str) -> Self {
            self.users.push(TestUser {
                email: email.to_string(),
                role: Role::Trainer,
                password: STANDARD_PASSWORD.to_string(),
            });
            self
        }

        pub fn assign_plan(mut self, trainer_email: &str, student_email: &str, plan: WorkoutPlan) -> Self {
            self.assignments.push(TestAssignment {
                trainer_email: trainer_email.to_string(),
                student_email: student_email.to_string(),
                plan,
            });
            self
        }

        pub async fn build(self) -> Result<TestEnv, AppError> {
            INIT.call_once(|| {
                let _ = env_logger::builder()
                    .parse_filters("debug")
                    .is_test(true)
                    .try_init();
            });

            let identity = Arc::new(MemoryIdentityProvider::new());
            let objects = Arc::new(MemoryObjectStore::new());
            let services = Services::new(identity.clone(), objects.clone());

            let mut subjects: HashMap<String, String> = HashMap::new();

            for user in &self.users {
                let subject = identity
                    .register(&user.email, &user.password, user.role)
                    .await?;
                init_user_documents(&services.documents, &subject).await?;
                subjects.insert(user.email.clone(), subject);
            }

            for assignment in self.assignments {
                let lookup = |email: &str| {
                    subjects
                        .get(email)
                        .cloned()
                        .ok_or_else(|| AppError::NotFound(format!("No test user {}", email)))
                };
                let trainer_sub = lookup(&assignment.trainer_email)?;
                let student_sub = lookup(&assignment.student_email)?;

                assign_workout_plan(
                    &services.documents,
                    &trainer_sub,
                    &student_sub,
                    &assignment.student_email,
                    assignment.plan,
                )
                .await?;
            }

            Ok(TestEnv {
                services,
                objects,
                subjects,
            })
        }
    }

    pub struct TestEnv {
        pub services: Services,
        pub objects: Arc<MemoryObjectStore>,
        pub subjects: HashMap<String, String>,
    }

    impl TestEnv {
        pub fn subject(&self, email: &str) -> &str {
            self.subjects
                .get(email)
                .map(String::as_str)
                .unwrap_or_else(|| panic!("No test user {}", email))
        }
    }

    pub async fn create_standard_test_env() -> TestEnv {
        TestEnvBuilder::new()
            .student(STUDENT_EMAIL)
            .student(OTHER_STUDENT_EMAIL)
            .trainer(TRAINER_EMAIL)
            .build()
            .await
            .expect("Failed to build test environment")
    }

    pub async fn setup_test_client(env: TestEnv) -> (Client, TestEnv) {
        let config = AppConfig::in_memory(TEST_SESSION_SECRET);
        let rocket = init_rocket(&config, env.services.clone());
        let client = Client::untracked(rocket)
            .await
            .expect("valid rocket instance");

        (client, env)
    }

    pub async fn login_test_user(client: &Client, email: &str, password: &str) -> Vec<Cookie<'static>> {
        let response = client
            .post("/login")
            .header(ContentType::JSON)
            .body(json!({ "email": email, "password": password }).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok, "login failed for {}", email);

        response
            .cookies()
            .iter()
            .map(|cookie| cookie.clone().into_owned())
            .collect()
    }

    /// Monday squats and Wednesday bench, rest otherwise.
    pub fn sample_plan() -> WorkoutPlan {
        WorkoutPlan::from_days(vec![
            WorkoutDay {
                day_name: Weekday::Monday,
                exercises: vec![PlannedExercise {
                    name: "Squats".to_string(),
                    sets: vec![
                        ExerciseSet {
                            number: 1,
                            reps: 5,
                            weight: 100.0,
                        },
                        ExerciseSet {
                            number: 2,
                            reps: 5,
                            weight: 105.0,
                        },
                    ],
                }],
            },
            WorkoutDay {
                day_name: Weekday::Wednesday,
                exercises: vec![PlannedExercise {
                    name: "Bench Press".to_string(),
                    sets: vec![ExerciseSet {
                        number: 1,
                        reps: 8,
                        weight: 60.0,
                    }],
                }],
            },
        ])
        .expect("sample plan has no duplicate days")
    }
}
