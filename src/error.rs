use opentelemetry_semantic_conventions::{attribute::OTEL_STATUS_CODE, trace::ERROR_TYPE};
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use thiserror::Error;
use tracing::{Span, error, warn};

use crate::api::ActionResponse;

pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const GENERIC_FAILURE: &str = "An unexpected error occurred, please try again later";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Registration error: {0}")]
    Registration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn log_and_record(&self, ctx: &str) {
        let current_span = Span::current();
        let is_valid_span = !current_span.is_none();

        let message = self.to_string();
        let error_kind = match self {
            AppError::Storage(msg) => {
                error!(message = %msg, context = %ctx, "Storage error");
                "storage_error"
            }
            AppError::Authentication(msg) => {
                warn!(message = %msg, context = %ctx, "Authentication error");
                "authentication_error"
            }
            AppError::Registration(msg) => {
                warn!(message = %msg, context = %ctx, "Registration rejected");
                "registration_error"
            }
            AppError::NotFound(msg) => {
                warn!(message = %msg, context = %ctx, "Not found error");
                "not_found_error"
            }
            AppError::Validation(msg) => {
                warn!(message = %msg, context = %ctx, "Validation error");
                "validation_error"
            }
            AppError::ExternalService(msg) => {
                error!(message = %msg, context = %ctx, "External service error");
                "external_service_error"
            }
            AppError::Internal(msg) => {
                error!(message = %msg, context = %ctx, "Internal server error");
                "internal_error"
            }
        };

        if is_valid_span {
            current_span.record("error", tracing::field::display(true));
            current_span.record(ERROR_TYPE, tracing::field::display(error_kind));
            current_span.record("error.message", tracing::field::display(&message));

            match self {
                AppError::Storage(_) | AppError::Internal(_) | AppError::ExternalService(_) => {
                    current_span.record(OTEL_STATUS_CODE, tracing::field::display("ERROR"));
                }
                _ => {}
            }
        }
    }

    pub fn status_code(&self) -> Status {
        match self {
            AppError::Storage(_) => Status::InternalServerError,
            AppError::Authentication(_) => Status::BadRequest,
            AppError::Registration(_) => Status::BadRequest,
            AppError::NotFound(_) => Status::NotFound,
            AppError::Validation(_) => Status::BadRequest,
            AppError::ExternalService(_) => Status::InternalServerError,
            AppError::Internal(_) => Status::InternalServerError,
        }
    }

    /// The message handed back to the caller. Server-side failures never leak
    /// their detail, and credential failures never say which half was wrong.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::Authentication(_) => INVALID_CREDENTIALS.to_string(),
            AppError::Registration(msg) => summary(msg).to_string(),
            AppError::Storage(_) | AppError::ExternalService(_) | AppError::Internal(_) => {
                GENERIC_FAILURE.to_string()
            }
        }
    }

    pub fn to_status_with_log(&self, context: &str) -> Status {
        self.log_and_record(context);
        self.status_code()
    }
}

// Provider messages look like "Password did not conform with policy: Password not long enough";
// everything after the first colon is dropped.
fn summary(message: &str) -> &str {
    message
        .split_once(':')
        .map(|(head, _)| head)
        .unwrap_or(message)
        .trim()
}

impl<'r> rocket::response::Responder<'r, 'static> for AppError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'static> {
        let status = self.to_status_with_log(&format!("Request to {} {}", req.method(), req.uri()));

        Custom(status, Json(ActionResponse::failure(self.public_message()))).respond_to(req)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        AppError::ExternalService(format!("HTTP transport error: {}", error))
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> Self {
        AppError::Internal(format!("Cryptography error: {}", error))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", error))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, field_errors)| {
                field_errors.iter().map(move |error| {
                    error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field))
                })
            })
            .collect();
        messages.sort();

        AppError::Validation(messages.join(", "))
    }
}

impl From<AppError> for Status {
    fn from(err: AppError) -> Self {
        err.to_status_with_log("Error conversion into Status")
    }
}
