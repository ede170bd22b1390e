use rocket::serde::json::Json;
use serde::{Deserialize, Deserializer};
use tracing::instrument;
use validator::Validate;

use crate::error::AppError;

pub trait JsonValidateExt<T> {
    fn validate_custom(self) -> Result<T, AppError>;
}

impl<T: Validate> JsonValidateExt<T> for Json<T> {
    #[instrument(skip(self))]
    fn validate_custom(self) -> Result<T, AppError> {
        let inner = self.into_inner();
        inner.validate()?;
        Ok(inner)
    }
}

/// Browser forms post numbers as strings; both spellings are accepted.
pub fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    let value = match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n,
        Raw::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("'{}' is not a number", s)))?,
    };

    if !value.is_finite() {
        return Err(serde::de::Error::custom("number must be finite"));
    }
    Ok(value)
}

/// Checkbox values arrive as `true`, `"on"` or `"true"`; absent means unchecked.
pub fn checkbox<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Flag(bool),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Flag(flag) => flag,
        Raw::Text(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "on" | "true" | "1"),
    })
}
