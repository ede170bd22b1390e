pub mod cognito;
pub mod memory;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::auth::Role;
use crate::error::AppError;

pub use cognito::CognitoIdentityProvider;
pub use memory::MemoryIdentityProvider;

type HmacSha256 = Hmac<Sha256>;

pub const SUBJECT_ATTRIBUTE: &str = "sub";
pub const EMAIL_ATTRIBUTE: &str = "email";
pub const ROLE_ATTRIBUTE: &str = "custom:user_type";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBundle {
    pub access_token: String,
    pub id_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub token_type: String,
}

/// What a single lookup by email or subject says about an account.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSummary {
    pub subject: String,
    pub role: Role,
}

/// Account operations delegated to the managed identity provider.
///
/// Every call goes out exactly once; nothing is cached or retried.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Creates the account and returns the subject the provider issued.
    /// Any rejection (duplicate account, weak password) is `AppError::Registration`.
    async fn register(&self, email: &str, password: &str, role: Role) -> Result<String, AppError>;

    /// Fails with `AppError::Authentication` for every provider-side rejection,
    /// without telling unknown accounts apart from wrong passwords.
    async fn authenticate(&self, email: &str, password: &str) -> Result<TokenBundle, AppError>;

    async fn attribute(&self, subject: &str, name: &str) -> Result<String, AppError>;

    async fn subject_for_email(&self, email: &str) -> Result<String, AppError>;

    /// Subject and role in one round trip.
    async fn account(&self, username: &str) -> Result<AccountSummary, AppError>;

    async fn exists(&self, subject: &str) -> Result<bool, AppError>;
}

fn parse_role(username: &str, value: &str) -> Result<Role, AppError> {
    Role::from_str(value).map_err(|e| AppError::Internal(format!("Account {}: {}", username, e)))
}

/// `base64(HMAC-SHA256(client_secret, username || client_id))`, the value the
/// provider expects alongside calls made by a client that has a secret.
pub fn secret_hash(client_secret: &str, client_id: &str, username: &str) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(client_secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("Client secret rejected: {}", e)))?;
    mac.update(username.as_bytes());
    mac.update(client_id.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_hash_matches_provider_algorithm() {
        assert_eq!(
            secret_hash("client-secret", "client-id", "a@x.com").unwrap(),
            "nlsSpzH3loym0tnIrfyA1ggsDNdDzDDrYJCGJYLPbt4="
        );
    }

    #[test]
    fn secret_hash_depends_on_username() {
        assert_ne!(
            secret_hash("client-secret", "client-id", "a@x.com").unwrap(),
            secret_hash("client-secret", "client-id", "b@x.com").unwrap()
        );
    }
}
