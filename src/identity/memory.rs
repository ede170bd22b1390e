use std::collections::HashMap;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    AccountSummary, EMAIL_ATTRIBUTE, IdentityProvider, ROLE_ATTRIBUTE, SUBJECT_ATTRIBUTE,
    TokenBundle, parse_role,
};
use crate::auth::Role;
use crate::error::AppError;

const MIN_PASSWORD_LENGTH: usize = 8;

// bcrypt's minimum cost under test.
#[cfg(not(test))]
const HASH_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const HASH_COST: u32 = 4;

struct Account {
    subject: String,
    password_hash: String,
    attributes: HashMap<String, String>,
}

/// In-process stand-in for the identity provider, keyed by email. Usernames
/// passed to lookups may be either the email or the subject, as with Cognito.
#[derive(Default)]
pub struct MemoryIdentityProvider {
    accounts: DashMap<String, Account>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_account<T>(&self, username: &str, f: impl FnOnce(&Account) -> T) -> Option<T> {
        if let Some(account) = self.accounts.get(username) {
            return Some(f(account.value()));
        }

        self.accounts
            .iter()
            .find(|entry| entry.value().subject == username)
            .map(|entry| f(entry.value()))
    }
}

#[async_trait::async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    #[instrument(skip(self, password))]
    async fn register(&self, email: &str, password: &str, role: Role) -> Result<String, AppError> {
        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(AppError::Registration(
                "Password did not conform with policy: Password not long enough".to_string(),
            ));
        }

        let password_hash = bcrypt::hash(password, HASH_COST)?;

        match self.accounts.entry(email.to_string()) {
            Entry::Occupied(_) => Err(AppError::Registration(
                "An account with the given email already exists.".to_string(),
            )),
            Entry::Vacant(slot) => {
                let subject = Uuid::new_v4().to_string();
                let attributes = HashMap::from([
                    (SUBJECT_ATTRIBUTE.to_string(), subject.clone()),
                    (EMAIL_ATTRIBUTE.to_string(), email.to_string()),
                    (ROLE_ATTRIBUTE.to_string(), role.as_str().to_string()),
                ]);

                slot.insert(Account {
                    subject: subject.clone(),
                    password_hash,
                    attributes,
                });

                info!(subject = %subject, "Registered in-memory account");
                Ok(subject)
            }
        }
    }

    #[instrument(skip(self, password))]
    async fn authenticate(&self, email: &str, password: &str) -> Result<TokenBundle, AppError> {
        let account = self.accounts.get(email);

        match account {
            Some(account) if matches!(bcrypt::verify(password, &account.password_hash), Ok(true)) => {
                Ok(TokenBundle {
                    access_token: Uuid::new_v4().to_string(),
                    id_token: Uuid::new_v4().to_string(),
                    refresh_token: None,
                    expires_in: 3600,
                    token_type: "Bearer".to_string(),
                })
            }
            _ => Err(AppError::Authentication(
                "Incorrect username or password.".to_string(),
            )),
        }
    }

    #[instrument(skip(self))]
    async fn attribute(&self, subject: &str, name: &str) -> Result<String, AppError> {
        self.with_account(subject, |account| account.attributes.get(name).cloned())
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", subject)))?
            .ok_or_else(|| AppError::NotFound(format!("Attribute {} not set for {}", name, subject)))
    }

    #[instrument(skip(self))]
    async fn subject_for_email(&self, email: &str) -> Result<String, AppError> {
        self.with_account(email, |account| account.subject.clone())
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", email)))
    }

    #[instrument(skip(self))]
    async fn account(&self, username: &str) -> Result<AccountSummary, AppError> {
        let (subject, role) = self
            .with_account(username, |account| {
                (
                    account.subject.clone(),
                    account.attributes.get(ROLE_ATTRIBUTE).cloned(),
                )
            })
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", username)))?;

        let role = role.ok_or_else(|| {
            AppError::NotFound(format!(
                "Attribute {} not set for {}",
                ROLE_ATTRIBUTE, username
            ))
        })?;

        Ok(AccountSummary {
            role: parse_role(username, &role)?,
            subject,
        })
    }

    #[instrument(skip(self))]
    async fn exists(&self, subject: &str) -> Result<bool, AppError> {
        Ok(self.with_account(subject, |_| ()).is_some())
    }
}
