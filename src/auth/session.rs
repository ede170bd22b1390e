use rocket::Request;
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::request::{FromRequest, Outcome};
use rocket::response::Redirect;
use serde::Serialize;
use tracing::{info, warn};

use super::{Permission, Role};

pub const SUBJECT_COOKIE: &str = "user_sub";
pub const ROLE_COOKIE: &str = "user_role";
pub const EMAIL_COOKIE: &str = "user_email";

/// Identity carried by the client in private (encrypted and signed) cookies.
/// Nothing is kept server-side, so a session lives as long as its cookies do.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub subject: String,
    pub role: Role,
    pub email: String,
}

impl Session {
    pub fn from_cookies(cookies: &CookieJar<'_>) -> Option<Self> {
        let subject = cookies.get_private(SUBJECT_COOKIE)?.value().to_string();
        let email = cookies
            .get_private(EMAIL_COOKIE)
            .map(|c| c.value().to_string())
            .unwrap_or_default();

        let role = match cookies.get_private(ROLE_COOKIE) {
            Some(cookie) => match Role::from_str(cookie.value()) {
                Ok(role) => role,
                Err(err) => {
                    warn!(error = %err, "Session carries an unknown role");
                    return None;
                }
            },
            None => return None,
        };

        Some(Self {
            subject,
            role,
            email,
        })
    }

    pub fn store(&self, cookies: &CookieJar<'_>) {
        for (name, value) in [
            (SUBJECT_COOKIE, self.subject.clone()),
            (ROLE_COOKIE, self.role.to_string()),
            (EMAIL_COOKIE, self.email.clone()),
        ] {
            cookies.add_private(
                Cookie::build((name, value))
                    .same_site(SameSite::Lax)
                    .http_only(true),
            );
        }
    }

    pub fn clear(cookies: &CookieJar<'_>) {
        cookies.remove_private(Cookie::build(SUBJECT_COOKIE));
        cookies.remove_private(Cookie::build(ROLE_COOKIE));
        cookies.remove_private(Cookie::build(EMAIL_COOKIE));
    }

    pub fn can(&self, permission: Permission) -> bool {
        authorize(Some(self), Access::Requires(permission)) == AccessDecision::Allow
    }
}

/// What a route demands of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Requires(Permission),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    RedirectToLogin,
    NotAllowed,
}

/// Decides access from session state alone. The stored role is trusted as-is
/// and the subject is not re-checked against the identity provider.
pub fn authorize(session: Option<&Session>, access: Access) -> AccessDecision {
    match (access, session) {
        (Access::Public, _) => AccessDecision::Allow,
        (_, None) => AccessDecision::RedirectToLogin,
        (Access::Authenticated, Some(_)) => AccessDecision::Allow,
        (Access::Requires(permission), Some(session)) => {
            if session.role.has_permission(permission) {
                AccessDecision::Allow
            } else {
                AccessDecision::NotAllowed
            }
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Session {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let auth_span = tracing::info_span!("session_guard");
        let _guard = auth_span.enter();

        let session = Session::from_cookies(request.cookies());

        match (authorize(session.as_ref(), Access::Authenticated), session) {
            (AccessDecision::Allow, Some(session)) => {
                info!(subject = %session.subject, role = %session.role, "Session accepted");
                Outcome::Success(session)
            }
            _ => Outcome::Forward(Status::Unauthorized),
        }
    }
}

#[catch(401)]
pub fn unauthorized(req: &Request) -> Redirect {
    warn!(uri = %req.uri(), "Unauthenticated access attempt");
    Redirect::to(uri!("/login"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: Role) -> Session {
        Session {
            subject: "sub-1".to_string(),
            role,
            email: "someone@x.com".to_string(),
        }
    }

    #[test]
    fn missing_session_redirects_for_any_protected_access() {
        assert_eq!(
            authorize(None, Access::Authenticated),
            AccessDecision::RedirectToLogin
        );
        assert_eq!(
            authorize(None, Access::Requires(Permission::AssignWorkouts)),
            AccessDecision::RedirectToLogin
        );
        assert_eq!(authorize(None, Access::Public), AccessDecision::Allow);
    }

    #[test]
    fn role_gates_trainer_actions() {
        let student = session(Role::Student);
        let trainer = session(Role::Trainer);

        assert_eq!(
            authorize(Some(&student), Access::Requires(Permission::ViewRoster)),
            AccessDecision::NotAllowed
        );
        assert_eq!(
            authorize(Some(&trainer), Access::Requires(Permission::ViewRoster)),
            AccessDecision::Allow
        );
        assert_eq!(
            authorize(Some(&student), Access::Authenticated),
            AccessDecision::Allow
        );
        assert!(student.can(Permission::ManageOwnRecords));
        assert!(!student.can(Permission::AssignWorkouts));
    }
}
