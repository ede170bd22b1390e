use chrono::Utc;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use super::{
    AccountSummary, EMAIL_ATTRIBUTE, IdentityProvider, ROLE_ATTRIBUTE, SUBJECT_ATTRIBUTE,
    TokenBundle, parse_role, secret_hash,
};
use crate::auth::Role;
use crate::aws::sigv4::{self, SigningParams};
use crate::aws::{AwsCredentials, host_header};
use crate::env::CognitoSettings;
use crate::error::AppError;

const SERVICE: &str = "cognito-idp";
const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const USER_NOT_FOUND: &str = "UserNotFoundException";

/// Cognito user pool client speaking the service's JSON protocol directly.
pub struct CognitoIdentityProvider {
    http: Client,
    endpoint: Url,
    region: String,
    user_pool_id: String,
    client_id: String,
    client_secret: String,
    credentials: AwsCredentials,
}

#[derive(Debug)]
enum CallError {
    /// The service answered with an error document.
    Service {
        status: StatusCode,
        kind: String,
        message: String,
    },
    Other(AppError),
}

impl CallError {
    fn is(&self, kind: &str) -> bool {
        matches!(self, CallError::Service { kind: k, .. } if k == kind)
    }

    fn into_app_error(self, action: &str) -> AppError {
        match self {
            CallError::Service {
                status,
                kind,
                message,
            } => AppError::ExternalService(format!(
                "{} failed with {} {}: {}",
                action, status, kind, message
            )),
            CallError::Other(err) => err,
        }
    }
}

impl From<AppError> for CallError {
    fn from(err: AppError) -> Self {
        CallError::Other(err)
    }
}

impl From<reqwest::Error> for CallError {
    fn from(err: reqwest::Error) -> Self {
        CallError::Other(err.into())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type", default)]
    kind: String,
    #[serde(alias = "Message", default)]
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SignUpResponse {
    user_sub: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthResponse {
    authentication_result: Option<AuthenticationResult>,
    challenge_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    access_token: String,
    id_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
    token_type: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AttributeType {
    name: String,
    value: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AdminGetUserResponse {
    #[serde(default)]
    user_attributes: Vec<AttributeType>,
}

impl AdminGetUserResponse {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.user_attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}

impl CognitoIdentityProvider {
    pub fn new(
        http: Client,
        settings: &CognitoSettings,
        region: &str,
        credentials: AwsCredentials,
    ) -> Result<Self, AppError> {
        let endpoint = settings
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}.{}.amazonaws.com/", SERVICE, region));
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| AppError::Internal(format!("Invalid Cognito endpoint {}: {}", endpoint, e)))?;

        Ok(Self {
            http,
            endpoint,
            region: region.to_string(),
            user_pool_id: settings.user_pool_id.clone(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            credentials,
        })
    }

    /// Posts one action. Admin actions need `signed`; the public client
    /// actions authenticate with the secret hash in the body instead.
    async fn call<T: DeserializeOwned>(
        &self,
        action: &str,
        body: &Value,
        signed: bool,
    ) -> Result<T, CallError> {
        let payload = serde_json::to_vec(body).map_err(AppError::from)?;
        let target = format!("{}.{}", TARGET_PREFIX, action);

        let mut request = self
            .http
            .post(self.endpoint.clone())
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-target", &target);

        if signed {
            let params = SigningParams {
                credentials: &self.credentials,
                region: &self.region,
                service: SERVICE,
                time: Utc::now(),
            };
            let amz_date = params.amz_date();

            let mut headers = vec![
                ("host", host_header(&self.endpoint)?),
                ("content-type", CONTENT_TYPE.to_string()),
                ("x-amz-date", amz_date.clone()),
                ("x-amz-target", target.clone()),
            ];
            if let Some(token) = &self.credentials.session_token {
                headers.push(("x-amz-security-token", token.clone()));
                request = request.header("x-amz-security-token", token);
            }

            let authorization =
                sigv4::authorization("POST", self.endpoint.path(), &headers, &payload, &params)?;
            request = request
                .header("x-amz-date", amz_date)
                .header("authorization", authorization);
        }

        let response = request.body(payload).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let error: ErrorBody = serde_json::from_slice(&bytes).unwrap_or(ErrorBody {
                kind: String::new(),
                message: String::from_utf8_lossy(&bytes).into_owned(),
            });
            let kind = error
                .kind
                .rsplit('#')
                .next()
                .unwrap_or_default()
                .to_string();

            return Err(CallError::Service {
                status,
                kind,
                message: error.message,
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            CallError::Other(AppError::ExternalService(format!(
                "{} returned an unexpected body: {}",
                action, e
            )))
        })
    }

    async fn admin_get_user(&self, username: &str) -> Result<AdminGetUserResponse, CallError> {
        self.call(
            "AdminGetUser",
            &json!({
                "UserPoolId": self.user_pool_id,
                "Username": username,
            }),
            true,
        )
        .await
    }

    fn lookup_error(err: CallError, username: &str) -> AppError {
        if err.is(USER_NOT_FOUND) {
            AppError::NotFound(format!("User {} not found", username))
        } else {
            err.into_app_error("AdminGetUser")
        }
    }
}

#[async_trait::async_trait]
impl IdentityProvider for CognitoIdentityProvider {
    #[instrument(skip(self, password))]
    async fn register(&self, email: &str, password: &str, role: Role) -> Result<String, AppError> {
        info!("Signing up user");
        let body = json!({
            "ClientId": self.client_id,
            "SecretHash": secret_hash(&self.client_secret, &self.client_id, email)?,
            "Username": email,
            "Password": password,
            "UserAttributes": [
                {"Name": EMAIL_ATTRIBUTE, "Value": email},
                {"Name": ROLE_ATTRIBUTE, "Value": role.as_str()},
            ],
        });

        match self.call::<SignUpResponse>("SignUp", &body, false).await {
            Ok(response) => Ok(response.user_sub),
            Err(CallError::Service {
                status,
                kind,
                message,
            }) if status.is_client_error() => {
                warn!(kind = %kind, "Sign up rejected");
                Err(AppError::Registration(message))
            }
            Err(err) => Err(err.into_app_error("SignUp")),
        }
    }

    #[instrument(skip(self, password))]
    async fn authenticate(&self, email: &str, password: &str) -> Result<TokenBundle, AppError> {
        info!("Initiating password auth");
        let body = json!({
            "AuthFlow": "USER_PASSWORD_AUTH",
            "ClientId": self.client_id,
            "AuthParameters": {
                "USERNAME": email,
                "PASSWORD": password,
                "SECRET_HASH": secret_hash(&self.client_secret, &self.client_id, email)?,
            },
        });

        let response = match self.call::<InitiateAuthResponse>("InitiateAuth", &body, false).await
        {
            Ok(response) => response,
            Err(CallError::Service { status, kind, .. }) if status.is_client_error() => {
                return Err(AppError::Authentication(kind));
            }
            Err(err) => return Err(err.into_app_error("InitiateAuth")),
        };

        match response.authentication_result {
            Some(result) => Ok(TokenBundle {
                access_token: result.access_token,
                id_token: result.id_token,
                refresh_token: result.refresh_token,
                expires_in: result.expires_in,
                token_type: result.token_type,
            }),
            None => Err(AppError::Authentication(format!(
                "Unsupported challenge {}",
                response.challenge_name.unwrap_or_default()
            ))),
        }
    }

    #[instrument(skip(self))]
    async fn attribute(&self, subject: &str, name: &str) -> Result<String, AppError> {
        let user = self
            .admin_get_user(subject)
            .await
            .map_err(|e| Self::lookup_error(e, subject))?;

        user.attribute(name)
            .map(str::to_string)
            .ok_or_else(|| AppError::NotFound(format!("Attribute {} not set for {}", name, subject)))
    }

    #[instrument(skip(self))]
    async fn subject_for_email(&self, email: &str) -> Result<String, AppError> {
        let user = self
            .admin_get_user(email)
            .await
            .map_err(|e| Self::lookup_error(e, email))?;

        user.attribute(SUBJECT_ATTRIBUTE)
            .map(str::to_string)
            .ok_or_else(|| AppError::NotFound(format!("User {} has no subject", email)))
    }

    #[instrument(skip(self))]
    async fn account(&self, username: &str) -> Result<AccountSummary, AppError> {
        let user = self
            .admin_get_user(username)
            .await
            .map_err(|e| Self::lookup_error(e, username))?;

        let subject = user
            .attribute(SUBJECT_ATTRIBUTE)
            .ok_or_else(|| AppError::NotFound(format!("User {} has no subject", username)))?;
        let role = user.attribute(ROLE_ATTRIBUTE).ok_or_else(|| {
            AppError::NotFound(format!("User {} has no {}", username, ROLE_ATTRIBUTE))
        })?;

        Ok(AccountSummary {
            subject: subject.to_string(),
            role: parse_role(username, role)?,
        })
    }

    #[instrument(skip(self))]
    async fn exists(&self, subject: &str) -> Result<bool, AppError> {
        match self.admin_get_user(subject).await {
            Ok(_) => Ok(true),
            Err(err) if err.is(USER_NOT_FOUND) => Ok(false),
            Err(err) => Err(err.into_app_error("AdminGetUser")),
        }
    }
}
