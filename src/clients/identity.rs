//! User identity through the Firebase Identity Toolkit REST API

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest_middleware::ClientWithMiddleware;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::clients::http::json_body;
use crate::{CarbonTripError, Result};

/// Signed-in user identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub email: Option<String>,
    pub uid: String,
}

/// Token obtained from a federated provider (e.g. Google) by the frontend
#[derive(Debug, Clone, Deserialize)]
pub struct FederatedCredential {
    #[serde(default = "default_provider")]
    pub provider_id: String,
    pub id_token: String,
}

fn default_provider() -> String {
    "google.com".to_string()
}

/// Identity provider operations
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser>;
    async fn sign_in_with_provider(&self, credential: &FederatedCredential) -> Result<AuthUser>;
}

/// Human-readable message for an Identity Toolkit error code
#[must_use]
pub fn auth_error_message(code: &str) -> String {
    let key = code.split(':').next().unwrap_or(code).trim();
    match key {
        "EMAIL_EXISTS" => "The email address is already in use by another account.".to_string(),
        "INVALID_EMAIL" | "MISSING_EMAIL" => "The email address is badly formatted.".to_string(),
        "MISSING_PASSWORD" => "A password is required.".to_string(),
        "WEAK_PASSWORD" => "Password should be at least 6 characters.".to_string(),
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            "Invalid email or password.".to_string()
        }
        "USER_DISABLED" => "This account has been disabled.".to_string(),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => {
            "Too many unsuccessful attempts. Please try again later.".to_string()
        }
        "INVALID_IDP_RESPONSE" => "The provider sign-in could not be verified.".to_string(),
        _ => format!("Authentication failed ({key})."),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest {
    post_body: String,
    request_uri: String,
    return_idp_credential: bool,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub local_id: String,
    pub email: Option<String>,
}

impl From<AccountResponse> for AuthUser {
    fn from(account: AccountResponse) -> Self {
        AuthUser {
            email: account.email,
            uid: account.local_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Firebase Identity Toolkit client
pub struct FirebaseIdentityClient {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: Option<String>,
}

impl FirebaseIdentityClient {
    pub fn new(client: ClientWithMiddleware, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
        }
    }

    async fn call<B: Serialize, T: DeserializeOwned>(&self, method: &str, body: &B) -> Result<T> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| CarbonTripError::authentication("Sign-in is not configured."))?;
        let url = format!(
            "{}/accounts:{}?key={}",
            self.base_url,
            method,
            urlencoding::encode(api_key)
        );

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(json_body(body)?)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorEnvelope>(&text) {
            Ok(envelope) => auth_error_message(&envelope.error.message),
            Err(_) => format!("Authentication failed (HTTP {}).", status.as_u16()),
        };
        warn!("Identity call {} failed: {}", method, message);
        Err(CarbonTripError::authentication(message))
    }
}

fn require_credentials(email: &str, password: &str) -> Result<()> {
    if email.trim().is_empty() {
        return Err(CarbonTripError::authentication(auth_error_message("MISSING_EMAIL")));
    }
    if password.is_empty() {
        return Err(CarbonTripError::authentication(auth_error_message("MISSING_PASSWORD")));
    }
    Ok(())
}

#[async_trait]
impl IdentityService for FirebaseIdentityClient {
    #[instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser> {
        require_credentials(email, password)?;
        let account: AccountResponse = self
            .call(
                "signUp",
                &PasswordRequest {
                    email: email.trim(),
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        info!("Created account {}", account.local_id);
        Ok(account.into())
    }

    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        require_credentials(email, password)?;
        let account: AccountResponse = self
            .call(
                "signInWithPassword",
                &PasswordRequest {
                    email: email.trim(),
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        Ok(account.into())
    }

    #[instrument(skip(self, credential), fields(provider = %credential.provider_id))]
    async fn sign_in_with_provider(&self, credential: &FederatedCredential) -> Result<AuthUser> {
        let post_body = format!(
            "id_token={}&providerId={}",
            urlencoding::encode(&credential.id_token),
            urlencoding::encode(&credential.provider_id)
        );
        let account: AccountResponse = self
            .call(
                "signInWithIdp",
                &IdpRequest {
                    post_body,
                    request_uri: "http://localhost".to_string(),
                    return_idp_credential: true,
                    return_secure_token: true,
                },
            )
            .await?;
        Ok(account.into())
    }
}

/// Per-session authentication state.
///
/// Failures are recorded as a user-visible message instead of being
/// propagated further.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuthSession {
    user: Option<AuthUser>,
    error: Option<String>,
}

impl AuthSession {
    pub fn current_user(&self) -> Option<&AuthUser> {
        self.user.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub async fn sign_up(&mut self, identity: &dyn IdentityService, email: &str, password: &str) {
        let result = identity.sign_up(email, password).await;
        self.record(result);
    }

    pub async fn sign_in(&mut self, identity: &dyn IdentityService, email: &str, password: &str) {
        let result = identity.sign_in(email, password).await;
        self.record(result);
    }

    pub async fn sign_in_with_provider(
        &mut self,
        identity: &dyn IdentityService,
        credential: &FederatedCredential,
    ) {
        let result = identity.sign_in_with_provider(credential).await;
        self.record(result);
    }

    pub fn sign_out(&mut self) {
        self.user = None;
        self.error = None;
    }

    fn record(&mut self, result: Result<AuthUser>) {
        match result {
            Ok(user) => {
                self.user = Some(user);
                self.error = None;
            }
            Err(e) => self.error = Some(e.user_message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    struct FakeIdentity;

    #[async_trait]
    impl IdentityService for FakeIdentity {
        async fn sign_up(&self, email: &str, _password: &str) -> Result<AuthUser> {
            if email == "new@example.com" {
                Ok(AuthUser {
                    email: Some(email.to_string()),
                    uid: "u-new".to_string(),
                })
            } else {
                Err(CarbonTripError::authentication(auth_error_message("EMAIL_EXISTS")))
            }
        }

        async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
            if password == "secret" {
                Ok(AuthUser {
                    email: Some(email.to_string()),
                    uid: "u-1".to_string(),
                })
            } else {
                Err(CarbonTripError::authentication(auth_error_message(
                    "INVALID_LOGIN_CREDENTIALS",
                )))
            }
        }

        async fn sign_in_with_provider(&self, credential: &FederatedCredential) -> Result<AuthUser> {
            Ok(AuthUser {
                email: None,
                uid: format!("{}:{}", credential.provider_id, credential.id_token),
            })
        }
    }

    #[rstest]
    #[case("EMAIL_EXISTS", "The email address is already in use by another account.")]
    #[case("WEAK_PASSWORD : Password should be at least 6 characters", "Password should be at least 6 characters.")]
    #[case("INVALID_LOGIN_CREDENTIALS", "Invalid email or password.")]
    #[case("SOMETHING_NEW", "Authentication failed (SOMETHING_NEW).")]
    fn test_auth_error_message(#[case] code: &str, #[case] expected: &str) {
        assert_eq!(auth_error_message(code), expected);
    }

    #[test]
    fn test_account_response_to_user() {
        let account: AccountResponse = serde_json::from_str(
            r#"{"kind": "identitytoolkit#SignupNewUserResponse", "localId": "abc123",
                "email": "ana@example.com", "idToken": "t", "refreshToken": "r", "expiresIn": "3600"}"#,
        )
        .unwrap();
        let user = AuthUser::from(account);
        assert_eq!(user.uid, "abc123");
        assert_eq!(user.email.as_deref(), Some("ana@example.com"));
    }

    #[test]
    fn test_password_request_shape() {
        let json = serde_json::to_string(&PasswordRequest {
            email: "a@b.c",
            password: "pw",
            return_secure_token: true,
        })
        .unwrap();
        assert_eq!(json, r#"{"email":"a@b.c","password":"pw","returnSecureToken":true}"#);
    }

    #[test]
    fn test_require_credentials() {
        assert!(require_credentials("a@b.c", "pw").is_ok());
        let err = require_credentials(" ", "pw").unwrap_err();
        assert_eq!(err.user_message(), "The email address is badly formatted.");
        assert!(require_credentials("a@b.c", "").is_err());
    }

    #[tokio::test]
    async fn test_session_records_error_then_user() {
        let identity = FakeIdentity;
        let mut session = AuthSession::default();

        session.sign_in(&identity, "ana@example.com", "wrong").await;
        assert!(session.current_user().is_none());
        assert_eq!(session.error(), Some("Invalid email or password."));

        session.sign_in(&identity, "ana@example.com", "secret").await;
        assert_eq!(session.current_user().map(|u| u.uid.as_str()), Some("u-1"));
        assert!(session.error().is_none());

        session.sign_out();
        assert!(session.current_user().is_none());
    }

    #[tokio::test]
    async fn test_session_sign_up_and_provider() {
        let identity = FakeIdentity;
        let mut session = AuthSession::default();

        session.sign_up(&identity, "taken@example.com", "pw").await;
        assert_eq!(
            session.error(),
            Some("The email address is already in use by another account.")
        );

        session.sign_up(&identity, "new@example.com", "pw").await;
        assert_eq!(session.current_user().map(|u| u.uid.as_str()), Some("u-new"));

        let credential = FederatedCredential {
            provider_id: default_provider(),
            id_token: "tok".to_string(),
        };
        session.sign_in_with_provider(&identity, &credential).await;
        assert_eq!(
            session.current_user().map(|u| u.uid.as_str()),
            Some("google.com:tok")
        );
    }
}
