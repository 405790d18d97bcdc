/// Authentication Routes
///
/// Login, admin-only registration, token refresh and password change.

use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{hash_password, verify_password, AccessClaims, SessionAuthorizer, TokenPair};
use crate::error::{AppError, ErrorContext};
use crate::model::{NewCredential, Role};
use crate::store::CredentialRepository;

/// Login and registration body
#[derive(Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

impl CredentialsRequest {
    /// Trim both fields and reject blanks
    fn validated(mut self) -> Result<Self, AppError> {
        self.username = self.username.trim().to_string();
        self.password = self.password.trim().to_string();

        if self.username.is_empty() {
            return Err(AppError::InvalidBody("username is empty".to_string()));
        }
        if self.password.is_empty() {
            return Err(AppError::InvalidBody("password is empty".to_string()));
        }

        Ok(self)
    }

    /// Registration form: validated fields plus the required role
    fn into_registration(self) -> Result<NewCredential, AppError> {
        let form = self.validated()?;
        let role = form
            .role
            .ok_or_else(|| AppError::InvalidBody("role is missing".to_string()))?;

        Ok(NewCredential {
            username: form.username,
            password_hash: hash_password(&form.password),
            role,
        })
    }
}

/// Token refresh body; only the refresh token is used
#[derive(Deserialize)]
pub struct RefreshRequest {
    #[serde(rename = "accessToken", default)]
    pub access: String,
    #[serde(rename = "refreshToken", default)]
    pub refresh: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
}

impl ChangePasswordRequest {
    fn validated(mut self) -> Result<Self, AppError> {
        self.old_password = self.old_password.trim().to_string();
        self.new_password = self.new_password.trim().to_string();

        if self.old_password.is_empty() || self.new_password.is_empty() {
            return Err(AppError::InvalidBody("old or new password is empty".to_string()));
        }

        Ok(self)
    }
}

#[derive(Serialize, Deserialize)]
pub struct RegistrationResponse {
    pub status: String,
}

/// Claims the authorize guard verified for this request
pub(crate) fn session_claims(req: &HttpRequest) -> Result<AccessClaims, AppError> {
    req.extensions()
        .get::<AccessClaims>()
        .cloned()
        .ok_or(AppError::Unauthorized)
}

/// Token from the `Authorization` header, `""` when absent or malformed
pub(crate) fn bearer_token(req: &HttpRequest) -> &str {
    req.headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(SessionAuthorizer::extract_token)
        .unwrap_or("")
}

/// POST /api/v1/login
///
/// Exchange username and password for a token pair.
///
/// # Errors
/// - 400: missing or empty fields
/// - 401: unknown username or wrong password (same response for both)
/// - 500: store or signing failure
pub async fn login(
    body: web::Json<CredentialsRequest>,
    credentials: web::Data<dyn CredentialRepository>,
    authorizer: web::Data<SessionAuthorizer>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("login");
    let form = body.into_inner().validated()?;

    let user = credentials
        .get_by_username(&form.username)
        .await
        .map_err(|e| context.fail(AppError::Unhealthy(e.to_string())))?
        .ok_or_else(|| context.fail(AppError::Unauthorized))?;

    if !verify_password(&form.password, &user.password_hash) {
        return Err(context.fail(AppError::Unauthorized));
    }

    let tokens = authorizer.create_tokens(user.id, user.role)?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok().json(tokens))
}

/// POST /api/v1/registration
///
/// Create a credential record. Behind the authorize guard and restricted to
/// callers whose token carries the ADMIN role.
///
/// # Errors
/// - 400: invalid body, caller is not ADMIN, or username taken
/// - 401: token unusable
/// - 500: store failure
pub async fn register(
    req: HttpRequest,
    body: web::Json<CredentialsRequest>,
    credentials: web::Data<dyn CredentialRepository>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("registration");

    let caller = session_claims(&req).map_err(|e| context.fail(e))?;
    let context = context.with_user_id(caller.base.id.to_string());
    if caller.base.role != Role::Admin {
        return Err(context.fail(AppError::InvalidRole));
    }

    let new_credential = body.into_inner().into_registration()?;

    let existing = credentials
        .get_by_username(&new_credential.username)
        .await
        .map_err(|e| context.fail(AppError::Unhealthy(e.to_string())))?;
    if existing.is_some() {
        return Err(context.fail(AppError::UsernameExists));
    }

    let created = credentials
        .create(new_credential)
        .await
        .map_err(|e| context.fail(e.into()))?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %created.id,
        role = %created.role,
        "User registered successfully"
    );

    Ok(HttpResponse::Ok().json(RegistrationResponse {
        status: "user created".to_string(),
    }))
}

/// POST /api/v1/refresh
///
/// Exchange a refresh token for a new pair. The new pair carries the role
/// currently stored for the user.
///
/// # Errors
/// - 400: invalid body
/// - 401: refresh token unusable or user gone
/// - 500: store failure or timeout
pub async fn refresh(
    body: web::Json<RefreshRequest>,
    authorizer: web::Data<SessionAuthorizer>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");
    let form = body.into_inner();
    let presented = TokenPair {
        access: form.access,
        refresh: form.refresh,
    };

    let tokens = authorizer
        .refresh(&presented)
        .await
        .map_err(|e| match e {
            AppError::Unhealthy(_) => context.fail(e),
            _ => context.fail(AppError::Unauthorized),
        })?;

    tracing::info!(request_id = %context.request_id, "Token refreshed successfully");

    Ok(HttpResponse::Ok().json(tokens))
}

/// PATCH /api/v1/change-password
///
/// Replace the caller's password and return a fresh token pair.
///
/// # Errors
/// - 400: invalid body
/// - 401: token unusable, user gone, or old password wrong
/// - 500: store or signing failure
pub async fn change_password(
    req: HttpRequest,
    body: web::Json<ChangePasswordRequest>,
    credentials: web::Data<dyn CredentialRepository>,
    authorizer: web::Data<SessionAuthorizer>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("change_password");
    let form = body.into_inner().validated()?;

    let user_id = authorizer
        .user_id(bearer_token(&req))
        .map_err(|_| context.fail(AppError::Unauthorized))?;
    let context = context.with_user_id(user_id.to_string());

    let user = credentials
        .get(user_id)
        .await
        .map_err(|e| context.fail(AppError::Unhealthy(e.to_string())))?
        .ok_or_else(|| context.fail(AppError::RefreshExpired))?;

    if !verify_password(&form.old_password, &user.password_hash) {
        return Err(context.fail(AppError::Unauthorized));
    }

    credentials
        .change_password(user.id, &hash_password(&form.new_password))
        .await
        .map_err(|e| context.fail(AppError::Unhealthy(e.to_string())))?;

    let tokens = authorizer.create_tokens(user.id, user.role)?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        "Password changed successfully"
    );

    Ok(HttpResponse::Ok().json(tokens))
}
