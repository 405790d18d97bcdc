/// Session Authorizer
///
/// Issues token pairs and gates protected requests. A presented access token
/// is verified and then cross-checked against the live credential record, so
/// deleting a user or changing their role takes effect on the next request
/// even while the token's signature is still valid.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::auth::claims::{AccessClaims, ClaimsPair, RefreshClaims, TokenPair};
use crate::auth::jwt::{sign, verify};
use crate::auth::keys::TokenKeys;
use crate::error::{AppError, RepositoryError, TokenError};
use crate::model::{CredentialRecord, Role};
use crate::store::CredentialRepository;

/// Furthest step an authorization attempt reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizeStage {
    Received,
    TokenExtracted,
    ClaimsVerified,
    UserLoaded,
    RoleChecked,
    Authorized,
}

/// Per-request gate and token issuer
#[derive(Clone)]
pub struct SessionAuthorizer {
    keys: Arc<TokenKeys>,
    credentials: Arc<dyn CredentialRepository>,
    lookup_timeout: Duration,
}

impl SessionAuthorizer {
    pub fn new(
        keys: TokenKeys,
        credentials: Arc<dyn CredentialRepository>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            keys: Arc::new(keys),
            credentials,
            lookup_timeout,
        }
    }

    /// Take the token out of a `"<scheme> <token>"` header value.
    /// Anything that is not exactly two space-separated parts yields `""`.
    pub fn extract_token(header: &str) -> &str {
        let parts: Vec<&str> = header.split(' ').collect();
        if parts.len() == 2 {
            parts[1]
        } else {
            ""
        }
    }

    /// Run the full gate over an `Authorization` header value
    pub async fn authorize(&self, header: Option<&str>) -> Result<AccessClaims, AppError> {
        let mut stage = AuthorizeStage::Received;
        let outcome = self.run_authorize(header.unwrap_or(""), &mut stage).await;

        match &outcome {
            Ok(claims) => {
                tracing::debug!(user_id = %claims.base.id, stage = ?stage, "Request authorized");
            }
            Err(e) => {
                tracing::warn!(stage = ?stage, error = %e, "Request rejected");
            }
        }

        outcome
    }

    async fn run_authorize(
        &self,
        header: &str,
        stage: &mut AuthorizeStage,
    ) -> Result<AccessClaims, AppError> {
        let token = Self::extract_token(header);
        if token.is_empty() {
            return Err(AppError::Unauthorized);
        }
        *stage = AuthorizeStage::TokenExtracted;

        let claims = self.validate(token).map_err(|_| AppError::RefreshExpired)?;
        *stage = AuthorizeStage::ClaimsVerified;

        let user = self
            .load_user(claims.base.id)
            .await?
            .ok_or(AppError::RefreshExpired)?;
        *stage = AuthorizeStage::UserLoaded;

        if user.role != claims.base.role {
            return Err(AppError::RefreshExpired);
        }
        *stage = AuthorizeStage::RoleChecked;
        tracing::trace!(user_id = %user.id, stage = ?stage, "Stored role matches token");

        *stage = AuthorizeStage::Authorized;
        Ok(claims)
    }

    /// Verify an access token's signature, expiry and shape
    pub fn validate(&self, access_token: &str) -> Result<AccessClaims, TokenError> {
        verify::<AccessClaims>(access_token, self.keys.access.decoding())
    }

    /// Sign a fresh access/refresh pair for a subject
    pub fn create_tokens(&self, id: Uuid, role: Role) -> Result<TokenPair, TokenError> {
        let pair = ClaimsPair::build(id, role);

        let access = sign(&pair.access, self.keys.access.encoding())?;
        let refresh = sign(&pair.refresh, self.keys.refresh.encoding())?;

        Ok(TokenPair { access, refresh })
    }

    /// Exchange a valid refresh token for a new pair.
    /// The new pair carries the role currently stored for the user.
    pub async fn refresh(&self, tokens: &TokenPair) -> Result<TokenPair, AppError> {
        let claims = verify::<RefreshClaims>(&tokens.refresh, self.keys.refresh.decoding())
            .map_err(|_| AppError::Unauthorized)?;

        let user = self
            .load_user(claims.base.id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(self.create_tokens(user.id, user.role)?)
    }

    /// Subject of an access token, without a repository check
    pub fn user_id(&self, access_token: &str) -> Result<Uuid, TokenError> {
        self.validate(access_token).map(|claims| claims.base.id)
    }

    /// Role embedded in an access token, without a repository check
    pub fn user_role(&self, access_token: &str) -> Result<Role, TokenError> {
        self.validate(access_token).map(|claims| claims.base.role)
    }

    async fn load_user(&self, id: Uuid) -> Result<Option<CredentialRecord>, AppError> {
        match tokio::time::timeout(self.lookup_timeout, self.credentials.get(id)).await {
            Ok(Ok(user)) => Ok(user),
            Ok(Err(e)) => {
                tracing::error!(user_id = %id, error = %e, "Credential lookup failed");
                Err(e.into())
            }
            Err(_) => {
                tracing::error!(user_id = %id, "Credential lookup timed out");
                Err(RepositoryError::Timeout.into())
            }
        }
    }
}
