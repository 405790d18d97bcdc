/// JWT Claims structures
///
/// Access and refresh tokens share a base payload (subject, role and the
/// RFC 7519 `exp`/`iat`/`jti` fields). Each kind also carries the `jti` of
/// the token it was issued with, for traceability.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::Role;

/// Access token lifetime in seconds (8 hours)
pub const ACCESS_TOKEN_TTL: i64 = 8 * 60 * 60;
/// Refresh token lifetime in seconds (7 days)
pub const REFRESH_TOKEN_TTL: i64 = 7 * 24 * 60 * 60;

/// Fields common to both token kinds
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BaseClaims {
    /// Subject (credential record id)
    pub id: Uuid,
    #[serde(rename = "Role")]
    pub role: Role,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Unique token id
    pub jti: Uuid,
}

impl BaseClaims {
    pub fn new(id: Uuid, role: Role, ttl_seconds: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id,
            role,
            exp: now + ttl_seconds,
            iat: now,
            jti: Uuid::new_v4(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.exp <= chrono::Utc::now().timestamp()
    }
}

/// Payload of an access token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    #[serde(flatten)]
    pub base: BaseClaims,
    /// `jti` of the paired refresh token
    #[serde(rename = "access_uuid")]
    pub paired_jti: Uuid,
}

/// Payload of a refresh token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RefreshClaims {
    #[serde(flatten)]
    pub base: BaseClaims,
    /// `jti` of the paired access token
    #[serde(rename = "refresh_uuid")]
    pub paired_jti: Uuid,
}

/// Shared view over both claim kinds
pub trait TokenClaims {
    fn base(&self) -> &BaseClaims;
}

impl TokenClaims for AccessClaims {
    fn base(&self) -> &BaseClaims {
        &self.base
    }
}

impl TokenClaims for RefreshClaims {
    fn base(&self) -> &BaseClaims {
        &self.base
    }
}

/// A freshly built, cross-linked pair of claims
#[derive(Debug, Clone)]
pub struct ClaimsPair {
    pub access: AccessClaims,
    pub refresh: RefreshClaims,
}

impl ClaimsPair {
    /// Build access and refresh claims for one subject.
    /// Every call draws two new token ids.
    pub fn build(id: Uuid, role: Role) -> Self {
        let access_base = BaseClaims::new(id, role, ACCESS_TOKEN_TTL);
        let refresh_base = BaseClaims::new(id, role, REFRESH_TOKEN_TTL);

        Self {
            access: AccessClaims {
                paired_jti: refresh_base.jti,
                base: access_base.clone(),
            },
            refresh: RefreshClaims {
                paired_jti: access_base.jti,
                base: refresh_base,
            },
        }
    }
}

/// Signed access/refresh strings as exchanged with clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(rename = "accessToken")]
    pub access: String,
    #[serde(rename = "refreshToken")]
    pub refresh: String,
}
