/// Authentication module
///
/// Handles password hashing, claims construction, ES256 token
/// signing/verification and the per-request session authorizer.

mod authorizer;
mod claims;
mod jwt;
mod keys;
mod password;

pub use authorizer::{AuthorizeStage, SessionAuthorizer};
pub use claims::{AccessClaims, BaseClaims, ClaimsPair, RefreshClaims, TokenClaims, TokenPair};
pub use claims::{ACCESS_TOKEN_TTL, REFRESH_TOKEN_TTL};
pub use jwt::{sign, verify};
pub use keys::{KeyPair, TokenKeys};
pub use password::{hash_password, verify_password, SALT};
