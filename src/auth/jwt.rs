/// JWT Token Signing and Verification
///
/// Tokens are compact JWS strings signed with ES256. Verification pins the
/// algorithm, checks expiry with zero leeway and decodes into the caller's
/// expected claims shape. Every failure comes back as `TokenError::Invalid`.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::claims::TokenClaims;
use crate::error::TokenError;

/// Sign claims with an EC private key
pub fn sign<C: Serialize>(claims: &C, key: &EncodingKey) -> Result<String, TokenError> {
    encode(&Header::new(Algorithm::ES256), claims, key)
        .map_err(|e| TokenError::Signing(e.to_string()))
}

/// Verify a token and decode it into the expected claims shape
pub fn verify<C>(token: &str, key: &DecodingKey) -> Result<C, TokenError>
where
    C: DeserializeOwned + TokenClaims,
{
    let mut validation = Validation::new(Algorithm::ES256);
    validation.leeway = 0;

    let claims = decode::<C>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("JWT validation error: {}", e);
            TokenError::Invalid
        })?;

    // jsonwebtoken accepts exp == now; the token must expire strictly later
    if claims.base().is_expired() {
        return Err(TokenError::Invalid);
    }

    Ok(claims)
}
