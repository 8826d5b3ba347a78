use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// Claims
///
/// The payload carried inside a session token. The subject is the user's UUID
/// and is the only claim: tokens deliberately carry no expiry.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the UUID of the authenticated user.
    pub sub: Uuid,
}

/// TokenIssuer
///
/// Issues and verifies HS256 session tokens. Constructed once at startup from
/// the configured signing secret and shared through the application state, so
/// the secret is explicit injected configuration rather than a hidden global.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Produces a signed token binding the given user id.
    pub fn issue(&self, user_id: Uuid) -> Result<String, ApiError> {
        encode(&Header::default(), &Claims { sub: user_id }, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
    }

    /// Verifies a token's signature and returns the user id it binds.
    /// Malformed, unsigned, or tampered tokens all collapse into
    /// `InvalidToken`; there is no expired case since tokens never expire.
    pub fn verify(&self, token: &str) -> Result<Uuid, ApiError> {
        let mut validation = Validation::default();
        // No exp claim is issued, so expiry validation must be disabled and
        // exp removed from the required claim set.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let token_data =
            decode::<Claims>(token, &self.decoding, &validation).map_err(|_| ApiError::InvalidToken)?;

        Ok(token_data.claims.sub)
    }
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Handlers take this as an
/// argument to receive the caller's user id; the extractor below rejects the
/// request before the handler runs if authentication fails.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
}

/// AuthUser Extractor Implementation
///
/// Implements Axum's FromRequestParts trait, making AuthUser usable as a
/// function argument in any protected handler. The flow is:
/// 1. Pull the TokenIssuer from the application state.
/// 2. Extract the `Authorization: Bearer <token>` header.
/// 3. Verify the token and resolve the user id.
///
/// Rejections: a missing or non-Bearer header is 401 "Access denied"; a
/// present-but-unverifiable token is 400 "Invalid token". Clients depend on
/// that status asymmetry, so it is part of the public contract.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenIssuer: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let issuer = TokenIssuer::from_ref(state);

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::AuthenticationRequired)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::AuthenticationRequired)?;

        let user_id = issuer.verify(token)?;

        Ok(AuthUser { id: user_id })
    }
}
