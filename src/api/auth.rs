use axum::{
    extract::{Extension, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;

use crate::auth::jwt::{decode_jwt, Claims};

/// Session-JWT secret, attached as a request extension in `main`.
#[derive(Clone)]
pub struct JwtState {
    pub secret: String,
}

/// Extracts and validates the Bearer token; rejects with 401 otherwise.
pub struct AuthenticatedUser(pub Claims);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(jwt): Extension<JwtState> = Extension::from_request_parts(parts, state)
            .await
            .map_err(|_| (StatusCode::UNAUTHORIZED, "Missing JWT state"))?;

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| (StatusCode::UNAUTHORIZED, "Missing Authorization header"))?;

        let claims = decode_jwt(bearer.token(), &jwt.secret)
            .map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid or expired token"))?;

        Ok(AuthenticatedUser(claims))
    }
}
