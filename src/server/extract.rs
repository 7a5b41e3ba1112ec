//! Request extractors: bearer-token auth and validated JSON bodies

use crate::core::auth::{AuthContext, AuthPolicy};
use crate::server::response::{ApiError, validation_messages};
use crate::server::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use validator::Validate;

/// A request without an `Authorization` header is anonymous; a header
/// carrying a bad or expired token is rejected with 401.
impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(AuthContext::Anonymous);
        };

        let token = header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Expected a Bearer token".to_string()))?;

        let claims = state.tokens.validate(token)?;
        Ok(claims.auth_context()?)
    }
}

/// Reject the request unless `context` satisfies `policy`
pub fn require(context: &AuthContext, policy: &AuthPolicy) -> Result<(), ApiError> {
    if policy.check(context) {
        return Ok(());
    }
    match context {
        AuthContext::Anonymous => Err(ApiError::Unauthorized(
            "Authentication required".to_string(),
        )),
        AuthContext::User { .. } => Err(ApiError::Forbidden("Insufficient role".to_string())),
    }
}

/// JSON body that has passed its `validator` rules
#[derive(Debug, Clone)]
pub struct Validated<T>(pub T);

impl<T, S> FromRequest<S> for Validated<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ApiError::bad_request(rejection.body_text()))?;

        value
            .validate()
            .map_err(|errors| ApiError::BadRequest(validation_messages(&errors)))?;

        Ok(Validated(value))
    }
}
