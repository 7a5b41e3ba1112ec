//! `/api/v1/UsersAuth` handlers

use crate::identity::{AccountSummary, Credential, Registration};
use crate::server::extract::Validated;
use crate::server::response::{ApiError, ApiResponse};
use crate::server::state::AppState;
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequestDto {
    #[validate(length(min = 1, message = "is required"))]
    pub user_name: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

#[derive(Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequestDto {
    #[validate(length(min = 1, message = "is required"))]
    pub user_name: String,
    #[serde(default)]
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponseDto {
    pub user: AccountSummary,
    pub token: String,
    pub role: Option<String>,
    pub expires_at: DateTime<Utc>,
}

pub async fn login(
    State(state): State<AppState>,
    Validated(dto): Validated<LoginRequestDto>,
) -> Result<ApiResponse<LoginResponseDto>, ApiError> {
    let credential = Credential {
        username: dto.user_name,
        password: dto.password,
    };

    let response = state
        .auth_service()
        .login(&credential)
        .await?
        .ok_or_else(|| ApiError::bad_request("Username or password is incorrect"))?;

    Ok(ApiResponse::ok(LoginResponseDto {
        user: response.user,
        token: response.token.token,
        role: response.role,
        expires_at: response.token.expires_at,
    }))
}

pub async fn register(
    State(state): State<AppState>,
    Validated(dto): Validated<RegistrationRequestDto>,
) -> Result<ApiResponse<AccountSummary>, ApiError> {
    let service = state.auth_service();
    if !service.is_unique(&dto.user_name).await? {
        return Err(ApiError::bad_request("Username already exists"));
    }

    let summary = service
        .register(&Registration {
            username: dto.user_name,
            name: dto.name,
            password: dto.password,
        })
        .await?;

    Ok(ApiResponse::ok(summary))
}
