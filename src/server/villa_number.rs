//! `/api/v1/VillaNumberAPI` handlers, keyed by `villa_no`

use crate::core::auth::{AuthContext, AuthPolicy};
use crate::core::filter::Filter;
use crate::core::query::{IncludeSpec, Page};
use crate::core::store::EntityStore;
use crate::core::tracking::TrackingMode;
use crate::entities::{Villa, VillaNumber};
use crate::server::extract::{Validated, require};
use crate::server::patch::PatchOperation;
use crate::server::response::{ApiError, ApiResponse};
use crate::server::state::AppState;
use crate::server::villa::{VillaDto, patched};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

const WRITE_POLICY: &str = "role:admin";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VillaNumberDto {
    pub villa_no: i64,
    pub villa_id: i64,
    pub special_details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub villa: Option<VillaDto>,
}

impl From<&VillaNumber> for VillaNumberDto {
    fn from(number: &VillaNumber) -> Self {
        Self {
            villa_no: number.villa_no,
            villa_id: number.villa_id,
            special_details: number.special_details.clone(),
            villa: number.villa.as_ref().map(VillaDto::from),
        }
    }
}

/// Body of both create and update requests
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VillaNumberWriteDto {
    #[validate(range(min = 1, message = "must be positive"))]
    pub villa_no: i64,
    #[validate(range(min = 1, message = "must be positive"))]
    pub villa_id: i64,
    #[serde(default)]
    pub special_details: Option<String>,
}

impl From<&VillaNumber> for VillaNumberWriteDto {
    fn from(number: &VillaNumber) -> Self {
        Self {
            villa_no: number.villa_no,
            villa_id: number.villa_id,
            special_details: Some(number.special_details.clone()),
        }
    }
}

fn write_policy() -> AuthPolicy {
    AuthPolicy::parse_policy(WRITE_POLICY)
}

fn with_villa() -> IncludeSpec {
    IncludeSpec::parse("villa")
}

fn by_number(villa_no: i64) -> Filter {
    Filter::eq("villa_no", villa_no)
}

fn number_not_found(villa_no: i64) -> ApiError {
    ApiError::NotFound(format!("Villa number {} not found", villa_no))
}

async fn ensure_villa_exists(state: &AppState, villa_id: i64) -> Result<(), ApiError> {
    let exists = state
        .store::<Villa>()
        .get(Some(&Filter::id(villa_id)), TrackingMode::Detached, &IncludeSpec::none())
        .await?
        .is_some();
    if !exists {
        return Err(ApiError::bad_request("Villa with this ID does not exist!"));
    }
    Ok(())
}

async fn find_number(
    store: &EntityStore<VillaNumber>,
    villa_no: i64,
    tracking: TrackingMode,
) -> Result<VillaNumber, ApiError> {
    store
        .get(Some(&by_number(villa_no)), tracking, &IncludeSpec::none())
        .await?
        .ok_or_else(|| number_not_found(villa_no))
}

pub async fn list_villa_numbers(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<VillaNumberDto>>, ApiError> {
    let numbers = state
        .store::<VillaNumber>()
        .get_all(None, &with_villa(), Page::default())
        .await?;

    Ok(ApiResponse::ok(numbers.iter().map(VillaNumberDto::from).collect()))
}

pub async fn get_villa_number(
    State(state): State<AppState>,
    Path(villa_no): Path<i64>,
) -> Result<ApiResponse<VillaNumberDto>, ApiError> {
    if villa_no <= 0 {
        return Err(ApiError::bad_request("Villa number must be positive"));
    }

    let number = state
        .store::<VillaNumber>()
        .get(Some(&by_number(villa_no)), TrackingMode::Detached, &with_villa())
        .await?
        .ok_or_else(|| number_not_found(villa_no))?;

    Ok(ApiResponse::ok(VillaNumberDto::from(&number)))
}

pub async fn create_villa_number(
    State(state): State<AppState>,
    auth: AuthContext,
    Validated(dto): Validated<VillaNumberWriteDto>,
) -> Result<ApiResponse<VillaNumberDto>, ApiError> {
    require(&auth, &write_policy())?;

    let store = state.store::<VillaNumber>();
    if store
        .get(Some(&by_number(dto.villa_no)), TrackingMode::Detached, &IncludeSpec::none())
        .await?
        .is_some()
    {
        return Err(ApiError::bad_request("Villa Number already Exists!"));
    }
    ensure_villa_exists(&state, dto.villa_id).await?;

    let now = Utc::now();
    let number = store
        .create(VillaNumber {
            villa_no: dto.villa_no,
            villa_id: dto.villa_id,
            special_details: dto.special_details.unwrap_or_default(),
            created_date: now,
            updated_date: now,
            ..Default::default()
        })
        .await?;

    info!(villa_no = number.villa_no, villa_id = number.villa_id, "Villa number created");
    Ok(ApiResponse::created(VillaNumberDto::from(&number)))
}

pub async fn delete_villa_number(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(villa_no): Path<i64>,
) -> Result<StatusCode, ApiError> {
    require(&auth, &write_policy())?;
    if villa_no <= 0 {
        return Err(ApiError::bad_request("Villa number must be positive"));
    }

    let store = state.store::<VillaNumber>();
    let number = find_number(&store, villa_no, TrackingMode::Tracked).await?;
    store.remove(&number).await?;

    info!(villa_no, "Villa number deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_villa_number(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(villa_no): Path<i64>,
    Validated(dto): Validated<VillaNumberWriteDto>,
) -> Result<StatusCode, ApiError> {
    require(&auth, &write_policy())?;
    if villa_no != dto.villa_no {
        return Err(ApiError::bad_request("Villa number in path and body must match"));
    }
    ensure_villa_exists(&state, dto.villa_id).await?;

    let store = state.store::<VillaNumber>();
    let existing = find_number(&store, villa_no, TrackingMode::Detached).await?;
    store.update(&rebuild(dto, &existing)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn patch_villa_number(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(villa_no): Path<i64>,
    Json(patch): Json<Vec<PatchOperation>>,
) -> Result<StatusCode, ApiError> {
    require(&auth, &write_policy())?;
    if villa_no <= 0 {
        return Err(ApiError::bad_request("Villa number must be positive"));
    }

    let store = state.store::<VillaNumber>();
    let existing = find_number(&store, villa_no, TrackingMode::Detached).await?;

    let dto = patched(&VillaNumberWriteDto::from(&existing), &patch)?;
    if dto.villa_no != villa_no {
        return Err(ApiError::bad_request("Villa number cannot be patched"));
    }
    if dto.villa_id != existing.villa_id {
        ensure_villa_exists(&state, dto.villa_id).await?;
    }

    store.update(&rebuild(dto, &existing)).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn rebuild(dto: VillaNumberWriteDto, existing: &VillaNumber) -> VillaNumber {
    VillaNumber {
        id: existing.id,
        villa_no: dto.villa_no,
        villa_id: dto.villa_id,
        special_details: dto.special_details.unwrap_or_default(),
        created_date: existing.created_date,
        updated_date: Utc::now(),
        villa: None,
    }
}
