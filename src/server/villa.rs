//! `/api/VillaAPI` handlers
//!
//! Successful responses carry the bare DTO; failures use the envelope.

use crate::core::error::StoreError;
use crate::core::filter::Filter;
use crate::core::query::{IncludeSpec, Page};
use crate::core::tracking::TrackingMode;
use crate::entities::Villa;
use crate::server::extract::Validated;
use crate::server::patch::{PatchOperation, apply_patch};
use crate::server::response::{ApiError, validation_messages};
use crate::server::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VillaDto {
    pub id: i64,
    pub name: String,
    pub details: String,
    pub rate: f64,
    pub sqft: i64,
    pub occupancy: i64,
    pub image_url: String,
    pub amenity: String,
}

impl From<&Villa> for VillaDto {
    fn from(villa: &Villa) -> Self {
        Self {
            id: villa.id,
            name: villa.name.clone(),
            details: villa.details.clone(),
            rate: villa.rate,
            sqft: villa.sqft,
            occupancy: villa.occupancy,
            image_url: villa.image_url.clone(),
            amenity: villa.amenity.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VillaCreateDto {
    #[validate(length(min = 1, max = 30, message = "must be between 1 and 30 characters"))]
    pub name: String,
    #[serde(default)]
    pub details: Option<String>,
    pub rate: f64,
    #[serde(default)]
    pub sqft: i64,
    #[serde(default)]
    pub occupancy: i64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub amenity: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VillaUpdateDto {
    pub id: i64,
    #[validate(length(min = 1, max = 30, message = "must be between 1 and 30 characters"))]
    pub name: String,
    #[serde(default)]
    pub details: Option<String>,
    pub rate: f64,
    pub sqft: i64,
    pub occupancy: i64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub amenity: Option<String>,
}

impl From<&Villa> for VillaUpdateDto {
    fn from(villa: &Villa) -> Self {
        Self {
            id: villa.id,
            name: villa.name.clone(),
            details: Some(villa.details.clone()),
            rate: villa.rate,
            sqft: villa.sqft,
            occupancy: villa.occupancy,
            image_url: Some(villa.image_url.clone()),
            amenity: Some(villa.amenity.clone()),
        }
    }
}

impl VillaUpdateDto {
    /// New write model; `existing` supplies the creation timestamp
    fn into_villa(self, existing: &Villa) -> Villa {
        Villa {
            id: self.id,
            name: self.name,
            details: self.details.unwrap_or_default(),
            rate: self.rate,
            sqft: self.sqft,
            occupancy: self.occupancy,
            image_url: self.image_url.unwrap_or_default(),
            amenity: self.amenity.unwrap_or_default(),
            created_date: existing.created_date,
            updated_date: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VillaListParams {
    pub filter_occupancy: Option<i64>,
    pub search: Option<String>,
    /// JSON object in the `Filter::from_json` syntax
    pub filter: Option<String>,
    #[serde(default)]
    pub page_size: usize,
    #[serde(default = "first_page")]
    pub page_number: usize,
}

fn first_page() -> usize {
    1
}

impl VillaListParams {
    fn to_filter(&self) -> Result<Option<Filter>, ApiError> {
        let parsed = match self.filter.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                let value: Value = serde_json::from_str(raw)
                    .map_err(|e| ApiError::bad_request(format!("Invalid filter: {}", e)))?;
                Filter::from_json(&value).map_err(StoreError::from)?
            }
            _ => None,
        };

        Ok(Filter::all([
            self.filter_occupancy.map(|n| Filter::eq("occupancy", n)),
            self.search
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(|s| Filter::contains("name", s)),
            parsed,
        ]))
    }
}

fn villa_not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("Villa {} not found", id))
}

pub async fn list_villas(
    State(state): State<AppState>,
    Query(params): Query<VillaListParams>,
) -> Result<Json<Vec<VillaDto>>, ApiError> {
    let filter = params.to_filter()?;
    let page = Page::new(params.page_size, params.page_number);

    let villas = state
        .store::<Villa>()
        .get_all(filter.as_ref(), &IncludeSpec::none(), page)
        .await?;

    Ok(Json(villas.iter().map(VillaDto::from).collect()))
}

pub async fn get_villa(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<VillaDto>, ApiError> {
    if id <= 0 {
        return Err(ApiError::bad_request("Id must be positive"));
    }

    let villa = state
        .store::<Villa>()
        .get(Some(&Filter::id(id)), TrackingMode::Detached, &IncludeSpec::none())
        .await?
        .ok_or_else(|| villa_not_found(id))?;

    Ok(Json(VillaDto::from(&villa)))
}

pub async fn create_villa(
    State(state): State<AppState>,
    Validated(dto): Validated<VillaCreateDto>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store::<Villa>();

    let duplicate = Filter::eq_ignore_case("name", dto.name.as_str());
    if store
        .get(Some(&duplicate), TrackingMode::Detached, &IncludeSpec::none())
        .await?
        .is_some()
    {
        return Err(ApiError::bad_request("Villa already Exists!"));
    }

    let now = Utc::now();
    let villa = store
        .create(Villa {
            name: dto.name,
            details: dto.details.unwrap_or_default(),
            rate: dto.rate,
            sqft: dto.sqft,
            occupancy: dto.occupancy,
            image_url: dto.image_url.unwrap_or_default(),
            amenity: dto.amenity.unwrap_or_default(),
            created_date: now,
            updated_date: now,
            ..Default::default()
        })
        .await?;

    info!(villa_id = villa.id, "Villa created");
    let location = format!("/api/VillaAPI/{}", villa.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(VillaDto::from(&villa)),
    ))
}

pub async fn delete_villa(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if id <= 0 {
        return Err(ApiError::bad_request("Id must be positive"));
    }

    let store = state.store::<Villa>();
    let villa = store
        .get(Some(&Filter::id(id)), TrackingMode::Tracked, &IncludeSpec::none())
        .await?
        .ok_or_else(|| villa_not_found(id))?;

    store.remove(&villa).await?;
    info!(villa_id = id, "Villa deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_villa(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Validated(dto): Validated<VillaUpdateDto>,
) -> Result<StatusCode, ApiError> {
    if id != dto.id {
        return Err(ApiError::bad_request("Id in path and body must match"));
    }

    let store = state.store::<Villa>();
    let existing = store
        .get(Some(&Filter::id(id)), TrackingMode::Detached, &IncludeSpec::none())
        .await?
        .ok_or_else(|| villa_not_found(id))?;

    store.update(&dto.into_villa(&existing)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn patch_villa(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<Vec<PatchOperation>>,
) -> Result<StatusCode, ApiError> {
    if id <= 0 {
        return Err(ApiError::bad_request("Id must be positive"));
    }

    let store = state.store::<Villa>();
    // Detached: the write model below is built from scratch
    let existing = store
        .get(Some(&Filter::id(id)), TrackingMode::Detached, &IncludeSpec::none())
        .await?
        .ok_or_else(|| villa_not_found(id))?;

    let dto = patched(&VillaUpdateDto::from(&existing), &patch)?;
    if dto.id != id {
        return Err(ApiError::bad_request("Id cannot be patched"));
    }

    store.update(&dto.into_villa(&existing)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Apply a patch document to a DTO and re-run its validation rules
pub(crate) fn patched<T>(dto: &T, patch: &[PatchOperation]) -> Result<T, ApiError>
where
    T: Serialize + serde::de::DeserializeOwned + Validate,
{
    let mut document = serde_json::to_value(dto)
        .map_err(|e| ApiError::bad_request(format!("Invalid document: {}", e)))?;
    apply_patch(&mut document, patch).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let dto: T = serde_json::from_value(document)
        .map_err(|e| ApiError::bad_request(format!("Invalid patched document: {}", e)))?;
    dto.validate()
        .map_err(|errors| ApiError::BadRequest(validation_messages(&errors)))?;
    Ok(dto)
}
