//! Route table

use crate::server::state::AppState;
use crate::server::{users, villa, villa_number};
use axum::Router;
use axum::routing::{get, post};

/// Build every route of the API
///
/// - `/api/VillaAPI` and `/api/VillaAPI/{id}`
/// - `/api/v1/VillaNumberAPI` and `/api/v1/VillaNumberAPI/{villa_no}`
/// - `/api/v1/UsersAuth/login` and `/api/v1/UsersAuth/register`
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/VillaAPI",
            get(villa::list_villas).post(villa::create_villa),
        )
        .route(
            "/api/VillaAPI/{id}",
            get(villa::get_villa)
                .put(villa::update_villa)
                .patch(villa::patch_villa)
                .delete(villa::delete_villa),
        )
        .route(
            "/api/v1/VillaNumberAPI",
            get(villa_number::list_villa_numbers).post(villa_number::create_villa_number),
        )
        .route(
            "/api/v1/VillaNumberAPI/{villa_no}",
            get(villa_number::get_villa_number)
                .put(villa_number::update_villa_number)
                .patch(villa_number::patch_villa_number)
                .delete(villa_number::delete_villa_number),
        )
        .route("/api/v1/UsersAuth/login", post(users::login))
        .route("/api/v1/UsersAuth/register", post(users::register))
        .with_state(state)
}
