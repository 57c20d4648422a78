use axum::{extract::State, http::StatusCode, Extension, Json};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::{Hotel, HotelInput, SessionClaims};

use super::{collections, JsonBody, PathParams, SharedState};

#[utoipa::path(get, path = "/fetch/hotels", tag = "hotels",
    responses((status = 200, description = "All hotel documents", body = [Hotel])))]
pub async fn list_hotels(State(state): State<SharedState>) -> ApiResult<Json<Vec<Hotel>>> {
    collections::list(&state)
}

#[utoipa::path(get, path = "/fetch/hotels/{id}", tag = "hotels",
    params(("id" = Uuid, Path, description = "Hotel document id")),
    responses(
        (status = 200, description = "Document", body = Hotel),
        (status = 404, description = "Not found", body = ErrorBody),
    ))]
pub async fn get_hotel(
    State(state): State<SharedState>,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<Json<Hotel>> {
    collections::get(&state, id)
}

/// Appends to the hotel list of the same place (any case) or creates it.
#[utoipa::path(post, path = "/create/hotel", tag = "hotels",
    request_body = HotelInput,
    responses(
        (status = 201, description = "New document", body = Hotel),
        (status = 200, description = "Hotels appended to the existing document", body = Hotel),
        (status = 400, description = "Invalid request", body = ErrorBody),
    ),
    security(("bearer" = [])))]
pub async fn create_hotel(
    State(state): State<SharedState>,
    Extension(claims): Extension<SessionClaims>,
    JsonBody(input): JsonBody<HotelInput>,
) -> ApiResult<(StatusCode, Json<Hotel>)> {
    collections::create(&state, &claims, input)
}

#[utoipa::path(put, path = "/update/hotel/{id}", tag = "hotels",
    params(("id" = Uuid, Path, description = "Hotel document id")),
    request_body = HotelInput,
    responses(
        (status = 200, description = "Document", body = Hotel),
        (status = 404, description = "Not found", body = ErrorBody),
        (status = 409, description = "Place name already used by another document", body = ErrorBody),
    ),
    security(("bearer" = [])))]
pub async fn update_hotel(
    State(state): State<SharedState>,
    Extension(claims): Extension<SessionClaims>,
    PathParams(id): PathParams<Uuid>,
    JsonBody(input): JsonBody<HotelInput>,
) -> ApiResult<Json<Hotel>> {
    collections::update(&state, &claims, id, input)
}

#[utoipa::path(delete, path = "/delete/hotel/{id}", tag = "hotels",
    params(("id" = Uuid, Path, description = "Hotel document id")),
    responses(
        (status = 200, description = "The removed document", body = Hotel),
        (status = 404, description = "Not found", body = ErrorBody),
    ),
    security(("bearer" = [])))]
pub async fn delete_hotel(
    State(state): State<SharedState>,
    Extension(claims): Extension<SessionClaims>,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<Json<Hotel>> {
    collections::remove(&state, &claims, id)
}

#[utoipa::path(delete, path = "/delete/hotel/{id}/hotel/{item}", tag = "hotels",
    params(
        ("id" = Uuid, Path, description = "Hotel document id"),
        ("item" = String, Path, description = "Hotel entry id, or zero-based position"),
    ),
    responses(
        (status = 200, description = "The updated document", body = Hotel),
        (status = 400, description = "Index out of range", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody),
    ),
    security(("bearer" = [])))]
pub async fn delete_hotel_entry(
    State(state): State<SharedState>,
    Extension(claims): Extension<SessionClaims>,
    PathParams((id, item)): PathParams<(Uuid, String)>,
) -> ApiResult<Json<Hotel>> {
    collections::remove_item(&state, &claims, id, &item)
}
