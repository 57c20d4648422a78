use axum::{extract::State, http::StatusCode, Extension, Json};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::{Homestay, HomestayInput, SessionClaims};

use super::{collections, JsonBody, PathParams, SharedState};

#[utoipa::path(get, path = "/fetch/homestays", tag = "homestays",
    responses((status = 200, description = "All homestay documents", body = [Homestay])))]
pub async fn list_homestays(State(state): State<SharedState>) -> ApiResult<Json<Vec<Homestay>>> {
    collections::list(&state)
}

#[utoipa::path(get, path = "/fetch/homestays/{id}", tag = "homestays",
    params(("id" = Uuid, Path, description = "Homestay document id")),
    responses(
        (status = 200, description = "Document", body = Homestay),
        (status = 404, description = "Not found", body = ErrorBody),
    ))]
pub async fn get_homestay(
    State(state): State<SharedState>,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<Json<Homestay>> {
    collections::get(&state, id)
}

/// Appends to the document of the same place (any case) or creates it.
#[utoipa::path(post, path = "/create/homestay", tag = "homestays",
    request_body = HomestayInput,
    responses(
        (status = 201, description = "New document", body = Homestay),
        (status = 200, description = "Stays appended to the existing document", body = Homestay),
        (status = 400, description = "Invalid request", body = ErrorBody),
    ),
    security(("bearer" = [])))]
pub async fn create_homestay(
    State(state): State<SharedState>,
    Extension(claims): Extension<SessionClaims>,
    JsonBody(input): JsonBody<HomestayInput>,
) -> ApiResult<(StatusCode, Json<Homestay>)> {
    collections::create(&state, &claims, input)
}

#[utoipa::path(put, path = "/update/homestay/{id}", tag = "homestays",
    params(("id" = Uuid, Path, description = "Homestay document id")),
    request_body = HomestayInput,
    responses(
        (status = 200, description = "Document", body = Homestay),
        (status = 404, description = "Not found", body = ErrorBody),
        (status = 409, description = "Place name already used by another document", body = ErrorBody),
    ),
    security(("bearer" = [])))]
pub async fn update_homestay(
    State(state): State<SharedState>,
    Extension(claims): Extension<SessionClaims>,
    PathParams(id): PathParams<Uuid>,
    JsonBody(input): JsonBody<HomestayInput>,
) -> ApiResult<Json<Homestay>> {
    collections::update(&state, &claims, id, input)
}

#[utoipa::path(delete, path = "/delete/homestay/{id}", tag = "homestays",
    params(("id" = Uuid, Path, description = "Homestay document id")),
    responses(
        (status = 200, description = "The removed document", body = Homestay),
        (status = 404, description = "Not found", body = ErrorBody),
    ),
    security(("bearer" = [])))]
pub async fn delete_homestay(
    State(state): State<SharedState>,
    Extension(claims): Extension<SessionClaims>,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<Json<Homestay>> {
    collections::remove(&state, &claims, id)
}

#[utoipa::path(delete, path = "/delete/homestay/{id}/stay/{item}", tag = "homestays",
    params(
        ("id" = Uuid, Path, description = "Homestay document id"),
        ("item" = String, Path, description = "Stay id, or zero-based position"),
    ),
    responses(
        (status = 200, description = "The updated document", body = Homestay),
        (status = 400, description = "Index out of range", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody),
    ),
    security(("bearer" = [])))]
pub async fn delete_stay(
    State(state): State<SharedState>,
    Extension(claims): Extension<SessionClaims>,
    PathParams((id, item)): PathParams<(Uuid, String)>,
) -> ApiResult<Json<Homestay>> {
    collections::remove_item(&state, &claims, id, &item)
}
