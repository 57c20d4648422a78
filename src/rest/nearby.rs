use axum::{extract::State, http::StatusCode, Extension, Json};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::{NearbyPlace, NearbyPlaceInput, SessionClaims};

use super::{collections, JsonBody, PathParams, SharedState};

#[utoipa::path(get, path = "/fetch/nearbyPlaces", tag = "nearby",
    responses((status = 200, description = "All nearby place documents", body = [NearbyPlace])))]
pub async fn list_nearby_places(State(state): State<SharedState>) -> ApiResult<Json<Vec<NearbyPlace>>> {
    collections::list(&state)
}

#[utoipa::path(get, path = "/fetch/nearbyPlaces/{id}", tag = "nearby",
    params(("id" = Uuid, Path, description = "Nearby place document id")),
    responses(
        (status = 200, description = "Document", body = NearbyPlace),
        (status = 404, description = "Not found", body = ErrorBody),
    ))]
pub async fn get_nearby_place(
    State(state): State<SharedState>,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<Json<NearbyPlace>> {
    collections::get(&state, id)
}

#[utoipa::path(post, path = "/create/nearbyPlace", tag = "nearby",
    request_body = NearbyPlaceInput,
    responses(
        (status = 201, description = "New document", body = NearbyPlace),
        (status = 200, description = "Visits appended to the existing document", body = NearbyPlace),
        (status = 400, description = "Invalid request", body = ErrorBody),
    ),
    security(("bearer" = [])))]
pub async fn create_nearby_place(
    State(state): State<SharedState>,
    Extension(claims): Extension<SessionClaims>,
    JsonBody(input): JsonBody<NearbyPlaceInput>,
) -> ApiResult<(StatusCode, Json<NearbyPlace>)> {
    collections::create(&state, &claims, input)
}

#[utoipa::path(put, path = "/update/nearbyPlace/{id}", tag = "nearby",
    params(("id" = Uuid, Path, description = "Nearby place document id")),
    request_body = NearbyPlaceInput,
    responses(
        (status = 200, description = "Document", body = NearbyPlace),
        (status = 404, description = "Not found", body = ErrorBody),
        (status = 409, description = "Place name already used by another document", body = ErrorBody),
    ),
    security(("bearer" = [])))]
pub async fn update_nearby_place(
    State(state): State<SharedState>,
    Extension(claims): Extension<SessionClaims>,
    PathParams(id): PathParams<Uuid>,
    JsonBody(input): JsonBody<NearbyPlaceInput>,
) -> ApiResult<Json<NearbyPlace>> {
    collections::update(&state, &claims, id, input)
}

#[utoipa::path(delete, path = "/delete/nearbyPlace/{id}", tag = "nearby",
    params(("id" = Uuid, Path, description = "Nearby place document id")),
    responses(
        (status = 200, description = "The removed document", body = NearbyPlace),
        (status = 404, description = "Not found", body = ErrorBody),
    ),
    security(("bearer" = [])))]
pub async fn delete_nearby_place(
    State(state): State<SharedState>,
    Extension(claims): Extension<SessionClaims>,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<Json<NearbyPlace>> {
    collections::remove(&state, &claims, id)
}

#[utoipa::path(delete, path = "/delete/nearbyPlace/{id}/place/{item}", tag = "nearby",
    params(
        ("id" = Uuid, Path, description = "Nearby place document id"),
        ("item" = String, Path, description = "Visit entry id, or zero-based position"),
    ),
    responses(
        (status = 200, description = "The updated document", body = NearbyPlace),
        (status = 400, description = "Index out of range", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody),
    ),
    security(("bearer" = [])))]
pub async fn delete_visit(
    State(state): State<SharedState>,
    Extension(claims): Extension<SessionClaims>,
    PathParams((id, item)): PathParams<(Uuid, String)>,
) -> ApiResult<Json<NearbyPlace>> {
    collections::remove_item(&state, &claims, id, &item)
}
