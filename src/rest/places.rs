use axum::{extract::State, http::StatusCode, Extension, Json};
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{Place, PlaceInput, SessionClaims};

use super::{JsonBody, MessageResponse, PathParams, SharedState};

#[utoipa::path(get, path = "/fetch/mainplace", tag = "places",
    responses((status = 200, description = "All places in creation order", body = [Place])))]
pub async fn list_places(State(state): State<SharedState>) -> ApiResult<Json<Vec<Place>>> {
    Ok(Json(state.catalog.list::<Place>()?))
}

#[utoipa::path(get, path = "/fetch/mainplace/{id}", tag = "places",
    params(("id" = Uuid, Path, description = "Place id")),
    responses(
        (status = 200, description = "The place", body = Place),
        (status = 404, description = "Not found", body = ErrorBody),
    ))]
pub async fn get_place(
    State(state): State<SharedState>,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<Json<Place>> {
    state
        .catalog
        .get::<Place>(id)
        .map(Json)
        .map_err(|e| ApiError::from_store(e, "Place"))
}

/// Rejects a name already used by another place, compared case-insensitively.
#[utoipa::path(post, path = "/create/mainplace", tag = "places",
    request_body = PlaceInput,
    responses(
        (status = 201, description = "Place created", body = Place),
        (status = 400, description = "Missing placename or invalid budget", body = ErrorBody),
        (status = 409, description = "Place already exists", body = ErrorBody),
    ),
    security(("bearer" = [])))]
pub async fn create_place(
    State(state): State<SharedState>,
    Extension(claims): Extension<SessionClaims>,
    JsonBody(input): JsonBody<PlaceInput>,
) -> ApiResult<(StatusCode, Json<Place>)> {
    let place = state.catalog.create_place(input)?;
    info!(admin = %claims.email, id = %place.id, "place created via API");
    Ok((StatusCode::CREATED, Json(place)))
}

#[utoipa::path(put, path = "/update/mainplace/{id}", tag = "places",
    params(("id" = Uuid, Path, description = "Place id")),
    request_body = PlaceInput,
    responses(
        (status = 200, description = "Updated place", body = Place),
        (status = 404, description = "Place not found", body = ErrorBody),
        (status = 409, description = "Renamed onto an existing place", body = ErrorBody),
    ),
    security(("bearer" = [])))]
pub async fn update_place(
    State(state): State<SharedState>,
    Extension(claims): Extension<SessionClaims>,
    PathParams(id): PathParams<Uuid>,
    JsonBody(patch): JsonBody<PlaceInput>,
) -> ApiResult<Json<Place>> {
    let place = state
        .catalog
        .update_place(id, patch)
        .map_err(|e| ApiError::from_store(e, "Place"))?;
    info!(admin = %claims.email, %id, "place updated");
    Ok(Json(place))
}

#[utoipa::path(delete, path = "/delete/mainplace/{id}", tag = "places",
    params(("id" = Uuid, Path, description = "Place id")),
    responses((status = 200, description = "Deleted, or was already absent", body = MessageResponse)),
    security(("bearer" = [])))]
pub async fn delete_place(
    State(state): State<SharedState>,
    Extension(claims): Extension<SessionClaims>,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state.catalog.delete_place(id)?;
    info!(admin = %claims.email, %id, "place deleted");
    Ok(MessageResponse::ok("Deleted successfully"))
}
