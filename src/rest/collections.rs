//! Shared handler bodies for the three place-keyed collections.

use axum::{http::StatusCode, Json};
use tracing::info;
use uuid::Uuid;

use crate::catalog::ItemRef;
use crate::error::{ApiError, ApiResult};
use crate::models::{NestedRecord, SessionClaims};

use super::SharedState;

pub(super) fn list<R: NestedRecord>(state: &SharedState) -> ApiResult<Json<Vec<R>>> {
    Ok(Json(state.catalog.list::<R>()?))
}

pub(super) fn get<R: NestedRecord>(state: &SharedState, id: Uuid) -> ApiResult<Json<R>> {
    state
        .catalog
        .get::<R>(id)
        .map(Json)
        .map_err(|e| ApiError::from_store(e, R::KIND))
}

/// 201 when a new document was created, 200 when items were appended.
pub(super) fn create<R: NestedRecord>(
    state: &SharedState,
    claims: &SessionClaims,
    input: R::Input,
) -> ApiResult<(StatusCode, Json<R>)> {
    let (record, created) = state.catalog.merge_create::<R>(input)?;
    info!(admin = %claims.email, kind = R::KIND, created, "collection submitted");
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(record)))
}

pub(super) fn update<R: NestedRecord>(
    state: &SharedState,
    claims: &SessionClaims,
    id: Uuid,
    input: R::Input,
) -> ApiResult<Json<R>> {
    let record = state
        .catalog
        .replace::<R>(id, input)
        .map_err(|e| ApiError::from_store(e, R::KIND))?;
    info!(admin = %claims.email, kind = R::KIND, %id, "document updated");
    Ok(Json(record))
}

pub(super) fn remove<R: NestedRecord>(state: &SharedState, claims: &SessionClaims, id: Uuid) -> ApiResult<Json<R>> {
    let removed = state
        .catalog
        .delete::<R>(id)
        .map_err(|e| ApiError::from_store(e, R::KIND))?;
    info!(admin = %claims.email, kind = R::KIND, %id, "document removed");
    Ok(Json(removed))
}

pub(super) fn remove_item<R: NestedRecord>(
    state: &SharedState,
    claims: &SessionClaims,
    id: Uuid,
    item: &str,
) -> ApiResult<Json<R>> {
    let item: ItemRef = item.parse()?;
    let record = state
        .catalog
        .remove_item::<R>(id, item)
        .map_err(|e| ApiError::from_store(e, R::KIND))?;
    info!(admin = %claims.email, kind = R::KIND, %id, ?item, "entry removed");
    Ok(Json(record))
}
