use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::error::{ApiError, ApiResult};
use crate::models::{AdminIdentity, Profile, ProfileInput, SessionClaims};

use super::{JsonBody, SharedState};

#[derive(Deserialize, Serialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub token_type: String,
    /// Seconds until the token expires.
    pub expires_in: u64,
    pub user: AdminIdentity,
}

/// The bcrypt check runs on the blocking pool.
#[utoipa::path(post, path = "/login", tag = "session",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid email or password", body = ErrorBody),
    ))]
pub async fn login(
    State(state): State<SharedState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let worker = state.clone();
    let email = payload.email.clone();
    let admin = tokio::task::spawn_blocking(move || {
        worker
            .catalog
            .authenticate(&worker.auth, &payload.email, &payload.password)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    let Some(admin) = admin else {
        warn!(%email, "failed login");
        return Err(ApiError::Unauthorized("Invalid email or password".to_string()));
    };

    let issued = state
        .auth
        .issue(&admin)
        .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))?;
    info!(email = %admin.email, "admin logged in");

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires_in: issued.expires_in,
        user: AdminIdentity::from(&admin),
    }))
}

/// Identity behind the presented token; lets the dashboard verify a stored session.
#[utoipa::path(get, path = "/session", tag = "session",
    responses(
        (status = 200, description = "Current admin", body = AdminIdentity),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
    ),
    security(("bearer" = [])))]
pub async fn current_session(
    State(state): State<SharedState>,
    Extension(claims): Extension<SessionClaims>,
) -> ApiResult<Json<AdminIdentity>> {
    let admin = state
        .catalog
        .admin(claims.sub)?
        .ok_or_else(|| ApiError::Unauthorized("Unknown admin".to_string()))?;
    Ok(Json(AdminIdentity::from(&admin)))
}

#[utoipa::path(post, path = "/create/profile", tag = "session",
    request_body = ProfileInput,
    responses(
        (status = 201, description = "Profile created", body = Profile),
        (status = 400, description = "Missing field or invalid phone", body = ErrorBody),
        (status = 409, description = "Username already taken", body = ErrorBody),
    ),
    security(("bearer" = [])))]
pub async fn create_profile(
    State(state): State<SharedState>,
    Extension(claims): Extension<SessionClaims>,
    JsonBody(input): JsonBody<ProfileInput>,
) -> ApiResult<(StatusCode, Json<Profile>)> {
    let profile = state.catalog.create_profile(input)?;
    info!(admin = %claims.email, id = %profile.id, "profile created via API");
    Ok((StatusCode::CREATED, Json(profile)))
}
