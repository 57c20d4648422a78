//! REST API layer for the travel admin backend using Axum.
//!
//! - Read routes (`/fetch/...`, `/health`, `/api-docs/openapi.json`) are public.
//! - Every mutating route sits behind `auth_middleware`, which validates the
//!   bearer JWT issued by `POST /login`.
//! - Shared state holds the catalog (Sled-backed) and the token authenticator.

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, FromRequest, FromRequestParts, Request, State},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

use crate::auth::Authenticator;
use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::ApiError;
use crate::models::{
    AdminIdentity, Homestay, HomestayInput, Hotel, HotelInput, Lodging, NearbyPlace, NearbyPlaceInput,
    PersonalInfo, PersonalInfoInput, Place, PlaceInput, Profile, ProfileInput, Visit,
};

mod collections;
pub mod homestays;
pub mod hotels;
pub mod nearby;
pub mod places;
pub mod session;

/// Shared app state for REST handlers (Arc-wrapped for concurrency)
pub struct AppState {
    pub catalog: Catalog,
    pub auth: Authenticator,
}

pub type SharedState = Arc<AppState>;

/// JSON body extractor whose rejections render as `{"error": ...}` with 400.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Path extractor whose rejections render as `{"error": ...}` with 400.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct PathParams<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Generic success response (JSON)
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
        })
    }
}

/// Error body returned by every failing route.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

async fn auth_middleware(
    State(state): State<SharedState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    let claims = state.auth.validate(token).map_err(|e| {
        warn!(error = %e, "rejected session token");
        ApiError::Unauthorized("Invalid or expired token".to_string())
    })?;

    // Tokens of removed admins stop working immediately.
    if state.catalog.admin(claims.sub)?.is_none() {
        return Err(ApiError::Unauthorized("Unknown admin".to_string()));
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins.iter().filter_map(|o| HeaderValue::from_str(o).ok()))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Build shared state from the catalog and configuration.
pub fn app_state(catalog: Catalog, config: &Config) -> SharedState {
    Arc::new(AppState {
        catalog,
        auth: Authenticator::new(config.jwt_secret.as_bytes(), config.token_ttl_secs, config.bcrypt_cost),
    })
}

/// Create Axum router with every admin endpoint
pub fn create_router(state: SharedState, cors_origins: &[String]) -> Router {
    let admin_routes = Router::new()
        .route("/session", get(session::current_session))
        .route("/create/profile", post(session::create_profile))
        .route("/create/mainplace", post(places::create_place))
        .route("/update/mainplace/:id", put(places::update_place))
        .route("/delete/mainplace/:id", delete(places::delete_place))
        .route("/create/homestay", post(homestays::create_homestay))
        .route("/update/homestay/:id", put(homestays::update_homestay))
        .route("/delete/homestay/:id", delete(homestays::delete_homestay))
        .route("/delete/homestay/:id/stay/:item", delete(homestays::delete_stay))
        .route("/create/hotel", post(hotels::create_hotel))
        .route("/update/hotel/:id", put(hotels::update_hotel))
        .route("/delete/hotel/:id", delete(hotels::delete_hotel))
        .route("/delete/hotel/:id/hotel/:item", delete(hotels::delete_hotel_entry))
        .route("/delete/single/hotel/:id/:item", delete(hotels::delete_hotel_entry))
        .route("/create/nearbyPlace", post(nearby::create_nearby_place))
        .route("/update/nearbyPlace/:id", put(nearby::update_nearby_place))
        .route("/delete/nearbyPlace/:id", delete(nearby::delete_nearby_place))
        .route("/delete/nearbyPlace/:id/place/:item", delete(nearby::delete_visit))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health_handler))
        .route("/api-docs/openapi.json", get(openapi_handler))
        .route("/login", post(session::login))
        .route("/fetch/mainplace", get(places::list_places))
        .route("/fetch/mainplace/:id", get(places::get_place))
        .route("/fetch/homestays", get(homestays::list_homestays))
        .route("/fetch/homestays/:id", get(homestays::get_homestay))
        .route("/fetch/hotels", get(hotels::list_hotels))
        .route("/fetch/hotels/:id", get(hotels::get_hotel))
        .route("/fetch/nearbyPlaces", get(nearby::list_nearby_places))
        .route("/fetch/nearbyPlaces/:id", get(nearby::get_nearby_place))
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// Health check handler
#[utoipa::path(get, path = "/health", tag = "system", responses((status = 200, description = "Service is up", body = MessageResponse)))]
pub async fn health_handler() -> Json<MessageResponse> {
    MessageResponse::ok("travel admin API healthy")
}

async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        session::login,
        session::current_session,
        session::create_profile,
        places::list_places,
        places::get_place,
        places::create_place,
        places::update_place,
        places::delete_place,
        homestays::list_homestays,
        homestays::get_homestay,
        homestays::create_homestay,
        homestays::update_homestay,
        homestays::delete_homestay,
        homestays::delete_stay,
        hotels::list_hotels,
        hotels::get_hotel,
        hotels::create_hotel,
        hotels::update_hotel,
        hotels::delete_hotel,
        hotels::delete_hotel_entry,
        nearby::list_nearby_places,
        nearby::get_nearby_place,
        nearby::create_nearby_place,
        nearby::update_nearby_place,
        nearby::delete_nearby_place,
        nearby::delete_visit,
    ),
    components(schemas(
        Place, PlaceInput, Homestay, HomestayInput, Hotel, HotelInput, NearbyPlace, NearbyPlaceInput,
        Lodging, Visit, Profile, ProfileInput, PersonalInfo, PersonalInfoInput, AdminIdentity,
        session::LoginRequest, session::LoginResponse, MessageResponse, ErrorBody,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "system", description = "Health and API description"),
        (name = "session", description = "Admin login and profiles"),
        (name = "places", description = "Travel destinations"),
        (name = "homestays", description = "Homestays grouped by place"),
        (name = "hotels", description = "Hotels grouped by place"),
        (name = "nearby", description = "Sights near a place"),
    )
)]
pub struct ApiDoc;
