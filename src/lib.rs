use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core services.
pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod storage;

// Domain rules, free of I/O.
pub mod lifecycle;
pub mod ordering;
pub mod policy;

// Routing segregation (public, authenticated, admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and schema into the OpenAPI
/// document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register, handlers::auth::login, handlers::auth::refresh,
        handlers::auth::forgot_password, handlers::auth::restore_password,
        handlers::auth::reset_password,
        handlers::users::get_me, handlers::users::update_me, handlers::users::upload_avatar_file,
        handlers::users::set_avatar_url, handlers::users::get_user_profile,
        handlers::users::list_users,
        handlers::routes::list_routes, handlers::routes::get_route, handlers::routes::create_route,
        handlers::routes::update_route, handlers::routes::delete_route, handlers::routes::my_routes,
        handlers::routes::user_routes, handlers::routes::favorite_routes,
        handlers::routes::like_route, handlers::routes::unlike_route,
        handlers::routes::favorite_route, handlers::routes::unfavorite_route,
        handlers::routes::publish_route, handlers::routes::route_to_draft,
        handlers::waypoints::list_waypoints, handlers::waypoints::get_waypoint,
        handlers::waypoints::add_waypoint, handlers::waypoints::update_waypoint,
        handlers::waypoints::delete_waypoint,
        handlers::comments::list_comments, handlers::comments::create_comment,
        handlers::comments::delete_comment, handlers::comments::like_comment,
        handlers::comments::unlike_comment,
        handlers::admin::toggle_user_active, handlers::admin::set_user_role,
        handlers::admin::reset_user_password, handlers::admin::delete_user,
        handlers::admin::get_user_info, handlers::admin::get_users_list,
        handlers::reference::route_types, handlers::reference::difficulty_types,
        handlers::reference::target_types, handlers::reference::route_tags
    ),
    components(
        schemas(
            models::UserRole, models::Gender, models::WaypointType,
            models::Route, models::Waypoint, models::ReferenceItem, models::RouteCard,
            models::RouteDetail, models::CommentView, models::UserInfo, models::UserInfoPublic,
            models::RegisterRequest, models::LoginForm, models::TokenResponse,
            models::ForgotPasswordRequest, models::RestorePasswordRequest,
            models::ChangePasswordRequest, models::UpdateProfileRequest, models::AvatarUrlRequest,
            models::CreateWaypointRequest, models::UpdateWaypointRequest,
            models::CreateRouteRequest, models::UpdateRouteRequest, models::CreateCommentRequest,
            models::ToggleUserStatusRequest, models::SetUserRoleRequest,
            models::ResetUserPasswordRequest, models::MessageResponse, models::RouteOrdering,
            error::ErrorBody, handlers::users::AvatarUpload,
        )
    ),
    tags(
        (name = "turtut", description = "Route sharing API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Shared, immutable container of the services every request needs.
#[derive(Clone)]
pub struct AppState {
    /// Persistence behind the `Repository` trait (Postgres in production).
    pub repo: RepositoryState,
    /// Object storage for uploaded avatars.
    pub storage: StorageState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects the request unless `AuthUser` can be extracted: 401 for a missing or
/// invalid access token, 403 for a blocked account.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the public, authenticated and admin routers, then wraps them in
/// the request-id, tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // The role check happens in the handlers, after this layer authenticates.
        .nest(
            "/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span so every log line carries the `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
