use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a token: the auth gateway, profiles, published
/// routes with their waypoints, comment threads and the lookup tables.
///
/// Listing and detail handlers accept an optional bearer token. When present it
/// fills the viewer flags (`is_liked`, `is_favorite`, `can_edit`) and lets
/// editors see their drafts.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // --- Auth gateway ---
        .route("/auth/register", post(handlers::auth::register))
        // Form-encoded `username` + `password`, OAuth2 password flow style.
        .route("/auth/login", post(handlers::auth::login))
        // The refresh token travels in `X-Refresh-Token`.
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/forgot_password", post(handlers::auth::forgot_password))
        .route("/auth/restore_password", post(handlers::auth::restore_password))
        // --- Profiles ---
        .route("/users", get(handlers::users::list_users))
        .route("/users/{identifier}", get(handlers::users::get_user_profile))
        // --- Routes ---
        // GET /routes?search=&route_type_id=&difficulty_id=&location=&ordering=&skip=&limit=
        .route("/routes", get(handlers::routes::list_routes))
        .route("/routes/{id}", get(handlers::routes::get_route))
        .route("/routes/user/{identifier}", get(handlers::routes::user_routes))
        .route(
            "/routes/{id}/waypoints",
            get(handlers::waypoints::list_waypoints),
        )
        .route(
            "/routes/{id}/waypoints/{waypoint_id}",
            get(handlers::waypoints::get_waypoint),
        )
        // GET /comments/{target_type}/{target_id}
        // The first capture is shared with `/comments/{id}` and must carry the
        // same name in every comment path.
        .route(
            "/comments/{id}/{target_id}",
            get(handlers::comments::list_comments),
        )
        // --- Lookup tables ---
        .route("/utils/route_types", get(handlers::reference::route_types))
        .route(
            "/utils/difficulty_types",
            get(handlers::reference::difficulty_types),
        )
        .route("/utils/target_types", get(handlers::reference::target_types))
        .route("/utils/route_tags", get(handlers::reference::route_tags))
}
