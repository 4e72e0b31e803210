use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

/// Authenticated Router Module
///
/// Every handler here receives a validated `AuthUser`. Ownership and role
/// checks (owner, moderator, admin) happen inside the handlers through `policy`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/auth/reset_password", post(handlers::auth::reset_password))
        // --- Own profile ---
        .route(
            "/users/me",
            get(handlers::users::get_me).put(handlers::users::update_me),
        )
        // Multipart `file`; stored in the bucket under `avatars/`.
        .route(
            "/users/me/avatar_file",
            post(handlers::users::upload_avatar_file),
        )
        .route("/users/me/avatar", post(handlers::users::set_avatar_url))
        // --- Routes ---
        .route("/routes", post(handlers::routes::create_route))
        // Drafts included.
        .route("/routes/my", get(handlers::routes::my_routes))
        .route("/routes/favorites", get(handlers::routes::favorite_routes))
        .route(
            "/routes/{id}",
            put(handlers::routes::update_route).delete(handlers::routes::delete_route),
        )
        .route(
            "/routes/{id}/like",
            post(handlers::routes::like_route).delete(handlers::routes::unlike_route),
        )
        .route(
            "/routes/{id}/favorite",
            post(handlers::routes::favorite_route).delete(handlers::routes::unfavorite_route),
        )
        .route("/routes/{id}/publish", patch(handlers::routes::publish_route))
        .route("/routes/{id}/to_draft", patch(handlers::routes::route_to_draft))
        // --- Waypoints ---
        .route(
            "/routes/{id}/waypoints",
            post(handlers::waypoints::add_waypoint),
        )
        .route(
            "/routes/{id}/waypoints/{waypoint_id}",
            put(handlers::waypoints::update_waypoint).delete(handlers::waypoints::delete_waypoint),
        )
        // --- Comments ---
        .route(
            "/comments/{id}/{target_id}",
            post(handlers::comments::create_comment),
        )
        .route("/comments/{id}", delete(handlers::comments::delete_comment))
        .route(
            "/comments/{id}/like",
            post(handlers::comments::like_comment).delete(handlers::comments::unlike_comment),
        )
}
