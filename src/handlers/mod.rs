//! Request handlers, one module per resource.
//!
//! Handlers validate input, consult `policy` and `lifecycle`, and delegate
//! persistence to the `Repository` held in `AppState`. Every handler returns
//! `AppResult`, so failures surface as `{"error": ...}` responses.

pub mod admin;
pub mod auth;
pub mod comments;
pub mod reference;
pub mod routes;
pub mod users;
pub mod waypoints;

use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{Route, RouteDetail},
    policy,
};

/// Loads a route the viewer is allowed to see. Drafts are only visible to
/// those who may edit them; everyone else gets the same 404 as for a missing route.
pub(crate) async fn visible_route(
    state: &AppState,
    id: Uuid,
    viewer: Option<&AuthUser>,
) -> AppResult<Route> {
    let route = state
        .repo
        .get_route(id)
        .await?
        .ok_or_else(|| AppError::not_found("Route not found"))?;

    if route.is_public || viewer.is_some_and(|v| policy::can_edit_route(v, route.creator_id)) {
        Ok(route)
    } else {
        Err(AppError::not_found("Route not found"))
    }
}

/// Loads a route that exists, regardless of its state.
pub(crate) async fn existing_route(state: &AppState, id: Uuid) -> AppResult<Route> {
    state
        .repo
        .get_route(id)
        .await?
        .ok_or_else(|| AppError::not_found("Route not found"))
}

/// Assembles the full detail view of a route for `viewer`.
pub(crate) async fn route_detail(
    state: &AppState,
    id: Uuid,
    viewer: Option<&AuthUser>,
) -> AppResult<RouteDetail> {
    let summary = state
        .repo
        .route_summary(id, viewer.map(|v| v.id))
        .await?
        .ok_or_else(|| AppError::not_found("Route not found"))?;
    let waypoints = state.repo.list_waypoints(id).await?;
    let tags = state.repo.route_tags(id).await?;

    let creator_id = summary.route.creator_id;
    Ok(RouteDetail {
        can_edit: viewer.is_some_and(|v| policy::can_edit_route(v, creator_id)),
        can_delete: viewer.is_some_and(|v| policy::can_delete_route(v, creator_id)),
        route: summary.route,
        waypoints,
        tags,
        likes_count: summary.likes_count,
        comments_count: summary.comments_count,
        is_liked: summary.is_liked,
        is_favorite: summary.is_favorite,
        creator_login: summary.creator_login,
        route_type_name: summary.route_type_name,
        difficulty_name: summary.difficulty_name,
    })
}
