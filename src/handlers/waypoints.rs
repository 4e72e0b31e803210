use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use super::{existing_route, visible_route};
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult, ErrorBody},
    models::{CreateWaypointRequest, UpdateWaypointRequest, Waypoint},
    ordering, policy,
};

/// list_waypoints
///
/// [Public Route] Connected waypoints in order, followed by isolated ones.
#[utoipa::path(
    get,
    path = "/routes/{id}/waypoints",
    params(("id" = Uuid, Path, description = "Route ID")),
    responses(
        (status = 200, description = "Waypoints", body = [Waypoint]),
        (status = 404, description = "Route not found", body = ErrorBody)
    )
)]
pub async fn list_waypoints(
    viewer: Option<AuthUser>,
    State(state): State<AppState>,
    Path(route_id): Path<Uuid>,
) -> AppResult<Json<Vec<Waypoint>>> {
    visible_route(&state, route_id, viewer.as_ref()).await?;
    Ok(Json(state.repo.list_waypoints(route_id).await?))
}

#[utoipa::path(
    get,
    path = "/routes/{id}/waypoints/{waypoint_id}",
    params(
        ("id" = Uuid, Path, description = "Route ID"),
        ("waypoint_id" = Uuid, Path, description = "Waypoint ID")
    ),
    responses(
        (status = 200, description = "Waypoint", body = Waypoint),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_waypoint(
    viewer: Option<AuthUser>,
    State(state): State<AppState>,
    Path((route_id, waypoint_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Waypoint>> {
    visible_route(&state, route_id, viewer.as_ref()).await?;
    let waypoint = state
        .repo
        .get_waypoint(route_id, waypoint_id)
        .await?
        .ok_or_else(|| AppError::not_found("Waypoint not found"))?;
    Ok(Json(waypoint))
}

/// add_waypoint
///
/// [Authenticated Route] `type = "isolated"` stores a free-standing point.
/// Anything else appends to the sequence: the new point becomes the finish
/// and the previous finish turns intermediate.
#[utoipa::path(
    post,
    path = "/routes/{id}/waypoints",
    params(("id" = Uuid, Path, description = "Route ID")),
    request_body = CreateWaypointRequest,
    responses(
        (status = 201, description = "Created", body = Waypoint),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "Route not found", body = ErrorBody)
    )
)]
pub async fn add_waypoint(
    user: AuthUser,
    State(state): State<AppState>,
    Path(route_id): Path<Uuid>,
    Json(payload): Json<CreateWaypointRequest>,
) -> AppResult<(StatusCode, Json<Waypoint>)> {
    payload.validate()?;
    let route = existing_route(&state, route_id).await?;
    policy::ensure_can_edit_route(&user, route.creator_id)?;

    let waypoint = state
        .repo
        .add_waypoint(ordering::new_waypoint(route_id, &payload))
        .await?;
    Ok((StatusCode::CREATED, Json(waypoint)))
}

/// update_waypoint
///
/// [Authenticated Route] Connected waypoints only take `description` and
/// `photo_url`; isolated ones may also move. The type cannot be changed.
#[utoipa::path(
    put,
    path = "/routes/{id}/waypoints/{waypoint_id}",
    params(
        ("id" = Uuid, Path, description = "Route ID"),
        ("waypoint_id" = Uuid, Path, description = "Waypoint ID")
    ),
    request_body = UpdateWaypointRequest,
    responses(
        (status = 200, description = "Updated", body = Waypoint),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn update_waypoint(
    user: AuthUser,
    State(state): State<AppState>,
    Path((route_id, waypoint_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateWaypointRequest>,
) -> AppResult<Json<Waypoint>> {
    payload.validate()?;
    let route = existing_route(&state, route_id).await?;
    policy::ensure_can_edit_route(&user, route.creator_id)?;

    let waypoint = state
        .repo
        .update_waypoint(route_id, waypoint_id, payload)
        .await?
        .ok_or_else(|| AppError::not_found("Waypoint not found"))?;
    Ok(Json(waypoint))
}

/// delete_waypoint
///
/// [Authenticated Route] Removing a connected point closes the gap it leaves.
#[utoipa::path(
    delete,
    path = "/routes/{id}/waypoints/{waypoint_id}",
    params(
        ("id" = Uuid, Path, description = "Route ID"),
        ("waypoint_id" = Uuid, Path, description = "Waypoint ID")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_waypoint(
    user: AuthUser,
    State(state): State<AppState>,
    Path((route_id, waypoint_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    let route = existing_route(&state, route_id).await?;
    policy::ensure_can_edit_route(&user, route.creator_id)?;

    if state.repo.delete_waypoint(route_id, waypoint_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Waypoint not found"))
    }
}
