use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use super::{existing_route, route_detail, visible_route};
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult, ErrorBody},
    lifecycle::{self, PublishCandidate, RouteState},
    models::{
        CreateRouteRequest, MessageResponse, Pagination, Route, RouteCard, RouteDetail,
        RouteFilter, UpdateRouteRequest,
    },
    ordering, policy,
    repository::{NewRoute, ReferenceTable, RouteEdit},
};

/// Rejects unknown route type, difficulty or tag ids with a 400.
async fn check_references(
    state: &AppState,
    route_type_id: Option<Uuid>,
    difficulty_id: Option<Uuid>,
    tags: Option<&[Uuid]>,
) -> AppResult<()> {
    if let Some(id) = route_type_id {
        if !state.repo.reference_exists(ReferenceTable::RouteTypes, id).await? {
            return Err(AppError::bad_request("Unknown route type"));
        }
    }
    if let Some(id) = difficulty_id {
        if !state.repo.reference_exists(ReferenceTable::DifficultyTypes, id).await? {
            return Err(AppError::bad_request("Unknown difficulty"));
        }
    }
    for id in tags.unwrap_or_default() {
        if !state.repo.reference_exists(ReferenceTable::RouteTags, *id).await? {
            return Err(AppError::bad_request(format!("Unknown route tag {id}")));
        }
    }
    Ok(())
}

/// list_routes
///
/// [Public Route] Published routes with search, filters, ordering and paging.
/// A valid token additionally marks the caller's likes and favorites.
#[utoipa::path(
    get,
    path = "/routes",
    params(RouteFilter),
    responses((status = 200, description = "Route cards", body = [RouteCard]))
)]
pub async fn list_routes(
    viewer: Option<AuthUser>,
    State(state): State<AppState>,
    Query(filter): Query<RouteFilter>,
) -> AppResult<Json<Vec<RouteCard>>> {
    let cards = state
        .repo
        .list_public_routes(&filter, viewer.map(|v| v.id))
        .await?;
    Ok(Json(cards))
}

/// get_route
///
/// [Public Route] Full route view. Drafts are visible to their editors only.
#[utoipa::path(
    get,
    path = "/routes/{id}",
    params(("id" = Uuid, Path, description = "Route ID")),
    responses(
        (status = 200, description = "Route detail", body = RouteDetail),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_route(
    viewer: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RouteDetail>> {
    visible_route(&state, id, viewer.as_ref()).await?;
    Ok(Json(route_detail(&state, id, viewer.as_ref()).await?))
}

/// create_route
///
/// [Authenticated Route] Creates a route with its tags and waypoints. With
/// `is_public = true` the publish checks run against the payload first.
#[utoipa::path(
    post,
    path = "/routes",
    request_body = CreateRouteRequest,
    responses(
        (status = 201, description = "Created", body = RouteDetail),
        (status = 400, description = "Invalid payload or not publishable", body = ErrorBody)
    )
)]
pub async fn create_route(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateRouteRequest>,
) -> AppResult<(StatusCode, Json<RouteDetail>)> {
    payload.validate()?;
    check_references(
        &state,
        payload.route_type_id,
        payload.difficulty_id,
        Some(payload.tags.as_slice()),
    )
    .await?;

    let id = Uuid::new_v4();
    let now = Utc::now();
    let waypoints = ordering::plan_waypoints(id, &payload.waypoints);

    let published_at = if payload.is_public {
        lifecycle::check_publishable(&PublishCandidate {
            name: &payload.name,
            location: payload.location.as_deref(),
            description: payload.description.as_deref(),
            waypoint_count: waypoints.len(),
        })?;
        Some(now)
    } else {
        None
    };

    let route = Route {
        id,
        creator_id: user.id,
        name: payload.name.trim().to_string(),
        location: payload.location,
        description: payload.description,
        route_type_id: payload.route_type_id,
        difficulty_id: payload.difficulty_id,
        thumbnail_url: payload.thumbnail_url,
        duration: payload.duration,
        distance: payload.distance,
        avg_rating: 0.0,
        created_at: now,
        edited_at: now,
        is_public: payload.is_public,
        published_at,
        last_edited_by_id: Some(user.id),
        last_edited_by_role: Some(user.role),
        geo_data: payload.geo_data.map(|wkt| wkt.trim().to_string()),
    };

    state
        .repo
        .create_route(NewRoute {
            route,
            tags: payload.tags,
            waypoints,
        })
        .await?;

    let detail = route_detail(&state, id, Some(&user)).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// update_route
///
/// [Authenticated Route] Partial update by the owner, a moderator or an admin.
/// `tags` and `waypoints` replace the stored sets when present. The
/// publication state is left untouched.
#[utoipa::path(
    put,
    path = "/routes/{id}",
    params(("id" = Uuid, Path, description = "Route ID")),
    request_body = UpdateRouteRequest,
    responses(
        (status = 200, description = "Updated", body = RouteDetail),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn update_route(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRouteRequest>,
) -> AppResult<Json<RouteDetail>> {
    payload.validate()?;
    let route = existing_route(&state, id).await?;
    policy::ensure_can_edit_route(&user, route.creator_id)?;
    check_references(
        &state,
        payload.route_type_id,
        payload.difficulty_id,
        payload.tags.as_deref(),
    )
    .await?;

    let waypoints = payload
        .waypoints
        .as_deref()
        .map(|requests| ordering::plan_waypoints(id, requests));

    state
        .repo
        .update_route(
            id,
            RouteEdit {
                changes: payload,
                waypoints,
                editor_id: user.id,
                editor_role: user.role,
            },
        )
        .await?
        .ok_or_else(|| AppError::not_found("Route not found"))?;

    Ok(Json(route_detail(&state, id, Some(&user)).await?))
}

/// delete_route
///
/// [Authenticated Route] Owner or admin only. Waypoints, likes, favorites and
/// the route's comments go with it.
#[utoipa::path(
    delete,
    path = "/routes/{id}",
    params(("id" = Uuid, Path, description = "Route ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_route(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let route = existing_route(&state, id).await?;
    policy::ensure_can_delete_route(&user, route.creator_id)?;

    if state.repo.delete_route(id).await? {
        tracing::info!(route_id = %id, actor = %user.id, "route deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Route not found"))
    }
}

/// my_routes
///
/// [Authenticated Route] All routes of the caller, drafts included. Pages of
/// up to 1000, 100 by default.
#[utoipa::path(
    get,
    path = "/routes/my",
    params(Pagination),
    responses((status = 200, description = "My routes", body = [RouteCard]))
)]
pub async fn my_routes(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<RouteCard>>> {
    let (skip, limit) = page.resolve(100, 1000);
    let cards = state
        .repo
        .list_user_routes(id, true, Some(id), skip, limit)
        .await?;
    Ok(Json(cards))
}

/// user_routes
///
/// [Public Route] Published routes of a user, looked up by login or email.
#[utoipa::path(
    get,
    path = "/routes/user/{identifier}",
    params(("identifier" = String, Path, description = "Login or email"), Pagination),
    responses(
        (status = 200, description = "Routes", body = [RouteCard]),
        (status = 404, description = "Unknown user", body = ErrorBody)
    )
)]
pub async fn user_routes(
    viewer: Option<AuthUser>,
    State(state): State<AppState>,
    Path(identifier): Path<String>,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<RouteCard>>> {
    let (skip, limit) = page.resolve(20, 100);
    let owner = state
        .repo
        .find_user(&identifier)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    let cards = state
        .repo
        .list_user_routes(owner.id, false, viewer.map(|v| v.id), skip, limit)
        .await?;
    Ok(Json(cards))
}

/// favorite_routes
///
/// [Authenticated Route] Routes the caller marked as favorite.
#[utoipa::path(
    get,
    path = "/routes/favorites",
    responses((status = 200, description = "Favorites", body = [RouteCard]))
)]
pub async fn favorite_routes(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<RouteCard>>> {
    Ok(Json(state.repo.list_favorite_routes(id).await?))
}

/// like_route
///
/// [Authenticated Route] A second like from the same user is rejected.
#[utoipa::path(
    post,
    path = "/routes/{id}/like",
    params(("id" = Uuid, Path, description = "Route ID")),
    responses(
        (status = 200, description = "Liked", body = MessageResponse),
        (status = 400, description = "Already liked", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn like_route(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    visible_route(&state, id, Some(&user)).await?;
    if !state.repo.like_route(user.id, id).await? {
        return Err(AppError::bad_request("Route is already liked"));
    }
    Ok(Json(MessageResponse::new("Like added")))
}

#[utoipa::path(
    delete,
    path = "/routes/{id}/like",
    params(("id" = Uuid, Path, description = "Route ID")),
    responses(
        (status = 200, description = "Like removed", body = MessageResponse),
        (status = 400, description = "Not liked", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn unlike_route(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    existing_route(&state, id).await?;
    if !state.repo.unlike_route(user.id, id).await? {
        return Err(AppError::bad_request("Route is not liked"));
    }
    Ok(Json(MessageResponse::new("Like removed")))
}

#[utoipa::path(
    post,
    path = "/routes/{id}/favorite",
    params(("id" = Uuid, Path, description = "Route ID")),
    responses(
        (status = 200, description = "Added to favorites", body = MessageResponse),
        (status = 400, description = "Already a favorite", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn favorite_route(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    visible_route(&state, id, Some(&user)).await?;
    if !state.repo.favorite_route(user.id, id).await? {
        return Err(AppError::bad_request("Route is already in favorites"));
    }
    Ok(Json(MessageResponse::new("Route added to favorites")))
}

#[utoipa::path(
    delete,
    path = "/routes/{id}/favorite",
    params(("id" = Uuid, Path, description = "Route ID")),
    responses(
        (status = 200, description = "Removed from favorites", body = MessageResponse),
        (status = 400, description = "Not a favorite", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn unfavorite_route(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    existing_route(&state, id).await?;
    if !state.repo.unfavorite_route(user.id, id).await? {
        return Err(AppError::bad_request("Route is not in favorites"));
    }
    Ok(Json(MessageResponse::new("Route removed from favorites")))
}

/// publish_route
///
/// [Authenticated Route] Draft → Published. Every missing field is reported in
/// one 400 response.
#[utoipa::path(
    patch,
    path = "/routes/{id}/publish",
    params(("id" = Uuid, Path, description = "Route ID")),
    responses(
        (status = 200, description = "Published", body = Route),
        (status = 400, description = "Already published or incomplete", body = ErrorBody),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn publish_route(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Route>> {
    let route = existing_route(&state, id).await?;
    policy::ensure_can_edit_route(&user, route.creator_id)?;

    let waypoint_count = state.repo.list_waypoints(id).await?.len();
    let transition = lifecycle::publish(
        RouteState::of(&route),
        &PublishCandidate::from_route(&route, waypoint_count),
        user.id,
        user.role,
        Utc::now(),
    )?;

    let published = state
        .repo
        .apply_transition(id, transition)
        .await?
        .ok_or_else(|| AppError::not_found("Route not found"))?;
    tracing::info!(route_id = %id, actor = %user.id, "route published");
    Ok(Json(published))
}

/// route_to_draft
///
/// [Authenticated Route] Published → Draft.
#[utoipa::path(
    patch,
    path = "/routes/{id}/to_draft",
    params(("id" = Uuid, Path, description = "Route ID")),
    responses(
        (status = 200, description = "Moved to drafts", body = Route),
        (status = 400, description = "Already a draft", body = ErrorBody),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn route_to_draft(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Route>> {
    let route = existing_route(&state, id).await?;
    policy::ensure_can_edit_route(&user, route.creator_id)?;

    let transition = lifecycle::to_draft(RouteState::of(&route), user.id, user.role)?;

    let drafted = state
        .repo
        .apply_transition(id, transition)
        .await?
        .ok_or_else(|| AppError::not_found("Route not found"))?;
    tracing::info!(route_id = %id, actor = %user.id, "route moved to drafts");
    Ok(Json(drafted))
}
