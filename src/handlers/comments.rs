use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use super::visible_route;
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult, ErrorBody},
    models::{CommentView, CreateCommentRequest, MessageResponse, UserRole},
    policy,
};

const ROUTE_TARGET: &str = "route";

async fn ensure_target_type(state: &AppState, target_type: &str) -> AppResult<()> {
    if state.repo.target_type_exists(target_type).await? {
        Ok(())
    } else {
        Err(AppError::bad_request(format!("Unknown target type '{target_type}'")))
    }
}

/// list_comments
///
/// [Public Route] Comments on a target, oldest first. With a valid token each
/// comment says whether the caller liked it. Route threads follow the route's
/// visibility.
#[utoipa::path(
    get,
    path = "/comments/{target_type}/{target_id}",
    params(
        ("target_type" = String, Path, description = "route, post or news"),
        ("target_id" = Uuid, Path, description = "Target ID")
    ),
    responses(
        (status = 200, description = "Comments", body = [CommentView]),
        (status = 400, description = "Unknown target type", body = ErrorBody),
        (status = 404, description = "Route not found", body = ErrorBody)
    )
)]
pub async fn list_comments(
    viewer: Option<AuthUser>,
    State(state): State<AppState>,
    Path((target_type, target_id)): Path<(String, Uuid)>,
) -> AppResult<Json<Vec<CommentView>>> {
    ensure_target_type(&state, &target_type).await?;
    if target_type == ROUTE_TARGET {
        visible_route(&state, target_id, viewer.as_ref()).await?;
    }
    let comments = state
        .repo
        .list_comments(&target_type, target_id, viewer.map(|v| v.id))
        .await?;
    Ok(Json(comments))
}

/// create_comment
///
/// [Authenticated Route] Comments on routes require the route to exist and be
/// visible to the caller.
#[utoipa::path(
    post,
    path = "/comments/{target_type}/{target_id}",
    params(
        ("target_type" = String, Path, description = "route, post or news"),
        ("target_id" = Uuid, Path, description = "Target ID")
    ),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Created", body = CommentView),
        (status = 400, description = "Unknown target type or invalid text", body = ErrorBody),
        (status = 404, description = "Route not found", body = ErrorBody)
    )
)]
pub async fn create_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path((target_type, target_id)): Path<(String, Uuid)>,
    Json(payload): Json<CreateCommentRequest>,
) -> AppResult<(StatusCode, Json<CommentView>)> {
    ensure_target_type(&state, &target_type).await?;
    let text = payload.cleaned_text()?;

    if target_type == ROUTE_TARGET {
        visible_route(&state, target_id, Some(&user)).await?;
    }

    let comment = state
        .repo
        .create_comment(user.id, &target_type, target_id, &text)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// delete_comment
///
/// [Authenticated Route] Authors delete their own comments. Admins may delete
/// any comment except another admin's; moderators only plain users' comments.
#[utoipa::path(
    delete,
    path = "/comments/{id}",
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let comment = state
        .repo
        .get_comment(id)
        .await?
        .ok_or_else(|| AppError::not_found("Comment not found"))?;

    // Authors are removed together with their comments, so a missing author
    // can only be a race with account deletion.
    let author_role = state
        .repo
        .get_user(comment.creator_id)
        .await?
        .map(|author| author.role)
        .unwrap_or(UserRole::User);
    policy::ensure_can_delete_comment(&user, comment.creator_id, author_role)?;

    if state.repo.delete_comment(id).await? {
        tracing::info!(comment_id = %id, actor = %user.id, "comment deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Comment not found"))
    }
}

#[utoipa::path(
    post,
    path = "/comments/{id}/like",
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Liked", body = MessageResponse),
        (status = 400, description = "Already liked", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn like_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state
        .repo
        .get_comment(id)
        .await?
        .ok_or_else(|| AppError::not_found("Comment not found"))?;
    if !state.repo.like_comment(user.id, id).await? {
        return Err(AppError::bad_request("Comment is already liked"));
    }
    Ok(Json(MessageResponse::new("Like added")))
}

#[utoipa::path(
    delete,
    path = "/comments/{id}/like",
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Like removed", body = MessageResponse),
        (status = 400, description = "Not liked", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn unlike_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state
        .repo
        .get_comment(id)
        .await?
        .ok_or_else(|| AppError::not_found("Comment not found"))?;
    if !state.repo.unlike_comment(user.id, id).await? {
        return Err(AppError::bad_request("Comment is not liked"));
    }
    Ok(Json(MessageResponse::new("Like removed")))
}
