use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    auth::AuthUser,
    credentials,
    error::{AppError, AppResult, ErrorBody},
    models::{
        IdentifierQuery, MessageResponse, Pagination, ResetUserPasswordRequest,
        SetUserRoleRequest, ToggleUserStatusRequest, User, UserInfo,
    },
    policy::{self, AccountAction},
};

async fn target_account(state: &AppState, identifier: &str) -> AppResult<User> {
    state
        .repo
        .find_user(identifier.trim())
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

/// toggle_user_active
///
/// [Admin Route] Blocks or unblocks an account. Blocking requires a reason;
/// unblocking clears it.
#[utoipa::path(
    post,
    path = "/admin/toggle_user_active",
    request_body = ToggleUserStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = UserInfo),
        (status = 400, description = "Missing block reason", body = ErrorBody),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody)
    )
)]
pub async fn toggle_user_active(
    admin: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ToggleUserStatusRequest>,
) -> AppResult<Json<UserInfo>> {
    policy::ensure_admin(&admin)?;
    let target = target_account(&state, &payload.login).await?;
    policy::ensure_can_manage_account(&admin, &target, AccountAction::ToggleBlock)?;

    let reason = if payload.block_user {
        let reason = payload
            .block_reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| AppError::bad_request("A reason is required to block a user"))?;
        Some(reason.to_string())
    } else {
        None
    };

    let user = state
        .repo
        .set_block_status(target.id, payload.block_user, reason)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    tracing::info!(
        admin = %admin.id,
        target = %user.id,
        blocked = user.is_blocked,
        "account status changed"
    );
    Ok(Json(user.into()))
}

/// set_user_role
///
/// [Admin Route] Assigns a role. Re-assigning the current role is rejected.
#[utoipa::path(
    post,
    path = "/admin/set_user_role",
    request_body = SetUserRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = UserInfo),
        (status = 400, description = "Role already assigned", body = ErrorBody),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody)
    )
)]
pub async fn set_user_role(
    admin: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<SetUserRoleRequest>,
) -> AppResult<Json<UserInfo>> {
    policy::ensure_admin(&admin)?;
    let target = target_account(&state, &payload.login).await?;
    policy::ensure_can_manage_account(&admin, &target, AccountAction::ChangeRole)?;

    if target.role == payload.role {
        return Err(AppError::bad_request(format!(
            "User already has the role '{}'",
            payload.role.as_str()
        )));
    }

    let user = state
        .repo
        .set_role(target.id, payload.role)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    tracing::info!(admin = %admin.id, target = %user.id, role = user.role.as_str(), "role changed");
    Ok(Json(user.into()))
}

/// reset_user_password
///
/// [Admin Route] Overwrites the password of a non-admin account.
#[utoipa::path(
    post,
    path = "/admin/reset_user_password",
    request_body = ResetUserPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Weak or unchanged password", body = ErrorBody),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody)
    )
)]
pub async fn reset_user_password(
    admin: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ResetUserPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    policy::ensure_admin(&admin)?;
    let target = target_account(&state, &payload.login).await?;
    policy::ensure_can_manage_account(&admin, &target, AccountAction::ResetPassword)?;

    credentials::check_password_strength(&payload.new_password)?;
    if credentials::verify_password(&payload.new_password, &target.hashed_password).await? {
        return Err(AppError::bad_request(
            "New password must differ from the current one",
        ));
    }

    let hashed =
        credentials::hash_password(&payload.new_password, state.config.password_hash_cost).await?;
    state.repo.set_password_hash(target.id, &hashed).await?;

    tracing::info!(admin = %admin.id, target = %target.id, "password reset by admin");
    Ok(Json(MessageResponse::new(format!(
        "Password of '{}' has been reset",
        target.login
    ))))
}

/// delete_user
///
/// [Admin Route] Removes a non-admin account together with its routes and comments.
#[utoipa::path(
    delete,
    path = "/admin/delete_user",
    params(IdentifierQuery),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody)
    )
)]
pub async fn delete_user(
    admin: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<IdentifierQuery>,
) -> AppResult<StatusCode> {
    policy::ensure_admin(&admin)?;
    let target = target_account(&state, &query.identifier).await?;
    policy::ensure_can_manage_account(&admin, &target, AccountAction::Delete)?;

    if !state.repo.delete_user(target.id).await? {
        return Err(AppError::not_found("User not found"));
    }
    tracing::info!(admin = %admin.id, target = %target.id, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// get_user_info
///
/// [Admin Route] Full account details, including block status and reason.
#[utoipa::path(
    get,
    path = "/admin/get_user_info",
    params(IdentifierQuery),
    responses(
        (status = 200, description = "Account", body = UserInfo),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody)
    )
)]
pub async fn get_user_info(
    admin: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<IdentifierQuery>,
) -> AppResult<Json<UserInfo>> {
    policy::ensure_admin(&admin)?;
    let user = target_account(&state, &query.identifier).await?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    get,
    path = "/admin/get_users_list",
    params(Pagination),
    responses(
        (status = 200, description = "Accounts", body = [UserInfo]),
        (status = 403, description = "Not allowed", body = ErrorBody)
    )
)]
pub async fn get_users_list(
    admin: AuthUser,
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<UserInfo>>> {
    policy::ensure_admin(&admin)?;
    let (skip, limit) = page.resolve(100, 100);
    let users = state.repo.list_users(skip, limit).await?;
    Ok(Json(users.into_iter().map(UserInfo::from).collect()))
}
