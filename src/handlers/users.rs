use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult, ErrorBody},
    models::{AvatarUrlRequest, Pagination, UpdateProfileRequest, UserInfo, UserInfoPublic},
};

const AVATAR_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// AvatarUpload
///
/// OpenAPI description of the multipart avatar form.
#[derive(ToSchema)]
pub struct AvatarUpload {
    #[schema(format = Binary)]
    pub file: String,
}

/// Lowercased extension of an allowed image file name, if any.
pub fn avatar_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    AVATAR_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "png" => "image/png",
        "gif" => "image/gif",
        _ => "image/jpeg",
    }
}

/// get_me
///
/// [Authenticated Route] Full profile of the caller.
#[utoipa::path(
    get,
    path = "/users/me",
    responses((status = 200, description = "Profile", body = UserInfo))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<UserInfo>> {
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(user.into()))
}

/// update_me
///
/// [Authenticated Route] Partial profile update. A changed email must still be unique.
#[utoipa::path(
    put,
    path = "/users/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserInfo),
        (status = 400, description = "Invalid payload or email taken", body = ErrorBody)
    )
)]
pub async fn update_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<UserInfo>> {
    let payload = payload.normalize()?;
    if let Some(email) = &payload.email {
        if state.repo.email_taken(email, Some(id)).await? {
            return Err(AppError::bad_request("Email is already registered"));
        }
    }

    let user = state
        .repo
        .update_profile(id, payload)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(user.into()))
}

/// upload_avatar_file
///
/// [Authenticated Route] Accepts a multipart `file` (jpg, jpeg, png or gif),
/// stores it in object storage and points the profile picture at it.
#[utoipa::path(
    post,
    path = "/users/me/avatar_file",
    request_body(content = AvatarUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Avatar stored", body = UserInfo),
        (status = 400, description = "Missing file or unsupported extension", body = ErrorBody)
    )
)]
pub async fn upload_avatar_file(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<UserInfo>> {
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let ext = field
            .file_name()
            .and_then(avatar_extension)
            .ok_or_else(|| AppError::bad_request("Only .jpg, .jpeg, .png and .gif files are allowed"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::bad_request(format!("Failed to read upload: {e}")))?;
        if bytes.is_empty() {
            return Err(AppError::bad_request("Uploaded file is empty"));
        }

        let key = format!("avatars/{}_{}.{}", user.login, Uuid::new_v4().simple(), ext);
        let url = state
            .storage
            .put_object(&key, bytes.to_vec(), content_type_for(&ext))
            .await?;

        let updated = state
            .repo
            .set_profile_picture(id, &url)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;
        return Ok(Json(updated.into()));
    }

    Err(AppError::bad_request("Multipart field `file` is required"))
}

/// set_avatar_url
///
/// [Authenticated Route] Points the profile picture at an external URL.
#[utoipa::path(
    post,
    path = "/users/me/avatar",
    request_body = AvatarUrlRequest,
    responses(
        (status = 200, description = "Avatar updated", body = UserInfo),
        (status = 400, description = "Not an http(s) URL", body = ErrorBody)
    )
)]
pub async fn set_avatar_url(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<AvatarUrlRequest>,
) -> AppResult<Json<UserInfo>> {
    let url = payload.profile_picture.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(AppError::bad_request("Profile picture must be an http(s) URL"));
    }

    let user = state
        .repo
        .set_profile_picture(id, url)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(user.into()))
}

/// get_user_profile
///
/// [Public Route] Public profile by login or email.
#[utoipa::path(
    get,
    path = "/users/{identifier}",
    params(("identifier" = String, Path, description = "Login or email")),
    responses(
        (status = 200, description = "Public profile", body = UserInfoPublic),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_user_profile(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> AppResult<Json<UserInfoPublic>> {
    let user = state
        .repo
        .find_user(&identifier)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(user.into()))
}

/// list_users
///
/// [Public Route] Paginated public profiles (`limit` 1..=100, default 50).
#[utoipa::path(
    get,
    path = "/users",
    params(Pagination),
    responses((status = 200, description = "Users", body = [UserInfoPublic]))
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<UserInfoPublic>>> {
    let (skip, limit) = page.resolve(50, 100);
    let users = state.repo.list_users(skip, limit).await?;
    Ok(Json(users.into_iter().map(UserInfoPublic::from).collect()))
}
