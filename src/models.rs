use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

// --- Enumerations (mapped to Postgres enum types) ---

/// UserRole
///
/// The RBAC field. Stored as the `user_role` enum in Postgres.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum UserRole {
    #[default]
    User,
    Moderator,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Moderator => "moderator",
            UserRole::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type)]
#[sqlx(type_name = "gender", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Gender {
    Male,
    Female,
}

/// WaypointType
///
/// Slot of a waypoint inside its route. `Isolated` points are attached to the
/// route but take no part in the start → finish sequence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "waypoint_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum WaypointType {
    Start,
    #[default]
    Intermediate,
    Finish,
    Isolated,
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Canonical account record from the `users` table. The password hash is never
/// serialized; handlers expose `UserInfo` / `UserInfoPublic` instead.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub login: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub gender: Option<Gender>,
    pub role: UserRole,
    pub age: Option<i32>,
    pub profile_picture: Option<String>,
    pub description: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub is_blocked: bool,
    pub block_reason: Option<String>,
    pub block_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// NewUser
///
/// Insert payload built by the registration handler once the password is hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub login: String,
    pub email: String,
    pub hashed_password: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Option<Gender>,
    pub age: Option<i32>,
    pub profile_picture: Option<String>,
    pub description: Option<String>,
}

/// Route
///
/// A travel route from the `routes` table. `is_public` is the lifecycle state
/// (false = draft); `published_at` is only set while published.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Route {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub route_type_id: Option<Uuid>,
    pub difficulty_id: Option<Uuid>,
    pub thumbnail_url: Option<String>,
    /// Duration in minutes.
    pub duration: Option<i32>,
    /// Distance in kilometres.
    pub distance: Option<f64>,
    pub avg_rating: f64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub edited_at: DateTime<Utc>,
    pub is_public: bool,
    #[ts(type = "string | null")]
    pub published_at: Option<DateTime<Utc>>,
    pub last_edited_by_id: Option<Uuid>,
    pub last_edited_by_role: Option<UserRole>,
    /// Route geometry as a WKT `LINESTRING`.
    pub geo_data: Option<String>,
}

/// Waypoint
///
/// A point of a route. `position` is `None` for isolated points.
/// The SQL columns are `position` and `waypoint_type`; JSON keeps the public
/// `order` / `type` names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Waypoint {
    pub id: Uuid,
    pub route_id: Uuid,
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "order")]
    pub position: Option<i32>,
    #[serde(rename = "type")]
    #[sqlx(rename = "waypoint_type")]
    pub kind: WaypointType,
    pub description: Option<String>,
    pub photo_url: Option<String>,
}

impl Waypoint {
    pub fn is_isolated(&self) -> bool {
        self.kind == WaypointType::Isolated
    }
}

/// Comment
///
/// Raw row of the `comments` table. The target is polymorphic: a target type
/// name (`route`, `post`, `news`) plus the target's id.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Comment {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub target_type: String,
    pub target_id: Uuid,
    pub comment_text: String,
    pub created_at: DateTime<Utc>,
}

/// ReferenceItem
///
/// A row of one of the lookup tables (route types, difficulties, target types, route tags).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct ReferenceItem {
    pub id: Uuid,
    pub name: String,
}

// --- Aggregated read models ---

/// RouteSummary
///
/// A route joined with its display names, engagement counters and the viewer's
/// like/favorite flags. Loaded in one query by the repository.
#[derive(Debug, Clone, FromRow, Default)]
pub struct RouteSummary {
    #[sqlx(flatten)]
    pub route: Route,
    pub creator_login: Option<String>,
    pub route_type_name: Option<String>,
    pub difficulty_name: Option<String>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub is_liked: bool,
    pub is_favorite: bool,
}

/// RouteCard
///
/// Compact listing entry used by every route collection endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct RouteCard {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub avg_rating: f64,
    pub likes_count: i64,
    pub comments_count: i64,
    pub is_favorite: bool,
    pub is_liked: bool,
    pub thumbnail_url: Option<String>,
    pub route_type_id: Option<Uuid>,
    pub route_type_name: Option<String>,
    pub difficulty_name: Option<String>,
}

/// RouteDetail
///
/// Full route view: the route itself, its waypoints and tags, counters, and the
/// policy flags computed for the viewing user.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RouteDetail {
    #[serde(flatten)]
    #[ts(flatten)]
    pub route: Route,
    pub waypoints: Vec<Waypoint>,
    pub tags: Vec<Uuid>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub is_liked: bool,
    pub is_favorite: bool,
    pub creator_login: Option<String>,
    pub route_type_name: Option<String>,
    pub difficulty_name: Option<String>,
    pub can_edit: bool,
    pub can_delete: bool,
}

/// CommentView
///
/// A comment enriched with its author's login/avatar, like count and whether the
/// viewer liked it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct CommentView {
    pub id: Uuid,
    pub comment_text: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub creator_login: String,
    pub creator_avatar: Option<String>,
    pub likes_count: i64,
    pub is_liked: bool,
}

// --- User-facing profile schemas ---

/// UserInfo
///
/// Detailed profile, returned to the owner and to administrators.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserInfo {
    pub id: Uuid,
    pub login: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Option<Gender>,
    pub age: Option<i32>,
    pub profile_picture: Option<String>,
    pub description: Option<String>,
    pub role: UserRole,
    #[ts(type = "string | null")]
    pub last_login: Option<DateTime<Utc>>,
    pub is_blocked: bool,
    pub block_reason: Option<String>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            login: user.login,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            gender: user.gender,
            age: user.age,
            profile_picture: user.profile_picture,
            description: user.description,
            role: user.role,
            last_login: user.last_login,
            is_blocked: user.is_blocked,
            block_reason: user.block_reason,
        }
    }
}

/// UserInfoPublic
///
/// What anyone may see about a user.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserInfoPublic {
    pub login: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: Option<String>,
    pub description: Option<String>,
}

impl From<User> for UserInfoPublic {
    fn from(user: User) -> Self {
        Self {
            login: user.login,
            first_name: user.first_name,
            last_name: user.last_name,
            profile_picture: user.profile_picture,
            description: user.description,
        }
    }
}

// --- Request Payloads (Input Schemas) ---

const MAX_COMMENT_LEN: usize = 2000;
const MAX_EMAIL_LEN: usize = 255;
const MAX_ROUTE_TEXT_LEN: usize = 255;
const DEFAULT_AVATAR: &str =
    "https://www.shutterstock.com/image-vector/blank-avatar-photo-place-holder-600nw-1095249842.jpg";

/// Logins are 3–50 characters of ASCII letters, digits, `-` and `_`.
pub fn validate_login(login: &str) -> AppResult<()> {
    let len = login.chars().count();
    if !(3..=50).contains(&len) {
        return Err(AppError::bad_request("Login must be between 3 and 50 characters"));
    }
    if !login
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::bad_request(
            "Login may contain only latin letters, digits, '-' and '_'",
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> AppResult<()> {
    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(AppError::bad_request(format!(
            "Email must be at most {MAX_EMAIL_LEN} characters"
        )));
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AppError::bad_request("Invalid email address"))
    }
}

fn validate_name(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() || value.chars().count() > 50 {
        return Err(AppError::bad_request(format!(
            "{field} must be between 1 and 50 characters"
        )));
    }
    Ok(())
}

fn validate_age(age: Option<i32>) -> AppResult<()> {
    match age {
        Some(age) if age < 0 => Err(AppError::bad_request("Age must not be negative")),
        _ => Ok(()),
    }
}

/// Route name and location share the column limit of the `routes` table.
fn validate_route_text(field: &str, value: &str) -> AppResult<()> {
    if value.chars().count() > MAX_ROUTE_TEXT_LEN {
        return Err(AppError::bad_request(format!(
            "{field} must be at most {MAX_ROUTE_TEXT_LEN} characters"
        )));
    }
    Ok(())
}

/// Accepts a WKT `LINESTRING` with at least two `lon lat` points.
pub fn validate_geo_data(wkt: &str) -> AppResult<()> {
    let invalid = || AppError::bad_request("geo_data must be a WKT LINESTRING");
    let wkt = wkt.trim();
    let body = wkt
        .get(..10)
        .filter(|head| head.eq_ignore_ascii_case("LINESTRING"))
        .and_then(|_| wkt[10..].trim_start().strip_prefix('('))
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(invalid)?;

    let mut points = 0;
    for point in body.split(',') {
        let coords: Vec<&str> = point.split_whitespace().collect();
        if !(2..=3).contains(&coords.len())
            || coords.iter().any(|c| !c.parse::<f64>().is_ok_and(f64::is_finite))
        {
            return Err(invalid());
        }
        points += 1;
    }
    if points < 2 {
        return Err(invalid());
    }
    Ok(())
}

/// RegisterRequest
///
/// Input payload for `POST /auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    #[schema(example = "hiker_42")]
    pub login: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl RegisterRequest {
    /// Checks field formats and lowercases login and email.
    /// Password strength is checked separately by `credentials`.
    pub fn normalize(mut self) -> AppResult<Self> {
        self.login = self.login.trim().to_lowercase();
        self.email = self.email.trim().to_lowercase();
        validate_login(&self.login)?;
        validate_email(&self.email)?;
        validate_name("First name", &self.first_name)?;
        validate_name("Last name", &self.last_name)?;
        validate_age(self.age)?;
        if self.profile_picture.is_none() {
            self.profile_picture = Some(DEFAULT_AVATAR.to_string());
        }
        Ok(self)
    }
}

/// LoginForm
///
/// OAuth2 password-flow form for `POST /auth/login`. `username` may be a login or an email.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RestorePasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// UpdateProfileRequest
///
/// Partial update of the caller's own profile. Login and role are not editable here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl UpdateProfileRequest {
    pub fn normalize(mut self) -> AppResult<Self> {
        if let Some(email) = self.email.take() {
            let email = email.trim().to_lowercase();
            validate_email(&email)?;
            self.email = Some(email);
        }
        if let Some(first_name) = &self.first_name {
            validate_name("First name", first_name)?;
        }
        if let Some(last_name) = &self.last_name {
            validate_name("Last name", last_name)?;
        }
        validate_age(self.age)?;
        Ok(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AvatarUrlRequest {
    pub profile_picture: String,
}

/// CreateWaypointRequest
///
/// `type = "isolated"` stores a free-standing point; any other value (or none)
/// appends the point to the route's start → finish sequence.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateWaypointRequest {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<WaypointType>,
}

fn validate_coordinates(lat: Option<f64>, lon: Option<f64>) -> AppResult<()> {
    if let Some(lat) = lat {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(AppError::bad_request("Latitude must be between -90 and 90"));
        }
    }
    if let Some(lon) = lon {
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(AppError::bad_request("Longitude must be between -180 and 180"));
        }
    }
    Ok(())
}

impl CreateWaypointRequest {
    pub fn is_isolated(&self) -> bool {
        self.kind == Some(WaypointType::Isolated)
    }

    pub fn validate(&self) -> AppResult<()> {
        validate_coordinates(Some(self.lat), Some(self.lon))
    }
}

/// UpdateWaypointRequest
///
/// Connected waypoints only accept `description` and `photo_url`; isolated ones
/// may also move (`lat`/`lon`).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateWaypointRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl UpdateWaypointRequest {
    pub fn validate(&self) -> AppResult<()> {
        validate_coordinates(self.lat, self.lon)
    }
}

/// CreateRouteRequest
///
/// Input payload for `POST /routes`. With `is_public = true` the route is
/// published immediately, provided it passes the publish checks.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateRouteRequest {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub route_type_id: Option<Uuid>,
    #[serde(default)]
    pub difficulty_id: Option<Uuid>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub duration: Option<i32>,
    #[serde(default)]
    pub distance: Option<f64>,
    /// WKT `LINESTRING(lon lat, ...)`.
    #[serde(default)]
    pub geo_data: Option<String>,
    #[serde(default)]
    pub tags: Vec<Uuid>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub waypoints: Vec<CreateWaypointRequest>,
}

impl CreateRouteRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::bad_request("Route name must not be empty"));
        }
        validate_route_text("Route name", &self.name)?;
        if let Some(location) = &self.location {
            validate_route_text("Location", location)?;
        }
        if let Some(geo_data) = &self.geo_data {
            validate_geo_data(geo_data)?;
        }
        self.waypoints.iter().try_for_each(CreateWaypointRequest::validate)
    }
}

/// UpdateRouteRequest
///
/// Partial update. `tags` and `waypoints`, when present, replace the existing
/// sets. Publication state is changed only through publish / to_draft.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateRouteRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_type_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waypoints: Option<Vec<CreateWaypointRequest>>,
}

impl UpdateRouteRequest {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(AppError::bad_request("Route name must not be empty"));
            }
            validate_route_text("Route name", name)?;
        }
        if let Some(location) = &self.location {
            validate_route_text("Location", location)?;
        }
        if let Some(geo_data) = &self.geo_data {
            validate_geo_data(geo_data)?;
        }
        match &self.waypoints {
            Some(waypoints) => waypoints.iter().try_for_each(CreateWaypointRequest::validate),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    pub comment_text: String,
}

impl CreateCommentRequest {
    /// Returns the trimmed text, rejecting empty or over-long comments.
    pub fn cleaned_text(&self) -> AppResult<String> {
        let text = self.comment_text.trim();
        let len = text.chars().count();
        if len == 0 {
            return Err(AppError::bad_request("Comment must not be empty"));
        }
        if len > MAX_COMMENT_LEN {
            return Err(AppError::bad_request(format!(
                "Comment must be at most {MAX_COMMENT_LEN} characters"
            )));
        }
        Ok(text.to_string())
    }
}

// --- Admin Payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ToggleUserStatusRequest {
    /// Login or email of the target account.
    pub login: String,
    pub block_user: bool,
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SetUserRoleRequest {
    pub login: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ResetUserPasswordRequest {
    pub login: String,
    pub new_password: String,
}

// --- Generic responses and query parameters ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Pagination
///
/// `skip`/`limit` query parameters. Each endpoint clamps `limit` to its own ceiling.
#[derive(Debug, Clone, Copy, Deserialize, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    /// Returns `(offset, limit)` with `limit` defaulted and clamped to `1..=max`.
    pub fn resolve(&self, default_limit: i64, max_limit: i64) -> (i64, i64) {
        let skip = self.skip.unwrap_or(0).max(0);
        let limit = self.limit.unwrap_or(default_limit).clamp(1, max_limit);
        (skip, limit)
    }
}

/// RouteOrdering
///
/// Sort order of the public route listing. Without one, newest routes come first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RouteOrdering {
    Rating,
    Recent,
}

/// RouteFilter
///
/// Query parameters of `GET /routes`.
#[derive(Debug, Clone, Deserialize, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct RouteFilter {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    /// Case-insensitive substring of the route name.
    pub search: Option<String>,
    pub route_type_id: Option<Uuid>,
    pub difficulty_id: Option<Uuid>,
    /// Case-insensitive substring of the location.
    pub location: Option<String>,
    #[param(value_type = Option<String>)]
    pub ordering: Option<RouteOrdering>,
}

impl RouteFilter {
    pub fn page(&self) -> (i64, i64) {
        Pagination {
            skip: self.skip,
            limit: self.limit,
        }
        .resolve(20, 100)
    }
}

/// IdentifierQuery
///
/// `?identifier=` query used by the admin lookups (login or email).
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IdentifierQuery {
    pub identifier: String,
}
