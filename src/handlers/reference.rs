//! Read-only lookup tables used to populate client forms.

use axum::{Json, extract::State};

use crate::{AppState, error::AppResult, models::ReferenceItem, repository::ReferenceTable};

async fn lookup(state: &AppState, table: ReferenceTable) -> AppResult<Json<Vec<ReferenceItem>>> {
    Ok(Json(state.repo.list_reference(table).await?))
}

#[utoipa::path(
    get,
    path = "/utils/route_types",
    responses((status = 200, description = "Route types", body = [ReferenceItem]))
)]
pub async fn route_types(State(state): State<AppState>) -> AppResult<Json<Vec<ReferenceItem>>> {
    lookup(&state, ReferenceTable::RouteTypes).await
}

#[utoipa::path(
    get,
    path = "/utils/difficulty_types",
    responses((status = 200, description = "Difficulty levels", body = [ReferenceItem]))
)]
pub async fn difficulty_types(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ReferenceItem>>> {
    lookup(&state, ReferenceTable::DifficultyTypes).await
}

#[utoipa::path(
    get,
    path = "/utils/target_types",
    responses((status = 200, description = "Commentable target types", body = [ReferenceItem]))
)]
pub async fn target_types(State(state): State<AppState>) -> AppResult<Json<Vec<ReferenceItem>>> {
    lookup(&state, ReferenceTable::TargetTypes).await
}

#[utoipa::path(
    get,
    path = "/utils/route_tags",
    responses((status = 200, description = "Route tags", body = [ReferenceItem]))
)]
pub async fn route_tags(State(state): State<AppState>) -> AppResult<Json<Vec<ReferenceItem>>> {
    lookup(&state, ReferenceTable::RouteTags).await
}
