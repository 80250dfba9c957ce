use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    middleware::Owner,
    models::{Category, Counts, EntryKey, Page, Snapshot},
    services::PageRequest,
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    search: Option<String>,
    category: Option<String>,
    cursor: Option<String>,
    page_size: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CountsQuery {
    search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub category: Category,
    pub external_id: i64,
    #[serde(flatten)]
    pub snapshot: Snapshot,
}

#[derive(Debug, Serialize)]
pub struct PresenceResponse {
    pub present: bool,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub removed: u64,
}

/// One page of the caller's watchlist, newest first
pub async fn list(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Query(params): Query<ListQuery>,
) -> AppResult<Json<Page>> {
    let request = PageRequest {
        search: params.search,
        category: Category::parse_filter(params.category.as_deref())?,
        cursor: params.cursor.filter(|c| !c.is_empty()),
        page_size: state.watchlist.resolve_page_size(params.page_size)?,
    };

    let page = state.watchlist.query(&owner, &request).await?;
    Ok(Json(page))
}

/// Per-category counts, restricted by search and unrestricted
pub async fn counts(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Query(params): Query<CountsQuery>,
) -> AppResult<Json<Counts>> {
    let counts = state
        .watchlist
        .counts(&owner, params.search.as_deref())
        .await?;
    Ok(Json(counts))
}

pub async fn toggle(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Json(request): Json<ToggleRequest>,
) -> AppResult<Json<PresenceResponse>> {
    let key = EntryKey::new(request.category, request.external_id);
    let present = state.watchlist.toggle(&owner, key, request.snapshot).await?;
    Ok(Json(PresenceResponse { present }))
}

pub async fn contains(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path((category, external_id)): Path<(String, i64)>,
) -> AppResult<Json<PresenceResponse>> {
    let key = EntryKey::new(category.parse()?, external_id);
    let present = state.watchlist.contains(&owner, key).await?;
    Ok(Json(PresenceResponse { present }))
}

pub async fn clear(
    State(state): State<AppState>,
    Owner(owner): Owner,
) -> AppResult<Json<ClearResponse>> {
    let removed = state.watchlist.clear(&owner).await?;
    Ok(Json(ClearResponse { removed }))
}
