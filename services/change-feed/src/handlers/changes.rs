use crate::error::AppError;
use crate::events::{ChangeEvent, Version};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use types::ids::HomeId;

/// `?since=<version>`; absent means "from the beginning".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SinceQuery {
    pub since: Option<Version>,
}

#[derive(Debug, Serialize)]
pub struct ChangesResponse {
    pub home_id: HomeId,
    pub since: Version,
    pub current_version: Version,
    pub resync_required: bool,
    pub events: Vec<Arc<ChangeEvent>>,
}

/// Polling alternative to the stream: everything after `since`, or a resync flag.
pub async fn get_changes(
    State(state): State<AppState>,
    Path(home_id): Path<HomeId>,
    Query(query): Query<SinceQuery>,
) -> Result<Json<ChangesResponse>, AppError> {
    state.homes.require(&home_id)?;

    let since = query.since.unwrap_or(0);
    let changes = state.feed.changes_since(home_id.as_str(), since);

    Ok(Json(ChangesResponse {
        home_id,
        since,
        current_version: changes.current_version,
        resync_required: changes.resync_required,
        events: changes.events,
    }))
}
