use crate::metrics::MetricsSnapshot;
use crate::state::AppState;
use axum::{extract::State, Json};

pub async fn get_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.feed.metrics().snapshot())
}
