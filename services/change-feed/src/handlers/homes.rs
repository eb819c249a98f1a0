use crate::error::AppError;
use crate::events::{kind, Payload};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use types::home::Home;
use types::ids::HomeId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundColor {
    pub background_color: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackgroundColorCommand {
    /// Hex color like "#222222"
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackgroundColorResponse {
    pub status: &'static str,
    pub background_color: String,
}

pub async fn list_homes(State(state): State<AppState>) -> Json<Vec<Home>> {
    Json(state.homes.list())
}

pub async fn get_home(
    State(state): State<AppState>,
    Path(home_id): Path<HomeId>,
) -> Result<Json<Home>, AppError> {
    Ok(Json(state.homes.get(&home_id)?))
}

pub async fn create_home(State(state): State<AppState>, Json(home): Json<Home>) -> Json<Home> {
    Json(state.homes.create(home))
}

pub async fn reset_home(State(state): State<AppState>) -> Json<Home> {
    Json(state.homes.reset())
}

/// Replace a whole home. Observers are told to refetch it.
pub async fn update_home(
    State(state): State<AppState>,
    Path(home_id): Path<HomeId>,
    Json(home): Json<Home>,
) -> Json<Home> {
    let home = state.homes.replace(&home_id, home, |home| {
        let mut payload = Payload::new();
        payload.insert("name".to_string(), Value::String(home.name.clone()));
        state
            .feed
            .publish(home_id.as_str(), kind::HOME_UPDATED, payload);
        home.clone()
    });

    Json(home)
}

pub async fn get_background(State(state): State<AppState>) -> Json<BackgroundColor> {
    Json(BackgroundColor {
        background_color: state.homes.background(),
    })
}

/// Set the background of the active home.
pub async fn set_background(
    State(state): State<AppState>,
    Json(cmd): Json<BackgroundColorCommand>,
) -> Result<Json<BackgroundColorResponse>, AppError> {
    state.homes.set_background(&cmd.color, |home_id| {
        let mut payload = Payload::new();
        payload.insert("background_color".to_string(), Value::String(cmd.color.clone()));
        state
            .feed
            .publish(home_id.as_str(), kind::BACKGROUND_CHANGED, payload);
        Ok::<_, AppError>(())
    })?;

    Ok(Json(BackgroundColorResponse {
        status: "success",
        background_color: cmd.color,
    }))
}
