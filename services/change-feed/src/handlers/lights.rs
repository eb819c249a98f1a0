use crate::error::AppError;
use crate::events::{kind, Payload};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::debug;
use types::ids::{HomeId, LightId};
use types::light::{Light, LightControlCommand, LightState, LightSummary};

#[derive(Debug, Clone, Serialize)]
pub struct ControlLightsResponse {
    pub status: &'static str,
    pub updated_lights: usize,
}

fn lights_payload(lights: &[LightSummary]) -> Result<Payload, AppError> {
    let mut payload = Payload::new();
    payload.insert(
        "lights".to_string(),
        serde_json::to_value(lights).map_err(anyhow::Error::from)?,
    );
    Ok(payload)
}

/// Set the state of one light and publish `lights_changed`.
pub async fn update_light(
    State(state): State<AppState>,
    Path((home_id, light_id)): Path<(HomeId, LightId)>,
    Json(light_state): Json<LightState>,
) -> Result<Json<Light>, AppError> {
    let light = state
        .homes
        .update_light(&home_id, &light_id, light_state, |light| {
            let payload = lights_payload(&[light.summary()])?;
            state
                .feed
                .publish(home_id.as_str(), kind::LIGHTS_CHANGED, payload);
            Ok::<_, AppError>(light.clone())
        })?;

    Ok(Json(light))
}

/// Batch control by light name, one `lights_changed` per affected home.
pub async fn control_lights(
    State(state): State<AppState>,
    Json(commands): Json<Vec<LightControlCommand>>,
) -> Result<Json<ControlLightsResponse>, AppError> {
    let outcome = state.homes.apply_light_commands(&commands, |home_id, lights| {
        let payload = lights_payload(lights)?;
        state
            .feed
            .publish(home_id.as_str(), kind::LIGHTS_CHANGED, payload);
        Ok::<_, AppError>(())
    })?;
    debug!(
        commands = commands.len(),
        updated = outcome.updated,
        homes = outcome.changed.len(),
        "Applied light commands"
    );

    Ok(Json(ControlLightsResponse {
        status: "success",
        updated_lights: outcome.updated,
    }))
}
