use crate::handlers::{changes, homes, lights, metrics, stream};
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/homes", get(homes::list_homes).post(homes::create_home))
        .route("/homes/reset", post(homes::reset_home))
        .route("/homes/{home_id}", get(homes::get_home).put(homes::update_home))
        .route("/homes/{home_id}/changes", get(changes::get_changes))
        .route("/homes/{home_id}/stream", get(stream::stream_home))
        .route("/homes/{home_id}/lights/{light_id}", put(lights::update_light))
        .route("/control/lights", post(lights::control_lights))
        .route(
            "/background/color",
            get(homes::get_background).post(homes::set_background),
        )
        .route("/metrics", get(metrics::get_metrics));

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
