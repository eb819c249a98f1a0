//! Shared helpers for driving the router in-process.

#![allow(dead_code)]

use std::time::Duration;

use axum::body::{Body, BodyDataStream};
use axum::http::{Request, StatusCode};
use axum::Router;
use change_feed::config::FeedConfig;
use change_feed::feed::ChangeFeed;
use change_feed::router::create_router;
use change_feed::state::AppState;
use change_feed::store::HomeStore;
use futures::StreamExt;
use serde_json::Value;
use tower::ServiceExt;
use types::home::{Floor, Home, Vector3};
use types::ids::HomeId;
use types::light::Light;

pub const HOME_ID: &str = "home-1";
pub const LIGHT_ID: &str = "light-a";

/// A home with one floor and a single light named "Lamp".
pub fn test_home() -> Home {
    let json = serde_json::json!({
        "id": HOME_ID,
        "name": "Test Home",
        "floors": [{
            "level": 0,
            "name": "Ground Floor",
            "lights": [{
                "id": LIGHT_ID,
                "name": "Lamp",
                "position": {"x": 1.0, "y": 2.4, "z": 1.0}
            }]
        }]
    });
    serde_json::from_value(json).unwrap()
}

pub fn test_state(config: FeedConfig) -> AppState {
    let homes = HomeStore::new();
    homes.create(test_home());
    AppState::new(ChangeFeed::new(config), homes)
}

pub fn default_state() -> AppState {
    test_state(FeedConfig::default())
}

pub fn app(state: &AppState) -> Router {
    create_router(state.clone())
}

pub fn extra_home(id: &str, light_name: &str) -> Home {
    let mut home = Home::new("Extra");
    home.id = HomeId::from(id);
    let mut floor = Floor::new(0, "Ground Floor");
    floor.lights.push(Light::new(light_name, Vector3::new(0.0, 2.0, 0.0)));
    home.floors.push(floor);
    home
}

pub async fn get(state: &AppState, uri: &str) -> (StatusCode, Value) {
    let response = app(state)
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read_json(response).await
}

pub async fn send_json(state: &AppState, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app(state).oneshot(request).await.unwrap();
    read_json(response).await
}

async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// One parsed SSE frame.
#[derive(Debug, Clone)]
pub struct SseFrame {
    pub id: Option<String>,
    pub event: Option<String>,
    pub data: Value,
}

impl SseFrame {
    pub fn id_num(&self) -> u64 {
        self.id.as_deref().unwrap().parse().unwrap()
    }

    pub fn name(&self) -> &str {
        self.event.as_deref().unwrap_or("message")
    }
}

/// Incremental reader over an SSE response body.
pub struct SseReader {
    stream: BodyDataStream,
    buffer: String,
}

impl SseReader {
    pub fn new(body: Body) -> Self {
        Self {
            stream: body.into_data_stream(),
            buffer: String::new(),
        }
    }

    /// Next complete frame, failing the test if none arrives within `wait`.
    pub async fn next_within(&mut self, wait: Duration) -> SseFrame {
        tokio::time::timeout(wait, self.next())
            .await
            .expect("timed out waiting for SSE frame")
    }

    pub async fn next(&mut self) -> SseFrame {
        loop {
            if let Some(pos) = self.buffer.find("\n\n") {
                let raw: String = self.buffer.drain(..pos + 2).collect();
                if let Some(frame) = parse_frame(&raw) {
                    return frame;
                }
                continue;
            }

            let chunk = self
                .stream
                .next()
                .await
                .expect("stream ended")
                .expect("body error");
            self.buffer.push_str(std::str::from_utf8(&chunk).unwrap());
        }
    }
}

fn parse_frame(raw: &str) -> Option<SseFrame> {
    let mut id = None;
    let mut event = None;
    let mut data = String::new();

    for line in raw.lines() {
        if let Some(v) = line.strip_prefix("id:") {
            id = Some(v.trim_start().to_string());
        } else if let Some(v) = line.strip_prefix("event:") {
            event = Some(v.trim_start().to_string());
        } else if let Some(v) = line.strip_prefix("data:") {
            data.push_str(v.trim_start());
        }
    }

    if id.is_none() && event.is_none() && data.is_empty() {
        return None;
    }
    Some(SseFrame {
        id,
        event,
        data: serde_json::from_str(&data).unwrap_or(Value::Null),
    })
}
