use crate::error::AppError;
use crate::handlers::changes::SinceQuery;
use crate::session::{resolve_since, StreamSession, WireFrame};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderName},
    response::{
        sse::{Event, Sse},
        IntoResponse,
    },
};
use futures::stream::{self, Stream};
use types::ids::HomeId;

/// Standard SSE resume header carrying the last id the client received.
pub const LAST_EVENT_ID: &str = "last-event-id";

/// Open a live change stream for one home.
///
/// The session lives inside the response stream: when the client goes away
/// axum drops the stream, which closes the session and unregisters its
/// mailbox.
pub async fn stream_home(
    State(state): State<AppState>,
    Path(home_id): Path<HomeId>,
    Query(query): Query<SinceQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    state.homes.require(&home_id)?;

    let resume_token = headers.get(LAST_EVENT_ID).and_then(|v| v.to_str().ok());
    let since = resolve_since(query.since, resume_token);
    let session = StreamSession::open(&state.feed, home_id.as_str(), since);

    let response_headers = [
        (header::CACHE_CONTROL, "no-cache"),
        (HeaderName::from_static("x-accel-buffering"), "no"),
    ];
    Ok((response_headers, Sse::new(frames(session))))
}

fn frames(session: StreamSession) -> impl Stream<Item = Result<Event, axum::Error>> {
    stream::unfold(session, |mut session| async move {
        let frame = session.next_frame().await?;
        Some((to_sse_event(frame), session))
    })
}

fn to_sse_event(frame: WireFrame) -> Result<Event, axum::Error> {
    Event::default()
        .id(frame.id.to_string())
        .event(frame.name)
        .json_data(&frame.data)
}
