use std::{convert::Infallible, time::Duration};

use axum::{
    Router,
    extract::State,
    response::{
        Json as ResponseJson,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use db::models::event_log::{EventFilter, EventLog};
use deployment::Deployment;
use futures::stream::{self, Stream, StreamExt};

use crate::{
    DeploymentImpl,
    error::{ApiError, AppQuery},
};

/// Recent events, newest first. `limit` defaults to 200 and is capped at 500.
pub async fn list_events(
    State(deployment): State<DeploymentImpl>,
    AppQuery(filter): AppQuery<EventFilter>,
) -> Result<ResponseJson<Vec<EventLog>>, ApiError> {
    let events = deployment.workflow().list_events(filter).await?;
    Ok(ResponseJson(events))
}

/// Live feed of committed events. Only events committed after the client
/// connects are sent; history comes from `list_events`. Dropping the
/// connection drops the subscription.
pub async fn stream_events(
    State(deployment): State<DeploymentImpl>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = deployment.events().subscribe();
    tracing::debug!(subscriber = subscription.id(), "Event stream opened");

    let hello = stream::once(async { Ok::<_, Infallible>(Event::default().comment("connected")) });
    let updates = subscription.filter_map(|event| async move {
        match Event::default().json_data(&event) {
            Ok(frame) => Some(Ok(frame)),
            Err(e) => {
                tracing::error!(event_id = %event.id, "Failed to encode event for stream: {}", e);
                None
            }
        }
    });

    Sse::new(hello.chain(updates)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    )
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/events", get(list_events))
        .route("/events/stream", get(stream_events))
}
