//! services/api/src/web/stream.rs
//!
//! Server-sent events carrying the caller's lists after every change.
//! A connection holds one list subscription; closing it ends the subscription.
//! A client that reads slowly skips to the newest lists instead of queueing
//! every intermediate snapshot.

use crate::error::reject;
use crate::web::middleware::UserId;
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Extension,
};
use futures::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Streams `lists` events: the current lists first, then the lists after each write.
#[utoipa::path(
    get,
    path = "/lists/stream",
    responses(
        (
            status = 200,
            description = "Server-sent `lists` events carrying UserLists",
            content_type = "text/event-stream"
        ),
        (status = 401, description = "Missing x-user-id header")
    ),
    params(("x-user-id" = String, Header, description = "The identity provider's uid."))
)]
pub async fn list_stream_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserId>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, String)> {
    let (tx, mut rx) = watch::channel(None);
    let subscription = state
        .lists
        .subscribe(user.as_str(), move |update| {
            tx.send_replace(Some(update.map_err(|e| e.to_string())));
        })
        .await
        .map_err(|e| reject("subscribe to lists", e))?;
    info!(user_id = user.as_str(), "List stream opened");

    let stream = async_stream::stream! {
        // Dropped together with the stream when the client disconnects.
        let _subscription = subscription;
        while rx.changed().await.is_ok() {
            let Some(update) = rx.borrow_and_update().clone() else {
                continue;
            };
            match update {
                Ok(lists) => match Event::default().event("lists").json_data(&lists) {
                    Ok(event) => yield Ok::<Event, Infallible>(event),
                    Err(e) => error!("Failed to encode list snapshot: {:?}", e),
                },
                Err(e) => {
                    warn!("List snapshot failed: {}", e);
                    yield Ok(Event::default().event("error").data(e));
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
