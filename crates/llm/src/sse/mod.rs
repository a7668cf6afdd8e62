pub(crate) mod parser;

use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt, stream};

use crate::{error::BackendError, provider::ChatCompletionStream};

const DONE: &str = "[DONE]";

enum RelayState {
    Streaming { events: ChatCompletionStream, done_relayed: bool },
    Finished,
}

/// Convert a backend event stream to Server-Sent Events.
///
/// Events are sent in arrival order. When the backend closes the stream a `[DONE]` event is
/// appended, unless the backend already sent one. A read error is sent as a final
/// `{"error": ...}` event and ends the stream.
pub(crate) fn events_to_sse(events: ChatCompletionStream) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let state = RelayState::Streaming {
        events,
        done_relayed: false,
    };

    let event_stream = stream::unfold(state, |state| async move {
        let RelayState::Streaming {
            mut events,
            done_relayed,
        } = state
        else {
            return None;
        };

        match events.next().await {
            Some(Ok(event)) => {
                let data = event.into_data();
                let done_relayed = done_relayed || data.trim() == DONE;

                Some((
                    Ok(Event::default().data(data)),
                    RelayState::Streaming { events, done_relayed },
                ))
            }
            Some(Err(e)) => {
                log::error!("Stream error: {e}");
                Some((Ok(error_event(&e)), RelayState::Finished))
            }
            None if done_relayed => None,
            None => Some((Ok(Event::default().data(DONE)), RelayState::Finished)),
        }
    });

    // Keep-alive comments stop proxies from closing idle connections during slow generations.
    Sse::new(event_stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(30)))
}

fn error_event(error: &BackendError) -> Event {
    let data = serde_json::json!({ "error": error.to_string() });
    Event::default().data(data.to_string())
}
