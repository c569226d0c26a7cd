//! Background task for one chat exchange.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info_span, warn, Instrument};

use crate::backend::{Backend, ChatRequest};
use crate::stream::fragments;
use crate::ChatError;

use super::events::ClientEvent;

/// Issue the request and forward fragments until the stream ends. Always
/// finishes with a `Finished` event, also when the task itself dies.
pub(super) fn spawn_exchange(
    backend: Arc<dyn Backend>,
    request: ChatRequest,
    exchange: u64,
    correlation: String,
    events: mpsc::UnboundedSender<ClientEvent>,
) {
    let span = info_span!("exchange", id = %correlation, session = %request.session_id);
    let task_events = events.clone();
    let handle = tokio::spawn(
        async move {
            let outcome = run_exchange(backend.as_ref(), &request, exchange, &task_events).await;
            match &outcome {
                Ok(()) => debug!("exchange completed"),
                Err(e) => debug!(error = %e, "exchange failed"),
            }
            let _ = task_events.send(ClientEvent::Finished { exchange, outcome });
        }
        .instrument(span.clone()),
    );

    tokio::spawn(
        async move {
            if let Err(e) = handle.await {
                warn!(error = %e, "exchange task died");
                let outcome = Err(ChatError::Connectivity(format!("exchange task died: {e}")));
                let _ = events.send(ClientEvent::Finished { exchange, outcome });
            }
        }
        .instrument(span),
    );
}

async fn run_exchange(
    backend: &dyn Backend,
    request: &ChatRequest,
    exchange: u64,
    events: &mpsc::UnboundedSender<ClientEvent>,
) -> Result<(), ChatError> {
    let body = backend.stream_chat(request).await?;
    let mut fragments = fragments(body);

    while let Some(fragment) = fragments.next().await {
        let fragment = fragment?;
        if events
            .send(ClientEvent::Fragment { exchange, fragment })
            .is_err()
        {
            debug!("client dropped, abandoning stream");
            break;
        }
    }
    Ok(())
}
