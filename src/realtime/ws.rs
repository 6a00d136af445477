use crate::domain::{ObserverId, SubscriptionRegistry};
use crate::http::AppState;
use crate::realtime::ObserverHub;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Inbound control frame: sets or replaces the observer's category filter.
#[derive(Debug, Deserialize)]
struct SubscribeFrame {
    subscribe: String,
}

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let registry = Arc::clone(&state.registry);
    let hub = Arc::clone(&state.hub);
    ws.on_upgrade(move |socket| handle_connection(socket, registry, hub))
}

/// Drive one observer connection: register on connect, apply subscribe
/// frames, forward outbound frames, deregister on disconnect.
async fn handle_connection(
    socket: WebSocket,
    registry: Arc<SubscriptionRegistry>,
    hub: Arc<ObserverHub>,
) {
    let observer = ObserverId::new();
    registry.register(observer);
    let mut outbound = hub.attach(observer);

    info!(observer = %observer, "observer connected");

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            frame = outbound.recv() => {
                match frame {
                    Some(text) => {
                        if sink.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_frame(&registry, &observer, &text);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // Ping/pong/binary frames carry no subscription state.
                    }
                    Some(Err(e)) => {
                        debug!(observer = %observer, error = %e, "websocket error");
                        break;
                    }
                }
            }
        }
    }

    hub.detach(&observer);
    registry.remove(&observer);
    info!(observer = %observer, "observer disconnected");
}

fn handle_client_frame(registry: &SubscriptionRegistry, observer: &ObserverId, text: &str) {
    match serde_json::from_str::<SubscribeFrame>(text) {
        Ok(frame) => {
            debug!(observer = %observer, category = %frame.subscribe, "filter set");
            registry.set_filter(*observer, frame.subscribe);
        }
        Err(e) => {
            warn!(observer = %observer, error = %e, "unrecognized client frame");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_frame_sets_filter() {
        let registry = SubscriptionRegistry::new();
        let observer = ObserverId::new();
        registry.register(observer);

        handle_client_frame(&registry, &observer, r#"{"subscribe":"glass"}"#);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot[0].1.as_deref(), Some("glass"));
    }

    #[test]
    fn test_subscribe_frame_replaces_filter() {
        let registry = SubscriptionRegistry::new();
        let observer = ObserverId::new();
        registry.register(observer);

        handle_client_frame(&registry, &observer, r#"{"subscribe":"glass"}"#);
        handle_client_frame(&registry, &observer, r#"{"subscribe":"plastic"}"#);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].1.as_deref(), Some("plastic"));
    }

    #[test]
    fn test_malformed_frame_leaves_filter_unchanged() {
        let registry = SubscriptionRegistry::new();
        let observer = ObserverId::new();
        registry.register(observer);

        handle_client_frame(&registry, &observer, "not json");

        let snapshot = registry.snapshot();
        assert_eq!(snapshot[0].1, None);
    }
}
