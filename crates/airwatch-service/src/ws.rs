//! WebSocket handler for the live reading feed.
//!
//! Each accepted reading is pushed as the same JSON object `POST
//! /api/readings` returns: `{"data": ..., "analysis": ..., "aqi": ...}`.

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use airwatch_core::ReadingEvent;

use crate::state::AppState;

/// Create the WebSocket router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/ws", get(ws_handler))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Build the event a newly connected client starts from, if any reading exists.
fn latest_event(state: &AppState) -> Option<ReadingEvent> {
    let current = state.pipeline.current()?;
    Some(ReadingEvent {
        aqi: state.pipeline.calculator().compute(&current.reading),
        reading: current.reading,
        analysis: current.analysis,
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before sending the snapshot so nothing accepted in between is lost.
    let mut rx = state.pipeline.subscribe();

    info!("WebSocket client connected");

    if let Some(event) = latest_event(&state)
        && let Ok(json) = serde_json::to_string(&event)
        && sender.send(Message::Text(json.into())).await.is_err()
    {
        info!("WebSocket client disconnected during initial snapshot");
        return;
    }

    debug!("Sent initial snapshot to WebSocket client");

    let mut send_task = tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(missed)) => {
                    warn!("WebSocket client lagging, skipped {} readings", missed);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let json = match serde_json::to_string(&event) {
                Ok(j) => j,
                Err(e) => {
                    warn!("Failed to serialize event: {}", e);
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket receive error: {}", e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        },
        _ = &mut recv_task => {
            send_task.abort();
        },
    }

    info!("WebSocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use airwatch_types::ReadingInput;
    use time::OffsetDateTime;

    #[test]
    fn test_latest_event_empty() {
        let state = AppState::new(Config::default()).unwrap();
        assert!(latest_event(&state).is_none());
    }

    #[test]
    fn test_latest_event_matches_submission() {
        let state = AppState::new(Config::default()).unwrap();
        let input = ReadingInput {
            timestamp: None,
            temperature: Some(22.0),
            humidity: Some(50.0),
            co2: Some(1100.0),
            pm25: Some(150.0),
            pm10: Some(60.0),
            light: Some(0.0),
        };
        let accepted = state
            .pipeline
            .submit(&input, OffsetDateTime::now_utc())
            .unwrap();

        assert_eq!(latest_event(&state), Some(accepted));
    }

    #[tokio::test]
    async fn test_ws_route_requires_upgrade() {
        use axum::{body::Body, http::Request};
        use tower::ServiceExt;

        let state = AppState::new(Config::default()).unwrap();
        let response = router()
            .with_state(state)
            .oneshot(Request::builder().uri("/api/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
