// WebSocket channel: device submissions in, telemetry events out
use crate::application::telemetry_service::TelemetryService;
use crate::domain::error::InvalidInput;
use crate::domain::payload::RawPayload;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::require_fault_code;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

/// Direct replies queued per connection before the reader waits on the writer.
const REPLY_QUEUE_CAPACITY: usize = 64;

/// Envelope of every frame a device or dashboard may send.
///
/// `data` is optional so payload-less events such as `clear_fault` may carry
/// an empty object, `null`, or nothing at all.
#[derive(Debug, Deserialize)]
struct InboundFrame {
    event: String,
    #[serde(default)]
    data: Value,
}

/// Upgrade to a WebSocket subscribed to every telemetry event.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    tracing::info!("WebSocket connected");

    let (mut sink, mut stream) = socket.split();
    let (reply_tx, mut reply_rx) = reply_channel();
    let mut events = BroadcastStream::new(state.events.subscribe());

    // Sender task: broadcast events plus direct replies to this connection.
    let send_task = tokio::spawn(async move {
        loop {
            let outbound = tokio::select! {
                Some(event) = events.next() => match event {
                    Ok(event) => serde_json::to_string(&event),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "WebSocket subscriber lagged");
                        continue;
                    }
                },
                Some(reply) = reply_rx.recv() => serde_json::to_string(&reply),
                else => break,
            };

            let text = match outbound {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode WebSocket frame");
                    continue;
                }
            };

            if sink.send(Message::Text(text)).await.is_err() {
                tracing::debug!("WebSocket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if let Some(reply) = handle_frame(&state.telemetry, &text) {
                    if reply_tx.send(reply).await.is_err() {
                        break;
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    send_task.abort();
    tracing::info!("WebSocket disconnected");
}

/// Per-connection queue of direct replies; a full queue pauses reading.
fn reply_channel() -> (mpsc::Sender<Value>, mpsc::Receiver<Value>) {
    mpsc::channel(REPLY_QUEUE_CAPACITY)
}

/// Apply one inbound frame, returning a reply meant only for the sender.
///
/// Successful submissions get no direct reply; the resulting event reaches the
/// sender through the broadcast like every other subscriber.
fn handle_frame(telemetry: &TelemetryService, text: &str) -> Option<Value> {
    let frame: InboundFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => return Some(error_frame(format!("unrecognized frame: {}", e))),
    };

    let outcome = match frame.event.as_str() {
        "device_data" => telemetry
            .ingest_sample(RawPayload::from(frame.data))
            .map(|_| None),
        "device_fault" => decode_fault(frame.data)
            .and_then(|payload| telemetry.ingest_fault(RawPayload::Structured(payload)))
            .map(|_| None),
        "clear_fault" => {
            let cleared = telemetry.clear_current_fault();
            Ok(Some(json!({ "event": "clear_result", "data": { "cleared": cleared } })))
        }
        other => return Some(error_frame(format!("unrecognized event `{}`", other))),
    };

    outcome.unwrap_or_else(|e| Some(error_frame(e.to_string())))
}

fn decode_fault(data: Value) -> Result<Value, InvalidInput> {
    let payload = match RawPayload::from(data) {
        RawPayload::Text(text) => serde_json::from_str(&text)
            .map_err(|e| InvalidInput::MalformedEncoding(e.to_string()))?,
        RawPayload::Structured(value) => value,
    };
    require_fault_code(&payload)?;
    Ok(payload)
}

fn error_frame(message: String) -> Value {
    json!({ "event": "error", "data": { "error": message } })
}
