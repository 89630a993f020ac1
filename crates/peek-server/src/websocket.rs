//! The `/logs` WebSocket: subscribe/unsubscribe plus live delivery.
//!
//! One connection runs two tasks: a writer that owns the socket sink,
//! draining an outbound queue and pinging idle streams, and the reader
//! loop handling client frames. Each subscribe sends a snapshot
//! `results` frame first, then registers with the broadcaster and pumps
//! live `log` frames. A snapshot and the live stream may overlap;
//! clients de-duplicate by record id.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use chrono::{DateTime, Utc};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use peek_model::{Record, TimeRange};
use peek_query::Query;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, warn};

use crate::state::AppState;

/// Outbound frames buffered per connection before the writer drains them.
const OUTBOUND_BUFFER: usize = 128;

/// Malformed frames tolerated before the transport is closed.
const MAX_PROTOCOL_ERRORS: u32 = 5;

/// Client → server frames.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Replace the current subscription.
    Subscribe {
        /// Query string; empty matches everything.
        #[serde(default)]
        query: String,
        /// Optional RFC3339 window start.
        start: Option<String>,
        /// Optional RFC3339 window end.
        end: Option<String>,
    },
    /// Drop the current subscription.
    Unsubscribe,
}

/// Server → client frames.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Initial snapshot after a subscribe.
    Results {
        /// First page of matching records.
        logs: Vec<Record>,
        /// Matches ignoring the page size.
        total: usize,
        /// Wall time spent on the snapshot query.
        took_ms: u64,
    },
    /// One live record.
    Log {
        /// The delivered record.
        entry: Record,
    },
}

/// `GET /logs` — upgrade to the bidirectional stream.
pub async fn ws_upgrade(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: Arc<AppState>) {
    let (sink, stream) = socket.split();
    let (outbound, outbound_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_BUFFER);

    let ping_interval = state.config().ws_ping_interval;
    let writer = tokio::spawn(write_pump(sink, outbound_rx, ping_interval));

    read_loop(stream, state, outbound).await;

    writer.abort();
    debug!("subscriber connection closed");
}

/// Owns the socket sink: forwards outbound frames and pings when idle.
async fn write_pump(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<ServerMessage>,
    ping_every: std::time::Duration,
) {
    let mut ping = interval(ping_every);
    ping.reset(); // skip the immediate first tick

    loop {
        tokio::select! {
            message = outbound.recv() => {
                let Some(message) = message else { break };
                match serde_json::to_string(&message) {
                    Ok(json) => {
                        if sink.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "failed to serialize frame"),
                }
            }
            _ = ping.tick() => {
                if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Handles inbound frames until the client goes away.
async fn read_loop(
    mut stream: SplitStream<WebSocket>,
    state: Arc<AppState>,
    outbound: mpsc::Sender<ServerMessage>,
) {
    let mut pump: Option<JoinHandle<()>> = None;
    let mut protocol_errors = 0u32;

    while let Some(frame) = stream.next().await {
        let message = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue, // ping/pong/binary
            Err(e) => {
                debug!(error = %e, "websocket receive error");
                break;
            }
        };

        let parsed: ClientMessage = match serde_json::from_str(&message) {
            Ok(parsed) => parsed,
            Err(e) => {
                protocol_errors += 1;
                warn!(error = %e, count = protocol_errors, "ignoring malformed frame");
                if protocol_errors >= MAX_PROTOCOL_ERRORS {
                    break;
                }
                continue;
            }
        };

        match parsed {
            ClientMessage::Subscribe { query, start, end } => {
                // An invalid query keeps the previous subscription.
                let parsed = match Query::parse(&query) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        warn!(error = %e, query = %query, "ignoring invalid subscribe query");
                        continue;
                    }
                };

                if let Some(previous) = pump.take() {
                    previous.abort();
                }

                let filter = state.effective_filter(parsed.into_filter());
                let time_range = lenient_range(start.as_deref(), end.as_deref());

                // Snapshot first, then go live.
                let began = std::time::Instant::now();
                match state.store().query(
                    &filter,
                    time_range,
                    state.config().snapshot_limit,
                    0,
                ) {
                    Ok((logs, total)) => {
                        let results = ServerMessage::Results {
                            logs,
                            total,
                            took_ms: began.elapsed().as_millis() as u64,
                        };
                        if outbound.send(results).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "snapshot query failed");
                        continue;
                    }
                }

                let mut subscription = state.broadcaster().subscribe(filter, time_range);
                let live_outbound = outbound.clone();
                pump = Some(tokio::spawn(async move {
                    while let Some(record) = subscription.recv().await {
                        let frame = ServerMessage::Log {
                            entry: (*record).clone(),
                        };
                        if live_outbound.send(frame).await.is_err() {
                            break;
                        }
                    }
                }));
            }
            ClientMessage::Unsubscribe => {
                if let Some(previous) = pump.take() {
                    previous.abort();
                }
            }
        }
    }

    if let Some(previous) = pump.take() {
        previous.abort();
    }
}

/// Best-effort window parsing for stream subscriptions.
///
/// Unlike the HTTP surface, malformed bounds here are ignored rather
/// than rejected; the subscribe frame as a whole stays valid.
fn lenient_range(start: Option<&str>, end: Option<&str>) -> Option<TimeRange> {
    let parse = |value: Option<&str>| -> Option<DateTime<Utc>> {
        value
            .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
            .map(|dt| dt.with_timezone(&Utc))
    };
    let start = parse(start);
    let end = parse(end);
    if start.is_none() && end.is_none() {
        None
    } else {
        Some(TimeRange::new(start, end))
    }
}
