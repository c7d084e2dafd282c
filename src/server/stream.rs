//! WebSocket streaming endpoint.
//!
//! Each connection gets three cooperating pieces:
//!
//! - the receive loop (this task) feeding the aggregator and handing
//!   completed segments to the worker over a capacity-1 channel, so a slow
//!   engine backpressures the socket instead of piling segments up,
//! - a worker task running the pipeline inside `spawn_blocking`, one
//!   segment at a time, preserving segment order,
//! - a dispatcher task that owns the socket's send half and writes result
//!   frames in completion order.

use crate::protocol::ResultMessage;
use crate::server::aggregator::SegmentAggregator;
use crate::server::http::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub async fn stream_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_stream(socket, state))
}

async fn handle_stream(socket: WebSocket, state: AppState) {
    info!("stream session opened");
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Capacity 1: one segment in flight, one queued, the rest held back in
    // the socket's receive buffer.
    let (seg_tx, mut seg_rx) = mpsc::channel::<Vec<u8>>(1);
    let (out_tx, mut out_rx) = mpsc::channel::<ResultMessage>(16);

    let pipeline = Arc::clone(&state.pipeline);
    let worker = tokio::spawn(async move {
        while let Some(segment) = seg_rx.recv().await {
            let pipeline = Arc::clone(&pipeline);
            let message =
                match tokio::task::spawn_blocking(move || pipeline.process(&segment)).await {
                    Ok(message) => message,
                    Err(e) => {
                        warn!(error = %e, "segment worker panicked");
                        ResultMessage::new(format!("Error: segment processing failed: {}", e))
                    }
                };
            if out_tx.send(message).await.is_err() {
                break;
            }
        }
    });

    let dispatcher = tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    warn!(error = %e, "failed to encode result message");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(json)).await.is_err() {
                // Client went away; drain the rest without sending.
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let mut aggregator = SegmentAggregator::new(state.window_size);
    while let Some(frame) = ws_rx.next().await {
        match frame {
            Ok(Message::Binary(chunk)) => {
                if let Some(segment) = aggregator.append(&chunk) {
                    debug!(bytes = segment.len(), "segment complete");
                    if seg_tx.send(segment).await.is_err() {
                        break;
                    }
                }
            }
            Ok(Message::Text(_)) => {
                warn!("discarding unexpected text frame from client");
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // ping/pong handled by axum
            Err(e) => {
                debug!(error = %e, "stream receive ended");
                break;
            }
        }
    }

    if aggregator.residual_len() > 0 {
        debug!(
            bytes = aggregator.residual_len(),
            "discarding residual audio at disconnect"
        );
    }

    // Closing the segment channel lets the worker finish what is queued,
    // then the dispatcher drains and closes the socket.
    drop(seg_tx);
    let _ = worker.await;
    let _ = dispatcher.await;
    info!("stream session closed");
}
