//! Streaming session orchestration.
//!
//! A session connects to the server's `/stream` endpoint, then runs three
//! workers until stopped:
//!
//! - a capture drain thread pulling [`SampleBlock`]s off the source channel,
//!   assembling them into wire chunks and pushing them onto the outbound
//!   queue,
//! - an async send loop popping the queue and writing binary frames,
//! - an async receive loop parsing result frames and feeding the sink.
//!
//! All three observe one [`CancellationToken`] with a bounded poll interval,
//! so `stop` takes effect within roughly one poll period. Any transport
//! failure cancels the token, which tears the whole session down.

use crate::audio::source::SampleSource;
use crate::client::assembler::ChunkAssembler;
use crate::client::queue::OutboundQueue;
use crate::client::sink::ResultSink;
use crate::config::Config;
use crate::defaults;
use crate::error::{DolmetschError, Result};
use crate::protocol::{self, ResultMessage};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Lifecycle of a streaming session.
///
/// Transitions are monotonic: Connecting → Streaming → Closing → Closed.
/// A connect failure never reaches Streaming; `start` returns the error
/// instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Streaming,
    Closing,
    Closed,
}

/// Settings a session needs, extracted from the full [`Config`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub endpoint: String,
    pub chunk_size: usize,
    pub queue_capacity: usize,
}

impl SessionConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            endpoint: config.stream.endpoint.clone(),
            chunk_size: config.chunk_size(),
            queue_capacity: config.stream.queue_capacity,
        }
    }
}

/// Factory for streaming sessions.
pub struct StreamSession {
    config: SessionConfig,
}

impl StreamSession {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Connect and start streaming from `source`, delivering results to
    /// `sink`.
    ///
    /// Returns once the connection is established and the workers are
    /// running; the returned handle controls and observes the session.
    pub async fn start<S>(
        &self,
        mut source: S,
        sink: Arc<dyn ResultSink>,
    ) -> Result<SessionHandle>
    where
        S: SampleSource + 'static,
    {
        let (state_tx, state_rx) = watch::channel(SessionState::Connecting);

        let url = protocol::stream_url(&self.config.endpoint);
        info!(url = %url, "connecting");
        let (ws, _) = connect_async(url.as_str())
            .await
            .map_err(|e| DolmetschError::Connect {
                endpoint: url.clone(),
                message: e.to_string(),
            })?;

        let blocks = source.start()?;
        let _ = state_tx.send(SessionState::Streaming);
        info!("session streaming");

        let cancel = CancellationToken::new();
        let queue = Arc::new(OutboundQueue::new(self.config.queue_capacity));

        let assembler = ChunkAssembler::new(self.config.chunk_size);
        let capture = {
            let queue = Arc::clone(&queue);
            let cancel = cancel.clone();
            std::thread::spawn(move || capture_loop(blocks, assembler, queue, cancel))
        };

        let (ws_tx, ws_rx) = ws.split();
        let send_task = tokio::spawn(send_loop(ws_tx, Arc::clone(&queue), cancel.clone()));
        let recv_task = tokio::spawn(receive_loop(ws_rx, sink, cancel.clone()));

        let supervisor = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                cancel.cancelled().await;
                let _ = state_tx.send(SessionState::Closing);

                let _ = send_task.await;
                let _ = recv_task.await;
                // The capture thread exits within one poll interval of the
                // cancel; join it off the runtime along with device release.
                let _ = tokio::task::spawn_blocking(move || {
                    let _ = capture.join();
                    if let Err(e) = source.stop() {
                        warn!(error = %e, "failed to stop capture source");
                    }
                })
                .await;

                let _ = state_tx.send(SessionState::Closed);
                info!("session closed");
            })
        };

        Ok(SessionHandle {
            cancel,
            state: state_rx,
            queue,
            supervisor,
        })
    }
}

/// Control and observation handle for a running session.
pub struct SessionHandle {
    cancel: CancellationToken,
    state: watch::Receiver<SessionState>,
    queue: Arc<OutboundQueue>,
    supervisor: tokio::task::JoinHandle<()>,
}

impl SessionHandle {
    /// Request shutdown. Non-blocking and idempotent; the workers observe
    /// the request within one poll interval.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Chunks discarded to outbound queue overflow so far.
    pub fn dropped_chunks(&self) -> u64 {
        self.queue.dropped()
    }

    /// Wait until the session reaches Closed without consuming the handle.
    pub async fn closed(&mut self) {
        while *self.state.borrow() != SessionState::Closed {
            if self.state.changed().await.is_err() {
                break;
            }
        }
    }

    /// Wait until the session is fully torn down.
    pub async fn wait(self) {
        let _ = self.supervisor.await;
    }
}

/// Drains the capture channel into the outbound queue.
///
/// Runs on its own thread: the crossbeam receive is blocking, and the
/// timeout bounds how long a cancel can go unnoticed. Source exhaustion
/// (channel disconnect) ends the drain but not the session — results for
/// already-sent chunks are still expected.
fn capture_loop(
    blocks: Receiver<crate::audio::source::SampleBlock>,
    mut assembler: ChunkAssembler,
    queue: Arc<OutboundQueue>,
    cancel: CancellationToken,
) {
    while !cancel.is_cancelled() {
        match blocks.recv_timeout(defaults::POLL_INTERVAL) {
            Ok(block) => {
                if block.overrun {
                    warn!("capture overrun, audio was dropped at the device");
                }
                for chunk in assembler.append(&block) {
                    queue.push(chunk);
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    if assembler.residual_len() > 0 {
        debug!(
            bytes = assembler.residual_len(),
            "discarding partial chunk at capture end"
        );
    }
}

/// Pops chunks off the queue and writes them as binary frames.
async fn send_loop(mut ws_tx: WsSink, queue: Arc<OutboundQueue>, cancel: CancellationToken) {
    loop {
        if cancel.is_cancelled() {
            break;
        }
        let Some(chunk) = queue.pop(defaults::POLL_INTERVAL).await else {
            continue;
        };
        if let Err(e) = ws_tx.send(Message::Binary(chunk)).await {
            warn!(error = %e, "chunk transmission failed");
            cancel.cancel();
            break;
        }
    }
    // Best effort close frame; the connection is going away either way.
    let _ = ws_tx.close().await;
}

/// Reads result frames and delivers them to the sink.
///
/// Malformed frames are logged and skipped. A close frame, stream end or
/// transport error cancels the session.
async fn receive_loop(mut ws_rx: WsStream, sink: Arc<dyn ResultSink>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ResultMessage>(&text) {
                        Ok(result) => sink.deliver(&result.transcription),
                        Err(e) => {
                            warn!(error = %e, payload = %text, "discarding malformed result frame");
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    debug!("server closed the stream");
                    cancel.cancel();
                    break;
                }
                Some(Ok(Message::Binary(_))) => {
                    warn!("discarding unexpected binary frame from server");
                }
                Some(Ok(_)) => {} // ping/pong handled by the transport
                Some(Err(e)) => {
                    warn!(error = %e, "receive failed");
                    cancel.cancel();
                    break;
                }
            }
        }
    }
}
