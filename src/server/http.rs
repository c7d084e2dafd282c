//! HTTP surface: router, batch transcription endpoint, health check.

use crate::error::{DolmetschError, Result};
use crate::protocol::ResultMessage;
use crate::server::pipeline::{samples_from_le_bytes, SegmentPipeline};
use crate::server::stream::stream_handler;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Uploads larger than this are rejected outright.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Shared state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<SegmentPipeline>,
    /// Segment flush threshold in bytes for streaming sessions.
    pub window_size: usize,
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    model: String,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/stream", get(stream_handler))
        .route("/transcribe", post(transcribe_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process is terminated.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener =
        tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| DolmetschError::Server {
                message: format!("failed to bind {}: {}", addr, e),
            })?;
    info!(%addr, model = state.pipeline.model_name(), "listening");

    axum::serve(listener, router(state))
        .await
        .map_err(|e| DolmetschError::Server {
            message: e.to_string(),
        })
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok",
        model: state.pipeline.model_name().to_string(),
    })
}

/// Batch endpoint: transcribe and translate an uploaded recording in one
/// shot.
///
/// Expects a multipart body with a `file` field holding either a WAV file
/// or raw 16-bit LE PCM. The upload runs through the same
/// transcribe-then-translate path as the stream and responds with the same
/// JSON shape; 400 with a plain-text body when the field is missing, 500
/// with a plain-text diagnostic when an engine fails.
async fn transcribe_handler(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut file_bytes: Option<Vec<u8>> = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            match field.bytes().await {
                Ok(bytes) => file_bytes = Some(bytes.to_vec()),
                Err(e) => {
                    warn!(error = %e, "failed to read upload");
                }
            }
            break;
        }
    }

    let Some(bytes) = file_bytes else {
        return (StatusCode::BAD_REQUEST, "Missing file in request.").into_response();
    };

    let pipeline = Arc::clone(&state.pipeline);
    let outcome = tokio::task::spawn_blocking(move || {
        let samples = decode_upload(&bytes);
        pipeline.process_samples(&samples)
    })
    .await;

    match outcome {
        Ok(Ok(text)) => (StatusCode::OK, Json(ResultMessage::new(text))).into_response(),
        Ok(Err(e)) => {
            warn!(error = %e, "batch transcription failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal Server Error: {}", e),
            )
                .into_response()
        }
        Err(e) => {
            warn!(error = %e, "batch transcription panicked");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal Server Error: {}", e),
            )
                .into_response()
        }
    }
}

/// Decode an upload into samples: WAV when the header parses, raw 16-bit
/// LE PCM otherwise.
fn decode_upload(bytes: &[u8]) -> Vec<i16> {
    match hound::WavReader::new(Cursor::new(bytes)) {
        Ok(mut reader) => match reader.spec().sample_format {
            hound::SampleFormat::Int => reader.samples::<i16>().filter_map(|s| s.ok()).collect(),
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .filter_map(|s| s.ok())
                .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                .collect(),
        },
        Err(_) => samples_from_le_bytes(bytes),
    }
}
