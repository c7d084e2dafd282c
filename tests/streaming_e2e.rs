//! End-to-end streaming tests: a real client session against a real
//! in-process server, with mock audio and mock engines.

use axum::extract::ws::{Message, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use dolmetsch::audio::source::MockSampleSource;
use dolmetsch::client::{CollectorSink, ResultSink, SessionConfig, SessionState, StreamSession};
use dolmetsch::defaults;
use dolmetsch::engine::{MockTranscriber, MockTranslator, Transcriber, Translator};
use dolmetsch::protocol::ResultMessage;
use dolmetsch::server::{router, AppState, SegmentPipeline};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Transcriber that labels each call so tests can check ordering.
struct CountingTranscriber {
    calls: AtomicUsize,
}

impl CountingTranscriber {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

impl Transcriber for CountingTranscriber {
    fn transcribe(&self, audio: &[i16]) -> dolmetsch::Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("segment {} of {} samples", n, audio.len()))
    }

    fn model_name(&self) -> &str {
        "counting"
    }
}

async fn spawn_server(transcriber: Arc<dyn Transcriber>, translator: Arc<dyn Translator>) -> String {
    let state = AppState {
        pipeline: Arc::new(SegmentPipeline::new(transcriber, translator)),
        window_size: defaults::window_size(defaults::SAMPLE_RATE, defaults::WINDOW_SECONDS),
    };
    spawn_router(router(state)).await
}

async fn spawn_router(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("127.0.0.1:{}", addr.port())
}

fn session_config(endpoint: String) -> SessionConfig {
    SessionConfig {
        endpoint,
        chunk_size: defaults::chunk_size(defaults::SAMPLE_RATE),
        queue_capacity: defaults::QUEUE_CAPACITY,
    }
}

async fn wait_for(deadline: Duration, check: impl Fn() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    false
}

#[tokio::test(flavor = "multi_thread")]
async fn five_seconds_yields_one_no_speech_result() {
    let transcriber = Arc::new(MockTranscriber::new("test"));
    let translator = Arc::new(MockTranslator::new());
    let endpoint = spawn_server(
        Arc::clone(&transcriber) as Arc<dyn Transcriber>,
        Arc::clone(&translator) as Arc<dyn Translator>,
    )
    .await;

    let sink = Arc::new(CollectorSink::new());
    let source = MockSampleSource::silence(5, defaults::SAMPLE_RATE);
    let session = StreamSession::new(session_config(endpoint));
    let handle = session.start(source, Arc::clone(&sink) as Arc<dyn ResultSink>).await.unwrap();

    let sink_check = Arc::clone(&sink);
    assert!(wait_for(Duration::from_secs(5), move || !sink_check.texts().is_empty()).await);

    // Exactly one segment of five seconds of samples reached the engine,
    // and the empty transcription became the sentinel without translation.
    assert_eq!(sink.texts(), vec![defaults::NO_SPEECH_TEXT.to_string()]);
    assert_eq!(transcriber.call_sizes(), vec![80_000]);
    assert_eq!(translator.call_count(), 0);

    handle.stop();
    handle.wait().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn twelve_seconds_yields_two_results_in_order() {
    let transcriber = Arc::new(CountingTranscriber::new());
    let endpoint = spawn_server(
        Arc::clone(&transcriber) as Arc<dyn Transcriber>,
        Arc::new(MockTranslator::new()),
    )
    .await;

    let sink = Arc::new(CollectorSink::new());
    let source = MockSampleSource::silence(12, defaults::SAMPLE_RATE);
    let session = StreamSession::new(session_config(endpoint));
    let handle = session.start(source, Arc::clone(&sink) as Arc<dyn ResultSink>).await.unwrap();

    let sink_check = Arc::clone(&sink);
    assert!(wait_for(Duration::from_secs(5), move || sink_check.texts().len() >= 2).await);

    // Two full windows; the trailing two seconds never complete a segment.
    assert_eq!(
        sink.texts(),
        vec![
            "[en] segment 1 of 80000 samples".to_string(),
            "[en] segment 2 of 80000 samples".to_string(),
        ]
    );

    handle.stop();
    handle.wait().await;
    assert_eq!(transcriber.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn segment_content_matches_captured_samples_exactly() {
    let transcriber = Arc::new(MockTranscriber::new("test").with_response("x"));
    let endpoint = spawn_server(
        Arc::clone(&transcriber) as Arc<dyn Transcriber>,
        Arc::new(MockTranslator::new()),
    )
    .await;

    // Ten seconds of audio where every sample is its own position, split
    // into capture-sized blocks. Any drop, duplication or reorder anywhere
    // between capture and engine changes the reassembled content.
    let samples_per_block = 1600;
    let total_samples = 10 * defaults::SAMPLE_RATE as usize;
    let ramp: Vec<i16> = (0..total_samples).map(|i| (i as u16) as i16).collect();
    let blocks = ramp
        .chunks(samples_per_block)
        .map(|chunk| dolmetsch::SampleBlock::new(chunk.to_vec()))
        .collect();

    let sink = Arc::new(CollectorSink::new());
    let source = MockSampleSource::new(blocks);
    let session = StreamSession::new(session_config(endpoint));
    let handle = session.start(source, Arc::clone(&sink) as Arc<dyn ResultSink>).await.unwrap();

    let sink_check = Arc::clone(&sink);
    assert!(wait_for(Duration::from_secs(5), move || sink_check.texts().len() >= 2).await);

    // Two full windows, byte-for-byte equal to the capture input.
    let segments = transcriber.call_audio();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0], &ramp[..80_000]);
    assert_eq!(segments[1], &ramp[80_000..160_000]);

    handle.stop();
    handle.wait().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn engine_failure_becomes_error_text_and_session_survives() {
    let transcriber = Arc::new(MockTranscriber::new("test").failing());
    let endpoint = spawn_server(
        Arc::clone(&transcriber) as Arc<dyn Transcriber>,
        Arc::new(MockTranslator::new()),
    )
    .await;

    let sink = Arc::new(CollectorSink::new());
    let source = MockSampleSource::silence(10, defaults::SAMPLE_RATE);
    let session = StreamSession::new(session_config(endpoint));
    let handle = session.start(source, Arc::clone(&sink) as Arc<dyn ResultSink>).await.unwrap();

    let sink_check = Arc::clone(&sink);
    assert!(wait_for(Duration::from_secs(5), move || sink_check.texts().len() >= 2).await);

    // One error message per segment, and the session keeps going after the
    // first failure.
    for text in sink.texts() {
        assert!(text.starts_with("Error: "), "unexpected text: {}", text);
    }
    assert_eq!(handle.state(), SessionState::Streaming);

    handle.stop();
    handle.wait().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_result_frames_are_skipped() {
    async fn junk_handler(ws: WebSocketUpgrade) -> Response {
        ws.on_upgrade(|mut socket| async move {
            let valid = serde_json::to_string(&ResultMessage::new("after the junk")).unwrap();
            let _ = socket.send(Message::Text("not json".to_string())).await;
            let _ = socket.send(Message::Text(valid)).await;
            // Hold the connection open, draining whatever the client sends.
            while let Some(Ok(_)) = socket.recv().await {}
        })
    }

    let endpoint = spawn_router(Router::new().route("/stream", get(junk_handler))).await;

    let sink = Arc::new(CollectorSink::new());
    let source = MockSampleSource::new(Vec::new());
    let session = StreamSession::new(session_config(endpoint));
    let handle = session.start(source, Arc::clone(&sink) as Arc<dyn ResultSink>).await.unwrap();

    let sink_check = Arc::clone(&sink);
    assert!(wait_for(Duration::from_secs(5), move || !sink_check.texts().is_empty()).await);

    assert_eq!(sink.texts(), vec!["after the junk".to_string()]);
    assert_eq!(handle.state(), SessionState::Streaming);

    handle.stop();
    handle.wait().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn server_close_tears_the_session_down() {
    async fn closing_handler(ws: WebSocketUpgrade) -> Response {
        ws.on_upgrade(|socket| async move {
            drop(socket);
        })
    }

    let endpoint = spawn_router(Router::new().route("/stream", get(closing_handler))).await;

    let sink = Arc::new(CollectorSink::new());
    let source = MockSampleSource::new(Vec::new());
    let session = StreamSession::new(session_config(endpoint));
    let mut handle = session.start(source, Arc::clone(&sink) as Arc<dyn ResultSink>).await.unwrap();

    // No stop() call: the remote close alone must drive the session to
    // Closed.
    tokio::time::timeout(Duration::from_secs(5), handle.closed())
        .await
        .expect("session did not close after server hangup");
    assert_eq!(handle.state(), SessionState::Closed);
    handle.wait().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn stop_is_idempotent_and_prompt() {
    let endpoint = spawn_server(
        Arc::new(MockTranscriber::new("test")),
        Arc::new(MockTranslator::new()),
    )
    .await;

    let sink = Arc::new(CollectorSink::new());
    let source = MockSampleSource::silence(2, defaults::SAMPLE_RATE);
    let session = StreamSession::new(session_config(endpoint));
    let handle = session.start(source, Arc::clone(&sink) as Arc<dyn ResultSink>).await.unwrap();

    handle.stop();
    handle.stop();
    tokio::time::timeout(Duration::from_secs(2), handle.wait())
        .await
        .expect("stop did not take effect within the grace period");
}

#[tokio::test(flavor = "multi_thread")]
async fn connect_failure_is_an_error_not_a_hang() {
    // Nothing is listening on this port.
    let session = StreamSession::new(session_config("127.0.0.1:1".to_string()));
    let source = MockSampleSource::new(Vec::new());
    let result = session.start(source, Arc::new(CollectorSink::new())).await;
    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn batch_endpoint_translates_like_the_stream() {
    let transcriber = Arc::new(MockTranscriber::new("test").with_response("vom band"));
    let translator = Arc::new(MockTranslator::new());
    let endpoint = spawn_server(
        Arc::clone(&transcriber) as Arc<dyn Transcriber>,
        Arc::clone(&translator) as Arc<dyn Translator>,
    )
    .await;

    let part = reqwest::multipart::Part::bytes(vec![0u8; 3200]).file_name("clip.raw");
    let form = reqwest::multipart::Form::new().part("file", part);
    let response = reqwest::Client::new()
        .post(format!("http://{}/transcribe", endpoint))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: ResultMessage = response.json().await.unwrap();
    // Uploads run through the same transcribe-then-translate path as the
    // stream.
    assert_eq!(body.transcription, "[en] vom band");
    assert_eq!(translator.call_count(), 1);
    assert_eq!(transcriber.call_sizes(), vec![1600]);
}

#[tokio::test(flavor = "multi_thread")]
async fn batch_endpoint_rejects_missing_file_field() {
    let endpoint = spawn_server(
        Arc::new(MockTranscriber::new("test")),
        Arc::new(MockTranslator::new()),
    )
    .await;

    let form = reqwest::multipart::Form::new().text("other", "data");
    let response = reqwest::Client::new()
        .post(format!("http://{}/transcribe", endpoint))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await.unwrap(), "Missing file in request.");
}

#[tokio::test(flavor = "multi_thread")]
async fn batch_endpoint_reports_engine_failure_as_500() {
    let endpoint = spawn_server(
        Arc::new(MockTranscriber::new("test").failing()),
        Arc::new(MockTranslator::new()),
    )
    .await;

    let part = reqwest::multipart::Part::bytes(vec![0u8; 3200]).file_name("clip.raw");
    let form = reqwest::multipart::Form::new().part("file", part);
    let response = reqwest::Client::new()
        .post(format!("http://{}/transcribe", endpoint))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let body = response.text().await.unwrap();
    assert!(
        body.starts_with("Internal Server Error: "),
        "unexpected body: {}",
        body
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn health_endpoint_reports_model() {
    let endpoint = spawn_server(
        Arc::new(MockTranscriber::new("ggml-base")),
        Arc::new(MockTranslator::new()),
    )
    .await;

    let response = reqwest::Client::new()
        .get(format!("http://{}/health", endpoint))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model"], "ggml-base");
}
