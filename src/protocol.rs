//! Wire protocol shared by the streaming client and server.
//!
//! The duplex channel carries exactly two message kinds:
//! - client → server: binary frames of raw 16-bit LE mono PCM, one chunk
//!   per frame
//! - server → client: text frames containing a JSON [`ResultMessage`]
//!
//! There is no framing beyond the transport's own message boundaries.

use serde::{Deserialize, Serialize};

/// Result of one transcribed segment, sent back as a JSON text frame.
///
/// `transcription` holds the translated text, the no-speech sentinel, or an
/// error description — the client always receives exactly one message per
/// completed segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMessage {
    pub transcription: String,
}

impl ResultMessage {
    pub fn new(transcription: impl Into<String>) -> Self {
        Self {
            transcription: transcription.into(),
        }
    }
}

/// Normalize a configured endpoint into a WebSocket URL.
///
/// The endpoint is a single `host:port` value; any `http://`, `https://`,
/// `ws://` or `wss://` prefix is stripped before the `ws://` scheme and
/// `/stream` path are applied.
pub fn stream_url(endpoint: &str) -> String {
    let stripped = endpoint
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("wss://")
        .trim_start_matches("ws://")
        .trim_end_matches('/');
    format!("ws://{}/stream", stripped)
}

/// Normalize a configured endpoint into the batch-upload URL.
pub fn transcribe_url(endpoint: &str) -> String {
    let stripped = endpoint
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("wss://")
        .trim_start_matches("ws://")
        .trim_end_matches('/');
    format!("http://{}/transcribe", stripped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_message_round_trip() {
        let msg = ResultMessage::new("Hello world");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"transcription":"Hello world"}"#);

        let parsed: ResultMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_result_message_rejects_wrong_shape() {
        let parsed = serde_json::from_str::<ResultMessage>(r#"{"text":"nope"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_stream_url_strips_http_scheme() {
        assert_eq!(
            stream_url("http://localhost:42331"),
            "ws://localhost:42331/stream"
        );
    }

    #[test]
    fn test_stream_url_plain_host_port() {
        assert_eq!(stream_url("10.0.0.5:9000"), "ws://10.0.0.5:9000/stream");
    }

    #[test]
    fn test_stream_url_strips_ws_scheme_and_trailing_slash() {
        assert_eq!(
            stream_url("ws://example.org:42331/"),
            "ws://example.org:42331/stream"
        );
    }

    #[test]
    fn test_transcribe_url() {
        assert_eq!(
            transcribe_url("https://example.org:8080"),
            "http://example.org:8080/transcribe"
        );
    }
}
