//! Translation engine seam.

use crate::error::{DolmetschError, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Trait for text translation.
///
/// Synchronous, potentially slow and potentially failing — callers catch
/// errors at the pipeline boundary and surface them as result data.
pub trait Translator: Send + Sync {
    /// Translate source text into the configured target language.
    fn translate(&self, text: &str) -> Result<String>;
}

impl<T: Translator + ?Sized> Translator for Arc<T> {
    fn translate(&self, text: &str) -> Result<String> {
        (**self).translate(text)
    }
}

/// Mock translator for testing.
pub struct MockTranslator {
    prefix: String,
    should_fail: bool,
    calls: AtomicUsize,
}

impl MockTranslator {
    /// Create a mock that echoes input with a marker prefix.
    pub fn new() -> Self {
        Self {
            prefix: "[en] ".to_string(),
            should_fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Configure the mock to fail on every call.
    pub fn failing(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Number of translate calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator for MockTranslator {
    fn translate(&self, text: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(DolmetschError::Translation {
                message: "mock failure".to_string(),
            });
        }
        Ok(format!("{}{}", self.prefix, text))
    }
}

/// Identity translator, used when no translation API is configured.
///
/// Captions come back in the source language; the rest of the pipeline is
/// unchanged.
pub struct PassthroughTranslator;

impl Translator for PassthroughTranslator {
    fn translate(&self, text: &str) -> Result<String> {
        Ok(text.to_string())
    }
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    text: &'a str,
    target_lang: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    text: String,
}

/// Translator backed by a remote HTTP translation API.
///
/// Posts `{"text": ..., "target_lang": ...}` to `<base_url>/v1/translate`
/// and expects `{"text": ...}` back. The blocking client is deliberate:
/// translation runs inside the server's blocking segment worker.
pub struct HttpTranslator {
    base_url: String,
    api_key: Option<String>,
    target_lang: String,
    http: reqwest::blocking::Client,
}

impl HttpTranslator {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, target_lang: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            target_lang: target_lang.into(),
            http: reqwest::blocking::Client::new(),
        }
    }
}

impl Translator for HttpTranslator {
    fn translate(&self, text: &str) -> Result<String> {
        let url = format!("{}/v1/translate", self.base_url.trim_end_matches('/'));
        let request = TranslateRequest {
            text,
            target_lang: &self.target_lang,
        };

        let mut builder = self.http.post(url.as_str()).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder.send().map_err(|e| DolmetschError::Translation {
            message: format!("request to {} failed: {}", url, e),
        })?;

        if !response.status().is_success() {
            return Err(DolmetschError::Translation {
                message: format!("HTTP {} from {}", response.status(), url),
            });
        }

        let body: TranslateResponse =
            response.json().map_err(|e| DolmetschError::Translation {
                message: format!("invalid response body: {}", e),
            })?;
        Ok(body.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_translates_with_prefix() {
        let translator = MockTranslator::new();
        assert_eq!(translator.translate("hallo").unwrap(), "[en] hallo");
        assert_eq!(translator.call_count(), 1);
    }

    #[test]
    fn test_mock_failing() {
        let translator = MockTranslator::new().failing();
        assert!(translator.translate("hallo").is_err());
    }

    #[test]
    fn test_http_translator_url_normalization() {
        let translator = HttpTranslator::new("http://localhost:9000/", None, "EN-GB");
        // Trailing slash must not produce a double slash in the request URL.
        assert_eq!(translator.base_url, "http://localhost:9000/");
        assert_eq!(
            format!("{}/v1/translate", translator.base_url.trim_end_matches('/')),
            "http://localhost:9000/v1/translate"
        );
    }
}
