//! Command implementations: the composition root wiring config, engines,
//! transport and presentation together.
//!
//! Commands are synchronous entry points; the ones that need async build
//! their own runtime. The blocking HTTP client (translation, uploads) is
//! created and used off the async runtime.

use crate::config::Config;
use crate::engine::{
    HttpTranslator, PassthroughTranslator, Transcriber, Translator, WhisperSettings,
    WhisperTranscriber,
};
use crate::error::{DolmetschError, Result};
use crate::protocol::{self, ResultMessage};
use crate::server::{self, AppState, SegmentPipeline};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Run the transcription server until interrupted.
pub fn run_serve(mut config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let (transcriber, translator) = build_engines(&config)?;
    let state = AppState {
        pipeline: Arc::new(SegmentPipeline::new(transcriber, translator)),
        window_size: config.window_size(),
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| DolmetschError::Server {
            message: format!("invalid bind address: {}", e),
        })?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server::http::serve(addr, state))
}

fn build_engines(config: &Config) -> Result<(Arc<dyn Transcriber>, Arc<dyn Translator>)> {
    let transcriber = WhisperTranscriber::new(WhisperSettings {
        model_path: config.server.model_path.clone(),
        language: config.server.language.clone(),
    })?;

    let translator: Arc<dyn Translator> = if config.translation.api_url.is_empty() {
        warn!("no translation API configured, captions stay in the source language");
        Arc::new(PassthroughTranslator)
    } else {
        Arc::new(HttpTranslator::new(
            config.translation.api_url.clone(),
            config.translation.api_key.clone(),
            config.translation.target_lang.clone(),
        ))
    };

    Ok((Arc::new(transcriber), translator))
}

/// Stream microphone audio to the server, printing captions as they come.
#[cfg(feature = "cpal-audio")]
pub fn run_stream(
    mut config: Config,
    endpoint: Option<String>,
    device: Option<String>,
) -> Result<()> {
    use crate::audio::capture::CpalSampleSource;
    use crate::client::{SessionConfig, StdoutSink, StreamSession};
    use tracing::info;

    if let Some(endpoint) = endpoint {
        config.stream.endpoint = endpoint;
    }
    if let Some(device) = device {
        config.audio.device = Some(device);
    }

    let source = CpalSampleSource::new(config.audio.device.as_deref())?;
    let session = StreamSession::new(SessionConfig::from_config(&config));

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let mut handle = session.start(source, Arc::new(StdoutSink)).await?;
        let interrupted = tokio::select! {
            _ = tokio::signal::ctrl_c() => true,
            _ = handle.closed() => false,
        };
        if interrupted {
            info!("interrupted, stopping");
            handle.stop();
        }
        handle.wait().await;
        Ok(())
    })
}

#[cfg(not(feature = "cpal-audio"))]
pub fn run_stream(
    _config: Config,
    _endpoint: Option<String>,
    _device: Option<String>,
) -> Result<()> {
    Err(DolmetschError::AudioCapture {
        message: "built without audio capture, rebuild with --features cpal-audio".to_string(),
    })
}

/// Upload a recording to the batch endpoint and print the transcription.
pub fn run_transcribe_file(
    mut config: Config,
    file: &Path,
    endpoint: Option<String>,
) -> Result<()> {
    if let Some(endpoint) = endpoint {
        config.stream.endpoint = endpoint;
    }
    let url = protocol::transcribe_url(&config.stream.endpoint);

    let form = reqwest::blocking::multipart::Form::new().file("file", file)?;
    let response = reqwest::blocking::Client::new()
        .post(url.as_str())
        .multipart(form)
        .send()
        .map_err(|e| DolmetschError::Transport {
            message: format!("upload to {} failed: {}", url, e),
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().unwrap_or_default();
        return Err(DolmetschError::Transport {
            message: format!("HTTP {} from {}: {}", status, url, body),
        });
    }

    let body: ResultMessage = response.json().map_err(|e| DolmetschError::Transport {
        message: format!("invalid response body: {}", e),
    })?;
    println!("{}", body.transcription);
    Ok(())
}

/// List audio input devices.
#[cfg(feature = "cpal-audio")]
pub fn run_devices() -> Result<()> {
    let devices = crate::audio::capture::list_devices()?;
    if devices.is_empty() {
        println!("No audio input devices found.");
    } else {
        for device in devices {
            println!("{}", device);
        }
    }
    Ok(())
}

#[cfg(not(feature = "cpal-audio"))]
pub fn run_devices() -> Result<()> {
    Err(DolmetschError::AudioCapture {
        message: "built without audio capture, rebuild with --features cpal-audio".to_string(),
    })
}
