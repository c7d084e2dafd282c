//! Real audio capture using CPAL (Cross-Platform Audio Library).
//!
//! Captures 16-bit PCM at 16kHz mono and slices it into fixed-size
//! [`SampleBlock`]s inside the device callback. Blocks are handed to the
//! pipeline over a bounded channel with `try_send`: the callback never
//! blocks, and a full channel drops the block and marks the next one as an
//! overrun.

use crate::audio::source::{SampleBlock, SampleSource};
use crate::defaults;
use crate::error::{DolmetschError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::warn;

/// Blocks buffered between the device callback and the pipeline.
const CHANNEL_CAPACITY: usize = 100;

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is owned by a single CpalSampleSource and only
/// accessed from one thread at a time; its methods are called synchronously.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Slices callback buffers into fixed-size blocks and forwards them.
///
/// Residual samples below one block length stay buffered for the next
/// callback, so block boundaries are independent of the device's buffer
/// size. Kept separate from the callback closure so it can be tested
/// without audio hardware.
struct BlockSlicer {
    pending: Vec<i16>,
    tx: Sender<SampleBlock>,
    overrun: bool,
}

impl BlockSlicer {
    fn new(tx: Sender<SampleBlock>) -> Self {
        Self {
            pending: Vec::with_capacity(defaults::BLOCK_SAMPLES * 2),
            tx,
            overrun: false,
        }
    }

    fn push(&mut self, samples: &[i16]) {
        self.pending.extend_from_slice(samples);
        while self.pending.len() >= defaults::BLOCK_SAMPLES {
            let rest = self.pending.split_off(defaults::BLOCK_SAMPLES);
            let block = SampleBlock {
                samples: std::mem::replace(&mut self.pending, rest),
                overrun: std::mem::take(&mut self.overrun),
            };
            match self.tx.try_send(block) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    // Consumer is behind. Drop this block, flag the next one.
                    self.overrun = true;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}

/// List all available audio input device names.
pub fn list_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| DolmetschError::AudioCapture {
            message: format!("Failed to enumerate input devices: {}", e),
        })?;

    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

/// Audio capture implementation backed by a cpal input stream.
///
/// Tries i16/16kHz/mono first (zero-copy path), then f32/16kHz/mono for
/// devices that only expose float formats.
pub struct CpalSampleSource {
    device: cpal::Device,
    stream: Option<SendableStream>,
    sample_rate: u32,
}

impl CpalSampleSource {
    /// Create a new cpal sample source.
    ///
    /// # Arguments
    /// * `device_name` - Optional device name. If None, uses the default
    ///   input device.
    pub fn new(device_name: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();

        let device = if let Some(name) = device_name {
            let mut devices = host
                .input_devices()
                .map_err(|e| DolmetschError::AudioCapture {
                    message: format!("Failed to enumerate devices: {}", e),
                })?;
            devices
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| DolmetschError::AudioDeviceNotFound {
                    device: name.to_string(),
                })?
        } else {
            host.default_input_device()
                .ok_or_else(|| DolmetschError::AudioDeviceNotFound {
                    device: "default".to_string(),
                })?
        };

        Ok(Self {
            device,
            stream: None,
            sample_rate: defaults::SAMPLE_RATE,
        })
    }

    fn build_stream(&self, tx: Sender<SampleBlock>) -> Result<cpal::Stream> {
        let config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            warn!(error = %err, "audio stream error");
        };

        // Try i16/16kHz/mono — PipeWire/PulseAudio convert transparently.
        let mut slicer = BlockSlicer::new(tx.clone());
        if let Ok(stream) = self.device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                slicer.push(data);
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        // Fall back to f32/16kHz/mono for float-only devices.
        let mut slicer = BlockSlicer::new(tx);
        self.device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let converted: Vec<i16> = data
                        .iter()
                        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                        .collect();
                    slicer.push(&converted);
                },
                err_callback,
                None,
            )
            .map_err(|e| DolmetschError::AudioCapture {
                message: format!("Failed to build input stream: {}", e),
            })
    }
}

impl SampleSource for CpalSampleSource {
    fn start(&mut self) -> Result<Receiver<SampleBlock>> {
        if self.stream.is_some() {
            return Err(DolmetschError::AudioCapture {
                message: "capture already started".to_string(),
            });
        }

        let (tx, rx) = crossbeam_channel::bounded(CHANNEL_CAPACITY);
        let stream = self.build_stream(tx)?;
        stream.play().map_err(|e| DolmetschError::AudioCapture {
            message: format!("Failed to start audio stream: {}", e),
        })?;
        self.stream = Some(SendableStream(stream));
        Ok(rx)
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            stream.0.pause().map_err(|e| DolmetschError::AudioCapture {
                message: format!("Failed to stop audio stream: {}", e),
            })?;
        }
        Ok(())
    }
}
