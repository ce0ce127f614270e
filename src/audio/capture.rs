//! Microphone capture via `cpal`.
//!
//! [`AudioCapture`] wraps the cpal host/device/stream lifecycle for one
//! recording session.  Call [`AudioCapture::open`] with the session's desired
//! format, then [`AudioCapture::start`] to begin streaming [`AudioChunk`]s
//! over an mpsc channel.  The returned [`StreamHandle`] is a RAII guard —
//! dropping it closes the underlying cpal stream, which is how the session
//! controller tears the producer down on every exit path.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc;
use thiserror::Error;

// ---------------------------------------------------------------------------
// AudioChunk
// ---------------------------------------------------------------------------

/// A single buffer of raw audio as delivered by the cpal callback.
///
/// Samples are interleaved `f32` in the range `[-1.0, 1.0]`.  Chunks are
/// created on the audio thread, copied into the frame-buffer channel, and
/// never mutated after enqueue.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Interleaved PCM samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate of this chunk in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels (1 = mono, 2 = stereo, …).
    pub channels: u16,
}

// ---------------------------------------------------------------------------
// StreamHandle
// ---------------------------------------------------------------------------

/// RAII guard that keeps the cpal stream alive.
///
/// Dropping this value stops the underlying hardware stream and with it the
/// capture producer.
pub struct StreamHandle {
    _stream: cpal::Stream,
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while setting up or running the audio capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

/// Microphone capture device wrapper built on top of `cpal`.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::mpsc;
/// use voice_notes::audio::{AudioCapture, AudioChunk};
///
/// let (tx, rx) = mpsc::channel::<AudioChunk>();
/// let capture = AudioCapture::open(16_000, 1).unwrap();
/// let _handle = capture.start(tx).unwrap();
/// // `_handle` keeps the stream alive; drop it to stop recording.
/// ```
pub struct AudioCapture {
    device: cpal::Device,
    config: cpal::StreamConfig,
    /// Sample rate the stream will actually run at (Hz).
    sample_rate: u32,
    /// Number of interleaved channels the stream will actually deliver.
    channels: u16,
}

impl AudioCapture {
    /// Open the system default input device, requesting `sample_rate` Hz and
    /// `channels` interleaved channels.
    ///
    /// When the device does not advertise a matching f32 configuration, the
    /// device's own default configuration is used instead; the chunks the
    /// stream delivers carry the rate and channel count that actually apply,
    /// so downstream consumers never have to guess.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::NoDevice`] when no input device is available,
    /// or [`CaptureError::DefaultConfig`] when the device cannot report a
    /// default stream configuration.
    pub fn open(sample_rate: u32, channels: u16) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

        let supported = device.default_input_config()?;

        if let Some(config) = Self::matching_config(&device, sample_rate, channels) {
            return Ok(Self {
                device,
                config,
                sample_rate,
                channels,
            });
        }

        log::warn!(
            "input device does not support {sample_rate} Hz / {channels} ch; \
             falling back to {} Hz / {} ch",
            supported.sample_rate().0,
            supported.channels()
        );

        let fallback_channels = supported.channels();
        let fallback_rate = supported.sample_rate().0;
        let config: cpal::StreamConfig = supported.into();

        Ok(Self {
            device,
            config,
            sample_rate: fallback_rate,
            channels: fallback_channels,
        })
    }

    /// Look for a supported f32 input configuration matching the requested
    /// format.  Returns `None` when the device offers nothing suitable.
    fn matching_config(
        device: &cpal::Device,
        sample_rate: u32,
        channels: u16,
    ) -> Option<cpal::StreamConfig> {
        let ranges = device.supported_input_configs().ok()?;

        for range in ranges {
            if range.channels() != channels {
                continue;
            }
            if range.sample_format() != cpal::SampleFormat::F32 {
                continue;
            }
            if range.min_sample_rate().0 <= sample_rate
                && sample_rate <= range.max_sample_rate().0
            {
                let supported = range.with_sample_rate(cpal::SampleRate(sample_rate));
                return Some(supported.into());
            }
        }

        None
    }

    /// Start recording and send [`AudioChunk`]s to `tx`.
    ///
    /// The cpal callback runs on a dedicated audio thread; each time the
    /// hardware delivers a buffer the raw `f32` samples are wrapped in an
    /// [`AudioChunk`] and forwarded over the channel.  The enqueue never
    /// blocks (the channel is unbounded) and send errors (receiver dropped
    /// during teardown) are silently ignored so the audio thread never
    /// panics.
    ///
    /// Driver status reports (overruns, dropped buffers) are logged as
    /// warnings; capture continues.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::BuildStream`] or [`CaptureError::PlayStream`]
    /// if the platform rejects the stream configuration.
    pub fn start(&self, tx: mpsc::Sender<AudioChunk>) -> Result<StreamHandle, CaptureError> {
        let sample_rate = self.sample_rate;
        let channels = self.channels;

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let chunk = AudioChunk {
                    samples: data.to_vec(),
                    sample_rate,
                    channels,
                };
                // Ignore send errors; the receiver may have been dropped.
                let _ = tx.send(chunk);
            },
            |err: cpal::StreamError| {
                // Non-fatal: report and keep capturing.
                log::warn!("audio stream status: {err}");
            },
            None, // no timeout
        )?;

        stream.play()?;
        Ok(StreamHandle { _stream: stream })
    }

    /// Sample rate the capture stream will run at, in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved channels in each [`AudioChunk`].
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
