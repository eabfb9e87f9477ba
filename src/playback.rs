//! Sound output for the cue bank through the default [cpal] output device.
//!
//! Only built with the `playback` feature, since it needs the platform audio
//! libraries at link time.

use crate::cues::{CueBank, CuePlayer};

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    FromSample, Sample, SampleFormat, SizedSample,
};
use log::{error, info, warn};
use std::{
    fmt,
    sync::{Arc, Mutex},
};

/// Things that can go wrong opening the output device.
#[derive(Debug)]
pub enum PlaybackError {
    /// The host has no default output device.
    NoDevice,
    /// The device would not report a usable configuration.
    Config(cpal::DefaultStreamConfigError),
    /// The device wants a sample type we cannot produce.
    Format(SampleFormat),
    /// The output stream could not be created.
    Build(cpal::BuildStreamError),
    /// The output stream could not be started.
    Play(cpal::PlayStreamError),
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackError::NoDevice => write!(f, "no default output device"),
            PlaybackError::Config(e) => write!(f, "output config: {e}"),
            PlaybackError::Format(format) => write!(f, "unsupported sample format {format}"),
            PlaybackError::Build(e) => write!(f, "output stream: {e}"),
            PlaybackError::Play(e) => write!(f, "starting output: {e}"),
        }
    }
}

impl std::error::Error for PlaybackError {}

#[derive(Debug)]
struct Voice {
    samples: Arc<[f32]>,
    pos: usize,
}

/// A [`CuePlayer`] that mixes every started cue into one output stream.
pub struct CpalPlayer {
    bank: CueBank,
    voices: Arc<Mutex<Vec<Voice>>>,
    // Dropping the stream stops the sound.
    _stream: cpal::Stream,
}

impl CpalPlayer {
    /// Open the default output device and start a silent stream.
    ///
    /// Every cue is converted to the device's sample rate up front.
    pub fn new(bank: CueBank) -> Result<Self, PlaybackError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(PlaybackError::NoDevice)?;
        let supported = device
            .default_output_config()
            .map_err(PlaybackError::Config)?;
        let format = supported.sample_format();
        let config = supported.config();

        let bank = bank.resampled(config.sample_rate);
        info!(
            "Output stream at {} Hz, {} channel(s), {}",
            config.sample_rate, config.channels, format
        );

        let voices: Arc<Mutex<Vec<Voice>>> = Arc::new(Mutex::new(Vec::new()));

        let stream = match format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, &voices),
            SampleFormat::I16 => build_stream::<i16>(&device, &config, &voices),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, &voices),
            SampleFormat::I32 => build_stream::<i32>(&device, &config, &voices),
            SampleFormat::F64 => build_stream::<f64>(&device, &config, &voices),
            other => return Err(PlaybackError::Format(other)),
        }?;
        stream.play().map_err(PlaybackError::Play)?;

        Ok(Self {
            bank,
            voices,
            _stream: stream,
        })
    }

    fn voices(&self) -> std::sync::MutexGuard<'_, Vec<Voice>> {
        match self.voices.lock() {
            Ok(v) => v,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Build an output stream that mixes `voices` down to one sample per frame
/// and writes it, converted to `T`, to every channel.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    voices: &Arc<Mutex<Vec<Voice>>>,
) -> Result<cpal::Stream, PlaybackError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = usize::from(config.channels.max(1));
    let mixer = Arc::clone(voices);

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let mut voices = match mixer.lock() {
                    Ok(v) => v,
                    Err(poisoned) => poisoned.into_inner(),
                };
                for frame in data.chunks_mut(channels) {
                    let mut sample = 0.0f32;
                    for voice in voices.iter_mut() {
                        if let Some(&s) = voice.samples.get(voice.pos) {
                            sample += s;
                            voice.pos += 1;
                        }
                    }
                    frame.fill(T::from_sample(sample.clamp(-1.0, 1.0)));
                }
                voices.retain(|v| v.pos < v.samples.len());
            },
            |e| error!("audio output: {}", e),
            None,
        )
        .map_err(PlaybackError::Build)
}

impl CuePlayer for CpalPlayer {
    fn start(&mut self, cue: usize) {
        match self.bank.get(cue) {
            Some(c) => {
                info!("Playing {}", c.name());
                self.voices().push(Voice {
                    samples: Arc::clone(c.samples()),
                    pos: 0,
                });
            }
            None => warn!("No cue loaded for index {}", cue),
        }
    }

    fn stop_all(&mut self) {
        info!("Stopping all cues");
        self.voices().clear();
    }
}
