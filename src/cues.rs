//! The sound cues that experiment frames can trigger, and the seam between
//! the monitor and whatever actually produces sound.

use crate::frame_decoder::N_CUES;

use hound::{SampleFormat, WavReader};
use log::{debug, info};
use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

/// File names of the lab's cue table, in trigger-index order.
pub const CUE_FILES: [&str; N_CUES] = [
    "hold.wav",
    "in.wav",
    "out.wav",
    "match.wav",
    "relax.wav",
    "startingtrial.wav",
    "endingtrial.wav",
    "Out of Range.wav",
    "Wrong Direction.wav",
    "in.wav",
    "out.wav",
    "up.wav",
    "down.wav",
];

/// An instruction for the audio side, produced once per tick from the
/// current live state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueSignal {
    /// Start playing the cue with this index
    Start(usize),
    /// Silence every cue that is currently playing
    StopAll,
}

/// Anything that can act on [`CueSignal`]s.
pub trait CuePlayer {
    /// Begin playing cue `cue` from the start.
    fn start(&mut self, cue: usize);

    /// Stop every playing cue.
    fn stop_all(&mut self);

    /// Dispatch a signal to [`CuePlayer::start`] or [`CuePlayer::stop_all`].
    fn handle(&mut self, signal: CueSignal) {
        match signal {
            CueSignal::Start(cue) => self.start(cue),
            CueSignal::StopAll => self.stop_all(),
        }
    }
}

impl<P> CuePlayer for Box<P>
where
    P: CuePlayer + ?Sized,
{
    fn start(&mut self, cue: usize) {
        (**self).start(cue)
    }

    fn stop_all(&mut self) {
        (**self).stop_all()
    }
}

/// A [`CuePlayer`] that only writes the signals to the log. Used when
/// running muted or when the cue files could not be loaded.
#[derive(Debug, Default)]
pub struct LogPlayer {
    names: Vec<String>,
}

impl LogPlayer {
    /// Make a player that reports cues by the given names.
    pub fn new(names: &[String]) -> Self {
        Self {
            names: names.to_vec(),
        }
    }
}

impl CuePlayer for LogPlayer {
    fn start(&mut self, cue: usize) {
        match self.names.get(cue) {
            Some(name) => info!("cue {cue} ({name}) started"),
            None => info!("cue {cue} started"),
        }
    }

    fn stop_all(&mut self) {
        info!("all cues stopped");
    }
}

/// Errors raised while loading the cue table.
#[derive(Debug)]
pub enum CueError {
    /// The table does not have exactly [`N_CUES`] entries.
    WrongCount {
        /// Always [`N_CUES`]
        expected: usize,
        /// Entries that were supplied
        actual: usize,
    },
    /// A cue file could not be opened or decoded.
    Hound {
        /// The offending file
        path: PathBuf,
        /// What hound had to say about it
        error: hound::Error,
    },
}

impl fmt::Display for CueError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CueError::WrongCount { expected, actual } => {
                write!(f, "expected {expected} cue files, got {actual}")
            }
            CueError::Hound { path, error } => {
                write!(f, "could not load {}: {}", path.display(), error)
            }
        }
    }
}

impl std::error::Error for CueError {}

/// A pre-loaded sound cue, mixed down to mono `f32` samples in `-1.0..=1.0`.
#[derive(Debug, Clone)]
pub struct Cue {
    name: String,
    sample_rate: u32,
    samples: Arc<[f32]>,
}

impl Cue {
    /// Read a WAV file fully into memory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CueError> {
        let path = path.as_ref();
        let hound_err = |error| CueError::Hound {
            path: path.to_owned(),
            error,
        };

        let mut reader = WavReader::open(path).map_err(hound_err)?;
        let spec = reader.spec();

        let interleaved = match spec.sample_format {
            SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<Vec<f32>, hound::Error>>(),
            SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|s| s as f32 / scale))
                    .collect::<Result<Vec<f32>, hound::Error>>()
            }
        }
        .map_err(hound_err)?;

        let channels = usize::from(spec.channels.max(1));
        let samples: Vec<f32> = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        debug!(
            "loaded {name}: {} samples at {} Hz",
            samples.len(),
            spec.sample_rate
        );

        Ok(Self {
            name,
            sample_rate: spec.sample_rate,
            samples: samples.into(),
        })
    }

    /// File name the cue was loaded from
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Native sample rate of the file
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Mono samples, shared so voices can hold on to them cheaply
    pub fn samples(&self) -> &Arc<[f32]> {
        &self.samples
    }

    /// The same cue at `rate` Hz, by linear interpolation between
    /// neighbouring samples.
    pub fn resampled(&self, rate: u32) -> Cue {
        if rate == self.sample_rate || rate == 0 || self.sample_rate == 0 {
            return self.clone();
        }

        let step = f64::from(self.sample_rate) / f64::from(rate);
        let len = (self.samples.len() as u64 * u64::from(rate) / u64::from(self.sample_rate))
            as usize;
        let samples: Vec<f32> = (0..len)
            .map(|i| {
                let pos = i as f64 * step;
                let idx = pos as usize;
                let frac = (pos - idx as f64) as f32;
                let a = self.samples.get(idx).copied().unwrap_or(0.0);
                let b = self.samples.get(idx + 1).copied().unwrap_or(a);
                a + (b - a) * frac
            })
            .collect();

        Cue {
            name: self.name.clone(),
            sample_rate: rate,
            samples: samples.into(),
        }
    }
}

/// The full cue table, loaded up front so triggering a cue never touches
/// the disk.
#[derive(Debug, Clone)]
pub struct CueBank {
    cues: Vec<Cue>,
}

impl CueBank {
    /// Load every file in `names` from `dir`, in order.
    pub fn load(dir: impl AsRef<Path>, names: &[String]) -> Result<Self, CueError> {
        if names.len() != N_CUES {
            return Err(CueError::WrongCount {
                expected: N_CUES,
                actual: names.len(),
            });
        }

        let cues = names
            .iter()
            .map(|name| Cue::load(dir.as_ref().join(name)))
            .collect::<Result<Vec<_>, _>>()?;

        info!("Loaded {} / {} sounds successfully", cues.len(), names.len());

        Ok(Self { cues })
    }

    /// Look up a cue by trigger index.
    pub fn get(&self, cue: usize) -> Option<&Cue> {
        self.cues.get(cue)
    }

    /// Every cue, in trigger-index order
    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    /// The whole bank converted to `rate` Hz, see [`Cue::resampled`].
    pub fn resampled(&self, rate: u32) -> CueBank {
        CueBank {
            cues: self.cues.iter().map(|cue| cue.resampled(rate)).collect(),
        }
    }
}
