//! Settings for the monitor, read from an optional [ron] file and then
//! overridden by whatever was given on the command line.
//!
//! A config file only needs the fields it wants to change:
//!
//! ```text
//! (
//!     ip: "192.168.37.1",
//!     port: 5005,
//!     tick_rate: 120.0,
//!     sound_directory: "soundCues",
//! )
//! ```

use crate::args::MonitorArgs;
use crate::cues::CUE_FILES;
use crate::frame_decoder::N_CUES;

use serde::{Deserialize, Serialize};
use std::{
    borrow::Cow,
    fmt, fs, io,
    net::{SocketAddr, ToSocketAddrs},
    path::{Path, PathBuf},
};

/// Everything the monitor needs to know before it starts.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Host name or address to listen on
    pub ip: String,
    /// UDP port to listen on
    pub port: u16,
    /// Display and ingestion ticks per second
    pub tick_rate: f64,
    /// Directory holding the cue WAV files
    pub sound_directory: PathBuf,
    /// Cue file names, one per trigger index
    pub cue_files: Vec<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            ip: "localhost".to_owned(),
            port: 5005,
            tick_rate: 60.0,
            sound_directory: PathBuf::from("soundCues"),
            cue_files: CUE_FILES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Returned when a [MonitorConfig] cannot be read or makes no sense.
#[derive(Debug)]
pub enum ConfigError {
    /// Reading the config file failed.
    IoError(io::Error),

    /// The config file is not valid ron.
    RonSpannedError(ron::de::SpannedError),

    /// The cue table does not have one entry per trigger.
    CueCount(usize),

    /// The tick rate is not a positive number.
    TickRate(f64),

    /// `ip:port` did not resolve to anything, with the resolver's own
    /// error when it gave one.
    Unresolved(String, Option<io::Error>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ConfigError as CE;
        let msg = match self {
            CE::IoError(error) => Cow::from(format!("io error: {}", error)),
            CE::RonSpannedError(error) => Cow::from(format!("ron error: {}", error)),
            CE::CueCount(n) => Cow::from(format!("expected {} cue files, found {}", N_CUES, n)),
            CE::TickRate(r) => Cow::from(format!("tick rate must be positive, got {}", r)),
            CE::Unresolved(addr, None) => Cow::from(format!("could not resolve {}", addr)),
            CE::Unresolved(addr, Some(error)) => {
                Cow::from(format!("could not resolve {}: {}", addr, error))
            }
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for ConfigError {}

impl From<io::Error> for ConfigError {
    fn from(value: io::Error) -> Self {
        Self::IoError(value)
    }
}

impl From<ron::de::SpannedError> for ConfigError {
    fn from(value: ron::de::SpannedError) -> Self {
        Self::RonSpannedError(value)
    }
}

impl MonitorConfig {
    /// Parse a config from ron text.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::de::from_str(text)?;
        config.validate()
    }

    /// Read a config from the file at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_ron(&fs::read_to_string(path)?)
    }

    /// Start from the file named by `--config` (or the defaults), then apply
    /// every other flag on top.
    pub fn from_args(args: &MonitorArgs) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::from_path(path)?,
            None => Self::default(),
        };

        if let Some(ip) = &args.ip {
            config.ip = ip.clone();
        }
        if let Some(port) = args.port {
            config.port = port;
        }
        if let Some(rate) = args.rate {
            config.tick_rate = rate;
        }
        if let Some(dir) = &args.sounds {
            config.sound_directory = dir.clone();
        }

        config.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.cue_files.len() != N_CUES {
            return Err(ConfigError::CueCount(self.cue_files.len()));
        }
        if !(self.tick_rate > 0.0 && self.tick_rate.is_finite()) {
            return Err(ConfigError::TickRate(self.tick_rate));
        }
        Ok(self)
    }

    /// Resolve `ip:port`, preferring an IPv4 address when the name maps to
    /// several.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let unresolved =
            |error| ConfigError::Unresolved(format!("{}:{}", self.ip, self.port), error);
        let addrs: Vec<SocketAddr> = (self.ip.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| unresolved(Some(e)))?
            .collect();

        addrs
            .iter()
            .find(|a| a.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
            .ok_or_else(|| unresolved(None))
    }
}
