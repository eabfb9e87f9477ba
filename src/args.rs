// Commandline argument parsers using clap for the monitor and the sender

use clap::{ArgAction, Args, Parser};
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
/// Full-screen force/torque feedback display driven by UDP frames
pub struct MonitorArgs {
    /// ron file with monitor settings; flags below override it
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Address to listen on, usually the lab Ethernet adapter's IPv4 address
    #[arg(long = "ip")]
    pub ip: Option<String>,

    /// UDP port to listen on
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// How many times per second to poll the socket and redraw
    #[arg(short = 'r', long = "rate")]
    pub rate: Option<f64>,

    /// Directory containing the cue WAV files
    #[arg(short = 's', long = "sounds")]
    pub sounds: Option<PathBuf>,

    /// Log frames instead of drawing them
    #[arg(long)]
    pub headless: bool,

    /// Log cue signals instead of playing sound
    #[arg(short = 'm', long)]
    pub mute: bool,
}

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
/// Sends synthetic experiment frames to a running monitor
pub struct SenderArgs {
    /// Address of the monitor
    #[arg(long = "ip", default_value = "localhost")]
    pub ip: String,

    /// UDP port of the monitor
    #[arg(short = 'p', long = "port", default_value_t = 5005)]
    pub port: u16,

    #[command(flatten)]
    pub readings: ReadingArgs,

    /// Index of a cue to trigger, may be given several times
    #[arg(long = "cue")]
    pub cues: Vec<usize>,

    /// Ask the monitor to stop every playing cue
    #[arg(long)]
    pub stop: bool,

    /// Number of frames to send
    #[arg(short = 'n', long = "count", default_value_t = 1)]
    pub count: u32,

    /// Pause between frames, in milliseconds
    #[arg(short = 'i', long = "interval-ms", default_value_t = 10)]
    pub interval_ms: u64,

    /// Add uniform noise of up to this size to the measured values
    #[arg(short = 'j', long = "jitter", default_value_t = 0.0, value_parser = jitter)]
    pub jitter: f64,
}

fn jitter(arg: &str) -> Result<f64, String> {
    let value: f64 = arg.parse().map_err(|e| format!("{e}"))?;
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(format!("jitter must be a finite, non-negative number, got {value}"))
    }
}

/// The two readings carried by every frame
#[derive(Debug, Args, Clone)]
pub struct ReadingArgs {
    /// Torque target, low limit, up limit and measurement
    #[arg(
        long = "torque",
        num_args = 4,
        action = ArgAction::Set,
        allow_negative_numbers = true,
        value_names = ["TARGET", "LOW", "UP", "MEASURED"],
        default_values_t = [5.0, 4.0, 6.0, 5.5]
    )]
    pub torque: Vec<f64>,

    /// Force target, low limit, up limit and measurement
    #[arg(
        long = "force",
        num_args = 4,
        action = ArgAction::Set,
        allow_negative_numbers = true,
        value_names = ["TARGET", "LOW", "UP", "MEASURED"],
        default_values_t = [7.0, 6.0, 8.0, 6.45]
    )]
    pub force: Vec<f64>,
}
