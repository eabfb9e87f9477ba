mod gui;

use clap::Parser;
use emonitor::{
    args::MonitorArgs,
    config::MonitorConfig,
    cues::{CueBank, CuePlayer, LogPlayer},
    monitor::Monitor,
    receiver::FrameReceiver,
};
use gui::engage_gui;
use log::{info, warn};
use std::{
    error::Error,
    time::{Duration, Instant},
};

// Example:
// cargo run --bin emonitor --
//                          --ip      192.168.37.1
//                          --port    5005
//                          --sounds  soundCues

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = MonitorArgs::parse();
    let config = MonitorConfig::from_args(&args)?;

    let receiver = FrameReceiver::bind(config.bind_addr()?)?;
    info!("Listening for frames on {}", receiver.local_addr()?);

    let player = build_player(&args, &config);
    let mut monitor = Monitor::new(receiver, player);

    if args.headless {
        run_headless(&mut monitor, config.tick_rate);
    }

    engage_gui(&mut monitor, config.tick_rate)?;
    Ok(())
}

/// Pick the best available way of playing cues. A missing sound directory
/// should not keep the display from coming up, so every failure here falls
/// back to logging the cues.
fn build_player(args: &MonitorArgs, config: &MonitorConfig) -> Box<dyn CuePlayer> {
    let log_player = || Box::new(LogPlayer::new(&config.cue_files)) as Box<dyn CuePlayer>;

    if args.mute {
        return log_player();
    }

    let bank = match CueBank::load(&config.sound_directory, &config.cue_files) {
        Ok(bank) => bank,
        Err(e) => {
            warn!("Could not load sound cues, they will only be logged: {}", e);
            return log_player();
        }
    };

    open_output(bank).unwrap_or_else(log_player)
}

#[cfg(feature = "playback")]
fn open_output(bank: CueBank) -> Option<Box<dyn CuePlayer>> {
    match emonitor::playback::CpalPlayer::new(bank) {
        Ok(player) => Some(Box::new(player)),
        Err(e) => {
            warn!("Could not open audio output, cues will only be logged: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "playback"))]
fn open_output(bank: CueBank) -> Option<Box<dyn CuePlayer>> {
    info!(
        "{} cues loaded, but this build has no playback; cues will only be logged",
        bank.cues().len()
    );
    None
}

/// Tick forever without a display, logging each new frame and the
/// counters every few seconds.
fn run_headless<P: CuePlayer>(monitor: &mut Monitor<P>, tick_rate: f64) -> ! {
    let period = Duration::from_secs_f64(1.0 / tick_rate);
    let mut last_report = Instant::now();
    let mut last_frame = *monitor.state().frame();

    loop {
        let started = Instant::now();

        if monitor.tick().applied && monitor.state().frame() != &last_frame {
            last_frame = *monitor.state().frame();
            info!("{:?}", last_frame);
        }

        if last_report.elapsed() >= Duration::from_secs(5) {
            info!("{:?}", monitor.counters());
            last_report = Instant::now();
        }

        if let Some(remaining) = period.checked_sub(started.elapsed()) {
            spin_sleep::sleep(remaining);
        }
    }
}
