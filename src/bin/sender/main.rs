//! Packs experiment frames the same way the lab control computer does and
//! sends them to a monitor. Useful for checking the display and the cue
//! table without the rig attached.

use clap::Parser;
use emonitor::{
    args::SenderArgs,
    frame_decoder::{ExperimentFrame, Reading, N_CUES},
};
use log::{debug, info};
use rand::prelude::*;
use std::{
    error::Error,
    net::{SocketAddr, ToSocketAddrs, UdpSocket},
    thread::sleep,
    time::Duration,
};

// Example:
// cargo run --bin sender --
//                        --ip     192.168.37.1
//                        --torque 5 4 6 5.5
//                        --cue    3
//                        --count  500 --jitter 0.5

fn reading(values: &[f64]) -> Result<Reading, Box<dyn Error>> {
    match values {
        &[target, low_limit, up_limit, measured] => Ok(Reading {
            target,
            low_limit,
            up_limit,
            measured,
        }),
        _ => Err(format!("expected 4 values for a reading, got {}", values.len()).into()),
    }
}

fn resolve(ip: &str, port: u16) -> Result<SocketAddr, Box<dyn Error>> {
    let addrs: Vec<SocketAddr> = (ip, port).to_socket_addrs()?.collect();
    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| format!("could not resolve {}:{}", ip, port).into())
}

fn jittered(reading: Reading, jitter: f64, rng: &mut impl Rng) -> Reading {
    if jitter <= 0.0 {
        return reading;
    }
    Reading {
        measured: reading.measured + rng.gen_range(-jitter..jitter),
        ..reading
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = SenderArgs::parse();

    let torque = reading(&args.readings.torque)?;
    let force = reading(&args.readings.force)?;

    let mut cue_triggers = [false; N_CUES];
    for &cue in &args.cues {
        let trigger = cue_triggers
            .get_mut(cue)
            .ok_or_else(|| format!("cue {} does not exist, there are {}", cue, N_CUES))?;
        *trigger = true;
    }

    let dest = resolve(&args.ip, args.port)?;
    let socket = if dest.is_ipv4() {
        UdpSocket::bind("0.0.0.0:0")?
    } else {
        UdpSocket::bind("[::]:0")?
    };

    let mut rng = thread_rng();
    for i in 0..args.count {
        let frame = ExperimentFrame {
            torque: jittered(torque, args.jitter, &mut rng),
            force: jittered(force, args.jitter, &mut rng),
            cue_triggers,
            stop_all: args.stop,
        };

        let sent = socket.send_to(&frame.to_bytes(), dest)?;
        debug!("Sent frame {} ({} bytes): {:?}", i, sent, frame);

        if i + 1 < args.count {
            sleep(Duration::from_millis(args.interval_ms));
        }
    }

    info!("Sent {} frame(s) to {}", args.count, dest);
    Ok(())
}
