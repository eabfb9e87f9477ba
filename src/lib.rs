//! EMonitor is the subject-facing display for the force/torque matching
//! experiments in the lab. The control computer streams the current target
//! window and the measured value for both torque and force over UDP, along
//! with flags asking for recorded sound cues to be played. The monitor
//! draws torque as concentric circles and force as horizontal lines, and
//! plays the requested cues.
//!
//! The pieces, in the order data flows through them:
//!
//! - [frame_decoder] turns a 78 byte datagram into an
//!   [ExperimentFrame](frame_decoder::ExperimentFrame).
//! - [receiver] drains the socket once per tick and keeps only the newest
//!   frame.
//! - [live_state] holds that frame and turns held cue flags into one-shot
//!   start signals.
//! - [monitor] runs the tick; [geometry] and [cues] are what the display
//!   and the audio side read.
//!
//! The `sender` binary produces test frames for all of the above.

#![warn(missing_docs)]
pub mod args;
pub mod config;
pub mod cues;
pub mod frame_decoder;
pub mod geometry;
pub mod live_state;
pub mod monitor;
#[cfg(feature = "playback")]
pub mod playback;
pub mod receiver;
