//! The per-tick driver that ties the receiver, the live state and the cue
//! player together.

use crate::cues::CuePlayer;
use crate::live_state::LiveState;
use crate::receiver::{FrameReceiver, TickReport};

use log::debug;

/// Running totals, mostly for the status line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Datagrams read off the socket
    pub datagrams: u64,
    /// Frames that replaced the live state
    pub applied: u64,
    /// Ticks that ended with a decode or socket error
    pub errors: u64,
}

/// Owns the [`LiveState`] and is the only thing that writes to it.
///
/// Each call to [`Monitor::tick`] first ingests from the network and then
/// lets the cue player react, so the audio side always sees a complete
/// frame.
pub struct Monitor<P>
where
    P: CuePlayer,
{
    receiver: FrameReceiver,
    state: LiveState,
    player: P,
    counters: Counters,
}

impl<P> Monitor<P>
where
    P: CuePlayer,
{
    /// Start from the default state.
    pub fn new(receiver: FrameReceiver, player: P) -> Self {
        Self {
            receiver,
            state: LiveState::new(),
            player,
            counters: Counters::default(),
        }
    }

    /// Ingest whatever arrived since the last tick, then fire cues.
    pub fn tick(&mut self) -> TickReport {
        let report = self.receiver.poll(&mut self.state);

        self.counters.datagrams += report.datagrams as u64;
        if report.applied {
            self.counters.applied += 1;
            debug!("Applied {:?}", self.state.frame());
        }
        if !report.errors.is_empty() {
            self.counters.errors += 1;
        }

        self.state.dispatch_cues(&mut self.player);

        report
    }

    /// Read-only view for the display
    pub fn state(&self) -> &LiveState {
        &self.state
    }

    #[allow(missing_docs)]
    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// The socket frames arrive on
    pub fn receiver(&self) -> &FrameReceiver {
        &self.receiver
    }

    #[allow(missing_docs)]
    pub fn player(&self) -> &P {
        &self.player
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cues::CueSignal;
    use crate::frame_decoder::{ExperimentFrame, N_CUES};
    use std::{net::UdpSocket, thread::sleep, time::Duration};

    #[derive(Default)]
    struct Recorder {
        signals: Vec<CueSignal>,
    }

    impl CuePlayer for Recorder {
        fn start(&mut self, cue: usize) {
            self.signals.push(CueSignal::Start(cue));
        }
        fn stop_all(&mut self) {
            self.signals.push(CueSignal::StopAll);
        }
    }

    fn setup() -> (Monitor<Recorder>, UdpSocket) {
        let receiver = FrameReceiver::bind("127.0.0.1:0").unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.connect(receiver.local_addr().unwrap()).unwrap();
        (Monitor::new(receiver, Recorder::default()), sender)
    }

    fn send(sender: &UdpSocket, triggers: &[usize], stop_all: bool) {
        let mut cue_triggers = [false; N_CUES];
        for &t in triggers {
            cue_triggers[t] = true;
        }
        let frame = ExperimentFrame {
            cue_triggers,
            stop_all,
            ..Default::default()
        };
        sender.send(&frame.to_bytes()).unwrap();
        sleep(Duration::from_millis(50));
    }

    #[test]
    fn cue_fires_once_across_ticks() {
        let (mut monitor, sender) = setup();

        send(&sender, &[3], false);
        monitor.tick();
        send(&sender, &[3], false);
        monitor.tick();
        monitor.tick();

        assert_eq!(monitor.player().signals, vec![CueSignal::Start(3)]);
        assert_eq!(
            monitor.counters(),
            Counters {
                datagrams: 2,
                applied: 2,
                errors: 0
            }
        );
    }

    #[test]
    fn stop_all_reaches_player_once() {
        let (mut monitor, sender) = setup();

        send(&sender, &[3], false);
        monitor.tick();
        send(&sender, &[], true);
        monitor.tick();

        assert_eq!(
            monitor.player().signals,
            vec![CueSignal::Start(3), CueSignal::StopAll]
        );
        assert!(!monitor.state().cue_playing()[3]);
    }

    #[test]
    fn one_stop_frame_is_one_stop() {
        let (mut monitor, sender) = setup();

        send(&sender, &[3], false);
        monitor.tick();
        send(&sender, &[], true);
        for _ in 0..4 {
            monitor.tick();
        }

        assert_eq!(
            monitor.player().signals,
            vec![CueSignal::Start(3), CueSignal::StopAll]
        );
        assert_eq!(monitor.counters().applied, 2);
    }

    #[test]
    fn junk_is_counted_and_ignored() {
        let (mut monitor, sender) = setup();

        sender.send(b"hello").unwrap();
        sleep(Duration::from_millis(50));
        let report = monitor.tick();

        assert!(!report.applied);
        assert_eq!(monitor.counters().errors, 1);
        assert_eq!(monitor.state(), &LiveState::new());
        assert!(monitor.player().signals.is_empty());
    }
}
