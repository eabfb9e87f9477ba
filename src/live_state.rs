//! The single owned snapshot of the experiment that the display and the
//! audio side read every tick.

use crate::cues::{CuePlayer, CueSignal};
use crate::frame_decoder::{ExperimentFrame, Reading, N_CUES};

/// The most recently accepted [`ExperimentFrame`], plus bookkeeping of which
/// cues have been started since the last stop.
///
/// Only [`LiveState::apply`] touches the frame, and it always replaces it
/// whole. Only [`LiveState::cue_signals`] touches `cue_playing`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LiveState {
    frame: ExperimentFrame,
    cue_playing: [bool; N_CUES],
    // Set by apply, cleared once the frame's cues have been signalled.
    fresh: bool,
}

impl LiveState {
    /// A state with every reading at `1.0` and every flag cleared.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything that came from the network with `frame`.
    pub fn apply(&mut self, frame: ExperimentFrame) {
        self.frame = frame;
        self.fresh = true;
    }

    /// The frame currently on display
    pub fn frame(&self) -> &ExperimentFrame {
        &self.frame
    }

    /// Torque window and measurement
    pub fn torque(&self) -> &Reading {
        &self.frame.torque
    }

    /// Force window and measurement
    pub fn force(&self) -> &Reading {
        &self.frame.force
    }

    /// Which cues have been started and not yet stopped
    pub fn cue_playing(&self) -> &[bool; N_CUES] {
        &self.cue_playing
    }

    /// Turn the level-triggered flags of the current frame into the signals
    /// the audio side should act on this tick.
    ///
    /// A cue is started only if it is not already marked as playing, so a
    /// trigger bit held high by the sender starts its cue once. When a frame
    /// carries both triggers and a stop, the starts come first.
    ///
    /// A stop is sent on the first tick after its frame arrives, and again
    /// on later ticks only if something has been started since.
    pub fn cue_signals(&mut self) -> Vec<CueSignal> {
        let mut signals = Vec::new();

        for (cue, (&trigger, playing)) in self
            .frame
            .cue_triggers
            .iter()
            .zip(self.cue_playing.iter_mut())
            .enumerate()
        {
            if trigger && !*playing {
                signals.push(CueSignal::Start(cue));
                *playing = true;
            }
        }

        let anything_playing = self.cue_playing.iter().any(|&p| p);
        if self.frame.stop_all && (self.fresh || anything_playing) {
            signals.push(CueSignal::StopAll);
            self.cue_playing = [false; N_CUES];
        }
        self.fresh = false;

        signals
    }

    /// Compute this tick's [`CueSignal`]s and hand them to `player` in order.
    pub fn dispatch_cues(&mut self, player: &mut impl CuePlayer) -> usize {
        let signals = self.cue_signals();
        for &signal in &signals {
            player.handle(signal);
        }
        signals.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with(triggers: &[usize], stop_all: bool) -> ExperimentFrame {
        let mut cue_triggers = [false; N_CUES];
        for &t in triggers {
            cue_triggers[t] = true;
        }
        ExperimentFrame {
            cue_triggers,
            stop_all,
            ..Default::default()
        }
    }

    #[test]
    fn starts_with_ones_and_nothing_set() {
        let state = LiveState::new();

        for reading in [state.torque(), state.force()] {
            assert_eq!(reading.target, 1.0);
            assert_eq!(reading.low_limit, 1.0);
            assert_eq!(reading.up_limit, 1.0);
            assert_eq!(reading.measured, 1.0);
        }
        assert_eq!(state.frame().cue_triggers, [false; N_CUES]);
        assert!(!state.frame().stop_all);
        assert_eq!(state.cue_playing(), &[false; N_CUES]);
    }

    #[test]
    fn apply_replaces_every_field() {
        let mut state = LiveState::new();
        let first = ExperimentFrame {
            torque: Reading {
                target: 5.0,
                low_limit: 4.0,
                up_limit: 6.0,
                measured: 5.5,
            },
            ..frame_with(&[0, 1], true)
        };
        state.apply(first);
        assert_eq!(state.frame(), &first);

        let second = frame_with(&[], false);
        state.apply(second);
        assert_eq!(state.frame(), &second);
        assert_eq!(state.torque().target, 1.0);
    }

    #[test]
    fn held_trigger_starts_once() {
        let mut state = LiveState::new();
        state.apply(frame_with(&[3], false));

        assert_eq!(state.cue_signals(), vec![CueSignal::Start(3)]);
        assert!(state.cue_playing()[3]);

        state.apply(frame_with(&[3], false));
        assert!(state.cue_signals().is_empty());
    }

    #[test]
    fn stop_all_clears_playing() {
        let mut state = LiveState::new();
        state.apply(frame_with(&[3], false));
        state.cue_signals();

        state.apply(frame_with(&[], true));
        assert_eq!(state.cue_signals(), vec![CueSignal::StopAll]);
        assert_eq!(state.cue_playing(), &[false; N_CUES]);
    }

    #[test]
    fn stop_frame_is_not_repeated_while_idle() {
        let mut state = LiveState::new();
        state.apply(frame_with(&[3], false));
        state.cue_signals();

        state.apply(frame_with(&[], true));
        assert_eq!(state.cue_signals(), vec![CueSignal::StopAll]);
        for _ in 0..5 {
            assert!(state.cue_signals().is_empty());
        }
    }

    #[test]
    fn stop_with_nothing_playing_is_sent_once() {
        let mut state = LiveState::new();
        state.apply(frame_with(&[], true));

        assert_eq!(state.cue_signals(), vec![CueSignal::StopAll]);
        assert!(state.cue_signals().is_empty());

        state.apply(frame_with(&[], true));
        assert_eq!(state.cue_signals(), vec![CueSignal::StopAll]);
    }

    #[test]
    fn held_trigger_and_stop_restart_every_tick() {
        let mut state = LiveState::new();
        state.apply(frame_with(&[4], true));

        for _ in 0..3 {
            assert_eq!(
                state.cue_signals(),
                vec![CueSignal::Start(4), CueSignal::StopAll]
            );
        }
    }

    #[test]
    fn starts_come_before_stop_in_one_frame() {
        let mut state = LiveState::new();
        state.apply(frame_with(&[1, 12], true));

        assert_eq!(
            state.cue_signals(),
            vec![CueSignal::Start(1), CueSignal::Start(12), CueSignal::StopAll]
        );
        assert_eq!(state.cue_playing(), &[false; N_CUES]);
    }

    #[test]
    fn held_trigger_restarts_after_stop() {
        let mut state = LiveState::new();
        state.apply(frame_with(&[2], false));
        state.cue_signals();
        state.apply(frame_with(&[], true));
        state.cue_signals();

        state.apply(frame_with(&[2], false));
        assert_eq!(state.cue_signals(), vec![CueSignal::Start(2)]);
    }

    #[test]
    fn dispatch_reaches_player() {
        #[derive(Default)]
        struct Recorder(Vec<CueSignal>);
        impl CuePlayer for Recorder {
            fn start(&mut self, cue: usize) {
                self.0.push(CueSignal::Start(cue));
            }
            fn stop_all(&mut self) {
                self.0.push(CueSignal::StopAll);
            }
        }

        let mut state = LiveState::new();
        let mut player = Recorder::default();
        state.apply(frame_with(&[5], false));

        assert_eq!(state.dispatch_cues(&mut player), 1);
        assert_eq!(state.dispatch_cues(&mut player), 0);
        assert_eq!(player.0, vec![CueSignal::Start(5)]);
    }
}
