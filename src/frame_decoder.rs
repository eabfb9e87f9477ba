//! Decoding of the fixed-layout experiment frames sent by the lab control
//! computer. Every frame is exactly [`FRAME_LEN`] bytes:
//!
//! - `0..32`: torque target, low limit, up limit and measurement, as
//!   little-endian `f64`s
//! - `32..64`: the same four values for force
//! - `64..64 + N_CUES`: one byte per sound cue, nonzero means "play"
//! - `64 + N_CUES`: one byte, nonzero means "stop every playing cue"
//!
//! There is no header, checksum or version byte, so the only thing we can
//! validate is the length.

use nom::{
    bytes::complete::take,
    combinator::{all_consuming, map},
    number::complete::{le_f64, u8},
    sequence::tuple,
    Finish, IResult,
};

use std::fmt;

/// Number of sound cues addressed by a frame.
pub const N_CUES: usize = 13;

/// Length in bytes of an encoded [`ExperimentFrame`].
pub const FRAME_LEN: usize = 65 + N_CUES;

const READING_LEN: usize = 4 * 8;

/// One measured quantity together with the window the subject is asked to
/// stay within.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Value the subject should produce
    pub target: f64,
    /// Lower edge of the acceptable window
    pub low_limit: f64,
    /// Upper edge of the acceptable window
    pub up_limit: f64,
    /// Value currently being produced
    pub measured: f64,
}

impl Default for Reading {
    /// Every field is `1.0`, so ratios against the target come out as `1.0`
    /// before the first frame has been received.
    fn default() -> Self {
        Self {
            target: 1.0,
            low_limit: 1.0,
            up_limit: 1.0,
            measured: 1.0,
        }
    }
}

/// A single decoded datagram.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExperimentFrame {
    /// Torque target window and measurement
    pub torque: Reading,
    /// Force target window and measurement
    pub force: Reading,
    /// Per-cue play requests, index-aligned with the cue table
    pub cue_triggers: [bool; N_CUES],
    /// Request to silence every playing cue
    pub stop_all: bool,
}

/// Returned when a buffer cannot be turned into an [`ExperimentFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer was not exactly [`FRAME_LEN`] bytes long.
    BadLength {
        /// Always [`FRAME_LEN`]
        expected: usize,
        /// Length of the buffer that was handed in
        actual: usize,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecodeError::BadLength { expected, actual } => {
                write!(f, "expected a {expected} byte frame, got {actual} bytes")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

fn parse_reading(s: &[u8]) -> IResult<&[u8], Reading> {
    map(
        tuple((le_f64, le_f64, le_f64, le_f64)),
        |(target, low_limit, up_limit, measured)| Reading {
            target,
            low_limit,
            up_limit,
            measured,
        },
    )(s)
}

fn parse_flag(s: &[u8]) -> IResult<&[u8], bool> {
    map(u8, |b| b != 0)(s)
}

fn parse_cue_triggers(s: &[u8]) -> IResult<&[u8], [bool; N_CUES]> {
    map(take(N_CUES), |bytes: &[u8]| {
        let mut triggers = [false; N_CUES];
        for (trigger, &b) in triggers.iter_mut().zip(bytes) {
            *trigger = b != 0;
        }
        triggers
    })(s)
}

fn parse_frame(s: &[u8]) -> IResult<&[u8], ExperimentFrame> {
    map(
        tuple((parse_reading, parse_reading, parse_cue_triggers, parse_flag)),
        |(torque, force, cue_triggers, stop_all)| ExperimentFrame {
            torque,
            force,
            cue_triggers,
            stop_all,
        },
    )(s)
}

/// Decode one datagram. Anything that is not exactly [`FRAME_LEN`] bytes is
/// rejected as a whole.
pub fn decode(buf: &[u8]) -> Result<ExperimentFrame, DecodeError> {
    let bad_length = DecodeError::BadLength {
        expected: FRAME_LEN,
        actual: buf.len(),
    };

    if buf.len() != FRAME_LEN {
        return Err(bad_length);
    }

    all_consuming(parse_frame)(buf)
        .finish()
        .map(|(_remaining, frame)| frame)
        .map_err(|_: nom::error::Error<&[u8]>| bad_length)
}

impl ExperimentFrame {
    /// Pack the frame into its wire layout. Booleans are written as `0`/`1`.
    pub fn to_bytes(&self) -> [u8; FRAME_LEN] {
        let mut buf = [0u8; FRAME_LEN];

        for (i, reading) in [self.torque, self.force].iter().enumerate() {
            let fields = [
                reading.target,
                reading.low_limit,
                reading.up_limit,
                reading.measured,
            ];
            for (j, value) in fields.iter().enumerate() {
                let at = i * READING_LEN + j * 8;
                buf[at..at + 8].copy_from_slice(&value.to_le_bytes());
            }
        }

        for (i, &trigger) in self.cue_triggers.iter().enumerate() {
            buf[2 * READING_LEN + i] = trigger as u8;
        }
        buf[FRAME_LEN - 1] = self.stop_all as u8;

        buf
    }
}

impl TryFrom<&[u8]> for ExperimentFrame {
    type Error = DecodeError;
    fn try_from(buf: &[u8]) -> Result<Self, Self::Error> {
        decode(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn lab_packet() -> Vec<u8> {
        let mut buf = Vec::new();
        for v in [5.0f64, 4.0, 6.0, 5.5, 7.0, 6.0, 8.0, 6.45] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        buf.extend_from_slice(&[0; N_CUES]);
        buf.push(0);
        buf
    }

    #[test]
    fn frame_is_78_bytes() {
        assert_eq!(FRAME_LEN, 78);
    }

    #[test]
    fn decode_lab_packet() {
        let frame = decode(&lab_packet()).unwrap();

        assert_eq!(
            frame.torque,
            Reading {
                target: 5.0,
                low_limit: 4.0,
                up_limit: 6.0,
                measured: 5.5,
            }
        );
        assert_eq!(
            frame.force,
            Reading {
                target: 7.0,
                low_limit: 6.0,
                up_limit: 8.0,
                measured: 6.45,
            }
        );
        assert_eq!(frame.cue_triggers, [false; N_CUES]);
        assert!(!frame.stop_all);
    }

    #[test]
    fn any_nonzero_byte_is_true() {
        let mut buf = lab_packet();
        buf[64 + 3] = 1;
        buf[64 + 12] = 0x80;
        buf[FRAME_LEN - 1] = 0xFF;

        let frame = decode(&buf).unwrap();

        let mut expected = [false; N_CUES];
        expected[3] = true;
        expected[12] = true;
        assert_eq!(frame.cue_triggers, expected);
        assert!(frame.stop_all);
    }

    #[test]
    fn reads_little_endian_only() {
        let mut buf = lab_packet();
        buf[0..8].copy_from_slice(&5.0f64.to_be_bytes());

        let frame = decode(&buf).unwrap();
        assert_ne!(frame.torque.target, 5.0);
        assert_eq!(frame.torque.target, f64::from_le_bytes(5.0f64.to_be_bytes()));
    }

    #[test]
    fn every_other_length_is_rejected() {
        let buf = vec![0u8; 1461];
        for len in (0..buf.len()).filter(|&l| l != FRAME_LEN) {
            assert_eq!(
                decode(&buf[..len]),
                Err(DecodeError::BadLength {
                    expected: FRAME_LEN,
                    actual: len,
                })
            );
        }
    }

    #[test]
    fn padded_frame_is_rejected() {
        let mut buf = lab_packet();
        buf.push(0);
        assert!(matches!(
            decode(&buf),
            Err(DecodeError::BadLength { actual: 79, .. })
        ));
    }

    #[test]
    fn random_frames_survive_packing() {
        let mut rng = thread_rng();
        for _ in 0..100 {
            let mut cue_triggers = [false; N_CUES];
            cue_triggers.iter_mut().for_each(|t| *t = rng.gen());
            let frame = ExperimentFrame {
                torque: Reading {
                    target: rng.gen_range(-50.0..50.0),
                    low_limit: rng.gen_range(-50.0..50.0),
                    up_limit: rng.gen_range(-50.0..50.0),
                    measured: rng.gen_range(-50.0..50.0),
                },
                force: Reading {
                    target: rng.gen_range(-50.0..50.0),
                    low_limit: rng.gen_range(-50.0..50.0),
                    up_limit: rng.gen_range(-50.0..50.0),
                    measured: rng.gen_range(-50.0..50.0),
                },
                cue_triggers,
                stop_all: rng.gen(),
            };

            let decoded = ExperimentFrame::try_from(&frame.to_bytes()[..]).unwrap();
            assert_eq!(
                decoded.torque.measured.to_bits(),
                frame.torque.measured.to_bits()
            );
            assert_eq!(decoded, frame);
        }
    }

    #[test]
    fn packing_matches_hand_built_packet() {
        let frame = ExperimentFrame {
            torque: Reading {
                target: 5.0,
                low_limit: 4.0,
                up_limit: 6.0,
                measured: 5.5,
            },
            force: Reading {
                target: 7.0,
                low_limit: 6.0,
                up_limit: 8.0,
                measured: 6.45,
            },
            ..Default::default()
        };
        assert_eq!(frame.to_bytes().to_vec(), lab_packet());
    }
}
