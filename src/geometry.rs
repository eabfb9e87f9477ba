//! Turns the live readings into the shapes the subject sees: concentric
//! circles for torque and horizontal lines for force.
//!
//! Everything here is in screen units with the origin at the bottom left.
//! A target of zero would make every ratio undefined, so it is read as
//! `1.0` here; the live state itself is never touched.

use crate::frame_decoder::Reading;
use crate::live_state::LiveState;

/// What a shape represents, which decides how it is coloured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The target itself
    Target,
    /// One edge of the acceptable window
    Limit,
    /// What the subject is currently producing
    Measured,
}

/// A circle centred on the screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ring {
    /// Radius in screen units
    pub radius: f64,
    #[allow(missing_docs)]
    pub role: Role,
}

/// A full-width horizontal line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HLine {
    /// Height above the bottom of the screen
    pub y: f64,
    #[allow(missing_docs)]
    pub role: Role,
}

/// Everything needed to draw one frame of the display.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// Screen width
    pub width: f64,
    /// Screen height
    pub height: f64,
    /// Horizontal centre
    pub center_x: f64,
    /// Vertical centre
    pub center_y: f64,
    /// Target and limit circles, largest first so smaller ones stay visible
    pub rings: Vec<Ring>,
    /// The circle following the measured torque
    pub measured_ring: Ring,
    /// Limit, measured and target lines for force
    pub lines: Vec<HLine>,
}

fn nonzero_target(reading: &Reading) -> f64 {
    if reading.target == 0.0 {
        1.0
    } else {
        reading.target
    }
}

impl Scene {
    /// Lay out the display for a `width` x `height` screen.
    pub fn layout(state: &LiveState, width: f64, height: f64) -> Self {
        let center_x = (width / 2.0).floor();
        let center_y = (height / 2.0).floor();

        let torque = state.torque();
        let torque_target = nonzero_target(torque);
        let target_radius = (height / 1.5).floor();
        let radius = |value: f64| (target_radius * value / torque_target).trunc();

        let mut rings = vec![
            Ring {
                radius: target_radius,
                role: Role::Target,
            },
            Ring {
                radius: radius(torque.low_limit),
                role: Role::Limit,
            },
            Ring {
                radius: radius(torque.up_limit),
                role: Role::Limit,
            },
        ];
        rings.sort_by(|a, b| b.radius.total_cmp(&a.radius));

        let measured_ring = Ring {
            radius: radius(torque.measured),
            role: Role::Measured,
        };

        let force = state.force();
        let force_target = nonzero_target(force);
        let line_y = |value: f64| center_y * value / force_target;

        let lines = vec![
            HLine {
                y: line_y(force.low_limit),
                role: Role::Limit,
            },
            HLine {
                y: line_y(force.up_limit),
                role: Role::Limit,
            },
            HLine {
                y: line_y(force.measured),
                role: Role::Measured,
            },
            HLine {
                y: center_y,
                role: Role::Target,
            },
        ];

        Self {
            width,
            height,
            center_x,
            center_y,
            rings,
            measured_ring,
            lines,
        }
    }
}
