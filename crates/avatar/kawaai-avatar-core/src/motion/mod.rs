//! Motion playback: curves, clips, expressions, the fade queue and the
//! priority-reserving manager.

pub mod clip;
pub mod curve;
pub mod expression;
pub mod manager;
pub mod queue;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::params::ParameterBuffer;

pub use clip::MotionClip;
pub use expression::ExpressionClip;
pub use manager::MotionManager;
pub use queue::{MotionHandle, MotionQueue};

/// Motion priority. Ordering matters: `None < Idle < Normal < Force`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    #[default]
    None = 0,
    Idle = 1,
    Normal = 2,
    Force = 3,
}

/// Timing of one queue entry for the current tick.
#[derive(Clone, Copy, Debug)]
pub struct PlaybackContext {
    pub user_time: f32,
    pub start_time: f32,
    pub fade_in_start: f32,
    /// `None` while the entry has no scheduled end (looping, no fade-out yet).
    pub end_time: Option<f32>,
    pub fade_in_weight: f32,
    pub fade_out_weight: f32,
}

impl PlaybackContext {
    pub fn fade_weight(&self) -> f32 {
        self.fade_in_weight * self.fade_out_weight
    }

    /// Seconds since the entry started, never negative.
    pub fn elapsed(&self) -> f32 {
        (self.user_time - self.start_time).max(0.0)
    }
}

/// Anything the queue can play: body motions and expressions.
pub trait Playable: Send + Sync + fmt::Debug {
    /// Playback length; `None` plays until faded out.
    fn duration(&self) -> Option<f32>;
    fn fade_in_seconds(&self) -> f32;
    fn fade_out_seconds(&self) -> f32;
    fn apply(&self, params: &mut ParameterBuffer, ctx: &PlaybackContext);
}

/// Sine ease clamped to [0, 1].
#[inline]
pub fn ease_sine(v: f32) -> f32 {
    if v <= 0.0 {
        0.0
    } else if v >= 1.0 {
        1.0
    } else {
        0.5 - 0.5 * (v * std::f32::consts::PI).cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_ordering() {
        assert!(Priority::None < Priority::Idle);
        assert!(Priority::Idle < Priority::Normal);
        assert!(Priority::Normal < Priority::Force);
    }

    #[test]
    fn ease_sine_endpoints() {
        assert_eq!(ease_sine(-1.0), 0.0);
        assert_eq!(ease_sine(2.0), 1.0);
        assert!((ease_sine(0.5) - 0.5).abs() < 1e-6);
    }
}
