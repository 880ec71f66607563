//! Procedural effects layered on top of motion playback.

pub mod breath;
pub mod eye_blink;
pub mod pose;
pub mod target_point;

pub use breath::{Breath, BreathChannel};
pub use eye_blink::{BlinkState, EyeBlink};
pub use pose::Pose;
pub use target_point::TargetPoint;
