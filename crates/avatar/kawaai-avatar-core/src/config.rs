//! Runtime configuration for the avatar core.

use serde::{Deserialize, Serialize};

use crate::effects::breath::BreathChannel;
use crate::ids::default_ids;

/// Per-character view placement. Source rigs are not uniformly centered, so each
/// character carries its own scale and translation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CharacterTransform {
    pub name: String,
    pub scale: f32,
    pub translate_x: f32,
    pub translate_y: f32,
}

impl CharacterTransform {
    fn row(name: &str, scale: f32, translate_x: f32, translate_y: f32) -> Self {
        Self {
            name: name.to_string(),
            scale,
            translate_x,
            translate_y,
        }
    }
}

/// Logical rectangle (left, right, bottom, top).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
}

impl Rect {
    pub const fn new(left: f32, right: f32, bottom: f32, top: f32) -> Self {
        Self {
            left,
            right,
            bottom,
            top,
        }
    }
}

/// View constants shared by every character.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub screen_rect: Rect,
    pub max_screen_rect: Rect,
    pub min_scale: f32,
    pub max_scale: f32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            screen_rect: Rect::new(-2.0, 2.0, -2.0, 2.0),
            max_screen_rect: Rect::new(-4.0, 4.0, -4.0, 4.0),
            min_scale: 0.8,
            max_scale: 2.0,
        }
    }
}

/// Gains applied by the drag look-at stage (degrees for angles, raw for eye balls).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragGains {
    pub angle_x: f32,
    pub angle_y: f32,
    pub angle_z: f32,
    pub body_angle_x: f32,
    pub eye_ball: f32,
}

impl Default for DragGains {
    fn default() -> Self {
        Self {
            angle_x: 30.0,
            angle_y: 30.0,
            angle_z: -30.0,
            body_angle_x: 10.0,
            eye_ball: 1.0,
        }
    }
}

/// Top-level configuration. Missing fields in JSON fall back to the defaults below.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Prefix for character directories, e.g. `/live2d/` + `Haru/`.
    pub resources_path: String,
    pub idle_group: String,
    pub tap_group: String,
    /// Delay between load completion and the first idle motion.
    pub idle_start_delay_secs: f32,
    /// Blend weight used when injecting the lip-sync value into mouth-open.
    pub lip_sync_weight: f32,
    pub drag: DragGains,
    pub view: ViewConfig,
    /// Row used when the active character has no entry in `characters`.
    pub default_character: CharacterTransform,
    pub characters: Vec<CharacterTransform>,
    pub breath: Vec<BreathChannel>,
    /// Seed for motion/expression selection and blink timing; `None` seeds from entropy.
    pub rng_seed: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            resources_path: "/live2d/".to_string(),
            idle_group: "Idle".to_string(),
            tap_group: "TapBody".to_string(),
            idle_start_delay_secs: 0.1,
            lip_sync_weight: 0.8,
            drag: DragGains::default(),
            view: ViewConfig::default(),
            default_character: CharacterTransform::row("default", 2.8, 0.5, 0.5),
            characters: vec![
                CharacterTransform::row("Wanko", 2.8, 0.95, 1.15),
                CharacterTransform::row("Mark", 2.8, 0.95, 0.95),
                CharacterTransform::row("Hiyori", 2.8, 0.5, 0.45),
                CharacterTransform::row("Mao", 2.8, 0.5, 0.5),
                CharacterTransform::row("Natori", 2.8, 0.5, 0.5),
            ],
            breath: vec![
                BreathChannel::new(default_ids::PARAM_ANGLE_X, 0.0, 15.0, 6.5345, 0.5),
                BreathChannel::new(default_ids::PARAM_ANGLE_Y, 0.0, 8.0, 3.5345, 0.5),
                BreathChannel::new(default_ids::PARAM_ANGLE_Z, 0.0, 10.0, 5.5345, 0.5),
                BreathChannel::new(default_ids::PARAM_BODY_ANGLE_X, 0.0, 4.0, 15.5345, 0.5),
                BreathChannel::new(default_ids::PARAM_BREATH, 0.5, 0.5, 3.2345, 1.0),
            ],
            rng_seed: None,
        }
    }
}

impl RuntimeConfig {
    /// Parse a (possibly partial) JSON override.
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Transform row for a character, falling back to `default_character`.
    pub fn character_transform(&self, name: &str) -> &CharacterTransform {
        self.characters
            .iter()
            .find(|c| c.name == name)
            .unwrap_or(&self.default_character)
    }
}
