//! Decoded rig description and the decoder seam.
//!
//! The binary rig format is owned by an external decoder. The runtime only
//! needs the canvas size plus the parameter and part tables.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanvasInfo {
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    pub id: String,
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl ParameterDef {
    pub fn new(id: &str, min: f32, max: f32, default: f32) -> Self {
        Self {
            id: id.to_string(),
            min,
            max,
            default,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartDef {
    pub id: String,
    #[serde(default = "full_opacity")]
    pub opacity: f32,
}

fn full_opacity() -> f32 {
    1.0
}

impl PartDef {
    pub fn new(id: &str, opacity: f32) -> Self {
        Self {
            id: id.to_string(),
            opacity,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rig {
    pub canvas: CanvasInfo,
    #[serde(default)]
    pub parameters: Vec<ParameterDef>,
    #[serde(default)]
    pub parts: Vec<PartDef>,
}

/// Decodes rig bytes fetched by the loader.
pub trait RigDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Rig, String>;
}
