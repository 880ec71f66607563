//! Facial expressions parsed from `*.exp3.json`.
//!
//! An expression never finishes on its own; it stays applied until a newer
//! expression fades it out.

use serde::Deserialize;

use crate::error::ClipError;
use crate::ids::{IdRegistry, ParamId};
use crate::motion::{Playable, PlaybackContext};
use crate::params::ParameterBuffer;

const DEFAULT_FADE_SECONDS: f32 = 1.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum BlendMode {
    #[default]
    Add,
    Multiply,
    Overwrite,
}

#[derive(Clone, Debug)]
pub struct ExpressionParameter {
    pub id: ParamId,
    pub value: f32,
    pub blend: BlendMode,
}

#[derive(Clone, Debug)]
pub struct ExpressionClip {
    pub name: String,
    pub fade_in: f32,
    pub fade_out: f32,
    pub parameters: Vec<ExpressionParameter>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawExpression {
    #[serde(default)]
    fade_in_time: Option<f32>,
    #[serde(default)]
    fade_out_time: Option<f32>,
    #[serde(default)]
    parameters: Vec<RawParameter>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawParameter {
    id: String,
    value: f32,
    #[serde(default)]
    blend: BlendMode,
}

impl ExpressionClip {
    pub fn parse(name: &str, bytes: &[u8], ids: &IdRegistry) -> Result<Self, ClipError> {
        let raw: RawExpression = serde_json::from_slice(bytes)?;
        let fade = |v: Option<f32>| v.filter(|v| *v >= 0.0).unwrap_or(DEFAULT_FADE_SECONDS);
        Ok(Self {
            name: name.to_string(),
            fade_in: fade(raw.fade_in_time),
            fade_out: fade(raw.fade_out_time),
            parameters: raw
                .parameters
                .into_iter()
                .map(|p| ExpressionParameter {
                    id: ids.get(&p.id),
                    value: p.value,
                    blend: p.blend,
                })
                .collect(),
        })
    }
}

impl Playable for ExpressionClip {
    fn duration(&self) -> Option<f32> {
        None
    }

    fn fade_in_seconds(&self) -> f32 {
        self.fade_in
    }

    fn fade_out_seconds(&self) -> f32 {
        self.fade_out
    }

    fn apply(&self, params: &mut ParameterBuffer, ctx: &PlaybackContext) {
        let w = ctx.fade_weight();
        for p in &self.parameters {
            match p.blend {
                BlendMode::Add => params.add_value(&p.id, p.value, w),
                BlendMode::Multiply => params.multiply_value(&p.id, p.value, w),
                BlendMode::Overwrite => params.set_value(&p.id, p.value, w),
            }
        }
    }
}
