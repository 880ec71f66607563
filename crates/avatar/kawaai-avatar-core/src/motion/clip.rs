//! Motion clips parsed from `*.motion3.json`.

use serde::Deserialize;

use crate::error::ClipError;
use crate::ids::{IdRegistry, ParamId};
use crate::motion::curve::SegmentList;
use crate::motion::{ease_sine, Playable, PlaybackContext};
use crate::params::ParameterBuffer;

const DEFAULT_FADE_SECONDS: f32 = 1.0;
const EFFECT_EYE_BLINK: &str = "EyeBlink";
const EFFECT_LIP_SYNC: &str = "LipSync";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CurveTarget {
    /// Model-level effect curves (`EyeBlink`, `LipSync`).
    Model,
    Parameter,
    PartOpacity,
}

#[derive(Clone, Debug)]
pub struct MotionCurve {
    pub target: CurveTarget,
    pub id: ParamId,
    /// Per-curve fades; `None` inherits the clip-level fade.
    pub fade_in: Option<f32>,
    pub fade_out: Option<f32>,
    pub segments: SegmentList,
}

/// An immutable body motion. Fade overrides and effect ids are set while loading,
/// before the clip is shared.
#[derive(Clone, Debug)]
pub struct MotionClip {
    pub name: String,
    pub duration: f32,
    pub looping: bool,
    pub fade_in: f32,
    pub fade_out: f32,
    pub curves: Vec<MotionCurve>,
    eye_blink_ids: Vec<ParamId>,
    lip_sync_ids: Vec<ParamId>,
}

// ----- JSON schema (serde) -----

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawMotion {
    meta: RawMeta,
    #[serde(default)]
    curves: Vec<RawCurve>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawMeta {
    duration: f32,
    #[serde(rename = "Loop", default)]
    looping: bool,
    #[serde(default)]
    fade_in_time: Option<f32>,
    #[serde(default)]
    fade_out_time: Option<f32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawCurve {
    target: String,
    id: String,
    #[serde(default)]
    fade_in_time: Option<f32>,
    #[serde(default)]
    fade_out_time: Option<f32>,
    segments: Vec<f32>,
}

fn clip_fade(v: Option<f32>) -> f32 {
    match v {
        Some(v) if v >= 0.0 => v,
        _ => DEFAULT_FADE_SECONDS,
    }
}

fn curve_fade(v: Option<f32>) -> Option<f32> {
    v.filter(|v| *v >= 0.0)
}

impl MotionClip {
    pub fn parse(name: &str, bytes: &[u8], ids: &IdRegistry) -> Result<Self, ClipError> {
        let raw: RawMotion = serde_json::from_slice(bytes)?;
        if !raw.meta.duration.is_finite() || raw.meta.duration < 0.0 {
            return Err(ClipError::Invalid(format!(
                "duration must be finite and >= 0, got {}",
                raw.meta.duration
            )));
        }
        let mut curves = Vec::with_capacity(raw.curves.len());
        for c in raw.curves {
            let target = match c.target.as_str() {
                "Model" => CurveTarget::Model,
                "Parameter" => CurveTarget::Parameter,
                "PartOpacity" => CurveTarget::PartOpacity,
                other => {
                    return Err(ClipError::Invalid(format!("unknown curve target '{other}'")))
                }
            };
            let segments = SegmentList::parse(&c.segments).map_err(|reason| {
                ClipError::Segments {
                    curve: c.id.clone(),
                    reason,
                }
            })?;
            curves.push(MotionCurve {
                target,
                id: ids.get(&c.id),
                fade_in: curve_fade(c.fade_in_time),
                fade_out: curve_fade(c.fade_out_time),
                segments,
            });
        }
        Ok(Self {
            name: name.to_string(),
            duration: raw.meta.duration,
            looping: raw.meta.looping,
            fade_in: clip_fade(raw.meta.fade_in_time),
            fade_out: clip_fade(raw.meta.fade_out_time),
            curves,
            eye_blink_ids: Vec::new(),
            lip_sync_ids: Vec::new(),
        })
    }

    pub fn set_fade_in(&mut self, seconds: f32) {
        self.fade_in = seconds;
    }

    pub fn set_fade_out(&mut self, seconds: f32) {
        self.fade_out = seconds;
    }

    /// Bind the parameters that `EyeBlink` / `LipSync` effect curves drive.
    pub fn set_effect_ids(&mut self, eye_blink: &[ParamId], lip_sync: &[ParamId]) {
        self.eye_blink_ids = eye_blink.to_vec();
        self.lip_sync_ids = lip_sync.to_vec();
    }

    pub fn eye_blink_ids(&self) -> &[ParamId] {
        &self.eye_blink_ids
    }

    pub fn lip_sync_ids(&self) -> &[ParamId] {
        &self.lip_sync_ids
    }

    fn curve_weight(&self, curve: &MotionCurve, ctx: &PlaybackContext) -> f32 {
        if curve.fade_in.is_none() && curve.fade_out.is_none() {
            return ctx.fade_weight();
        }
        let fin = match curve.fade_in {
            None => ctx.fade_in_weight,
            Some(f) if f == 0.0 => 1.0,
            Some(f) => ease_sine((ctx.user_time - ctx.fade_in_start) / f),
        };
        let fout = match (curve.fade_out, ctx.end_time) {
            (None, _) => ctx.fade_out_weight,
            (Some(f), _) if f == 0.0 => 1.0,
            (Some(_), None) => 1.0,
            (Some(f), Some(end)) => ease_sine((end - ctx.user_time) / f),
        };
        fin * fout
    }
}

impl Playable for MotionClip {
    fn duration(&self) -> Option<f32> {
        if self.looping {
            None
        } else {
            Some(self.duration)
        }
    }

    fn fade_in_seconds(&self) -> f32 {
        self.fade_in
    }

    fn fade_out_seconds(&self) -> f32 {
        self.fade_out
    }

    fn apply(&self, params: &mut ParameterBuffer, ctx: &PlaybackContext) {
        let mut time = ctx.elapsed();
        if self.looping && self.duration > 0.0 {
            time %= self.duration;
        }

        let mut eye_blink_value = None;
        let mut lip_sync_value = None;
        for c in self.curves.iter().filter(|c| c.target == CurveTarget::Model) {
            match c.id.as_str() {
                EFFECT_EYE_BLINK => eye_blink_value = Some(c.segments.evaluate(time)),
                EFFECT_LIP_SYNC => lip_sync_value = Some(c.segments.evaluate(time)),
                _ => {}
            }
        }

        let mut blink_done = vec![false; self.eye_blink_ids.len()];
        let mut lip_done = vec![false; self.lip_sync_ids.len()];

        for c in self
            .curves
            .iter()
            .filter(|c| c.target == CurveTarget::Parameter)
        {
            let Some(i) = params.index_of(&c.id) else {
                continue;
            };
            let source = params.value_at(i);
            let mut value = c.segments.evaluate(time);

            if let Some(eb) = eye_blink_value {
                if let Some(j) = self.eye_blink_ids.iter().position(|id| *id == c.id) {
                    value *= eb;
                    blink_done[j] = true;
                }
            }
            if let Some(ls) = lip_sync_value {
                if let Some(j) = self.lip_sync_ids.iter().position(|id| *id == c.id) {
                    value += ls;
                    lip_done[j] = true;
                }
            }

            let w = self.curve_weight(c, ctx);
            params.set_value_at(i, source + (value - source) * w, 1.0);
        }

        // Bound effect ids without a dedicated curve follow the effect value directly.
        let fade = ctx.fade_weight();
        if let Some(eb) = eye_blink_value {
            for (id, _) in self
                .eye_blink_ids
                .iter()
                .zip(&blink_done)
                .filter(|(_, done)| !**done)
            {
                if let Some(i) = params.index_of(id) {
                    let source = params.value_at(i);
                    params.set_value_at(i, source + (eb - source) * fade, 1.0);
                }
            }
        }
        if let Some(ls) = lip_sync_value {
            for (id, _) in self
                .lip_sync_ids
                .iter()
                .zip(&lip_done)
                .filter(|(_, done)| !**done)
            {
                if let Some(i) = params.index_of(id) {
                    let source = params.value_at(i);
                    params.set_value_at(i, source + (ls - source) * fade, 1.0);
                }
            }
        }

        for c in self
            .curves
            .iter()
            .filter(|c| c.target == CurveTarget::PartOpacity)
        {
            params.set_part_opacity(&c.id, c.segments.evaluate(time));
        }
    }
}
