//! Part switching from `*.pose3.json`.
//!
//! Each group lists mutually exclusive parts (for example two arm variants).
//! A part is requested by driving the parameter that shares its id above zero;
//! the requested part fades in and the others fade out behind it. Linked parts
//! mirror the opacity of the part that lists them.

use serde::Deserialize;

use crate::error::ClipError;
use crate::ids::{IdRegistry, PartId};
use crate::params::ParameterBuffer;

const DEFAULT_FADE_IN_SECONDS: f32 = 0.5;
const EPSILON: f32 = 0.001;
const PHI: f32 = 0.5;
const BACK_OPACITY_THRESHOLD: f32 = 0.15;

#[derive(Clone, Debug)]
struct PosePart {
    id: PartId,
    parameter_index: usize,
    part_index: Option<usize>,
    links: Vec<PosePart>,
}

#[derive(Clone, Debug)]
pub struct Pose {
    groups: Vec<Vec<PosePart>>,
    fade_in_seconds: f32,
    initialized: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPose {
    #[serde(default)]
    fade_in_time: Option<f32>,
    #[serde(default)]
    groups: Vec<Vec<RawPart>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPart {
    id: String,
    #[serde(default)]
    link: Vec<String>,
}

fn bind(id: &str, ids: &IdRegistry, params: &mut ParameterBuffer) -> PosePart {
    let id = ids.get(id);
    PosePart {
        parameter_index: params.ensure_index(&id),
        part_index: params.part_index_of(&id),
        id,
        links: Vec::new(),
    }
}

impl Pose {
    /// Parse and bind against `params`, registering one switch parameter per part.
    pub fn parse(
        bytes: &[u8],
        ids: &IdRegistry,
        params: &mut ParameterBuffer,
    ) -> Result<Self, ClipError> {
        let raw: RawPose = serde_json::from_slice(bytes)?;
        let fade_in_seconds = raw
            .fade_in_time
            .filter(|v| *v >= 0.0)
            .unwrap_or(DEFAULT_FADE_IN_SECONDS);
        let mut groups = Vec::with_capacity(raw.groups.len());
        for g in raw.groups {
            if g.is_empty() {
                return Err(ClipError::Invalid("pose group without parts".into()));
            }
            let mut parts = Vec::with_capacity(g.len());
            for p in g {
                let mut part = bind(&p.id, ids, params);
                part.links = p.link.iter().map(|l| bind(l, ids, params)).collect();
                parts.push(part);
            }
            groups.push(parts);
        }
        Ok(Self {
            groups,
            fade_in_seconds,
            initialized: false,
        })
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Show the first part of every group and hide the rest.
    pub fn reset(&mut self, params: &mut ParameterBuffer) {
        for group in &self.groups {
            for (i, part) in group.iter().enumerate() {
                let v = if i == 0 { 1.0 } else { 0.0 };
                params.set_value_at(part.parameter_index, v, 1.0);
                if let Some(pi) = part.part_index {
                    params.set_part_opacity_at(pi, v);
                }
            }
        }
        self.initialized = true;
    }

    pub fn update(&mut self, params: &mut ParameterBuffer, dt: f32) {
        if !self.initialized {
            self.reset(params);
        }
        let dt = dt.max(0.0);
        for group in &self.groups {
            self.fade_group(group, params, dt);
        }
        self.copy_linked_opacities(params);
    }

    fn fade_group(&self, group: &[PosePart], params: &mut ParameterBuffer, dt: f32) {
        let mut visible = None;
        let mut new_opacity = 1.0;
        for (i, part) in group.iter().enumerate() {
            if params.value_at(part.parameter_index) > EPSILON {
                if visible.is_some() {
                    break;
                }
                visible = Some(i);
                let current = part.part_index.map_or(0.0, |pi| params.part_opacity_at(pi));
                new_opacity = if self.fade_in_seconds > 0.0 {
                    (current + dt / self.fade_in_seconds).min(1.0)
                } else {
                    1.0
                };
            }
        }
        let visible = visible.unwrap_or_else(|| {
            new_opacity = 1.0;
            0
        });

        for (i, part) in group.iter().enumerate() {
            let Some(pi) = part.part_index else {
                continue;
            };
            if i == visible {
                params.set_part_opacity_at(pi, new_opacity);
                continue;
            }
            let mut opacity = params.part_opacity_at(pi);
            let mut a1 = if new_opacity < PHI {
                new_opacity * (PHI - 1.0) / PHI + 1.0
            } else {
                (1.0 - new_opacity) * PHI / (1.0 - PHI)
            };
            let back_opacity = (1.0 - a1) * (1.0 - new_opacity);
            if back_opacity > BACK_OPACITY_THRESHOLD {
                a1 = 1.0 - BACK_OPACITY_THRESHOLD / (1.0 - new_opacity);
            }
            if opacity > a1 {
                opacity = a1;
            }
            params.set_part_opacity_at(pi, opacity);
        }
    }

    fn copy_linked_opacities(&self, params: &mut ParameterBuffer) {
        for part in self.groups.iter().flatten() {
            let Some(pi) = part.part_index else {
                continue;
            };
            let opacity = params.part_opacity_at(pi);
            for link in &part.links {
                if let Some(li) = link.part_index {
                    params.set_part_opacity_at(li, opacity);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::{CanvasInfo, PartDef, Rig};

    const POSE: &str = r#"{
        "Type": "Live2D Pose",
        "FadeInTime": 0.5,
        "Groups": [[
            { "Id": "PartArmA", "Link": ["PartHandA"] },
            { "Id": "PartArmB", "Link": [] }
        ]]
    }"#;

    fn setup() -> (IdRegistry, ParameterBuffer) {
        let reg = IdRegistry::new();
        let rig = Rig {
            canvas: CanvasInfo {
                width: 1.0,
                height: 1.0,
            },
            parameters: vec![],
            parts: vec![
                PartDef::new("PartArmA", 1.0),
                PartDef::new("PartArmB", 1.0),
                PartDef::new("PartHandA", 1.0),
            ],
        };
        let p = ParameterBuffer::from_rig(&rig, &reg);
        (reg, p)
    }

    #[test]
    fn first_update_resets_groups() {
        let (reg, mut p) = setup();
        let mut pose = Pose::parse(POSE.as_bytes(), &reg, &mut p).unwrap();
        assert_eq!(pose.group_count(), 1);
        pose.update(&mut p, 0.0);
        assert_eq!(p.part_opacity(&reg.get("PartArmA")), Some(1.0));
        assert_eq!(p.part_opacity(&reg.get("PartArmB")), Some(0.0));
        assert_eq!(p.part_opacity(&reg.get("PartHandA")), Some(1.0));
    }

    #[test]
    fn switching_fades_the_new_part_in() {
        let (reg, mut p) = setup();
        let mut pose = Pose::parse(POSE.as_bytes(), &reg, &mut p).unwrap();
        pose.update(&mut p, 0.0);

        let arm_a = reg.get("PartArmA");
        let arm_b = reg.get("PartArmB");
        p.set_value(&arm_a, 0.0, 1.0);
        p.set_value(&arm_b, 1.0, 1.0);
        pose.update(&mut p, 0.1);
        let b = p.part_opacity(&arm_b).unwrap();
        assert!((b - 0.2).abs() < 1e-5);
        assert!(p.part_opacity(&arm_a).unwrap() <= 1.0);

        for _ in 0..10 {
            pose.update(&mut p, 0.1);
        }
        assert_eq!(p.part_opacity(&arm_b), Some(1.0));
        assert_eq!(p.part_opacity(&arm_a), Some(0.0));
        assert_eq!(p.part_opacity(&reg.get("PartHandA")), Some(0.0));
    }
}
