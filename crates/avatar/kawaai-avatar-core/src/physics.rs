//! Pendulum physics from `*.physics3.json`.
//!
//! Each setting normalizes a few input parameters into a translation and an
//! angle, swings a strand of particles with them, and writes the strand's
//! shape back into output parameters.

use std::f32::consts::PI;

use nalgebra::Vector2;
use serde::Deserialize;

use crate::error::ClipError;
use crate::ids::{IdRegistry, ParamId};
use crate::params::ParameterBuffer;

const AIR_RESISTANCE: f32 = 5.0;
const MAXIMUM_WEIGHT: f32 = 100.0;
const MOVEMENT_THRESHOLD: f32 = 0.001;
/// Physics was tuned at this frame rate; particle delay scales with it.
const REFERENCE_FPS: f32 = 30.0;

type Vec2 = Vector2<f32>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum SourceKind {
    X,
    Y,
    Angle,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NormalizationRange {
    pub minimum: f32,
    pub default: f32,
    pub maximum: f32,
}

#[derive(Clone, Debug)]
struct PhysicsInput {
    source: ParamId,
    weight: f32,
    kind: SourceKind,
    reflect: bool,
}

#[derive(Clone, Debug)]
struct PhysicsOutput {
    destination: ParamId,
    vertex_index: usize,
    scale: f32,
    weight: f32,
    kind: SourceKind,
    reflect: bool,
}

#[derive(Clone, Debug)]
struct Particle {
    mobility: f32,
    delay: f32,
    acceleration: f32,
    radius: f32,
    position: Vec2,
    last_position: Vec2,
    last_gravity: Vec2,
    velocity: Vec2,
}

#[derive(Clone, Debug)]
struct PhysicsSetting {
    inputs: Vec<PhysicsInput>,
    outputs: Vec<PhysicsOutput>,
    particles: Vec<Particle>,
    position_range: NormalizationRange,
    angle_range: NormalizationRange,
}

#[derive(Clone, Debug)]
pub struct PhysicsRig {
    settings: Vec<PhysicsSetting>,
    gravity: Vec2,
    wind: Vec2,
}

// ----- JSON schema (serde) -----

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPhysics {
    #[serde(default)]
    meta: RawMeta,
    physics_settings: Vec<RawSetting>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct RawMeta {
    #[serde(default)]
    effective_forces: Option<RawForces>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawForces {
    gravity: RawVec,
    wind: RawVec,
}

#[derive(Deserialize, Clone, Copy)]
#[serde(rename_all = "PascalCase")]
struct RawVec {
    x: f32,
    y: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawSetting {
    input: Vec<RawInput>,
    output: Vec<RawOutput>,
    vertices: Vec<RawVertex>,
    normalization: RawNormalization,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawTarget {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawInput {
    source: RawTarget,
    weight: f32,
    #[serde(rename = "Type")]
    kind: SourceKind,
    #[serde(default)]
    reflect: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawOutput {
    destination: RawTarget,
    vertex_index: usize,
    scale: f32,
    weight: f32,
    #[serde(rename = "Type")]
    kind: SourceKind,
    #[serde(default)]
    reflect: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawVertex {
    mobility: f32,
    delay: f32,
    acceleration: f32,
    radius: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawNormalization {
    position: NormalizationRange,
    angle: NormalizationRange,
}

fn build_strand(vertices: &[RawVertex]) -> Vec<Particle> {
    let rest_gravity = Vec2::new(0.0, 1.0);
    let mut particles: Vec<Particle> = Vec::with_capacity(vertices.len());
    for v in vertices {
        let position = match particles.last() {
            Some(prev) => prev.position + Vec2::new(0.0, v.radius),
            None => Vec2::zeros(),
        };
        particles.push(Particle {
            mobility: v.mobility,
            delay: v.delay,
            acceleration: v.acceleration,
            radius: v.radius,
            position,
            last_position: position,
            last_gravity: rest_gravity,
            velocity: Vec2::zeros(),
        });
    }
    particles
}

/// Signed angle in radians from `from` to `to`, wrapped to `[-π, π]`.
fn direction_to_radian(from: Vec2, to: Vec2) -> f32 {
    let mut r = to.y.atan2(to.x) - from.y.atan2(from.x);
    while r < -PI {
        r += 2.0 * PI;
    }
    while r > PI {
        r -= 2.0 * PI;
    }
    r
}

fn rotate(v: Vec2, radian: f32) -> Vec2 {
    let (s, c) = radian.sin_cos();
    Vec2::new(c * v.x - s * v.y, s * v.x + c * v.y)
}

/// Map a parameter value into a normalization range, mirrored around the
/// parameter's midpoint. The sign is flipped unless `inverted` is set.
fn normalize_parameter_value(
    value: f32,
    param_min: f32,
    param_max: f32,
    range: NormalizationRange,
    inverted: bool,
) -> f32 {
    let max_value = param_max.max(param_min);
    let min_value = param_max.min(param_min);
    let value = value.clamp(min_value, max_value);

    let min_norm = range.minimum.min(range.maximum);
    let max_norm = range.minimum.max(range.maximum);
    let middle_norm = range.default;
    let middle_value = min_value + (max_value - min_value) / 2.0;
    let offset = value - middle_value;

    let mut result = middle_norm;
    if offset > 0.0 {
        let p_len = max_value - middle_value;
        if p_len != 0.0 {
            result = offset * ((max_norm - middle_norm) / p_len) + middle_norm;
        }
    } else if offset < 0.0 {
        let p_len = min_value - middle_value;
        if p_len != 0.0 {
            result = offset * ((min_norm - middle_norm) / p_len) + middle_norm;
        }
    }
    if inverted {
        result
    } else {
        -result
    }
}

impl PhysicsRig {
    pub fn parse(bytes: &[u8], ids: &IdRegistry) -> Result<Self, ClipError> {
        let raw: RawPhysics = serde_json::from_slice(bytes)?;
        let (gravity, wind) = match raw.meta.effective_forces {
            Some(f) => (
                Vec2::new(f.gravity.x, f.gravity.y),
                Vec2::new(f.wind.x, f.wind.y),
            ),
            None => (Vec2::new(0.0, -1.0), Vec2::zeros()),
        };
        let mut settings = Vec::with_capacity(raw.physics_settings.len());
        for s in raw.physics_settings {
            if s.vertices.len() < 2 {
                return Err(ClipError::Invalid(
                    "physics strand needs at least two vertices".into(),
                ));
            }
            settings.push(PhysicsSetting {
                inputs: s
                    .input
                    .into_iter()
                    .map(|i| PhysicsInput {
                        source: ids.get(&i.source.id),
                        weight: i.weight,
                        kind: i.kind,
                        reflect: i.reflect,
                    })
                    .collect(),
                outputs: s
                    .output
                    .into_iter()
                    .map(|o| PhysicsOutput {
                        destination: ids.get(&o.destination.id),
                        vertex_index: o.vertex_index,
                        scale: o.scale,
                        weight: o.weight,
                        kind: o.kind,
                        reflect: o.reflect,
                    })
                    .collect(),
                particles: build_strand(&s.vertices),
                position_range: s.normalization.position,
                angle_range: s.normalization.angle,
            });
        }
        Ok(Self {
            settings,
            gravity,
            wind,
        })
    }

    pub fn setting_count(&self) -> usize {
        self.settings.len()
    }

    pub fn evaluate(&mut self, params: &mut ParameterBuffer, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let (gravity, wind) = (self.gravity, self.wind);
        for setting in &mut self.settings {
            let mut translation = Vec2::zeros();
            let mut angle = 0.0f32;
            for input in &setting.inputs {
                let Some(i) = params.index_of(&input.source) else {
                    continue;
                };
                let Some((min, max, _)) = params.range_at(i) else {
                    continue;
                };
                let weight = input.weight / MAXIMUM_WEIGHT;
                let range = match input.kind {
                    SourceKind::Angle => setting.angle_range,
                    SourceKind::X | SourceKind::Y => setting.position_range,
                };
                let n = normalize_parameter_value(params.value_at(i), min, max, range, input.reflect)
                    * weight;
                match input.kind {
                    SourceKind::X => translation.x += n,
                    SourceKind::Y => translation.y += n,
                    SourceKind::Angle => angle += n,
                }
            }

            let translation = rotate(translation, (-angle).to_radians());
            update_particles(
                &mut setting.particles,
                translation,
                angle,
                wind,
                MOVEMENT_THRESHOLD * setting.position_range.maximum,
                dt,
            );

            for output in &setting.outputs {
                let vi = output.vertex_index;
                if vi < 1 || vi >= setting.particles.len() {
                    continue;
                }
                let Some(pi) = params.index_of(&output.destination) else {
                    continue;
                };
                let particles = &setting.particles;
                let t = particles[vi].position - particles[vi - 1].position;
                let mut value = match output.kind {
                    SourceKind::X => t.x,
                    SourceKind::Y => t.y,
                    SourceKind::Angle => {
                        let parent = if vi >= 2 {
                            particles[vi - 1].position - particles[vi - 2].position
                        } else {
                            -gravity
                        };
                        direction_to_radian(parent, t)
                    }
                };
                if output.reflect {
                    value = -value;
                }
                params.set_value_at(
                    pi,
                    value * output.scale,
                    (output.weight / MAXIMUM_WEIGHT).min(1.0),
                );
            }
        }
    }
}

fn update_particles(
    strand: &mut [Particle],
    translation: Vec2,
    total_angle: f32,
    wind: Vec2,
    threshold: f32,
    dt: f32,
) {
    strand[0].position = translation;
    let radian = total_angle.to_radians();
    let gravity = Vec2::new(radian.sin(), radian.cos()).normalize();

    for i in 1..strand.len() {
        let prev = strand[i - 1].position;
        let p = &mut strand[i];
        let force = gravity * p.acceleration + wind;
        p.last_position = p.position;
        let delay = p.delay * dt * REFERENCE_FPS;

        let swing = direction_to_radian(p.last_gravity, gravity) / AIR_RESISTANCE;
        let direction = rotate(p.position - prev, swing);
        p.position = prev + direction + p.velocity * delay + force * delay * delay;

        let new_direction = (p.position - prev)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| Vec2::new(0.0, 1.0));
        p.position = prev + new_direction * p.radius;
        if p.position.x.abs() < threshold {
            p.position.x = 0.0;
        }
        if delay != 0.0 {
            p.velocity = (p.position - p.last_position) / delay * p.mobility;
        }
        p.last_gravity = gravity;
    }
}
