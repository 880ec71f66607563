//! Parameter and part-opacity storage for one model.
//!
//! Three layers are kept per parameter:
//! - working values, mutated by every pipeline stage during a frame
//! - the saved baseline (`save` / `load`) used to undo idle drift
//! - the committed ("live") values the renderer reads after `commit`
//!
//! Rig parameters are clamped to their declared range on write. Virtual
//! parameters (registered by pose for part-switch flags) are unbounded.

use hashbrown::HashMap;

use crate::ids::{IdRegistry, ParamId, PartId};
use crate::rig::Rig;

#[derive(Clone, Debug, Default)]
pub struct ParameterBuffer {
    ids: Vec<ParamId>,
    index: HashMap<ParamId, usize>,
    minimums: Vec<f32>,
    maximums: Vec<f32>,
    defaults: Vec<f32>,
    values: Vec<f32>,
    saved: Vec<f32>,
    live: Vec<f32>,
    /// First index of virtual parameters; rig parameters live below it.
    rig_count: usize,

    part_ids: Vec<PartId>,
    part_index: HashMap<PartId, usize>,
    part_opacities: Vec<f32>,
    live_part_opacities: Vec<f32>,
}

impl ParameterBuffer {
    /// Build the buffer from a decoded rig, interning ids through the registry.
    pub fn from_rig(rig: &Rig, registry: &IdRegistry) -> Self {
        let mut buf = Self::default();
        for def in &rig.parameters {
            let id = registry.get(&def.id);
            let i = buf.ids.len();
            buf.index.insert(id.clone(), i);
            buf.ids.push(id);
            let (lo, hi) = if def.min <= def.max {
                (def.min, def.max)
            } else {
                (def.max, def.min)
            };
            buf.minimums.push(lo);
            buf.maximums.push(hi);
            let d = def.default.clamp(lo, hi);
            buf.defaults.push(d);
            buf.values.push(d);
        }
        buf.rig_count = buf.ids.len();
        buf.saved = buf.values.clone();
        buf.live = buf.values.clone();

        for part in &rig.parts {
            let id = registry.get(&part.id);
            buf.part_index.insert(id.clone(), buf.part_ids.len());
            buf.part_ids.push(id);
            buf.part_opacities.push(part.opacity.clamp(0.0, 1.0));
        }
        buf.live_part_opacities = buf.part_opacities.clone();
        buf
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[ParamId] {
        &self.ids
    }

    pub fn index_of(&self, id: &ParamId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Index for `id`, registering an unbounded virtual parameter (default 0) if absent.
    pub fn ensure_index(&mut self, id: &ParamId) -> usize {
        if let Some(i) = self.index_of(id) {
            return i;
        }
        let i = self.ids.len();
        self.index.insert(id.clone(), i);
        self.ids.push(id.clone());
        self.minimums.push(f32::MIN);
        self.maximums.push(f32::MAX);
        self.defaults.push(0.0);
        self.values.push(0.0);
        self.saved.push(0.0);
        self.live.push(0.0);
        i
    }

    /// (minimum, maximum, default)
    pub fn range_at(&self, i: usize) -> Option<(f32, f32, f32)> {
        Some((
            *self.minimums.get(i)?,
            *self.maximums.get(i)?,
            *self.defaults.get(i)?,
        ))
    }

    pub fn value(&self, id: &ParamId) -> Option<f32> {
        self.index_of(id).map(|i| self.values[i])
    }

    pub fn value_at(&self, i: usize) -> f32 {
        self.values.get(i).copied().unwrap_or(0.0)
    }

    /// `value = current * (1 - weight) + v * weight`, clamped for rig parameters.
    pub fn set_value_at(&mut self, i: usize, v: f32, weight: f32) {
        if i >= self.values.len() {
            return;
        }
        let v = if i < self.rig_count {
            v.clamp(self.minimums[i], self.maximums[i])
        } else {
            v
        };
        self.values[i] = if weight == 1.0 {
            v
        } else {
            self.values[i] * (1.0 - weight) + v * weight
        };
    }

    pub fn set_value(&mut self, id: &ParamId, v: f32, weight: f32) {
        if let Some(i) = self.index_of(id) {
            self.set_value_at(i, v, weight);
        }
    }

    /// `value += v * weight`
    pub fn add_value(&mut self, id: &ParamId, v: f32, weight: f32) {
        if let Some(i) = self.index_of(id) {
            let cur = self.values[i];
            self.set_value_at(i, cur + v * weight, 1.0);
        }
    }

    /// `value *= 1 + (v - 1) * weight`
    pub fn multiply_value(&mut self, id: &ParamId, v: f32, weight: f32) {
        if let Some(i) = self.index_of(id) {
            let cur = self.values[i];
            self.set_value_at(i, cur * (1.0 + (v - 1.0) * weight), 1.0);
        }
    }

    /// Snapshot working values as the restore baseline.
    pub fn save(&mut self) {
        self.saved.clone_from(&self.values);
    }

    /// Restore working values from the baseline.
    pub fn load(&mut self) {
        self.values.clone_from(&self.saved);
    }

    /// Replace NaN/infinite working values with their defaults. Returns the first offender.
    pub fn reset_non_finite(&mut self) -> Option<ParamId> {
        let mut first = None;
        for (i, v) in self.values.iter_mut().enumerate() {
            if !v.is_finite() {
                *v = self.defaults[i];
                first.get_or_insert_with(|| self.ids[i].clone());
            }
        }
        first
    }

    /// Publish working values and part opacities to the live buffer.
    pub fn commit(&mut self) {
        self.live.clone_from(&self.values);
        self.live_part_opacities.clone_from(&self.part_opacities);
    }

    pub fn live_values(&self) -> &[f32] {
        &self.live
    }

    pub fn live_value(&self, id: &ParamId) -> Option<f32> {
        self.index_of(id).map(|i| self.live[i])
    }

    // ----- parts -----

    pub fn part_count(&self) -> usize {
        self.part_ids.len()
    }

    pub fn part_index_of(&self, id: &PartId) -> Option<usize> {
        self.part_index.get(id).copied()
    }

    pub fn part_opacity_at(&self, i: usize) -> f32 {
        self.part_opacities.get(i).copied().unwrap_or(0.0)
    }

    pub fn set_part_opacity_at(&mut self, i: usize, opacity: f32) {
        if let Some(o) = self.part_opacities.get_mut(i) {
            *o = opacity.clamp(0.0, 1.0);
        }
    }

    pub fn part_opacity(&self, id: &PartId) -> Option<f32> {
        self.part_index_of(id).map(|i| self.part_opacities[i])
    }

    pub fn set_part_opacity(&mut self, id: &PartId, opacity: f32) {
        if let Some(i) = self.part_index_of(id) {
            self.set_part_opacity_at(i, opacity);
        }
    }

    pub fn live_part_opacities(&self) -> &[f32] {
        &self.live_part_opacities
    }
}
