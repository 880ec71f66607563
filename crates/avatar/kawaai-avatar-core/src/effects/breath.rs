//! Sinusoidal breathing.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::ids::{IdRegistry, ParamId};
use crate::params::ParameterBuffer;

/// One breathing channel: `offset + peak * sin(2π t / cycle)`, added with `weight`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BreathChannel {
    pub id: String,
    pub offset: f32,
    pub peak: f32,
    /// Period in seconds.
    pub cycle: f32,
    pub weight: f32,
}

impl BreathChannel {
    pub fn new(id: &str, offset: f32, peak: f32, cycle: f32, weight: f32) -> Self {
        Self {
            id: id.to_string(),
            offset,
            peak,
            cycle,
            weight,
        }
    }

    fn sample(&self, t: f32) -> f32 {
        if self.cycle == 0.0 {
            return self.offset;
        }
        self.offset + self.peak * (t * TAU / self.cycle).sin()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Breath {
    channels: Vec<(ParamId, BreathChannel)>,
    current_time: f32,
}

impl Breath {
    pub fn new(channels: &[BreathChannel], ids: &IdRegistry) -> Self {
        Self {
            channels: channels
                .iter()
                .map(|c| (ids.get(&c.id), c.clone()))
                .collect(),
            current_time: 0.0,
        }
    }

    pub fn channels(&self) -> impl Iterator<Item = &BreathChannel> {
        self.channels.iter().map(|(_, c)| c)
    }

    pub fn update(&mut self, params: &mut ParameterBuffer, dt: f32) {
        self.current_time += dt;
        for (id, c) in &self.channels {
            params.add_value(id, c.sample(self.current_time), c.weight);
        }
    }
}
