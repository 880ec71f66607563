//! Automatic eye blinking.
//!
//! Writes an openness value (1 = open, 0 = closed) to every bound eye id.

use rand::rngs::StdRng;
use rand::Rng;

use crate::ids::ParamId;
use crate::params::ParameterBuffer;

const BLINK_INTERVAL_SECONDS: f32 = 4.0;
const CLOSING_SECONDS: f32 = 0.1;
const CLOSED_SECONDS: f32 = 0.05;
const OPENING_SECONDS: f32 = 0.15;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlinkState {
    First,
    Interval,
    Closing,
    Closed,
    Opening,
}

#[derive(Debug)]
pub struct EyeBlink {
    ids: Vec<ParamId>,
    state: BlinkState,
    user_time: f32,
    state_start: f32,
    next_blink: f32,
    interval: f32,
    closing: f32,
    closed: f32,
    opening: f32,
    rng: StdRng,
}

impl EyeBlink {
    pub fn new(ids: Vec<ParamId>, rng: StdRng) -> Self {
        Self {
            ids,
            state: BlinkState::First,
            user_time: 0.0,
            state_start: 0.0,
            next_blink: 0.0,
            interval: BLINK_INTERVAL_SECONDS,
            closing: CLOSING_SECONDS,
            closed: CLOSED_SECONDS,
            opening: OPENING_SECONDS,
            rng,
        }
    }

    pub fn ids(&self) -> &[ParamId] {
        &self.ids
    }

    pub fn state(&self) -> BlinkState {
        self.state
    }

    pub fn set_blinking_interval(&mut self, seconds: f32) {
        self.interval = seconds;
    }

    pub fn set_blinking_settings(&mut self, closing: f32, closed: f32, opening: f32) {
        self.closing = closing;
        self.closed = closed;
        self.opening = opening;
    }

    fn next_blink_time(&mut self) -> f32 {
        let r: f32 = self.rng.gen();
        self.user_time + r * (2.0 * self.interval - 1.0)
    }

    fn phase(&self, span: f32) -> f32 {
        if span <= 0.0 {
            1.0
        } else {
            (self.user_time - self.state_start) / span
        }
    }

    pub fn update(&mut self, params: &mut ParameterBuffer, dt: f32) {
        self.user_time += dt;
        let value = match self.state {
            BlinkState::Closing => {
                let mut t = self.phase(self.closing);
                if t >= 1.0 {
                    t = 1.0;
                    self.state = BlinkState::Closed;
                    self.state_start = self.user_time;
                }
                1.0 - t
            }
            BlinkState::Closed => {
                if self.phase(self.closed) >= 1.0 {
                    self.state = BlinkState::Opening;
                    self.state_start = self.user_time;
                }
                0.0
            }
            BlinkState::Opening => {
                let mut t = self.phase(self.opening);
                if t >= 1.0 {
                    t = 1.0;
                    self.state = BlinkState::Interval;
                    self.next_blink = self.next_blink_time();
                }
                t
            }
            BlinkState::Interval => {
                if self.next_blink < self.user_time {
                    self.state = BlinkState::Closing;
                    self.state_start = self.user_time;
                }
                1.0
            }
            BlinkState::First => {
                self.state = BlinkState::Interval;
                self.next_blink = self.next_blink_time();
                1.0
            }
        };
        for id in &self.ids {
            params.set_value(id, value, 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdRegistry;
    use crate::rig::{CanvasInfo, ParameterDef, Rig};
    use rand::SeedableRng;

    #[test]
    fn cycles_through_a_full_blink() {
        let reg = IdRegistry::new();
        let rig = Rig {
            canvas: CanvasInfo {
                width: 1.0,
                height: 1.0,
            },
            parameters: vec![ParameterDef::new("ParamEyeLOpen", 0.0, 1.0, 1.0)],
            parts: vec![],
        };
        let eye = reg.get("ParamEyeLOpen");
        let mut p = ParameterBuffer::from_rig(&rig, &reg);
        let mut blink = EyeBlink::new(vec![eye.clone()], StdRng::seed_from_u64(3));

        blink.update(&mut p, 0.0);
        assert_eq!(blink.state(), BlinkState::Interval);
        assert_eq!(p.value(&eye), Some(1.0));

        // The next blink is due within 2 * 4 - 1 seconds.
        let mut saw_closed = false;
        for _ in 0..(8 * 60) {
            blink.update(&mut p, 1.0 / 60.0);
            if blink.state() == BlinkState::Closed {
                saw_closed = true;
                assert_eq!(p.value(&eye), Some(0.0));
            }
        }
        assert!(saw_closed);
    }
}
