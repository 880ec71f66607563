//! Fade-blended playback queue shared by body motions and expressions.
//!
//! Starting an entry asks every older entry to fade out. Entries are timed
//! against the queue's own clock, begin on the first update after they were
//! queued, and are dropped once their end time has passed.

use std::sync::Arc;

use crate::motion::{ease_sine, Playable, PlaybackContext};
use crate::params::ParameterBuffer;

/// Identifies one queued playback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MotionHandle(u64);

#[derive(Debug)]
struct QueueEntry {
    handle: MotionHandle,
    key: String,
    clip: Arc<dyn Playable>,
    started: bool,
    start_time: f32,
    fade_in_start: f32,
    end_time: Option<f32>,
    fade_out_requested: bool,
    finished: bool,
}

impl QueueEntry {
    fn begin(&mut self, now: f32) {
        self.started = true;
        self.start_time = now;
        self.fade_in_start = now;
        self.end_time = self.clip.duration().map(|d| now + d);
    }

    fn begin_fade_out(&mut self, now: f32) {
        let end = now + self.clip.fade_out_seconds();
        self.end_time = Some(match self.end_time {
            Some(e) if e < end => e,
            _ => end,
        });
    }

    fn context(&self, now: f32) -> PlaybackContext {
        let fade_in = self.clip.fade_in_seconds();
        let fade_in_weight = if fade_in <= 0.0 {
            1.0
        } else {
            ease_sine((now - self.fade_in_start) / fade_in)
        };
        let fade_out = self.clip.fade_out_seconds();
        let fade_out_weight = match self.end_time {
            Some(end) if fade_out > 0.0 => ease_sine((end - now) / fade_out),
            _ => 1.0,
        };
        PlaybackContext {
            user_time: now,
            start_time: self.start_time,
            fade_in_start: self.fade_in_start,
            end_time: self.end_time,
            fade_in_weight,
            fade_out_weight,
        }
    }
}

#[derive(Debug, Default)]
pub struct MotionQueue {
    entries: Vec<QueueEntry>,
    next_handle: u64,
    user_time: f32,
}

impl MotionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `clip` under `key`; every entry already queued starts fading out.
    pub fn start(&mut self, key: impl Into<String>, clip: Arc<dyn Playable>) -> MotionHandle {
        for e in &mut self.entries {
            e.fade_out_requested = true;
        }
        let handle = MotionHandle(self.next_handle);
        self.next_handle += 1;
        self.entries.push(QueueEntry {
            handle,
            key: key.into(),
            clip,
            started: false,
            start_time: 0.0,
            fade_in_start: 0.0,
            end_time: None,
            fade_out_requested: false,
            finished: false,
        });
        handle
    }

    /// Advance the queue clock by `dt` and apply every live entry in queue order.
    /// Returns `true` when at least one entry was applied.
    pub fn update(&mut self, params: &mut ParameterBuffer, dt: f32) -> bool {
        self.user_time += dt.max(0.0);
        let now = self.user_time;
        let mut updated = false;
        for e in self.entries.iter_mut().filter(|e| !e.finished) {
            if !e.started {
                e.begin(now);
            }
            if e.fade_out_requested {
                e.fade_out_requested = false;
                e.begin_fade_out(now);
            }
            let ctx = e.context(now);
            e.clip.apply(params, &ctx);
            updated = true;
            if e.end_time.is_some_and(|end| end < now) {
                e.finished = true;
            }
        }
        self.entries.retain(|e| !e.finished);
        updated
    }

    /// `true` when nothing is left to play.
    pub fn is_finished(&self) -> bool {
        self.entries.iter().all(|e| e.finished)
    }

    pub fn is_playing(&self, handle: MotionHandle) -> bool {
        self.entries
            .iter()
            .any(|e| e.handle == handle && !e.finished)
    }

    /// Key of the most recently queued live entry.
    pub fn current_key(&self) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| !e.finished)
            .map(|e| e.key.as_str())
    }

    pub fn current_handle(&self) -> Option<MotionHandle> {
        self.entries.iter().rev().find(|e| !e.finished).map(|e| e.handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stop_all(&mut self) {
        self.entries.clear();
    }

    pub fn user_time(&self) -> f32 {
        self.user_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdRegistry;
    use crate::rig::{CanvasInfo, ParameterDef, Rig};

    /// Writes its weight into one parameter.
    #[derive(Debug)]
    struct Probe {
        duration: Option<f32>,
        fade: f32,
        target: crate::ids::ParamId,
    }

    impl Playable for Probe {
        fn duration(&self) -> Option<f32> {
            self.duration
        }
        fn fade_in_seconds(&self) -> f32 {
            self.fade
        }
        fn fade_out_seconds(&self) -> f32 {
            self.fade
        }
        fn apply(&self, params: &mut ParameterBuffer, ctx: &PlaybackContext) {
            params.add_value(&self.target, ctx.fade_weight(), 1.0);
        }
    }

    fn buffer(reg: &IdRegistry) -> ParameterBuffer {
        let rig = Rig {
            canvas: CanvasInfo {
                width: 1.0,
                height: 1.0,
            },
            parameters: vec![ParameterDef::new("ParamW", 0.0, 10.0, 0.0)],
            parts: vec![],
        };
        ParameterBuffer::from_rig(&rig, reg)
    }

    #[test]
    fn finite_entry_finishes_and_is_removed() {
        let reg = IdRegistry::new();
        let mut p = buffer(&reg);
        let mut q = MotionQueue::new();
        let h = q.start(
            "Idle_0",
            Arc::new(Probe {
                duration: Some(0.5),
                fade: 0.0,
                target: reg.get("ParamW"),
            }),
        );
        assert!(!q.is_finished());
        assert!(q.update(&mut p, 0.1));
        assert_eq!(q.current_key(), Some("Idle_0"));
        assert!(q.update(&mut p, 0.3));
        assert!(q.is_playing(h));
        // end = 0.1 + 0.5 = 0.6; it finishes once the clock passes it.
        assert!(q.update(&mut p, 0.3));
        assert!(q.is_finished());
        assert!(q.is_empty());
        assert!(!q.update(&mut p, 0.1));
    }

    #[test]
    fn new_entry_fades_out_the_previous_one() {
        let reg = IdRegistry::new();
        let target = reg.get("ParamW");
        let mut p = buffer(&reg);
        let mut q = MotionQueue::new();
        q.start(
            "Expr_a",
            Arc::new(Probe {
                duration: None,
                fade: 0.5,
                target: target.clone(),
            }),
        );
        for _ in 0..10 {
            q.update(&mut p, 0.1);
        }
        q.start(
            "Expr_b",
            Arc::new(Probe {
                duration: None,
                fade: 0.5,
                target,
            }),
        );
        q.update(&mut p, 0.1);
        assert_eq!(q.len(), 2);
        assert_eq!(q.current_key(), Some("Expr_b"));
        for _ in 0..6 {
            q.update(&mut p, 0.1);
        }
        assert_eq!(q.len(), 1);
        assert_eq!(q.current_key(), Some("Expr_b"));
    }
}
