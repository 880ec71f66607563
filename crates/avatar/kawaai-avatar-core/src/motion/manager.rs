//! Priority bookkeeping on top of [`MotionQueue`].
//!
//! A caller first reserves a priority, then starts the clip. A reservation
//! succeeds only when the requested priority is strictly above both the one
//! already reserved and the one currently playing. `Force` callers skip the
//! check through [`MotionManager::set_reserve_priority`].

use std::sync::Arc;

use crate::motion::{MotionHandle, MotionQueue, Playable, Priority};
use crate::params::ParameterBuffer;

#[derive(Debug, Default)]
pub struct MotionManager {
    queue: MotionQueue,
    current_priority: Priority,
    reserve_priority: Priority,
}

impl MotionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_priority(&self) -> Priority {
        self.current_priority
    }

    pub fn reserve_priority(&self) -> Priority {
        self.reserve_priority
    }

    pub fn set_reserve_priority(&mut self, priority: Priority) {
        self.reserve_priority = priority;
    }

    /// Try to reserve `priority` for an upcoming start.
    pub fn reserve_motion(&mut self, priority: Priority) -> bool {
        if priority <= self.reserve_priority || priority <= self.current_priority {
            return false;
        }
        self.reserve_priority = priority;
        true
    }

    /// Start `clip` at `priority`, consuming a matching reservation.
    pub fn start_motion_priority(
        &mut self,
        key: impl Into<String>,
        clip: Arc<dyn Playable>,
        priority: Priority,
    ) -> MotionHandle {
        if priority == self.reserve_priority {
            self.reserve_priority = Priority::None;
        }
        self.current_priority = priority;
        self.queue.start(key, clip)
    }

    /// Advance playback. Returns `true` when any entry was applied this tick.
    pub fn update(&mut self, params: &mut ParameterBuffer, dt: f32) -> bool {
        let updated = self.queue.update(params, dt);
        if self.queue.is_finished() {
            self.current_priority = Priority::None;
        }
        updated
    }

    pub fn is_finished(&self) -> bool {
        self.queue.is_finished()
    }

    pub fn is_playing(&self, handle: MotionHandle) -> bool {
        self.queue.is_playing(handle)
    }

    pub fn current_key(&self) -> Option<&str> {
        self.queue.current_key()
    }

    pub fn current_handle(&self) -> Option<MotionHandle> {
        self.queue.current_handle()
    }

    pub fn stop_all(&mut self) {
        self.queue.stop_all();
        self.current_priority = Priority::None;
        self.reserve_priority = Priority::None;
    }
}
