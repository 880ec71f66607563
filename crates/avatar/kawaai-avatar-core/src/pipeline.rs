//! Per-frame parameter pipeline.
//!
//! `update` runs [`FRAME_ORDER`] left to right over the working parameter
//! buffer. The order is observable: physics reads drag-adjusted angles, blink
//! overrides whatever motion wrote to the eyes, and pose sees the final
//! part-switch parameters. A failing stage is logged and the frame continues.

use std::sync::Arc;

use crate::error::FrameError;
use crate::model::AvatarModel;
use crate::motion::Priority;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameStage {
    Clock,
    Drag,
    SaveBaseline,
    Motion,
    Expression,
    DragOffsets,
    Breath,
    Physics,
    LipSync,
    EyeBlink,
    Pose,
    Commit,
}

pub const FRAME_ORDER: [FrameStage; 12] = [
    FrameStage::Clock,
    FrameStage::Drag,
    FrameStage::SaveBaseline,
    FrameStage::Motion,
    FrameStage::Expression,
    FrameStage::DragOffsets,
    FrameStage::Breath,
    FrameStage::Physics,
    FrameStage::LipSync,
    FrameStage::EyeBlink,
    FrameStage::Pose,
    FrameStage::Commit,
];

impl FrameStage {
    pub fn name(self) -> &'static str {
        match self {
            FrameStage::Clock => "clock",
            FrameStage::Drag => "drag",
            FrameStage::SaveBaseline => "save_baseline",
            FrameStage::Motion => "motion",
            FrameStage::Expression => "expression",
            FrameStage::DragOffsets => "drag_offsets",
            FrameStage::Breath => "breath",
            FrameStage::Physics => "physics",
            FrameStage::LipSync => "lip_sync",
            FrameStage::EyeBlink => "eye_blink",
            FrameStage::Pose => "pose",
            FrameStage::Commit => "commit",
        }
    }
}

impl AvatarModel {
    /// Advance the model by `dt` seconds. No-op until loading has completed.
    pub fn update(&mut self, dt: f32) {
        if !self.ready {
            return;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        for stage in FRAME_ORDER {
            if let Err(e) = self.run_stage(stage, dt) {
                log::error!("frame stage {}: {e}", stage.name());
            }
        }
    }

    fn start_idle(&mut self) -> Result<(), FrameError> {
        let cfg = Arc::clone(&self.config);
        self.start_random_motion(&cfg.idle_group, Priority::Idle)?;
        Ok(())
    }

    fn run_stage(&mut self, stage: FrameStage, dt: f32) -> Result<(), FrameError> {
        match stage {
            FrameStage::Clock => {
                self.user_time += dt;
                if let Some(left) = self.idle_countdown.as_mut() {
                    *left -= dt;
                    if *left <= 0.0 {
                        self.idle_countdown = None;
                        self.idle_armed = true;
                        log::debug!("starting idle motion");
                        self.start_idle()?;
                    }
                }
            }
            FrameStage::Drag => {
                self.drag.update(dt);
                self.drag_x = self.drag.x();
                self.drag_y = self.drag.y();
            }
            FrameStage::SaveBaseline => {
                // Start from last frame's undecorated pose so additive stages never accumulate.
                self.params.load();
                self.params.save();
            }
            FrameStage::Motion => {
                let updated = self.motion_manager.update(&mut self.params, dt);
                if updated {
                    self.params.save();
                } else {
                    self.params.load();
                }
                // A clip that ended this frame is replaced before the frame returns.
                if self.idle_armed && self.motion_manager.is_finished() {
                    self.start_idle()?;
                }
            }
            FrameStage::Expression => {
                self.expression_manager.update(&mut self.params, dt);
            }
            FrameStage::DragOffsets => {
                if let Some(ids) = &self.standard_ids {
                    let g = self.config.drag;
                    let (x, y) = (self.drag_x, self.drag_y);
                    self.params.add_value(&ids.angle_x, x * g.angle_x, 1.0);
                    self.params.add_value(&ids.angle_y, y * g.angle_y, 1.0);
                    self.params.add_value(&ids.angle_z, x * y * g.angle_z, 1.0);
                    self.params
                        .add_value(&ids.body_angle_x, x * g.body_angle_x, 1.0);
                    self.params.add_value(&ids.eye_ball_x, x * g.eye_ball, 1.0);
                    self.params.add_value(&ids.eye_ball_y, y * g.eye_ball, 1.0);
                }
            }
            FrameStage::Breath => {
                if let Some(b) = self.breath.as_mut() {
                    b.update(&mut self.params, dt);
                }
            }
            FrameStage::Physics => {
                if let Some(p) = self.physics.as_mut() {
                    p.evaluate(&mut self.params, dt);
                }
            }
            FrameStage::LipSync => {
                if let Some(ids) = &self.standard_ids {
                    self.params.add_value(
                        &ids.mouth_open_y,
                        self.lip_sync_value,
                        self.config.lip_sync_weight,
                    );
                }
            }
            FrameStage::EyeBlink => {
                if let Some(b) = self.eye_blink.as_mut() {
                    b.update(&mut self.params, dt);
                }
            }
            FrameStage::Pose => {
                if let Some(p) = self.pose.as_mut() {
                    p.update(&mut self.params, dt);
                }
            }
            FrameStage::Commit => {
                let bad = self.params.reset_non_finite();
                self.params.commit();
                if let Some(id) = bad {
                    return Err(FrameError::NonFinite {
                        stage: stage.name(),
                        parameter: id.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
