//! One loaded character: assets, effect state and the motion/expression policy.
//!
//! Loading lives in `loader.rs` and the per-frame stages in `pipeline.rs`; both
//! extend [`AvatarModel`] with further `impl` blocks.

use std::sync::Arc;

use hashbrown::HashMap;
use indexmap::IndexMap;
use nalgebra::Matrix4;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::RuntimeConfig;
use crate::effects::{Breath, EyeBlink, Pose, TargetPoint};
use crate::error::MotionStartError;
use crate::ids::{IdRegistry, ParamId, StandardIds};
use crate::manifest::{motion_key, ModelManifest};
use crate::motion::{ExpressionClip, MotionClip, MotionHandle, MotionManager, Priority};
use crate::params::ParameterBuffer;
use crate::physics::PhysicsRig;
use crate::renderer::Renderer;
use crate::rig::Rig;
use crate::surface::ContextHandle;
use crate::texture::TextureId;
use crate::view::ModelMatrix;

pub struct AvatarModel {
    pub(crate) config: Arc<RuntimeConfig>,
    pub(crate) ids: Arc<IdRegistry>,

    pub(crate) manifest: Option<ModelManifest>,
    pub(crate) rig: Option<Rig>,
    pub(crate) params: ParameterBuffer,
    pub(crate) renderer: Option<Box<dyn Renderer>>,
    pub(crate) context: Option<ContextHandle>,
    pub(crate) textures: Vec<TextureId>,

    /// Unique names, load order preserved for random selection.
    pub(crate) expressions: IndexMap<String, Arc<ExpressionClip>>,
    /// `{group}_{index}` → clip.
    pub(crate) motions: HashMap<String, Arc<MotionClip>>,
    pub(crate) eye_blink_ids: Vec<ParamId>,
    pub(crate) lip_sync_ids: Vec<ParamId>,
    pub(crate) standard_ids: Option<StandardIds>,

    pub(crate) breath: Option<Breath>,
    pub(crate) eye_blink: Option<EyeBlink>,
    pub(crate) physics: Option<PhysicsRig>,
    pub(crate) pose: Option<Pose>,

    pub(crate) drag: TargetPoint,
    pub(crate) drag_x: f32,
    pub(crate) drag_y: f32,
    pub(crate) lip_sync_value: f32,
    pub(crate) model_matrix: ModelMatrix,

    pub(crate) motion_manager: MotionManager,
    pub(crate) expression_manager: MotionManager,

    pub(crate) user_time: f32,
    /// Seconds left before the first idle motion starts.
    pub(crate) idle_countdown: Option<f32>,
    /// Set once the deferred idle start fired; enables idle restarts.
    pub(crate) idle_armed: bool,
    pub(crate) rng: StdRng,
    pub(crate) ready: bool,
}

impl std::fmt::Debug for AvatarModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvatarModel")
            .field("ready", &self.ready)
            .field("motions", &self.motions.len())
            .field("expressions", &self.expressions.len())
            .field("textures", &self.textures.len())
            .field("user_time", &self.user_time)
            .finish()
    }
}

pub(crate) fn seeded_rng(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s.wrapping_add(stream)),
        None => StdRng::from_entropy(),
    }
}

impl AvatarModel {
    pub fn new(config: Arc<RuntimeConfig>, ids: Arc<IdRegistry>) -> Self {
        let rng = seeded_rng(config.rng_seed, 0);
        Self {
            config,
            ids,
            manifest: None,
            rig: None,
            params: ParameterBuffer::default(),
            renderer: None,
            context: None,
            textures: Vec::new(),
            expressions: IndexMap::new(),
            motions: HashMap::new(),
            eye_blink_ids: Vec::new(),
            lip_sync_ids: Vec::new(),
            standard_ids: None,
            breath: None,
            eye_blink: None,
            physics: None,
            pose: None,
            drag: TargetPoint::new(),
            drag_x: 0.0,
            drag_y: 0.0,
            lip_sync_value: 0.0,
            model_matrix: ModelMatrix::new(1.0, 1.0),
            motion_manager: MotionManager::new(),
            expression_manager: MotionManager::new(),
            user_time: 0.0,
            idle_countdown: None,
            idle_armed: false,
            rng,
            ready: false,
        }
    }

    /// `true` once `load_assets` has completed.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn manifest(&self) -> Option<&ModelManifest> {
        self.manifest.as_ref()
    }

    pub fn rig(&self) -> Option<&Rig> {
        self.rig.as_ref()
    }

    pub fn parameters(&self) -> &ParameterBuffer {
        &self.params
    }

    pub fn parameters_mut(&mut self) -> &mut ParameterBuffer {
        &mut self.params
    }

    pub fn model_matrix(&self) -> &ModelMatrix {
        &self.model_matrix
    }

    pub fn textures(&self) -> &[TextureId] {
        &self.textures
    }

    pub fn expression_names(&self) -> impl Iterator<Item = &str> {
        self.expressions.keys().map(String::as_str)
    }

    pub fn expression(&self, name: &str) -> Option<&Arc<ExpressionClip>> {
        self.expressions.get(name)
    }

    /// Register `clip` under `name`, returning the clip it replaced. The replaced
    /// clip is dropped by the caller; names stay unique.
    pub fn register_expression(
        &mut self,
        name: &str,
        clip: ExpressionClip,
    ) -> Option<Arc<ExpressionClip>> {
        let previous = self.expressions.shift_remove(name);
        if previous.is_some() {
            log::warn!("expression {name} declared twice, replacing the earlier one");
        }
        self.expressions.insert(name.to_string(), Arc::new(clip));
        previous
    }

    pub fn motion(&self, key: &str) -> Option<&Arc<MotionClip>> {
        self.motions.get(key)
    }

    pub fn motion_count(&self) -> usize {
        self.motions.len()
    }

    pub fn eye_blink_ids(&self) -> &[ParamId] {
        &self.eye_blink_ids
    }

    pub fn lip_sync_ids(&self) -> &[ParamId] {
        &self.lip_sync_ids
    }

    pub fn has_physics(&self) -> bool {
        self.physics.is_some()
    }

    pub fn has_pose(&self) -> bool {
        self.pose.is_some()
    }

    pub fn user_time(&self) -> f32 {
        self.user_time
    }

    /// Normalized pointer target, `[-1, 1]` on both axes (y up).
    pub fn set_dragging(&mut self, x: f32, y: f32) {
        self.drag.set(x, y);
    }

    /// Smoothed drag read during the last update.
    pub fn drag(&self) -> (f32, f32) {
        (self.drag_x, self.drag_y)
    }

    /// Mouth openness to inject on the next updates. Defaults to 0 (silent).
    pub fn set_lip_sync_value(&mut self, value: f32) {
        self.lip_sync_value = value;
    }

    pub fn lip_sync_value(&self) -> f32 {
        self.lip_sync_value
    }

    pub fn is_motion_finished(&self) -> bool {
        self.motion_manager.is_finished()
    }

    pub fn current_motion_key(&self) -> Option<&str> {
        self.motion_manager.current_key()
    }

    pub fn current_motion_handle(&self) -> Option<MotionHandle> {
        self.motion_manager.current_handle()
    }

    pub fn current_priority(&self) -> Priority {
        self.motion_manager.current_priority()
    }

    pub fn current_expression(&self) -> Option<&str> {
        self.expression_manager.current_key()
    }

    pub fn start_motion(
        &mut self,
        group: &str,
        index: usize,
        priority: Priority,
    ) -> Result<MotionHandle, MotionStartError> {
        if !self.ready {
            return Err(MotionStartError::NotReady);
        }
        let key = motion_key(group, index);
        let Some(clip) = self.motions.get(&key).cloned() else {
            log::warn!("motion {key} is not loaded");
            return Err(MotionStartError::UnknownMotion { key });
        };

        if priority == Priority::Force {
            self.motion_manager.set_reserve_priority(priority);
        } else if !self.motion_manager.reserve_motion(priority) {
            let err = MotionStartError::ReservationRejected {
                requested: priority,
                current: self.motion_manager.current_priority(),
                reserved: self.motion_manager.reserve_priority(),
            };
            log::debug!("motion {key}: {err}");
            return Err(err);
        }

        log::debug!("start motion {key} at {priority:?}");
        Ok(self.motion_manager.start_motion_priority(key, clip, priority))
    }

    /// Start a uniformly chosen entry of `group`.
    pub fn start_random_motion(
        &mut self,
        group: &str,
        priority: Priority,
    ) -> Result<MotionHandle, MotionStartError> {
        let Some(manifest) = self.manifest.as_ref().filter(|_| self.ready) else {
            return Err(MotionStartError::NotReady);
        };
        let count = manifest.motion_count(group);
        if count == 0 {
            log::warn!("motion group '{group}' has no entries");
            return Err(MotionStartError::EmptyGroup {
                group: group.to_string(),
            });
        }
        let index = self.rng.gen_range(0..count);
        self.start_motion(group, index, priority)
    }

    pub fn set_expression(&mut self, name: &str) -> Result<MotionHandle, MotionStartError> {
        if !self.ready {
            return Err(MotionStartError::NotReady);
        }
        let Some(clip) = self.expressions.get(name).cloned() else {
            log::warn!("expression {name} is not loaded");
            return Err(MotionStartError::UnknownExpression {
                name: name.to_string(),
            });
        };
        log::debug!("set expression {name}");
        Ok(self
            .expression_manager
            .start_motion_priority(name, clip, Priority::Force))
    }

    /// Pick a random expression, or a tap motion when none are loaded.
    pub fn set_random_expression(&mut self) -> Result<MotionHandle, MotionStartError> {
        if self.expressions.is_empty() {
            let tap = self.config.tap_group.clone();
            log::debug!("no expressions loaded, falling back to {tap}");
            return self.start_random_motion(&tap, Priority::Normal);
        }
        let i = self.rng.gen_range(0..self.expressions.len());
        let name = match self.expressions.get_index(i) {
            Some((name, _)) => name.clone(),
            None => return Err(MotionStartError::NotReady),
        };
        self.set_expression(&name)
    }

    pub fn set_render_state(&mut self, viewport: [u32; 4]) {
        if let Some(r) = self.renderer.as_mut() {
            r.set_render_state(viewport);
        }
    }

    /// Submit `view_projection * model` and the committed parameters.
    pub fn draw(&mut self, view_projection: &Matrix4<f32>) {
        if !self.ready {
            return;
        }
        let (Some(renderer), Some(rig)) = (self.renderer.as_mut(), self.rig.as_ref()) else {
            return;
        };
        let mvp = view_projection * self.model_matrix.matrix();
        renderer.set_mvp(&mvp);
        if let Err(e) = renderer.draw_model(rig, &self.params) {
            log::error!("draw failed: {e}");
        }
    }

    /// Free textures, clips and the renderer. The model is no longer ready.
    pub fn release(&mut self) {
        if let Some(mut r) = self.renderer.take() {
            r.release();
        }
        if let Some(ctx) = self.context.take() {
            for t in self.textures.drain(..) {
                ctx.delete_texture(t);
            }
        }
        self.textures.clear();
        self.motion_manager.stop_all();
        self.expression_manager.stop_all();
        self.motions.clear();
        self.expressions.clear();
        self.physics = None;
        self.pose = None;
        self.idle_countdown = None;
        self.idle_armed = false;
        self.ready = false;
        log::debug!("model released");
    }
}
