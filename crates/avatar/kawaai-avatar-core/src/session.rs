//! Host-facing lifecycle for one on-screen avatar.
//!
//! Bring-up runs in this order: surface and graphics context first, then the
//! shared framework, then the scene. Teardown releases the surface, then the
//! scene's models, then the framework reference, and is safe to repeat.

use std::sync::Arc;

use crate::config::RuntimeConfig;
use crate::error::{LoadError, SessionError, SurfaceError};
use crate::fetch::AssetFetcher;
use crate::framework::{FrameworkLease, FrameworkLifecycle};
use crate::loader::LoadEnv;
use crate::model::AvatarModel;
use crate::renderer::RendererFactory;
use crate::rig::RigDecoder;
use crate::scene::SceneManager;
use crate::surface::{Surface, SurfaceAdapter};

/// Converts host timestamps (ms) into frame deltas (s).
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameClock {
    last: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first tick yields 0. Timestamps going backwards yield 0.
    pub fn tick(&mut self, now_ms: f64) -> f32 {
        let dt = match self.last {
            Some(last) => ((now_ms - last) / 1000.0).max(0.0) as f32,
            None => 0.0,
        };
        self.last = Some(now_ms);
        dt
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Bounding box of the surface in client coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClientRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Map a client-space pointer to `[-1, 1]` with y pointing up.
pub fn normalize_pointer(client_x: f32, client_y: f32, rect: ClientRect) -> (f32, f32) {
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return (0.0, 0.0);
    }
    let x = (client_x - rect.left) / rect.width * 2.0 - 1.0;
    let y = (client_y - rect.top) / rect.height * 2.0 - 1.0;
    (x, -y)
}

pub struct AvatarSession {
    surface: SurfaceAdapter,
    scene: SceneManager,
    lease: Option<FrameworkLease>,
    clock: FrameClock,
    viewport: (u32, u32),
}

impl std::fmt::Debug for AvatarSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvatarSession")
            .field("surface", &self.surface.is_initialized())
            .field("framework", &self.lease.is_some())
            .field("models", &self.scene.model_count())
            .field("viewport", &self.viewport)
            .finish()
    }
}

impl AvatarSession {
    pub fn start(
        framework: &Arc<FrameworkLifecycle>,
        surface: Box<dyn Surface>,
        config: Arc<RuntimeConfig>,
    ) -> Result<Self, SessionError> {
        let mut adapter = SurfaceAdapter::new();
        adapter.initialize(surface)?;
        let lease = match framework.acquire() {
            Ok(l) => l,
            Err(e) => {
                adapter.release();
                return Err(e.into());
            }
        };
        let viewport = adapter.size();
        let scene = SceneManager::new(config, framework.ids());
        log::info!("session: started at {}x{}", viewport.0, viewport.1);
        Ok(Self {
            surface: adapter,
            scene,
            lease: Some(lease),
            clock: FrameClock::new(),
            viewport,
        })
    }

    /// Load a character from `{resources_path}{dir}/{file}` on this session's context.
    pub async fn load_model<F: AssetFetcher>(
        &mut self,
        fetcher: &F,
        decoder: &dyn RigDecoder,
        renderers: &dyn RendererFactory,
        dir: &str,
        file: &str,
    ) -> Result<&mut AvatarModel, LoadError> {
        let env = LoadEnv {
            fetcher,
            decoder,
            renderers,
            context: self.surface.context(),
        };
        self.scene.load_model(&env, dir, file).await
    }

    /// One animation frame driven by a host timestamp in milliseconds.
    pub fn frame(&mut self, now_ms: f64, viewport: (u32, u32)) {
        let dt = self.clock.tick(now_ms);
        self.tick(dt, viewport);
    }

    /// One animation frame of `dt` seconds.
    pub fn tick(&mut self, dt: f32, viewport: (u32, u32)) {
        if self.lease.is_none() {
            return;
        }
        if viewport != self.viewport {
            self.viewport = viewport;
            self.scene.on_resize(viewport.0, viewport.1);
        }
        // 1) Clear and blend state
        if let Err(e) = self.surface.begin_frame() {
            log::warn!("session: skipping frame: {e}");
            return;
        }
        // 2) Advance
        self.scene.update(dt);
        // 3) Draw
        self.scene
            .set_render_state([0, 0, self.viewport.0, self.viewport.1]);
        self.scene.draw();
    }

    pub fn pointer_move(&mut self, client_x: f32, client_y: f32, rect: ClientRect) {
        let (x, y) = normalize_pointer(client_x, client_y, rect);
        if let Some(m) = self.scene.current_model_mut() {
            m.set_dragging(x, y);
        }
    }

    /// Pointer left the surface: look straight ahead.
    pub fn pointer_leave(&mut self) {
        if let Some(m) = self.scene.current_model_mut() {
            m.set_dragging(0.0, 0.0);
        }
    }

    /// Click or tap on the surface.
    pub fn interact(&mut self) {
        if let Some(m) = self.scene.current_model_mut() {
            if let Err(e) = m.set_random_expression() {
                log::warn!("session: interaction ignored: {e}");
            }
        }
    }

    /// Resize to a square backing store and re-derive the view.
    pub fn resize(
        &mut self,
        css_width: u32,
        css_height: u32,
        pixel_ratio: f32,
    ) -> Result<(u32, u32), SurfaceError> {
        let size = self.surface.resize_square(css_width, css_height, pixel_ratio)?;
        self.viewport = size;
        self.scene.on_resize(size.0, size.1);
        Ok(size)
    }

    pub fn scene(&self) -> &SceneManager {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneManager {
        &mut self.scene
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn is_running(&self) -> bool {
        self.lease.is_some()
    }

    pub fn teardown(&mut self) {
        let Some(lease) = self.lease.take() else {
            return;
        };
        self.surface.release();
        self.scene.release();
        lease.release();
        self.clock.reset();
        log::info!("session: torn down");
    }
}

impl Drop for AvatarSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn first_frame_has_zero_delta() {
        let mut c = FrameClock::new();
        assert_eq!(c.tick(1000.0), 0.0);
        assert_relative_eq!(c.tick(1016.0), 0.016);
        assert_eq!(c.tick(900.0), 0.0);
    }

    #[test]
    fn pointer_maps_to_unit_square_with_y_up() {
        let rect = ClientRect {
            left: 100.0,
            top: 50.0,
            width: 200.0,
            height: 400.0,
        };
        assert_eq!(normalize_pointer(100.0, 50.0, rect), (-1.0, 1.0));
        assert_eq!(normalize_pointer(300.0, 450.0, rect), (1.0, -1.0));
        assert_eq!(normalize_pointer(200.0, 250.0, rect), (0.0, 0.0));
        let empty = ClientRect { width: 0.0, ..rect };
        assert_eq!(normalize_pointer(10.0, 10.0, empty), (0.0, 0.0));
    }
}
