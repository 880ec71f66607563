//! Renderer seam.
//!
//! The mesh rasterizer is backend specific. The runtime hands it textures
//! bound by index, the model-view-projection and the committed parameters.

use nalgebra::Matrix4;

use crate::error::RendererError;
use crate::params::ParameterBuffer;
use crate::rig::Rig;
use crate::surface::ContextHandle;
use crate::texture::TextureId;

pub trait Renderer {
    /// Bind to the graphics context. Must succeed before textures are bound.
    fn start_up(&mut self, ctx: ContextHandle) -> Result<(), RendererError>;
    fn bind_texture(&mut self, index: usize, texture: TextureId);
    fn set_premultiplied_alpha(&mut self, enabled: bool);
    fn set_mvp(&mut self, mvp: &Matrix4<f32>);
    /// Viewport `[x, y, width, height]` of the frame about to be drawn.
    fn set_render_state(&mut self, _viewport: [u32; 4]) {}
    fn draw_model(&mut self, rig: &Rig, params: &ParameterBuffer) -> Result<(), RendererError>;
    fn release(&mut self) {}
}

/// Creates one renderer per loaded model.
pub trait RendererFactory {
    fn create(&self, rig: &Rig) -> Box<dyn Renderer>;
}
