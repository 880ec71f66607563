//! Drawable surface and graphics context.

use std::rc::Rc;

use crate::error::{RendererError, SurfaceError};
use crate::texture::{TextureDesc, TextureId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

/// Attributes requested when creating the context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContextAttributes {
    pub alpha: bool,
    pub premultiplied_alpha: bool,
}

/// The low-level calls the runtime needs from a graphics API.
pub trait GraphicsContext {
    fn enable_blend(&self, src: BlendFactor, dst: BlendFactor);
    fn blend_func_separate(
        &self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    );
    fn viewport(&self, x: i32, y: i32, width: u32, height: u32);
    fn clear(&self, r: f32, g: f32, b: f32, a: f32);
    fn create_texture(&self, desc: &TextureDesc<'_>) -> Result<TextureId, RendererError>;
    fn delete_texture(&self, texture: TextureId);
}

/// Shared handle to the active context.
pub type ContextHandle = Rc<dyn GraphicsContext>;

/// A host drawable (canvas, window, offscreen target).
pub trait Surface {
    /// Laid-out size in pixels.
    fn layout_size(&self) -> (u32, u32);
    fn set_size(&mut self, width: u32, height: u32);
    fn create_context(&mut self, attrs: ContextAttributes) -> Option<ContextHandle>;
}

/// Size used for a square surface when the layout reports zero.
const FALLBACK_EDGE: u32 = 600;

#[derive(Default)]
pub struct SurfaceAdapter {
    surface: Option<Box<dyn Surface>>,
    context: Option<ContextHandle>,
    width: u32,
    height: u32,
}

impl SurfaceAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(&mut self, mut surface: Box<dyn Surface>) -> Result<(), SurfaceError> {
        let (w, h) = surface.layout_size();
        surface.set_size(w, h);
        self.width = w;
        self.height = h;

        let attrs = ContextAttributes {
            alpha: true,
            premultiplied_alpha: true,
        };
        let Some(ctx) = surface.create_context(attrs) else {
            log::error!("surface: could not create a graphics context");
            return Err(SurfaceError::NoContext);
        };
        ctx.enable_blend(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);
        self.context = Some(ctx);
        self.surface = Some(surface);
        log::debug!("surface: initialized at {w}x{h}");
        Ok(())
    }

    pub fn context(&self) -> Option<ContextHandle> {
        self.context.clone()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Force a square backing store of `max(w, h) * pixel_ratio` pixels.
    pub fn resize_square(
        &mut self,
        css_width: u32,
        css_height: u32,
        pixel_ratio: f32,
    ) -> Result<(u32, u32), SurfaceError> {
        let surface = self.surface.as_mut().ok_or(SurfaceError::NotInitialized)?;
        let w = if css_width == 0 { FALLBACK_EDGE } else { css_width };
        let h = if css_height == 0 { FALLBACK_EDGE } else { css_height };
        let edge = (w.max(h) as f32 * pixel_ratio).round() as u32;
        surface.set_size(edge, edge);
        self.width = edge;
        self.height = edge;
        if let Some(ctx) = &self.context {
            ctx.viewport(0, 0, edge, edge);
        }
        Ok((edge, edge))
    }

    /// Reset viewport, clear to transparent white and set separate blending.
    pub fn begin_frame(&self) -> Result<(), SurfaceError> {
        let ctx = self.context.as_ref().ok_or(SurfaceError::NotInitialized)?;
        ctx.viewport(0, 0, self.width, self.height);
        ctx.clear(1.0, 1.0, 1.0, 0.0);
        ctx.blend_func_separate(
            BlendFactor::SrcAlpha,
            BlendFactor::OneMinusSrcAlpha,
            BlendFactor::One,
            BlendFactor::OneMinusSrcAlpha,
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    /// Drop context and surface. Safe to call repeatedly.
    pub fn release(&mut self) {
        if self.context.take().is_some() {
            log::debug!("surface: released");
        }
        self.surface = None;
    }
}
