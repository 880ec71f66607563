//! Model and view transforms.
//!
//! Both wrap a column-major `nalgebra::Matrix4`. Only the 2D scale
//! (`m[(0,0)]`, `m[(1,1)]`) and translation (`m[(0,3)]`, `m[(1,3)]`) entries
//! are ever touched.

use nalgebra::Matrix4;

use crate::config::{CharacterTransform, Rect, ViewConfig};

/// Places the rig canvas in model space.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelMatrix {
    width: f32,
    height: f32,
    m: Matrix4<f32>,
}

impl ModelMatrix {
    /// A fresh matrix for a `width` x `height` canvas, two units tall.
    pub fn new(width: f32, height: f32) -> Self {
        let mut mm = Self {
            width,
            height,
            m: Matrix4::identity(),
        };
        mm.set_height(2.0);
        mm
    }

    fn set_uniform_scale(&mut self, s: f32) {
        self.m[(0, 0)] = s;
        self.m[(1, 1)] = s;
    }

    pub fn set_width(&mut self, w: f32) {
        if self.width != 0.0 {
            self.set_uniform_scale(w / self.width);
        }
    }

    pub fn set_height(&mut self, h: f32) {
        if self.height != 0.0 {
            self.set_uniform_scale(h / self.height);
        }
    }

    pub fn set_center_position(&mut self, x: f32, y: f32) {
        self.m[(0, 3)] = x - self.width * self.scale_x() / 2.0;
        self.m[(1, 3)] = y - self.height * self.scale_y() / 2.0;
    }

    /// Center on the canvas using its width on both axes.
    pub fn center_on_canvas_width(&mut self) {
        let w = self.width;
        self.set_width(w);
        self.set_height(w);
        self.set_center_position(0.0, 0.0);
    }

    pub fn scale_x(&self) -> f32 {
        self.m[(0, 0)]
    }

    pub fn scale_y(&self) -> f32 {
        self.m[(1, 1)]
    }

    pub fn translate_x(&self) -> f32 {
        self.m[(0, 3)]
    }

    pub fn translate_y(&self) -> f32 {
        self.m[(1, 3)]
    }

    pub fn matrix(&self) -> &Matrix4<f32> {
        &self.m
    }
}

/// Screen-space view with pan and zoom limits.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewMatrix {
    m: Matrix4<f32>,
    screen: Rect,
    max_screen: Rect,
    min_scale: f32,
    max_scale: f32,
}

impl Default for ViewMatrix {
    fn default() -> Self {
        let v = ViewConfig::default();
        Self {
            m: Matrix4::identity(),
            screen: v.screen_rect,
            max_screen: v.max_screen_rect,
            min_scale: v.min_scale,
            max_scale: v.max_scale,
        }
    }
}

impl ViewMatrix {
    /// Build the full view for a character from scratch.
    pub fn for_character(view: &ViewConfig, character: &CharacterTransform) -> Self {
        let mut v = Self::default();
        v.set_screen_rect(view.screen_rect);
        v.scale(character.scale, character.scale);
        v.translate(character.translate_x, character.translate_y);
        v.set_max_screen_rect(view.max_screen_rect);
        v.set_max_scale(view.max_scale);
        v.set_min_scale(view.min_scale);
        v
    }

    pub fn set_screen_rect(&mut self, r: Rect) {
        self.screen = r;
    }

    pub fn set_max_screen_rect(&mut self, r: Rect) {
        self.max_screen = r;
    }

    pub fn set_max_scale(&mut self, s: f32) {
        self.max_scale = s;
    }

    pub fn set_min_scale(&mut self, s: f32) {
        self.min_scale = s;
    }

    /// Set absolute scale.
    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.m[(0, 0)] = sx;
        self.m[(1, 1)] = sy;
    }

    /// Set absolute translation.
    pub fn translate(&mut self, x: f32, y: f32) {
        self.m[(0, 3)] = x;
        self.m[(1, 3)] = y;
    }

    /// Pan by `(x, y)`, stopping where the max rect would leave the screen rect.
    pub fn adjust_translate(&mut self, mut x: f32, mut y: f32) {
        let (sx, sy) = (self.scale_x(), self.scale_y());
        let (tx, ty) = (self.translate_x(), self.translate_y());
        let (s, mx) = (self.screen, self.max_screen);
        if sx * mx.left + (tx + x) > s.left {
            x = s.left - sx * mx.left - tx;
        }
        if sx * mx.right + (tx + x) < s.right {
            x = s.right - sx * mx.right - tx;
        }
        if sy * mx.top + (ty + y) < s.top {
            y = s.top - sy * mx.top - ty;
        }
        if sy * mx.bottom + (ty + y) > s.bottom {
            y = s.bottom - sy * mx.bottom - ty;
        }
        self.m = Matrix4::new_translation(&nalgebra::Vector3::new(x, y, 0.0)) * self.m;
    }

    /// Zoom by `scale` around `(cx, cy)`, keeping the result in `[min, max]`.
    pub fn adjust_scale(&mut self, cx: f32, cy: f32, mut scale: f32) {
        let current = self.scale_x();
        let target = scale * current;
        if current > 0.0 {
            if target < self.min_scale {
                scale = self.min_scale / current;
            } else if target > self.max_scale {
                scale = self.max_scale / current;
            }
        }
        let to_center = Matrix4::new_translation(&nalgebra::Vector3::new(cx, cy, 0.0));
        let from_center = Matrix4::new_translation(&nalgebra::Vector3::new(-cx, -cy, 0.0));
        let zoom = Matrix4::new_nonuniform_scaling(&nalgebra::Vector3::new(scale, scale, 1.0));
        self.m = to_center * zoom * from_center * self.m;
    }

    pub fn is_max_scale(&self) -> bool {
        self.scale_x() >= self.max_scale
    }

    pub fn is_min_scale(&self) -> bool {
        self.scale_x() <= self.min_scale
    }

    pub fn scale_x(&self) -> f32 {
        self.m[(0, 0)]
    }

    pub fn scale_y(&self) -> f32 {
        self.m[(1, 1)]
    }

    pub fn translate_x(&self) -> f32 {
        self.m[(0, 3)]
    }

    pub fn translate_y(&self) -> f32 {
        self.m[(1, 3)]
    }

    pub fn screen_rect(&self) -> Rect {
        self.screen
    }

    pub fn max_screen_rect(&self) -> Rect {
        self.max_screen
    }

    pub fn matrix(&self) -> &Matrix4<f32> {
        &self.m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use approx::assert_relative_eq;

    #[test]
    fn model_matrix_centers_on_canvas_width() {
        let mut mm = ModelMatrix::new(2400.0, 3000.0);
        mm.center_on_canvas_width();
        let s = 2400.0 / 3000.0;
        assert_relative_eq!(mm.scale_x(), s);
        assert_relative_eq!(mm.scale_y(), s);
        assert_relative_eq!(mm.translate_x(), -2400.0 * s / 2.0);
        assert_relative_eq!(mm.translate_y(), -3000.0 * s / 2.0);
    }

    #[test]
    fn character_view_is_rebuilt_from_the_table() {
        let cfg = RuntimeConfig::default();
        let v = ViewMatrix::for_character(&cfg.view, cfg.character_transform("Wanko"));
        assert_eq!(v.scale_x(), 2.8);
        assert_eq!(v.translate_x(), 0.95);
        assert_eq!(v.translate_y(), 1.15);
        assert_eq!(v.max_screen_rect(), Rect::new(-4.0, 4.0, -4.0, 4.0));

        let haru = ViewMatrix::for_character(&cfg.view, cfg.character_transform("Haru"));
        assert_eq!(haru.translate_y(), 0.5);
    }

    #[test]
    fn adjust_scale_clamps_to_limits() {
        let cfg = RuntimeConfig::default();
        let mut v = ViewMatrix::for_character(&cfg.view, &cfg.default_character);
        v.scale(1.0, 1.0);
        v.translate(0.0, 0.0);
        v.adjust_scale(0.0, 0.0, 10.0);
        assert_relative_eq!(v.scale_x(), 2.0);
        assert!(v.is_max_scale());
        v.adjust_scale(0.0, 0.0, 0.01);
        assert_relative_eq!(v.scale_x(), 0.8);
        assert!(v.is_min_scale());
    }

    #[test]
    fn adjust_translate_stays_inside_max_rect() {
        let mut v = ViewMatrix::default();
        v.adjust_translate(100.0, 0.0);
        // left edge of the max rect (-4) may not pass the screen's left edge (-2)
        assert_relative_eq!(v.translate_x(), 2.0);
    }
}
