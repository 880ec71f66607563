//! Texture decode and upload.

use image::RgbaImage;

use crate::error::RendererError;
use crate::surface::GraphicsContext;

/// Backend texture name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Filter {
    Linear,
    Nearest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wrap {
    ClampToEdge,
    Repeat,
}

/// Upload request: tightly packed RGBA8 rows.
#[derive(Clone, Copy, Debug)]
pub struct TextureDesc<'a> {
    pub width: u32,
    pub height: u32,
    pub rgba: &'a [u8],
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub wrap: Wrap,
}

/// Decode PNG/JPEG bytes to RGBA8.
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, image::ImageError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Upload with linear filtering and clamp-to-edge wrapping.
pub fn upload(ctx: &dyn GraphicsContext, img: &RgbaImage) -> Result<TextureId, RendererError> {
    ctx.create_texture(&TextureDesc {
        width: img.width(),
        height: img.height(),
        rgba: img.as_raw(),
        min_filter: Filter::Linear,
        mag_filter: Filter::Linear,
        wrap: Wrap::ClampToEdge,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn decodes_png_to_rgba() {
        let img = RgbaImage::from_pixel(2, 3, image::Rgba([10, 20, 30, 255]));
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let decoded = decode_rgba(&png).unwrap();
        assert_eq!(decoded.dimensions(), (2, 3));
        assert_eq!(decoded.get_pixel(1, 2).0, [10, 20, 30, 255]);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(decode_rgba(b"not an image").is_err());
    }
}
