// Drawing surfaces: the canvas the Field Renderer paints onto

use ab_glyph::{point, Font, FontArc, PxScale, ScaleFont};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use std::path::Path;

use crate::error::AppError;
use crate::resolution::{CanvasSize, FontDescriptor};

const INK: [u8; 3] = [0, 0, 0];

/// Canvas-style 2D drawing in logical pixels.
///
/// Text is left-anchored on an alphabetic baseline at `(x, y)`.
pub trait Surface {
    fn size(&self) -> CanvasSize;
    fn set_font(&mut self, font: FontDescriptor);
    fn fill_text(&mut self, text: &str, x: f32, y: f32);
    fn draw_image(&mut self, image: &RgbaImage, x: f32, y: f32, width: f32, height: f32);
}

// ============================================================================
// Fonts
// ============================================================================

/// Regular face plus an optional bold face for the stamp tier.
#[derive(Clone)]
pub struct FontSet {
    regular: FontArc,
    bold: Option<FontArc>,
}

impl FontSet {
    pub fn from_bytes(regular: Vec<u8>, bold: Option<Vec<u8>>) -> Result<Self, AppError> {
        let regular = FontArc::try_from_vec(regular)
            .map_err(|e| AppError::FontError(format!("regular face: {}", e)))?;
        let bold = bold
            .map(|bytes| {
                FontArc::try_from_vec(bytes)
                    .map_err(|e| AppError::FontError(format!("bold face: {}", e)))
            })
            .transpose()?;
        Ok(FontSet { regular, bold })
    }

    pub fn load(regular: &Path, bold: Option<&Path>) -> Result<Self, AppError> {
        let read = |p: &Path| {
            std::fs::read(p).map_err(|e| AppError::FontError(format!("{}: {}", p.display(), e)))
        };
        let regular_bytes = read(regular)?;
        let bold_bytes = bold.map(read).transpose()?;
        Self::from_bytes(regular_bytes, bold_bytes)
    }

    fn face(&self, bold: bool) -> &FontArc {
        match (&self.bold, bold) {
            (Some(face), true) => face,
            _ => &self.regular,
        }
    }
}

// ============================================================================
// Raster Surface
// ============================================================================

/// RGBA page buffer at `supersample` times the logical size.
pub struct RasterSurface {
    size: CanvasSize,
    supersample: u32,
    pixels: RgbaImage,
    fonts: Option<FontSet>,
    font: FontDescriptor,
    missing_font_warned: bool,
}

impl RasterSurface {
    pub fn new(size: CanvasSize, supersample: u32, fonts: Option<FontSet>) -> Self {
        let supersample = supersample.max(1);
        let (w, h) = size.backing(supersample);
        RasterSurface {
            size,
            supersample,
            pixels: RgbaImage::from_pixel(w.max(1), h.max(1), Rgba([255, 255, 255, 255])),
            fonts,
            font: FontDescriptor {
                px: 10.0,
                bold: false,
            },
            missing_font_warned: false,
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_pixels(self) -> RgbaImage {
        self.pixels
    }

    fn device(&self, v: f32) -> f32 {
        v * self.supersample as f32
    }
}

impl Surface for RasterSurface {
    fn size(&self) -> CanvasSize {
        self.size
    }

    fn set_font(&mut self, font: FontDescriptor) {
        self.font = font;
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32) {
        if text.is_empty() {
            return;
        }
        let Some(fonts) = self.fonts.as_ref() else {
            if !self.missing_font_warned {
                log::warn!("no font loaded, text layer left blank");
                self.missing_font_warned = true;
            }
            return;
        };

        let face = fonts.face(self.font.bold);
        let px = self.device(self.font.px);
        let scale = PxScale::from(px);
        let scaled = face.as_scaled(scale);
        let baseline = self.device(y);
        let mut caret = self.device(x);
        let mut previous = None;

        let (width, height) = self.pixels.dimensions();
        for ch in text.chars() {
            let id = face.glyph_id(ch);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            let glyph = id.with_scale_and_position(scale, point(caret, baseline));
            caret += scaled.h_advance(id);
            previous = Some(id);

            let Some(outlined) = face.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            let pixels = &mut self.pixels;
            outlined.draw(|gx, gy, coverage| {
                let px = gx as i64 + bounds.min.x as i64;
                let py = gy as i64 + bounds.min.y as i64;
                if px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
                    return;
                }
                let dst = pixels.get_pixel_mut(px as u32, py as u32);
                blend_ink(dst, coverage.min(1.0));
            });
        }
    }

    fn draw_image(&mut self, image: &RgbaImage, x: f32, y: f32, width: f32, height: f32) {
        let w = self.device(width).round() as u32;
        let h = self.device(height).round() as u32;
        if w == 0 || h == 0 || image.width() == 0 || image.height() == 0 {
            return;
        }
        let scaled;
        let source = if image.dimensions() == (w, h) {
            image
        } else {
            scaled = imageops::resize(image, w, h, FilterType::Triangle);
            &scaled
        };
        let (left, top) = (self.device(x).round() as i64, self.device(y).round() as i64);
        imageops::overlay(&mut self.pixels, source, left, top);
    }
}

fn blend_ink(dst: &mut Rgba<u8>, coverage: f32) {
    let Rgba([r, g, b, a]) = *dst;
    let mix = |bg: u8, fg: u8| (fg as f32 * coverage + bg as f32 * (1.0 - coverage)).round() as u8;
    *dst = Rgba([mix(r, INK[0]), mix(g, INK[1]), mix(b, INK[2]), a.max((coverage * 255.0) as u8)]);
}
