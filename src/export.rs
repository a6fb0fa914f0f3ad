// PDF Exporter: one A4 page per composed canvas

use ::image::{Rgba, RgbImage, RgbaImage};
use printpdf::*;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::compositor::PageCanvas;
use crate::error::AppError;
use crate::record::AttendanceRecord;

// ============================================================================
// Constants
// ============================================================================

/// ISO A4 dimensions in mm
pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;

const MM_PER_INCH: f32 = 25.4;

// ============================================================================
// File Naming
// ============================================================================

/// `{year}{month}{day}_{label}_{name}[{class}].pdf`
pub fn export_filename(record: &AttendanceRecord, label: &str) -> String {
    format!(
        "{}{}{}_{}_{}[{}].pdf",
        record.absent_year, record.absent_month, record.absent_day, label, record.name, record.class
    )
}

// ============================================================================
// Document Assembly
// ============================================================================

/// A built document that has not been written yet, so callers can inspect
/// the page count first.
pub struct AssembledPdf {
    doc: PdfDocumentReference,
    expected: usize,
    produced: usize,
}

impl AssembledPdf {
    pub fn expected_pages(&self) -> usize {
        self.expected
    }

    pub fn produced_pages(&self) -> usize {
        self.produced
    }

    pub fn is_partial(&self) -> bool {
        self.produced < self.expected
    }

    /// Fail instead of writing a document with missing pages.
    pub fn require_complete(self) -> Result<Self, AppError> {
        if self.is_partial() {
            return Err(AppError::PartialExport {
                produced: self.produced,
                expected: self.expected,
            });
        }
        Ok(self)
    }

    pub fn save(self, output_path: &Path) -> Result<(), AppError> {
        let file = File::create(output_path)?;
        let mut writer = BufWriter::new(file);
        self.doc
            .save(&mut writer)
            .map_err(|e| AppError::PdfError(e.to_string()))
    }

    pub fn to_bytes(self) -> Result<Vec<u8>, AppError> {
        self.doc
            .save_to_bytes()
            .map_err(|e| AppError::PdfError(e.to_string()))
    }
}

/// Build a portrait A4 document with one page per present canvas.
///
/// Missing canvases are skipped; the result reports the shortfall.
pub fn assemble(pages: &[Option<PageCanvas>], title: &str) -> Result<AssembledPdf, AppError> {
    let expected = pages.len();
    let mut rasters = pages.iter().flatten();
    let first = rasters.next().ok_or(AppError::NothingToExport)?;

    let (doc, page1, layer1) = PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
    embed_page(&doc.get_page(page1).get_layer(layer1), first);
    let mut produced = 1;

    for canvas in rasters {
        let (page, layer) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        embed_page(&doc.get_page(page).get_layer(layer), canvas);
        produced += 1;
    }

    if produced < expected {
        log::warn!("exporting {} of {} pages", produced, expected);
    }

    Ok(AssembledPdf {
        doc,
        expected,
        produced,
    })
}

fn embed_page(layer: &PdfLayerReference, canvas: &PageCanvas) {
    let rgb_image = flatten_on_white(&canvas.pixels);
    let (width_px, height_px) = rgb_image.dimensions();

    let image = Image::from(ImageXObject {
        width: Px(width_px as usize),
        height: Px(height_px as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: true,
        image_data: rgb_image.into_raw(),
        image_filter: None,
        clipping_bbox: None,
        smask: None,
    });

    // DPI that maps the raster width onto the page width; the height is
    // then stretched by whatever the integer pixel rounding left over.
    let dpi = width_px as f32 / (PAGE_WIDTH_MM / MM_PER_INCH);
    let natural_height_mm = height_px as f32 / dpi * MM_PER_INCH;

    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(0.0)),
            translate_y: Some(Mm(0.0)),
            dpi: Some(dpi),
            scale_y: Some(PAGE_HEIGHT_MM / natural_height_mm),
            ..Default::default()
        },
    );
    log::debug!("embedded page {} at {:.1} dpi", canvas.index + 1, dpi);
}

/// Composite against a white background so transparent regions print as paper.
fn flatten_on_white(rgba_image: &RgbaImage) -> RgbImage {
    let (width_px, height_px) = rgba_image.dimensions();
    let mut rgb_image = RgbImage::new(width_px, height_px);
    for (x, y, pixel) in rgba_image.enumerate_pixels() {
        let Rgba([r, g, b, a]) = *pixel;
        let alpha = a as f32 / 255.0;
        let bg = 255.0;
        let out_r = (r as f32 * alpha + bg * (1.0 - alpha)) as u8;
        let out_g = (g as f32 * alpha + bg * (1.0 - alpha)) as u8;
        let out_b = (b as f32 * alpha + bg * (1.0 - alpha)) as u8;
        rgb_image.put_pixel(x, y, ::image::Rgb([out_r, out_g, out_b]));
    }
    rgb_image
}

// ============================================================================
// Previews
// ============================================================================

/// Write each composed page as `page-{n}.png` into `dir`.
pub fn save_previews(pages: &[Option<PageCanvas>], dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for canvas in pages.iter().flatten() {
        let path = dir.join(format!("page-{}.png", canvas.index + 1));
        canvas
            .pixels
            .save(&path)
            .map_err(|e| AppError::image(&path.display().to_string(), e))?;
        written.push(path);
    }
    Ok(written)
}
