// Field Renderer: resolves a page template against a record and paints it

use chrono::{Datelike, Local, NaiveDate};
use image::RgbaImage;
use std::collections::HashMap;

use crate::layout::{FieldKey, ImageSlot, Overlay, PageTemplate, TextField, CHECK_SIZE_RATIO};
use crate::record::AttendanceRecord;
use crate::resolution::{CanvasSize, FontDescriptor, FontScale};
use crate::surface::Surface;

// ============================================================================
// Filing Date
// ============================================================================

/// Date stamp printed at the bottom of the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingDate {
    /// Two-digit year
    pub year: String,
    /// Month without padding
    pub month: String,
    /// Zero-padded day
    pub day: String,
}

impl FilingDate {
    pub fn from_date(date: NaiveDate) -> Self {
        FilingDate {
            year: format!("{:02}", date.year().rem_euclid(100)),
            month: date.month().to_string(),
            day: format!("{:02}", date.day()),
        }
    }

    pub fn today() -> Self {
        Self::from_date(Local::now().date_naive())
    }
}

// ============================================================================
// Placements
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Glyph {
    Text { text: String, font: FontDescriptor },
    Image { overlay: Overlay, width: f32, height: f32 },
}

/// A resolved draw call. Recomputed on every render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphPlacement {
    pub x: f32,
    pub y: f32,
    pub glyph: Glyph,
}

pub fn field_value<'a>(key: FieldKey, record: &'a AttendanceRecord, stamp: &'a FilingDate) -> &'a str {
    match key {
        FieldKey::Name => record.name.as_str(),
        FieldKey::Birthday => record.birthday.as_str(),
        FieldKey::AbsentYear => record.absent_year.as_str(),
        FieldKey::AbsentMonth => record.absent_month.as_str(),
        FieldKey::AbsentDay => record.absent_day.as_str(),
        FieldKey::AbsentReason => record.absent_reason.as_str(),
        FieldKey::AbsentDetail => record.absent_detail.as_str(),
        FieldKey::AbsentPlace => record.absent_place.as_str(),
        FieldKey::FilingYear => stamp.year.as_str(),
        FieldKey::FilingMonth => stamp.month.as_str(),
        FieldKey::FilingDay => stamp.day.as_str(),
    }
}

/// Character slice `start..end` of `value`; out-of-range slices are empty.
pub fn char_slice(value: &str, start: usize, end: usize) -> String {
    value.chars().skip(start).take(end.saturating_sub(start)).collect()
}

fn plan_text(
    field: &TextField,
    value: &str,
    size: CanvasSize,
    fonts: FontScale,
    out: &mut Vec<GlyphPlacement>,
) {
    let font = fonts.descriptor(field.tier);
    match field.split {
        None => {
            let (x, y) = field.at.resolve(size);
            out.push(GlyphPlacement {
                x,
                y,
                glyph: Glyph::Text {
                    text: value.to_string(),
                    font,
                },
            });
        }
        Some(lines) => {
            for slice in lines {
                let (x, y) = field.at.offset(slice.dx, slice.dy).resolve(size);
                out.push(GlyphPlacement {
                    x,
                    y,
                    glyph: Glyph::Text {
                        text: char_slice(value, slice.start, slice.end),
                        font,
                    },
                });
            }
        }
    }
}

fn plan_image(slot: &ImageSlot, size: CanvasSize) -> GlyphPlacement {
    let (x, y) = slot.at.resolve(size);
    GlyphPlacement {
        x,
        y,
        glyph: Glyph::Image {
            overlay: slot.overlay,
            width: slot.width * size.width,
            height: slot.height * size.height,
        },
    }
}

/// Every draw call for one page, in paint order.
pub fn plan_page(
    page: &PageTemplate,
    record: &AttendanceRecord,
    size: CanvasSize,
    fonts: FontScale,
    stamp: &FilingDate,
) -> Vec<GlyphPlacement> {
    let mut out = Vec::new();

    for field in page.texts {
        plan_text(field, field_value(field.key, record, stamp), size, fonts, &mut out);
    }

    if let Some(branch) = &page.reason_box {
        let field = branch.for_kind(record.absent_category);
        plan_text(field, field_value(field.key, record, stamp), size, fonts, &mut out);
    }

    let check = CHECK_SIZE_RATIO * size.width;
    let check_slots = [
        page.kind_check.map(|slots| slots.slot(record.absent_category)),
        page.time_check.map(|slots| slots.slot(record.absent_time)),
    ];
    for slot in check_slots.into_iter().flatten() {
        let (x, y) = slot.resolve(size);
        out.push(GlyphPlacement {
            x,
            y,
            glyph: Glyph::Image {
                overlay: Overlay::CheckMark,
                width: check,
                height: check,
            },
        });
    }

    out.extend(page.images.iter().map(|slot| plan_image(slot, size)));
    out
}

// ============================================================================
// Painting
// ============================================================================

/// Decoded overlay images available for one page.
#[derive(Debug, Default, Clone)]
pub struct Overlays {
    images: HashMap<Overlay, RgbaImage>,
}

impl Overlays {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, overlay: Overlay, image: RgbaImage) {
        self.images.insert(overlay, image);
    }

    pub fn get(&self, overlay: Overlay) -> Option<&RgbaImage> {
        self.images.get(&overlay)
    }
}

/// Apply placements in order. Returns how many image placements had no
/// decoded overlay and were skipped.
pub fn paint<S: Surface>(surface: &mut S, placements: &[GlyphPlacement], overlays: &Overlays) -> usize {
    let mut skipped = 0;
    let mut active_font = None;
    for placement in placements {
        match &placement.glyph {
            Glyph::Text { text, font } => {
                if active_font != Some(*font) {
                    surface.set_font(*font);
                    active_font = Some(*font);
                }
                surface.fill_text(text, placement.x, placement.y);
            }
            Glyph::Image {
                overlay,
                width,
                height,
            } => match overlays.get(*overlay) {
                Some(image) => surface.draw_image(image, placement.x, placement.y, *width, *height),
                None => {
                    log::debug!("overlay {:?} not available, skipped", overlay);
                    skipped += 1;
                }
            },
        }
    }
    skipped
}

/// Plan against the surface's current size and paint.
pub fn render_fields<S: Surface>(
    surface: &mut S,
    page: &PageTemplate,
    record: &AttendanceRecord,
    stamp: &FilingDate,
    overlays: &Overlays,
) -> Vec<GlyphPlacement> {
    let size = surface.size();
    let placements = plan_page(page, record, size, FontScale::for_size(size), stamp);
    log::debug!("painting {} placements at {}x{}", placements.len(), size.width, size.height);
    paint(surface, &placements, overlays);
    placements
}
