// Resolution Manager: canvas sizing and font scaling

use std::fmt;

// ============================================================================
// Constants
// ============================================================================

/// ISO A-series height/width ratio
pub const PAGE_RATIO: f32 = 1.4142;

/// Backing buffer multiple over the displayed size
pub const DEFAULT_SUPERSAMPLE: u32 = 2;

/// Widest container a page is composed for
pub const MAX_CONTAINER_WIDTH: u32 = 4096;

/// Font size relative to canvas width
const FONT_WIDTH_RATIO: f32 = 0.02;

/// Smallest base font size in pixels
pub const MIN_FONT_PX: f32 = 12.0;

/// Stamp tier scale over the base size
const STAMP_SCALE: f32 = 1.7;

/// Body tier offset over the base size
const BODY_OFFSET_PX: f32 = 4.0;

/// Reason box tier offset over the base size
const REASON_OFFSET_PX: f32 = 2.0;

// ============================================================================
// Canvas Size
// ============================================================================

/// Logical (displayed) canvas size in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSize {
    pub width: f32,
    pub height: f32,
}

impl CanvasSize {
    /// Backing pixel dimensions at the given supersampling factor.
    pub fn backing(&self, supersample: u32) -> (u32, u32) {
        let s = supersample.max(1) as f32;
        ((self.width * s) as u32, (self.height * s) as u32)
    }
}

/// Size a page canvas to fill the container width at A4 proportions.
///
/// Returns `None` while the container has no width yet.
pub fn compute_canvas_size(container_width: u32) -> Option<CanvasSize> {
    if container_width == 0 {
        return None;
    }
    let width = container_width as f32;
    Some(CanvasSize {
        width,
        height: width * PAGE_RATIO,
    })
}

// ============================================================================
// Font Tiers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontTier {
    /// Regular field text
    Body,
    /// Free-text reason box
    Reason,
    /// Bold filing date stamp
    Stamp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontDescriptor {
    pub px: f32,
    pub bold: bool,
}

impl fmt::Display for FontDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bold {
            write!(f, "bold {}px serif", self.px)
        } else {
            write!(f, "{}px serif", self.px)
        }
    }
}

/// Font descriptors derived from one canvas width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontScale {
    pub base_px: f32,
}

impl FontScale {
    pub fn for_size(size: CanvasSize) -> Self {
        FontScale {
            base_px: (size.width * FONT_WIDTH_RATIO).max(MIN_FONT_PX),
        }
    }

    pub fn descriptor(&self, tier: FontTier) -> FontDescriptor {
        match tier {
            FontTier::Body => FontDescriptor {
                px: self.base_px + BODY_OFFSET_PX,
                bold: false,
            },
            FontTier::Reason => FontDescriptor {
                px: self.base_px + REASON_OFFSET_PX,
                bold: false,
            },
            FontTier::Stamp => FontDescriptor {
                px: self.base_px * STAMP_SCALE,
                bold: true,
            },
        }
    }
}

// ============================================================================
// Resize Observation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resize {
    /// Container not laid out yet; try again on the next event
    Deferred,
    Unchanged,
    Redraw(CanvasSize),
}

/// Tracks the last observed container width and decides when a full redraw is due.
#[derive(Debug, Default)]
pub struct SizeWatcher {
    current: Option<CanvasSize>,
}

impl SizeWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<CanvasSize> {
        self.current
    }

    pub fn observe(&mut self, container_width: u32) -> Resize {
        match compute_canvas_size(container_width) {
            None => Resize::Deferred,
            Some(size) if self.current == Some(size) => Resize::Unchanged,
            Some(size) => {
                log::debug!("canvas resized to {}x{}", size.width, size.height);
                self.current = Some(size);
                Resize::Redraw(size)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn height_follows_page_ratio() {
        for width in [1u32, 320, 375, 800, 1024, 1920, 4096] {
            let size = compute_canvas_size(width).unwrap();
            assert_eq!(size.width, width as f32);
            assert!((size.height - width as f32 * PAGE_RATIO).abs() < 1e-3);
        }
    }

    #[test]
    fn zero_width_defers() {
        assert_eq!(compute_canvas_size(0), None);
    }

    #[test]
    fn backing_buffer_is_supersampled() {
        let size = compute_canvas_size(800).unwrap();
        assert_eq!(size.backing(2), (1600, 2262));
        assert_eq!(size.backing(1), (800, 1131));
        // A zero factor is treated as 1
        assert_eq!(size.backing(0), (800, 1131));
    }

    #[test]
    fn font_size_has_a_floor() {
        let small = FontScale::for_size(compute_canvas_size(300).unwrap());
        assert_eq!(small.base_px, MIN_FONT_PX);

        let large = FontScale::for_size(compute_canvas_size(800).unwrap());
        assert!((large.base_px - 16.0).abs() < 1e-4);
        assert!((large.descriptor(FontTier::Body).px - 20.0).abs() < 1e-4);
        assert!((large.descriptor(FontTier::Reason).px - 18.0).abs() < 1e-4);
        let stamp = large.descriptor(FontTier::Stamp);
        assert!(stamp.bold);
        assert!((stamp.px - 27.2).abs() < 1e-4);
    }

    #[test]
    fn descriptors_print_like_css_fonts() {
        let scale = FontScale { base_px: 12.0 };
        assert_eq!(scale.descriptor(FontTier::Body).to_string(), "16px serif");
        assert_eq!(scale.descriptor(FontTier::Reason).to_string(), "14px serif");
    }

    #[test]
    fn watcher_reports_redraw_only_on_change() {
        let mut watcher = SizeWatcher::new();
        assert_eq!(watcher.observe(0), Resize::Deferred);
        assert!(matches!(watcher.observe(640), Resize::Redraw(_)));
        assert_eq!(watcher.observe(640), Resize::Unchanged);
        assert!(matches!(watcher.observe(720), Resize::Redraw(s) if s.width == 720.0));
        // A collapse to zero does not forget the last good size
        assert_eq!(watcher.observe(0), Resize::Deferred);
        assert_eq!(watcher.current().map(|s| s.width), Some(720.0));
    }
}
