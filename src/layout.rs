// Coordinate tables and template descriptors for the fixed paper forms
//
// Every position is a fraction of the canvas width/height so the same table
// works at any render resolution.

use crate::record::{AbsenceKind, AbsenceTime};
use crate::resolution::{CanvasSize, FontTier};

// ============================================================================
// Coordinates
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateEntry {
    pub fx: f32,
    pub fy: f32,
}

pub const fn at(fx: f32, fy: f32) -> CoordinateEntry {
    CoordinateEntry { fx, fy }
}

impl CoordinateEntry {
    /// Absolute position on a canvas of the given logical size.
    pub fn resolve(&self, size: CanvasSize) -> (f32, f32) {
        (self.fx * size.width, self.fy * size.height)
    }

    pub fn offset(&self, dx: f32, dy: f32) -> CoordinateEntry {
        at(self.fx + dx, self.fy + dy)
    }
}

// ============================================================================
// Text Fields
// ============================================================================

/// Which value a text field paints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKey {
    Name,
    Birthday,
    AbsentYear,
    AbsentMonth,
    AbsentDay,
    AbsentReason,
    AbsentDetail,
    AbsentPlace,
    /// Filing date stamp parts, taken from the clock at render time
    FilingYear,
    FilingMonth,
    FilingDay,
}

/// One painted line of a paginated field: chars `start..end`, offset from the
/// field's base coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSlice {
    pub start: usize,
    pub end: usize,
    pub dx: f32,
    pub dy: f32,
}

const fn line(start: usize, end: usize, dx: f32, dy: f32) -> LineSlice {
    LineSlice { start, end, dx, dy }
}

/// Vertical advance between wrapped lines, as a fraction of canvas height
pub const LINE_ADVANCE: f32 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextField {
    pub key: FieldKey,
    pub at: CoordinateEntry,
    pub tier: FontTier,
    /// `None` paints the whole value on one line
    pub split: Option<&'static [LineSlice]>,
}

const fn text(key: FieldKey, at: CoordinateEntry, tier: FontTier) -> TextField {
    TextField {
        key,
        at,
        tier,
        split: None,
    }
}

const fn wrapped(
    key: FieldKey,
    at: CoordinateEntry,
    tier: FontTier,
    split: &'static [LineSlice],
) -> TextField {
    TextField {
        key,
        at,
        tier,
        split: Some(split),
    }
}

/// Reason box layout chosen by the absence kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KindBranch {
    pub official: TextField,
    pub personal: TextField,
}

impl KindBranch {
    pub fn for_kind(&self, kind: AbsenceKind) -> &TextField {
        match kind {
            AbsenceKind::Official => &self.official,
            AbsenceKind::Personal => &self.personal,
        }
    }
}

// ============================================================================
// Check Marks and Image Overlays
// ============================================================================

/// Check glyph edge as a fraction of the logical canvas width.
///
/// At the default 2x supersampling this matches `backing_width * 0.018 / 2`;
/// other factors keep the logical size and scale the backing pixels.
pub const CHECK_SIZE_RATIO: f32 = 0.018;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSlots {
    pub morning: CoordinateEntry,
    pub afternoon: CoordinateEntry,
    pub full_day: CoordinateEntry,
}

impl TimeSlots {
    pub fn slot(&self, time: AbsenceTime) -> CoordinateEntry {
        match time {
            AbsenceTime::Morning => self.morning,
            AbsenceTime::Afternoon => self.afternoon,
            AbsenceTime::FullDay => self.full_day,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KindSlots {
    pub official: CoordinateEntry,
    pub personal: CoordinateEntry,
}

impl KindSlots {
    pub fn slot(&self, kind: AbsenceKind) -> CoordinateEntry {
        match kind {
            AbsenceKind::Official => self.official,
            AbsenceKind::Personal => self.personal,
        }
    }
}

/// Image layers drawn on top of a template background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Overlay {
    CheckMark,
    Signature,
    Appendix,
}

/// A record-supplied image stretched into a fractional rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSlot {
    pub overlay: Overlay,
    pub at: CoordinateEntry,
    pub width: f32,
    pub height: f32,
}

// ============================================================================
// Template Descriptor
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageTemplate {
    /// Background asset path, relative to the asset root
    pub background: &'static str,
    pub texts: &'static [TextField],
    pub reason_box: Option<KindBranch>,
    pub kind_check: Option<KindSlots>,
    pub time_check: Option<TimeSlots>,
    pub images: &'static [ImageSlot],
}

impl PageTemplate {
    pub fn overlays(&self) -> impl Iterator<Item = Overlay> + '_ {
        let check = (self.kind_check.is_some() || self.time_check.is_some())
            .then_some(Overlay::CheckMark);
        check.into_iter().chain(self.images.iter().map(|slot| slot.overlay))
    }
}

/// Everything that differs between document types.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateDescriptor {
    pub title: &'static str,
    /// Label placed in the exported file name
    pub file_label: &'static str,
    pub check_glyph: &'static str,
    pub pages: &'static [PageTemplate],
}

impl TemplateDescriptor {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

// ============================================================================
// 출결확인서 (absence confirmation)
// ============================================================================

const DETAIL_LINES: &[LineSlice] = &[
    line(0, 20, 0.0, 0.0),
    line(20, 40, 0.0, LINE_ADVANCE),
    line(40, 60, 0.0, LINE_ADVANCE * 2.0),
    line(60, 80, 0.0, LINE_ADVANCE * 3.0),
];

const OFFICIAL_REASON_LINES: &[LineSlice] = &[
    line(0, 20, 0.0, 0.0),
    line(20, 40, 0.0, LINE_ADVANCE),
];

// The personal box starts mid-line on the paper form; its continuation
// line begins at the left edge of the box.
const PERSONAL_REASON_LINES: &[LineSlice] = &[
    line(0, 12, 0.0, 0.0),
    line(12, 40, -0.29, 0.023),
];

const CONFIRMATION_TEXTS: &[TextField] = &[
    text(FieldKey::Name, at(0.32, 0.2293), FontTier::Body),
    text(FieldKey::Birthday, at(0.66, 0.229), FontTier::Body),
    text(FieldKey::AbsentYear, at(0.354, 0.273), FontTier::Body),
    text(FieldKey::AbsentMonth, at(0.444, 0.273), FontTier::Body),
    text(FieldKey::AbsentDay, at(0.52, 0.273), FontTier::Body),
    text(FieldKey::AbsentPlace, at(0.32, 0.647), FontTier::Body),
    wrapped(FieldKey::AbsentDetail, at(0.35, 0.55), FontTier::Body, DETAIL_LINES),
    // Applicant name beside the signature
    text(FieldKey::Name, at(0.32, 0.68), FontTier::Body),
    text(FieldKey::FilingYear, at(0.374, 0.9005), FontTier::Stamp),
    text(FieldKey::FilingMonth, at(0.485, 0.9005), FontTier::Stamp),
    text(FieldKey::FilingDay, at(0.585, 0.9005), FontTier::Stamp),
];

const CONFIRMATION_REASON: KindBranch = KindBranch {
    official: wrapped(
        FieldKey::AbsentReason,
        at(0.31, 0.413),
        FontTier::Reason,
        OFFICIAL_REASON_LINES,
    ),
    personal: wrapped(
        FieldKey::AbsentReason,
        at(0.53, 0.455),
        FontTier::Reason,
        PERSONAL_REASON_LINES,
    ),
};

const CONFIRMATION_PAGES: &[PageTemplate] = &[
    PageTemplate {
        background: "소명확인서.png",
        texts: CONFIRMATION_TEXTS,
        reason_box: Some(CONFIRMATION_REASON),
        kind_check: Some(KindSlots {
            official: at(0.102, 0.201),
            personal: at(0.102, 0.2223),
        }),
        time_check: Some(TimeSlots {
            morning: at(0.6075, 0.26),
            afternoon: at(0.7, 0.26),
            full_day: at(0.7915, 0.26),
        }),
        images: &[ImageSlot {
            overlay: Overlay::Signature,
            at: at(0.8, 0.64),
            width: 0.14,
            height: 0.07,
        }],
    },
    PageTemplate {
        background: "소명확인서-별첨.png",
        texts: &[],
        reason_box: None,
        kind_check: None,
        time_check: None,
        images: &[ImageSlot {
            overlay: Overlay::Appendix,
            at: at(0.1, 0.12),
            width: 0.5,
            height: 0.5,
        }],
    },
];

/// Two-page absence confirmation with its appendix sheet.
pub static CONFIRMATION: TemplateDescriptor = TemplateDescriptor {
    title: "소명확인서",
    file_label: "출결확인서",
    check_glyph: "체크.png",
    pages: CONFIRMATION_PAGES,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolution::compute_canvas_size;

    fn all_coordinates(page: &PageTemplate) -> Vec<CoordinateEntry> {
        let mut coords: Vec<CoordinateEntry> = page.texts.iter().map(|t| t.at).collect();
        if let Some(branch) = page.reason_box {
            coords.push(branch.official.at);
            coords.push(branch.personal.at);
        }
        if let Some(slots) = page.kind_check {
            coords.extend([slots.official, slots.personal]);
        }
        if let Some(slots) = page.time_check {
            coords.extend([slots.morning, slots.afternoon, slots.full_day]);
        }
        coords.extend(page.images.iter().map(|slot| slot.at));
        coords
    }

    #[test]
    fn coordinates_are_fractions() {
        for page in CONFIRMATION.pages {
            for c in all_coordinates(page) {
                assert!((0.0..=1.0).contains(&c.fx), "{:?}", c);
                assert!((0.0..=1.0).contains(&c.fy), "{:?}", c);
            }
        }
    }

    #[test]
    fn resolve_scales_by_canvas_size() {
        for width in [200u32, 800, 1234] {
            let size = compute_canvas_size(width).unwrap();
            for c in all_coordinates(&CONFIRMATION.pages[0]) {
                let (x, y) = c.resolve(size);
                assert_eq!(x, c.fx * size.width);
                assert_eq!(y, c.fy * size.height);
            }
        }
    }

    #[test]
    fn confirmation_has_two_pages_with_appendix_last() {
        assert_eq!(CONFIRMATION.page_count(), 2);
        let first: Vec<Overlay> = CONFIRMATION.pages[0].overlays().collect();
        let second: Vec<Overlay> = CONFIRMATION.pages[1].overlays().collect();
        assert_eq!(first, vec![Overlay::CheckMark, Overlay::Signature]);
        assert_eq!(second, vec![Overlay::Appendix]);
    }

    #[test]
    fn check_slots_are_distinct_per_category() {
        let page = &CONFIRMATION.pages[0];
        let time = page.time_check.unwrap();
        let times = [
            time.slot(AbsenceTime::Morning),
            time.slot(AbsenceTime::Afternoon),
            time.slot(AbsenceTime::FullDay),
        ];
        assert!(times[0].fx < times[1].fx && times[1].fx < times[2].fx);

        let kind = page.kind_check.unwrap();
        assert_ne!(kind.slot(AbsenceKind::Official), kind.slot(AbsenceKind::Personal));
    }

    #[test]
    fn detail_lines_cover_eighty_chars_without_gaps() {
        let mut expected_start = 0;
        for (i, slice) in DETAIL_LINES.iter().enumerate() {
            assert_eq!(slice.start, expected_start);
            assert_eq!(slice.end - slice.start, 20);
            assert!((slice.dy - LINE_ADVANCE * i as f32).abs() < 1e-6);
            expected_start = slice.end;
        }
        assert_eq!(expected_start, 80);
    }
}
