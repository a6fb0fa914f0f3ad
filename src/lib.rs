//! Document compositing for attendance confirmation forms.
//!
//! Takes an [`AttendanceRecord`] plus its signature and appendix images,
//! overlays them onto the fixed template images of the paper form at
//! fractional coordinates, and exports the pages as an A4 PDF.
//!
//! | Module | Role |
//! |--------|------|
//! | [`layout`] | Coordinate tables and template descriptors |
//! | [`resolution`] | Canvas sizing and font tiers |
//! | [`render`] | Field placement and painting |
//! | [`compositor`] | Per-page image loading and drawing |
//! | [`export`] | PDF assembly and file naming |

pub mod compositor;
pub mod error;
pub mod export;
pub mod form;
pub mod layout;
pub mod loader;
pub mod record;
pub mod render;
pub mod resolution;
pub mod surface;

pub use compositor::{Composition, Compositor, PageCanvas};
pub use error::AppError;
pub use layout::{TemplateDescriptor, CONFIRMATION};
pub use loader::ImageLoader;
pub use record::{AbsenceKind, AbsenceTime, AttendanceRecord, ImageRef, RecordStore};
