// Template Compositor: loads page images and drives the Field Renderer
//
// Each page is composed in its own task. All loads for a page start at once;
// the background is awaited and drawn first, then each overlay in turn, then
// the fields. Pages finish in any order and are slotted back by index.

use image::RgbaImage;
use std::sync::Arc;
use tokio::task::{JoinHandle, JoinSet};

use crate::error::AppError;
use crate::layout::{Overlay, PageTemplate, TemplateDescriptor};
use crate::loader::ImageLoader;
use crate::record::AttendanceRecord;
use crate::render::{render_fields, FilingDate, Overlays};
use crate::resolution::{compute_canvas_size, CanvasSize, DEFAULT_SUPERSAMPLE};
use crate::surface::{FontSet, RasterSurface, Surface};

/// One fully composed page.
#[derive(Debug, Clone)]
pub struct PageCanvas {
    pub index: usize,
    pub size: CanvasSize,
    pub pixels: RgbaImage,
}

#[derive(Debug)]
pub struct Composition {
    pub size: CanvasSize,
    /// One slot per template page; `None` where the page could not be composed
    pub pages: Vec<Option<PageCanvas>>,
    /// Degradations the user should hear about
    pub warnings: Vec<String>,
}

impl Composition {
    pub fn expected_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn produced_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.produced_pages() == self.expected_pages()
    }
}

pub struct Compositor {
    descriptor: &'static TemplateDescriptor,
    loader: ImageLoader,
    fonts: Option<FontSet>,
    supersample: u32,
}

struct PageJob {
    index: usize,
    page: &'static PageTemplate,
    check_glyph: &'static str,
    size: CanvasSize,
    supersample: u32,
    loader: ImageLoader,
    fonts: Option<FontSet>,
    record: Arc<AttendanceRecord>,
    stamp: FilingDate,
}

struct PageOutcome {
    index: usize,
    canvas: Option<PageCanvas>,
    warnings: Vec<String>,
}

impl Compositor {
    pub fn new(descriptor: &'static TemplateDescriptor, loader: ImageLoader) -> Self {
        Compositor {
            descriptor,
            loader,
            fonts: None,
            supersample: DEFAULT_SUPERSAMPLE,
        }
    }

    pub fn with_fonts(mut self, fonts: Option<FontSet>) -> Self {
        self.fonts = fonts;
        self
    }

    pub fn with_supersample(mut self, supersample: u32) -> Self {
        self.supersample = supersample.max(1);
        self
    }

    /// Compose every page, stamping today's date.
    ///
    /// Returns `Ok(None)` when the container has no width yet.
    pub async fn compose(
        &self,
        record: Arc<AttendanceRecord>,
        container_width: u32,
    ) -> Result<Option<Composition>, AppError> {
        self.compose_with_stamp(record, container_width, FilingDate::today()).await
    }

    pub async fn compose_with_stamp(
        &self,
        record: Arc<AttendanceRecord>,
        container_width: u32,
        stamp: FilingDate,
    ) -> Result<Option<Composition>, AppError> {
        let Some(size) = compute_canvas_size(container_width) else {
            log::debug!("container width is zero, render deferred");
            return Ok(None);
        };
        Ok(Some(self.compose_at(record, size, stamp).await))
    }

    /// Compose every page at an already resolved canvas size.
    ///
    /// A page whose task dies is reported as omitted; the other pages still
    /// finish.
    pub async fn compose_at(
        &self,
        record: Arc<AttendanceRecord>,
        size: CanvasSize,
        stamp: FilingDate,
    ) -> Composition {
        let mut tasks = JoinSet::new();
        for (index, page) in self.descriptor.pages.iter().enumerate() {
            let job = PageJob {
                index,
                page,
                check_glyph: self.descriptor.check_glyph,
                size,
                supersample: self.supersample,
                loader: self.loader.clone(),
                fonts: self.fonts.clone(),
                record: Arc::clone(&record),
                stamp: stamp.clone(),
            };
            tasks.spawn(async move {
                match tokio::spawn(compose_page(job)).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        let warning = format!("page {}: composition failed, page omitted ({})", index + 1, e);
                        abandon::<()>(index, Vec::new(), vec![warning])
                    }
                }
            });
        }

        let mut pages: Vec<Option<PageCanvas>> = vec![None; self.descriptor.page_count()];
        let mut warnings = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    warnings.extend(outcome.warnings);
                    pages[outcome.index] = outcome.canvas;
                }
                Err(e) => {
                    log::warn!("page task lost: {}", e);
                    warnings.push(format!("a page task was lost ({})", e));
                }
            }
        }

        Composition {
            size,
            pages,
            warnings,
        }
    }
}

fn spawn_overlay_load(job: &PageJob, overlay: Overlay) -> JoinHandle<Result<Option<RgbaImage>, AppError>> {
    let loader = job.loader.clone();
    let record = Arc::clone(&job.record);
    let check_glyph = job.check_glyph;
    tokio::spawn(async move {
        match overlay {
            Overlay::CheckMark => loader.load_asset(check_glyph).await.map(Some),
            Overlay::Signature => loader.load(&record.signature_url).await,
            Overlay::Appendix => loader.load(&record.appendix).await,
        }
    })
}

async fn compose_page(job: PageJob) -> PageOutcome {
    let page_no = job.index + 1;
    let mut warnings = Vec::new();

    let background = {
        let loader = job.loader.clone();
        let name = job.page.background;
        tokio::spawn(async move { loader.load_asset(name).await })
    };
    let overlay_loads: Vec<(Overlay, JoinHandle<_>)> = job
        .page
        .overlays()
        .map(|overlay| (overlay, spawn_overlay_load(&job, overlay)))
        .collect();

    let background = match background.await {
        Ok(Ok(image)) => image,
        Ok(Err(e)) => {
            warnings.push(format!("page {}: background unavailable, page omitted ({})", page_no, e));
            return abandon(job.index, overlay_loads, warnings);
        }
        Err(e) => {
            warnings.push(format!("page {}: background load aborted ({})", page_no, e));
            return abandon(job.index, overlay_loads, warnings);
        }
    };

    let mut surface = RasterSurface::new(job.size, job.supersample, job.fonts.clone());
    surface.draw_image(&background, 0.0, 0.0, job.size.width, job.size.height);

    let mut overlays = Overlays::new();
    for (overlay, handle) in overlay_loads {
        match handle.await {
            Ok(Ok(Some(image))) => overlays.insert(overlay, image),
            Ok(Ok(None)) => log::debug!("page {}: {:?} not set, overlay suppressed", page_no, overlay),
            Ok(Err(e)) => warnings.push(format!("page {}: {:?} overlay omitted ({})", page_no, overlay, e)),
            Err(e) => warnings.push(format!("page {}: {:?} load aborted ({})", page_no, overlay, e)),
        }
    }

    render_fields(&mut surface, job.page, &job.record, &job.stamp, &overlays);
    for warning in &warnings {
        log::warn!("{}", warning);
    }
    log::info!("page {} composed", page_no);

    PageOutcome {
        index: job.index,
        canvas: Some(PageCanvas {
            index: job.index,
            size: job.size,
            pixels: surface.into_pixels(),
        }),
        warnings,
    }
}

fn abandon<T>(index: usize, loads: Vec<(Overlay, JoinHandle<T>)>, warnings: Vec<String>) -> PageOutcome {
    for (_, handle) in loads {
        handle.abort();
    }
    for warning in &warnings {
        log::warn!("{}", warning);
    }
    PageOutcome {
        index,
        canvas: None,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::CONFIRMATION;
    use crate::record::ImageRef;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use chrono::NaiveDate;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;
    use std::path::Path;

    const PAPER: Rgba<u8> = Rgba([240, 240, 240, 255]);
    const INK: Rgba<u8> = Rgba([20, 40, 200, 255]);

    fn png(color: Rgba<u8>, w: u32, h: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        RgbaImage::from_pixel(w, h, color)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn write_assets(dir: &Path, with_appendix_page: bool) {
        std::fs::write(dir.join("소명확인서.png"), png(PAPER, 21, 30)).unwrap();
        if with_appendix_page {
            std::fs::write(dir.join("소명확인서-별첨.png"), png(PAPER, 21, 30)).unwrap();
        }
        std::fs::write(dir.join("체크.png"), png(Rgba([0, 0, 0, 255]), 2, 2)).unwrap();
    }

    fn record() -> Arc<AttendanceRecord> {
        Arc::new(AttendanceRecord {
            name: "홍길동".to_string(),
            signature_url: ImageRef::new(format!("data:image/png;base64,{}", STANDARD.encode(png(INK, 7, 5)))),
            ..AttendanceRecord::default()
        })
    }

    fn stamp() -> FilingDate {
        FilingDate::from_date(NaiveDate::from_ymd_opt(2025, 1, 11).unwrap())
    }

    fn compositor(dir: &Path) -> Compositor {
        Compositor::new(&CONFIRMATION, ImageLoader::new(dir))
    }

    #[tokio::test]
    async fn composes_every_template_page() {
        let dir = tempfile::tempdir().unwrap();
        write_assets(dir.path(), true);

        let composition = compositor(dir.path())
            .compose_with_stamp(record(), 100, stamp())
            .await
            .unwrap()
            .unwrap();

        assert!(composition.is_complete());
        assert_eq!(composition.produced_pages(), 2);
        assert!(composition.warnings.is_empty(), "{:?}", composition.warnings);

        let first = composition.pages[0].as_ref().unwrap();
        assert_eq!(first.pixels.dimensions(), (200, 282));
        assert_eq!(*first.pixels.get_pixel(2, 2), PAPER);
        // signature box spans (0.8W, 0.64H) .. (0.94W, 0.71H)
        let sig = first.pixels.get_pixel(170, 190);
        assert!(sig[2] > 150 && sig[0] < 80, "{:?}", sig);
        assert_eq!(composition.pages[1].as_ref().unwrap().index, 1);
    }

    #[tokio::test]
    async fn zero_width_defers() {
        let dir = tempfile::tempdir().unwrap();
        write_assets(dir.path(), true);
        let result = compositor(dir.path()).compose(record(), 0).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn missing_background_omits_only_that_page() {
        let dir = tempfile::tempdir().unwrap();
        write_assets(dir.path(), false);

        let composition = compositor(dir.path())
            .compose_with_stamp(record(), 100, stamp())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(composition.expected_pages(), 2);
        assert_eq!(composition.produced_pages(), 1);
        assert!(composition.pages[1].is_none());
        assert!(composition.warnings.iter().any(|w| w.contains("page 2")));
    }

    #[tokio::test]
    async fn broken_overlay_still_yields_the_page() {
        let dir = tempfile::tempdir().unwrap();
        write_assets(dir.path(), true);
        let record = Arc::new(AttendanceRecord {
            signature_url: ImageRef::new("data:image/png;base64,AAAA"),
            appendix: ImageRef::new("nowhere/appendix.png"),
            ..AttendanceRecord::default()
        });

        let composition = compositor(dir.path())
            .compose_with_stamp(record, 100, stamp())
            .await
            .unwrap()
            .unwrap();

        assert!(composition.is_complete());
        assert_eq!(composition.warnings.len(), 2, "{:?}", composition.warnings);
        let first = composition.pages[0].as_ref().unwrap();
        assert_eq!(*first.pixels.get_pixel(170, 190), PAPER);
    }

    #[tokio::test]
    async fn unset_overlays_are_suppressed_silently() {
        let dir = tempfile::tempdir().unwrap();
        write_assets(dir.path(), true);
        let composition = compositor(dir.path())
            .compose_with_stamp(Arc::new(AttendanceRecord::default()), 100, stamp())
            .await
            .unwrap()
            .unwrap();
        assert!(composition.is_complete());
        assert!(composition.warnings.is_empty());
    }

    #[tokio::test]
    async fn failing_page_task_is_omitted_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_assets(dir.path(), true);

        // Backing buffer for this width cannot be allocated
        let composition = compositor(dir.path())
            .compose_with_stamp(record(), u32::MAX, stamp())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(composition.expected_pages(), 2);
        assert_eq!(composition.produced_pages(), 0);
        assert_eq!(composition.warnings.len(), 2, "{:?}", composition.warnings);
        assert!(composition.warnings.iter().all(|w| w.contains("page omitted")));
    }

    #[tokio::test]
    async fn check_mark_keeps_its_logical_size_at_any_supersample() {
        let dir = tempfile::tempdir().unwrap();
        write_assets(dir.path(), true);
        let composition = compositor(dir.path())
            .with_supersample(3)
            .compose_with_stamp(record(), 100, stamp())
            .await
            .unwrap()
            .unwrap();

        let first = composition.pages[0].as_ref().unwrap();
        assert_eq!(first.pixels.dimensions(), (300, 424));
        // official slot (0.102W, 0.201H) at 3x, edge 0.018W = 1.8 logical px = 5 device px
        let black = Rgba([0, 0, 0, 255]);
        assert_eq!(*first.pixels.get_pixel(31, 85), black);
        assert_eq!(*first.pixels.get_pixel(35, 89), black);
        assert_eq!(*first.pixels.get_pixel(37, 87), PAPER);
    }

    #[tokio::test]
    async fn compose_at_uses_the_given_size() {
        let dir = tempfile::tempdir().unwrap();
        write_assets(dir.path(), true);
        let size = compute_canvas_size(90).unwrap();

        let composition = compositor(dir.path()).compose_at(record(), size, stamp()).await;
        assert!(composition.is_complete());
        let first = composition.pages[0].as_ref().unwrap();
        assert_eq!(first.pixels.dimensions(), size.backing(DEFAULT_SUPERSAMPLE));
    }

    #[tokio::test]
    async fn redraw_is_pixel_identical() {
        let dir = tempfile::tempdir().unwrap();
        write_assets(dir.path(), true);
        let compositor = compositor(dir.path()).with_supersample(2);

        let a = compositor.compose_with_stamp(record(), 120, stamp()).await.unwrap().unwrap();
        let b = compositor.compose_with_stamp(record(), 120, stamp()).await.unwrap().unwrap();
        for (pa, pb) in a.pages.iter().zip(b.pages.iter()) {
            assert_eq!(pa.as_ref().unwrap().pixels, pb.as_ref().unwrap().pixels);
        }
    }
}
