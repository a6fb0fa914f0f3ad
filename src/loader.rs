// Asynchronous image loading for templates and overlays

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::RgbaImage;
use std::io::Read;
use std::path::PathBuf;

use crate::error::AppError;
use crate::record::{ImageRef, ImageSource};

/// Loads template assets from an asset root and record images from any
/// [`ImageRef`] source. Cheap to clone into per-page tasks.
#[derive(Debug, Clone)]
pub struct ImageLoader {
    asset_root: PathBuf,
}

impl ImageLoader {
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        ImageLoader {
            asset_root: asset_root.into(),
        }
    }

    /// Load a fixed template asset (background, check glyph).
    pub async fn load_asset(&self, name: &str) -> Result<RgbaImage, AppError> {
        let path = self.asset_root.join(name.trim_start_matches('/'));
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| AppError::image(&path.display().to_string(), e))?;
        decode(bytes, name.to_string()).await
    }

    /// Load a record-supplied image. Unset references yield `Ok(None)`.
    pub async fn load(&self, image: &ImageRef) -> Result<Option<RgbaImage>, AppError> {
        let bytes = match image.source()? {
            ImageSource::Unset => return Ok(None),
            ImageSource::DataUrl(payload) => STANDARD
                .decode(payload.trim())
                .map_err(|e| AppError::image(image.as_str(), format!("invalid base64: {}", e)))?,
            ImageSource::Remote(url) => fetch_remote(url.to_string()).await?,
            ImageSource::Path(p) => {
                let path = self.resolve_path(p).await;
                tokio::fs::read(&path)
                    .await
                    .map_err(|e| AppError::image(&path.display().to_string(), e))?
            }
        };
        decode(bytes, image.as_str().to_string()).await.map(Some)
    }

    /// Asset-root-relative first (web-root style `/file.png`), then as given.
    async fn resolve_path(&self, p: &str) -> PathBuf {
        let in_assets = self.asset_root.join(p.trim_start_matches('/'));
        if tokio::fs::metadata(&in_assets).await.is_ok() {
            return in_assets;
        }
        let as_given = PathBuf::from(p);
        if tokio::fs::metadata(&as_given).await.is_ok() {
            as_given
        } else {
            in_assets
        }
    }
}

async fn fetch_remote(url: String) -> Result<Vec<u8>, AppError> {
    let task_url = url.clone();
    tokio::task::spawn_blocking(move || {
        let response = ureq::get(&task_url)
            .call()
            .map_err(|e| AppError::image(&task_url, format!("Failed to fetch URL: {}", e)))?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| AppError::image(&task_url, format!("Failed to read response: {}", e)))?;
        Ok(bytes)
    })
    .await
    .map_err(|e| AppError::image(&url, e))?
}

async fn decode(bytes: Vec<u8>, label: String) -> Result<RgbaImage, AppError> {
    if bytes.is_empty() {
        return Err(AppError::image(&label, "image data is empty"));
    }
    let task_label = label.clone();
    tokio::task::spawn_blocking(move || {
        ::image::load_from_memory(&bytes)
            .map(|img| img.to_rgba8())
            .map_err(|e| AppError::image(&task_label, format!("Failed to decode image: {}", e)))
    })
    .await
    .map_err(|e| AppError::image(&label, e))?
}
