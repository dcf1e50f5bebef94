//! Screenshot from a PNG already on disk (hosts without a live browser).

use super::ScreenshotSource;
use crate::error::CaptureError;
use async_trait::async_trait;
use base64::Engine;
use std::path::PathBuf;

/// Encode PNG bytes as a `data:image/png;base64,` URL.
pub fn png_data_url(png_bytes: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png_bytes)
    )
}

pub struct FileScreenshotSource {
    path: PathBuf,
}

impl FileScreenshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ScreenshotSource for FileScreenshotSource {
    async fn capture(&self) -> Result<String, CaptureError> {
        let start = std::time::Instant::now();
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            CaptureError::Failed(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        log::info!(
            "[CAPTURE] Loaded {} ({} bytes) in {}ms",
            self.path.display(),
            bytes.len(),
            start.elapsed().as_millis()
        );
        Ok(png_data_url(&bytes))
    }
}
