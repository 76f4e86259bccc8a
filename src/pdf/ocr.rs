//! OCR fallback for scanned manuals.
//!
//! Pages are rasterized with `pdftoppm` and read with `tesseract`, both run
//! as child processes inside a scratch directory that is removed afterwards.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::ManualError;

/// Turns the pages of a PDF into text.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Text of the rasterized pages, in page order.
    async fn ocr(&self, pdf: &[u8]) -> Result<String, ManualError>;
}

/// `pdftoppm` + `tesseract` command pipeline.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    /// Pages rasterized at most.
    ///
    /// Default: `10`
    pub max_pages: usize,

    /// Raster resolution.
    ///
    /// Default: `200`
    pub dpi: u32,

    /// Tesseract language.
    ///
    /// Default: `eng`
    pub language: String,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self {
            max_pages: 10,
            dpi: 200,
            language: "eng".to_string(),
        }
    }
}

impl TesseractOcr {
    /// Engine reading at most `max_pages` pages.
    #[must_use]
    pub fn with_max_pages(max_pages: usize) -> Self {
        Self {
            max_pages: max_pages.max(1),
            ..Self::default()
        }
    }
}

async fn run(program: &str, args: &[&str]) -> Result<Vec<u8>, ManualError> {
    let output = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => ManualError::Ocr(format!("{program} not found")),
            _ => ManualError::Ocr(format!("{program}: {e}")),
        })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ManualError::Ocr(format!("{program} exited with {}: {}", output.status, stderr.trim())));
    }
    Ok(output.stdout)
}

/// Rendered page images in page order (`page-01.png`, `page-02.png`, ...).
async fn page_images(dir: &Path) -> Result<Vec<PathBuf>, ManualError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| ManualError::Ocr(format!("read scratch dir: {e}")))?;
    let mut pages = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let is_page = path.extension().is_some_and(|e| e == "png")
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("page"));
        if is_page {
            pages.push(path);
        }
    }
    pages.sort();
    Ok(pages)
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn ocr(&self, pdf: &[u8]) -> Result<String, ManualError> {
        let scratch = tempfile::tempdir().map_err(|e| ManualError::Ocr(format!("scratch dir: {e}")))?;
        let input = scratch.path().join("manual.pdf");
        tokio::fs::write(&input, pdf)
            .await
            .map_err(|e| ManualError::Ocr(format!("write pdf: {e}")))?;

        let input = input.to_string_lossy().into_owned();
        let prefix = scratch.path().join("page").to_string_lossy().into_owned();
        let last_page = self.max_pages.max(1).to_string();
        let dpi = self.dpi.to_string();
        run("pdftoppm", &["-png", "-r", &dpi, "-f", "1", "-l", &last_page, &input, &prefix]).await?;

        let pages = page_images(scratch.path()).await?;
        debug!(pages = pages.len(), "rasterized manual for OCR");

        let mut results = Vec::with_capacity(pages.len());
        for page in pages {
            let page = page.to_string_lossy().into_owned();
            let result = run("tesseract", &[&page, "stdout", "-l", &self.language]).await;
            results.push(result.map(|stdout| String::from_utf8_lossy(&stdout).into_owned()));
        }
        join_pages(results)
    }
}

/// Page texts joined in order. Failed pages are skipped; the result is an
/// error only when no page could be read.
fn join_pages(pages: Vec<Result<String, ManualError>>) -> Result<String, ManualError> {
    let mut text = String::new();
    let mut read_any = false;
    let mut last_error = None;

    for (index, page) in pages.into_iter().enumerate() {
        match page {
            Ok(page_text) => {
                read_any = true;
                if page_text.trim().is_empty() {
                    continue;
                }
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(page_text.trim_end());
            }
            Err(err) => {
                warn!(page = index + 1, error = %err, "OCR page skipped");
                last_error = Some(err);
            }
        }
    }

    match last_error {
        Some(err) if !read_any => Err(err),
        _ => Ok(text),
    }
}
