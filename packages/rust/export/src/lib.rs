//! Document export for Nobestudy.
//!
//! This crate provides:
//! - [`images`]: fetching and decoding image references
//! - [`pdf`], [`slides`], [`document`]: one renderer per output format, each
//!   producing the file as bytes
//! - [`output`]: per-request directories and atomic artifact writes
//! - [`Exporter`]: fetch images, render, persist

pub mod document;
pub mod images;
mod ooxml;
pub mod output;
pub mod pdf;
pub mod slides;

use std::path::PathBuf;

use reqwest::Client;
use tracing::{info, instrument};

use nobestudy_shared::{ExportRequest, FileType, Result};

pub use images::{ImageLoader, LoadedImage};
pub use output::{ExportedFile, RequestDir};

/// Render `request` in the given format.
pub fn render(
    file_type: FileType,
    request: &ExportRequest,
    images: &[LoadedImage],
) -> Result<Vec<u8>> {
    match file_type {
        FileType::Pdf => pdf::render(request, images),
        FileType::Ppt => slides::render(request, images),
        FileType::Docx => document::render(request, images),
    }
}

/// Produces export artifacts under a shared output root.
#[derive(Clone)]
pub struct Exporter {
    images: ImageLoader,
    output_root: PathBuf,
}

impl Exporter {
    pub fn new(client: Client, output_root: impl Into<PathBuf>) -> Self {
        Self {
            images: ImageLoader::new(client),
            output_root: output_root.into(),
        }
    }

    /// Fetch every image, render, and write the artifact into a fresh
    /// request directory. Nothing is written unless rendering succeeds.
    #[instrument(skip(self, request), fields(query = %request.query, images = request.images.len()))]
    pub async fn export(&self, file_type: FileType, request: &ExportRequest) -> Result<ExportedFile> {
        let images = self.images.fetch_all(&request.images).await?;
        let bytes = render(file_type, request, &images)?;

        let dir = RequestDir::create(&self.output_root)?;
        let file = dir.write_artifact(file_type, &bytes)?;

        info!(
            format = file_type.as_str(),
            path = %file.path.display(),
            "export complete"
        );
        Ok(file)
    }
}
