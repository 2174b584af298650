//! Downloads one image per facsimile surface into `{image_output}/{title}/fNNN.jpg`.

use crate::core::orchestrator::{load_facsimile, resolve_descriptor};
use crate::domain::model::{DocumentDescriptor, Surface, SurfaceSource};
use crate::domain::ports::{
    ConfigProvider, DocumentJob, ImageFetcher, ManifestSource, RecordLookup, Storage,
};
use crate::utils::error::{Result, TeiError};
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReport {
    /// Diagnostic name of the document, see [`DocumentDescriptor::label`].
    pub document: String,
    pub folder: String,
    pub saved: usize,
    pub total: usize,
    /// Set when the run stopped early at a failing page.
    pub stopped: Option<String>,
}

impl ImageReport {
    pub fn summary(&self) -> String {
        match &self.stopped {
            Some(reason) => format!(
                "{}: {} of {} images in {}, stopped: {}",
                self.document, self.saved, self.total, self.folder, reason
            ),
            None => format!("{}: {} images", self.folder, self.saved),
        }
    }
}

/// Full-size JPEG for a surface: the painted image itself, else the image service.
pub fn image_download_url(surface: &Surface) -> Option<String> {
    if let Some(url) = &surface.image_url {
        return Some(url.clone());
    }
    match &surface.source {
        SurfaceSource::Iiif { image_api_url } => Some(format!(
            "{}/full/max/0/default.jpg",
            image_api_url.trim_end_matches('/')
        )),
        SurfaceSource::RawFile { .. } => None,
    }
}

fn folder_name(title: &str) -> String {
    title
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect()
}

pub struct ImageExtractor<S, C, M, L, F> {
    storage: S,
    config: C,
    manifests: M,
    records: L,
    images: F,
}

impl<S, C, M, L, F> ImageExtractor<S, C, M, L, F>
where
    S: Storage,
    C: ConfigProvider,
    M: ManifestSource,
    L: RecordLookup,
    F: ImageFetcher,
{
    pub fn new(storage: S, config: C, manifests: M, records: L, images: F) -> Self {
        Self {
            storage,
            config,
            manifests,
            records,
            images,
        }
    }

    /// Saves images in surface order, numbered from `f001`; the first failing page ends the run.
    pub async fn extract(&self, descriptor: &DocumentDescriptor) -> Result<ImageReport> {
        let resolved = resolve_descriptor(&self.records, descriptor).await?;
        let model =
            load_facsimile(&self.manifests, &resolved.manifests, self.config.display_language())
                .await?;

        let title = resolved
            .title
            .or_else(|| descriptor.output_id.clone())
            .unwrap_or_else(|| model.name.clone());
        let folder = format!(
            "{}/{}",
            self.config.image_output_dir(),
            folder_name(&title)
        );
        tracing::info!("🖼️ Saving {} images to {}", model.surfaces.len(), folder);

        let mut report = ImageReport {
            document: descriptor.label(),
            folder,
            saved: 0,
            total: model.surfaces.len(),
            stopped: None,
        };

        for (index, surface) in model.surfaces.iter().enumerate() {
            let page = index + 1;
            let saved = self.save_page(&report.folder, page, surface).await;
            if let Err(e) = saved {
                tracing::warn!("⚠️ Stopped images for {}: {}", report.document, e);
                report.stopped = Some(e.to_string());
                break;
            }
            report.saved += 1;
        }

        Ok(report)
    }

    async fn save_page(&self, folder: &str, page: usize, surface: &Surface) -> Result<()> {
        let url = image_download_url(surface).ok_or_else(|| TeiError::ImageFetch {
            page,
            url: String::new(),
            reason: format!("surface {} has no downloadable image", surface.id),
        })?;

        let bytes = self
            .images
            .fetch_bytes(&url)
            .await
            .map_err(|e| TeiError::ImageFetch {
                page,
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let path = format!("{}/f{:03}.jpg", folder, page);
        self.storage.write_file(&path, &bytes).await?;
        tracing::debug!("Saved {}", path);
        Ok(())
    }
}

#[async_trait]
impl<S, C, M, L, F> DocumentJob for ImageExtractor<S, C, M, L, F>
where
    S: Storage,
    C: ConfigProvider,
    M: ManifestSource,
    L: RecordLookup,
    F: ImageFetcher,
{
    async fn process(&self, descriptor: &DocumentDescriptor) -> Result<String> {
        Ok(self.extract(descriptor).await?.summary())
    }
}
