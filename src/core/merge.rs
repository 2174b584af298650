use crate::core::batch::{BatchItem, BatchReport};
use crate::domain::ports::{PdfWriter, Storage};
use crate::utils::error::Result;
use std::collections::BTreeMap;

fn is_jpeg(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".jpg") || lower.ends_with(".jpeg")
}

/// `f010.jpg` sorts after `f002.jpg`; names without an ordinal go last.
fn page_order(path: &str) -> (u64, String) {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let ordinal = file_name
        .strip_prefix('f')
        .and_then(|rest| rest.split('.').next())
        .and_then(|digits| digits.parse().ok())
        .unwrap_or(u64::MAX);
    (ordinal, file_name.to_string())
}

/// Groups the JPEGs below `input_dir` by their folder relative to it, pages in order.
/// Images directly inside `input_dir` belong to no document and are left out.
pub fn page_folders(input_dir: &str, files: &[String]) -> BTreeMap<String, Vec<String>> {
    let prefix = format!("{}/", input_dir.trim_end_matches('/'));
    let mut folders: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for path in files.iter().filter(|path| is_jpeg(path)) {
        let Some(relative) = path.strip_prefix(&prefix) else {
            continue;
        };
        match relative.rsplit_once('/') {
            Some((folder, _)) => folders
                .entry(folder.to_string())
                .or_default()
                .push(path.clone()),
            None => tracing::debug!("Skipping {}: not inside a document folder", path),
        }
    }

    for pages in folders.values_mut() {
        pages.sort_by_cached_key(|path| page_order(path));
    }
    folders
}

/// Turns every folder of page images into `{output_dir}/{folder}.pdf`.
pub struct PdfMerger<S, P> {
    storage: S,
    writer: P,
}

impl<S: Storage, P: PdfWriter> PdfMerger<S, P> {
    pub fn new(storage: S, writer: P) -> Self {
        Self { storage, writer }
    }

    /// A folder that fails is recorded and the run moves on to the next one.
    pub async fn merge(&self, input_dir: &str, output_dir: &str) -> Result<BatchReport> {
        let files = self.storage.list_files(input_dir).await?;
        let folders = page_folders(input_dir, &files);
        if folders.is_empty() {
            tracing::warn!("⚠️ No page images found under {}", input_dir);
        } else {
            tracing::info!("📄 Merging {} folders from {}", folders.len(), input_dir);
        }

        let mut report = BatchReport::default();
        for (folder, pages) in &folders {
            let outcome = match self.merge_folder(folder, pages, output_dir).await {
                Ok(path) => Ok(format!("{} ({} pages)", path, pages.len())),
                Err(e) => {
                    tracing::error!("❌ {}: {}", folder, e);
                    tracing::error!("💡 {}", e.recovery_suggestion());
                    Err(e.user_friendly_message())
                }
            };
            report.items.push(BatchItem {
                document: folder.clone(),
                outcome,
            });
        }

        tracing::info!(
            "Finished {} PDFs ({} failed)",
            report.items.len(),
            report.items.len() - report.succeeded()
        );
        Ok(report)
    }

    async fn merge_folder(
        &self,
        folder: &str,
        pages: &[String],
        output_dir: &str,
    ) -> Result<String> {
        let mut images = Vec::with_capacity(pages.len());
        for page in pages {
            images.push(self.storage.read_file(page).await?);
        }

        let pdf = self.writer.write_pdf(&images)?;
        let path = format!("{}/{}.pdf", output_dir, folder);
        self.storage.write_file(&path, &pdf).await?;
        tracing::debug!("Saved {}", path);
        Ok(path)
    }
}
