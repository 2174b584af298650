use crate::domain::model::DocumentDescriptor;
use crate::domain::ports::{DocumentJob, Storage};
use crate::utils::error::Result;
use std::collections::HashMap;

/// Parses a batch CSV (header row, one document per row) into descriptors.
pub fn descriptors_from_csv(
    bytes: &[u8],
    xml_id_field: Option<&str>,
) -> Result<Vec<DocumentDescriptor>> {
    let mut csv_reader = csv::Reader::from_reader(bytes);
    let mut descriptors = Vec::new();

    for result in csv_reader.deserialize() {
        let row: HashMap<String, String> = result?;
        descriptors.push(DocumentDescriptor::from_row(&row, xml_id_field));
    }

    Ok(descriptors)
}

pub async fn read_batch<S: Storage>(
    storage: &S,
    path: &str,
    xml_id_field: Option<&str>,
) -> Result<Vec<DocumentDescriptor>> {
    let bytes = storage.read_file(path).await?;
    let descriptors = descriptors_from_csv(&bytes, xml_id_field)?;
    tracing::info!("📋 {} documents listed in {}", descriptors.len(), path);
    Ok(descriptors)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub document: String,
    pub outcome: std::result::Result<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|item| item.outcome.is_ok()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &BatchItem> {
        self.items.iter().filter(|item| item.outcome.is_err())
    }
}

pub struct BatchRunner<J: DocumentJob> {
    job: J,
}

impl<J: DocumentJob> BatchRunner<J> {
    pub fn new(job: J) -> Self {
        Self { job }
    }

    /// Processes documents one after another. A failing document is recorded
    /// and the run moves on to the next one.
    pub async fn run(&self, descriptors: &[DocumentDescriptor]) -> BatchReport {
        let mut report = BatchReport::default();

        for (index, descriptor) in descriptors.iter().enumerate() {
            let document = descriptor.label();
            tracing::info!("[{}/{}] {}", index + 1, descriptors.len(), document);

            let outcome = match self.job.process(descriptor).await {
                Ok(summary) => Ok(summary),
                Err(e) => {
                    tracing::error!("❌ {}: {}", document, e);
                    tracing::error!("💡 {}", e.recovery_suggestion());
                    Err(e.user_friendly_message())
                }
            };
            report.items.push(BatchItem { document, outcome });
        }

        tracing::info!(
            "Finished {} documents ({} failed)",
            report.items.len(),
            report.items.len() - report.succeeded()
        );
        report
    }
}
