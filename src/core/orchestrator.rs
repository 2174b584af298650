use crate::core::facsimile;
use crate::core::iiif::normalize_with;
use crate::core::tei::{self, Element};
use crate::core::transcription::{
    build_source_doc, check_alignment, with_source_doc, SubstitutionTable,
};
use crate::domain::model::{DocumentDescriptor, FacsimileModel};
use crate::domain::ports::{
    ConfigProvider, DocumentConverter, DocumentJob, ManifestSource, RecordLookup, Storage,
};
use crate::utils::error::{Result, TeiError};
use async_trait::async_trait;

/// A descriptor after record lookup: concrete manifest URLs and header values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDocument {
    pub manifests: Vec<String>,
    pub title: Option<String>,
    pub record_id: Option<String>,
}

/// Applies the record-lookup rules.
///
/// A lookup id (or, without any manifest, the record id) is resolved through
/// `records`; the record's manifest then replaces any listed manifest. Title
/// precedence is `name`, then `title`, then the record's own name.
pub async fn resolve_descriptor<L: RecordLookup>(
    records: &L,
    descriptor: &DocumentDescriptor,
) -> Result<ResolvedDocument> {
    let lookup_key = descriptor.lookup_id.clone().or_else(|| {
        if descriptor.manifests.is_empty() {
            descriptor.record_id.clone()
        } else {
            None
        }
    });

    match lookup_key {
        Some(key) => {
            tracing::info!("🔎 Looking up media record {}", key);
            let record = records.lookup(&key).await?;
            Ok(ResolvedDocument {
                manifests: vec![record.manifest_url],
                title: descriptor
                    .name
                    .clone()
                    .or_else(|| descriptor.title.clone())
                    .or(record.name),
                record_id: descriptor.record_id.clone().or(Some(key)),
            })
        }
        None if descriptor.manifests.is_empty() => Err(TeiError::MissingConfigError {
            field: "manifest".to_string(),
        }),
        None => Ok(ResolvedDocument {
            manifests: descriptor.manifests.clone(),
            title: descriptor.title.clone().or_else(|| descriptor.name.clone()),
            record_id: descriptor.record_id.clone(),
        }),
    }
}

/// Fetches and normalizes every manifest, numbering surfaces continuously
/// across them. Identity (`id`, `name`, `manifest_id`) comes from the first.
pub async fn load_facsimile<M: ManifestSource>(
    source: &M,
    manifests: &[String],
    display_lang: &str,
) -> Result<FacsimileModel> {
    let mut combined: Option<FacsimileModel> = None;
    let mut next_ordinal = 0;

    for url in manifests {
        tracing::debug!("Fetching manifest {}", url);
        let json = source.fetch_json(url).await?;
        let model = normalize_with(&json, next_ordinal, display_lang)?;
        next_ordinal += model.surfaces.len();
        tracing::info!("📄 {} surfaces from {}", model.surfaces.len(), url);

        match combined.as_mut() {
            Some(merged) => {
                merged.surfaces.extend(model.surfaces);
                merged.texts.extend(model.texts);
            }
            None => combined = Some(model),
        }
    }

    combined.ok_or_else(|| TeiError::MissingConfigError {
        field: "manifest".to_string(),
    })
}

/// What happened to the transcription of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionStatus {
    Spliced { pages: usize },
    Skipped { reason: String },
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOutcome {
    pub output_id: String,
    pub path: String,
    pub surfaces: usize,
    pub transcription: TranscriptionStatus,
}

impl DocumentOutcome {
    pub fn summary(&self) -> String {
        let transcription = match &self.transcription {
            TranscriptionStatus::Spliced { pages } => format!("{} transcription pages", pages),
            TranscriptionStatus::Skipped { .. } => "transcription skipped".to_string(),
            TranscriptionStatus::Absent => "no transcription".to_string(),
        };
        format!("{} ({} surfaces, {})", self.path, self.surfaces, transcription)
    }
}

pub struct TeiPipeline<S, C, M, L, D> {
    storage: S,
    config: C,
    manifests: M,
    records: L,
    converter: D,
    table: SubstitutionTable,
}

impl<S, C, M, L, D> TeiPipeline<S, C, M, L, D>
where
    S: Storage,
    C: ConfigProvider,
    M: ManifestSource,
    L: RecordLookup,
    D: DocumentConverter,
{
    pub fn new(storage: S, config: C, manifests: M, records: L, converter: D) -> Self {
        Self {
            storage,
            config,
            manifests,
            records,
            converter,
            table: SubstitutionTable::default(),
        }
    }

    pub fn with_substitutions(mut self, table: SubstitutionTable) -> Self {
        self.table = table;
        self
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    pub async fn convert(&self, descriptor: &DocumentDescriptor) -> Result<DocumentOutcome> {
        let resolved = resolve_descriptor(&self.records, descriptor).await?;
        let model =
            load_facsimile(&self.manifests, &resolved.manifests, self.config.display_language())
                .await?;

        let output_id = descriptor
            .output_id
            .clone()
            .unwrap_or_else(|| model.id.clone());
        let title = resolved
            .title
            .clone()
            .or_else(|| Some(model.name.clone()).filter(|name| !name.trim().is_empty()));
        let file_same_as = resolved.record_id.as_ref().map(|id| format!("#_{}", id));

        let document = facsimile::build_document(&model, title.as_deref(), file_same_as.as_deref())?;

        let (document, transcription) =
            match self.transcription_surfaces(descriptor, &output_id, &model).await {
                Ok(Some(surfaces)) => {
                    let pages = surfaces.len();
                    (
                        with_source_doc(document, surfaces),
                        TranscriptionStatus::Spliced { pages },
                    )
                }
                Ok(None) => (document, TranscriptionStatus::Absent),
                Err(e) => {
                    tracing::warn!(
                        "⚠️ Transcription for {} skipped, writing facsimile only: {}",
                        output_id,
                        e
                    );
                    (
                        document,
                        TranscriptionStatus::Skipped {
                            reason: e.to_string(),
                        },
                    )
                }
            };

        let path = format!("{}/{}.xml", self.config.tei_output_dir(), output_id);
        self.storage
            .write_file(&path, tei::to_xml_string(&document).as_bytes())
            .await?;
        tracing::info!("✅ Wrote {}", path);

        Ok(DocumentOutcome {
            output_id,
            path,
            surfaces: model.surfaces.len(),
            transcription,
        })
    }

    /// `Ok(None)` when no transcription was named and the default file does not exist.
    async fn transcription_surfaces(
        &self,
        descriptor: &DocumentDescriptor,
        output_id: &str,
        model: &FacsimileModel,
    ) -> Result<Option<Vec<Element>>> {
        let dir = self.config.transcriptions_dir();
        let path = match &descriptor.transcription {
            Some(name) => format!("{}/{}", dir, name),
            None => {
                let default_path = format!("{}/{}.docx", dir, output_id);
                if !self.storage.exists(&default_path).await {
                    tracing::debug!("No transcription at {}", default_path);
                    return Ok(None);
                }
                default_path
            }
        };

        tracing::info!("📝 Reading transcription {}", path);
        let bytes = self.storage.read_file(&path).await?;
        let conversion = self.converter.convert_to_html(&bytes)?;
        for message in &conversion.messages {
            tracing::warn!("{}: {}", path, message);
        }

        let surfaces =
            build_source_doc(&conversion.html, self.config.page_break_marker(), &self.table)?;

        let ids: Vec<&str> = model.surfaces.iter().map(|s| s.id.as_str()).collect();
        if let Err(e) = check_alignment(&ids, &surfaces) {
            if self.config.strict_alignment() {
                return Err(e);
            }
            tracing::warn!("⚠️ {}: {}", path, e);
        }

        Ok(Some(surfaces))
    }
}

#[async_trait]
impl<S, C, M, L, D> DocumentJob for TeiPipeline<S, C, M, L, D>
where
    S: Storage,
    C: ConfigProvider,
    M: ManifestSource,
    L: RecordLookup,
    D: DocumentConverter,
{
    async fn process(&self, descriptor: &DocumentDescriptor) -> Result<String> {
        Ok(self.convert(descriptor).await?.summary())
    }
}
